use mongodb::bson::doc;
use serde_json::Value;

use common::{
    context::Context,
    entities::dealership::Dealership,
    error::{self, bad_request},
    query::{PageRequest, Pagination},
    repository::FindQuery,
    response::render,
};

use super::resource::Listed;

pub struct DealershipService {
    context: Context,
}

impl DealershipService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    /// Case-insensitive substring search on the dealership name.
    pub async fn search(
        &self,
        name: Option<&str>,
        page: Option<&str>,
        limit: Option<&str>,
    ) -> error::Result<Listed> {
        let Some(name) = name.map(str::trim).filter(|x| !x.is_empty()) else {
            return Err(bad_request("Please provide a dealership name to search for."));
        };

        let repository = self.context.try_get_repository::<Dealership>()?;
        let page = PageRequest::parse(page, limit, Some(10));
        let filter = doc! {"name": {"$regex": regex::escape(name), "$options": "i"}};

        let query = FindQuery {
            sort: Some(doc! {"name": 1}),
            skip: page.skip(),
            limit: page.store_limit(),
            ..FindQuery::new(filter.clone())
        };

        let (total, documents) =
            futures::try_join!(repository.count(filter), repository.query(&query))?;

        Ok(Listed {
            items: documents.into_iter().map(render).collect(),
            pagination: Pagination::new(&page, total),
        })
    }

    pub async fn names(&self) -> error::Result<Vec<Value>> {
        let repository = self.context.try_get_repository::<Dealership>()?;
        let query = FindQuery {
            sort: Some(doc! {"name": 1}),
            projection: Some(doc! {"_id": 0, "id": 1, "name": 1}),
            ..FindQuery::new(doc! {})
        };

        Ok(repository
            .query(&query)
            .await?
            .into_iter()
            .map(render)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use common::{context::Context, entities::dealership::Dealership};

    use super::DealershipService;
    use crate::{
        service::resource::ResourceService,
        test_utils::{dealership_form, test_state},
    };

    async fn seeded() -> DealershipService {
        let (state, _) = test_state();
        let context = Context(state);
        let dealerships = ResourceService::<Dealership>::new(context.clone());
        for name in ["Zeta Cars", "Alpha Motors", "Motorland", "Beta Trucks"] {
            dealerships.create(dealership_form(name)).await.unwrap();
        }
        DealershipService::new(context)
    }

    #[actix_web::test]
    async fn test_search_matches_case_insensitive_substring() {
        let service = seeded().await;

        let found = service.search(Some("MOTOR"), None, None).await.unwrap();
        let names = found
            .items
            .iter()
            .map(|x| x["name"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Alpha Motors", "Motorland"]);
        assert_eq!(found.pagination.total_items, 2);
        assert_eq!(found.pagination.limit, Some(10));
    }

    #[actix_web::test]
    async fn test_search_escapes_pattern() {
        let service = seeded().await;
        let found = service.search(Some("a.*"), None, None).await.unwrap();
        assert!(found.items.is_empty());
    }

    #[actix_web::test]
    async fn test_search_requires_name() {
        let service = seeded().await;
        let err = service.search(Some("  "), None, None).await.err().unwrap();
        assert_eq!(err.code(), 400);
    }

    #[actix_web::test]
    async fn test_names_are_sorted() {
        let service = seeded().await;
        let names = service.names().await.unwrap();
        assert_eq!(names.len(), 4);
        assert_eq!(names[0]["name"], "Alpha Motors");
        assert_eq!(names[3]["name"], "Zeta Cars");
        assert!(names[0]["id"].is_string());
        assert!(names[0].get("address").is_none());
    }
}
