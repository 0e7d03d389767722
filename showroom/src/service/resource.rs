use std::{
    collections::{HashMap, HashSet},
    marker::PhantomData,
};

use anyhow::anyhow;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, DateTime, Document};
use serde_json::Value;

use common::{
    context::Context,
    entities::dealership::Dealership,
    error::{self, bad_request, not_found, AddCode},
    form::FormPayload,
    media::{reconciler::stored_media, Reconciler},
    query::{translate, Pagination, TranslatedQuery},
    repository::{Entity, RepositoryObject},
    response::render,
    schema::{
        coerce::{check_choice, coerce, Mode},
        EmptyResult, Schema,
    },
};

pub struct Listed {
    pub items: Vec<Value>,
    pub pagination: Pagination,
}

/// CRUD over one entity type. Everything entity specific comes from `T`'s schema.
pub struct ResourceService<T> {
    context: Context,
    entity: PhantomData<T>,
}

impl<T: Schema> ResourceService<T> {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            entity: PhantomData,
        }
    }

    fn repository(&self) -> error::Result<RepositoryObject<T>> {
        self.context.try_get_repository::<T>()
    }

    pub async fn create(&self, form: FormPayload) -> error::Result<Value> {
        let repository = self.repository()?;

        let mut document = coerce::<T>(&form.fields, Mode::Create)?;
        self.check_reference(&document).await?;
        self.check_unique(&document, None).await?;

        let now = DateTime::now();
        document.insert("id", ObjectId::new());
        document.insert("createdAt", now);
        document.insert("updatedAt", now);
        from_stored::<T>(document.clone())?;

        let reconciler = Reconciler::new(self.context.media());
        let plan = reconciler.reconcile(T::MEDIA, None, &form).await?;
        for (key, value) in plan.changes {
            document.insert(key, value);
        }

        let entity = match from_stored::<T>(document) {
            Ok(entity) => entity,
            Err(err) => {
                reconciler.discard(plan.uploaded).await;
                return Err(err);
            }
        };

        match repository.insert(&entity).await {
            Ok(true) => {}
            Ok(false) => {
                reconciler.discard(plan.uploaded).await;
                return Err(anyhow!("{} already exists", T::LABEL).code(409));
            }
            Err(err) => {
                reconciler.discard(plan.uploaded).await;
                return Err(err);
            }
        }

        log::info!("Created {} {}", T::LABEL, entity.id());
        self.present(entity).await
    }

    pub async fn list(&self, params: &[(String, String)]) -> error::Result<Listed> {
        let repository = self.repository()?;
        let TranslatedQuery { find, page } = translate::<T>(params)?;

        let (total, documents) = futures::try_join!(
            repository.count(find.filter.clone()),
            repository.query(&find)
        )?;

        if documents.is_empty() {
            match T::LISTING.empty {
                EmptyResult::NotFound(message) => return Err(not_found(message)),
                EmptyResult::NotFoundBeyondFirstPage if page.page > 1 => {
                    return Err(not_found("This page does not exist."))
                }
                _ => {}
            }
        }

        Ok(Listed {
            items: self.populate(documents).await?,
            pagination: Pagination::new(&page, total),
        })
    }

    pub async fn find(&self, id: &str) -> error::Result<Value> {
        let repository = self.repository()?;
        let (_, entity) = self.load(&repository, id).await?;
        self.present(entity).await
    }

    pub async fn update(&self, id: &str, form: FormPayload) -> error::Result<Value> {
        let repository = self.repository()?;
        let (oid, existing) = self.load(&repository, id).await?;

        let mut changes = coerce::<T>(&form.fields, Mode::Update)?;
        if changes.is_empty() && !Reconciler::has_changes(T::MEDIA, &form) {
            return Err(bad_request("No valid update data provided."));
        }
        self.check_reference(&changes).await?;
        self.check_unique(&changes, Some(oid)).await?;

        let stored = bson::to_document(&existing)?;
        let mut merged = stored.clone();
        for (key, value) in changes.iter() {
            merged.insert(key, value.clone());
        }
        from_stored::<T>(merged)?;

        let reconciler = Reconciler::new(self.context.media());
        let plan = reconciler.reconcile(T::MEDIA, Some(&stored), &form).await?;
        for (key, value) in plan.changes {
            changes.insert(key, value);
        }
        changes.insert("updatedAt", DateTime::now());

        let updated = match repository.update(&oid, changes).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                reconciler.discard(plan.uploaded).await;
                return Err(missing::<T>(id));
            }
            Err(err) => {
                reconciler.discard(plan.uploaded).await;
                return Err(err);
            }
        };
        reconciler.purge(plan.obsolete).await;

        log::info!("Updated {} {}", T::LABEL, oid);
        self.present(updated).await
    }

    pub async fn delete(&self, id: &str) -> error::Result<()> {
        let repository = self.repository()?;
        let (oid, existing) = self.load(&repository, id).await?;

        let stored = bson::to_document(&existing)?;
        Reconciler::new(self.context.media())
            .purge(stored_media(T::MEDIA, &stored))
            .await;

        repository
            .delete("id", &oid)
            .await?
            .ok_or_else(|| missing::<T>(id))?;

        log::info!("Deleted {} {}", T::LABEL, oid);
        Ok(())
    }

    pub async fn count(&self) -> error::Result<u64> {
        self.repository()?.count(Document::new()).await
    }

    pub async fn change_status(&self, id: &str, form: FormPayload) -> error::Result<Value> {
        let Some((field, values)) = T::status() else {
            return Err(not_found(format!("{} has no status", T::LABEL)));
        };
        let status = form
            .field_str(field)
            .map(str::trim)
            .filter(|x| !x.is_empty())
            .ok_or_else(|| bad_request("Status field is required for status update."))?
            .to_string();

        let repository = self.repository()?;
        let (oid, _) = self.load(&repository, id).await?;
        check_choice(field, &status, values)?;

        let updated = repository
            .update(&oid, doc! {field: status.as_str(), "updatedAt": DateTime::now()})
            .await?
            .ok_or_else(|| missing::<T>(id))?;

        log::info!("{} {} status set to {}", T::LABEL, oid, status);
        self.present(updated).await
    }

    async fn load(&self, repository: &RepositoryObject<T>, id: &str) -> error::Result<(ObjectId, T)> {
        let oid = ObjectId::parse_str(id).map_err(|_| missing::<T>(id))?;
        let entity = repository
            .find("id", &Bson::ObjectId(oid))
            .await?
            .ok_or_else(|| missing::<T>(id))?;
        Ok((oid, entity))
    }

    async fn check_reference(&self, document: &Document) -> error::Result<()> {
        let Some(field) = T::reference() else {
            return Ok(());
        };
        let Ok(id) = document.get_object_id(field.name) else {
            return Ok(());
        };

        let dealerships = self.context.try_get_repository::<Dealership>()?;
        if dealerships.find("id", &Bson::ObjectId(id)).await?.is_none() {
            return Err(bad_request(
                "Invalid dealership ID provided. Dealership not found.",
            ));
        }
        Ok(())
    }

    async fn check_unique(&self, document: &Document, exclude: Option<ObjectId>) -> error::Result<()> {
        let repository = self.repository()?;
        for &field in T::UNIQUE {
            let Some(value) = document.get(field) else {
                continue;
            };
            if let Some(existing) = repository.find(field, value).await? {
                if Some(existing.id()) != exclude {
                    return Err(bad_request(format!(
                        "A {} with this {} already exists.",
                        T::LABEL.to_lowercase(),
                        field
                    )));
                }
            }
        }
        Ok(())
    }

    async fn present(&self, entity: T) -> error::Result<Value> {
        let mut document = bson::to_document(&entity)?;
        document.remove("_id");
        let mut rendered = self.populate(vec![document]).await?;
        Ok(rendered.pop().unwrap_or(Value::Null))
    }

    /// Replaces the dealership reference of each document with `{id, name}`,
    /// or null when the dealership no longer exists.
    async fn populate(&self, mut documents: Vec<Document>) -> error::Result<Vec<Value>> {
        let Some(field) = T::reference() else {
            return Ok(documents.into_iter().map(render).collect());
        };

        let ids = documents
            .iter()
            .filter_map(|document| document.get_object_id(field.name).ok())
            .collect::<HashSet<ObjectId>>();
        if ids.is_empty() {
            return Ok(documents.into_iter().map(render).collect());
        }

        let names = self
            .context
            .try_get_repository::<Dealership>()?
            .find_many("id", ids.into_iter().map(Bson::ObjectId).collect())
            .await?
            .into_iter()
            .map(|dealership| (dealership.id, dealership.name))
            .collect::<HashMap<ObjectId, String>>();

        for document in documents.iter_mut() {
            let Ok(id) = document.get_object_id(field.name) else {
                continue;
            };
            let joined = names
                .get(&id)
                .map(|name| Bson::Document(doc! {"id": id, "name": name}))
                .unwrap_or(Bson::Null);
            document.insert(field.name, joined);
        }

        Ok(documents.into_iter().map(render).collect())
    }
}

fn missing<T: Schema>(id: &str) -> error::ServiceError {
    not_found(format!("{} not found with ID: {}", T::LABEL, id))
}

fn from_stored<T: Schema>(document: Document) -> error::Result<T> {
    bson::from_document(document).map_err(|err| {
        bad_request(format!(
            "Invalid {} data: {}",
            T::LABEL.to_lowercase(),
            err
        ))
    })
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{oid::ObjectId, Bson};
    use serde_json::{json, Value};

    use common::{
        context::Context,
        entities::{contact::Contact, dealership::Dealership, vehicle::Vehicle},
        form::FormPayload,
        repository::RepositoryObject,
    };

    use super::ResourceService;
    use crate::test_utils::{dealership_form, test_state};

    fn context() -> Context {
        let (state, _) = test_state();
        Context(state)
    }

    fn vehicle_form(dealership: &str) -> FormPayload {
        FormPayload::from_json(json!({
            "brand": " Toyota ",
            "model": "Corolla",
            "VIN": " abc123 ",
            "year": "2020",
            "mileage": "12000",
            "price": 15000,
            "fuelType": "Petrol",
            "features": "a, b,c",
            "isFeatured": "TRUE",
            "dealership": dealership,
        }))
        .unwrap()
    }

    #[actix_web::test]
    async fn test_create_coerces_fields() {
        let context = context();
        let dealership = ResourceService::<Dealership>::new(context.clone())
            .create(dealership_form("Northside Motors"))
            .await
            .unwrap();
        let dealership_id = dealership["id"].as_str().unwrap().to_string();

        let vehicle = ResourceService::<Vehicle>::new(context.clone())
            .create(vehicle_form(&dealership_id))
            .await
            .unwrap();

        assert_eq!(vehicle["brand"], "Toyota");
        assert_eq!(vehicle["VIN"], "ABC123");
        assert_eq!(vehicle["year"], 2020);
        assert_eq!(vehicle["features"], json!(["a", "b", "c"]));
        assert_eq!(vehicle["isFeatured"], true);
        assert_eq!(vehicle["status"], "Available");
        assert_eq!(
            vehicle["dealership"],
            json!({"id": dealership_id, "name": "Northside Motors"})
        );

        let repository: RepositoryObject<Vehicle> = context.try_get_repository().unwrap();
        let id = ObjectId::parse_str(vehicle["id"].as_str().unwrap()).unwrap();
        let stored = repository
            .find("id", &Bson::ObjectId(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.features, vec!["a", "b", "c"]);
        assert!(stored.is_featured);
        assert_eq!(stored.mileage, 12000.0);
    }

    #[actix_web::test]
    async fn test_duplicate_dealership_name_is_rejected() {
        let context = context();
        let service = ResourceService::<Dealership>::new(context);
        service
            .create(dealership_form("Northside Motors"))
            .await
            .unwrap();

        let mut form = dealership_form("Northside Motors");
        form.fields
            .insert("email".to_string(), json!("other@northside.com"));
        let err = service.create(form).await.unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[actix_web::test]
    async fn test_missing_dealership_is_joined_as_null() {
        let context = context();
        let dealership = ResourceService::<Dealership>::new(context.clone())
            .create(dealership_form("Northside Motors"))
            .await
            .unwrap();
        let dealership_id = dealership["id"].as_str().unwrap().to_string();

        let vehicles = ResourceService::<Vehicle>::new(context.clone());
        let vehicle = vehicles.create(vehicle_form(&dealership_id)).await.unwrap();

        let repository: RepositoryObject<Dealership> = context.try_get_repository().unwrap();
        repository
            .delete("id", &ObjectId::parse_str(&dealership_id).unwrap())
            .await
            .unwrap();

        let found = vehicles
            .find(vehicle["id"].as_str().unwrap())
            .await
            .unwrap();
        assert_eq!(found["dealership"], json!(null));
    }

    #[actix_web::test]
    async fn test_update_without_changes_is_rejected() {
        let context = context();
        let service = ResourceService::<Dealership>::new(context);
        let created = service
            .create(dealership_form("Northside Motors"))
            .await
            .unwrap();

        let err = service
            .update(
                created["id"].as_str().unwrap(),
                FormPayload::from_json(json!({"unknown": "value"})).unwrap(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);
        assert_eq!(err.message(), "No valid update data provided.");
    }

    #[actix_web::test]
    async fn test_update_keeps_unique_value_of_same_record() {
        let context = context();
        let service = ResourceService::<Dealership>::new(context);
        let created = service
            .create(dealership_form("Northside Motors"))
            .await
            .unwrap();

        let updated = service
            .update(
                created["id"].as_str().unwrap(),
                FormPayload::from_json(json!({"name": "Northside Motors", "hours": "9-5"}))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(updated["hours"], "9-5");
        assert_ne!(updated["updatedAt"], Value::Null);
    }

    #[actix_web::test]
    async fn test_status_requires_value() {
        let service = ResourceService::<Contact>::new(context());
        let err = service
            .change_status(&ObjectId::new().to_hex(), FormPayload::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);

        let err = service
            .change_status(
                &ObjectId::new().to_hex(),
                FormPayload::from_json(json!({"status": "archive"})).unwrap(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), 404);
    }

    #[actix_web::test]
    async fn test_list_projects_requested_fields() {
        let context = context();
        let service = ResourceService::<Dealership>::new(context);
        service
            .create(dealership_form("Northside Motors"))
            .await
            .unwrap();

        let listed = service
            .list(&[("fields".to_string(), "name,phone".to_string())])
            .await
            .unwrap();
        assert_eq!(listed.items.len(), 1);
        let item = listed.items[0].as_object().unwrap();
        assert!(item.contains_key("id"));
        assert!(item.contains_key("name"));
        assert!(!item.contains_key("address"));
        assert!(!item.contains_key("_id"));
    }
}
