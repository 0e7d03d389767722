use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use common::{context::Context, error, response::ApiResponse};

use crate::service::dealership::DealershipService;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[get("/search")]
pub async fn search_dealerships(
    context: Context,
    query: web::Query<SearchQuery>,
) -> error::Result<HttpResponse> {
    let listed = DealershipService::new(context)
        .search(
            query.name.as_deref(),
            query.page.as_deref(),
            query.limit.as_deref(),
        )
        .await?;

    let message = format!(
        "Found {} dealerships matching '{}'",
        listed.pagination.total_items,
        query.name.as_deref().unwrap_or_default().trim()
    );
    Ok(ApiResponse::ok(message)
        .list(listed.items, listed.pagination)
        .respond())
}

#[get("/searchIdName")]
pub async fn dealership_names(context: Context) -> error::Result<HttpResponse> {
    let names = DealershipService::new(context).names().await?;
    Ok(ApiResponse::ok("Dealership names retrieved successfully.")
        .data(names.into())
        .respond())
}
