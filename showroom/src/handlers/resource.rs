use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Scope};
use serde_json::json;

use common::{
    context::Context, error, form::FormPayload, response::ApiResponse, schema::Schema,
};

use crate::service::resource::ResourceService;

pub async fn create_resource<T: Schema>(
    context: Context,
    req: HttpRequest,
    payload: web::Payload,
) -> error::Result<HttpResponse> {
    let form = FormPayload::read(&req, payload, T::MEDIA).await?;
    let created = ResourceService::<T>::new(context).create(form).await?;
    Ok(
        ApiResponse::new(StatusCode::CREATED, format!("{} created successfully.", T::LABEL))
            .data(created)
            .respond(),
    )
}

pub async fn list_resources<T: Schema>(
    context: Context,
    query: web::Query<Vec<(String, String)>>,
) -> error::Result<HttpResponse> {
    let listed = ResourceService::<T>::new(context).list(&query).await?;
    Ok(
        ApiResponse::ok(format!("{} records retrieved successfully.", T::LABEL))
            .list(listed.items, listed.pagination)
            .respond(),
    )
}

pub async fn get_resource<T: Schema>(
    context: Context,
    id: web::Path<String>,
) -> error::Result<HttpResponse> {
    let found = ResourceService::<T>::new(context).find(&id).await?;
    Ok(ApiResponse::ok(format!("{} retrieved successfully.", T::LABEL))
        .data(found)
        .respond())
}

pub async fn update_resource<T: Schema>(
    context: Context,
    id: web::Path<String>,
    req: HttpRequest,
    payload: web::Payload,
) -> error::Result<HttpResponse> {
    let form = FormPayload::read(&req, payload, T::MEDIA).await?;
    let updated = ResourceService::<T>::new(context).update(&id, form).await?;
    Ok(ApiResponse::ok(format!("{} updated successfully.", T::LABEL))
        .data(updated)
        .respond())
}

pub async fn delete_resource<T: Schema>(
    context: Context,
    id: web::Path<String>,
) -> error::Result<HttpResponse> {
    ResourceService::<T>::new(context).delete(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn count_resources<T: Schema>(context: Context) -> error::Result<HttpResponse> {
    let total = ResourceService::<T>::new(context).count().await?;
    Ok(ApiResponse::ok(format!("Total {} count retrieved.", T::LABEL.to_lowercase()))
        .data(json!({ "total": total }))
        .respond())
}

pub async fn change_status<T: Schema>(
    context: Context,
    id: web::Path<String>,
    req: HttpRequest,
    payload: web::Payload,
) -> error::Result<HttpResponse> {
    let form = FormPayload::read(&req, payload, &[]).await?;
    let updated = ResourceService::<T>::new(context)
        .change_status(&id, form)
        .await?;
    Ok(ApiResponse::ok(format!("{} status updated successfully.", T::LABEL))
        .data(updated)
        .respond())
}

/// Mounts the collection routes of `T` on `scope`. Routes already on the scope
/// take precedence over `/{id}`.
pub fn resource_scope<T: Schema>(scope: Scope, count_path: &str) -> Scope {
    scope
        .service(web::resource(count_path).route(web::get().to(count_resources::<T>)))
        .service(
            web::resource(vec!["", "/"])
                .route(web::get().to(list_resources::<T>))
                .route(web::post().to(create_resource::<T>)),
        )
        .service(
            web::resource("/{id}")
                .route(web::get().to(get_resource::<T>))
                .route(web::put().to(update_resource::<T>))
                .route(web::patch().to(update_resource::<T>))
                .route(web::delete().to(delete_resource::<T>)),
        )
}

pub fn status_routes<T: Schema>(scope: Scope) -> Scope {
    scope
        .service(
            web::resource("/status/{id}")
                .route(web::put().to(change_status::<T>))
                .route(web::patch().to(change_status::<T>)),
        )
        .service(
            web::resource("/{id}/status")
                .route(web::put().to(change_status::<T>))
                .route(web::patch().to(change_status::<T>)),
        )
}
