pub mod mongo_repository;
pub mod test_repository;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use crate::error;

pub trait Entity {
    fn id(&self) -> ObjectId;
}

/// Everything a list request needs from the store: filter, order, window and shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Document,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub skip: u64,
    pub limit: Option<i64>,
}

impl FindQuery {
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            projection: Some(doc! {"_id": 0}),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait Repository<T>: Send + Sync {
    async fn insert(&self, item: &T) -> error::Result<bool>;
    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>>;
    async fn find_many(&self, field: &str, values: Vec<Bson>) -> error::Result<Vec<T>>;
    async fn query(&self, query: &FindQuery) -> error::Result<Vec<Document>>;
    async fn count(&self, filter: Document) -> error::Result<u64>;
    async fn update(&self, id: &ObjectId, changes: Document) -> error::Result<Option<T>>;
    async fn delete(&self, field: &str, id: &ObjectId) -> error::Result<Option<T>>;
}

pub type RepositoryObject<T> = Arc<dyn Repository<T>>;
