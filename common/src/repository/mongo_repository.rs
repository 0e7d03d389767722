use async_trait::async_trait;
use futures::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error;

use super::{Entity, FindQuery, Repository};

pub struct MongoRepository<T> {
    pub collection: mongodb::Collection<T>,
}

impl<T> MongoRepository<T> {
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        let collection = client.database(database).collection(collection);
        Self { collection }
    }

    pub async fn ensure_unique(&self, fields: &[&str]) -> error::Result<()> {
        for &field in fields {
            let index = IndexModel::builder()
                .keys(doc! {field: 1})
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.collection.create_index(index, None).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T> Repository<T> for MongoRepository<T>
where
    T: Entity + Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    async fn insert(&self, item: &T) -> error::Result<bool> {
        let result = self
            .collection
            .find_one(doc! {"id": item.id()}, None)
            .await?
            .is_none();

        if result {
            self.collection.insert_one(item, None).await?;
        }
        Ok(result)
    }

    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let result = self.collection.find_one(doc! {field: value}, None).await?;
        Ok(result)
    }

    async fn find_many(&self, field: &str, values: Vec<Bson>) -> error::Result<Vec<T>> {
        let result: Vec<mongodb::error::Result<T>> = self
            .collection
            .find(doc! {field: {"$in": values}}, None)
            .await?
            .collect()
            .await;
        Ok(result.into_iter().collect::<mongodb::error::Result<_>>()?)
    }

    async fn query(&self, query: &FindQuery) -> error::Result<Vec<Document>> {
        let find_options = FindOptions::builder()
            .sort(query.sort.clone())
            .projection(query.projection.clone())
            .skip(Some(query.skip))
            .limit(query.limit)
            .build();

        let result: Vec<mongodb::error::Result<Document>> = self
            .collection
            .clone_with_type::<Document>()
            .find(query.filter.clone(), find_options)
            .await?
            .collect()
            .await;
        Ok(result.into_iter().collect::<mongodb::error::Result<_>>()?)
    }

    async fn count(&self, filter: Document) -> error::Result<u64> {
        Ok(self.collection.count_documents(filter, None).await?)
    }

    async fn update(&self, id: &ObjectId, changes: Document) -> error::Result<Option<T>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let result = self
            .collection
            .find_one_and_update(doc! {"id": id}, doc! {"$set": changes}, options)
            .await?;
        Ok(result)
    }

    async fn delete(&self, field: &str, id: &ObjectId) -> error::Result<Option<T>> {
        let result = self
            .collection
            .find_one_and_delete(doc! {field: id}, None)
            .await?;
        Ok(result)
    }
}
