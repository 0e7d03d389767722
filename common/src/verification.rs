use anyhow::bail;
use futures_util::StreamExt;
use mongodb::{
    bson::{self, Document},
    options::FindOptions,
    Client,
};

use crate::schema::Schema;

/// Checks that stored documents still load as `T`. With `all` unset only the
/// first document is read. The error names the offending document.
pub async fn verify<T: Schema>(client: &Client, database: &str, all: bool) -> anyhow::Result<()> {
    let collection = client
        .database(database)
        .collection::<Document>(T::COLLECTION);
    let options = FindOptions::builder()
        .limit((!all).then_some(1_i64))
        .build();

    let mut cursor = collection.find(None, options).await?;
    let mut checked = 0_u64;
    while let Some(document) = cursor.next().await {
        check_document::<T>(document?)?;
        checked += 1;
    }

    log::info!("Collection {} verified, {} documents", T::COLLECTION, checked);
    Ok(())
}

fn check_document<T: Schema>(document: Document) -> anyhow::Result<()> {
    let key = document
        .get("id")
        .or_else(|| document.get("_id"))
        .map(ToString::to_string)
        .unwrap_or_else(|| "without id".to_string());

    if let Err(err) = bson::from_document::<T>(document) {
        bail!(
            "{} document {} is not a valid {}: {}",
            T::COLLECTION,
            key,
            T::LABEL.to_lowercase(),
            err
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, oid::ObjectId, DateTime};

    use super::check_document;
    use crate::entities::{business::Business, contact::Contact};

    #[test]
    fn reports_the_document_that_does_not_load() {
        let id = ObjectId::new();
        let err = check_document::<Contact>(doc! {"id": id, "name": "Jane"}).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("contacts document "));
        assert!(message.contains(&id.to_hex()));

        let now = DateTime::now();
        assert!(check_document::<Contact>(doc! {
            "id": id,
            "name": "Jane",
            "email": "jane@example.com",
            "subject": "Hi",
            "message": "Hello",
            "createdAt": now,
            "updatedAt": now,
        })
        .is_ok());
    }

    #[test]
    fn free_form_documents_always_load() {
        assert!(check_document::<Business>(doc! {"anything": 1}).is_ok());
    }
}
