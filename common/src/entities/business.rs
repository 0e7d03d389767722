use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use crate::{
    repository::Entity,
    schema::{Field, Listing, Schema},
};

/// Free-form business listing. Any keys are kept as sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Business(pub Document);

impl Entity for Business {
    fn id(&self) -> ObjectId {
        self.0
            .get_object_id("id")
            .unwrap_or_else(|_| ObjectId::from_bytes([0; 12]))
    }
}

impl Schema for Business {
    const LABEL: &'static str = "Business";
    const COLLECTION: &'static str = "businesses";
    const FIELDS: &'static [Field] = &[];
    const LISTING: Listing = Listing {
        sort: &[("name", 1)],
        page_size: None,
        ..Listing::DEFAULT
    };
    const FREE_FORM: bool = true;
}
