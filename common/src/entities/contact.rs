use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    impl_entity,
    schema::{EmptyResult, Field, FieldKind, Listing, Schema},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Responded,
    Archive,
}

impl ContactStatus {
    pub const VALUES: &'static [&'static str] = &["new", "responded", "archive"];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub status: ContactStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Contact);

impl Schema for Contact {
    const LABEL: &'static str = "Contact inquiry";
    const COLLECTION: &'static str = "contacts";
    const FIELDS: &'static [Field] = &[
        Field::new("name", FieldKind::Text).required(),
        Field::new("email", FieldKind::Email).required(),
        Field::new("phone", FieldKind::Text),
        Field::new("subject", FieldKind::Text).required(),
        Field::new("message", FieldKind::Text).required(),
        Field::new("status", FieldKind::Status(ContactStatus::VALUES)),
    ];
    const LISTING: Listing = Listing {
        page_size: None,
        empty: EmptyResult::NotFound("No contact inquiries found."),
        ..Listing::DEFAULT
    };
}
