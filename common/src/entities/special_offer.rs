use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    impl_entity,
    media::{MediaKind, MediaSlot},
    schema::{Field, FieldKind, Listing, Schema},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpecialOffer {
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    pub dealership: ObjectId,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_conditions: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(SpecialOffer);

impl Schema for SpecialOffer {
    const LABEL: &'static str = "Special offer";
    const COLLECTION: &'static str = "specialoffers";
    const FIELDS: &'static [Field] = &[
        Field::new("title", FieldKind::Text).required(),
        Field::new("description", FieldKind::Text).required(),
        Field::new("tag", FieldKind::Text),
        Field::new("offer", FieldKind::Text),
        Field::new("dealership", FieldKind::Reference).required(),
        Field::new("validUntil", FieldKind::Date),
        Field::new("termsConditions", FieldKind::Text),
    ];
    const MEDIA: &'static [MediaSlot] = &[MediaSlot::single("image", "image", MediaKind::Image)];
    const LISTING: Listing = Listing {
        page_size: None,
        ..Listing::DEFAULT
    };
}
