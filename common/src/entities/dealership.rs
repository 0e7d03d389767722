use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    impl_entity,
    media::{MediaKind, MediaSlot},
    schema::{Field, FieldKind::*, Pattern, Rule, Schema},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dealership {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub cover_image: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub hours: String,
    #[serde(default)]
    pub map_url: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Dealership);

impl Schema for Dealership {
    const LABEL: &'static str = "Dealership";
    const COLLECTION: &'static str = "dealerships";
    const FIELDS: &'static [Field] = &[
        Field::new("name", Text).required(),
        Field::new("address", Text).required(),
        Field::new("phone", Text).required(),
        Field::new("email", Email)
            .required()
            .rules(&[Rule::Matches(Pattern::StrictEmail)]),
        Field::new("website", Text),
        Field::new("services", List).required(),
        Field::new("specialties", List),
        Field::new("hours", Text).required(),
        Field::new("mapUrl", Text),
        Field::new("description", Text),
    ];
    const MEDIA: &'static [MediaSlot] = &[
        MediaSlot::single("logo", "logo", MediaKind::Image),
        MediaSlot::single("coverImage", "coverImage", MediaKind::Image),
    ];
    const UNIQUE: &'static [&'static str] = &["name", "email"];
}
