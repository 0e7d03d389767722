use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    impl_entity,
    media::{MediaKind, MediaSlot},
    schema::{Field, FieldKind, Listing, Schema},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySpecial {
    pub id: ObjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealership: Option<ObjectId>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub video: String,
    #[serde(default = "DateTime::now")]
    pub date: DateTime,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(WeeklySpecial);

impl Schema for WeeklySpecial {
    const LABEL: &'static str = "Weekly special";
    const COLLECTION: &'static str = "weeklyspecials";
    const FIELDS: &'static [Field] = &[
        Field::new("title", FieldKind::Text).required(),
        Field::new("dealership", FieldKind::Reference).required(),
        Field::new("description", FieldKind::Text).required(),
        Field::new("date", FieldKind::Date).required(),
    ];
    const MEDIA: &'static [MediaSlot] = &[
        MediaSlot::single("thumbnail", "thumbnail", MediaKind::Image),
        MediaSlot::single("video", "video", MediaKind::Video),
    ];
    const LISTING: Listing = Listing {
        sort: &[("date", -1), ("createdAt", -1)],
        page_size: None,
        ..Listing::DEFAULT
    };
}
