use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    impl_entity,
    media::{MediaKind, MediaSlot},
    schema::{Field, FieldKind, Listing, Schema},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PostStatus {
    #[default]
    Published,
    Draft,
}

impl PostStatus {
    pub const VALUES: &'static [&'static str] = &["Published", "Draft"];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default = "DateTime::now")]
    pub publish_date: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Post);

impl Schema for Post {
    const LABEL: &'static str = "Post";
    const COLLECTION: &'static str = "posts";
    const FIELDS: &'static [Field] = &[
        Field::new("title", FieldKind::Text).required(),
        Field::new("content", FieldKind::Text).required(),
        Field::new("author", FieldKind::Text).required(),
        Field::new("tags", FieldKind::List),
        Field::new("status", FieldKind::Choice(PostStatus::VALUES)),
        Field::new("publishDate", FieldKind::Date),
    ];
    const MEDIA: &'static [MediaSlot] = &[MediaSlot::single("image", "image", MediaKind::Image)];
    const LISTING: Listing = Listing {
        sort: &[("publishDate", -1)],
        ..Listing::DEFAULT
    };
}
