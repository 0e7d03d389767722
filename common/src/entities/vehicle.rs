use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    impl_entity,
    media::{MediaKind, MediaSlot},
    schema::{EmptyResult, Field, FieldKind::*, Listing, Rule, Schema},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VehicleStatus {
    #[default]
    Available,
    Sold,
    Pending,
    #[serde(rename = "Coming Soon")]
    ComingSoon,
    Reserved,
}

impl VehicleStatus {
    pub const VALUES: &'static [&'static str] =
        &["Available", "Sold", "Pending", "Coming Soon", "Reserved"];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: ObjectId,
    pub brand: String,
    pub model: String,
    #[serde(rename = "VIN", default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    pub year: i64,
    pub mileage: f64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exterior_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interior_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_train: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_doors: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seating_capacity: Option<i64>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub status: VehicleStatus,
    pub dealership: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Vehicle);

impl Schema for Vehicle {
    const LABEL: &'static str = "Vehicle";
    const COLLECTION: &'static str = "vehicles";
    const FIELDS: &'static [Field] = &[
        Field::new("brand", Text).required(),
        Field::new("model", Text).required(),
        Field::new("VIN", Upper),
        Field::new("year", Integer)
            .required()
            .rules(&[Rule::Min(1900.0), Rule::YearsAhead(2)]),
        Field::new("mileage", Number)
            .required()
            .rules(&[Rule::Min(0.0)]),
        Field::new("price", Number).required().rules(&[Rule::Min(0.0)]),
        Field::new("exteriorColor", Text),
        Field::new("interiorColor", Text),
        Field::new("condition", Text),
        Field::new("transmission", Text),
        Field::new("fuelType", Text).required(),
        Field::new("bodyType", Text),
        Field::new("engineSize", Text),
        Field::new("driveTrain", Text),
        Field::new("numDoors", Integer).rules(&[Rule::Min(1.0)]),
        Field::new("seatingCapacity", Integer).rules(&[Rule::Min(1.0)]),
        Field::new("features", List),
        Field::new("description", Text),
        Field::new("isFeatured", Boolean),
        Field::new("status", Choice(VehicleStatus::VALUES)),
        Field::new("dealership", Reference).required(),
    ];
    const MEDIA: &'static [MediaSlot] = &[
        MediaSlot::list("images", "images", MediaKind::Image, 5),
        MediaSlot::single("videoUrl", "video", MediaKind::Video),
    ];
    const LISTING: Listing = Listing {
        page_size: None,
        empty: EmptyResult::NotFound("No vehicles found."),
        ..Listing::DEFAULT
    };
}
