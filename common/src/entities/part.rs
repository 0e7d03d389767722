use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    impl_entity,
    schema::{EmptyResult, Field, FieldKind::*, Listing, Pattern, Rule, Schema},
};

use super::RequestStatus;

/// A customer request for parts, tracked through `RequestStatus`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: ObjectId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub vehicle_year: i64,
    pub make: String,
    pub model: String,
    #[serde(rename = "VIN", default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    pub parts_needed: Vec<String>,
    pub preferred_pickup: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_pickup_option: Option<String>,
    #[serde(default)]
    pub status: RequestStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Part);

impl Schema for Part {
    const LABEL: &'static str = "Parts request";
    const COLLECTION: &'static str = "parts";
    const FIELDS: &'static [Field] = &[
        Field::new("name", Text)
            .required()
            .rules(&[Rule::MinLength(2)]),
        Field::new("phone", Text)
            .required()
            .rules(&[Rule::Matches(Pattern::Phone)]),
        Field::new("email", Email)
            .required()
            .rules(&[Rule::Matches(Pattern::LooseEmail)]),
        Field::new("vehicleYear", Integer)
            .required()
            .rules(&[Rule::Min(1900.0), Rule::YearsAhead(1)]),
        Field::new("make", Text).required(),
        Field::new("model", Text).required(),
        Field::new("VIN", Upper),
        Field::new("partsNeeded", List).required(),
        Field::new("preferredPickup", Date).required(),
        Field::new("preferredPickupOption", Text),
        Field::new("status", Status(RequestStatus::VALUES)),
    ];
    const LISTING: Listing = Listing {
        empty: EmptyResult::NotFoundBeyondFirstPage,
        ..Listing::DEFAULT
    };
}
