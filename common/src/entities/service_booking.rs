use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    impl_entity,
    schema::{EmptyResult, Field, FieldKind::*, Listing, Pattern, Rule, Schema},
};

use super::RequestStatus;

/// A workshop appointment request. Stored in the `services` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBooking {
    pub id: ObjectId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub vehicle_year: i64,
    pub make: String,
    pub model: String,
    #[serde(rename = "VIN", default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    pub service_needed: String,
    pub preferred_date: DateTime,
    pub preferred_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
    #[serde(default)]
    pub status: RequestStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(ServiceBooking);

impl Schema for ServiceBooking {
    const LABEL: &'static str = "Service request";
    const COLLECTION: &'static str = "services";
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
        Field::new("serviceNeeded", Text).required(),
        Field::new("preferredDate", Date)
            .required()
            .rules(&[Rule::NotPast]),
        Field::new("preferredTime", Text).required(),
        Field::new("additionalNotes", Text).rules(&[Rule::MaxLength(500)]),
        Field::new("status", Status(RequestStatus::VALUES)),
    ];
    const LISTING: Listing = Listing {
        empty: EmptyResult::NotFoundBeyondFirstPage,
        ..Listing::DEFAULT
    };
}
