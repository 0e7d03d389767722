pub mod business;
pub mod contact;
pub mod dealership;
pub mod part;
pub mod post;
pub mod service_booking;
pub mod special_offer;
pub mod vehicle;
pub mod weekly_special;

use serde::{Deserialize, Serialize};

#[macro_export]
macro_rules! impl_entity {
    ($name:ident) => {
        impl $crate::repository::Entity for $name {
            fn id(&self) -> mongodb::bson::oid::ObjectId {
                self.id
            }
        }
    };
}

/// Workflow state shared by parts and service requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl RequestStatus {
    pub const VALUES: &'static [&'static str] = &["pending", "confirmed", "cancelled", "completed"];
}
