pub mod dealership;
pub mod resource;
