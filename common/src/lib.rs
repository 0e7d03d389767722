pub mod context;
pub mod entities;
pub mod error;
pub mod form;
pub mod media;
pub mod query;
pub mod repository;
pub mod response;
pub mod schema;
pub mod services;
pub mod verification;
