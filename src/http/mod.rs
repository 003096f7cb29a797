//! HTTP surface over the record store gateway

pub mod routes;

pub use routes::build_router;
