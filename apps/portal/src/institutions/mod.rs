pub mod handlers;
pub mod profile;
pub mod reviews;
pub mod service;
pub mod store;
