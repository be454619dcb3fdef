pub mod catalog;
pub mod display;
pub mod filters;
pub mod handlers;
pub mod store;
