pub mod bootstrap;
pub mod handlers;
pub mod store;
