pub mod completeness;
pub mod handlers;
pub mod otp;
pub mod password;
pub mod profile;
pub mod service;
pub mod session;
pub mod store;
