pub mod auth;
pub mod event;
pub mod requests;
pub mod response;
pub mod status;
