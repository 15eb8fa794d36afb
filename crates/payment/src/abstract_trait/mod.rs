pub mod auth;
pub mod order;
pub mod payment;
pub mod pi;
pub mod product;
pub mod user;
