mod error;
mod http;
mod provider;
mod repository;
mod service;

pub use self::error::ErrorResponse;
pub use self::http::HttpError;
pub use self::provider::ProviderError;
pub use self::repository::RepositoryError;
pub use self::service::ServiceError;
