mod jwt;
mod kafka;

pub use self::jwt::{DynJwtService, JwtServiceTrait};
pub use self::kafka::{DynKafka, KafkaTrait};
