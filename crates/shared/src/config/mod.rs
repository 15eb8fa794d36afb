mod database;
mod jwt;
mod kafka;
mod redis;

pub use self::database::{ConnectionManager, ConnectionPool};
pub use self::jwt::{ACCESS_TOKEN, Claims, JwtConfig};
pub use self::kafka::Kafka;
pub use self::redis::{RedisClient, RedisConfig};
