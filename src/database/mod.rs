pub mod episode;
pub mod redis_connection;

pub use redis_connection::RedisDatabase;
