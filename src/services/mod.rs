// Service exports
pub mod cache;
pub mod postgres;

pub use cache::{CacheError, CacheKey, CacheManager, CachedImageStore};
pub use postgres::{PostgresClient, PostgresError};
