use async_trait::async_trait;
use redis::AsyncCommands;

use super::{CacheError, ReadThroughCache};

/// Redis-backed cache. Every write carries the configured TTL.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisCache {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    pub fn open(redis_url: &str, ttl_secs: u64) -> Result<Self, CacheError> {
        Ok(Self::new(redis::Client::open(redis_url)?, ttl_secs))
    }
}

#[async_trait]
impl ReadThroughCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.set_ex::<_, _, ()>(key, value, self.ttl_secs).await?;
        Ok(())
    }
}
