use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::ApiError;

use super::CoordinationStore;

/// `CoordinationStore` backed by a real Redis-compatible server via
/// `redis`'s auto-reconnecting `ConnectionManager`, cheaply cloneable so
/// every caller shares one underlying connection pool.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, ApiError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

const RELEASE_IF_OWNER: &str = r"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
";

const EXTEND_IF_OWNER: &str = r"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('pexpire', KEYS[1], ARGV[2])
else
    return 0
end
";

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_string_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, ApiError> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, 1).await?)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ApiError> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, delta).await?)
    }

    async fn incr_with_ttl_if_first(&self, key: &str, ttl_secs: u64) -> Result<i64, ApiError> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1).await?;
        if value == 1 {
            let _: () = conn.expire(key, ttl_secs as i64).await?;
        }
        Ok(value)
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> Result<i64, ApiError> {
        let mut conn = self.conn.clone();
        Ok(conn.hincr(key, field, delta).await?)
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, ApiError> {
        let mut conn = self.conn.clone();
        Ok(conn.hgetall(key).await?)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(key, member).await?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        let _: () = conn.srem(key, member).await?;
        Ok(())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        Ok(conn.sismember(key, member).await?)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, ApiError> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(key).await?)
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(key, value).await?;
        Ok(())
    }

    async fn list_rotate_tail_to_head(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("RPOPLPUSH")
            .arg(key)
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lrem(key, 0, value).await?;
        Ok(())
    }

    async fn list_to_vec(&self, key: &str) -> Result<Vec<String>, ApiError> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange(key, 0, -1).await?)
    }

    async fn lock_acquire(&self, key: &str, holder: &str, ttl_ms: u64) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(holder)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(result.is_some())
    }

    async fn lock_extend(&self, key: &str, holder: &str, ttl_ms: u64) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        let result: i64 = redis::Script::new(EXTEND_IF_OWNER)
            .key(key)
            .arg(holder)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await?;
        Ok(result == 1)
    }

    async fn lock_release(&self, key: &str, holder: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::Script::new(RELEASE_IF_OWNER)
            .key(key)
            .arg(holder)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        let _: () = conn.publish(channel, message).await?;
        Ok(())
    }
}
