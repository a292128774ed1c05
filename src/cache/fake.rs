use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ApiError;

use super::CoordinationStore;

#[derive(Default)]
struct State {
    // Counters share the string keyspace, matching real Redis: `INCR`/`GET`
    // operate on the same key, `INCR` just interprets the bytes as an int.
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, i64>>,
    sets: HashMap<String, HashSet<String>>,
    lists: HashMap<String, VecDeque<String>>,
    locks: HashMap<String, String>,
    published: Vec<(String, String)>,
}

/// In-memory `CoordinationStore` double, so pool and quota unit tests run
/// without a live Redis. TTLs are accepted but not enforced; callers that
/// need expiry behavior in a test should assert on call arguments instead.
#[derive(Default)]
pub struct FakeCache {
    state: Mutex<State>,
}

impl FakeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().published.clone()
    }
}

#[async_trait]
impl CoordinationStore for FakeCache {
    async fn get_string(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.state.lock().unwrap().strings.get(key).cloned())
    }

    async fn set_string_ex(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<(), ApiError> {
        self.state
            .lock()
            .unwrap()
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.strings.remove(key);
        state.hashes.remove(key);
        state.sets.remove(key);
        state.lists.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, ApiError> {
        self.incr_by(key, 1).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ApiError> {
        let mut state = self.state.lock().unwrap();
        let entry = state.strings.entry(key.to_string()).or_insert_with(|| "0".to_string());
        let value: i64 = entry.parse().unwrap_or(0) + delta;
        *entry = value.to_string();
        Ok(value)
    }

    async fn incr_with_ttl_if_first(&self, key: &str, _ttl_secs: u64) -> Result<i64, ApiError> {
        self.incr(key).await
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> Result<i64, ApiError> {
        let mut state = self.state.lock().unwrap();
        let map = state.hashes.entry(key.to_string()).or_default();
        let value = map.entry(field.to_string()).or_insert(0);
        *value += delta;
        Ok(*value)
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .hashes
            .get(key)
            .map(|map| {
                map.iter()
                    .map(|(field, value)| (field.clone(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), ApiError> {
        self.state
            .lock()
            .unwrap()
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), ApiError> {
        if let Some(set) = self.state.lock().unwrap().sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, ApiError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .sets
            .get(key)
            .is_some_and(|set| set.contains(member)))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, ApiError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.state
            .lock()
            .unwrap()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn list_rotate_tail_to_head(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut state = self.state.lock().unwrap();
        let list = state.lists.entry(key.to_string()).or_default();
        let Some(value) = list.pop_back() else {
            return Ok(None);
        };
        list.push_front(value.clone());
        Ok(Some(value))
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<(), ApiError> {
        if let Some(list) = self.state.lock().unwrap().lists.get_mut(key) {
            list.retain(|item| item != value);
        }
        Ok(())
    }

    async fn list_to_vec(&self, key: &str) -> Result<Vec<String>, ApiError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn lock_acquire(&self, key: &str, holder: &str, _ttl_ms: u64) -> Result<bool, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.locks.contains_key(key) {
            return Ok(false);
        }
        state.locks.insert(key.to_string(), holder.to_string());
        Ok(true)
    }

    async fn lock_extend(&self, key: &str, holder: &str, _ttl_ms: u64) -> Result<bool, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(state.locks.get(key).is_some_and(|owner| owner == holder))
    }

    async fn lock_release(&self, key: &str, holder: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.locks.get(key).is_some_and(|owner| owner == holder) {
            state.locks.remove(key);
        }
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), ApiError> {
        self.state
            .lock()
            .unwrap()
            .published
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_acquire_is_exclusive() {
        let cache = FakeCache::new();
        assert!(cache.lock_acquire("k", "a", 1000).await.unwrap());
        assert!(!cache.lock_acquire("k", "b", 1000).await.unwrap());
        cache.lock_release("k", "a").await.unwrap();
        assert!(cache.lock_acquire("k", "b", 1000).await.unwrap());
    }

    #[tokio::test]
    async fn list_rotation_cycles_round_robin() {
        let cache = FakeCache::new();
        cache.list_push_back("pool", "one").await.unwrap();
        cache.list_push_back("pool", "two").await.unwrap();
        assert_eq!(
            cache.list_rotate_tail_to_head("pool").await.unwrap(),
            Some("two".to_string())
        );
        assert_eq!(
            cache.list_to_vec("pool").await.unwrap(),
            vec!["two".to_string(), "one".to_string()]
        );
    }

    #[tokio::test]
    async fn hincr_accumulates_per_field() {
        let cache = FakeCache::new();
        assert_eq!(cache.hincr("usage", "gpt-4o", 3).await.unwrap(), 3);
        assert_eq!(cache.hincr("usage", "gpt-4o", 2).await.unwrap(), 5);
    }
}
