use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use glob::{Pattern, PatternError};
use tokio::time::Instant;

use super::{CacheError, CacheStore};

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-local cache store. Used by tests and single-instance deployments
/// that run without Redis.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let pattern = redis_pattern(pattern)?;
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired() && pattern.matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        let removed = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|(_, entry)| !entry.is_expired())
            .count();
        Ok(removed as u64)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}

/// Compiles a Redis `KEYS` pattern. Redis writes negated classes as `[^..]`
/// and escapes with a backslash; glob uses `[!..]` and bracketed literals.
fn redis_pattern(pattern: &str) -> Result<Pattern, PatternError> {
    let mut translated = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped @ ('*' | '?' | '[' | ']')) => {
                    translated.push('[');
                    translated.push(escaped);
                    translated.push(']');
                }
                Some(escaped) => translated.push(escaped),
                None => translated.push('\\'),
            },
            '[' => {
                translated.push('[');
                if chars.next_if_eq(&'^').is_some() {
                    translated.push('!');
                }
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => translated.extend(chars.next()),
                        ']' => {
                            translated.push(']');
                            break;
                        }
                        other => translated.push(other),
                    }
                }
            }
            other => translated.push(other),
        }
    }

    Pattern::new(&translated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set_ex("users:all", "[]", Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(store.get("users:all").await.unwrap().as_deref(), Some("[]"));

        tokio::time::advance(Duration::from_secs(301)).await;

        assert_eq!(store.get("users:all").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn keys_filters_by_pattern() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set_ex("users:all", "1", ttl).await.unwrap();
        store.set_ex("users:id:3", "2", ttl).await.unwrap();
        store.set_ex("products:all", "3", ttl).await.unwrap();

        let mut keys = store.keys("users:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, ["users:all", "users:id:3"]);

        assert_eq!(store.delete(&keys).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    fn matches(pattern: &str, key: &str) -> bool {
        redis_pattern(pattern).unwrap().matches(key)
    }

    #[test]
    fn redis_patterns_match_like_keys_does() {
        assert!(matches("users:*", "users:id:5"));
        assert!(matches("users:*", "users:"));
        assert!(!matches("users:*", "products:all"));
        assert!(matches("*", "products:user:3"));

        assert!(matches("users:id:?", "users:id:5"));
        assert!(!matches("users:id:?", "users:id:15"));

        assert!(matches("products:[^u]*", "products:all"));
        assert!(!matches("products:[^u]*", "products:user:2"));
        assert!(matches("users:id:[0-9]", "users:id:4"));

        assert!(matches(r"a\*b", "a*b"));
        assert!(!matches(r"a\*b", "axb"));
        assert!(!matches("users:all", "users:all:extra"));
    }

    #[tokio::test]
    async fn unclosed_class_is_an_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.keys("users:[").await,
            Err(CacheError::Pattern(_))
        ));
    }
}
