//! 인메모리 캐시 백엔드
//!
//! Redis 서버 없이 동작해야 하는 테스트와 로컬 개발을 위한
//! [`KeyValueStore`] 구현입니다. TTL은 조회 시점에 지연 평가됩니다.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::errors::AppError;

use super::store::KeyValueStore;

/// 저장된 엔트리 하나
struct Entry {
    value: String,
    /// 만료 시각. `None`은 만료 없음
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }
}

/// 인메모리 [`KeyValueStore`] 구현
///
/// RwLock으로 보호되는 해시맵 위에 동작하며, Redis 백엔드와 동일한
/// 계약(미스 = `Ok(None)`, 멱등 삭제, TTL 0 = 만료 없음)을 따릅니다.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// 빈 인메모리 스토어를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 살아있는 (만료되지 않은) 엔트리 개수를 반환합니다.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap();
        entries.values().filter(|e| !e.is_expired()).count()
    }

    /// 스토어가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self.entries.read().unwrap();

        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), AppError> {
        let expires_at = if ttl_seconds == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(ttl_seconds))
        };

        let mut entries = self.entries.write().unwrap();
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), AppError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries.write().unwrap();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn flush_prefix(&self, prefix: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().unwrap();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}
