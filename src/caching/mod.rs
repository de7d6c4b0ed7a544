//! 캐싱 계층 모듈
//!
//! Redis를 백엔드로 하는 버전(세대) 단위 캐시 계층을 제공합니다.
//!
//! # 구성 요소
//!
//! - [`store::KeyValueStore`] - 키-값 백엔드 최소 기능 trait
//! - [`redis::RedisStore`] - Redis 기반 백엔드 구현
//! - [`memory::MemoryStore`] - 테스트/로컬 개발용 인메모리 백엔드
//! - [`version::CacheVersion`] - 독립적으로 플러시 가능한 네임스페이스
//! - [`version::CacheVersionRegistry`] - 버전 수 제한과 축출 정책
//! - [`aside::CacheAside`] - 리포지토리가 적용하는 cache-aside 패턴
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use billing_data_backend::caching::redis::RedisStore;
//! use billing_data_backend::caching::version::CacheVersionRegistry;
//! use billing_data_backend::caching::aside::{CacheAside, CacheKey};
//!
//! let store = Arc::new(RedisStore::new().await?);
//! let registry = CacheVersionRegistry::new(store, 3);
//! let version = registry.register("v20250815").await;
//!
//! let cache = CacheAside::new(version, 0);
//! let key = CacheKey::new("country").part("KR");
//! let country = cache.get_or_load(&key, || async { load_from_mongo().await }).await?;
//! ```

pub mod aside;
pub mod memory;
pub mod redis;
pub mod store;
pub mod version;
