//! 빌링 데이터 백엔드
//!
//! MongoDB 컬렉션을 감싸는 엔티티 리포지토리들과, 그 위의 버전 캐시
//! 계층을 제공하는 빌링 도메인 데이터 백엔드입니다.
//!
//! # Features
//!
//! - **버전 캐시**: 배포 세대 단위로 플러시 가능한 캐시 네임스페이스
//! - **버전 수 제한**: 가장 오래된 세대의 자동 축출
//! - **Cache-aside 패턴**: 캐시 우선 조회, 미스 시 MongoDB 폴백
//! - **그룹 무효화**: 엔티티 변경 시 파생 키 일괄 삭제
//! - **MongoDB**: 엔티티 영구 저장
//! - **Redis**: 캐시 백엔드
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │    Repositories      │ ← 엔티티별 데이터 액세스
//! └──────────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │      CacheAside      │ ← 읽기/쓰기/무효화 경로
//! └──────────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ CacheVersionRegistry │ ← 버전 수명 관리 및 축출
//! └──────────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │    KeyValueStore     │ ← Redis / 인메모리 백엔드
//! └──────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use billing_data_backend::caching::redis::RedisStore;
//! use billing_data_backend::caching::version::CacheVersionRegistry;
//! use billing_data_backend::config::CacheConfig;
//! use billing_data_backend::db::Database;
//! use billing_data_backend::repositories::countries::country_repo::CountryRepository;
//!
//! let database = Arc::new(Database::new().await?);
//! let store = Arc::new(RedisStore::new().await?);
//! let registry = CacheVersionRegistry::new(store, CacheConfig::version_limit());
//! let version = registry.register(&CacheConfig::version_name()).await;
//!
//! let countries = CountryRepository::new(database, version);
//! let korea = countries.find_by_code("KR").await?;
//! ```

pub mod caching;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod repositories;
