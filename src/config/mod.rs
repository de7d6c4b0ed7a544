//! 애플리케이션 설정 관리 모듈
//!
//! 환경 변수 기반의 설정 읽기를 담당합니다.
//! 모든 설정은 기본값을 가지므로 별도 설정 없이도 개발 환경에서 동작합니다.

pub mod cache_config;
pub mod data_config;

pub use cache_config::CacheConfig;
pub use data_config::{DatabaseConfig, Environment, RedisConfig};
