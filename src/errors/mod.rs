//! 애플리케이션 전역에서 사용하는 에러 시스템
//!
//! [`AppError`](errors::AppError)를 통해 데이터베이스, 캐시, 검증 에러를
//! 하나의 타입으로 통합합니다.

pub mod errors;

pub use errors::{AppError, AppResult};
