//! 애플리케이션 전역에서 사용하는 에러 시스템
//!
//! 빌링 데이터 백엔드를 위한 통합 에러 처리 시스템입니다.
//! `thiserror`를 사용하여 타입 안전하고 일관된 에러 처리를 제공합니다.
//!
//! ## 에러 분류
//!
//! | AppError | 의미 | 복구 가능성 |
//! |----------|------|-------------|
//! | `DatabaseError` | MongoDB 연결/쿼리 오류 | 재시도 가능 |
//! | `CacheError` | Redis 등 캐시 백엔드 접근 불가 | 읽기 경로에서는 미스로 강등 |
//! | `SerializationError` | 캐시 값 직렬화/역직렬화 실패 | 재시도 불가 |
//! | `ValidationError` | 잘못된 식별자 등 입력값 검증 실패 | 재시도 불가 |
//! | `NotFound` | 요청된 리소스가 존재하지 않음 | - |
//! | `ConflictError` | 중복 데이터 등 비즈니스 규칙 위반 | - |
//!
//! 캐시 **미스**는 에러가 아닙니다. 조회 계열 API는 미스를 `Ok(None)`으로
//! 표현하고, `CacheError`는 백엔드 자체에 접근할 수 없는 경우에만 사용합니다.
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use billing_data_backend::errors::AppError;
//!
//! async fn find_country(id: &str) -> Result<Option<Country>, AppError> {
//!     let object_id = ObjectId::parse_str(id)
//!         .map_err(|_| AppError::ValidationError("유효하지 않은 ID 형식입니다".to_string()))?;
//!     // ...
//!     Ok(None)
//! }
//! ```

use thiserror::Error;

/// 애플리케이션 전역 에러 타입
///
/// 백엔드 서비스에서 발생할 수 있는 모든 종류의 에러를 포괄하는 열거형입니다.
#[derive(Error, Debug)]
pub enum AppError {
    /// 데이터베이스 관련 에러
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// 캐시 백엔드 관련 에러 (연결 불가, 명령 실패)
    ///
    /// 키가 없는 것은 이 에러가 아니라 `Ok(None)`입니다.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// 캐시 값 직렬화/역직렬화 에러
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 입력값 검증 에러
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 리소스 찾을 수 없음 에러
    #[error("Not found: {0}")]
    NotFound(String),

    /// 충돌/중복 에러
    #[error("Conflict error: {0}")]
    ConflictError(String),
}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::CacheError(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::SerializationError(e.to_string())
    }
}

/// 편의성을 위한 Result 타입 별칭
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_category() {
        let error = AppError::CacheError("connection refused".to_string());
        assert!(error.to_string().starts_with("Cache error"));

        let error = AppError::ValidationError("bad id".to_string());
        assert!(error.to_string().contains("bad id"));
    }

    #[test]
    fn test_serde_json_error_converts_to_serialization_error() {
        let json_error = serde_json::from_str::<u32>("not-a-number").unwrap_err();
        let app_error: AppError = json_error.into();

        assert!(matches!(app_error, AppError::SerializationError(_)));
    }
}
