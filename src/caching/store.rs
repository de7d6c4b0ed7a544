//! 키-값 백엔드 최소 기능 trait
//!
//! 캐시 계층이 백엔드에 요구하는 능력은 Get/Set/Delete와 접두사 단위
//! 플러시뿐입니다. 와이어 프로토콜은 구현체의 몫입니다.

use async_trait::async_trait;

use crate::errors::AppError;

/// 원격 키-값 백엔드에 대한 최소 기능 인터페이스
///
/// 키는 네임스페이스가 접두사로 붙은 문자열이고, 값은 직렬화된 불투명
/// 블롭(JSON 문자열)입니다.
///
/// ## 계약
///
/// - 키가 없는 것은 `Ok(None)`입니다. `Err`는 백엔드에 접근할 수 없는
///   경우에만 반환하며, 호출자는 두 경우를 혼동해서는 안 됩니다.
/// - `delete`는 멱등합니다. 없는 키를 삭제해도 성공입니다.
/// - `ttl_seconds == 0`은 만료 없음을 의미합니다.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 지정된 키의 값을 조회합니다. 미스는 `Ok(None)`입니다.
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// 지정된 키에 값을 저장합니다. `ttl_seconds`가 0이면 만료 없이 저장됩니다.
    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), AppError>;

    /// 지정된 키를 삭제합니다. 없는 키에 대해서도 성공을 반환합니다.
    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// 여러 키를 한 번에 삭제합니다. 빈 목록은 즉시 성공입니다.
    async fn delete_many(&self, keys: &[String]) -> Result<(), AppError>;

    /// 접두사가 일치하는 모든 키를 제거합니다.
    ///
    /// 버전(네임스페이스) 축출에 사용됩니다.
    async fn flush_prefix(&self, prefix: &str) -> Result<(), AppError>;
}
