//! 캐시 계층 설정 관리 모듈
//!
//! 버전(네임스페이스) 개수 제한과 기본 TTL을 관리합니다.

use std::env;

/// 캐시 계층 설정
///
/// 빌링 서비스의 캐시는 만료 기반이 아니라 무효화 기반으로 운영되므로
/// 기본 TTL은 0(만료 없음)입니다. 버전 제한은 동시에 살아있을 수 있는
/// 캐시 세대(네임스페이스)의 수를 결정합니다.
pub struct CacheConfig;

impl CacheConfig {
    /// 동시에 유지할 수 있는 캐시 버전의 최대 개수를 반환합니다.
    ///
    /// 환경 변수 `CACHE_VERSION_LIMIT` (기본값: 3)
    ///
    /// 1 미만의 값이나 파싱 불가능한 값은 기본값으로 대체됩니다.
    pub fn version_limit() -> usize {
        if let Ok(raw) = env::var("CACHE_VERSION_LIMIT") {
            if let Ok(limit) = raw.parse::<usize>() {
                if limit >= 1 {
                    return limit;
                }
            }
        }

        3
    }

    /// 캐시 엔트리의 기본 TTL(초)을 반환합니다.
    ///
    /// 환경 변수 `CACHE_DEFAULT_TTL` (기본값: 0)
    ///
    /// 0은 만료 없음을 의미하며, 이 경우 엔트리는 명시적 무효화나
    /// 버전 축출에 의해서만 제거됩니다.
    pub fn default_ttl_seconds() -> u64 {
        env::var("CACHE_DEFAULT_TTL")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(0)
    }

    /// 현재 활성 캐시 버전의 이름을 반환합니다.
    ///
    /// 환경 변수 `CACHE_VERSION_NAME`
    /// (기본값: 오늘 날짜 기반 세대 태그, 예: "v20250815")
    ///
    /// 배포 세대마다 다른 이름을 지정하면 이전 세대의 캐시가
    /// 버전 제한에 따라 자동으로 축출됩니다.
    pub fn version_name() -> String {
        env::var("CACHE_VERSION_NAME")
            .unwrap_or_else(|_| format!("v{}", chrono::Utc::now().format("%Y%m%d")))
    }
}
