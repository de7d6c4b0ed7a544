//! # Redis 캐시 백엔드 구현
//!
//! 이 모듈은 Redis를 백엔드로 하는 [`KeyValueStore`] 구현을 제공합니다.
//!
//! ## 설계 철학
//!
//! - **비동기 우선**: 모든 작업이 async/await 기반으로 구현
//! - **에러 처리**: Result 타입을 통한 명시적 에러 핸들링
//! - **멱등 삭제**: 없는 키를 삭제해도 성공으로 처리
//!
//! ## 연결 관리
//!
//! Redis 연결은 멀티플렉싱을 사용하여 단일 TCP 연결에서
//! 여러 동시 요청을 효율적으로 처리합니다.

use async_trait::async_trait;
use log::info;
use redis::{AsyncCommands, Client};

use crate::config::RedisConfig;
use crate::errors::AppError;

use super::store::KeyValueStore;

/// Redis 기반 [`KeyValueStore`] 구현
///
/// ## 특징
///
/// - **연결 풀링**: 내부적으로 멀티플렉싱된 연결 사용
/// - **TTL 지원**: `SET EX`를 통한 키 단위 만료 시간
/// - **접두사 플러시**: `KEYS prefix*` + 일괄 `DEL`로 네임스페이스 제거
///
/// ## 사용 예제
///
/// ```rust,ignore
/// use billing_data_backend::caching::redis::RedisStore;
///
/// let store = RedisStore::new().await?;
/// store.set("v1:country:KR", json, 0).await?;
/// let cached = store.get("v1:country:KR").await?;
/// store.flush_prefix("v1:").await?;
/// ```
#[derive(Clone)]
pub struct RedisStore {
    /// 멀티플렉싱을 지원하는 Redis 클라이언트 인스턴스
    client: Client,
}

impl RedisStore {
    /// 새 Redis 백엔드 인스턴스를 생성합니다.
    ///
    /// 환경 변수 `REDIS_URL`에서 Redis 서버 주소를 읽어오며,
    /// 설정되지 않은 경우 기본값 `redis://localhost:6379`를 사용합니다.
    ///
    /// 생성 시 PING 명령으로 연결 테스트를 수행하여 Redis 서버의
    /// 가용성을 확인합니다.
    ///
    /// ## 에러 케이스
    ///
    /// - Redis 서버에 연결할 수 없는 경우
    /// - 잘못된 URL 형식
    /// - 인증 실패
    pub async fn new() -> Result<Self, AppError> {
        let redis_url = RedisConfig::url();

        let client = Client::open(redis_url)?;

        // 연결 테스트 - PING 명령으로 서버 가용성 확인
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;

        info!("✅ Redis 연결 성공");

        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// 패턴과 일치하는 키들을 검색합니다.
    ///
    /// ## ⚠️ 프로덕션 주의사항
    ///
    /// KEYS 명령은 블로킹 연산으로 Redis 서버 전체 성능에 영향을 줄 수
    /// 있습니다. 버전 축출은 배포 세대 교체 시에만 일어나는 저빈도
    /// 작업이므로 여기서는 허용합니다.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, AppError> {
        let mut conn = self.connection().await?;
        Ok(conn.keys(pattern).await?)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), AppError> {
        let mut conn = self.connection().await?;

        // TTL 0은 만료 없음
        if ttl_seconds == 0 {
            conn.set::<_, _, ()>(key, value).await?;
        } else {
            conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.connection().await?;

        // 삭제된 키 개수는 무시 - 없는 키 삭제도 성공
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), AppError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection().await?;
        conn.del::<_, ()>(keys).await?;
        Ok(())
    }

    async fn flush_prefix(&self, prefix: &str) -> Result<(), AppError> {
        let keys = self.keys(&format!("{}*", prefix)).await?;
        self.delete_many(&keys).await
    }
}
