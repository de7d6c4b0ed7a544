//! Cache-aside 패턴 어댑터
//!
//! 모든 엔티티 리포지토리가 캐시 버전 위에 적용하는 공통 패턴입니다.
//!
//! - 읽기: 캐시 우선 조회, 미스 시 원본 저장소 로더 호출 후 best-effort 재적재
//! - 쓰기: 원본 저장소 변경 커밋 후 무효화 그룹 일괄 삭제, 대표 키 갱신
//! - 부분 변경: 집계 엔트리를 캐시 안에서 병합하지 않고 **삭제**
//!
//! ## 무효화 그룹
//!
//! 하나의 엔티티가 여러 파생 키(차원 조합 키, 폴백 변형 키, 목록 집계 키)로
//! 캐시되는 경우, 엔티티 변경 시 그 모든 키를 함께 삭제해야 합니다.
//! 쓰기 쪽과 무효화 쪽이 같은 [`CacheKey`] 생성 함수를 공유하므로
//! 키 템플릿이 어긋나는 버그가 생기지 않습니다.
//!
//! ## 쓰기 이후 캐시 실패 정책
//!
//! 원본 저장소 쓰기가 커밋된 뒤의 캐시 삭제/재적재 실패는
//! [`AppError::CacheError`]로 호출자에게 전달됩니다. `DatabaseError`와
//! 구분되는 변형이므로, 호출자는 이 에러를 받고 쓰기 자체를 재시도해서는
//! 안 됩니다. 정책 선택의 배경은 DESIGN.md를 참조하세요.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use log::{error, warn};
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::AppError;

use super::version::CacheVersion;

/// 구조화된 복합 캐시 키
///
/// 엔티티 태그와 차원 세그먼트의 순서 있는 목록으로 구성되며,
/// [`render`](Self::render)가 유일한 직렬화 지점입니다.
/// 빈 차원은 빈 세그먼트로 렌더링되어 폴백 변형 키
/// (예: `country=""`)를 자연스럽게 표현합니다.
///
/// ## 사용 예제
///
/// ```rust,ignore
/// let key = CacheKey::new("cost")
///     .part(&cost.merchant_id)
///     .part(&cost.name)
///     .part(&cost.currency)
///     .part(&cost.region)
///     .part(&cost.country)
///     .part(&cost.mcc);
/// // "cost:m42:processing:USD:EU:DE:5411"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    segments: Vec<String>,
}

impl CacheKey {
    /// 엔티티 태그로 키를 시작합니다.
    pub fn new(entity: &str) -> Self {
        Self {
            segments: vec![entity.to_string()],
        }
    }

    /// 차원 세그먼트를 추가합니다.
    pub fn part(mut self, value: impl fmt::Display) -> Self {
        self.segments.push(value.to_string());
        self
    }

    /// 백엔드 키 문자열로 렌더링합니다.
    pub fn render(&self) -> String {
        self.segments.join(":")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// 리포지토리가 사용하는 cache-aside 어댑터
///
/// 캐시 버전 하나와 기본 TTL을 묶어, 읽기/쓰기/무효화 경로를 제공합니다.
/// 캐시 엔트리의 상태는 Absent → Populated → Absent 뿐이며
/// "부분적으로 갱신된" 상태는 설계상 존재하지 않습니다.
pub struct CacheAside {
    version: Arc<CacheVersion>,
    ttl_seconds: u64,
}

impl CacheAside {
    /// 캐시 버전과 기본 TTL(초, 0 = 만료 없음)로 어댑터를 생성합니다.
    pub fn new(version: Arc<CacheVersion>, ttl_seconds: u64) -> Self {
        Self {
            version,
            ttl_seconds,
        }
    }

    /// 이 어댑터가 묶인 캐시 버전을 반환합니다.
    pub fn version(&self) -> &Arc<CacheVersion> {
        &self.version
    }

    /// 읽기 경로: 캐시 우선 조회, 미스 시 로더 호출
    ///
    /// 1. 캐시 히트면 로더를 호출하지 않고 즉시 반환합니다.
    /// 2. 백엔드 읽기 에러는 경고 로그 후 미스와 동일하게 처리합니다.
    ///    조회 호출자는 캐시 계층의 에러를 보지 않습니다.
    /// 3. 미스면 로더를 정확히 한 번 호출합니다.
    /// 4. 로더가 값을 반환하면 best-effort로 캐시에 저장합니다.
    ///    저장 실패는 로그만 남기고 읽기 결과에 영향을 주지 않습니다.
    /// 5. 로더 에러는 그대로 전파되며 캐시 쓰기는 일어나지 않습니다.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &CacheKey,
        loader: F,
    ) -> Result<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>, AppError>> + Send,
    {
        let rendered = key.render();

        match self.version.get::<T>(&rendered).await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) => warn!("캐시 조회 실패, 원본 저장소로 대체: {} ({})", rendered, e),
        }

        let loaded = loader().await?;

        if let Some(ref value) = loaded {
            if let Err(e) = self.version.set(&rendered, value, self.ttl_seconds).await {
                warn!("캐시 재적재 실패, 읽기 결과는 그대로 반환: {} ({})", rendered, e);
            }
        }

        Ok(loaded)
    }

    /// 쓰기 경로: 원본 저장소 변경 후 그룹 무효화와 대표 키 갱신
    ///
    /// 1. 뮤테이터를 먼저 실행합니다. 실패하면 캐시는 건드리지 않습니다.
    /// 2. 성공하면 무효화 그룹의 모든 키를 삭제합니다.
    /// 3. 뮤테이터가 `Some(엔티티)`를 반환하면 대표 키를 새 값으로
    ///    재적재하고, `None`(삭제/비활성화)이면 대표 키도 삭제합니다.
    /// 4. 2~3단계의 실패는 `CacheError`로 전파됩니다. 이 시점에 원본
    ///    저장소 쓰기는 이미 커밋되어 있습니다.
    pub async fn write_and_invalidate<T, F, Fut>(
        &self,
        canonical: &CacheKey,
        group: &[CacheKey],
        mutator: F,
    ) -> Result<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>, AppError>> + Send,
    {
        let result = mutator().await?;

        let group_keys: Vec<String> = group.iter().map(CacheKey::render).collect();
        if let Err(e) = self.version.del_multiple(&group_keys).await {
            error!("커밋된 쓰기 이후 그룹 무효화 실패: {}", e);
            return Err(e);
        }

        let canonical_key = canonical.render();
        let outcome = match result {
            Some(ref value) => self.version.set(&canonical_key, value, self.ttl_seconds).await,
            None => self.version.del(&canonical_key).await,
        };

        if let Err(e) = outcome {
            error!("커밋된 쓰기 이후 대표 키 갱신 실패: {} ({})", canonical_key, e);
            return Err(e);
        }

        Ok(result)
    }

    /// 부분 변경 경로: 변경 커밋 후 관련 키를 모두 삭제
    ///
    /// 엔티티의 일부 필드만 바뀌는 변경은 집계 엔트리를 캐시 안에서
    /// 병합하거나 변경 직후 상을 재적재하지 않습니다. 동시 쓰기가 서로 다른
    /// 필드 부분집합을 경쟁적으로 병합하면 캐시가 어느 커밋과도 일치하지
    /// 않는 값을 가질 수 있기 때문입니다. 삭제된 키는 다음 읽기에서
    /// 원본 저장소로부터 다시 채워집니다.
    pub async fn mutate_and_evict<T, F, Fut>(
        &self,
        keys: &[CacheKey],
        mutator: F,
    ) -> Result<T, AppError>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, AppError>> + Send,
    {
        let result = mutator().await?;

        let rendered: Vec<String> = keys.iter().map(CacheKey::render).collect();
        if let Err(e) = self.version.del_multiple(&rendered).await {
            error!("커밋된 변경 이후 캐시 삭제 실패: {}", e);
            return Err(e);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;
    use crate::caching::memory::MemoryStore;
    use crate::caching::store::KeyValueStore;
    use crate::caching::version::CacheVersionRegistry;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        code: String,
        rate: f64,
    }

    fn sample(code: &str, rate: f64) -> Sample {
        Sample {
            code: code.to_string(),
            rate,
        }
    }

    /// 쓰기/삭제 실패를 주입할 수 있는 테스트용 백엔드
    struct FaultyStore {
        inner: MemoryStore,
        fail_set: AtomicBool,
        fail_delete: AtomicBool,
    }

    impl FaultyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_set: AtomicBool::new(false),
                fail_delete: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for FaultyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), AppError> {
            if self.fail_set.load(Ordering::SeqCst) {
                return Err(AppError::CacheError("set unavailable".to_string()));
            }
            self.inner.set(key, value, ttl_seconds).await
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(AppError::CacheError("delete unavailable".to_string()));
            }
            self.inner.delete(key).await
        }

        async fn delete_many(&self, keys: &[String]) -> Result<(), AppError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(AppError::CacheError("delete unavailable".to_string()));
            }
            self.inner.delete_many(keys).await
        }

        async fn flush_prefix(&self, prefix: &str) -> Result<(), AppError> {
            self.inner.flush_prefix(prefix).await
        }
    }

    async fn memory_cache() -> CacheAside {
        let registry = CacheVersionRegistry::new(Arc::new(MemoryStore::new()), 3);
        CacheAside::new(registry.register("v1").await, 0)
    }

    #[test]
    fn test_cache_key_render_joins_segments() {
        let key = CacheKey::new("cost")
            .part("m42")
            .part("processing")
            .part("USD")
            .part("EU")
            .part("DE")
            .part("5411");

        assert_eq!(key.render(), "cost:m42:processing:USD:EU:DE:5411");
    }

    #[test]
    fn test_cache_key_renders_empty_fallback_dimension() {
        let key = CacheKey::new("cost")
            .part("m42")
            .part("processing")
            .part("USD")
            .part("EU")
            .part("")
            .part("5411");

        assert_eq!(key.render(), "cost:m42:processing:USD:EU::5411");
    }

    #[tokio::test]
    async fn test_hit_does_not_invoke_loader() {
        let cache = memory_cache().await;
        let key = CacheKey::new("country").part("KR");

        cache
            .version()
            .set(&key.render(), &sample("KR", 0.1), 0)
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let found = cache
            .get_or_load(&key, || async move {
                calls_in.fetch_add(1, Ordering::SeqCst);
                Ok(Some(sample("KR", 9.9)))
            })
            .await
            .unwrap();

        assert_eq!(found, Some(sample("KR", 0.1)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_miss_invokes_loader_exactly_once_and_populates() {
        let cache = memory_cache().await;
        let key = CacheKey::new("country").part("KR");

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let found = cache
            .get_or_load(&key, || async move {
                calls_in.fetch_add(1, Ordering::SeqCst);
                Ok(Some(sample("KR", 0.1)))
            })
            .await
            .unwrap();

        assert_eq!(found, Some(sample("KR", 0.1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // 재적재 확인
        let cached = cache
            .version()
            .get::<Sample>(&key.render())
            .await
            .unwrap();
        assert_eq!(cached, Some(sample("KR", 0.1)));
    }

    #[tokio::test]
    async fn test_set_failure_still_returns_loaded_value() {
        let store = Arc::new(FaultyStore::new());
        let registry = CacheVersionRegistry::new(store.clone(), 3);
        let cache = CacheAside::new(registry.register("v1").await, 0);
        let key = CacheKey::new("country").part("KR");

        store.fail_set.store(true, Ordering::SeqCst);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();

        let found = cache
            .get_or_load(&key, || async move {
                calls_in.fetch_add(1, Ordering::SeqCst);
                Ok(Some(sample("KR", 0.1)))
            })
            .await
            .unwrap();

        // 캐시 저장 실패에도 로더 결과는 그대로 반환
        assert_eq!(found, Some(sample("KR", 0.1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.fail_set.store(false, Ordering::SeqCst);
        assert_eq!(
            cache.version().get::<Sample>(&key.render()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_loader_none_is_not_cached() {
        let cache = memory_cache().await;
        let key = CacheKey::new("country").part("XX");

        let found: Option<Sample> = cache
            .get_or_load(&key, || async move { Ok(None) })
            .await
            .unwrap();

        assert_eq!(found, None);
        assert_eq!(
            cache.version().get::<Sample>(&key.render()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_loader_error_propagates_without_cache_write() {
        let cache = memory_cache().await;
        let key = CacheKey::new("country").part("KR");

        let result: Result<Option<Sample>, AppError> = cache
            .get_or_load(&key, || async move {
                Err(AppError::DatabaseError("connection reset".to_string()))
            })
            .await;

        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(
            cache.version().get::<Sample>(&key.render()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_grouped_invalidation_refreshes_canonical() {
        let cache = memory_cache().await;

        let canonical = CacheKey::new("country").part("id-1");
        let group = vec![
            CacheKey::new("country").part("code").part("KR"),
            CacheKey::new("country").part("all"),
        ];

        // 이전 세대 값으로 모든 키를 채워둠
        cache
            .version()
            .set(&canonical.render(), &sample("KR", 0.1), 0)
            .await
            .unwrap();
        for key in &group {
            cache
                .version()
                .set(&key.render(), &sample("KR", 0.1), 0)
                .await
                .unwrap();
        }

        let updated = cache
            .write_and_invalidate(&canonical, &group, || async move {
                Ok(Some(sample("KR", 0.2)))
            })
            .await
            .unwrap();

        assert_eq!(updated, Some(sample("KR", 0.2)));

        // 그룹 키는 모두 미스 - 다음 읽기가 재계산을 강제
        for key in &group {
            assert_eq!(
                cache.version().get::<Sample>(&key.render()).await.unwrap(),
                None
            );
        }

        // 대표 키는 갱신된 값
        assert_eq!(
            cache
                .version()
                .get::<Sample>(&canonical.render())
                .await
                .unwrap(),
            Some(sample("KR", 0.2))
        );
    }

    #[tokio::test]
    async fn test_deactivation_deletes_canonical_key() {
        let cache = memory_cache().await;

        let canonical = CacheKey::new("country").part("id-1");
        let group = vec![CacheKey::new("country").part("all")];

        cache
            .version()
            .set(&canonical.render(), &sample("KR", 0.1), 0)
            .await
            .unwrap();

        let removed: Option<Sample> = cache
            .write_and_invalidate(&canonical, &group, || async move { Ok(None) })
            .await
            .unwrap();

        assert_eq!(removed, None);
        assert_eq!(
            cache
                .version()
                .get::<Sample>(&canonical.render())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_mutator_failure_leaves_cache_untouched() {
        let cache = memory_cache().await;

        let canonical = CacheKey::new("country").part("id-1");
        let group = vec![CacheKey::new("country").part("all")];

        cache
            .version()
            .set(&group[0].render(), &sample("KR", 0.1), 0)
            .await
            .unwrap();

        let result: Result<Option<Sample>, AppError> = cache
            .write_and_invalidate(&canonical, &group, || async move {
                Err(AppError::DatabaseError("write conflict".to_string()))
            })
            .await;

        assert!(matches!(result, Err(AppError::DatabaseError(_))));

        // 뮤테이터 실패 시 기존 캐시는 그대로
        assert_eq!(
            cache
                .version()
                .get::<Sample>(&group[0].render())
                .await
                .unwrap(),
            Some(sample("KR", 0.1))
        );
    }

    #[tokio::test]
    async fn test_invalidation_failure_after_commit_surfaces_cache_error() {
        let store = Arc::new(FaultyStore::new());
        let registry = CacheVersionRegistry::new(store.clone(), 3);
        let cache = CacheAside::new(registry.register("v1").await, 0);

        let canonical = CacheKey::new("country").part("id-1");
        let group = vec![CacheKey::new("country").part("all")];

        store.fail_delete.store(true, Ordering::SeqCst);

        let committed = Arc::new(AtomicBool::new(false));
        let committed_in = committed.clone();

        let result = cache
            .write_and_invalidate(&canonical, &group, || async move {
                committed_in.store(true, Ordering::SeqCst);
                Ok(Some(sample("KR", 0.2)))
            })
            .await;

        // 원본 쓰기는 커밋되었지만 캐시 정리 실패가 CacheError로 전달됨
        assert!(committed.load(Ordering::SeqCst));
        assert!(matches!(result, Err(AppError::CacheError(_))));
    }

    #[tokio::test]
    async fn test_fragment_update_evicts_without_repopulating() {
        let cache = memory_cache().await;

        let canonical = CacheKey::new("cost").part("id-1");
        let aggregate = CacheKey::new("cost").part("merchant").part("m42");

        cache
            .version()
            .set(&canonical.render(), &sample("old", 0.1), 0)
            .await
            .unwrap();
        cache
            .version()
            .set(&aggregate.render(), &sample("old", 0.1), 0)
            .await
            .unwrap();

        let keys = vec![canonical.clone(), aggregate.clone()];
        let touched = cache
            .mutate_and_evict(&keys, || async move { Ok(true) })
            .await
            .unwrap();

        assert!(touched);

        // 재적재 없이 삭제만 - 다음 읽기가 원본에서 다시 채움
        assert_eq!(
            cache
                .version()
                .get::<Sample>(&canonical.render())
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            cache
                .version()
                .get::<Sample>(&aggregate.render())
                .await
                .unwrap(),
            None
        );
    }
}
