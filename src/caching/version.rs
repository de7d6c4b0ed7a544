//! 캐시 버전(네임스페이스) 관리
//!
//! 빌링 서비스의 캐시는 배포 세대 단위의 **버전**으로 분할됩니다.
//! 각 버전은 독립적으로 플러시 가능한 키 공간이며,
//! [`CacheVersionRegistry`]가 동시에 살아있는 버전의 수를 제한합니다.
//! 제한을 초과하면 가장 오래된 버전이 축출(플러시 후 제거)됩니다.
//!
//! ## 축출 순서 보장
//!
//! 축출은 항상 플러시가 성공한 뒤에만 버전을 레지스트리에서 제거합니다
//! (flush-then-forget). 플러시가 실패하면 버전은 살아있는 상태로 남아
//! 다음 호출에서 재시도됩니다. 따라서 축출이 오래된 데이터를 보이는 채로
//! 버전만 잊어버리는 일은 없습니다.
//!
//! 막 축출된 버전 핸들을 들고 있던 독자의 조회는 일반적인 캐시 미스로
//! 처리되며, 에러가 아닙니다.

use std::sync::{Arc, RwLock};

use log::{error, info};
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::AppError;

use super::store::KeyValueStore;

/// 독립적으로 플러시 가능한 캐시 네임스페이스 하나
///
/// 모든 키에 `"{name}:"` 접두사를 적용하여 백엔드 키 공간을 분할합니다.
/// 값은 JSON으로 직렬화되어 저장됩니다.
pub struct CacheVersion {
    /// 버전 이름 (예: 배포 세대 태그)
    name: String,
    /// 생성 순서. 레지스트리 내에서 단조 증가
    sequence: u64,
    /// 공유 백엔드 핸들
    store: Arc<dyn KeyValueStore>,
}

impl CacheVersion {
    pub(crate) fn new(name: &str, sequence: u64, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            name: name.to_string(),
            sequence,
            store,
        }
    }

    /// 버전 이름을 반환합니다.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 생성 순서 번호를 반환합니다.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}:{}", self.name, key)
    }

    /// 이 버전에서 값을 조회합니다. 미스는 `Ok(None)`입니다.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let value = self.store.get(&self.prefixed(key)).await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// 이 버전에 값을 저장합니다. `ttl_seconds`가 0이면 만료 없이 저장됩니다.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<(), AppError> {
        let json = serde_json::to_string(value)?;
        self.store.set(&self.prefixed(key), json, ttl_seconds).await
    }

    /// 이 버전에서 키를 삭제합니다. 없는 키 삭제도 성공입니다.
    pub async fn del(&self, key: &str) -> Result<(), AppError> {
        self.store.delete(&self.prefixed(key)).await
    }

    /// 이 버전에서 여러 키를 한 번에 삭제합니다.
    pub async fn del_multiple(&self, keys: &[String]) -> Result<(), AppError> {
        let prefixed: Vec<String> = keys.iter().map(|k| self.prefixed(k)).collect();
        self.store.delete_many(&prefixed).await
    }

    /// 이 버전의 모든 키를 제거합니다.
    pub async fn clean(&self) -> Result<(), AppError> {
        self.store.flush_prefix(&format!("{}:", self.name)).await
    }
}

struct RegistryState {
    /// 살아있는 버전들. 생성 순서대로 저장
    versions: Vec<Arc<CacheVersion>>,
    /// 다음에 부여할 생성 순서 번호
    next_sequence: u64,
}

/// 살아있는 캐시 버전의 집합과 그 수명을 관리하는 레지스트리
///
/// 모든 리포지토리가 하나의 레지스트리 인스턴스를 공유합니다.
/// 전역 싱글톤이 아니라 생성자 주입으로 전달됩니다.
///
/// ## 불변식
///
/// - 살아있는 버전은 어느 순간에도 최대 `version_limit + 1`개입니다.
///   제한을 초과하게 만든 등록 호출이 동기적으로 축출을 수행하며,
///   등록-축출 시퀀스 전체가 등록 게이트(비동기 뮤텍스)로 직렬화되므로
///   앞선 등록의 플러시가 진행 중인 동안 다음 등록이 끼어들 수 없습니다.
/// - 동시 등록 시 생성 순서는 게이트 획득 순서를 따릅니다 (먼저 온 쪽이 더 오래됨).
/// - 동기 락(`RwLock`)을 잡은 채로 백엔드 I/O를 수행하지 않습니다.
///   플러시 I/O 동안 잡고 있는 것은 등록 게이트뿐이며, 조회
///   ([`live_versions`](Self::live_versions) 등)는 게이트 없이 진행됩니다.
pub struct CacheVersionRegistry {
    store: Arc<dyn KeyValueStore>,
    version_limit: usize,
    /// 등록과 축출을 직렬화하는 게이트. 플러시 I/O를 포함하므로 비동기 뮤텍스
    registration: tokio::sync::Mutex<()>,
    state: RwLock<RegistryState>,
}

impl CacheVersionRegistry {
    /// 새 레지스트리를 생성합니다.
    ///
    /// `version_limit`은 동시에 유지할 수 있는 버전의 최대 개수입니다.
    pub fn new(store: Arc<dyn KeyValueStore>, version_limit: usize) -> Self {
        Self {
            store,
            version_limit,
            registration: tokio::sync::Mutex::new(()),
            state: RwLock::new(RegistryState {
                versions: Vec::new(),
                next_sequence: 0,
            }),
        }
    }

    /// 설정된 버전 수 제한을 반환합니다.
    pub fn version_limit(&self) -> usize {
        self.version_limit
    }

    /// 이름으로 버전을 등록하거나 기존 버전을 반환합니다.
    ///
    /// 새 버전 등록으로 살아있는 버전 수가 제한을 초과하면 가장 오래된
    /// 버전을 즉시 축출합니다. 축출 플러시가 실패하면 에러 로그만 남기고
    /// 등록 자체는 성공합니다. 실패한 버전은 살아있는 상태로 유지되어
    /// 다음 등록이나 [`clean_oldest_version`](Self::clean_oldest_version)
    /// 호출에서 재시도됩니다.
    pub async fn register(&self, name: &str) -> Arc<CacheVersion> {
        let _gate = self.registration.lock().await;

        {
            let state = self.state.read().unwrap();
            if let Some(existing) = state.versions.iter().find(|v| v.name() == name) {
                return existing.clone();
            }
        }

        // 이전 호출에서 축출에 실패한 초과 세대가 남아 있으면 삽입 전에 재시도
        while self.over_limit() {
            if let Err(e) = self.clean_oldest_locked().await {
                error!("캐시 버전 축출 실패, 다음 호출에서 재시도: {}", e);
                break;
            }
        }

        let (version, needs_eviction) = {
            let mut state = self.state.write().unwrap();

            let sequence = state.next_sequence;
            state.next_sequence += 1;

            let version = Arc::new(CacheVersion::new(name, sequence, self.store.clone()));
            state.versions.push(version.clone());

            info!("캐시 버전 등록: {} (seq {})", name, sequence);

            (version, state.versions.len() > self.version_limit)
        };

        if needs_eviction {
            if let Err(e) = self.clean_oldest_locked().await {
                error!("캐시 버전 축출 실패, 다음 호출에서 재시도: {}", e);
            }
        }

        version
    }

    fn over_limit(&self) -> bool {
        let state = self.state.read().unwrap();
        state.versions.len() > self.version_limit
    }

    /// 가장 오래된 버전을 축출합니다.
    ///
    /// 살아있는 버전 수가 제한 이하이면 아무 것도 하지 않고 성공을
    /// 반환합니다. 초과 상태라면 생성 순서가 가장 작은 버전을 플러시한 뒤
    /// 레지스트리에서 제거합니다. 플러시가 실패하면 그 에러를 반환하고
    /// 버전은 살아있는 상태로 남습니다.
    pub async fn clean_oldest_version(&self) -> Result<(), AppError> {
        let _gate = self.registration.lock().await;
        self.clean_oldest_locked().await
    }

    /// 등록 게이트를 잡은 호출자 전용 축출 본체
    async fn clean_oldest_locked(&self) -> Result<(), AppError> {
        let oldest = {
            let state = self.state.read().unwrap();

            if state.versions.len() <= self.version_limit {
                return Ok(());
            }

            state
                .versions
                .iter()
                .min_by_key(|v| v.sequence())
                .cloned()
        };

        let Some(oldest) = oldest else {
            return Ok(());
        };

        // flush-then-forget: 플러시 성공 전에는 레지스트리에서 제거하지 않음
        oldest.clean().await?;

        let mut state = self.state.write().unwrap();
        state.versions.retain(|v| v.sequence() != oldest.sequence());

        info!("캐시 버전 축출 완료: {}", oldest.name());
        Ok(())
    }

    /// 살아있는 모든 버전을 플러시하고 제거합니다.
    ///
    /// 생성 순서대로 처리하며, 플러시에 실패한 버전과 그 이후 버전은
    /// 살아있는 상태로 남습니다.
    pub async fn clean_all(&self) -> Result<(), AppError> {
        let _gate = self.registration.lock().await;

        loop {
            let next = {
                let state = self.state.read().unwrap();
                state.versions.iter().min_by_key(|v| v.sequence()).cloned()
            };

            let Some(version) = next else {
                return Ok(());
            };

            version.clean().await?;

            let mut state = self.state.write().unwrap();
            state.versions.retain(|v| v.sequence() != version.sequence());
        }
    }

    /// 살아있는 버전의 이름을 생성 순서대로 반환합니다.
    pub fn live_versions(&self) -> Vec<String> {
        let state = self.state.read().unwrap();
        state.versions.iter().map(|v| v.name().to_string()).collect()
    }
}
