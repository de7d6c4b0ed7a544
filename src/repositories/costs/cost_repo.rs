//! # 비용 리포지토리 구현
//!
//! 비용 엔티티의 데이터 액세스 계층을 담당하는 리포지토리입니다.
//! 여섯 차원 `{merchant_id, name, currency, region, country, mcc}` 조합으로
//! 조회되며, 국가 미지정 폴백 레코드를 지원합니다.
//!
//! ## 캐싱 전략
//!
//! - **대표 키**: `cost:{id}`
//! - **차원 조회 키**: `cost:{merchant}:{name}:{currency}:{region}:{country}:{mcc}`
//! - **폴백 변형 키**: 위와 동일하되 국가 세그먼트가 빈 문자열
//! - **머천트 집계 키**: `cost:merchant:{merchant_id}`
//!
//! 레코드가 바뀌면 차원 키, 폴백 변형 키, 집계 키가 하나의 무효화
//! 그룹으로 함께 삭제됩니다. 키 생성 함수를 읽기와 무효화 양쪽이
//! 공유하므로 템플릿이 어긋날 수 없습니다.
//!
//! ## 부분 변경 정책
//!
//! 수수료 항목 하나를 추가하는 변경은 집계 캐시를 갱신하지 않고
//! **삭제**합니다. 동시 쓰기 환경에서 캐시 병합 경쟁을 피하기 위한
//! 의도된 선택입니다.

use std::sync::Arc;

use mongodb::Collection;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use mongodb::options::{FindOneAndReplaceOptions, ReturnDocument};

use crate::caching::aside::{CacheAside, CacheKey};
use crate::caching::version::CacheVersion;
use crate::config::CacheConfig;
use crate::db::Database;
use crate::domain::entities::costs::cost::{Cost, CostTariff};
use crate::errors::AppError;
use futures_util::TryStreamExt;

/// 비용 조회에 사용되는 차원 조합
///
/// 조회와 무효화 양쪽에서 같은 키를 만들기 위한 값 타입입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct CostDimensions {
    pub merchant_id: String,
    pub name: String,
    pub currency: String,
    pub region: String,
    /// 빈 문자열이면 국가 미지정 폴백
    pub country: String,
    pub mcc: String,
}

impl CostDimensions {
    /// 국가 세그먼트를 빈 문자열로 바꾼 폴백 차원을 반환합니다.
    pub fn as_fallback(&self) -> Self {
        Self {
            country: String::new(),
            ..self.clone()
        }
    }

    fn from_cost(cost: &Cost) -> Self {
        Self {
            merchant_id: cost.merchant_id.clone(),
            name: cost.name.clone(),
            currency: cost.currency.clone(),
            region: cost.region.clone(),
            country: cost.country.clone(),
            mcc: cost.mcc.clone(),
        }
    }

    fn filter(&self) -> mongodb::bson::Document {
        doc! {
            "merchant_id": &self.merchant_id,
            "name": &self.name,
            "currency": &self.currency,
            "region": &self.region,
            "country": &self.country,
            "mcc": &self.mcc,
            "is_active": true,
        }
    }
}

/// 비용 데이터 액세스 리포지토리
pub struct CostRepository {
    /// MongoDB 데이터베이스 연결
    db: Arc<Database>,
    /// cache-aside 어댑터
    cache: CacheAside,
}

impl CostRepository {
    /// 데이터베이스 연결과 캐시 버전으로 리포지토리를 생성합니다.
    pub fn new(db: Arc<Database>, version: Arc<CacheVersion>) -> Self {
        Self {
            db,
            cache: CacheAside::new(version, CacheConfig::default_ttl_seconds()),
        }
    }

    fn collection(&self) -> Collection<Cost> {
        self.db.get_database().collection::<Cost>("costs")
    }

    /// 대표 키: `cost:{id}`
    fn id_key(id: &str) -> CacheKey {
        CacheKey::new("cost").part(id)
    }

    /// 차원 조회 키
    fn dims_key(dims: &CostDimensions) -> CacheKey {
        CacheKey::new("cost")
            .part(&dims.merchant_id)
            .part(&dims.name)
            .part(&dims.currency)
            .part(&dims.region)
            .part(&dims.country)
            .part(&dims.mcc)
    }

    /// 머천트 집계 키: `cost:merchant:{merchant_id}`
    fn merchant_key(merchant_id: &str) -> CacheKey {
        CacheKey::new("cost").part("merchant").part(merchant_id)
    }

    /// 이 레코드가 바뀔 때 함께 삭제해야 하는 파생 키들
    ///
    /// 차원 키, 국가 미지정 폴백 변형 키, 머천트 집계 키로 구성됩니다.
    /// 레코드 자체가 폴백이면 변형 키는 차원 키와 같으므로 한 번만
    /// 포함됩니다.
    fn invalidation_group(cost: &Cost) -> Vec<CacheKey> {
        let dims = CostDimensions::from_cost(cost);

        let mut group = vec![Self::dims_key(&dims)];
        if !cost.is_country_fallback() {
            group.push(Self::dims_key(&dims.as_fallback()));
        }
        group.push(Self::merchant_key(&cost.merchant_id));

        group
    }

    /// ID로 비용 조회
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Cost>, AppError> {
        let object_id = ObjectId::parse_str(id)
            .map_err(|_| AppError::ValidationError("유효하지 않은 ID 형식입니다".to_string()))?;

        let collection = self.collection();

        self.cache
            .get_or_load(&Self::id_key(id), || async move {
                collection
                    .find_one(doc! { "_id": object_id })
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))
            })
            .await
    }

    /// 차원 조합으로 비용 조회 (정확 일치)
    pub async fn find_by_dimensions(
        &self,
        dims: &CostDimensions,
    ) -> Result<Option<Cost>, AppError> {
        let collection = self.collection();
        let filter = dims.filter();

        self.cache
            .get_or_load(&Self::dims_key(dims), || async move {
                collection
                    .find_one(filter)
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))
            })
            .await
    }

    /// 차원 조합으로 비용 조회, 국가 폴백 포함
    ///
    /// 정확 일치 레코드가 없으면 국가 세그먼트를 빈 문자열로 바꾼
    /// 폴백 레코드를 한 번 더 조회합니다.
    pub async fn find_with_fallback(
        &self,
        dims: &CostDimensions,
    ) -> Result<Option<Cost>, AppError> {
        if let Some(cost) = self.find_by_dimensions(dims).await? {
            return Ok(Some(cost));
        }

        if dims.country.is_empty() {
            return Ok(None);
        }

        self.find_by_dimensions(&dims.as_fallback()).await
    }

    /// 머천트의 활성 비용 레코드 전체 조회
    pub async fn find_by_merchant(&self, merchant_id: &str) -> Result<Vec<Cost>, AppError> {
        let collection = self.collection();
        let filter_merchant = merchant_id.to_string();

        let costs = self
            .cache
            .get_or_load(&Self::merchant_key(merchant_id), || async move {
                let mut cursor = collection
                    .find(doc! { "merchant_id": filter_merchant, "is_active": true })
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;

                let mut costs = Vec::new();
                while let Some(cost) = cursor
                    .try_next()
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?
                {
                    costs.push(cost);
                }

                Ok(Some(costs))
            })
            .await?;

        Ok(costs.unwrap_or_default())
    }

    /// 새 비용 레코드 생성
    ///
    /// 같은 차원 조합의 활성 레코드가 이미 있으면 충돌로 처리합니다.
    pub async fn create(&self, mut cost: Cost) -> Result<Cost, AppError> {
        let dims = CostDimensions::from_cost(&cost);
        if self.find_by_dimensions(&dims).await?.is_some() {
            return Err(AppError::ConflictError(
                "이미 등록된 비용 차원 조합입니다".to_string(),
            ));
        }

        // 대표 키를 먼저 확정하기 위해 ID를 클라이언트에서 생성
        let object_id = ObjectId::new();
        cost.id = Some(object_id);

        let canonical = Self::id_key(&object_id.to_hex());
        let group = Self::invalidation_group(&cost);

        let collection = self.collection();
        let to_insert = cost.clone();

        self.cache
            .write_and_invalidate(&canonical, &group, || async move {
                collection
                    .insert_one(&to_insert)
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;
                Ok(Some(to_insert))
            })
            .await?;

        Ok(cost)
    }

    /// 비용 레코드 전체 교체
    ///
    /// 차원이 바뀔 수 있으므로 무효화 그룹은 교체 전 상태와 교체 후
    /// 상태의 파생 키를 모두 포함합니다.
    ///
    /// # 반환값
    ///
    /// * `Ok(Some(Cost))` - 교체된 활성 레코드
    /// * `Ok(None)` - 해당 ID의 레코드가 없거나 교체로 비활성화됨
    pub async fn replace(&self, id: &str, mut cost: Cost) -> Result<Option<Cost>, AppError> {
        let object_id = ObjectId::parse_str(id)
            .map_err(|_| AppError::ValidationError("유효하지 않은 ID 형식입니다".to_string()))?;

        let existing = self
            .collection()
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        cost.id = Some(object_id);
        cost.updated_at = DateTime::now();

        let canonical = Self::id_key(id);
        let mut group = Self::invalidation_group(&existing);
        for key in Self::invalidation_group(&cost) {
            if !group.contains(&key) {
                group.push(key);
            }
        }

        let collection = self.collection();
        let replacement = cost.clone();

        self.cache
            .write_and_invalidate(&canonical, &group, || async move {
                let options = FindOneAndReplaceOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build();

                let replaced = collection
                    .find_one_and_replace(doc! { "_id": object_id }, &replacement)
                    .with_options(options)
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;

                // 비활성화된 엔티티는 대표 키에 남기지 않음
                Ok(replaced.filter(|c| c.is_active))
            })
            .await
    }

    /// 비용 레코드 비활성화
    ///
    /// 레코드를 삭제하는 대신 비활성 상태로 전환합니다. 대표 키는
    /// 재적재되지 않고 삭제됩니다.
    ///
    /// # 반환값
    ///
    /// * `Ok(true)` - 비활성화됨
    /// * `Ok(false)` - 해당 ID의 레코드가 존재하지 않음
    pub async fn deactivate(&self, id: &str) -> Result<bool, AppError> {
        let object_id = ObjectId::parse_str(id)
            .map_err(|_| AppError::ValidationError("유효하지 않은 ID 형식입니다".to_string()))?;

        let existing = self
            .collection()
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let Some(existing) = existing else {
            return Ok(false);
        };

        let canonical = Self::id_key(id);
        let group = Self::invalidation_group(&existing);

        let collection = self.collection();

        self.cache
            .write_and_invalidate::<Cost, _, _>(&canonical, &group, || async move {
                collection
                    .update_one(
                        doc! { "_id": object_id },
                        doc! { "$set": { "is_active": false, "updated_at": DateTime::now() } },
                    )
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;

                // 비활성화 - 대표 키 삭제
                Ok(None)
            })
            .await?;

        Ok(true)
    }

    /// 수수료 항목 하나 추가 (부분 변경)
    ///
    /// 레코드의 `tariffs` 배열에 항목을 추가합니다. 대표 키와 파생 키를
    /// 모두 삭제만 하며 재적재하지 않습니다. 동시에 다른 항목을 추가하는
    /// 쓰기와 경쟁해도 캐시는 다음 읽기에서 원본 저장소의 최종 상태로
    /// 채워집니다.
    ///
    /// # 반환값
    ///
    /// * `Ok(true)` - 항목이 추가됨
    /// * `Ok(false)` - 해당 ID의 레코드가 존재하지 않음
    pub async fn add_tariff(&self, id: &str, tariff: CostTariff) -> Result<bool, AppError> {
        let object_id = ObjectId::parse_str(id)
            .map_err(|_| AppError::ValidationError("유효하지 않은 ID 형식입니다".to_string()))?;

        let existing = self
            .collection()
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let Some(existing) = existing else {
            return Ok(false);
        };

        let mut keys = vec![Self::id_key(id)];
        keys.extend(Self::invalidation_group(&existing));

        let tariff_bson = mongodb::bson::to_bson(&tariff)
            .map_err(|e| AppError::SerializationError(e.to_string()))?;

        let collection = self.collection();

        self.cache
            .mutate_and_evict(&keys, || async move {
                collection
                    .update_one(
                        doc! { "_id": object_id },
                        doc! {
                            "$push": { "tariffs": tariff_bson },
                            "$set": { "updated_at": DateTime::now() },
                        },
                    )
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;
                Ok(())
            })
            .await?;

        Ok(true)
    }
}
