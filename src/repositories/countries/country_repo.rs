//! # 국가 리포지토리 구현
//!
//! 국가 엔티티의 데이터 액세스 계층을 담당하는 리포지토리입니다.
//! MongoDB를 주 저장소로 사용하고, 버전 캐시를 통한 캐싱을 지원합니다.
//!
//! ## 캐싱 전략
//!
//! - **대표 키**: `country:{id}`
//! - **코드 조회 키**: `country:code:{code}`
//! - **목록 집계 키**: `country:all`
//! - **무효화 그룹**: 코드 키 + 목록 키. 국가 레코드가 바뀌면 함께 삭제됨
//!
//! 국가 데이터는 변경 빈도가 낮으므로 TTL 없이(기본값 0) 무효화 기반으로
//! 운영됩니다.

use std::sync::Arc;

use mongodb::Collection;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

use crate::caching::aside::{CacheAside, CacheKey};
use crate::caching::version::CacheVersion;
use crate::config::CacheConfig;
use crate::db::Database;
use crate::domain::entities::countries::country::Country;
use crate::errors::AppError;
use futures_util::TryStreamExt;

/// 국가 데이터 액세스 리포지토리
///
/// 모든 조회는 캐시 우선이며, 모든 변경은 무효화 그룹을 함께 정리합니다.
pub struct CountryRepository {
    /// MongoDB 데이터베이스 연결
    db: Arc<Database>,
    /// cache-aside 어댑터
    cache: CacheAside,
}

impl CountryRepository {
    /// 데이터베이스 연결과 캐시 버전으로 리포지토리를 생성합니다.
    pub fn new(db: Arc<Database>, version: Arc<CacheVersion>) -> Self {
        Self {
            db,
            cache: CacheAside::new(version, CacheConfig::default_ttl_seconds()),
        }
    }

    fn collection(&self) -> Collection<Country> {
        self.db.get_database().collection::<Country>("countries")
    }

    /// 대표 키: `country:{id}`
    fn id_key(id: &str) -> CacheKey {
        CacheKey::new("country").part(id)
    }

    /// 코드 조회 키: `country:code:{code}`
    fn code_key(code: &str) -> CacheKey {
        CacheKey::new("country").part("code").part(code)
    }

    /// 목록 집계 키: `country:all`
    fn all_key() -> CacheKey {
        CacheKey::new("country").part("all")
    }

    /// 이 레코드가 바뀔 때 함께 삭제해야 하는 파생 키들
    fn invalidation_group(country: &Country) -> Vec<CacheKey> {
        vec![Self::code_key(&country.code), Self::all_key()]
    }

    /// ID로 국가 조회
    ///
    /// # 반환값
    ///
    /// * `Ok(Some(Country))` - 국가를 찾은 경우
    /// * `Ok(None)` - 해당 ID의 국가가 없는 경우
    /// * `Err(AppError::ValidationError)` - 잘못된 ObjectId 형식
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Country>, AppError> {
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

    /// ISO 코드로 국가 조회
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Country>, AppError> {
        let collection = self.collection();
        let filter_code = code.to_string();

        self.cache
            .get_or_load(&Self::code_key(code), || async move {
                collection
                    .find_one(doc! { "code": filter_code, "is_active": true })
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))
            })
            .await
    }

    /// 활성화된 모든 국가 조회
    ///
    /// 목록 전체가 하나의 집계 키로 캐시됩니다. 어떤 국가든 변경되면
    /// 이 키가 무효화 그룹을 통해 함께 삭제됩니다.
    pub async fn find_all(&self) -> Result<Vec<Country>, AppError> {
        let collection = self.collection();

        let countries = self
            .cache
            .get_or_load(&Self::all_key(), || async move {
                let mut cursor = collection
                    .find(doc! { "is_active": true })
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;

                let mut countries = Vec::new();
                while let Some(country) = cursor
                    .try_next()
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?
                {
                    countries.push(country);
                }

                Ok(Some(countries))
            })
            .await?;

        Ok(countries.unwrap_or_default())
    }

    /// 새 국가 생성
    ///
    /// 코드 중복을 사전에 검증하고, 저장 성공 시 무효화 그룹을 정리한 뒤
    /// 대표 키를 새 값으로 채웁니다.
    ///
    /// # 반환값
    ///
    /// * `Ok(Country)` - 생성된 국가 (ID 포함)
    /// * `Err(AppError::ConflictError)` - 코드 중복
    pub async fn create(&self, mut country: Country) -> Result<Country, AppError> {
        if self.find_by_code(&country.code).await?.is_some() {
            return Err(AppError::ConflictError(
                "이미 등록된 국가 코드입니다".to_string(),
            ));
        }

        // 대표 키를 먼저 확정하기 위해 ID를 클라이언트에서 생성
        let object_id = ObjectId::new();
        country.id = Some(object_id);

        let canonical = Self::id_key(&object_id.to_hex());
        let group = Self::invalidation_group(&country);

        let collection = self.collection();
        let to_insert = country.clone();

        self.cache
            .write_and_invalidate(&canonical, &group, || async move {
                collection
                    .insert_one(&to_insert)
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;
                Ok(Some(to_insert))
            })
            .await?;

        Ok(country)
    }

    /// 국가 정보 부분 업데이트
    ///
    /// MongoDB `$set` 연산자로 지정된 필드만 변경하고, 변경 후 상태를
    /// 대표 키에 재적재합니다. 업데이트가 국가를 비활성화하면 대표 키는
    /// 재적재 대신 삭제됩니다.
    ///
    /// 코드가 변경되는 경우 이전 코드 키는 무효화 그룹으로 삭제되지만,
    /// 새 코드 키는 다음 조회에서 채워집니다.
    ///
    /// # 반환값
    ///
    /// * `Ok(Some(Country))` - 업데이트된 활성 국가
    /// * `Ok(None)` - 해당 ID의 국가가 없거나 비활성화됨
    pub async fn update(
        &self,
        id: &str,
        update_doc: mongodb::bson::Document,
    ) -> Result<Option<Country>, AppError> {
        let object_id = ObjectId::parse_str(id)
            .map_err(|_| AppError::ValidationError("유효하지 않은 ID 형식입니다".to_string()))?;

        // 무효화 그룹은 변경 전 상태 기준으로 구성
        let existing = self
            .collection()
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let canonical = Self::id_key(id);
        let group = Self::invalidation_group(&existing);

        let collection = self.collection();
        let mut update_doc = update_doc;
        update_doc.insert("updated_at", DateTime::now());

        self.cache
            .write_and_invalidate(&canonical, &group, || async move {
                let options = FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build();

                let updated = collection
                    .find_one_and_update(doc! { "_id": object_id }, doc! { "$set": update_doc })
                    .with_options(options)
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;

                // 비활성화된 엔티티는 대표 키에 남기지 않음
                Ok(updated.filter(|c| c.is_active))
            })
            .await
    }

    /// 국가 삭제
    ///
    /// 레코드를 영구 삭제하고 대표 키와 무효화 그룹을 모두 제거합니다.
    ///
    /// # 반환값
    ///
    /// * `Ok(true)` - 삭제됨
    /// * `Ok(false)` - 해당 ID의 국가가 존재하지 않음
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
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
            .write_and_invalidate::<Country, _, _>(&canonical, &group, || async move {
                collection
                    .find_one_and_delete(doc! { "_id": object_id })
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;

                // 삭제된 엔티티는 대표 키도 제거
                Ok(None)
            })
            .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_shapes() {
        assert_eq!(
            CountryRepository::id_key("507f1f77bcf86cd799439011").render(),
            "country:507f1f77bcf86cd799439011"
        );
        assert_eq!(CountryRepository::code_key("KR").render(), "country:code:KR");
        assert_eq!(CountryRepository::all_key().render(), "country:all");
    }

    #[test]
    fn test_invalidation_group_covers_derived_keys() {
        let country = Country::new(
            "KR".to_string(),
            "Korea".to_string(),
            "KRW".to_string(),
            0.1,
        );

        let group = CountryRepository::invalidation_group(&country);

        assert!(group.contains(&CountryRepository::code_key("KR")));
        assert!(group.contains(&CountryRepository::all_key()));
        assert_eq!(group.len(), 2);
    }
}
