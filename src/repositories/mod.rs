//! 데이터 액세스 계층을 담당하는 리포지토리 모듈
//!
//! MongoDB를 주 저장소로 사용하고 버전 캐시를 통한 캐싱을 지원합니다.
//! 모든 리포지토리는 같은 [`CacheAside`](crate::caching::aside::CacheAside)
//! 패턴을 적용하며, 의존성은 생성자 주입으로 전달됩니다.
//!
//! # Examples
//!
//! ```rust,ignore
//! use billing_data_backend::repositories::countries::country_repo::CountryRepository;
//!
//! let repo = CountryRepository::new(database.clone(), version.clone());
//! let country = repo.find_by_code("KR").await?;
//! ```

pub mod costs;
pub mod countries;
