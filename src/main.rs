//! 빌링 데이터 백엔드 캐시 버전 관리 도구
//!
//! MongoDB와 Redis 연결을 검증하고, 설정된 캐시 버전을 등록한 뒤
//! 버전 수 제한을 초과한 오래된 세대를 정리합니다.
//! 배포 세대 교체 시 한 번 실행되는 것을 전제로 합니다.

use std::sync::Arc;

use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};

use billing_data_backend::caching::redis::RedisStore;
use billing_data_backend::caching::version::CacheVersionRegistry;
use billing_data_backend::config::{CacheConfig, Environment};
use billing_data_backend::db::Database;
use billing_data_backend::errors::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    load_env_file();
    init_logging();

    info!(
        "🚀 빌링 데이터 백엔드 캐시 버전 관리 시작 (환경: {:?})",
        Environment::current()
    );

    // 데이터 스토어 연결 검증
    let _database = Arc::new(Database::new().await?);
    let store = Arc::new(RedisStore::new().await?);

    // 현재 세대 등록 - 제한 초과 시 가장 오래된 세대가 축출됨
    let registry = CacheVersionRegistry::new(store, CacheConfig::version_limit());
    let version = registry.register(&CacheConfig::version_name()).await;

    info!(
        "✅ 캐시 버전 활성화: {} (seq {}, 제한 {})",
        version.name(),
        version.sequence(),
        registry.version_limit()
    );

    // 이전 실행에서 축출에 실패한 세대가 남아 있으면 재시도
    registry.clean_oldest_version().await?;

    info!("✅ 살아있는 버전: {:?}", registry.live_versions());
    Ok(())
}

/// 환경별 설정 파일을 로드합니다
///
/// PROFILE 환경변수에 따라 적절한 .env 파일을 로드합니다.
///
/// # Environment Variables
///
/// * `PROFILE=dev` - .env.dev 파일 로드 (기본값)
/// * `PROFILE=prod` - .env.prod 파일 로드
/// * 기타 - 기본 .env 파일 로드
fn load_env_file() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "dev".to_string());

    match profile.as_str() {
        "prod" => match dotenv::from_filename(".env.prod") {
            Ok(_) => info!(".env.prod 파일 로드 됨"),
            Err(e) => error!(".env.prod 파일 로드 실패: {}", e),
        },
        "dev" => match dotenv::from_filename(".env.dev") {
            Ok(_) => info!(".env.dev 파일 로드 됨"),
            Err(e) => error!(".env.dev 파일 로드 실패: {}", e),
        },
        _ => {
            // 기본 .env 파일 로드
            dotenv().ok();
            info!("기본 .env 파일 로드");
        }
    }
}

/// 로깅 시스템을 초기화합니다
///
/// 환경변수 RUST_LOG를 기반으로 로깅 레벨을 설정합니다. 기본값은 info입니다.
fn init_logging() {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
}
