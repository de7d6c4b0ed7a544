//! 빌링 도메인 모델 모듈

pub mod entities;
