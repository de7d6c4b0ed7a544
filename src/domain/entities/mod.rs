//! 빌링 도메인 엔티티 모듈
//!
//! MongoDB 컬렉션에 저장되는 핵심 엔티티들을 정의합니다.

pub mod costs;
pub mod countries;
