//! 국가 엔티티 모듈

pub mod country;
