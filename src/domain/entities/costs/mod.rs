//! 비용 엔티티 모듈

pub mod cost;
