//! Country Entity Implementation
//!
//! 과금 계산의 기준이 되는 국가 정보 엔티티입니다.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// 국가 엔티티
///
/// ISO 3166-1 alpha-2 코드로 식별되는 국가 레코드입니다.
/// 통화와 부가세율은 과금 계산 시 조회됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// ISO 3166-1 alpha-2 코드 (unique)
    pub code: String,
    /// 국가 이름
    pub name: String,
    /// 기본 통화 코드 (ISO 4217)
    pub currency: String,
    /// 부가세율 (0.0 ~ 1.0)
    pub vat_rate: f64,
    /// 활성화 여부
    pub is_active: bool,
    /// 생성 시간
    pub created_at: DateTime,
    /// 수정 시간
    pub updated_at: DateTime,
}

impl Country {
    /// 새 국가 레코드를 생성합니다. 활성화 상태로 시작합니다.
    pub fn new(code: String, name: String, currency: String, vat_rate: f64) -> Self {
        let now = DateTime::now();

        Self {
            id: None,
            code,
            name,
            currency,
            vat_rate,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
