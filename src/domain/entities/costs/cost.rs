//! Cost Entity Implementation
//!
//! 머천트별 결제 비용(수수료) 테이블 엔티티입니다.
//!
//! 비용 레코드는 `{merchant_id, name, currency, region, country, mcc}`
//! 여섯 차원의 조합으로 조회됩니다. 국가 차원이 빈 문자열인 레코드는
//! 해당 지역의 국가 미지정 폴백으로 사용됩니다.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// 금액 구간별 수수료 항목
///
/// 하나의 비용 레코드는 거래 금액 구간마다 다른 수수료를 가질 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTariff {
    /// 이 구간이 적용되는 최소 거래 금액
    pub min_amount: f64,
    /// 정률 수수료 (0.0 ~ 1.0)
    pub percent_fee: f64,
    /// 정액 수수료
    pub fixed_fee: f64,
    /// 정액 수수료의 통화 코드
    pub fixed_fee_currency: String,
}

/// 비용 엔티티
///
/// 머천트의 결제 처리 비용을 차원 조합 단위로 저장합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// 소유 머천트 식별자
    pub merchant_id: String,
    /// 비용 항목 이름 (예: "processing")
    pub name: String,
    /// 거래 통화 코드
    pub currency: String,
    /// 지역 코드 (예: "EU")
    pub region: String,
    /// 국가 코드. 빈 문자열이면 지역 폴백 레코드
    pub country: String,
    /// Merchant Category Code
    pub mcc: String,
    /// 금액 구간별 수수료 목록
    pub tariffs: Vec<CostTariff>,
    /// 활성화 여부
    pub is_active: bool,
    /// 생성 시간
    pub created_at: DateTime,
    /// 수정 시간
    pub updated_at: DateTime,
}

impl Cost {
    /// 새 비용 레코드를 생성합니다. 활성화 상태로 시작합니다.
    pub fn new(
        merchant_id: String,
        name: String,
        currency: String,
        region: String,
        country: String,
        mcc: String,
        tariffs: Vec<CostTariff>,
    ) -> Self {
        let now = DateTime::now();

        Self {
            id: None,
            merchant_id,
            name,
            currency,
            region,
            country,
            mcc,
            tariffs,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// 이 레코드가 국가 미지정 폴백인지 확인합니다.
    pub fn is_country_fallback(&self) -> bool {
        self.country.is_empty()
    }
}
