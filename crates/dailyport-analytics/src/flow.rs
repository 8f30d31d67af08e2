//! 투자자별 수급 집계.
//!
//! 외국인/기관/연기금의 일자별 순매수 시계열에서 최근 5일/20일
//! 누적 순매수를 계산합니다. 시계열은 과거 → 최신 순서를
//! 가정하며, 길이가 윈도우보다 짧으면 있는 만큼만 합산합니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 단기 집계 윈도우 (일).
const SHORT_WINDOW: usize = 5;

/// 장기 집계 윈도우 (일).
const LONG_WINDOW: usize = 20;

/// 하루치 투자자별 순매수.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyBar {
    /// 거래일
    pub date: NaiveDate,
    /// 외국인 순매수
    pub foreigner: Decimal,
    /// 기관 순매수
    pub institution: Decimal,
    /// 연기금 순매수 (집계되지 않는 종목도 있음)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pension: Option<Decimal>,
}

impl SupplyBar {
    /// 새 수급 바를 생성합니다.
    pub fn new(date: NaiveDate, foreigner: Decimal, institution: Decimal) -> Self {
        Self {
            date,
            foreigner,
            institution,
            pension: None,
        }
    }

    /// 연기금 순매수를 설정합니다.
    pub fn with_pension(mut self, pension: Decimal) -> Self {
        self.pension = Some(pension);
        self
    }
}

/// 투자자별 수급 집계 결과.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FlowMetrics {
    /// 외국인 5일 순매수
    pub foreigner_5d_net: Decimal,
    /// 기관 5일 순매수
    pub institution_5d_net: Decimal,
    /// 외국인 20일 순매수
    pub foreigner_20d_net: Decimal,
    /// 기관 20일 순매수
    pub institution_20d_net: Decimal,
    /// 연기금 5일 순매수
    pub pension_5d_net: Decimal,
    /// 연기금 20일 순매수
    pub pension_20d_net: Decimal,
}

impl FlowMetrics {
    /// 수급 시계열(과거 → 최신)에서 집계를 계산합니다.
    pub fn from_series(bars: &[SupplyBar]) -> Self {
        let short = &bars[bars.len().saturating_sub(SHORT_WINDOW)..];
        let long = &bars[bars.len().saturating_sub(LONG_WINDOW)..];

        Self {
            foreigner_5d_net: short.iter().map(|b| b.foreigner).sum(),
            institution_5d_net: short.iter().map(|b| b.institution).sum(),
            foreigner_20d_net: long.iter().map(|b| b.foreigner).sum(),
            institution_20d_net: long.iter().map(|b| b.institution).sum(),
            pension_5d_net: short.iter().filter_map(|b| b.pension).sum(),
            pension_20d_net: long.iter().filter_map(|b| b.pension).sum(),
        }
    }

    /// 최근 5일간 외국인/기관 동반 순매수 여부.
    pub fn dual_accumulation(&self) -> bool {
        self.foreigner_5d_net > Decimal::ZERO && self.institution_5d_net > Decimal::ZERO
    }

    /// 최근 20일간 외국인 지속 순매수 여부.
    pub fn sustained_foreign_buying(&self) -> bool {
        self.foreigner_20d_net > Decimal::ZERO
    }
}
