//! 일봉 가격 바.
//!
//! 데이터 공급 협력자(시세 수집기)가 생성하는 불변 입력입니다.
//! 시계열은 항상 과거 → 최신 순서로 정렬되어 전달됩니다.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 티커 하나의 일자별 종가 시계열.
///
/// `BTreeMap`을 사용해 날짜 순회가 항상 오름차순으로 고정됩니다.
/// 리플레이 엔진의 "해당 일자 또는 다음 거래일" 조회가 `range`로
/// 바로 표현되고, 해시 순회 순서에 따른 비결정성이 없습니다.
pub type ClosePriceSeries = BTreeMap<NaiveDate, Decimal>;

/// 일봉 OHLCV 바.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl PriceBar {
    /// 새 가격 바를 생성합니다.
    pub fn new(
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 바의 전체 범위 (고가 - 저가).
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 몸통 크기 (시가/종가 차이의 절대값).
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 아래꼬리 길이 (min(시가, 종가) - 저가).
    pub fn lower_wick(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }

    /// 양봉 여부.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}
