//! 기록된 전략 픽.
//!
//! 스크리닝 협력자가 하루 단위로 저장한 추천 종목 목록입니다.
//! 리플레이 엔진은 이 기록을 과거 → 최신 순으로 재생합니다.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// 픽에 첨부된 종목별 브래킷 목표가.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickTargets {
    /// 1차 목표가 (부분 익절)
    pub target1: Decimal,
    /// 2차 목표가 (전량 익절). 없으면 1차의 110%로 간주
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target2: Option<Decimal>,
}

impl PickTargets {
    /// 두 목표가를 모두 지정해 생성합니다.
    pub fn new(target1: Decimal, target2: Decimal) -> Self {
        Self {
            target1,
            target2: Some(target2),
        }
    }

    /// 1차 목표가만 지정해 생성합니다.
    pub fn single(target1: Decimal) -> Self {
        Self {
            target1,
            target2: None,
        }
    }

    /// 2차 목표가. 명시되지 않았으면 1차 목표가의 110%.
    pub fn second_target(&self) -> Decimal {
        self.target2.unwrap_or(self.target1 * dec!(1.10))
    }
}

/// 하루치 전략 픽 기록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPick {
    /// 시그널 일자
    pub date: NaiveDate,
    /// 전략 이름
    pub strategy_name: String,
    /// 추천 종목 (순위 순서 유지)
    pub tickers: Vec<String>,
    /// 종목별 목표가 (선택)
    #[serde(default)]
    pub targets: HashMap<String, PickTargets>,
}

impl StrategyPick {
    /// 새 픽 기록을 생성합니다.
    pub fn new(strategy_name: impl Into<String>, date: NaiveDate, tickers: Vec<String>) -> Self {
        Self {
            date,
            strategy_name: strategy_name.into(),
            tickers,
            targets: HashMap::new(),
        }
    }

    /// 종목별 목표가를 추가합니다.
    pub fn with_targets(mut self, ticker: impl Into<String>, targets: PickTargets) -> Self {
        self.targets.insert(ticker.into(), targets);
        self
    }

    /// 특정 종목의 목표가를 조회합니다.
    pub fn targets_for(&self, ticker: &str) -> Option<&PickTargets> {
        self.targets.get(ticker)
    }
}
