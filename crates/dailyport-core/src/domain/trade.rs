//! 시뮬레이션 거래와 백테스트 요약.
//!
//! 리플레이 엔진이 생성하는 출력 엔티티입니다. 거래 하나는 부분
//! 익절을 포함할 수 있으므로 청산 경로를 태그 목록으로 보존합니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 청산 이벤트 태그.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitTag {
    /// 1차 목표가 부분 익절
    Tp1,
    /// 2차 목표가 전량 익절
    Tp2,
    /// 손절
    Sl,
    /// 본전 손절 (TP1 이후 이동된 손절선)
    SlBreakeven,
    /// 데이터 종료 시점 보유분 평가
    Hold,
}

impl std::fmt::Display for ExitTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitTag::Tp1 => write!(f, "TP1"),
            ExitTag::Tp2 => write!(f, "TP2"),
            ExitTag::Sl => write!(f, "SL"),
            ExitTag::SlBreakeven => write!(f, "SL_BREAKEVEN"),
            ExitTag::Hold => write!(f, "HOLD"),
        }
    }
}

/// 청산 경로를 `"TP1 -> TP2"` 형태로 렌더링합니다.
pub fn format_exit_path(path: &[ExitTag]) -> String {
    path.iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// 거래 결과 상태.
///
/// 가중 수익률이 ±0.01%p 이내면 `Breakeven`으로 분류합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// 수익
    Win,
    /// 손실
    Loss,
    /// 보유 중 (미청산)
    Hold,
    /// 본전
    Breakeven,
}

/// 시뮬레이션된 거래 하나.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedTrade {
    /// 종목 티커
    pub ticker: String,
    /// 시그널(픽) 일자
    pub entry_date: NaiveDate,
    /// 진입가
    pub entry_price: Decimal,
    /// 마지막 청산 체결가
    pub final_exit_price: Decimal,
    /// 가중 수익률 (%)
    pub return_percent: Decimal,
    /// 결과 상태
    pub status: TradeStatus,
    /// 보유 일수 (픽 일자 → 마지막 청산일)
    pub days_held: i64,
    /// 청산 이벤트 경로 (발생 순서)
    pub exit_path: Vec<ExitTag>,
}

impl SimulatedTrade {
    /// 청산 경로 문자열 (`"TP1 -> TP2"`).
    pub fn exit_note(&self) -> String {
        format_exit_path(&self.exit_path)
    }
}

/// 전략 하나의 백테스트 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// 전략 이름
    pub strategy: String,
    /// 총 거래 수
    pub total_trades: usize,
    /// 승률 (%)
    pub win_rate: Decimal,
    /// 평균 수익률 (%)
    pub avg_return: Decimal,
    /// 프로핏 팩터 (총수익 / 총손실, 손실 없으면 100, 거래 없으면 0)
    pub profit_factor: Decimal,
    /// 개별 거래 (최신순)
    pub trades: Vec<SimulatedTrade>,
}

impl BacktestSummary {
    /// 거래가 하나도 없는 빈 요약을 생성합니다.
    pub fn empty(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            total_trades: 0,
            win_rate: Decimal::ZERO,
            avg_return: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            trades: Vec::new(),
        }
    }
}
