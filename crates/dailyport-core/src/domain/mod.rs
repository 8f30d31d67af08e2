//! 도메인 엔티티.
//!
//! 두 파이프라인(목표가 플래너, 시그널 리플레이)이 공유하는 타입을
//! 정의합니다:
//! - `price` - 일봉 가격 바와 종가 시계열
//! - `pick` - 기록된 전략 픽 (백테스트 입력)
//! - `objective` - 타임프레임별 매매 목표 결과
//! - `trade` - 시뮬레이션 거래와 백테스트 요약

pub mod objective;
pub mod pick;
pub mod price;
pub mod trade;

pub use objective::{
    AvoidReason, ConfidenceFlag, ObjectiveSet, ObjectiveStatus, TradeObjective, TradeStrategy,
};
pub use pick::{PickTargets, StrategyPick};
pub use price::{ClosePriceSeries, PriceBar};
pub use trade::{BacktestSummary, ExitTag, SimulatedTrade, TradeStatus};
