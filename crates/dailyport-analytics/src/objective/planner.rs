//! 타임프레임별 매매 목표 산출.
//!
//! 120봉 이상의 일봉 이력과 현재가를 받아 단기/중기/장기 세 가지
//! 목표를 계산합니다. 이력이 모자라면 오류가 아니라 `None`을
//! 반환합니다 ("아직 계산 불가" 신호).
//!
//! # 산출 절차 (타임프레임마다)
//!
//! 1. 기본 점수 = 50 + 추세 + 모멘텀 + 변동성 항
//! 2. 현재가 101% 이하의 지지 후보를 강도순으로 탐색해
//!    손절(ATR 배수, 구조적 바닥 우선)과 목표가(R:R, 최근 고점 상한)를
//!    만족하는 첫 후보를 채택
//! 3. 현재가-진입가 이격 페널티를 적용해 최종 점수와 상태 결정
//! 4. 채택 실패 시 AVOID와 사유 코드

use dailyport_core::{
    round_to_tick, AvoidReason, ConfidenceFlag, ObjectiveSet, ObjectiveStatus, PriceBar,
    TradeObjective, TradeStrategy,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::{AtrParams, IndicatorEngine, RsiParams, SmaParams};
use crate::support::{SupportDetector, SupportLevel};

/// 플래너에 필요한 최소 봉 수 (MA120 확보).
pub const MIN_PLANNER_CANDLES: usize = 120;

/// 최근 고점 탐색 구간 (봉 수).
const RECENT_HIGH_WINDOW: usize = 60;

/// 타임프레임 식별자.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// 단기
    Short,
    /// 중기
    Mid,
    /// 장기
    Long,
}

impl Timeframe {
    /// 타임프레임별 파라미터를 반환합니다.
    pub fn params(&self) -> TimeframeParams {
        match self {
            Timeframe::Short => TimeframeParams {
                atr_multiplier: dec!(1.5),
                min_rr: dec!(2.0),
                max_risk_pct: dec!(0.05),
                gap_penalty_cap: dec!(20),
            },
            Timeframe::Mid => TimeframeParams {
                atr_multiplier: dec!(2.0),
                min_rr: dec!(2.5),
                max_risk_pct: dec!(0.10),
                gap_penalty_cap: dec!(15),
            },
            Timeframe::Long => TimeframeParams {
                atr_multiplier: dec!(3.0),
                min_rr: dec!(3.0),
                max_risk_pct: dec!(0.15),
                gap_penalty_cap: dec!(10),
            },
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::Short => write!(f, "short"),
            Timeframe::Mid => write!(f, "mid"),
            Timeframe::Long => write!(f, "long"),
        }
    }
}

/// 타임프레임별 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeframeParams {
    /// 손절 ATR 배수
    pub atr_multiplier: Decimal,
    /// 최소 손익비
    pub min_rr: Decimal,
    /// 진입가 대비 최대 허용 리스크 비율
    pub max_risk_pct: Decimal,
    /// 이격 페널티 상한 (이격 2% → 5% 선형, 5% 초과 고정)
    pub gap_penalty_cap: Decimal,
}

/// 타임프레임 계산에 공유되는 지표 문맥.
struct IndicatorContext {
    ma20: Decimal,
    ma60: Decimal,
    ma120: Decimal,
    atr: Decimal,
    rsi: Decimal,
    recent_high: Decimal,
}

/// 채택된 지지 후보의 가격 수준.
struct CandidateLevels {
    entry: Decimal,
    stop: Decimal,
    target: Decimal,
    rr: Decimal,
}

/// 매매 목표 플래너.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectivePlanner {
    engine: IndicatorEngine,
    detector: SupportDetector,
}

impl ObjectivePlanner {
    /// 새 플래너를 생성합니다.
    pub fn new() -> Self {
        Self {
            engine: IndicatorEngine::new(),
            detector: SupportDetector::new(),
        }
    }

    /// 세 타임프레임의 매매 목표를 계산합니다.
    ///
    /// 봉 수가 [`MIN_PLANNER_CANDLES`] 미만이거나 후행 지표값이
    /// 정의되지 않으면 `None`을 반환합니다. 오류가 아니라
    /// "아직 계산할 수 없음"을 뜻합니다.
    pub fn compute(&self, current_price: Decimal, bars: &[PriceBar]) -> Option<ObjectiveSet> {
        if bars.len() < MIN_PLANNER_CANDLES || current_price <= Decimal::ZERO {
            debug!(
                bars = bars.len(),
                "이력 부족으로 매매 목표 계산을 건너뜁니다"
            );
            return None;
        }

        let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<Decimal> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<Decimal> = bars.iter().map(|b| b.low).collect();

        let ma20 = self.last_sma(&closes, 20)?;
        let ma60 = self.last_sma(&closes, 60)?;
        let ma120 = self.last_sma(&closes, 120)?;
        let atr = self
            .engine
            .atr(&highs, &lows, &closes, AtrParams::default())
            .ok()?
            .last()
            .copied()
            .flatten()?;
        let rsi = self
            .engine
            .rsi(&closes, RsiParams::default())
            .ok()?
            .last()
            .copied()
            .flatten()?;

        let recent_high = highs[highs.len().saturating_sub(RECENT_HIGH_WINDOW)..]
            .iter()
            .copied()
            .max()?;

        let supports = self
            .detector
            .detect(bars, &[ma20, ma60, ma120])
            .ok()?;

        let ctx = IndicatorContext {
            ma20,
            ma60,
            ma120,
            atr,
            rsi,
            recent_high,
        };
        let last_bar = bars.last()?;

        Some(ObjectiveSet {
            short: self.solve(Timeframe::Short, current_price, &ctx, &supports, last_bar),
            mid: self.solve(Timeframe::Mid, current_price, &ctx, &supports, last_bar),
            long: self.solve(Timeframe::Long, current_price, &ctx, &supports, last_bar),
        })
    }

    /// 종가 시계열의 마지막 SMA 값.
    fn last_sma(&self, closes: &[Decimal], period: usize) -> Option<Decimal> {
        self.engine
            .sma(closes, SmaParams { period })
            .ok()?
            .last()
            .copied()
            .flatten()
    }

    /// 타임프레임 하나를 계산합니다.
    fn solve(
        &self,
        timeframe: Timeframe,
        current_price: Decimal,
        ctx: &IndicatorContext,
        supports: &[SupportLevel],
        last_bar: &PriceBar,
    ) -> TradeObjective {
        let params = timeframe.params();
        let base_score = base_score(current_price, ctx);
        let flags = confidence_flags(ctx);

        let best = find_candidate(current_price, ctx, supports, &params);

        match best {
            Some(levels) => {
                let gap_pct = (current_price - levels.entry) / levels.entry * dec!(100);
                let penalty = gap_penalty(gap_pct, params.gap_penalty_cap);
                let score = clamp_score(base_score - penalty);

                let bounce = bounce_confirmed(last_bar, levels.entry);
                let status = if gap_pct <= dec!(2) && score >= dec!(70) && bounce {
                    ObjectiveStatus::Active
                } else {
                    ObjectiveStatus::Wait
                };

                let strategy = if flags.contains(&ConfidenceFlag::UptrendConfirmed) {
                    TradeStrategy::PullbackTrend
                } else {
                    TradeStrategy::MeanReversion
                };

                let reason = match status {
                    ObjectiveStatus::Active => format!(
                        "정배열 및 모멘텀 양호 ({}점). {} 전략 기반 매수 검토.",
                        score.normalize(),
                        strategy
                    ),
                    _ => format!(
                        "관망 구간 ({}점). 지지선 확인 또는 추세 강화가 필요합니다.",
                        score.normalize()
                    ),
                };

                let target2 = levels.entry + (levels.target - levels.entry) * dec!(1.5);

                TradeObjective {
                    status,
                    score,
                    strategy,
                    confidence_flags: flags,
                    reason,
                    has_valid_levels: true,
                    entry: Some(round_to_tick(levels.entry)),
                    stop: Some(round_to_tick(levels.stop)),
                    target: Some(round_to_tick(levels.target)),
                    target2: Some(round_to_tick(target2)),
                    rr: Some(levels.rr.round_dp(2)),
                    avoid_code: None,
                }
            }
            None => {
                let score = clamp_score(base_score);
                let avoid_code = avoid_reason(ctx);
                debug!(
                    %timeframe,
                    code = avoid_code_str(avoid_code),
                    "유효한 지지 후보 없음"
                );

                TradeObjective {
                    status: ObjectiveStatus::Avoid,
                    score,
                    strategy: TradeStrategy::NoTrade,
                    confidence_flags: flags,
                    reason: format!(
                        "점수 미달 ({}점). 하락 추세 또는 과도한 리스크로 인해 제외됩니다.",
                        score.normalize()
                    ),
                    has_valid_levels: false,
                    entry: None,
                    stop: None,
                    target: None,
                    target2: None,
                    rr: None,
                    avoid_code: Some(avoid_code),
                }
            }
        }
    }
}

/// 기본 점수 = 50 + 추세 + 모멘텀 + 변동성.
fn base_score(current_price: Decimal, ctx: &IndicatorContext) -> Decimal {
    let trend = if ctx.ma20 > ctx.ma60 && ctx.ma60 > ctx.ma120 {
        dec!(30)
    } else if ctx.ma20 > ctx.ma60 {
        dec!(20)
    } else {
        dec!(-30)
    };

    let momentum = if ctx.rsi >= dec!(50) && ctx.rsi <= dec!(65) {
        dec!(15)
    } else if ctx.rsi > dec!(70) {
        dec!(-10)
    } else if ctx.rsi < dec!(35) {
        dec!(-5)
    } else {
        Decimal::ZERO
    };

    let vol_ratio = ctx.atr / current_price * dec!(100);
    let volatility = if vol_ratio < dec!(3) {
        dec!(5)
    } else if vol_ratio > dec!(8) {
        dec!(-15)
    } else {
        Decimal::ZERO
    };

    dec!(50) + trend + momentum + volatility
}

/// 신뢰도 플래그 (후보 채택 여부와 무관).
fn confidence_flags(ctx: &IndicatorContext) -> Vec<ConfidenceFlag> {
    let mut flags = Vec::new();
    if ctx.ma20 > ctx.ma60 && ctx.ma60 > ctx.ma120 {
        flags.push(ConfidenceFlag::UptrendConfirmed);
    } else if ctx.ma20 < ctx.ma60 {
        flags.push(ConfidenceFlag::BrokenTrend);
    }
    if ctx.rsi > dec!(70) {
        flags.push(ConfidenceFlag::Overbought);
    } else if ctx.rsi < dec!(30) {
        flags.push(ConfidenceFlag::Oversold);
    }
    flags
}

/// 지지 후보 탐색.
///
/// 현재가 101% 이하의 후보를 강도 내림차순으로 훑으며 손익비와
/// 최대 리스크를 만족하는 첫 후보를 채택합니다.
fn find_candidate(
    current_price: Decimal,
    ctx: &IndicatorContext,
    supports: &[SupportLevel],
    params: &TimeframeParams,
) -> Option<CandidateLevels> {
    let ceiling = current_price * dec!(1.01);
    let epsilon = ctx.atr * dec!(0.2);

    for level in supports.iter().filter(|l| l.price <= ceiling) {
        let entry = level.price;
        if entry <= Decimal::ZERO {
            continue;
        }

        // 구조적 바닥: 진입가 아래의 비-MA 지지선 중 최강 (동률이면 가까운 쪽)
        let struct_low = supports
            .iter()
            .filter(|l| !l.is_moving_average && l.price < entry)
            .max_by(|a, b| a.strength.cmp(&b.strength).then(a.price.cmp(&b.price)))
            .map(|l| l.price);

        let mut stop = entry - ctx.atr * params.atr_multiplier;
        if let Some(floor) = struct_low {
            let structural_stop = floor - epsilon;
            if structural_stop > stop {
                stop = structural_stop;
            }
        }

        let risk = entry - stop;
        if risk <= Decimal::ZERO {
            continue;
        }

        // 목표가: R:R 배수, 최근 고점 상한. 고점이 1.5×리스크 이내로
        // 가까우면 상한 대신 고점 자체를 쓴다.
        let raw_target = entry + risk * params.min_rr;
        let target = if ctx.recent_high - entry <= risk * dec!(1.5) {
            ctx.recent_high
        } else {
            raw_target.min(ctx.recent_high)
        };

        let rr = (target - entry) / risk;
        if rr >= params.min_rr && risk / entry <= params.max_risk_pct {
            return Some(CandidateLevels {
                entry,
                stop,
                target,
                rr,
            });
        }
    }
    None
}

/// 이격 페널티: 2% 이하 0, 2~5% 선형, 5% 초과 상한 고정.
fn gap_penalty(gap_pct: Decimal, cap: Decimal) -> Decimal {
    if gap_pct <= dec!(2) {
        Decimal::ZERO
    } else if gap_pct <= dec!(5) {
        (gap_pct - dec!(2)) / dec!(3) * cap
    } else {
        cap
    }
}

/// 최근 봉의 반등 확인.
///
/// 종가가 봉 범위 상위 40% 안에 있고, 아래꼬리가 몸통의 1.5배
/// 이상이며, 저가가 진입가 101% 이하여야 합니다.
fn bounce_confirmed(bar: &PriceBar, entry: Decimal) -> bool {
    let close_in_upper_range = bar.close >= bar.low + bar.range() * dec!(0.6);
    let long_lower_wick = bar.lower_wick() >= bar.body() * dec!(1.5);
    let touched_entry = bar.low <= entry * dec!(1.01);

    close_in_upper_range && long_lower_wick && touched_entry
}

/// AVOID 사유 코드: 우선순위 규칙을 위에서부터 평가합니다.
fn avoid_reason(ctx: &IndicatorContext) -> AvoidReason {
    let rules: [(bool, AvoidReason); 3] = [
        (ctx.ma20 < ctx.ma60, AvoidReason::TrendBreak),
        (ctx.rsi > dec!(70), AvoidReason::Overbought),
        (true, AvoidReason::NoSupport),
    ];
    rules
        .into_iter()
        .find_map(|(hit, reason)| hit.then_some(reason))
        .expect("마지막 규칙은 항상 참")
}

/// 점수를 0~100으로 클램프하고 소수 첫째 자리로 반올림합니다.
fn clamp_score(score: Decimal) -> Decimal {
    score.max(Decimal::ZERO).min(dec!(100)).round_dp(1)
}

fn avoid_code_str(code: AvoidReason) -> &'static str {
    match code {
        AvoidReason::NoSupport => "NO_SUPPORT",
        AvoidReason::Overbought => "OVERBOUGHT",
        AvoidReason::TrendBreak => "TREND_BREAK",
    }
}
