//! 시점 기술적 분석 스냅샷.
//!
//! 종가 시계열 하나로 RSI / MACD / 이동평균 추세의 현재 상태를
//! 요약합니다. 매매 목표 플래너와 달리 가격 수준을 만들지 않고
//! 상태 분류만 제공합니다.
//!
//! 이력이 50봉 미만이면 오류 대신 안전한 기본 스냅샷
//! (RSI `Unknown`, 추세 `Neutral`)을 반환합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::indicators::{EmaParams, IndicatorEngine, MacdParams, RsiParams};

/// 스냅샷 계산에 필요한 최소 봉 수.
pub const MIN_SNAPSHOT_CANDLES: usize = 50;

/// RSI 구간 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiZone {
    /// 과매수 (>= 70)
    Overbought,
    /// 과매도 (<= 30)
    Oversold,
    /// 중립
    Neutral,
    /// 계산 불가 (이력 부족)
    Unknown,
}

/// RSI 판독값.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RsiReading {
    /// RSI 값 (0 ~ 100)
    pub value: Decimal,
    /// 구간 분류
    pub zone: RsiZone,
}

/// MACD 방향 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacdTrend {
    /// 히스토그램 양수
    Bullish,
    /// 히스토그램 음수
    Bearish,
    /// 중립 (0 또는 미정의)
    Neutral,
}

/// MACD 판독값 (12, 26, 9).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdReading {
    /// MACD 선
    pub macd: Decimal,
    /// 시그널 선
    pub signal: Decimal,
    /// 히스토그램
    pub histogram: Decimal,
    /// 방향 분류
    pub trend: MacdTrend,
}

/// 이동평균 추세 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendState {
    /// 단기선이 장기선을 상향 돌파한 봉
    GoldenCross,
    /// 단기선이 장기선을 하향 돌파한 봉
    DeadCross,
    /// 단기선 > 장기선 유지
    UpTrend,
    /// 단기선 < 장기선 유지
    DownTrend,
    /// 판단 불가
    Neutral,
}

/// 이동평균 추세 판독값 (EMA20 vs EMA60).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrendReading {
    /// 단기 EMA (20)
    pub ema_short: Decimal,
    /// 장기 EMA (60)
    pub ema_long: Decimal,
    /// 추세 상태
    pub state: TrendState,
}

/// 시점 기술적 분석 스냅샷.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    /// RSI (14)
    pub rsi: RsiReading,
    /// MACD (12, 26, 9)
    pub macd: MacdReading,
    /// 이동평균 추세 (EMA20/EMA60)
    pub trend: TrendReading,
}

impl TechnicalSnapshot {
    /// 이력 부족 시의 안전한 기본 스냅샷.
    pub fn unknown() -> Self {
        Self {
            rsi: RsiReading {
                value: Decimal::ZERO,
                zone: RsiZone::Unknown,
            },
            macd: MacdReading {
                macd: Decimal::ZERO,
                signal: Decimal::ZERO,
                histogram: Decimal::ZERO,
                trend: MacdTrend::Neutral,
            },
            trend: TrendReading {
                ema_short: Decimal::ZERO,
                ema_long: Decimal::ZERO,
                state: TrendState::Neutral,
            },
        }
    }

    /// 종가 시계열로 스냅샷을 계산합니다.
    ///
    /// 봉 수가 [`MIN_SNAPSHOT_CANDLES`] 미만이면 기본 스냅샷을
    /// 반환합니다. "아직 분석 불가"는 오류가 아닙니다.
    pub fn from_closes(closes: &[Decimal]) -> Self {
        if closes.len() < MIN_SNAPSHOT_CANDLES {
            return Self::unknown();
        }
        let engine = IndicatorEngine::new();
        let mut snapshot = Self::unknown();

        // RSI
        if let Ok(rsi_series) = engine.rsi(closes, RsiParams::default()) {
            if let Some(value) = rsi_series.last().copied().flatten() {
                let zone = if value >= dec!(70) {
                    RsiZone::Overbought
                } else if value <= dec!(30) {
                    RsiZone::Oversold
                } else {
                    RsiZone::Neutral
                };
                snapshot.rsi = RsiReading { value, zone };
            }
        }

        // MACD
        if let Ok(macd_series) = engine.macd(closes, MacdParams::default()) {
            if let Some(point) = macd_series.last() {
                if let (Some(macd), Some(signal), Some(histogram)) =
                    (point.macd, point.signal, point.histogram)
                {
                    let trend = if histogram > Decimal::ZERO {
                        MacdTrend::Bullish
                    } else if histogram < Decimal::ZERO {
                        MacdTrend::Bearish
                    } else {
                        MacdTrend::Neutral
                    };
                    snapshot.macd = MacdReading {
                        macd,
                        signal,
                        histogram,
                        trend,
                    };
                }
            }
        }

        // 추세: 현재와 직전 봉의 EMA20/EMA60 배열 비교
        snapshot.trend = trend_reading(&engine, closes);

        snapshot
    }
}

/// EMA20/EMA60 배열로 추세 상태를 판정합니다.
///
/// 직전 봉과 배열이 뒤집힌 시점만 크로스(골든/데드)로 표시합니다.
/// 장기 EMA가 아직 정의되지 않으면 `Neutral`입니다.
fn trend_reading(engine: &IndicatorEngine, closes: &[Decimal]) -> TrendReading {
    let short = engine.ema(closes, EmaParams { period: 20 });
    let long = engine.ema(closes, EmaParams { period: 60 });

    let (Ok(short), Ok(long)) = (short, long) else {
        return TrendReading {
            ema_short: Decimal::ZERO,
            ema_long: Decimal::ZERO,
            state: TrendState::Neutral,
        };
    };

    let n = closes.len();
    let curr = (
        short.get(n - 1).copied().flatten(),
        long.get(n - 1).copied().flatten(),
    );
    let prev = if n >= 2 {
        (
            short.get(n - 2).copied().flatten(),
            long.get(n - 2).copied().flatten(),
        )
    } else {
        (None, None)
    };

    let (Some(curr_short), Some(curr_long)) = curr else {
        return TrendReading {
            ema_short: Decimal::ZERO,
            ema_long: Decimal::ZERO,
            state: TrendState::Neutral,
        };
    };

    let state = if curr_short > curr_long {
        match prev {
            (Some(p_short), Some(p_long)) if p_short <= p_long => TrendState::GoldenCross,
            _ => TrendState::UpTrend,
        }
    } else {
        match prev {
            (Some(p_short), Some(p_long)) if p_short >= p_long => TrendState::DeadCross,
            _ => TrendState::DownTrend,
        }
    };

    TrendReading {
        ema_short: curr_short,
        ema_long: curr_long,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_closes(n: usize, value: Decimal) -> Vec<Decimal> {
        vec![value; n]
    }

    #[test]
    fn test_short_history_is_unknown() {
        let snapshot = TechnicalSnapshot::from_closes(&flat_closes(49, dec!(100)));
        assert_eq!(snapshot.rsi.zone, RsiZone::Unknown);
        assert_eq!(snapshot.trend.state, TrendState::Neutral);
        assert_eq!(snapshot.macd.trend, MacdTrend::Neutral);
    }

    #[test]
    fn test_flat_series_is_neutral_without_ema60() {
        // 50봉: EMA60 미정의 → 추세 Neutral, RSI는 정의됨
        let snapshot = TechnicalSnapshot::from_closes(&flat_closes(50, dec!(100)));
        assert_eq!(snapshot.trend.state, TrendState::Neutral);
        assert_ne!(snapshot.rsi.zone, RsiZone::Unknown);
    }

    #[test]
    fn test_rising_series_is_overbought_uptrend() {
        let closes: Vec<Decimal> = (1..=120).map(|i| Decimal::from(100 + i)).collect();
        let snapshot = TechnicalSnapshot::from_closes(&closes);

        // 상승 일변도: RSI 100, EMA20 > EMA60
        assert_eq!(snapshot.rsi.zone, RsiZone::Overbought);
        assert_eq!(snapshot.rsi.value, dec!(100));
        assert_eq!(snapshot.trend.state, TrendState::UpTrend);
        assert_eq!(snapshot.macd.trend, MacdTrend::Bullish);
    }

    #[test]
    fn test_falling_series_is_oversold_downtrend() {
        let closes: Vec<Decimal> = (1..=120).map(|i| Decimal::from(500 - 2 * i)).collect();
        let snapshot = TechnicalSnapshot::from_closes(&closes);

        assert_eq!(snapshot.rsi.zone, RsiZone::Oversold);
        assert_eq!(snapshot.trend.state, TrendState::DownTrend);
        assert_eq!(snapshot.macd.trend, MacdTrend::Bearish);
    }

    #[test]
    fn test_golden_cross_only_on_flip_bar() {
        // 긴 하락 후 급반등: EMA20이 EMA60을 상향 돌파하는 봉을 찾는다
        let mut closes: Vec<Decimal> = (0..100).map(|i| Decimal::from(300 - i)).collect();
        closes.extend((0..40).map(|i| Decimal::from(200 + 8 * i)));

        let mut cross_bars = 0;
        for end in 61..=closes.len() {
            let snapshot = TechnicalSnapshot::from_closes(&closes[..end]);
            if snapshot.trend.state == TrendState::GoldenCross {
                cross_bars += 1;
            }
        }
        // 돌파 봉은 정확히 한 번
        assert_eq!(cross_bars, 1);
    }

    #[test]
    fn test_serde_status_names() {
        assert_eq!(
            serde_json::to_string(&RsiZone::Overbought).unwrap(),
            "\"OVERBOUGHT\""
        );
        assert_eq!(
            serde_json::to_string(&TrendState::GoldenCross).unwrap(),
            "\"GOLDEN_CROSS\""
        );
        assert_eq!(
            serde_json::to_string(&MacdTrend::Bullish).unwrap(),
            "\"BULLISH\""
        );
    }
}
