//! 기술적 지표 계산 엔진.
//!
//! 모든 지표는 입력과 같은 길이의 `Vec<Option<Decimal>>`를 반환하며,
//! 계산에 필요한 이력이 모자란 구간은 `None`으로 채웁니다. 호출자는
//! `series.last().and_then(|v| *v)`로 최신 값을 꺼내 씁니다.
//!
//! # 수식
//!
//! - SMA: 기간 내 산술 평균
//! - EMA: `k = 2 / (period + 1)`, 첫 값은 기간 SMA로 시드
//! - RSI: 직전 `period`개 변화분의 상승/하락 단순 평균 비율
//!   (하락 평균이 0이면 100)
//! - ATR: True Range의 기간 단순 평균
//! - MACD: EMA(fast) - EMA(slow), 시그널은 MACD의 EMA(signal)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 지표 계산 오류.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 데이터 부족
    #[error("데이터 부족: 필요={required}, 제공={provided}")]
    InsufficientData { required: usize, provided: usize },

    /// 계산 오류 (잘못된 파라미터, 길이 불일치 등)
    #[error("지표 계산 오류: {0}")]
    CalculationError(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// SMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmaParams {
    /// 기간
    pub period: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

/// EMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmaParams {
    /// 기간
    pub period: usize,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

/// RSI 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RsiParams {
    /// 기간
    pub period: usize,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// ATR 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtrParams {
    /// 기간
    pub period: usize,
}

impl Default for AtrParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// MACD 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdParams {
    /// 단기 EMA 기간
    pub fast_period: usize,
    /// 장기 EMA 기간
    pub slow_period: usize,
    /// 시그널 EMA 기간
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

/// MACD 한 시점의 값.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MacdPoint {
    /// MACD 선 (EMA fast - EMA slow)
    pub macd: Option<Decimal>,
    /// 시그널 선
    pub signal: Option<Decimal>,
    /// 히스토그램 (MACD - 시그널)
    pub histogram: Option<Decimal>,
}

/// 지표 계산 엔진.
///
/// 상태를 갖지 않으며 호출 단위로 순수하게 동작합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    /// 새 엔진을 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 단순 이동평균.
    pub fn sma(
        &self,
        values: &[Decimal],
        params: SmaParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = validate_period(params.period)?;
        let divisor = Decimal::from(period as u64);

        let mut out = vec![None; values.len()];
        let mut window_sum = Decimal::ZERO;
        for (i, value) in values.iter().enumerate() {
            window_sum += *value;
            if i >= period {
                window_sum -= values[i - period];
            }
            if i + 1 >= period {
                out[i] = Some(window_sum / divisor);
            }
        }
        Ok(out)
    }

    /// 지수 이동평균.
    ///
    /// 첫 값은 초기 `period`개의 SMA로 시드합니다.
    pub fn ema(
        &self,
        values: &[Decimal],
        params: EmaParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = validate_period(params.period)?;
        Ok(ema_series(values, period))
    }

    /// RSI.
    ///
    /// 직전 `period`개 변화분의 상승분/하락분 단순 평균으로 계산하며,
    /// 하락 평균이 0이면 100을 반환합니다.
    pub fn rsi(
        &self,
        values: &[Decimal],
        params: RsiParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = validate_period(params.period)?;
        let divisor = Decimal::from(period as u64);
        let hundred = Decimal::from(100u64);

        let mut out = vec![None; values.len()];
        for i in period..values.len() {
            let mut gain_sum = Decimal::ZERO;
            let mut loss_sum = Decimal::ZERO;
            for j in (i - period + 1)..=i {
                let delta = values[j] - values[j - 1];
                if delta > Decimal::ZERO {
                    gain_sum += delta;
                } else {
                    loss_sum += -delta;
                }
            }
            let avg_gain = gain_sum / divisor;
            let avg_loss = loss_sum / divisor;

            out[i] = Some(if avg_loss.is_zero() {
                hundred
            } else {
                let rs = avg_gain / avg_loss;
                hundred - hundred / (Decimal::ONE + rs)
            });
        }
        Ok(out)
    }

    /// ATR (Average True Range).
    ///
    /// True Range = max(고가-저가, |고가-전일종가|, |저가-전일종가|)의
    /// 기간 단순 평균. 세 시계열의 길이가 같아야 합니다.
    pub fn atr(
        &self,
        highs: &[Decimal],
        lows: &[Decimal],
        closes: &[Decimal],
        params: AtrParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = validate_period(params.period)?;
        if highs.len() != lows.len() || highs.len() != closes.len() {
            return Err(IndicatorError::CalculationError(format!(
                "고가/저가/종가 길이 불일치: {}/{}/{}",
                highs.len(),
                lows.len(),
                closes.len()
            )));
        }
        let divisor = Decimal::from(period as u64);

        let mut out = vec![None; closes.len()];
        let mut tr = Vec::with_capacity(closes.len());
        for i in 0..closes.len() {
            if i == 0 {
                tr.push(highs[0] - lows[0]);
                continue;
            }
            let prev_close = closes[i - 1];
            let range = highs[i] - lows[i];
            let up = (highs[i] - prev_close).abs();
            let down = (lows[i] - prev_close).abs();
            tr.push(range.max(up).max(down));
        }

        // 전일 종가가 필요한 TR 특성상 index period부터 정의
        let mut window_sum = Decimal::ZERO;
        for i in 1..closes.len() {
            window_sum += tr[i];
            if i > period {
                window_sum -= tr[i - period];
            }
            if i >= period {
                out[i] = Some(window_sum / divisor);
            }
        }
        Ok(out)
    }

    /// MACD.
    pub fn macd(
        &self,
        values: &[Decimal],
        params: MacdParams,
    ) -> IndicatorResult<Vec<MacdPoint>> {
        let fast = validate_period(params.fast_period)?;
        let slow = validate_period(params.slow_period)?;
        let signal_period = validate_period(params.signal_period)?;
        if fast >= slow {
            return Err(IndicatorError::CalculationError(format!(
                "단기 기간({fast})은 장기 기간({slow})보다 짧아야 합니다"
            )));
        }

        let fast_ema = ema_series(values, fast);
        let slow_ema = ema_series(values, slow);

        let macd_line: Vec<Option<Decimal>> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => Some(*f - *s),
                _ => None,
            })
            .collect();

        // 시그널은 MACD가 정의된 구간 위에서 EMA(signal_period)
        let defined: Vec<Decimal> = macd_line.iter().filter_map(|v| *v).collect();
        let offset = macd_line.len() - defined.len();
        let signal_suffix = ema_series(&defined, signal_period);

        let mut out = vec![MacdPoint::default(); values.len()];
        for (i, point) in out.iter_mut().enumerate() {
            point.macd = macd_line[i];
            if i >= offset {
                point.signal = signal_suffix[i - offset];
            }
            if let (Some(m), Some(s)) = (point.macd, point.signal) {
                point.histogram = Some(m - s);
            }
        }
        Ok(out)
    }
}

/// 기간 파라미터 검증.
fn validate_period(period: usize) -> IndicatorResult<usize> {
    if period == 0 {
        return Err(IndicatorError::CalculationError(
            "기간은 1 이상이어야 합니다".to_string(),
        ));
    }
    Ok(period)
}

/// EMA 시계열 (SMA 시드).
fn ema_series(values: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut out = vec![None; values.len()];
    if values.len() < period {
        return out;
    }

    let divisor = Decimal::from(period as u64);
    let seed: Decimal = values[..period].iter().copied().sum::<Decimal>() / divisor;
    out[period - 1] = Some(seed);

    let k = Decimal::from(2u64) / Decimal::from((period + 1) as u64);
    let mut prev = seed;
    for i in period..values.len() {
        let next = (values[i] - prev) * k + prev;
        out[i] = Some(next);
        prev = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn decs(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_sma_basic() {
        let engine = IndicatorEngine::new();
        let values = decs(&[1, 2, 3, 4, 5]);
        let sma = engine.sma(&values, SmaParams { period: 3 }).unwrap();

        assert_eq!(sma.len(), 5);
        assert_eq!(sma[0], None);
        assert_eq!(sma[1], None);
        assert_eq!(sma[2], Some(dec!(2)));
        assert_eq!(sma[3], Some(dec!(3)));
        assert_eq!(sma[4], Some(dec!(4)));
    }

    #[test]
    fn test_sma_shorter_than_period_is_all_none() {
        let engine = IndicatorEngine::new();
        let values = decs(&[1, 2]);
        let sma = engine.sma(&values, SmaParams { period: 5 }).unwrap();
        assert!(sma.iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_zero_period_is_error() {
        let engine = IndicatorEngine::new();
        let result = engine.sma(&decs(&[1, 2, 3]), SmaParams { period: 0 });
        assert!(matches!(result, Err(IndicatorError::CalculationError(_))));
    }

    #[test]
    fn test_ema_seeds_with_sma() {
        let engine = IndicatorEngine::new();
        let values = decs(&[1, 2, 3, 4]);
        let ema = engine.ema(&values, EmaParams { period: 3 }).unwrap();

        assert_eq!(ema[2], Some(dec!(2))); // SMA(1,2,3)
        // k = 2/4 = 0.5, 다음 = (4 - 2) * 0.5 + 2 = 3
        assert_eq!(ema[3], Some(dec!(3)));
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let engine = IndicatorEngine::new();
        let values = decs(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
        let rsi = engine.rsi(&values, RsiParams::default()).unwrap();
        assert_eq!(rsi.last().unwrap().unwrap(), dec!(100));
        assert_eq!(rsi[13], None); // 14개 변화분 확보 전
    }

    #[test]
    fn test_rsi_balanced_moves_is_50() {
        let engine = IndicatorEngine::new();
        // +1 / -1 교대: 상승 평균 == 하락 평균
        let mut values = vec![dec!(100)];
        for i in 0..14 {
            let last = *values.last().unwrap();
            let delta = if i % 2 == 0 { dec!(1) } else { dec!(-1) };
            values.push(last + delta);
        }
        let rsi = engine.rsi(&values, RsiParams::default()).unwrap();
        assert_eq!(rsi.last().unwrap().unwrap(), dec!(50));
    }

    #[test]
    fn test_atr_constant_range() {
        let engine = IndicatorEngine::new();
        // 고가 = 종가 + 1, 저가 = 종가 - 1, 종가 일정 → TR 항상 2
        let closes = vec![dec!(100); 20];
        let highs = vec![dec!(101); 20];
        let lows = vec![dec!(99); 20];
        let atr = engine
            .atr(&highs, &lows, &closes, AtrParams::default())
            .unwrap();

        assert_eq!(atr[13], None);
        assert_eq!(atr[14], Some(dec!(2)));
        assert_eq!(atr.last().unwrap().unwrap(), dec!(2));
    }

    #[test]
    fn test_atr_length_mismatch_is_error() {
        let engine = IndicatorEngine::new();
        let result = engine.atr(
            &decs(&[1, 2]),
            &decs(&[1, 2, 3]),
            &decs(&[1, 2, 3]),
            AtrParams::default(),
        );
        assert!(matches!(result, Err(IndicatorError::CalculationError(_))));
    }

    #[test]
    fn test_macd_defined_after_slow_period() {
        let engine = IndicatorEngine::new();
        let values: Vec<Decimal> = (1..=40).map(Decimal::from).collect();
        let macd = engine.macd(&values, MacdParams::default()).unwrap();

        assert_eq!(macd.len(), 40);
        assert!(macd[24].macd.is_none());
        assert!(macd[25].macd.is_some()); // slow=26 시드 시점
        // 시그널은 MACD 정의 후 9개가 더 필요
        assert!(macd[32].signal.is_none());
        assert!(macd[33].signal.is_some());
        assert!(macd[33].histogram.is_some());
    }

    #[test]
    fn test_macd_fast_must_be_shorter() {
        let engine = IndicatorEngine::new();
        let result = engine.macd(
            &decs(&[1, 2, 3]),
            MacdParams {
                fast_period: 26,
                slow_period: 12,
                signal_period: 9,
            },
        );
        assert!(matches!(result, Err(IndicatorError::CalculationError(_))));
    }
}
