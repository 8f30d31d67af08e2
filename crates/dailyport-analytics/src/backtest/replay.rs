//! 전략 픽 리플레이 엔진.
//!
//! 과거 → 최신 순으로 정렬된 픽 기록을 일자별 종가에 재생합니다.
//! 거래 하나는 브래킷 상태 기계를 따릅니다:
//!
//! 1. 종가 ≤ 손절선: 잔여 전량 청산 (`SL`, 본전 이동 후면 `SL_BREAKEVEN`)
//! 2. 종가 ≥ 2차 목표가: 잔여 전량 청산 (`TP2`)
//! 3. 종가 ≥ 1차 목표가 (최초 1회): 절반 익절 (`TP1`) 후 손절선을
//!    진입가로 이동 (본전 손절)
//! 4. 시계열 종료: 잔여분을 마지막 종가로 평가 (`HOLD`)
//!
//! 같은 종목의 중복 진입은 쿨다운(기본 5일)으로 차단합니다.
//! 쿨다운 장부는 `run` 호출 하나에만 유효하며 호출이 끝나면
//! 버려집니다.

use std::collections::HashMap;
use std::ops::Bound;

use chrono::NaiveDate;
use dailyport_core::{
    BacktestSummary, ClosePriceSeries, ExitTag, SimulatedTrade, StrategyPick, TradeStatus,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// 리플레이 오류.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// 설정 오류
    #[error("리플레이 설정 오류: {0}")]
    ConfigError(String),
}

/// 리플레이 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// 평가할 최대 픽 수 (최신 쪽 유지)
    #[serde(default = "default_max_picks")]
    pub max_picks: usize,

    /// 픽 하나에서 평가할 상위 종목 수
    #[serde(default = "default_top_n_tickers")]
    pub top_n_tickers: usize,

    /// 같은 종목 재진입 금지 기간 (달력일)
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: i64,

    /// 목표가 미지정 시 1차 목표 비율 (예: 0.15 = +15%)
    #[serde(default = "default_target1_pct")]
    pub default_target1_pct: Decimal,

    /// 목표가 미지정 시 2차 목표 비율 (예: 0.25 = +25%)
    #[serde(default = "default_target2_pct")]
    pub default_target2_pct: Decimal,

    /// 초기 손절 비율 (예: 0.10 = -10%)
    #[serde(default = "default_initial_stop_pct")]
    pub initial_stop_pct: Decimal,

    /// 1차 목표 도달 시 익절 비중
    #[serde(default = "default_partial_take_ratio")]
    pub partial_take_ratio: Decimal,
}

// 설정 기본값 함수들 (serde default용)
fn default_max_picks() -> usize {
    60
}
fn default_top_n_tickers() -> usize {
    3
}
fn default_cooldown_days() -> i64 {
    5
}
fn default_target1_pct() -> Decimal {
    Decimal::new(15, 2)
} // 15%
fn default_target2_pct() -> Decimal {
    Decimal::new(25, 2)
} // 25%
fn default_initial_stop_pct() -> Decimal {
    Decimal::new(10, 2)
} // 10%
fn default_partial_take_ratio() -> Decimal {
    Decimal::new(5, 1)
} // 50%

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_picks: default_max_picks(),
            top_n_tickers: default_top_n_tickers(),
            cooldown_days: default_cooldown_days(),
            default_target1_pct: default_target1_pct(),
            default_target2_pct: default_target2_pct(),
            initial_stop_pct: default_initial_stop_pct(),
            partial_take_ratio: default_partial_take_ratio(),
        }
    }
}

impl ReplayConfig {
    /// 픽 윈도우 설정
    pub fn with_max_picks(mut self, max: usize) -> Self {
        self.max_picks = max;
        self
    }

    /// 상위 종목 수 설정
    pub fn with_top_n_tickers(mut self, n: usize) -> Self {
        self.top_n_tickers = n;
        self
    }

    /// 쿨다운 기간 설정
    pub fn with_cooldown_days(mut self, days: i64) -> Self {
        self.cooldown_days = days;
        self
    }

    /// 기본 목표가 비율 설정
    pub fn with_default_targets(mut self, target1_pct: Decimal, target2_pct: Decimal) -> Self {
        self.default_target1_pct = target1_pct;
        self.default_target2_pct = target2_pct;
        self
    }

    /// 초기 손절 비율 설정
    pub fn with_initial_stop_pct(mut self, pct: Decimal) -> Self {
        self.initial_stop_pct = pct;
        self
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.top_n_tickers == 0 {
            return Err(ReplayError::ConfigError(
                "상위 종목 수는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.cooldown_days < 0 {
            return Err(ReplayError::ConfigError(
                "쿨다운 기간은 0 이상이어야 합니다".to_string(),
            ));
        }
        if self.initial_stop_pct <= Decimal::ZERO || self.initial_stop_pct >= Decimal::ONE {
            return Err(ReplayError::ConfigError(
                "초기 손절 비율은 0과 1 사이여야 합니다".to_string(),
            ));
        }
        if self.partial_take_ratio <= Decimal::ZERO || self.partial_take_ratio >= Decimal::ONE {
            return Err(ReplayError::ConfigError(
                "부분 익절 비중은 0과 1 사이여야 합니다".to_string(),
            ));
        }
        if self.default_target1_pct <= Decimal::ZERO
            || self.default_target2_pct <= self.default_target1_pct
        {
            return Err(ReplayError::ConfigError(
                "기본 목표가 비율은 0 < 1차 < 2차 순이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

/// 체결 하나 (청산 기록).
struct Fill {
    date: NaiveDate,
    price: Decimal,
    portion: Decimal,
    tag: ExitTag,
}

/// 시그널 리플레이 엔진.
#[derive(Debug, Clone, Default)]
pub struct SignalReplay {
    config: ReplayConfig,
}

impl SignalReplay {
    /// 기본 설정으로 엔진을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지정한 설정으로 엔진을 생성합니다.
    pub fn with_config(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// 픽 기록을 재생해 성과를 집계합니다.
    ///
    /// `picks`는 과거 → 최신 순으로 정렬되어 있어야 하며,
    /// `max_picks`를 넘으면 최신 쪽만 사용합니다. 가격이 없는
    /// 종목/일자는 조용히 건너뛰고 나머지 재생은 계속됩니다.
    pub fn run(
        &self,
        strategy_name: &str,
        picks: &[StrategyPick],
        prices: &HashMap<String, ClosePriceSeries>,
    ) -> Result<BacktestSummary, ReplayError> {
        self.config.validate()?;

        let window_start = picks.len().saturating_sub(self.config.max_picks);
        let window = &picks[window_start..];

        // 쿨다운 장부: 이 run 호출에만 유효
        let mut last_entry_dates: HashMap<String, NaiveDate> = HashMap::new();

        let mut trades: Vec<SimulatedTrade> = Vec::new();
        let mut win_count = 0usize;
        let mut total_return_pct = Decimal::ZERO;
        let mut gross_win = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;

        for pick in window {
            for ticker in pick.tickers.iter().take(self.config.top_n_tickers) {
                if let Some(last) = last_entry_dates.get(ticker) {
                    let elapsed = (pick.date - *last).num_days();
                    if elapsed < self.config.cooldown_days {
                        debug!(%ticker, date = %pick.date, elapsed, "쿨다운으로 시그널 건너뜀");
                        continue;
                    }
                }

                let Some(series) = prices.get(ticker) else {
                    debug!(%ticker, "가격 시계열 없음 - 건너뜀");
                    continue;
                };

                let Some(trade) = self.simulate_trade(pick, ticker, series) else {
                    continue;
                };

                total_return_pct += trade.return_percent;
                match trade.status {
                    TradeStatus::Win => {
                        win_count += 1;
                        gross_win += trade.return_percent;
                    }
                    TradeStatus::Loss => {
                        gross_loss += trade.return_percent.abs();
                    }
                    _ => {}
                }
                trades.push(trade);
                last_entry_dates.insert(ticker.clone(), pick.date);
            }
        }

        let total = trades.len();
        let summary = if total == 0 {
            BacktestSummary::empty(strategy_name)
        } else {
            let total_dec = Decimal::from(total as u64);
            let profit_factor = if gross_loss > Decimal::ZERO {
                gross_win / gross_loss
            } else if gross_win > Decimal::ZERO {
                dec!(100)
            } else {
                Decimal::ZERO
            };

            // 최신순 정렬 (같은 날짜는 생성 순서 유지)
            trades.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));

            BacktestSummary {
                strategy: strategy_name.to_string(),
                total_trades: total,
                win_rate: Decimal::from(win_count as u64) / total_dec * dec!(100),
                avg_return: total_return_pct / total_dec,
                profit_factor,
                trades,
            }
        };

        info!(
            strategy = strategy_name,
            trades = summary.total_trades,
            win_rate = %summary.win_rate,
            "리플레이 완료"
        );
        Ok(summary)
    }

    /// 픽 하나의 종목 하나를 시뮬레이션합니다.
    ///
    /// 픽 일자 또는 그 이후 첫 거래일 종가로 진입합니다. 미래 가격이
    /// 전혀 없으면 `None` (시그널 무시).
    fn simulate_trade(
        &self,
        pick: &StrategyPick,
        ticker: &str,
        series: &ClosePriceSeries,
    ) -> Option<SimulatedTrade> {
        let (entry_date, entry_price) = series
            .range(pick.date..)
            .next()
            .map(|(d, p)| (*d, *p))?;
        if entry_price <= Decimal::ZERO {
            return None;
        }

        let (target1, target2) = match pick.targets_for(ticker) {
            Some(t) => (t.target1, t.second_target()),
            None => (
                entry_price * (Decimal::ONE + self.config.default_target1_pct),
                entry_price * (Decimal::ONE + self.config.default_target2_pct),
            ),
        };

        let mut remaining = Decimal::ONE;
        let mut current_sl = entry_price * (Decimal::ONE - self.config.initial_stop_pct);
        let mut breakeven_active = false;
        let mut fills: Vec<Fill> = Vec::new();

        for (date, price) in series.range((Bound::Excluded(entry_date), Bound::Unbounded)) {
            // 1. 손절선
            if *price <= current_sl {
                fills.push(Fill {
                    date: *date,
                    price: *price,
                    portion: remaining,
                    tag: if breakeven_active {
                        ExitTag::SlBreakeven
                    } else {
                        ExitTag::Sl
                    },
                });
                remaining = Decimal::ZERO;
                break;
            }

            // 2. 2차 목표가 (전량)
            if *price >= target2 {
                fills.push(Fill {
                    date: *date,
                    price: *price,
                    portion: remaining,
                    tag: ExitTag::Tp2,
                });
                remaining = Decimal::ZERO;
                break;
            }

            // 3. 1차 목표가 (최초 1회 부분 익절 + 본전 손절 이동)
            if !breakeven_active && *price >= target1 {
                fills.push(Fill {
                    date: *date,
                    price: *price,
                    portion: self.config.partial_take_ratio,
                    tag: ExitTag::Tp1,
                });
                remaining -= self.config.partial_take_ratio;
                current_sl = entry_price;
                breakeven_active = true;
            }
        }

        // 시계열 종료: 잔여분을 마지막 종가로 평가
        if remaining > Decimal::ZERO {
            let (last_date, last_price) = series.iter().next_back()?;
            fills.push(Fill {
                date: *last_date,
                price: *last_price,
                portion: remaining,
                tag: ExitTag::Hold,
            });
        }

        let last_fill = fills.last()?;
        let final_exit_price = last_fill.price;
        let last_exit_date = last_fill.date;

        let weighted_return: Decimal = fills
            .iter()
            .map(|f| (f.price - entry_price) / entry_price * f.portion)
            .sum();
        let return_percent = weighted_return * dec!(100);

        // ±0.01%p 이내는 본전
        let status = if return_percent > dec!(0.01) {
            TradeStatus::Win
        } else if return_percent < dec!(-0.01) {
            TradeStatus::Loss
        } else {
            TradeStatus::Breakeven
        };

        Some(SimulatedTrade {
            ticker: ticker.to_string(),
            entry_date: pick.date,
            entry_price,
            final_exit_price,
            return_percent,
            status,
            days_held: (last_exit_date - pick.date).num_days(),
            exit_path: fills.iter().map(|f| f.tag).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use dailyport_core::PickTargets;

    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn series(points: &[(NaiveDate, Decimal)]) -> ClosePriceSeries {
        points.iter().copied().collect()
    }

    fn single_ticker_prices(points: &[(NaiveDate, Decimal)]) -> HashMap<String, ClosePriceSeries> {
        let mut map = HashMap::new();
        map.insert("A".to_string(), series(points));
        map
    }

    #[test]
    fn test_tp1_then_tp2_path() {
        let picks = vec![StrategyPick::new("s", date(1, 2), vec!["A".to_string()])
            .with_targets("A", PickTargets::new(dec!(115), dec!(125)))];
        let prices = single_ticker_prices(&[
            (date(1, 2), dec!(100)),
            (date(1, 5), dec!(116)),
            (date(1, 10), dec!(127)),
        ]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        assert_eq!(summary.total_trades, 1);

        let trade = &summary.trades[0];
        assert_eq!(trade.exit_note(), "TP1 -> TP2");
        // 0.5 × 16% + 0.5 × 27% = 21.5%
        assert_eq!(trade.return_percent, dec!(21.5));
        assert_eq!(trade.status, TradeStatus::Win);
        assert_eq!(trade.days_held, 8);
        assert_eq!(summary.profit_factor, dec!(100));
    }

    #[test]
    fn test_stop_loss_path() {
        let picks = vec![StrategyPick::new("s", date(1, 2), vec!["A".to_string()])];
        let prices = single_ticker_prices(&[
            (date(1, 2), dec!(100)),
            (date(1, 3), dec!(95)),
            (date(1, 4), dec!(89)), // 손절선 90 이탈
            (date(1, 5), dec!(120)),
        ]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        let trade = &summary.trades[0];
        assert_eq!(trade.exit_note(), "SL");
        assert_eq!(trade.status, TradeStatus::Loss);
        assert_eq!(trade.return_percent, dec!(-11));
        assert_eq!(trade.final_exit_price, dec!(89));
    }

    #[test]
    fn test_breakeven_stop_after_tp1() {
        let picks = vec![StrategyPick::new("s", date(1, 2), vec!["A".to_string()])
            .with_targets("A", PickTargets::new(dec!(110), dec!(150)))];
        let prices = single_ticker_prices(&[
            (date(1, 2), dec!(100)),
            (date(1, 3), dec!(112)), // TP1, 손절선 → 100
            (date(1, 4), dec!(100)), // 본전 손절
        ]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        let trade = &summary.trades[0];
        assert_eq!(trade.exit_note(), "TP1 -> SL_BREAKEVEN");
        // 0.5 × 12% + 0.5 × 0% = 6%
        assert_eq!(trade.return_percent, dec!(6));
        assert_eq!(trade.status, TradeStatus::Win);
    }

    #[test]
    fn test_hold_at_end_of_data() {
        let picks = vec![StrategyPick::new("s", date(1, 2), vec!["A".to_string()])];
        let prices = single_ticker_prices(&[
            (date(1, 2), dec!(100)),
            (date(1, 3), dec!(103)),
            (date(1, 4), dec!(105)),
        ]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        let trade = &summary.trades[0];
        assert_eq!(trade.exit_note(), "HOLD");
        assert_eq!(trade.return_percent, dec!(5));
        assert_eq!(trade.final_exit_price, dec!(105));
    }

    #[test]
    fn test_cooldown_blocks_second_signal() {
        let picks = vec![
            StrategyPick::new("s", date(1, 1), vec!["A".to_string()]),
            StrategyPick::new("s", date(1, 3), vec!["A".to_string()]), // 2일 차 - 쿨다운
        ];
        let prices = single_ticker_prices(&[
            (date(1, 1), dec!(100)),
            (date(1, 2), dec!(101)),
            (date(1, 3), dec!(102)),
            (date(1, 4), dec!(103)),
        ]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.trades[0].entry_date, date(1, 1));
    }

    #[test]
    fn test_reentry_allowed_after_cooldown() {
        let picks = vec![
            StrategyPick::new("s", date(1, 1), vec!["A".to_string()]),
            StrategyPick::new("s", date(1, 8), vec!["A".to_string()]), // 7일 차 - 허용
        ];
        let prices = single_ticker_prices(&[
            (date(1, 1), dec!(100)),
            (date(1, 8), dec!(102)),
            (date(1, 9), dec!(104)),
        ]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        assert_eq!(summary.total_trades, 2);
        // 최신순 정렬
        assert_eq!(summary.trades[0].entry_date, date(1, 8));
        assert_eq!(summary.trades[1].entry_date, date(1, 1));
    }

    #[test]
    fn test_missing_price_data_is_skipped_silently() {
        let picks = vec![StrategyPick::new(
            "s",
            date(1, 2),
            vec!["A".to_string(), "B".to_string()],
        )];
        // B는 시계열 자체가 없음
        let prices = single_ticker_prices(&[(date(1, 2), dec!(100)), (date(1, 3), dec!(101))]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.trades[0].ticker, "A");
    }

    #[test]
    fn test_entry_falls_to_next_available_date() {
        // 픽 일자(1/2)에 가격이 없으면 다음 거래일(1/4) 종가로 진입
        let picks = vec![StrategyPick::new("s", date(1, 2), vec!["A".to_string()])];
        let prices = single_ticker_prices(&[(date(1, 4), dec!(200)), (date(1, 5), dec!(210))]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        assert_eq!(summary.trades[0].entry_price, dec!(200));
    }

    #[test]
    fn test_no_future_price_means_no_trade() {
        let picks = vec![StrategyPick::new("s", date(2, 1), vec!["A".to_string()])];
        // 모든 가격이 픽 일자 이전
        let prices = single_ticker_prices(&[(date(1, 2), dec!(100)), (date(1, 3), dec!(101))]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.profit_factor, Decimal::ZERO);
    }

    #[test]
    fn test_top_n_cutoff() {
        let picks = vec![StrategyPick::new(
            "s",
            date(1, 2),
            vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ],
        )];
        let mut prices = HashMap::new();
        for t in ["A", "B", "C", "D"] {
            prices.insert(
                t.to_string(),
                series(&[(date(1, 2), dec!(100)), (date(1, 3), dec!(101))]),
            );
        }

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        // 상위 3개만 평가
        assert_eq!(summary.total_trades, 3);
        assert!(summary.trades.iter().all(|t| t.ticker != "D"));
    }

    #[test]
    fn test_max_picks_window_keeps_newest() {
        let config = ReplayConfig::default().with_max_picks(1).with_cooldown_days(0);
        let picks = vec![
            StrategyPick::new("s", date(1, 1), vec!["A".to_string()]),
            StrategyPick::new("s", date(1, 10), vec!["A".to_string()]),
        ];
        let prices = single_ticker_prices(&[
            (date(1, 1), dec!(100)),
            (date(1, 10), dec!(100)),
            (date(1, 11), dec!(101)),
        ]);

        let summary = SignalReplay::with_config(config)
            .run("s", &picks, &prices)
            .unwrap();
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.trades[0].entry_date, date(1, 10));
    }

    #[test]
    fn test_default_targets_applied_when_missing() {
        // 목표가 미지정: 115/125 기본값 → 126 도달 시 TP2 직행
        let picks = vec![StrategyPick::new("s", date(1, 2), vec!["A".to_string()])];
        let prices = single_ticker_prices(&[(date(1, 2), dec!(100)), (date(1, 3), dec!(126))]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        assert_eq!(summary.trades[0].exit_note(), "TP2");
        assert_eq!(summary.trades[0].return_percent, dec!(26));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ReplayConfig::default().with_top_n_tickers(0);
        let result = SignalReplay::with_config(config).run("s", &[], &HashMap::new());
        assert!(matches!(result, Err(ReplayError::ConfigError(_))));
    }

    #[test]
    fn test_empty_picks_empty_summary() {
        let summary = SignalReplay::new()
            .run("Trend_Following", &[], &HashMap::new())
            .unwrap();
        assert_eq!(summary.strategy, "Trend_Following");
        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.win_rate, Decimal::ZERO);
    }

    #[test]
    fn test_breakeven_status_within_threshold() {
        // 진입 100 → 마지막 100: 수익률 0 → BREAKEVEN
        let picks = vec![StrategyPick::new("s", date(1, 2), vec!["A".to_string()])];
        let prices = single_ticker_prices(&[(date(1, 2), dec!(100)), (date(1, 3), dec!(100))]);

        let summary = SignalReplay::new().run("s", &picks, &prices).unwrap();
        assert_eq!(summary.trades[0].status, TradeStatus::Breakeven);
        assert_eq!(summary.win_rate, Decimal::ZERO);
    }
}
