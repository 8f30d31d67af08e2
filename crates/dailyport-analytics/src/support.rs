//! 지지선 탐지기.
//!
//! 스윙 로우 피벗을 찾아 강도를 매기고, 이동평균선을 합성 지지선으로
//! 더한 뒤, 가까운 후보들을 클러스터로 병합해 순위화된 지지선 목록을
//! 만듭니다. 호출 단위로 새로 계산되는 일회성 결과입니다.
//!
//! # 강도 산정 (기본 20점, 가산)
//!
//! - +15: 피벗 봉과 다음 봉의 평균 거래량이 직전 20봉 평균의 1.2배 초과
//! - 최대 +20: 피벗 저가 대비 이후 5봉 최고가 반등률 × 2 (20점 상한)
//! - +10: 저가가 1% 이내로 겹치는 다른 피벗 하나당 (재출현 보너스)
//!
//! 이동평균 합성 지지선은 고정 강도 10입니다.

use dailyport_core::PriceBar;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::indicators::{IndicatorError, IndicatorResult};

/// 피벗 판정 윈도우 (양쪽 봉 수).
pub const PIVOT_WINDOW: usize = 5;

/// 피벗 탐지에 필요한 최소 봉 수.
pub const MIN_SUPPORT_CANDLES: usize = PIVOT_WINDOW * 2 + 1;

/// 탐지된 지지선 하나.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportLevel {
    /// 지지 가격
    pub price: Decimal,
    /// 강도 점수
    pub strength: Decimal,
    /// 이동평균 합성 지지선 여부
    pub is_moving_average: bool,
}

/// 지지선 탐지기.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportDetector;

impl SupportDetector {
    /// 새 탐지기를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 지지선 목록을 계산합니다.
    ///
    /// `moving_averages`는 합성 지지선으로 추가할 이동평균 현재값
    /// (MA20/60/120)입니다. 반환 목록은 강도 내림차순으로 정렬됩니다.
    ///
    /// # 에러
    ///
    /// 봉 수가 [`MIN_SUPPORT_CANDLES`] 미만이면 `InsufficientData`.
    pub fn detect(
        &self,
        bars: &[PriceBar],
        moving_averages: &[Decimal],
    ) -> IndicatorResult<Vec<SupportLevel>> {
        if bars.len() < MIN_SUPPORT_CANDLES {
            return Err(IndicatorError::InsufficientData {
                required: MIN_SUPPORT_CANDLES,
                provided: bars.len(),
            });
        }

        let pivot_indices = find_pivots(bars);

        let mut candidates: Vec<SupportLevel> = pivot_indices
            .iter()
            .map(|&i| SupportLevel {
                price: bars[i].low,
                strength: pivot_strength(bars, i, &pivot_indices),
                is_moving_average: false,
            })
            .collect();

        for ma in moving_averages {
            candidates.push(SupportLevel {
                price: *ma,
                strength: dec!(10),
                is_moving_average: true,
            });
        }

        let mut clusters = cluster_levels(candidates);
        clusters.sort_by(|a, b| {
            b.strength
                .cmp(&a.strength)
                .then(b.price.cmp(&a.price))
        });
        Ok(clusters)
    }
}

/// 스윙 로우 피벗 인덱스를 찾습니다.
///
/// 양쪽 가장자리 `PIVOT_WINDOW`개 봉은 판정에서 제외하고, 저가가
/// 좌우 `PIVOT_WINDOW`개 봉의 최저가 이하인 봉을 피벗으로 봅니다.
fn find_pivots(bars: &[PriceBar]) -> Vec<usize> {
    let n = bars.len();
    let mut pivots = Vec::new();

    for i in PIVOT_WINDOW..(n - PIVOT_WINDOW) {
        let low = bars[i].low;
        let left_min = bars[i - PIVOT_WINDOW..i]
            .iter()
            .map(|b| b.low)
            .min()
            .expect("윈도우는 비어 있지 않음");
        let right_min = bars[i + 1..=i + PIVOT_WINDOW]
            .iter()
            .map(|b| b.low)
            .min()
            .expect("윈도우는 비어 있지 않음");

        if low <= left_min && low <= right_min {
            pivots.push(i);
        }
    }
    pivots
}

/// 피벗 하나의 강도를 계산합니다.
fn pivot_strength(bars: &[PriceBar], i: usize, pivots: &[usize]) -> Decimal {
    let mut strength = dec!(20);

    // 거래량 보너스: 피벗 봉 + 다음 봉 평균이 직전 20봉 평균의 1.2배 초과
    let trailing = &bars[i.saturating_sub(20)..i];
    if !trailing.is_empty() {
        let trailing_avg = trailing.iter().map(|b| b.volume).sum::<Decimal>()
            / Decimal::from(trailing.len() as u64);
        let pivot_avg = (bars[i].volume + bars[i + 1].volume) / dec!(2);
        if !trailing_avg.is_zero() && pivot_avg > trailing_avg * dec!(1.2) {
            strength += dec!(15);
        }
    }

    // 반등 보너스: 이후 5봉 최고가까지의 반등률 × 2, 20점 상한
    let low = bars[i].low;
    if !low.is_zero() {
        let rebound_high = bars[i + 1..=i + PIVOT_WINDOW]
            .iter()
            .map(|b| b.high)
            .max()
            .expect("윈도우는 비어 있지 않음");
        let rebound_pct = (rebound_high - low) / low * dec!(100);
        strength += (rebound_pct * dec!(2)).min(dec!(20)).max(Decimal::ZERO);
    }

    // 재출현 보너스: 1% 이내 저가를 가진 다른 피벗 하나당 +10
    if !low.is_zero() {
        for &j in pivots {
            if j == i {
                continue;
            }
            let distance = (bars[j].low - low).abs() / low;
            if distance <= dec!(0.01) {
                strength += dec!(10);
            }
        }
    }

    strength
}

/// 2% 이내 후보들을 클러스터로 병합합니다.
///
/// 후보에 전순서(가격 내림차순 → 강도 내림차순 → 피벗 우선)를 준 뒤
/// 접어 넣으므로 입력 순서와 무관하게 같은 결과가 나옵니다. 병합 시
/// 강도가 더 높은 쪽이 대표가 되고, 동률이면 먼저 만난 쪽을 유지합니다.
fn cluster_levels(mut candidates: Vec<SupportLevel>) -> Vec<SupportLevel> {
    candidates.sort_by(|a, b| {
        b.price
            .cmp(&a.price)
            .then(b.strength.cmp(&a.strength))
            .then(a.is_moving_average.cmp(&b.is_moving_average))
    });

    let mut clusters: Vec<SupportLevel> = Vec::new();
    for candidate in candidates {
        if let Some(rep) = clusters.last_mut() {
            if !rep.price.is_zero() {
                let distance = (rep.price - candidate.price).abs() / rep.price;
                if distance <= dec!(0.02) {
                    if candidate.strength > rep.strength {
                        *rep = candidate;
                    }
                    continue;
                }
            }
        }
        clusters.push(candidate);
    }
    clusters
}
