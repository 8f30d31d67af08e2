//! 타임프레임별 매매 목표 결과.
//!
//! 플래너가 타임프레임(단기/중기/장기)마다 하나씩 생성하는 결과
//! 엔티티입니다. 직렬화 이름은 기존 리포트 페이로드의
//! SCREAMING_SNAKE_CASE 표기를 그대로 따릅니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 매매 목표 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveStatus {
    /// 즉시 진입 검토 가능
    Active,
    /// 관망 (조건 일부 미충족)
    Wait,
    /// 제외 (유효한 지지 후보 없음)
    Avoid,
}

impl std::fmt::Display for ObjectiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveStatus::Active => write!(f, "ACTIVE"),
            ObjectiveStatus::Wait => write!(f, "WAIT"),
            ObjectiveStatus::Avoid => write!(f, "AVOID"),
        }
    }
}

/// 권장 전략 태그.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStrategy {
    /// 상승 추세 눌림목 매수
    PullbackTrend,
    /// 평균회귀
    MeanReversion,
    /// 매매 금지
    NoTrade,
}

impl std::fmt::Display for TradeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeStrategy::PullbackTrend => write!(f, "PULLBACK_TREND"),
            TradeStrategy::MeanReversion => write!(f, "MEAN_REVERSION"),
            TradeStrategy::NoTrade => write!(f, "NO_TRADE"),
        }
    }
}

/// 신뢰도 플래그.
///
/// 후보 채택 여부와 무관하게 지표 상태만으로 결정됩니다.
/// `UptrendConfirmed`/`BrokenTrend`, `Overbought`/`Oversold`는
/// 각각 상호 배타적입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceFlag {
    /// 이평선 정배열 (MA20 > MA60 > MA120)
    UptrendConfirmed,
    /// 추세 이탈 (MA20 < MA60)
    BrokenTrend,
    /// RSI 과매수 (> 70)
    Overbought,
    /// RSI 과매도 (< 30)
    Oversold,
}

/// AVOID 사유 코드.
///
/// 우선순위: `TrendBreak` > `Overbought` > `NoSupport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvoidReason {
    /// 유효한 지지 후보 없음
    NoSupport,
    /// RSI 과매수
    Overbought,
    /// 이평선 역배열
    TrendBreak,
}

/// 타임프레임 하나의 매매 목표.
///
/// 가격 필드(entry/stop/target/target2)는 유효한 지지 후보가
/// 채택된 경우에만 채워집니다. 이 결합을 nullability 추론에
/// 맡기지 않고 `has_valid_levels`로 명시합니다: ACTIVE/WAIT 모두
/// 가격을 가질 수 있고, AVOID일 때만 모두 비어 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeObjective {
    /// 상태
    pub status: ObjectiveStatus,
    /// 최종 점수 (0 ~ 100)
    pub score: Decimal,
    /// 권장 전략
    pub strategy: TradeStrategy,
    /// 신뢰도 플래그
    pub confidence_flags: Vec<ConfidenceFlag>,
    /// 사람이 읽을 수 있는 요약
    pub reason: String,
    /// 유효한 지지 후보 채택 여부
    pub has_valid_levels: bool,
    /// 진입가 (틱 반올림)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Decimal>,
    /// 손절가 (틱 반올림)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Decimal>,
    /// 1차 목표가 (틱 반올림)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Decimal>,
    /// 2차 목표가 (틱 반올림)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target2: Option<Decimal>,
    /// 손익비 (target - entry) / (entry - stop)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rr: Option<Decimal>,
    /// AVOID 사유 (AVOID일 때만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avoid_code: Option<AvoidReason>,
}

impl TradeObjective {
    /// 가격 필드와 `has_valid_levels`의 결합 불변식을 검사합니다.
    pub fn levels_consistent(&self) -> bool {
        let all_some = self.entry.is_some()
            && self.stop.is_some()
            && self.target.is_some()
            && self.target2.is_some();
        let all_none = self.entry.is_none()
            && self.stop.is_none()
            && self.target.is_none()
            && self.target2.is_none();

        if self.has_valid_levels {
            all_some && self.status != ObjectiveStatus::Avoid
        } else {
            all_none && self.status == ObjectiveStatus::Avoid
        }
    }

    /// 특정 플래그 보유 여부.
    pub fn has_flag(&self, flag: ConfidenceFlag) -> bool {
        self.confidence_flags.contains(&flag)
    }
}

/// 3개 타임프레임의 매매 목표 묶음.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveSet {
    /// 단기 (ATR 1.5배 / R:R 2.0)
    pub short: TradeObjective,
    /// 중기 (ATR 2.0배 / R:R 2.5)
    pub mid: TradeObjective,
    /// 장기 (ATR 3.0배 / R:R 3.0)
    pub long: TradeObjective,
}

impl ObjectiveSet {
    /// 세 타임프레임을 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &TradeObjective> {
        [&self.short, &self.mid, &self.long].into_iter()
    }

    /// 모든 타임프레임이 AVOID인지 확인합니다.
    pub fn all_avoid(&self) -> bool {
        self.iter()
            .all(|o| o.status == ObjectiveStatus::Avoid)
    }
}
