//! 시그널 리플레이 백테스트.
//!
//! 기록된 전략 픽을 종가 시계열에 재생해 부분 익절 브래킷 청산으로
//! 성과를 집계합니다.
//!
//! # 주요 구성요소
//!
//! - [`ReplayConfig`]: 리플레이 설정 (픽 윈도우, 쿨다운, 기본 목표가 등)
//! - [`SignalReplay`]: 리플레이 엔진
//! - [`ReplayError`]: 설정 검증 오류

pub mod replay;

pub use replay::{ReplayConfig, ReplayError, SignalReplay};
