//! KRX 호가 단위(틱) 반올림.
//!
//! 계산된 진입/손절/목표가는 실제 주문 가능한 호가 단위로
//! 반올림해 제공합니다. 단위는 가격 구간별로 다릅니다:
//! 10,000원 미만 10원, 100,000원 미만 100원, 그 이상 1,000원.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// 가격 구간에 해당하는 호가 단위를 반환합니다.
pub fn market_tick(price: Decimal) -> Decimal {
    if price < dec!(10000) {
        dec!(10)
    } else if price < dec!(100000) {
        dec!(100)
    } else {
        dec!(1000)
    }
}

/// 가격을 가장 가까운 호가 단위 배수로 반올림합니다.
///
/// 중간값은 0에서 먼 쪽으로 올립니다. `Decimal::round`의 기본
/// 전략(은행가 반올림)은 쓰지 않습니다.
pub fn round_to_tick(price: Decimal) -> Decimal {
    let tick = market_tick(price);
    (price / tick).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * tick
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_brackets() {
        assert_eq!(market_tick(dec!(9999)), dec!(10));
        assert_eq!(market_tick(dec!(10000)), dec!(100));
        assert_eq!(market_tick(dec!(99999)), dec!(100));
        assert_eq!(market_tick(dec!(100000)), dec!(1000));
        assert_eq!(market_tick(dec!(750000)), dec!(1000));
    }

    #[test]
    fn test_rounding_to_tick() {
        assert_eq!(round_to_tick(dec!(9994)), dec!(9990));
        assert_eq!(round_to_tick(dec!(9995)), dec!(10000));
        assert_eq!(round_to_tick(dec!(12345)), dec!(12300));
        assert_eq!(round_to_tick(dec!(12350)), dec!(12400));
        assert_eq!(round_to_tick(dec!(123456)), dec!(123000));
        assert_eq!(round_to_tick(dec!(123500)), dec!(124000));
    }

    #[test]
    fn test_rounded_value_is_tick_multiple() {
        for price in [dec!(4517), dec!(68420), dec!(514999.5)] {
            let rounded = round_to_tick(price);
            let tick = market_tick(price);
            assert_eq!(rounded % tick, Decimal::ZERO, "price={price}");
        }
    }

    #[test]
    fn test_bracket_boundary_rounds_up_into_next_bracket() {
        // 9,996원: 10원 단위 반올림이 10,000원을 만든다
        assert_eq!(round_to_tick(dec!(9996)), dec!(10000));
    }
}
