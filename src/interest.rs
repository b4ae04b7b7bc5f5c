//! Actual/365 repurchase price calculation
use super::error::ContractError;
use super::types::Amount;
use super::utils::date_part;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const DATE_FORMAT: &str = "%d.%m.%Y";
pub const DAYS_IN_YEAR: Decimal = dec!(365);

/// Parses the `dd.mm.yyyy` prefix of a date or date-time string.
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_part(value), DATE_FORMAT)
}

/// Whole days from `start` to `end`, negative when `end` comes first.
pub fn elapsed_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// `P + (P * r * d / 365) / 100`, rounded half away from zero to cents.
///
/// Fails instead of panicking when an intermediate value leaves the
/// `Decimal` range.
pub fn repurchase_price(
    principal: Amount,
    annual_rate: Amount,
    days: i64,
) -> Result<Amount, ContractError> {
    let p = principal.value();
    let price = p
        .checked_mul(annual_rate.value())
        .and_then(|v| v.checked_mul(Decimal::from(days)))
        .and_then(|v| v.checked_div(DAYS_IN_YEAR))
        .and_then(|v| v.checked_div(dec!(100)))
        .and_then(|accrued| p.checked_add(accrued))
        .ok_or(ContractError::Parse {
            field: "amount",
            kind: "in-range decimal",
        })?;

    Ok(price
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_days_at_six_percent() {
        let price = repurchase_price(Amount::from(1_000_000), Amount::new(dec!(6.0)), 30).unwrap();

        assert_eq!(price, Amount::new(dec!(1004931.51)));
    }

    #[test]
    fn zero_days_is_principal() {
        let price = repurchase_price(Amount::from(250_000), Amount::new(dec!(7.25)), 0).unwrap();

        assert_eq!(price.value(), dec!(250000));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 73 days at 1% on 0.5 accrues exactly 0.001
        let price = repurchase_price(Amount::new(dec!(0.5)), Amount::new(dec!(1)), 73).unwrap();
        assert_eq!(price.value(), dec!(0.50));

        // 0.005 accrued must round up, not to even
        let price = repurchase_price(Amount::new(dec!(0.5)), Amount::new(dec!(5)), 73).unwrap();
        assert_eq!(price.value(), dec!(0.51));

        let price = repurchase_price(Amount::new(dec!(-0.5)), Amount::new(dec!(5)), 73).unwrap();
        assert_eq!(price.value(), dec!(-0.51));
    }

    #[test]
    fn overflow_is_an_error() {
        let max = Amount::new(Decimal::MAX);
        assert!(matches!(
            repurchase_price(max, Amount::from(100), 1),
            Err(ContractError::Parse {
                field: "amount",
                ..
            })
        ));
        // year-one fallback date: roughly -738000 days
        let err = repurchase_price(
            Amount::new(Decimal::from_i128_with_scale(10_i128.pow(22), 0)),
            Amount::from(20),
            -738_000,
        );
        assert!(err.is_err());
    }

    #[test]
    fn parse_date_ignores_time_of_day() {
        let date = parse_date("15.03.2024 18:45:00 +0300").unwrap();

        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert!(parse_date("2024-03-15").is_err());
    }

    #[test]
    fn elapsed_days_spans_leap_day() {
        let start = parse_date("27.02.2024").unwrap();
        let end = parse_date("02.03.2024").unwrap();

        assert_eq!(elapsed_days(start, end), 4);
        assert_eq!(elapsed_days(end, start), -4);
    }
}
