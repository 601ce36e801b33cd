//! Field validators for money, rates and day counts.
//!
//! Amounts carry at most two decimal places so that stored products such as
//! `quantity * unit_price` are exact.

use rust_decimal::Decimal;
use validator::ValidationError;

/// Longest delivery estimate a quotation may promise, in days.
pub const MAX_DELIVERY_DAYS: i32 = 3650;

fn error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Non-negative, at most two decimal places and `max_digits` digits in total.
fn check(value: &Decimal, max_digits: u32) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(error(
            "range",
            "Ensure this value is greater than or equal to 0.".to_string(),
        ));
    }
    if value.normalize().scale() > 2 {
        return Err(error(
            "decimal_places",
            "Ensure that there are no more than 2 decimal places.".to_string(),
        ));
    }
    let limit = Decimal::from(10u64.pow(max_digits - 2));
    if value.trunc() >= limit {
        return Err(error(
            "max_digits",
            format!("Ensure that there are no more than {max_digits} digits in total."),
        ));
    }
    Ok(())
}

/// Unit prices, shipping costs and other per-line money.
pub(crate) fn price(value: &Decimal) -> Result<(), ValidationError> {
    check(value, 10)
}

/// Document totals and limits.
pub(crate) fn amount(value: &Decimal) -> Result<(), ValidationError> {
    check(value, 12)
}

/// Tax percentages.
pub(crate) fn rate(value: &Decimal) -> Result<(), ValidationError> {
    check(value, 5)
}

/// Payment amounts: a strictly positive [`amount`].
pub(crate) fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(error(
            "range",
            "Ensure this value is greater than 0.".to_string(),
        ));
    }
    amount(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(result: Result<(), ValidationError>) -> Option<String> {
        result.err().map(|e| e.code.to_string())
    }

    #[test]
    fn prices_accept_cents() {
        assert!(price(&dec!(0)).is_ok());
        assert!(price(&dec!(19.99)).is_ok());
        assert!(price(&dec!(1.500)).is_ok());
        assert!(price(&dec!(99999999.99)).is_ok());
    }

    #[test]
    fn prices_reject_bad_values() {
        assert_eq!(code(price(&dec!(-0.01))).as_deref(), Some("range"));
        assert_eq!(code(price(&dec!(0.333))).as_deref(), Some("decimal_places"));
        assert_eq!(code(price(&dec!(100000000))).as_deref(), Some("max_digits"));
        assert_eq!(code(price(&Decimal::MAX)).as_deref(), Some("max_digits"));
    }

    #[test]
    fn rates_stop_below_one_thousand() {
        assert!(rate(&dec!(18)).is_ok());
        assert!(rate(&dec!(999.99)).is_ok());
        assert_eq!(code(rate(&dec!(1000))).as_deref(), Some("max_digits"));
    }

    #[test]
    fn payments_must_be_positive() {
        assert_eq!(code(positive_amount(&Decimal::ZERO)).as_deref(), Some("range"));
        assert!(positive_amount(&dec!(1230)).is_ok());
        assert_eq!(
            code(positive_amount(&dec!(10000000000))).as_deref(),
            Some("max_digits")
        );
    }
}
