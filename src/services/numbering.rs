//! Document number generation.
//!
//! Sequential codes (vendor, product, purchase order) are derived from the
//! highest code already stored; timestamped numbers carry a random suffix.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

pub const VENDOR_CODE_PREFIX: &str = "VEND-";
pub const PRODUCT_CODE_PREFIX: &str = "PID";
pub const PO_NUMBER_PREFIX: &str = "PO-";

/// Vendor codes start above this floor.
const VENDOR_CODE_FLOOR: u64 = 1000;

/// Successor of a stored sequence number. Numbers that cannot be followed
/// are skipped rather than wrapped.
fn successor(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok()?.checked_add(1)
}

fn random_digits(len: u32) -> String {
    let low = 10u32.pow(len - 1);
    let high = 10u32.pow(len);
    rand::thread_rng().gen_range(low..high).to_string()
}

/// Reference handed to a vendor at self-registration, e.g. `TEMP-20250301-48213`.
pub fn temporary_vendor_code(now: DateTime<Utc>) -> String {
    format!("TEMP-{}-{}", now.format("%Y%m%d"), random_digits(5))
}

/// Next permanent vendor code after every `VEND-` code in `existing`.
pub fn next_vendor_code<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let next = existing
        .into_iter()
        .filter_map(|code| code.strip_prefix(VENDOR_CODE_PREFIX))
        .filter_map(successor)
        .fold(VENDOR_CODE_FLOOR + 1, u64::max);
    format!("{}{:04}", VENDOR_CODE_PREFIX, next)
}

/// Next product code, `PID001` for an empty catalog.
pub fn next_product_code<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let next = existing
        .into_iter()
        .filter_map(|code| code.strip_prefix(PRODUCT_CODE_PREFIX))
        .filter_map(successor)
        .max()
        .unwrap_or(1);
    format!("{}{:03}", PRODUCT_CODE_PREFIX, next)
}

pub fn rfq_number(now: DateTime<Utc>) -> String {
    format!("RFQ-{}-{}", now.format("%Y%m%d%H%M%S"), random_digits(4))
}

pub fn quotation_number(now: DateTime<Utc>) -> String {
    format!("QUOTE-{}-{}", now.format("%Y%m%d%H%M%S"), random_digits(4))
}

/// PO numbers keep one running counter across days: the date part is today's,
/// the sequence continues from the highest stored number.
pub fn next_po_number(today: NaiveDate, highest: Option<&str>) -> String {
    let next = highest
        .and_then(|number| number.rsplit('-').next())
        .and_then(successor)
        .unwrap_or(1);
    format!("{}{}-{:04}", PO_NUMBER_PREFIX, today.format("%Y%m%d"), next)
}

pub fn payment_number(now: DateTime<Utc>) -> String {
    format!("PAY-{}", now.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 14, 5, 9).unwrap()
    }

    #[rstest]
    #[case(&[], "VEND-1001")]
    #[case(&["TEMP-20250301-12345"], "VEND-1001")]
    #[case(&["VEND-1001", "VEND-1007", "VEND-1003"], "VEND-1008")]
    #[case(&["VEND-0042", "VEND-abc"], "VEND-1001")]
    #[case(&["VEND-4294967295"], "VEND-4294967296")]
    #[case(&["VEND-18446744073709551615", "VEND-1002"], "VEND-1003")]
    fn vendor_codes_continue_above_floor(#[case] existing: &[&str], #[case] expected: &str) {
        assert_eq!(next_vendor_code(existing.iter().copied()), expected);
    }

    #[rstest]
    #[case(&[], "PID001")]
    #[case(&["PID001", "PID009"], "PID010")]
    #[case(&["PID999"], "PID1000")]
    #[case(&["SKU-1", "PIDX"], "PID001")]
    #[case(&["PID4294967295"], "PID4294967296")]
    fn product_codes_are_sequential(#[case] existing: &[&str], #[case] expected: &str) {
        assert_eq!(next_product_code(existing.iter().copied()), expected);
    }

    #[test]
    fn po_numbers_continue_highest_sequence() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert_eq!(next_po_number(today, None), "PO-20250302-0001");
        assert_eq!(
            next_po_number(today, Some("PO-20250301-0041")),
            "PO-20250302-0042"
        );
        assert_eq!(next_po_number(today, Some("PO-legacy")), "PO-20250302-0001");
        assert_eq!(
            next_po_number(today, Some("PO-20250301-18446744073709551615")),
            "PO-20250302-0001"
        );
    }

    #[test]
    fn timestamped_numbers_have_expected_shape() {
        let rfq = rfq_number(at());
        assert!(rfq.starts_with("RFQ-20250301140509-"));
        assert_eq!(rfq.len(), "RFQ-20250301140509-".len() + 4);

        let quote = quotation_number(at());
        assert!(quote.starts_with("QUOTE-20250301140509-"));

        let temp = temporary_vendor_code(at());
        let suffix = temp.strip_prefix("TEMP-20250301-").unwrap();
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));

        assert_eq!(payment_number(at()), "PAY-20250301140509");
    }
}
