//! Property-based tests for document numbering, quotation arithmetic and
//! checkout signatures.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use procurement_api::models::vendor_quotation::QuotationTotals;
use procurement_api::services::numbering::{next_po_number, next_product_code, next_vendor_code};
use procurement_api::services::payment_gateway::{checkout_signature, verify_checkout_signature};

fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..5_000).prop_map(|basis| Decimal::new(basis, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn vendor_code_exceeds_every_existing_code(numbers in prop::collection::vec(any::<u32>(), 0..20)) {
        let codes: Vec<String> = numbers.iter().map(|n| format!("VEND-{:04}", n)).collect();
        let next = next_vendor_code(codes.iter().map(String::as_str));
        let value: u64 = next.trim_start_matches("VEND-").parse().unwrap();

        prop_assert!(value > 1000);
        prop_assert!(numbers.iter().all(|n| value > u64::from(*n)));
        prop_assert!(!codes.contains(&next));
    }

    #[test]
    fn product_code_is_one_past_the_highest(numbers in prop::collection::vec(1u32..5_000, 1..20)) {
        let codes: Vec<String> = numbers.iter().map(|n| format!("PID{:03}", n)).collect();
        let next = next_product_code(codes.iter().map(String::as_str));
        let expected = numbers.iter().max().unwrap() + 1;
        prop_assert_eq!(next, format!("PID{:03}", expected));
    }

    #[test]
    fn po_sequence_continues_across_days(seq in 0u32..9_998, day in 1u32..28) {
        let today = NaiveDate::from_ymd_opt(2030, 1, day).unwrap();
        let previous = format!("PO-20291231-{:04}", seq);
        let next = next_po_number(today, Some(&previous));
        prop_assert_eq!(next, format!("PO-203001{:02}-{:04}", day, seq + 1));
    }

    #[test]
    fn quotation_total_is_subtotal_plus_tax_plus_shipping(
        quantity in 1i32..10_000,
        unit_price in money_strategy(),
        tax_rate in rate_strategy(),
        shipping in money_strategy(),
    ) {
        let totals = QuotationTotals::compute(quantity, unit_price, tax_rate, shipping).unwrap();

        prop_assert_eq!(totals.subtotal, Decimal::from(quantity) * unit_price);
        prop_assert_eq!(totals.total_amount, totals.subtotal + totals.tax_amount + shipping);
        prop_assert!(totals.tax_amount >= Decimal::ZERO);
        prop_assert!(totals.total_amount >= totals.subtotal);
    }

    #[test]
    fn signatures_only_verify_for_the_signed_pair(
        order_id in "order_[A-Za-z0-9]{8,14}",
        payment_id in "pay_[A-Za-z0-9]{8,14}",
        secret in "[a-z0-9]{16,32}",
    ) {
        let signature = checkout_signature(&secret, &order_id, &payment_id).unwrap();
        prop_assert_eq!(signature.len(), 64);
        prop_assert!(verify_checkout_signature(&secret, &order_id, &payment_id, &signature));
        prop_assert!(!verify_checkout_signature(&secret, &payment_id, &order_id, &signature));
        let other_secret = format!("{secret}x");
        prop_assert!(!verify_checkout_signature(&other_secret, &order_id, &payment_id, &signature));
    }
}
