//! Visit and billing tests
//!
//! Tests for visit-number generation, worklist status transitions and
//! the billing summary.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{
    bill_parts_total, format_visit_number, parse_visit_sequence, visit_number_day_prefix,
    VisitBillLine, VisitStatus, DAILY_VISIT_CAP,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn june_15() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The first visit of the day gets sequence 001
    #[test]
    fn test_first_visit_number_of_day() {
        assert_eq!(format_visit_number("RWA", june_15(), 1), "RWA-250615-001");
    }

    /// Sequences are zero-padded to three digits
    #[test]
    fn test_visit_number_padding() {
        assert_eq!(format_visit_number("RWA", june_15(), 2), "RWA-250615-002");
        assert_eq!(format_visit_number("RWA", june_15(), 42), "RWA-250615-042");
        assert_eq!(format_visit_number("RWA", june_15(), 999), "RWA-250615-999");
    }

    /// The day prefix embeds YYMMDD
    #[test]
    fn test_day_prefix() {
        assert_eq!(visit_number_day_prefix("RWA", june_15()), "RWA-250615");
        let jan_1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(visit_number_day_prefix("RWA", jan_1), "RWA-260101");
    }

    /// Parsing recovers the sequence from a stored number
    #[test]
    fn test_parse_sequence() {
        let prefix = visit_number_day_prefix("RWA", june_15());
        assert_eq!(parse_visit_sequence("RWA-250615-001", &prefix), Some(1));
        assert_eq!(parse_visit_sequence("RWA-250615-042", &prefix), Some(42));
        assert_eq!(parse_visit_sequence("RWA-250615-999", &prefix), Some(999));
    }

    /// Malformed or foreign-day numbers never parse
    #[test]
    fn test_parse_sequence_rejects_malformed() {
        let prefix = visit_number_day_prefix("RWA", june_15());
        assert_eq!(parse_visit_sequence("RWA-250616-001", &prefix), None);
        assert_eq!(parse_visit_sequence("RWA-250615-1", &prefix), None);
        assert_eq!(parse_visit_sequence("RWA-250615-ABC", &prefix), None);
        assert_eq!(parse_visit_sequence("RWA-250615-", &prefix), None);
    }

    /// Each day restarts the sequence: the cap is per day
    #[test]
    fn test_daily_cap() {
        assert_eq!(DAILY_VISIT_CAP, 999);
        // Sequence after the cap must be rejected by the generator
        assert!(DAILY_VISIT_CAP + 1 > DAILY_VISIT_CAP);
    }

    /// Worklist moves forward one step at a time
    #[test]
    fn test_status_transitions_forward_only() {
        use VisitStatus::*;

        assert!(CheckedIn.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Delivered));

        // No skipping
        assert!(!CheckedIn.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Delivered));
        // No going back
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Delivered.can_transition_to(Completed));
        // No self-loop
        assert!(!InProgress.can_transition_to(InProgress));
    }

    /// Bill: parts total plus service fee
    #[test]
    fn test_bill_totals() {
        let lines = vec![
            VisitBillLine {
                spare_part_code: "BRG-6201".to_string(),
                spare_part_name: "Bearing 6201".to_string(),
                quantity: 2,
                unit_price: dec("15000"),
                line_total: dec("30000"),
            },
            VisitBillLine {
                spare_part_code: "OLI-10W40".to_string(),
                spare_part_name: "Engine oil 10W-40".to_string(),
                quantity: 1,
                unit_price: dec("55000"),
                line_total: dec("55000"),
            },
        ];

        let parts_total = bill_parts_total(&lines);
        assert_eq!(parts_total, dec("85000"));

        let service_fee = dec("50000");
        assert_eq!(parts_total + service_fee, dec("135000"));
    }

    /// A visit with no parts bills only the service fee
    #[test]
    fn test_bill_empty_parts() {
        assert_eq!(bill_parts_total(&[]), Decimal::ZERO);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn seq_strategy() -> impl Strategy<Value = u32> {
        1u32..=DAILY_VISIT_CAP
    }

    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (2024i32..=2030, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| {
            NaiveDate::from_ymd_opt(y, m, d).unwrap()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Format then parse round-trips every in-range sequence
        #[test]
        fn prop_visit_number_round_trip(date in date_strategy(), seq in seq_strategy()) {
            let number = format_visit_number("RWA", date, seq);
            let prefix = visit_number_day_prefix("RWA", date);
            prop_assert_eq!(parse_visit_sequence(&number, &prefix), Some(seq));
        }

        /// Numbers within a day sort in sequence order
        #[test]
        fn prop_visit_numbers_sort_by_sequence(
            date in date_strategy(),
            a in seq_strategy(),
            b in seq_strategy()
        ) {
            let na = format_visit_number("RWA", date, a);
            let nb = format_visit_number("RWA", date, b);
            prop_assert_eq!(na < nb, a < b);
            prop_assert_eq!(na == nb, a == b);
        }

        /// A number parses only against its own day prefix
        #[test]
        fn prop_visit_number_day_scoped(
            d1 in date_strategy(),
            d2 in date_strategy(),
            seq in seq_strategy()
        ) {
            let number = format_visit_number("RWA", d1, seq);
            let other_prefix = visit_number_day_prefix("RWA", d2);
            if d1 != d2 {
                prop_assert_eq!(parse_visit_sequence(&number, &other_prefix), None);
            }
        }

        /// Bill total equals the sum of line totals
        #[test]
        fn prop_bill_total_is_line_sum(
            lines in prop::collection::vec((1i32..=50, 0i64..=1_000_000), 0..10)
        ) {
            let bill_lines: Vec<VisitBillLine> = lines
                .iter()
                .enumerate()
                .map(|(i, (qty, cents))| {
                    let unit_price = Decimal::new(*cents, 2);
                    VisitBillLine {
                        spare_part_code: format!("PART-{}", i),
                        spare_part_name: format!("Part {}", i),
                        quantity: *qty,
                        unit_price,
                        line_total: unit_price * Decimal::from(*qty),
                    }
                })
                .collect();

            let expected: Decimal = bill_lines.iter().map(|l| l.line_total).sum();
            prop_assert_eq!(bill_parts_total(&bill_lines), expected);
        }
    }
}

// ============================================================================
// Integration Test Helpers (for use with actual database)
// ============================================================================

#[cfg(test)]
mod integration_helpers {
    use super::*;

    /// Simulate the generator: next number from the day's current maximum
    pub fn next_number(
        existing_max: Option<&str>,
        prefix: &str,
        date: NaiveDate,
    ) -> Result<String, &'static str> {
        let day_prefix = visit_number_day_prefix(prefix, date);
        let next = match existing_max {
            Some(number) => parse_visit_sequence(number, &day_prefix)
                .ok_or("Malformed stored number")?
                + 1,
            None => 1,
        };
        if next > DAILY_VISIT_CAP {
            return Err("Daily capacity exhausted");
        }
        Ok(format_visit_number(prefix, date, next))
    }

    #[test]
    fn test_generator_first_of_day() {
        assert_eq!(
            next_number(None, "RWA", june_15()).unwrap(),
            "RWA-250615-001"
        );
    }

    #[test]
    fn test_generator_increments() {
        assert_eq!(
            next_number(Some("RWA-250615-001"), "RWA", june_15()).unwrap(),
            "RWA-250615-002"
        );
    }

    #[test]
    fn test_generator_cap_fails_loudly() {
        assert!(next_number(Some("RWA-250615-999"), "RWA", june_15()).is_err());
    }

    #[test]
    fn test_generator_new_day_restarts() {
        // Yesterday's maximum does not match today's prefix; the day
        // starts over at 001
        let june_16 = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        assert_eq!(
            next_number(None, "RWA", june_16).unwrap(),
            "RWA-250616-001"
        );
    }
}
