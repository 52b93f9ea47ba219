//! Spare-part inventory tests
//!
//! Tests for the stock ledger including:
//! - Audit chain consistency (before + delta = after, chained entries)
//! - Low-stock classification
//! - Inventory valuation

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Audit reasons used by the stock ledger
    #[test]
    fn test_audit_reasons() {
        let reasons = [
            "initial-stock",
            "purchase",
            "purchase-edit",
            "purchase-edit-reversal",
            "purchase-delete-reversal",
            "usage",
            "usage-reversal",
            "manual-adjustment",
        ];

        assert_eq!(reasons.len(), 8);

        // All reasons are lowercase kebab-case
        for r in reasons {
            assert!(r.chars().all(|c| c.is_ascii_lowercase() || c == '-'));
        }
    }

    /// An audit entry records before, delta and after consistently
    #[test]
    fn test_audit_entry_consistency() {
        let before = 5;
        let delta = 3;
        let after = before + delta;

        assert_eq!(after, 8);
    }

    /// A purchase of 3 onto stock 5 lands at 8 with the new cost price
    #[test]
    fn test_purchase_stock_effect() {
        let stock_before = 5;
        let quantity = 3;
        let unit_price = dec("1500");
        let discount = dec("300");

        let net_cost = unit_price - discount;
        let stock_after = stock_before + quantity;

        assert_eq!(stock_after, 8);
        assert_eq!(net_cost, dec("1200"));
    }

    /// Low-stock classification uses stock <= min_stock
    #[test]
    fn test_low_stock_classification() {
        let min_stock = 10;

        assert!(8 <= min_stock);
        assert!(10 <= min_stock);
        assert!(!(11 <= min_stock));
    }

    /// Inventory value is stock * cost_price summed over live parts
    #[test]
    fn test_inventory_valuation() {
        let parts = [(8, dec("1200")), (2, dec("50000")), (0, dec("750"))];

        let total: Decimal = parts
            .iter()
            .map(|(stock, cost)| Decimal::from(*stock) * cost)
            .sum();

        // 9600 + 100000 + 0
        assert_eq!(total, dec("109600"));
    }

    /// A stock-out larger than the balance must be rejected
    #[test]
    fn test_insufficient_stock_detection() {
        let stock = 5;
        let requested = 6;

        assert!(stock - requested < 0);
    }

    /// Version-guarded update semantics: a stale version matches no row
    #[test]
    fn test_version_guard() {
        let stored_version = 4;
        let read_version = 3;

        let rows_affected = if stored_version == read_version { 1 } else { 0 };
        assert_eq!(rows_affected, 0);
    }

    /// Soft delete frees the code for a new part
    #[test]
    fn test_code_reuse_after_soft_delete() {
        // Uniqueness is only enforced among non-deleted rows
        let live = [("BRG-6201", false), ("BRG-6201", true)];
        let live_count = live.iter().filter(|(_, deleted)| !deleted).count();
        assert_eq!(live_count, 1);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn stock_strategy() -> impl Strategy<Value = i32> {
        0i32..=100_000
    }

    fn delta_strategy() -> impl Strategy<Value = i32> {
        -1000i32..=1000
    }

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10_000_000).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every applied mutation satisfies before + delta = after
        #[test]
        fn prop_audit_arithmetic(before in stock_strategy(), delta in delta_strategy()) {
            let after = before + delta;
            prop_assert_eq!(after - delta, before);
        }

        /// A chain of audit entries replays to the final stock level
        #[test]
        fn prop_audit_chain_replays(
            initial in stock_strategy(),
            deltas in prop::collection::vec(delta_strategy(), 0..20)
        ) {
            let mut stock = initial;
            let mut entries = Vec::new();

            for delta in &deltas {
                let before = stock;
                let after = before + delta;
                if after < 0 {
                    // Rejected mutations leave no audit entry
                    continue;
                }
                entries.push((before, *delta, after));
                stock = after;
            }

            // Each entry chains onto the previous one
            let mut replayed = initial;
            for (before, delta, after) in &entries {
                prop_assert_eq!(*before, replayed);
                replayed = before + delta;
                prop_assert_eq!(replayed, *after);
            }

            prop_assert_eq!(replayed, stock);
            prop_assert!(stock >= 0);
        }

        /// Valuation is non-negative and scales linearly with stock
        #[test]
        fn prop_valuation_non_negative(
            stock in stock_strategy(),
            cost in price_strategy()
        ) {
            let value = Decimal::from(stock) * cost;
            prop_assert!(value >= Decimal::ZERO);
            prop_assert_eq!(Decimal::from(stock * 2) * cost, value * Decimal::from(2));
        }

        /// Net cost never exceeds the unit price when discount is valid
        #[test]
        fn prop_net_cost_bounded(
            unit_price in price_strategy(),
            discount_pct in 0u32..=100
        ) {
            let discount = unit_price * Decimal::from(discount_pct) / Decimal::from(100);
            let net = unit_price - discount;
            prop_assert!(net >= Decimal::ZERO);
            prop_assert!(net <= unit_price);
        }

        /// Low-stock classification is monotone in stock level
        #[test]
        fn prop_low_stock_monotone(
            min_stock in 0i32..=1000,
            stock in 0i32..=1000
        ) {
            let low = stock <= min_stock;
            if low && stock > 0 {
                prop_assert!(stock - 1 <= min_stock);
            }
            if !low {
                prop_assert!(stock + 1 > min_stock);
            }
        }
    }
}

// ============================================================================
// Integration Test Helpers (for use with actual database)
// ============================================================================

#[cfg(test)]
mod integration_helpers {
    use super::*;

    /// Simulate one version-guarded stock mutation
    pub fn simulate_mutation(
        stock: i32,
        delta: i32,
        allow_negative: bool,
    ) -> Result<(i32, i32), &'static str> {
        let after = stock.checked_add(delta).ok_or("Stock arithmetic overflow")?;
        if after < 0 && !allow_negative {
            return Err("Insufficient stock");
        }
        Ok((stock, after))
    }

    #[test]
    fn test_simulate_stock_in() {
        let (before, after) = simulate_mutation(5, 3, false).unwrap();
        assert_eq!((before, after), (5, 8));
    }

    #[test]
    fn test_simulate_stock_out() {
        let (before, after) = simulate_mutation(8, -3, false).unwrap();
        assert_eq!((before, after), (8, 5));
    }

    #[test]
    fn test_simulate_insufficient() {
        assert!(simulate_mutation(5, -6, false).is_err());
    }

    #[test]
    fn test_simulate_exact_drain() {
        let (_, after) = simulate_mutation(5, -5, false).unwrap();
        assert_eq!(after, 0);
    }

    /// An extreme delta must fail instead of wrapping the balance
    #[test]
    fn test_simulate_overflow_rejected() {
        assert_eq!(
            simulate_mutation(i32::MAX, 1, false),
            Err("Stock arithmetic overflow")
        );
        assert_eq!(
            simulate_mutation(i32::MIN + 1, -2, true),
            Err("Stock arithmetic overflow")
        );
    }

    /// End-to-end purchase scenario: stock 5, min 10, cost 1000;
    /// buy 3 at 1500 with 300 discount.
    #[test]
    fn test_purchase_scenario() {
        let mut stock = 5;
        let min_stock = 10;
        let mut cost_price = dec("1000");

        let quantity = 3;
        let net_cost = dec("1500") - dec("300");

        let (before, after) = simulate_mutation(stock, quantity, false).unwrap();
        stock = after;
        cost_price = net_cost;

        assert_eq!((before, after), (5, 8));
        assert_eq!(cost_price, dec("1200"));
        // Still low on stock after the purchase
        assert!(stock <= min_stock);
        // Valuation reflects the latest net cost
        assert_eq!(Decimal::from(stock) * cost_price, dec("9600"));
    }
}
