//! Master-data deletion tests
//!
//! Categories and suppliers may only be removed once nothing live
//! references them. Soft-deleted spare parts do not block the delete;
//! the schema detaches them (their reference is set to NULL) so the
//! delete can never trip a foreign-key violation.

/// A spare part referencing a master-data row
#[derive(Debug, Clone, Copy)]
struct PartRef {
    deleted: bool,
}

#[derive(Debug, PartialEq)]
enum DeleteOutcome {
    /// Rejected with a referential-integrity conflict
    Blocked,
    /// Removed; soft-deleted referrers were detached
    Deleted { detached: usize },
}

/// Mirror of the supplier delete guard: live parts block first, then
/// any purchase row (purchases keep their audit trail).
fn simulate_supplier_delete(parts: &[PartRef], purchase_rows: usize) -> DeleteOutcome {
    if parts.iter().any(|p| !p.deleted) {
        return DeleteOutcome::Blocked;
    }
    if purchase_rows > 0 {
        return DeleteOutcome::Blocked;
    }
    DeleteOutcome::Deleted {
        detached: parts.len(),
    }
}

/// Mirror of the category delete guard: only live parts block.
fn simulate_category_delete(parts: &[PartRef]) -> DeleteOutcome {
    if parts.iter().any(|p| !p.deleted) {
        return DeleteOutcome::Blocked;
    }
    DeleteOutcome::Deleted {
        detached: parts.len(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    const LIVE: PartRef = PartRef { deleted: false };
    const SOFT_DELETED: PartRef = PartRef { deleted: true };

    /// A supplier referenced by a live part is blocked even with zero
    /// purchase rows; it must never reach the database delete.
    #[test]
    fn test_supplier_blocked_by_live_part_without_purchases() {
        assert_eq!(simulate_supplier_delete(&[LIVE], 0), DeleteOutcome::Blocked);
    }

    #[test]
    fn test_supplier_blocked_by_purchases_alone() {
        assert_eq!(simulate_supplier_delete(&[], 3), DeleteOutcome::Blocked);
    }

    /// Soft-deleted referrers do not block; they are detached instead
    #[test]
    fn test_supplier_delete_detaches_soft_deleted_parts() {
        assert_eq!(
            simulate_supplier_delete(&[SOFT_DELETED, SOFT_DELETED], 0),
            DeleteOutcome::Deleted { detached: 2 }
        );
    }

    #[test]
    fn test_supplier_delete_unreferenced() {
        assert_eq!(
            simulate_supplier_delete(&[], 0),
            DeleteOutcome::Deleted { detached: 0 }
        );
    }

    #[test]
    fn test_category_blocked_by_live_part() {
        assert_eq!(
            simulate_category_delete(&[SOFT_DELETED, LIVE]),
            DeleteOutcome::Blocked
        );
    }

    #[test]
    fn test_category_delete_detaches_soft_deleted_parts() {
        assert_eq!(
            simulate_category_delete(&[SOFT_DELETED]),
            DeleteOutcome::Deleted { detached: 1 }
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn parts_strategy() -> impl Strategy<Value = Vec<PartRef>> {
        prop::collection::vec(any::<bool>().prop_map(|deleted| PartRef { deleted }), 0..20)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any live referrer blocks a supplier delete, whatever the
        /// purchase count
        #[test]
        fn prop_live_referrer_always_blocks(
            parts in parts_strategy(),
            purchases in 0usize..100
        ) {
            if parts.iter().any(|p| !p.deleted) {
                prop_assert_eq!(
                    simulate_supplier_delete(&parts, purchases),
                    DeleteOutcome::Blocked
                );
            }
        }

        /// A successful delete detaches exactly the soft-deleted referrers,
        /// leaving no row behind to violate the foreign key
        #[test]
        fn prop_delete_detaches_all_referrers(parts in parts_strategy()) {
            let soft_deleted: Vec<PartRef> =
                parts.iter().copied().filter(|p| p.deleted).collect();

            prop_assert_eq!(
                simulate_category_delete(&soft_deleted),
                DeleteOutcome::Deleted { detached: soft_deleted.len() }
            );
        }

        /// Category and supplier deletes agree on the live-part rule
        #[test]
        fn prop_guards_agree_on_live_parts(parts in parts_strategy()) {
            let category_blocked =
                simulate_category_delete(&parts) == DeleteOutcome::Blocked;
            let supplier_blocked =
                simulate_supplier_delete(&parts, 0) == DeleteOutcome::Blocked;
            prop_assert_eq!(category_blocked, supplier_blocked);
        }
    }
}
