//! Visit (work order) model and the visit-number scheme
//!
//! A visit is created when a vehicle is checked in and carries a
//! human-readable number like `RWA-250615-003`: workshop prefix, check-in
//! date as YYMMDD, and a three-digit counter that restarts every day.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The daily counter is bounded by the three-digit suffix. Creation past
/// this cap must fail loudly; the printed paperwork format never widens.
pub const DAILY_VISIT_CAP: u32 = 999;

/// A workshop visit (one vehicle check-in)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub visit_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub plate_number: String,
    pub vehicle_brand: Option<String>,
    pub vehicle_model: Option<String>,
    pub complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub mechanic_name: Option<String>,
    pub status: VisitStatus,
    pub service_fee: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Worklist status of a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    CheckedIn,
    InProgress,
    Completed,
    Delivered,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::CheckedIn => "checked_in",
            VisitStatus::InProgress => "in_progress",
            VisitStatus::Completed => "completed",
            VisitStatus::Delivered => "delivered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "checked_in" => Some(VisitStatus::CheckedIn),
            "in_progress" => Some(VisitStatus::InProgress),
            "completed" => Some(VisitStatus::Completed),
            "delivered" => Some(VisitStatus::Delivered),
            _ => None,
        }
    }

    /// Visits move forward only; a delivered visit is terminal.
    pub fn can_transition_to(&self, next: VisitStatus) -> bool {
        let order = |s: VisitStatus| match s {
            VisitStatus::CheckedIn => 0,
            VisitStatus::InProgress => 1,
            VisitStatus::Completed => 2,
            VisitStatus::Delivered => 3,
        };
        order(next) == order(*self) + 1
    }
}

/// Day prefix of a visit number, e.g. `RWA-250615`
pub fn visit_number_day_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}", prefix, date.format("%y%m%d"))
}

/// Full visit number, e.g. `RWA-250615-001`
pub fn format_visit_number(prefix: &str, date: NaiveDate, sequence: u32) -> String {
    format!("{}-{:03}", visit_number_day_prefix(prefix, date), sequence)
}

/// Parse the numeric suffix out of a visit number belonging to the given
/// day prefix. Returns `None` for numbers from other days or malformed
/// input.
pub fn parse_visit_sequence(visit_number: &str, day_prefix: &str) -> Option<u32> {
    let suffix = visit_number
        .strip_prefix(day_prefix)
        .and_then(|rest| rest.strip_prefix('-'))?;
    if suffix.len() != 3 || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// One spare-part line on a visit bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitBillLine {
    pub spare_part_code: String,
    pub spare_part_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Billing summary for a visit: parts used plus the service fee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitBill {
    pub visit_id: Uuid,
    pub visit_number: String,
    pub lines: Vec<VisitBillLine>,
    pub parts_total: Decimal,
    pub service_fee: Decimal,
    pub grand_total: Decimal,
}

/// Sum of part line totals; the grand total adds the service fee.
pub fn bill_parts_total(lines: &[VisitBillLine]) -> Decimal {
    lines.iter().map(|l| l.line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn june_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_visit_number_format() {
        assert_eq!(format_visit_number("RWA", june_15(), 1), "RWA-250615-001");
        assert_eq!(format_visit_number("RWA", june_15(), 42), "RWA-250615-042");
        assert_eq!(format_visit_number("RWA", june_15(), 999), "RWA-250615-999");
    }

    #[test]
    fn test_parse_sequence() {
        let day = visit_number_day_prefix("RWA", june_15());
        assert_eq!(parse_visit_sequence("RWA-250615-003", &day), Some(3));
        assert_eq!(parse_visit_sequence("RWA-250615-999", &day), Some(999));
        // Different day, wrong width, garbage
        assert_eq!(parse_visit_sequence("RWA-250616-001", &day), None);
        assert_eq!(parse_visit_sequence("RWA-250615-1", &day), None);
        assert_eq!(parse_visit_sequence("RWA-250615-abc", &day), None);
    }

    #[test]
    fn test_status_transitions() {
        use VisitStatus::*;
        assert!(CheckedIn.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Delivered));
        assert!(!CheckedIn.can_transition_to(Completed));
        assert!(!Delivered.can_transition_to(CheckedIn));
        assert!(!InProgress.can_transition_to(InProgress));
    }

    #[test]
    fn test_bill_parts_total() {
        let lines = vec![
            VisitBillLine {
                spare_part_code: "BRG-1".into(),
                spare_part_name: "Front bearing".into(),
                quantity: 2,
                unit_price: Decimal::from(1500),
                line_total: Decimal::from(3000),
            },
            VisitBillLine {
                spare_part_code: "OLI-10W40".into(),
                spare_part_name: "Engine oil".into(),
                quantity: 1,
                unit_price: Decimal::from(90000),
                line_total: Decimal::from(90000),
            },
        ];
        assert_eq!(bill_parts_total(&lines), Decimal::from(93000));
        assert_eq!(bill_parts_total(&[]), Decimal::ZERO);
    }
}
