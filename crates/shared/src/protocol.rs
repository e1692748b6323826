use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::{BookingStatus, TechnicianId};

/// Tables the dashboard watches for change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedTable {
    ServiceBookings,
    Customers,
}

impl WatchedTable {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchedTable::ServiceBookings => "service_bookings",
            WatchedTable::Customers => "customers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Which row events a subscription wants; `All` is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFilter {
    All,
    Only(ChangeKind),
}

impl ChangeFilter {
    pub fn matches(self, kind: ChangeKind) -> bool {
        match self {
            ChangeFilter::All => true,
            ChangeFilter::Only(wanted) => wanted == kind,
        }
    }
}

/// One change notification from the hosted backend: a row in `table` was
/// inserted, updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableChange {
    pub table: WatchedTable,
    pub kind: ChangeKind,
    /// Row identifier when the backend includes one. Consumers currently
    /// refetch the whole table rather than patch, so this is informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
}

/// Full rewrite of a customer's editable fields. `None` clears the stored
/// value rather than leaving it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Full rewrite of a booking's editable fields, addressed by booking id.
/// `None` clears the stored value rather than leaving it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetailsUpdate {
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    #[serde(default)]
    pub problem_description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub estimated_cost: Option<String>,
    #[serde(default)]
    pub actual_cost: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
}

/// Assignment payload; `technician_id: None` clears the assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicianAssignmentRequest {
    #[serde(default)]
    pub technician_id: Option<TechnicianId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_filter_matches_every_kind() {
        for kind in [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete] {
            assert!(ChangeFilter::All.matches(kind));
        }
        assert!(ChangeFilter::Only(ChangeKind::Delete).matches(ChangeKind::Delete));
        assert!(!ChangeFilter::Only(ChangeKind::Delete).matches(ChangeKind::Update));
    }

    #[test]
    fn table_change_round_trips_without_row_id() {
        let change = TableChange {
            table: WatchedTable::ServiceBookings,
            kind: ChangeKind::Update,
            row_id: None,
        };
        let encoded = serde_json::to_string(&change).expect("encode");
        assert!(!encoded.contains("row_id"));
        let decoded: TableChange = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded.table, WatchedTable::ServiceBookings);
        assert_eq!(decoded.kind, ChangeKind::Update);
        assert_eq!(decoded.row_id, None);
    }
}
