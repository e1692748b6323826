use std::{convert::Infallible, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);
    };
}

id_newtype!(BookingId);
id_newtype!(CustomerId);
id_newtype!(TechnicianId);

/// Lifecycle state of a service booking.
///
/// The natural progression is pending -> confirmed -> in-progress ->
/// completed, with cancellation possible from any non-terminal state. The
/// progression is documentation only; nothing here rejects other
/// transitions, so an operator can correct a booking that was closed too
/// early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    /// A backend value this build does not know. Carried verbatim so the
    /// row still renders, with the raw value as its label.
    Unrecognized(String),
}

impl BookingStatus {
    /// The statuses an operator can pick from.
    pub const KNOWN: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in-progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Unrecognized(raw) => raw,
        }
    }

    /// Human-readable label; unknown values pass through unchanged.
    pub fn label(&self) -> &str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::InProgress => "In progress",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Unrecognized(raw) => raw,
        }
    }

    /// Display style token for the status badge; unknown values get the
    /// neutral token.
    pub fn tone(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "amber",
            BookingStatus::Confirmed => "blue",
            BookingStatus::InProgress => "purple",
            BookingStatus::Completed => "green",
            BookingStatus::Cancelled => "red",
            BookingStatus::Unrecognized(_) => "gray",
        }
    }
}

impl From<String> for BookingStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => BookingStatus::Pending,
            "confirmed" => BookingStatus::Confirmed,
            "in-progress" => BookingStatus::InProgress,
            "completed" => BookingStatus::Completed,
            "cancelled" => BookingStatus::Cancelled,
            _ => BookingStatus::Unrecognized(raw),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(BookingStatus::from(raw.to_string()))
    }
}

impl Serialize for BookingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BookingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(BookingStatus::from(String::deserialize(deserializer)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub brand: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemReport {
    pub category: String,
    pub description: String,
}

/// Agreed service appointment slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceSchedule {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// One step of the customer-facing progress history of a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStep {
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: TechnicianId,
    pub name: String,
}

/// A customer's scheduled printer-repair request and its full lifecycle
/// record, denormalized the way the dashboard consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub customer: Customer,
    pub printer: PrinterInfo,
    pub problem: ProblemReport,
    pub schedule: ServiceSchedule,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_id: Option<TechnicianId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timeline: Vec<TimelineStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_values_round_trip() {
        for status in BookingStatus::KNOWN {
            let encoded = serde_json::to_string(&status).expect("encode");
            let decoded: BookingStatus = serde_json::from_str(&encoded).expect("decode");
            assert_eq!(decoded, status);
        }
        assert_eq!(
            serde_json::to_string(&BookingStatus::InProgress).expect("encode"),
            "\"in-progress\""
        );
    }

    #[test]
    fn unknown_status_survives_decode_and_labels_as_itself() {
        let decoded: BookingStatus = serde_json::from_str("\"awaiting-parts\"").expect("decode");
        assert_eq!(decoded, BookingStatus::Unrecognized("awaiting-parts".into()));
        assert_eq!(decoded.label(), "awaiting-parts");
        assert_eq!(decoded.as_str(), "awaiting-parts");
        assert_eq!(decoded.tone(), "gray");
    }

    #[test]
    fn booking_decodes_without_optional_fields() {
        let raw = r#"{
            "id": "BK-1001",
            "customer": {"id": "C-1", "name": "Rina", "phone": "0812555001"},
            "printer": {"brand": "Epson", "model": "L3110"},
            "problem": {"category": "paper-jam", "description": "jams on every second page"},
            "schedule": {"date": "2026-08-10", "time": "09:30:00"},
            "status": "pending"
        }"#;
        let booking: Booking = serde_json::from_str(raw).expect("decode");
        assert_eq!(booking.id.0, "BK-1001");
        assert_eq!(booking.customer.email, None);
        assert_eq!(booking.technician_id, None);
        assert!(booking.timeline.is_empty());
        assert_eq!(booking.status, BookingStatus::Pending);
    }
}
