//! Pure table filtering and stat counting over the in-memory booking list.

use shared::domain::{Booking, BookingStatus};

/// Status gate applied on top of the text search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(BookingStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: &BookingStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

/// A booking matches when the search text appears in the customer name or
/// booking id (case-insensitive) or verbatim in the phone number, and the
/// status gate passes. Recomputed on demand; the whole filtered set is
/// returned, there is no pagination.
pub fn filter_bookings<'a>(
    bookings: &'a [Booking],
    search_term: &str,
    status_filter: &StatusFilter,
) -> Vec<&'a Booking> {
    let needle = search_term.to_lowercase();
    bookings
        .iter()
        .filter(|booking| {
            let matches_search = needle.is_empty()
                || booking.customer.name.to_lowercase().contains(&needle)
                || booking.id.0.to_lowercase().contains(&needle)
                || booking.customer.phone.contains(search_term);
            matches_search && status_filter.matches(&booking.status)
        })
        .collect()
}

/// Counters behind the dashboard stat cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookingStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl BookingStats {
    pub fn collect(bookings: &[Booking]) -> Self {
        let mut stats = BookingStats {
            total: bookings.len(),
            ..BookingStats::default()
        };
        for booking in bookings {
            match booking.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::InProgress => stats.in_progress += 1,
                BookingStatus::Completed => stats.completed += 1,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use shared::domain::{
        BookingId, Customer, CustomerId, PrinterInfo, ProblemReport, ServiceSchedule,
    };

    use super::*;

    fn booking(id: &str, name: &str, phone: &str, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId(id.to_string()),
            customer: Customer {
                id: CustomerId(format!("C-{id}")),
                name: name.to_string(),
                phone: phone.to_string(),
                email: None,
                address: None,
            },
            printer: PrinterInfo {
                brand: "Canon".to_string(),
                model: "G2010".to_string(),
            },
            problem: ProblemReport {
                category: "print-quality".to_string(),
                description: "streaky output".to_string(),
            },
            schedule: ServiceSchedule {
                date: NaiveDate::from_ymd_opt(2026, 8, 12).expect("date"),
                time: NaiveTime::from_hms_opt(10, 0, 0).expect("time"),
            },
            status,
            technician_id: None,
            technician_name: None,
            estimated_cost: None,
            actual_cost: None,
            notes: None,
            timeline: Vec::new(),
        }
    }

    fn sample() -> Vec<Booking> {
        vec![
            booking("BK-100", "Siti Rahma", "0812555001", BookingStatus::Pending),
            booking("BK-200", "Budi Santoso", "0813555002", BookingStatus::Completed),
            booking("BK-300", "Dewi Lestari", "0815555003", BookingStatus::InProgress),
        ]
    }

    #[test]
    fn empty_search_matches_everything() {
        let bookings = sample();
        let matched = filter_bookings(&bookings, "", &StatusFilter::All);
        assert_eq!(matched.len(), 3);
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let bookings = sample();
        let matched = filter_bookings(&bookings, "siti", &StatusFilter::All);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.0, "BK-100");

        let matched = filter_bookings(&bookings, "SANTOSO", &StatusFilter::All);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.0, "BK-200");
    }

    #[test]
    fn id_match_is_case_insensitive() {
        let bookings = sample();
        let matched = filter_bookings(&bookings, "bk-300", &StatusFilter::All);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].customer.name, "Dewi Lestari");
    }

    #[test]
    fn phone_matches_verbatim_substring() {
        let bookings = sample();
        let matched = filter_bookings(&bookings, "0813555", &StatusFilter::All);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.0, "BK-200");
    }

    #[test]
    fn status_gate_combines_with_search() {
        let bookings = sample();
        let matched = filter_bookings(
            &bookings,
            "",
            &StatusFilter::Only(BookingStatus::Completed),
        );
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.0, "BK-200");

        // Search hit but wrong status: excluded.
        let matched = filter_bookings(
            &bookings,
            "siti",
            &StatusFilter::Only(BookingStatus::Completed),
        );
        assert!(matched.is_empty());
    }

    #[test]
    fn unrecognized_status_can_be_filtered_on() {
        let mut bookings = sample();
        bookings.push(booking(
            "BK-400",
            "Agus",
            "0816555004",
            BookingStatus::Unrecognized("awaiting-parts".into()),
        ));
        let matched = filter_bookings(
            &bookings,
            "",
            &StatusFilter::Only(BookingStatus::Unrecognized("awaiting-parts".into())),
        );
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.0, "BK-400");
    }

    #[test]
    fn stats_count_per_status() {
        let stats = BookingStats::collect(&sample());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 1);
    }
}
