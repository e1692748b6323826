//! Plain-text rendering of the dashboard state.

use dashboard_core::DashboardController;

pub async fn draw(controller: &DashboardController) {
    let stats = controller.stats().await;
    let state = controller.snapshot().await;

    println!();
    println!(
        "bookings: {} total | {} pending | {} in progress | {} completed",
        stats.total, stats.pending, stats.in_progress, stats.completed
    );
    if state.loading {
        println!("(loading)");
        return;
    }

    let rows = controller.filtered_bookings().await;
    println!(
        "{:<10} {:<22} {:<14} {:<24} {:<17} {:<14} {}",
        "ID", "CUSTOMER", "PHONE", "PRINTER", "SCHEDULE", "STATUS", "TECHNICIAN"
    );
    for booking in &rows {
        let technician = state
            .technicians
            .iter()
            .find(|tech| Some(&tech.id) == booking.technician_id.as_ref())
            .map(|tech| tech.name.clone())
            .or_else(|| booking.technician_name.clone())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<22} {:<14} {:<24} {:<17} {:<14} {}",
            booking.id.0,
            booking.customer.name,
            booking.customer.phone,
            format!("{} {}", booking.printer.brand, booking.printer.model),
            format!(
                "{} {}",
                booking.schedule.date,
                booking.schedule.time.format("%H:%M")
            ),
            booking.status.label(),
            technician,
        );
    }
    if rows.len() < state.bookings.len() {
        println!("({} of {} bookings shown)", rows.len(), state.bookings.len());
    }
}
