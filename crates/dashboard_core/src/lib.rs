use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::{
    sync::{broadcast, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{error, info, warn};

use shared::{
    domain::{Booking, BookingId, BookingStatus, CustomerId, Technician, TechnicianId},
    protocol::{BookingDetailsUpdate, ChangeFilter, CustomerUpdate, WatchedTable},
};

pub mod backend;
pub mod filter;
pub mod rest;

pub use backend::{BookingBackend, ChangeSubscription, SubscriptionId};
pub use filter::{filter_bookings, BookingStats, StatusFilter};
pub use rest::RestBackend;

/// How long a success notice stays visible before auto-dismissing.
pub const SUCCESS_NOTICE_TTL: Duration = Duration::from_secs(2);

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Confirmation dialog content; destructive prompts render with a warning
/// affordance and distinct affirm/cancel actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub body: String,
    pub confirm_label: String,
    pub cancel_label: String,
    pub destructive: bool,
}

/// User-facing dialog surface. The dashboard never renders anything itself;
/// it hands notices and confirmations to whatever frontend is attached.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Blocking acknowledgment of a failure.
    async fn error(&self, message: &str);

    /// Transient notice; implementations dismiss it after
    /// [`SUCCESS_NOTICE_TTL`].
    async fn success(&self, message: &str);

    /// Returns true when the user confirms the action.
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

/// Stand-in when no frontend is attached: notices go to the log and every
/// confirmation is declined, so destructive actions never run unattended.
pub struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn error(&self, message: &str) {
        warn!("unattended error notice: {message}");
    }

    async fn success(&self, message: &str) {
        info!("unattended success notice: {message}");
    }

    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        warn!("unattended confirmation declined: {}", prompt.title);
        false
    }
}

/// Notifications pushed to the presentation layer so it can re-render
/// without polling.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    BookingsRefreshed { count: usize },
    TechniciansRefreshed { count: usize },
    Error(String),
}

/// Working copy of one booking and its customer while an edit is open.
/// Discarded on save or cancel; on save it decomposes into the customer
/// write and the booking write.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingEditForm {
    pub booking_id: BookingId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub customer_address: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub problem_description: String,
    pub notes: String,
    pub estimated_cost: String,
    pub actual_cost: String,
}

impl BookingEditForm {
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id.clone(),
            customer_id: booking.customer.id.clone(),
            customer_name: booking.customer.name.clone(),
            customer_phone: booking.customer.phone.clone(),
            customer_email: booking.customer.email.clone().unwrap_or_default(),
            customer_address: booking.customer.address.clone().unwrap_or_default(),
            appointment_date: booking.schedule.date,
            appointment_time: booking.schedule.time,
            problem_description: booking.problem.description.clone(),
            notes: booking.notes.clone().unwrap_or_default(),
            estimated_cost: booking.estimated_cost.clone().unwrap_or_default(),
            actual_cost: booking.actual_cost.clone().unwrap_or_default(),
        }
    }

    pub fn customer_update(&self) -> CustomerUpdate {
        CustomerUpdate {
            name: self.customer_name.clone(),
            phone: self.customer_phone.clone(),
            email: none_if_empty(&self.customer_email),
            address: none_if_empty(&self.customer_address),
        }
    }

    pub fn booking_update(&self) -> BookingDetailsUpdate {
        BookingDetailsUpdate {
            appointment_date: self.appointment_date,
            appointment_time: self.appointment_time,
            problem_description: none_if_empty(&self.problem_description),
            notes: none_if_empty(&self.notes),
            estimated_cost: none_if_empty(&self.estimated_cost),
            actual_cost: none_if_empty(&self.actual_cost),
        }
    }
}

fn none_if_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Everything the presentation layer reads, snapshotted as one value.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub bookings: Vec<Booking>,
    pub technicians: Vec<Technician>,
    pub loading: bool,
    pub search_term: String,
    pub status_filter: StatusFilter,
    pub selected: Option<Booking>,
    pub edit_form: Option<BookingEditForm>,
}

struct TableWatcher {
    subscription_id: SubscriptionId,
    task: JoinHandle<()>,
}

/// The dashboard core: keeps the in-memory view state synchronized with the
/// hosted backend and orchestrates every staff-triggered mutation.
///
/// Synchronization model: one full bookings fetch at activation plus one per
/// change notification on either watched table. Mutations never patch local
/// state; the notification-triggered refetch is the single source of truth
/// for what the table shows.
pub struct DashboardController {
    backend: Arc<dyn BookingBackend>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<DashboardState>,
    watchers: Mutex<Option<Vec<TableWatcher>>>,
    events: broadcast::Sender<DashboardEvent>,
    active: AtomicBool,
}

impl DashboardController {
    pub fn new(backend: Arc<dyn BookingBackend>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            backend,
            notifier,
            state: RwLock::new(DashboardState {
                loading: true,
                ..DashboardState::default()
            }),
            watchers: Mutex::new(None),
            events,
            active: AtomicBool::new(false),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    /// Runs the initial fetches and opens the two table subscriptions.
    /// Bookings and customers both feed the same reaction: re-run the full
    /// bookings fetch. A second call without an intervening `shutdown` is
    /// ignored.
    pub async fn start(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            warn!("dashboard controller already started");
            return;
        }

        self.refresh_bookings().await;
        self.refresh_technicians().await;

        let mut watchers = Vec::new();
        for table in [WatchedTable::ServiceBookings, WatchedTable::Customers] {
            match self.backend.subscribe_changes(table, ChangeFilter::All).await {
                Ok(subscription) => watchers.push(self.spawn_watcher(table, subscription)),
                Err(err) => {
                    error!(
                        table = table.as_str(),
                        "failed to open change subscription: {err:#}"
                    );
                    let _ = self.events.send(DashboardEvent::Error(format!(
                        "live updates unavailable for {}",
                        table.as_str()
                    )));
                }
            }
        }
        *self.watchers.lock().await = Some(watchers);
    }

    /// Releases whatever subscriptions activation managed to open, exactly
    /// once; later calls find nothing to release. A fetch still in flight
    /// resolves into the void: the active flag keeps it from touching state.
    pub async fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
        let watchers = { self.watchers.lock().await.take() };
        let Some(watchers) = watchers else {
            return;
        };
        for watcher in watchers {
            watcher.task.abort();
            if let Err(err) = self.backend.unsubscribe(watcher.subscription_id).await {
                warn!(
                    subscription = watcher.subscription_id.0,
                    "failed to release change subscription: {err:#}"
                );
            }
        }
    }

    fn spawn_watcher(
        self: &Arc<Self>,
        table: WatchedTable,
        subscription: ChangeSubscription,
    ) -> TableWatcher {
        let ChangeSubscription { id, mut changes } = subscription;
        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        info!(
                            table = table.as_str(),
                            kind = ?change.kind,
                            "change notification; refetching bookings"
                        );
                        controller.refresh_bookings().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Missed events are covered by the next full refetch.
                        warn!(table = table.as_str(), missed, "change feed lagged");
                        controller.refresh_bookings().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        TableWatcher {
            subscription_id: id,
            task,
        }
    }

    /// Full bookings fetch; the only way the list state ever changes. On
    /// failure the previous list stays and the user gets one error notice.
    pub async fn refresh_bookings(&self) {
        let fetched = self.backend.fetch_all_bookings().await;
        if !self.active.load(Ordering::SeqCst) {
            // Resolved after shutdown; the result must not touch state.
            return;
        }
        match fetched {
            Ok(bookings) => {
                let count = bookings.len();
                {
                    let mut state = self.state.write().await;
                    state.bookings = bookings;
                    state.loading = false;
                }
                let _ = self.events.send(DashboardEvent::BookingsRefreshed { count });
            }
            Err(err) => {
                error!("failed to load bookings: {err:#}");
                self.state.write().await.loading = false;
                let _ = self
                    .events
                    .send(DashboardEvent::Error("failed to load bookings".into()));
                self.notifier.error("Failed to load booking data").await;
            }
        }
    }

    pub async fn refresh_technicians(&self) {
        let fetched = self.backend.fetch_all_technicians().await;
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        match fetched {
            Ok(technicians) => {
                let count = technicians.len();
                self.state.write().await.technicians = technicians;
                let _ = self
                    .events
                    .send(DashboardEvent::TechniciansRefreshed { count });
            }
            Err(err) => {
                error!("failed to load technicians: {err:#}");
                let _ = self
                    .events
                    .send(DashboardEvent::Error("failed to load technicians".into()));
                self.notifier.error("Failed to load technician list").await;
            }
        }
    }

    /// Immediate remote update, no confirmation. Concurrent writes to the
    /// same booking resolve last-write-wins at the backend; the next change
    /// notification decides what the table shows.
    pub async fn change_status(&self, booking_id: &BookingId, new_status: BookingStatus) {
        match self
            .backend
            .update_booking_status(booking_id, new_status.clone())
            .await
        {
            Ok(()) => {
                info!(
                    booking_id = %booking_id.0,
                    status = new_status.as_str(),
                    "booking status updated"
                );
                self.notifier.success("Booking status updated").await;
            }
            Err(err) => {
                error!(booking_id = %booking_id.0, "failed to update booking status: {err:#}");
                self.notifier.error("Failed to update booking status").await;
            }
        }
    }

    /// `None` clears the assignment.
    pub async fn assign_technician(
        &self,
        booking_id: &BookingId,
        technician_id: Option<TechnicianId>,
    ) {
        let clearing = technician_id.is_none();
        match self
            .backend
            .assign_technician(booking_id, technician_id)
            .await
        {
            Ok(()) => {
                info!(booking_id = %booking_id.0, cleared = clearing, "technician assignment updated");
                let message = if clearing {
                    "Technician assignment cleared"
                } else {
                    "Technician assigned"
                };
                self.notifier.success(message).await;
            }
            Err(err) => {
                error!(booking_id = %booking_id.0, "failed to assign technician: {err:#}");
                self.notifier.error("Failed to assign technician").await;
            }
        }
    }

    /// Asks for explicit confirmation before the remote delete; a declined
    /// prompt issues no backend call at all.
    pub async fn delete_booking(&self, booking_id: &BookingId) {
        let prompt = ConfirmPrompt {
            title: "Delete booking?".into(),
            body: "The booking record will be permanently removed.".into(),
            confirm_label: "Yes, delete it".into(),
            cancel_label: "Keep booking".into(),
            destructive: true,
        };
        if !self.notifier.confirm(&prompt).await {
            info!(booking_id = %booking_id.0, "booking deletion declined");
            return;
        }

        match self.backend.delete_booking(booking_id).await {
            Ok(()) => {
                info!(booking_id = %booking_id.0, "booking deleted");
                self.notifier.success("Booking deleted").await;
            }
            Err(err) => {
                error!(booking_id = %booking_id.0, "failed to delete booking: {err:#}");
                self.notifier.error("Failed to delete booking").await;
            }
        }
    }

    /// Pure local state transition; no remote call.
    pub async fn view_detail(&self, booking: Booking) {
        self.state.write().await.selected = Some(booking);
    }

    pub async fn close_detail(&self) {
        self.state.write().await.selected = None;
    }

    /// Loads a fresh copy of the booking before the edit form opens; the
    /// list row may be stale. Returns whether the form is now open.
    pub async fn open_edit(&self, booking_id: &BookingId) -> bool {
        match self.backend.fetch_booking_for_edit(booking_id).await {
            Ok(booking) => {
                let form = BookingEditForm::from_booking(&booking);
                self.state.write().await.edit_form = Some(form);
                true
            }
            Err(err) => {
                error!(booking_id = %booking_id.0, "failed to load booking for edit: {err:#}");
                self.notifier
                    .error("Failed to load booking for editing")
                    .await;
                false
            }
        }
    }

    /// Replaces the open form with the presentation layer's edited copy.
    pub async fn set_edit_form(&self, form: BookingEditForm) {
        self.state.write().await.edit_form = Some(form);
    }

    pub async fn cancel_edit(&self) {
        self.state.write().await.edit_form = None;
    }

    /// Two sequential writes: customer fields by customer id, then booking
    /// fields by booking id. The pair is not atomic: a booking-write failure
    /// leaves the customer row already updated. The form stays open on any
    /// failure so the operator can retry the whole save.
    pub async fn save_edit(&self) {
        let form = { self.state.read().await.edit_form.clone() };
        let Some(form) = form else {
            warn!("save requested with no edit form open");
            return;
        };

        if let Err(err) = self
            .backend
            .update_customer(&form.customer_id, form.customer_update())
            .await
        {
            error!(customer_id = %form.customer_id.0, "failed to update customer: {err:#}");
            self.notifier.error("Failed to save booking changes").await;
            return;
        }

        if let Err(err) = self
            .backend
            .update_booking_details(&form.booking_id, form.booking_update())
            .await
        {
            error!(
                booking_id = %form.booking_id.0,
                "failed to update booking details; customer changes already saved: {err:#}"
            );
            self.notifier.error("Failed to save booking changes").await;
            return;
        }

        self.state.write().await.edit_form = None;
        info!(booking_id = %form.booking_id.0, "booking edit saved");
        self.notifier.success("Booking updated").await;
    }

    pub async fn set_search_term(&self, term: impl Into<String>) {
        self.state.write().await.search_term = term.into();
    }

    pub async fn set_status_filter(&self, status_filter: StatusFilter) {
        self.state.write().await.status_filter = status_filter;
    }

    /// The list the table renders, recomputed from the current state.
    pub async fn filtered_bookings(&self) -> Vec<Booking> {
        let state = self.state.read().await;
        filter::filter_bookings(&state.bookings, &state.search_term, &state.status_filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> BookingStats {
        BookingStats::collect(&self.state.read().await.bookings)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
