//! Data access seam towards the hosted booking backend.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

use shared::{
    domain::{Booking, BookingId, BookingStatus, CustomerId, Technician, TechnicianId},
    protocol::{BookingDetailsUpdate, ChangeFilter, CustomerUpdate, TableChange, WatchedTable},
};

/// Opaque identity of one live change-feed registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A live change-feed registration: the handle used to release it and the
/// receiver its notifications arrive on.
pub struct ChangeSubscription {
    pub id: SubscriptionId,
    pub changes: broadcast::Receiver<TableChange>,
}

/// Everything the dashboard needs from the data service. Implementations
/// own connectivity; the dashboard owns orchestration.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn fetch_all_bookings(&self) -> Result<Vec<Booking>>;

    async fn fetch_all_technicians(&self) -> Result<Vec<Technician>>;

    async fn update_booking_status(
        &self,
        booking_id: &BookingId,
        status: BookingStatus,
    ) -> Result<()>;

    /// `None` clears the assignment.
    async fn assign_technician(
        &self,
        booking_id: &BookingId,
        technician_id: Option<TechnicianId>,
    ) -> Result<()>;

    /// Permanently removes the booking; there is no undo.
    async fn delete_booking(&self, booking_id: &BookingId) -> Result<()>;

    /// Fresh fully-denormalized copy for editing. Never served from an
    /// already-fetched list row, which may be stale.
    async fn fetch_booking_for_edit(&self, booking_id: &BookingId) -> Result<Booking>;

    async fn update_customer(&self, customer_id: &CustomerId, update: CustomerUpdate)
        -> Result<()>;

    async fn update_booking_details(
        &self,
        booking_id: &BookingId,
        update: BookingDetailsUpdate,
    ) -> Result<()>;

    async fn subscribe_changes(
        &self,
        table: WatchedTable,
        filter: ChangeFilter,
    ) -> Result<ChangeSubscription>;

    /// Releasing an unknown or already-released id is a no-op.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;
}
