//! Client for the hosted booking service: CRUD over HTTP, change
//! notifications over a single WebSocket fanned out to per-subscription
//! channels.

use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info, warn};
use url::Url;

use shared::{
    domain::{Booking, BookingId, BookingStatus, CustomerId, Technician, TechnicianId},
    error::{ApiError, ApiException},
    protocol::{
        BookingDetailsUpdate, ChangeFilter, CustomerUpdate, StatusUpdateRequest, TableChange,
        TechnicianAssignmentRequest, WatchedTable,
    },
};

use crate::backend::{BookingBackend, ChangeSubscription, SubscriptionId};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

struct Subscriber {
    table: WatchedTable,
    filter: ChangeFilter,
    sender: broadcast::Sender<TableChange>,
}

#[derive(Default)]
struct FeedState {
    reader_started: bool,
    next_subscription: u64,
    subscribers: HashMap<SubscriptionId, Subscriber>,
}

impl FeedState {
    fn dispatch(&self, change: &TableChange) {
        for subscriber in self.subscribers.values() {
            if subscriber.table == change.table && subscriber.filter.matches(change.kind) {
                let _ = subscriber.sender.send(change.clone());
            }
        }
    }
}

/// [`BookingBackend`] over the service's REST + WebSocket API.
pub struct RestBackend {
    http: Client,
    base_url: String,
    feed: Arc<Mutex<FeedState>>,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let parsed =
            Url::parse(&base_url).with_context(|| format!("invalid backend url '{base_url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("backend url must start with http:// or https://"));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            feed: Arc::new(Mutex::new(FeedState::default())),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn changes_ws_url(&self) -> Result<String> {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(anyhow!("backend url must start with http:// or https://"));
        };
        Ok(format!("{ws_base}/changes"))
    }

    /// One WebSocket serves every subscription; started on first use. If the
    /// connection drops, the next subscribe reconnects.
    async fn ensure_feed_reader(&self) -> Result<()> {
        let mut feed = self.feed.lock().await;
        if feed.reader_started {
            return Ok(());
        }

        let ws_url = self.changes_ws_url()?;
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect change feed: {ws_url}"))?;
        let (_, mut ws_reader) = ws_stream.split();

        let feed_handle = Arc::clone(&self.feed);
        tokio::spawn(async move {
            while let Some(message) = ws_reader.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<TableChange>(&text) {
                            Ok(change) => feed_handle.lock().await.dispatch(&change),
                            Err(err) => warn!("ignoring malformed change notification: {err}"),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        error!("change feed receive failed: {err}");
                        break;
                    }
                }
            }
            feed_handle.lock().await.reader_started = false;
            info!("change feed reader stopped");
        });

        feed.reader_started = true;
        Ok(())
    }

    /// Maps non-2xx responses to errors, preferring the backend's own error
    /// body over the bare status code.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match response.json::<ApiError>().await {
            Ok(api_error) => Err(ApiException::new(api_error.code, api_error.message).into()),
            Err(_) => Err(anyhow!("backend request failed with status {status}")),
        }
    }
}

#[async_trait]
impl BookingBackend for RestBackend {
    async fn fetch_all_bookings(&self) -> Result<Vec<Booking>> {
        let response = self
            .http
            .get(self.endpoint("/bookings"))
            .send()
            .await
            .context("bookings request failed")?;
        Self::check_response(response)
            .await?
            .json()
            .await
            .context("invalid bookings payload")
    }

    async fn fetch_all_technicians(&self) -> Result<Vec<Technician>> {
        let response = self
            .http
            .get(self.endpoint("/technicians"))
            .send()
            .await
            .context("technicians request failed")?;
        Self::check_response(response)
            .await?
            .json()
            .await
            .context("invalid technicians payload")
    }

    async fn update_booking_status(
        &self,
        booking_id: &BookingId,
        status: BookingStatus,
    ) -> Result<()> {
        let response = self
            .http
            .patch(self.endpoint(&format!("/bookings/{}/status", booking_id.0)))
            .json(&StatusUpdateRequest { status })
            .send()
            .await
            .context("status update request failed")?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn assign_technician(
        &self,
        booking_id: &BookingId,
        technician_id: Option<TechnicianId>,
    ) -> Result<()> {
        let response = self
            .http
            .patch(self.endpoint(&format!("/bookings/{}/technician", booking_id.0)))
            .json(&TechnicianAssignmentRequest { technician_id })
            .send()
            .await
            .context("technician assignment request failed")?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn delete_booking(&self, booking_id: &BookingId) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/bookings/{}", booking_id.0)))
            .send()
            .await
            .context("delete request failed")?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn fetch_booking_for_edit(&self, booking_id: &BookingId) -> Result<Booking> {
        let response = self
            .http
            .get(self.endpoint(&format!("/bookings/{}", booking_id.0)))
            .send()
            .await
            .context("booking fetch request failed")?;
        Self::check_response(response)
            .await?
            .json()
            .await
            .context("invalid booking payload")
    }

    async fn update_customer(
        &self,
        customer_id: &CustomerId,
        update: CustomerUpdate,
    ) -> Result<()> {
        let response = self
            .http
            .patch(self.endpoint(&format!("/customers/{}", customer_id.0)))
            .json(&update)
            .send()
            .await
            .context("customer update request failed")?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn update_booking_details(
        &self,
        booking_id: &BookingId,
        update: BookingDetailsUpdate,
    ) -> Result<()> {
        let response = self
            .http
            .patch(self.endpoint(&format!("/bookings/{}", booking_id.0)))
            .json(&update)
            .send()
            .await
            .context("booking details update request failed")?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn subscribe_changes(
        &self,
        table: WatchedTable,
        filter: ChangeFilter,
    ) -> Result<ChangeSubscription> {
        self.ensure_feed_reader().await?;

        let mut feed = self.feed.lock().await;
        feed.next_subscription += 1;
        let id = SubscriptionId(feed.next_subscription);
        let (sender, changes) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        feed.subscribers.insert(id, Subscriber { table, filter, sender });
        info!(
            table = table.as_str(),
            subscription = id.0,
            "change subscription registered"
        );
        Ok(ChangeSubscription { id, changes })
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let removed = self.feed.lock().await.subscribers.remove(&id).is_some();
        if removed {
            info!(subscription = id.0, "change subscription released");
        } else {
            warn!(subscription = id.0, "release of unknown change subscription ignored");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
