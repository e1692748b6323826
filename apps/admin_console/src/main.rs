use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use dashboard_core::{DashboardController, DashboardEvent, RestBackend, StatusFilter};
use shared::domain::{BookingId, BookingStatus, TechnicianId};

mod config;
mod notifier;
mod render;

#[derive(Parser, Debug)]
#[command(about = "Operator console for the printer service booking desk")]
struct Cli {
    /// Backend base URL; overrides the config file and environment.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the booking table live; re-renders on every change.
    Watch {
        /// Match against customer name, booking id or phone.
        #[arg(long, default_value = "")]
        search: String,
        /// Show only bookings with this status.
        #[arg(long)]
        status: Option<String>,
    },
    /// Set the status of one booking.
    SetStatus { booking_id: String, status: String },
    /// Assign a technician; omit the id to clear the assignment.
    Assign {
        booking_id: String,
        #[arg(long)]
        technician_id: Option<String>,
    },
    /// Permanently delete a booking.
    Delete {
        booking_id: String,
        /// Skip the interactive confirmation.
        #[arg(long)]
        yes: bool,
    },
    /// Edit booking and customer fields; unset flags keep current values.
    Edit {
        booking_id: String,
        #[arg(long)]
        customer_name: Option<String>,
        #[arg(long)]
        customer_phone: Option<String>,
        #[arg(long)]
        customer_email: Option<String>,
        #[arg(long)]
        customer_address: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<NaiveTime>,
        #[arg(long)]
        problem: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        estimated_cost: Option<String>,
        #[arg(long)]
        actual_cost: Option<String>,
    },
}

fn parse_status(raw: &str) -> Result<BookingStatus> {
    let status = BookingStatus::from(raw.to_string());
    if matches!(status, BookingStatus::Unrecognized(_)) {
        let known = BookingStatus::KNOWN
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join("|");
        bail!("unknown status '{raw}'; expected one of {known}");
    }
    Ok(status)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let settings = config::load_settings();
    let server_url = cli.server_url.unwrap_or(settings.server_url);
    tracing::debug!("using booking service at {server_url}");

    let backend = Arc::new(RestBackend::new(server_url)?);
    let assume_yes = matches!(cli.command, Command::Delete { yes: true, .. });
    let notifier = Arc::new(notifier::ConsoleNotifier::new(assume_yes));
    let controller = DashboardController::new(backend, notifier);

    controller.start().await;
    let result = run_command(&controller, cli.command).await;
    controller.shutdown().await;
    result
}

async fn run_command(controller: &Arc<DashboardController>, command: Command) -> Result<()> {
    match command {
        Command::Watch { search, status } => watch(controller, search, status).await,
        Command::SetStatus { booking_id, status } => {
            let status = parse_status(&status)?;
            controller
                .change_status(&BookingId(booking_id), status)
                .await;
            Ok(())
        }
        Command::Assign {
            booking_id,
            technician_id,
        } => {
            let technician_id = technician_id
                .filter(|raw| !raw.is_empty())
                .map(TechnicianId);
            controller
                .assign_technician(&BookingId(booking_id), technician_id)
                .await;
            Ok(())
        }
        Command::Delete { booking_id, .. } => {
            controller.delete_booking(&BookingId(booking_id)).await;
            Ok(())
        }
        Command::Edit {
            booking_id,
            customer_name,
            customer_phone,
            customer_email,
            customer_address,
            date,
            time,
            problem,
            notes,
            estimated_cost,
            actual_cost,
        } => {
            let booking_id = BookingId(booking_id);
            if !controller.open_edit(&booking_id).await {
                bail!("could not load booking {} for editing", booking_id.0);
            }
            let mut form = controller
                .snapshot()
                .await
                .edit_form
                .ok_or_else(|| anyhow!("edit form did not open"))?;

            if let Some(v) = customer_name {
                form.customer_name = v;
            }
            if let Some(v) = customer_phone {
                form.customer_phone = v;
            }
            if let Some(v) = customer_email {
                form.customer_email = v;
            }
            if let Some(v) = customer_address {
                form.customer_address = v;
            }
            if let Some(v) = date {
                form.appointment_date = v;
            }
            if let Some(v) = time {
                form.appointment_time = v;
            }
            if let Some(v) = problem {
                form.problem_description = v;
            }
            if let Some(v) = notes {
                form.notes = v;
            }
            if let Some(v) = estimated_cost {
                form.estimated_cost = v;
            }
            if let Some(v) = actual_cost {
                form.actual_cost = v;
            }

            controller.set_edit_form(form).await;
            controller.save_edit().await;
            Ok(())
        }
    }
}

async fn watch(
    controller: &Arc<DashboardController>,
    search: String,
    status: Option<String>,
) -> Result<()> {
    controller.set_search_term(search).await;
    if let Some(raw) = status {
        controller
            .set_status_filter(StatusFilter::Only(parse_status(&raw)?))
            .await;
    }

    render::draw(controller).await;
    println!("(watching for changes; ctrl-c to stop)");

    let mut events = controller.subscribe_events();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(DashboardEvent::BookingsRefreshed { .. })
                | Ok(DashboardEvent::TechniciansRefreshed { .. }) => {
                    render::draw(controller).await;
                }
                Ok(DashboardEvent::Error(message)) => eprintln!("! {message}"),
                Err(broadcast::error::RecvError::Lagged(_)) => render::draw(controller).await,
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
