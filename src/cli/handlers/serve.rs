//! Handler for the `serve` command
//!
//! Reads one JSON [`InboundEvent`] per stdin line, dispatches it and writes
//! one JSON [`Acknowledgement`] per line to stdout. Logs go to stderr. Queued
//! ticket writes are retried on the configured reconcile interval and once
//! more when stdin closes.

use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::core::GroupId;
use crate::error::Result;
use crate::events::EventBus;
use crate::interaction::{Acknowledgement, InboundEvent, Interaction, dispatch};
use crate::lifecycle::{DeskSettings, LifecycleManager};
use crate::provider::MemoryProvider;
use crate::storage::{self, TicketRepository};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// In-process provider seeded with the configured category and roles
#[must_use]
pub fn provider_for(config: &Config) -> MemoryProvider {
    let desk = &config.desk;
    MemoryProvider::new()
        .with_category(desk.group_id, desk.category_id)
        .with_role(desk.group_id, desk.support_role_id, "Support")
        .with_role(desk.group_id, desk.authority_role_id, "Staff")
}

/// Lifecycle manager plus the in-process provider it talks to
pub struct ServeSession {
    manager: LifecycleManager,
    provider: Arc<MemoryProvider>,
    group: GroupId,
}

impl ServeSession {
    pub fn new(config: &Config, store: Arc<dyn TicketRepository>, events: Arc<EventBus>) -> Self {
        let provider = Arc::new(provider_for(config));
        let manager = LifecycleManager::with_events(
            store,
            provider.clone(),
            DeskSettings::from(config),
            events,
        );
        Self {
            manager,
            provider,
            group: config.desk.group_id,
        }
    }

    #[must_use]
    pub const fn manager(&self) -> &LifecycleManager {
        &self.manager
    }

    /// Parse and dispatch one inbound line
    ///
    /// The channel an event comes from is known to exist on the platform, so
    /// the provider learns it before dispatch.
    pub async fn handle_line(&self, line: &str) -> Acknowledgement {
        let event: InboundEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Malformed inbound event");
                return Acknowledgement::failure("The request could not be understood.");
            },
        };

        let Some(interaction) = Interaction::from_trigger(&event.trigger) else {
            warn!(trigger = ?event.trigger, "Unknown interaction");
            return Acknowledgement::unknown();
        };

        self.provider.observe_channel(self.group, &event.channel);
        dispatch(&self.manager, interaction, &event.context()).await
    }
}

/// Run the inbound event loop until stdin closes
pub async fn handle_serve(config: &Config, output: &OutputFormatter) -> Result<()> {
    let store = storage::open(&config.storage).await?;
    let events = Arc::new(EventBus::default());
    let mut event_log = events.subscribe();
    let session = ServeSession::new(config, store, events);

    info!(
        group = %config.desk.group_id,
        storage = %config.storage.path.display(),
        "Serving ticket interactions from stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reconcile = tokio::time::interval(config.provider.reconcile_interval());
    // The first tick completes immediately
    reconcile.tick().await;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !line.trim().is_empty() {
                    let ack = session.handle_line(&line).await;
                    output.json_line(&ack)?;
                }
            }
            _ = reconcile.tick() => {
                let resolved = session.manager().reconcile().await;
                if resolved > 0 {
                    info!(resolved, "Reconciled queued ticket records");
                }
            }
            event = event_log.recv() => match event {
                Ok(event) => debug!(?event, "Ticket event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log fell behind"),
                Err(RecvError::Closed) => {}
            }
        }
    }

    session.manager().reconcile().await;
    let pending = session.manager().pending_reconciliation();
    if !pending.is_empty() {
        warn!(
            count = pending.len(),
            "Ticket records still unwritten at shutdown"
        );
    }
    info!("Input closed, shutting down");
    Ok(())
}
