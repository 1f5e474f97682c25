//! Async session runner for one peer link.
//!
//! A [`PeerSession`] owns everything tied to one connection: the provider's
//! outbound queue, the fragmenter, the inbound [`SyncHandler`], and the
//! maintenance timer. It runs until the link closes or shutdown is requested,
//! then tears down all cache and allocation state.
//!
//! ```text
//!   TemplateProvider ──► ChannelSink ──► outbound queue ─┐
//!          ▲                                             │ fragment + encode
//!          │                                             ▼
//!     SyncHandler ◄── decode ◄── link.inbound     link.outbound ──► peer
//! ```

use crate::config::PeerConfig;
use crate::network::{decode_message, encode_message, ChannelSink};
use blueprint_cache::TemplateProvider;
use blueprint_core::OutboundMessage;
use blueprint_sync::{Fragmenter, HandleOutcome, SyncHandler};
use blueprint_types::{Clock, SystemClock};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// One end of a bidirectional, ordered frame channel.
#[derive(Debug)]
pub struct PeerLink {
    pub outbound: mpsc::UnboundedSender<Bytes>,
    pub inbound: mpsc::UnboundedReceiver<Bytes>,
}

/// Two connected in-process link ends.
pub fn link_pair() -> (PeerLink, PeerLink) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        PeerLink {
            outbound: a_tx,
            inbound: a_rx,
        },
        PeerLink {
            outbound: b_tx,
            inbound: b_rx,
        },
    )
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The remote end closed the link.
    LinkClosed,
    /// A frame could not be delivered to the remote end.
    SendFailed,
    /// [`PeerSession::shutdown_handle`] was notified.
    Shutdown,
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub decode_errors: u64,
    pub encode_errors: u64,
    pub templates_applied: u64,
    pub maintenance_runs: u64,
}

impl SessionSummary {
    fn new() -> Self {
        Self {
            end: SessionEnd::LinkClosed,
            frames_sent: 0,
            frames_received: 0,
            decode_errors: 0,
            encode_errors: 0,
            templates_applied: 0,
            maintenance_runs: 0,
        }
    }
}

/// Drives template sync over one [`PeerLink`].
pub struct PeerSession {
    handler: SyncHandler,
    fragmenter: Fragmenter,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    link: PeerLink,
    maintenance_interval: Duration,
    shutdown: Arc<Notify>,
}

impl PeerSession {
    /// Create a session on wall-clock time.
    ///
    /// Returns the session and the provider consumers use while it runs.
    pub fn new(config: PeerConfig, link: PeerLink) -> (Self, Arc<TemplateProvider>) {
        Self::with_clock(config, link, Arc::new(SystemClock::new()))
    }

    /// Create a session on the given clock.
    pub fn with_clock(
        config: PeerConfig,
        link: PeerLink,
        clock: Arc<dyn Clock>,
    ) -> (Self, Arc<TemplateProvider>) {
        let (sink, outbound) = ChannelSink::new();
        let provider = Arc::new(TemplateProvider::with_clock(
            config.cache.clone(),
            Arc::new(sink),
            clock.clone(),
        ));
        let fragmenter = Fragmenter::from_config(&config.sync);
        let handler = SyncHandler::new(provider.clone(), config.sync, clock);

        let session = Self {
            handler,
            fragmenter,
            outbound,
            link,
            maintenance_interval: config.maintenance_interval,
            shutdown: Arc::new(Notify::new()),
        };
        (session, provider)
    }

    /// Handle that stops the session when notified.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run until the link closes or shutdown is requested.
    ///
    /// All cache, allocation and reassembly state is dropped before this
    /// returns.
    pub async fn run(self) -> SessionSummary {
        let PeerSession {
            mut handler,
            fragmenter,
            mut outbound,
            mut link,
            maintenance_interval,
            shutdown,
        } = self;

        let mut summary = SessionSummary::new();
        let mut ticker = tokio::time::interval(maintenance_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Sync session started");

        loop {
            tokio::select! {
                Some(message) = outbound.recv() => {
                    let frames = match encode_message(&message, &fragmenter) {
                        Ok(frames) => frames,
                        Err(e) => {
                            warn!(
                                msg_type = message.type_name(),
                                template_id = %message.template_id(),
                                error = %e,
                                "Failed to encode outbound message"
                            );
                            summary.encode_errors += 1;
                            continue;
                        }
                    };
                    trace!(
                        msg_type = message.type_name(),
                        template_id = %message.template_id(),
                        frames = frames.len(),
                        "Sending message"
                    );
                    let count = frames.len() as u64;
                    if frames.into_iter().any(|frame| link.outbound.send(frame).is_err()) {
                        debug!("Peer link closed while sending");
                        summary.end = SessionEnd::SendFailed;
                        break;
                    }
                    summary.frames_sent += count;
                }

                frame = link.inbound.recv() => {
                    let Some(frame) = frame else {
                        debug!("Peer link closed");
                        summary.end = SessionEnd::LinkClosed;
                        break;
                    };
                    summary.frames_received += 1;
                    match decode_message(&frame) {
                        Ok(message) => {
                            let msg_type = message.type_name();
                            let outcome = handler.handle(message);
                            trace!(msg_type, ?outcome, "Handled inbound message");
                            if matches!(outcome, HandleOutcome::Applied(_)) {
                                summary.templates_applied += 1;
                            }
                        }
                        Err(e) => {
                            warn!(bytes = frame.len(), error = %e, "Failed to decode inbound frame");
                            summary.decode_errors += 1;
                        }
                    }
                }

                _ = ticker.tick() => {
                    let report = handler.maintain();
                    summary.maintenance_runs += 1;
                    if report.evicted > 0 || !report.retried.is_empty() {
                        debug!(
                            evicted = report.evicted,
                            retried = report.retried.len(),
                            "Maintenance pass"
                        );
                    }
                }

                _ = shutdown.notified() => {
                    summary.end = SessionEnd::Shutdown;
                    break;
                }
            }
        }

        handler.end_session();
        info!(
            end = ?summary.end,
            frames_sent = summary.frames_sent,
            frames_received = summary.frames_received,
            "Sync session stopped"
        );
        summary
    }
}
