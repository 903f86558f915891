//! Asynchronous scan session runner.
//!
//! This module turns the pure [`ScanSession`] into a cooperative task. The
//! caller pushes camera frames and user actions through a control channel
//! and receives [`SessionEvent`]s describing lookups, product updates, mode
//! changes and what the AR renderer should show. Lookups run as independent
//! tasks; nothing cancels them and their results are applied in completion
//! order.

use std::{future, sync::Arc};

use anyhow::Result;
use shelfscan_api::ProductLookup;
use shelfscan_types::{AppMode, DecodedCode, Product};
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    time::{Instant, sleep_until},
};
use tracing::debug;

use crate::{
    dispatch::resolve_or_placeholder,
    session::state::{CompletionOutcome, LookupTicket, ScanSession, SessionConfig},
};

/// Inputs accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionControl {
    /// Codes decoded from one camera frame.
    Frame(Vec<DecodedCode>),
    ViewInAr,
    ScanNew,
    Shutdown,
}

/// Notifications emitted by a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LookupDispatched { ticket: LookupTicket, ean: String },
    /// A completed lookup replaced the current product.
    ProductUpdated { ticket: LookupTicket, product: Product },
    StaleResultDiscarded { ticket: LookupTicket, ean: String },
    ModeChanged { mode: AppMode },
    /// What the AR renderer should display; only sent while in AR.
    Render { product: Option<Product> },
}

/// Drives a scan session until the control channel closes or `Shutdown` arrives.
pub async fn drive_scan_session(
    lookup: Arc<dyn ProductLookup>,
    config: SessionConfig,
    mut control_rx: UnboundedReceiver<SessionControl>,
    event_tx: UnboundedSender<SessionEvent>,
) -> Result<()> {
    let mut session = ScanSession::new(config);
    let (completion_tx, mut completion_rx) = unbounded_channel::<(LookupTicket, Product)>();

    loop {
        let deadline = session.next_deadline();
        let step = tokio::select! {
            control = control_rx.recv() => match control {
                None | Some(SessionControl::Shutdown) => break,
                Some(control) => handle_control(&mut session, control, &lookup, &completion_tx, &event_tx),
            },
            Some((ticket, product)) = completion_rx.recv() => {
                handle_completion(&mut session, ticket, product, &event_tx)
            }
            _ = wait_for(deadline) => match session.on_tick(Instant::now()) {
                Some(mode) => emit_mode_change(&session, mode, &event_tx),
                None => Ok(()),
            },
        };

        if step.is_err() {
            debug!("session event receiver dropped; stopping");
            break;
        }
    }

    Ok(())
}

/// Marker for a closed event channel.
struct Disconnected;

type Step = std::result::Result<(), Disconnected>;

fn send(event_tx: &UnboundedSender<SessionEvent>, event: SessionEvent) -> Step {
    event_tx.send(event).map_err(|_| Disconnected)
}

fn handle_control(
    session: &mut ScanSession,
    control: SessionControl,
    lookup: &Arc<dyn ProductLookup>,
    completion_tx: &UnboundedSender<(LookupTicket, Product)>,
    event_tx: &UnboundedSender<SessionEvent>,
) -> Step {
    match control {
        SessionControl::Frame(codes) => {
            let Some((ticket, ean)) = session.on_frame(&codes, Instant::now()) else {
                return Ok(());
            };
            spawn_lookup(Arc::clone(lookup), ticket, ean.clone(), completion_tx.clone());
            send(event_tx, SessionEvent::LookupDispatched { ticket, ean })
        }
        SessionControl::ViewInAr => match session.view_in_ar() {
            Some(mode) => emit_mode_change(session, mode, event_tx),
            None => Ok(()),
        },
        SessionControl::ScanNew => match session.scan_new() {
            Some(mode) => emit_mode_change(session, mode, event_tx),
            None => Ok(()),
        },
        SessionControl::Shutdown => Ok(()),
    }
}

fn handle_completion(
    session: &mut ScanSession,
    ticket: LookupTicket,
    product: Product,
    event_tx: &UnboundedSender<SessionEvent>,
) -> Step {
    let ean = product.ean().to_string();
    match session.on_lookup_completed(ticket, product.clone(), Instant::now()) {
        CompletionOutcome::Discarded => send(event_tx, SessionEvent::StaleResultDiscarded { ticket, ean }),
        CompletionOutcome::Applied => {
            send(event_tx, SessionEvent::ProductUpdated { ticket, product })?;
            if session.mode() == AppMode::ArDisplay {
                send(
                    event_tx,
                    SessionEvent::Render {
                        product: session.current_product().cloned(),
                    },
                )?;
            }
            Ok(())
        }
    }
}

fn emit_mode_change(session: &ScanSession, mode: AppMode, event_tx: &UnboundedSender<SessionEvent>) -> Step {
    send(event_tx, SessionEvent::ModeChanged { mode })?;
    if mode == AppMode::ArDisplay {
        send(
            event_tx,
            SessionEvent::Render {
                product: session.current_product().cloned(),
            },
        )?;
    }
    Ok(())
}

fn spawn_lookup(
    lookup: Arc<dyn ProductLookup>,
    ticket: LookupTicket,
    ean: String,
    completion_tx: UnboundedSender<(LookupTicket, Product)>,
) {
    tokio::spawn(async move {
        let product = resolve_or_placeholder(lookup.as_ref(), &ean).await;
        // The session may have ended; its result is then dropped.
        let _ = completion_tx.send((ticket, product));
    });
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}
