//! Scan sessions: pure state plus the async runner that drives it.

pub mod runner;
pub mod state;

pub use runner::{SessionControl, SessionEvent, drive_scan_session};
pub use state::{CompletionOutcome, LookupTicket, ParsePolicyError, STALE_RESULTS_ENV, ScanSession, SessionConfig, StaleResultPolicy};
