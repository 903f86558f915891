//! Scan admission.
//!
//! The camera reports decoded codes for every frame, usually the same code
//! many times per second. [`ScanController`] decides which of those become
//! lookups: a code is admitted only while the controller is idle, only if it
//! is non-empty, and only if it differs from the last admitted code. An
//! admission starts a fixed cooldown that expires on its own, whether or not
//! the lookup has finished.

use std::time::Duration;

use shelfscan_types::DecodedCode;
use tokio::time::Instant;
use tracing::{debug, info};

/// How long admissions are suppressed after a code is accepted.
pub const SCAN_COOLDOWN: Duration = Duration::from_millis(900);

/// Admission state at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Cooldown,
}

/// Why a frame did not produce a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyFrame,
    CoolingDown,
    EmptyCode,
    SameAsLastAccepted,
}

/// Result of offering a frame to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDecision {
    Admitted(String),
    Ignored(IgnoreReason),
}

impl ScanDecision {
    pub fn admitted(&self) -> Option<&str> {
        match self {
            Self::Admitted(code) => Some(code),
            Self::Ignored(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanController {
    last_accepted_code: String,
    cooldown_until: Option<Instant>,
    cooldown: Duration,
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new(SCAN_COOLDOWN)
    }
}

impl ScanController {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_accepted_code: String::new(),
            cooldown_until: None,
            cooldown,
        }
    }

    /// The last admitted code, or an empty string after a reset.
    pub fn last_accepted_code(&self) -> &str {
        &self.last_accepted_code
    }

    pub fn state(&self, now: Instant) -> ScanState {
        match self.cooldown_until {
            Some(until) if now < until => ScanState::Cooldown,
            _ => ScanState::Idle,
        }
    }

    /// Offer one camera frame. Only the first code of the frame is considered.
    pub fn offer_frame(&mut self, codes: &[DecodedCode], now: Instant) -> ScanDecision {
        match codes.first() {
            Some(code) => self.offer(&code.value, now),
            None => ScanDecision::Ignored(IgnoreReason::EmptyFrame),
        }
    }

    /// Offer a single decoded value.
    pub fn offer(&mut self, code: &str, now: Instant) -> ScanDecision {
        if self.state(now) == ScanState::Cooldown {
            return ScanDecision::Ignored(IgnoreReason::CoolingDown);
        }
        if code.is_empty() {
            return ScanDecision::Ignored(IgnoreReason::EmptyCode);
        }
        if code == self.last_accepted_code {
            debug!(ean = %code, "ignoring repeat of last accepted code");
            return ScanDecision::Ignored(IgnoreReason::SameAsLastAccepted);
        }

        self.last_accepted_code = code.to_string();
        self.cooldown_until = Some(now + self.cooldown);
        info!(ean = %code, "scanned EAN");
        ScanDecision::Admitted(code.to_string())
    }

    /// Forget the last accepted code and drop any cooldown.
    pub fn reset(&mut self) {
        self.last_accepted_code.clear();
        self.cooldown_until = None;
    }
}
