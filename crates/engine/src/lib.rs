//! # Shelfscan Engine
//!
//! The engine decides which camera frames become product lookups and when the
//! application switches between scanning and the AR product view.
//!
//! ## Architecture
//!
//! - **`scan`**: Debounced scan admission with a fixed cooldown
//! - **`mode`**: Scanning / AR display transitions with the delayed automatic switch
//! - **`dispatch`**: Runs a lookup and substitutes a placeholder product on failure
//! - **`session`**: Combines the controllers and drives them from async channels
//!
//! ## Usage
//!
//! ```rust
//! use shelfscan_engine::{ScanSession, SessionConfig};
//! use shelfscan_types::{AppMode, DecodedCode, Symbology};
//! use tokio::time::Instant;
//!
//! let mut session = ScanSession::new(SessionConfig::default());
//! let frame = vec![DecodedCode::new("3017620422003", Symbology::Ean13)];
//! let admitted = session.on_frame(&frame, Instant::now());
//! assert!(admitted.is_some());
//! assert_eq!(session.mode(), AppMode::Scanning);
//! ```

pub mod dispatch;
pub mod mode;
pub mod scan;
pub mod session;

pub use dispatch::resolve_or_placeholder;
pub use mode::{AppModeController, DISPLAY_DELAY, ModeState};
pub use scan::{IgnoreReason, SCAN_COOLDOWN, ScanController, ScanDecision, ScanState};
pub use session::{
    CompletionOutcome, LookupTicket, ParsePolicyError, STALE_RESULTS_ENV, ScanSession, SessionConfig, SessionControl, SessionEvent,
    StaleResultPolicy, drive_scan_session,
};
