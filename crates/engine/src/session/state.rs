//! Scan session state.
//!
//! [`ScanSession`] combines the scan controller and the mode controller into
//! one value with pure transition methods. Every method takes the current
//! instant explicitly; the async runner supplies the clock and the lookups.

use std::{fmt, str::FromStr, time::Duration};

use shelfscan_types::{AppMode, DecodedCode, Product};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    mode::{AppModeController, DISPLAY_DELAY},
    scan::{SCAN_COOLDOWN, ScanController, ScanDecision},
};

/// Environment variable selecting the [`StaleResultPolicy`].
pub const STALE_RESULTS_ENV: &str = "SHELFSCAN_STALE_RESULTS";

/// Monotonic identifier handed out for every admitted scan.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct LookupTicket(u64);

impl LookupTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LookupTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How completed lookups that finish out of order are treated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StaleResultPolicy {
    /// Every completion replaces the current product; the last to finish wins.
    #[default]
    ApplyAll,
    /// Completions older than an already applied result, or issued before
    /// the latest "scan new", are dropped.
    DiscardStale,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid stale result policy '{0}'; expected 'apply' or 'discard'")]
pub struct ParsePolicyError(String);

impl FromStr for StaleResultPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apply" | "apply-all" | "apply_all" => Ok(Self::ApplyAll),
            "discard" | "discard-stale" | "discard_stale" => Ok(Self::DiscardStale),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Timing and ordering knobs for a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionConfig {
    pub scan_cooldown: Duration,
    pub display_delay: Duration,
    pub stale_results: StaleResultPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_cooldown: SCAN_COOLDOWN,
            display_delay: DISPLAY_DELAY,
            stale_results: StaleResultPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults with the stale result policy read from `SHELFSCAN_STALE_RESULTS`.
    pub fn from_env() -> Result<Self, ParsePolicyError> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(STALE_RESULTS_ENV)
            && !value.trim().is_empty()
        {
            config.stale_results = value.parse()?;
        }
        Ok(config)
    }

    pub fn with_stale_results(mut self, policy: StaleResultPolicy) -> Self {
        self.stale_results = policy;
        self
    }
}

/// What happened to a completed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The product now occupies the current slot.
    Applied,
    Discarded,
}

/// Scan admission plus mode, driven by explicit inputs.
#[derive(Debug, Clone)]
pub struct ScanSession {
    scanner: ScanController,
    modes: AppModeController,
    stale_results: StaleResultPolicy,
    next_ticket: u64,
    newest_applied: Option<LookupTicket>,
    reset_floor: LookupTicket,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl ScanSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            scanner: ScanController::new(config.scan_cooldown),
            modes: AppModeController::new(config.display_delay),
            stale_results: config.stale_results,
            next_ticket: 0,
            newest_applied: None,
            reset_floor: LookupTicket(0),
        }
    }

    pub fn mode(&self) -> AppMode {
        self.modes.mode()
    }

    pub fn current_product(&self) -> Option<&Product> {
        self.modes.current_product()
    }

    pub fn scanner(&self) -> &ScanController {
        &self.scanner
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.modes.next_deadline()
    }

    /// Feed one camera frame. Returns the ticket and EAN to look up when a code is admitted.
    ///
    /// The camera only runs while scanning, so frames are ignored in AR.
    pub fn on_frame(&mut self, codes: &[DecodedCode], now: Instant) -> Option<(LookupTicket, String)> {
        if self.mode() != AppMode::Scanning {
            return None;
        }
        match self.scanner.offer_frame(codes, now) {
            ScanDecision::Admitted(ean) => {
                let ticket = LookupTicket(self.next_ticket);
                self.next_ticket += 1;
                Some((ticket, ean))
            }
            ScanDecision::Ignored(reason) => {
                debug!(?reason, "frame ignored");
                None
            }
        }
    }

    /// Apply a finished lookup to the current product slot.
    pub fn on_lookup_completed(&mut self, ticket: LookupTicket, product: Product, now: Instant) -> CompletionOutcome {
        if self.is_stale(ticket) {
            debug!(%ticket, ean = %product.ean(), "discarding stale lookup result");
            return CompletionOutcome::Discarded;
        }
        self.newest_applied = self.newest_applied.max(Some(ticket));
        self.modes.set_product(product, now);
        CompletionOutcome::Applied
    }

    /// Advance timers. Returns the new mode when the automatic switch fired.
    pub fn on_tick(&mut self, now: Instant) -> Option<AppMode> {
        let changed = self.modes.tick(now);
        if let Some(mode) = changed {
            info!(%mode, "mode changed");
        }
        changed
    }

    /// "View in AR" affordance, available while scanning once a product exists.
    pub fn view_in_ar(&mut self) -> Option<AppMode> {
        let changed = self.modes.view_in_ar();
        if let Some(mode) = changed {
            info!(%mode, "mode changed by user");
        }
        changed
    }

    /// "Scan new" from the AR view: clear the product, reset admission and return to scanning.
    ///
    /// Ignored while scanning, leaving the product, the pending switch and the cooldown intact.
    pub fn scan_new(&mut self) -> Option<AppMode> {
        let changed = self.modes.scan_new()?;
        self.scanner.reset();
        self.reset_floor = LookupTicket(self.next_ticket);
        info!("back to scanning");
        Some(changed)
    }

    fn is_stale(&self, ticket: LookupTicket) -> bool {
        match self.stale_results {
            StaleResultPolicy::ApplyAll => false,
            StaleResultPolicy::DiscardStale => {
                ticket < self.reset_floor || self.newest_applied.is_some_and(|newest| ticket < newest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shelfscan_types::Symbology;

    fn frame(code: &str) -> Vec<DecodedCode> {
        vec![DecodedCode::new(code, Symbology::Ean13)]
    }

    fn product(ean: &str) -> Product {
        Product::placeholder(ean, Utc::now())
    }

    fn ms(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    #[test]
    fn admitted_scans_get_increasing_tickets() {
        let start = Instant::now();
        let mut session = ScanSession::default();
        let (first, ean) = session.on_frame(&frame("111"), start).unwrap();
        assert_eq!(ean, "111");
        assert!(session.on_frame(&frame("111"), ms(start, 50)).is_none());
        let (second, _) = session.on_frame(&frame("222"), ms(start, 950)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn frames_are_ignored_in_ar_display() {
        let start = Instant::now();
        let mut session = ScanSession::default();
        let (ticket, ean) = session.on_frame(&frame("111"), start).unwrap();
        session.on_lookup_completed(ticket, product(&ean), ms(start, 10));
        assert_eq!(session.on_tick(ms(start, 310)), Some(AppMode::ArDisplay));

        assert!(session.on_frame(&frame("222"), ms(start, 2_000)).is_none());
    }

    #[test]
    fn scan_new_resets_everything_and_allows_same_code() {
        let start = Instant::now();
        let mut session = ScanSession::default();
        let (ticket, ean) = session.on_frame(&frame("111"), start).unwrap();
        session.on_lookup_completed(ticket, product(&ean), start);
        session.view_in_ar();

        assert_eq!(session.scan_new(), Some(AppMode::Scanning));
        assert!(session.current_product().is_none());
        assert_eq!(session.scanner().last_accepted_code(), "");

        let (again, ean) = session.on_frame(&frame("111"), ms(start, 1)).unwrap();
        assert_eq!(ean, "111");
        assert!(again > ticket);
    }

    #[test]
    fn apply_all_lets_slow_earlier_lookup_win() {
        let start = Instant::now();
        let mut session = ScanSession::default();
        let (slow, _) = session.on_frame(&frame("111"), start).unwrap();
        let (fast, _) = session.on_frame(&frame("222"), ms(start, 1_000)).unwrap();

        session.on_lookup_completed(fast, product("222"), ms(start, 1_100));
        assert_eq!(session.on_lookup_completed(slow, product("111"), ms(start, 2_000)), CompletionOutcome::Applied);
        assert_eq!(session.current_product().map(Product::ean), Some("111"));
    }

    #[test]
    fn discard_stale_keeps_newest_scan() {
        let start = Instant::now();
        let config = SessionConfig::default().with_stale_results(StaleResultPolicy::DiscardStale);
        let mut session = ScanSession::new(config);
        let (slow, _) = session.on_frame(&frame("111"), start).unwrap();
        let (fast, _) = session.on_frame(&frame("222"), ms(start, 1_000)).unwrap();

        session.on_lookup_completed(fast, product("222"), ms(start, 1_100));
        assert_eq!(session.on_lookup_completed(slow, product("111"), ms(start, 2_000)), CompletionOutcome::Discarded);
        assert_eq!(session.current_product().map(Product::ean), Some("222"));
    }

    /// Two lookups in flight; the first resolves and is viewed in AR, then the user scans new.
    fn scan_new_with_lookup_in_flight(session: &mut ScanSession, start: Instant) -> LookupTicket {
        let (first, _) = session.on_frame(&frame("111"), start).unwrap();
        let (second, _) = session.on_frame(&frame("222"), ms(start, 1_000)).unwrap();
        session.on_lookup_completed(first, product("111"), ms(start, 1_100));
        assert_eq!(session.view_in_ar(), Some(AppMode::ArDisplay));
        assert_eq!(session.scan_new(), Some(AppMode::Scanning));
        second
    }

    #[test]
    fn discard_stale_drops_results_from_before_scan_new() {
        let start = Instant::now();
        let config = SessionConfig::default().with_stale_results(StaleResultPolicy::DiscardStale);
        let mut session = ScanSession::new(config);
        let in_flight = scan_new_with_lookup_in_flight(&mut session, start);

        assert_eq!(
            session.on_lookup_completed(in_flight, product("222"), ms(start, 1_500)),
            CompletionOutcome::Discarded
        );
        assert!(session.current_product().is_none());
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn apply_all_shows_late_result_after_scan_new() {
        let start = Instant::now();
        let mut session = ScanSession::default();
        let in_flight = scan_new_with_lookup_in_flight(&mut session, start);

        assert_eq!(
            session.on_lookup_completed(in_flight, product("222"), ms(start, 1_500)),
            CompletionOutcome::Applied
        );
        assert_eq!(session.next_deadline(), Some(ms(start, 1_800)));
    }

    #[test]
    fn scan_new_while_scanning_keeps_product_and_cooldown() {
        let start = Instant::now();
        let mut session = ScanSession::default();
        let (ticket, ean) = session.on_frame(&frame("111"), start).unwrap();
        session.on_lookup_completed(ticket, product(&ean), ms(start, 10));

        assert_eq!(session.scan_new(), None);
        assert_eq!(session.current_product().map(Product::ean), Some("111"));
        assert_eq!(session.next_deadline(), Some(ms(start, 310)));
        assert!(session.on_frame(&frame("111"), ms(start, 20)).is_none());
        assert_eq!(session.on_tick(ms(start, 400)), Some(AppMode::ArDisplay));
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("discard".parse::<StaleResultPolicy>(), Ok(StaleResultPolicy::DiscardStale));
        assert_eq!(" Apply ".parse::<StaleResultPolicy>(), Ok(StaleResultPolicy::ApplyAll));
        assert!("newest".parse::<StaleResultPolicy>().is_err());
    }

    #[test]
    fn env_selects_discard_policy() {
        temp_env::with_var(STALE_RESULTS_ENV, Some("discard"), || {
            let config = SessionConfig::from_env().unwrap();
            assert_eq!(config.stale_results, StaleResultPolicy::DiscardStale);
            assert_eq!(config.scan_cooldown, SCAN_COOLDOWN);
        });
    }

    #[test]
    fn env_without_policy_applies_all() {
        temp_env::with_var(STALE_RESULTS_ENV, None::<&str>, || {
            assert_eq!(SessionConfig::from_env(), Ok(SessionConfig::default()));
        });
    }

    #[test]
    fn env_rejects_unknown_policy() {
        temp_env::with_var(STALE_RESULTS_ENV, Some("newest"), || {
            assert_eq!(SessionConfig::from_env(), Err(ParsePolicyError("newest".to_string())));
        });
    }
}
