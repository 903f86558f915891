//! Application mode transitions.
//!
//! The application alternates between scanning with the camera and showing
//! the current product in AR. A resolved lookup schedules the switch to AR
//! after a short display delay so the scanning view can acknowledge the
//! capture; the user can also switch early. Only "scan new" goes back.

use std::time::Duration;

use shelfscan_types::{AppMode, Product};
use tokio::time::Instant;

/// Delay between a product being set and the automatic switch to AR.
pub const DISPLAY_DELAY: Duration = Duration::from_millis(300);

/// Mode together with the data that only exists in that mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeState {
    Scanning {
        /// Product resolved while scanning and not yet shown in AR.
        current: Option<Product>,
        /// When the automatic switch to AR is due.
        display_at: Option<Instant>,
    },
    ArDisplay {
        product: Product,
    },
}

impl Default for ModeState {
    fn default() -> Self {
        Self::Scanning {
            current: None,
            display_at: None,
        }
    }
}

impl ModeState {
    pub fn mode(&self) -> AppMode {
        match self {
            Self::Scanning { .. } => AppMode::Scanning,
            Self::ArDisplay { .. } => AppMode::ArDisplay,
        }
    }

    pub fn product(&self) -> Option<&Product> {
        match self {
            Self::Scanning { current, .. } => current.as_ref(),
            Self::ArDisplay { product } => Some(product),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppModeController {
    state: ModeState,
    display_delay: Duration,
}

impl Default for AppModeController {
    fn default() -> Self {
        Self::new(DISPLAY_DELAY)
    }
}

impl AppModeController {
    pub fn new(display_delay: Duration) -> Self {
        Self {
            state: ModeState::default(),
            display_delay,
        }
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn mode(&self) -> AppMode {
        self.state.mode()
    }

    pub fn current_product(&self) -> Option<&Product> {
        self.state.product()
    }

    /// Pending automatic switch to AR, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            ModeState::Scanning { display_at, .. } => *display_at,
            ModeState::ArDisplay { .. } => None,
        }
    }

    /// Replace the current product wholesale.
    ///
    /// While scanning this schedules the switch to AR; a switch that is
    /// already scheduled keeps its original deadline. In AR the new product
    /// is shown in place.
    pub fn set_product(&mut self, product: Product, now: Instant) {
        match &mut self.state {
            ModeState::Scanning { current, display_at } => {
                *current = Some(product);
                display_at.get_or_insert(now + self.display_delay);
            }
            ModeState::ArDisplay { product: shown } => *shown = product,
        }
    }

    /// Apply the automatic switch when its deadline has passed.
    ///
    /// Returns the new mode when a transition happened.
    pub fn tick(&mut self, now: Instant) -> Option<AppMode> {
        let due = matches!(
            &self.state,
            ModeState::Scanning { current: Some(_), display_at: Some(due) } if *due <= now
        );
        if due { self.enter_ar() } else { None }
    }

    /// User asked to view the not-yet-viewed product while still scanning.
    pub fn view_in_ar(&mut self) -> Option<AppMode> {
        if matches!(&self.state, ModeState::Scanning { current: Some(_), .. }) {
            self.enter_ar()
        } else {
            None
        }
    }

    /// User asked to scan a new product from the AR view: drop the product and return to scanning.
    ///
    /// Only available in AR; while scanning this does nothing and returns `None`.
    pub fn scan_new(&mut self) -> Option<AppMode> {
        if !matches!(self.state, ModeState::ArDisplay { .. }) {
            return None;
        }
        self.state = ModeState::default();
        Some(AppMode::Scanning)
    }

    fn enter_ar(&mut self) -> Option<AppMode> {
        match std::mem::take(&mut self.state) {
            ModeState::Scanning {
                current: Some(product), ..
            } => {
                self.state = ModeState::ArDisplay { product };
                Some(AppMode::ArDisplay)
            }
            other => {
                self.state = other;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(ean: &str) -> Product {
        Product::placeholder(ean, Utc::now())
    }

    #[test]
    fn switches_to_ar_after_display_delay() {
        let start = Instant::now();
        let mut modes = AppModeController::default();
        modes.set_product(product("111"), start);

        assert_eq!(modes.next_deadline(), Some(start + DISPLAY_DELAY));
        assert_eq!(modes.tick(start + Duration::from_millis(299)), None);
        assert_eq!(modes.mode(), AppMode::Scanning);
        assert_eq!(modes.tick(start + DISPLAY_DELAY), Some(AppMode::ArDisplay));
        assert_eq!(modes.current_product().map(Product::ean), Some("111"));
        assert_eq!(modes.next_deadline(), None);
    }

    #[test]
    fn later_product_keeps_first_deadline() {
        let start = Instant::now();
        let mut modes = AppModeController::default();
        modes.set_product(product("111"), start);
        modes.set_product(product("222"), start + Duration::from_millis(200));

        assert_eq!(modes.next_deadline(), Some(start + DISPLAY_DELAY));
        assert_eq!(modes.tick(start + DISPLAY_DELAY), Some(AppMode::ArDisplay));
        assert_eq!(modes.current_product().map(Product::ean), Some("222"));
    }

    #[test]
    fn view_in_ar_requires_a_product() {
        let mut modes = AppModeController::default();
        assert_eq!(modes.view_in_ar(), None);
        assert_eq!(modes.mode(), AppMode::Scanning);

        modes.set_product(product("111"), Instant::now());
        assert_eq!(modes.view_in_ar(), Some(AppMode::ArDisplay));
        assert_eq!(modes.view_in_ar(), None);
    }

    #[test]
    fn ar_display_never_reverts_on_its_own() {
        let start = Instant::now();
        let mut modes = AppModeController::default();
        modes.set_product(product("111"), start);
        modes.tick(start + DISPLAY_DELAY);

        assert_eq!(modes.tick(start + Duration::from_secs(3_600)), None);
        assert_eq!(modes.mode(), AppMode::ArDisplay);
    }

    #[test]
    fn product_replaced_in_place_while_in_ar() {
        let start = Instant::now();
        let mut modes = AppModeController::default();
        modes.set_product(product("111"), start);
        modes.view_in_ar();
        modes.set_product(product("222"), start);

        assert_eq!(modes.mode(), AppMode::ArDisplay);
        assert_eq!(modes.current_product().map(Product::ean), Some("222"));
    }

    #[test]
    fn scan_new_clears_product_and_pending_switch() {
        let start = Instant::now();
        let mut modes = AppModeController::default();
        modes.set_product(product("111"), start);
        modes.view_in_ar();

        assert_eq!(modes.scan_new(), Some(AppMode::Scanning));
        assert!(modes.current_product().is_none());
        assert_eq!(modes.next_deadline(), None);
        assert_eq!(modes.tick(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn scan_new_is_ignored_while_scanning() {
        let start = Instant::now();
        let mut modes = AppModeController::default();
        modes.set_product(product("222"), start);

        assert_eq!(modes.scan_new(), None);
        assert_eq!(modes.current_product().map(Product::ean), Some("222"));
        assert_eq!(modes.next_deadline(), Some(start + DISPLAY_DELAY));
        assert_eq!(modes.tick(start + DISPLAY_DELAY), Some(AppMode::ArDisplay));
    }
}
