/// Distance from the bottom below which the next page is requested.
pub const DEFAULT_THRESHOLD: u32 = 50;

/// Viewport geometry, in whatever unit the view measures (rows in the TUI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: u32,
    pub scroll_height: u32,
    pub client_height: u32,
}

impl ScrollMetrics {
    pub fn distance_to_bottom(&self) -> u32 {
        self.scroll_height
            .saturating_sub(self.scroll_top.saturating_add(self.client_height))
    }
}

/// Edge-triggered "near bottom" detector.
///
/// Fires once when the distance to the bottom drops below the threshold.
/// It stays quiet until the viewport moves back above the threshold or the
/// content height changes, so repeated scroll reports at the same position
/// never produce a second signal.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold: u32,
    armed: bool,
    last_height: Option<u32>,
}

impl ScrollTrigger {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            armed: true,
            last_height: None,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Arms the trigger again without waiting for the view to move, for when
    /// new content arrived that the view may not reflect yet.
    pub fn rearm(&mut self) {
        self.armed = true;
    }

    /// Returns true when a page advance should be issued.
    pub fn observe(&mut self, metrics: ScrollMetrics) -> bool {
        if self.last_height.is_some_and(|h| h != metrics.scroll_height) {
            self.armed = true;
        }
        self.last_height = Some(metrics.scroll_height);

        let near_bottom = metrics.distance_to_bottom() < self.threshold;
        if !near_bottom {
            self.armed = true;
            return false;
        }
        if self.armed {
            self.armed = false;
            return true;
        }
        false
    }
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
