//! Active section tracking
//!
//! [`SectionObserver`] owns the single "current section" value. Two sources
//! feed it: passive visibility batches computed after every scroll or layout
//! step, and explicit navigation requests (selecting a navigation entry, a
//! search result, `:goto`). An explicit request wins immediately and mutes
//! passive batches until the scroll animation it started is presumed done;
//! when that window closes the section is re-resolved from the latest
//! geometry.
//!
//! Time is passed in rather than read, so every transition can be driven
//! deterministically.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default length of the passive suppression window
pub const DEFAULT_SUPPRESSION: Duration = Duration::from_millis(900);

/// Observer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    /// Passive visibility is the source of truth
    Idle,
    /// An explicit navigation is animating; passive batches are ignored
    UserScrolling {
        /// When the suppression window closes
        until: Instant,
    },
}

/// What caused an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOrigin {
    /// Reader scrolled
    Passive,
    /// Reader asked for a section
    Explicit,
    /// Suppression window closed and geometry disagreed with the target
    Settled,
}

/// A change of the current section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub previous: Option<String>,
    pub current: String,
    pub origin: ActivationOrigin,
    /// Whether the navigation panel may scroll to reveal the entry
    pub scroll_panel: bool,
}

/// Visibility of one heading in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingVisibility {
    pub id: String,
    /// Heading lies inside the viewport (after margins)
    pub intersecting: bool,
    /// Distance from the viewport top, in lines (negative when above)
    pub top: i64,
}

/// The visible window of the content panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// First visible line
    pub offset: usize,
    /// Number of visible lines
    pub height: usize,
    /// Lines at each edge that do not count as visible
    pub margin: usize,
}

impl Viewport {
    /// Visible line range after margins, as `[start, end)`
    fn band(&self) -> (usize, usize) {
        let margin = if self.height > self.margin * 2 { self.margin } else { 0 };
        (self.offset + margin, self.offset + self.height - margin)
    }
}

/// Compute a visibility batch for heading anchors `(id, line)`
pub fn measure<'a>(
    viewport: Viewport,
    anchors: impl IntoIterator<Item = (&'a str, usize)>,
) -> Vec<HeadingVisibility> {
    let (start, end) = viewport.band();
    anchors
        .into_iter()
        .map(|(id, line)| HeadingVisibility {
            id: id.to_string(),
            intersecting: line >= start && line < end,
            top: line as i64 - start as i64,
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    intersecting: bool,
    top: i64,
}

/// Single source of the current section
#[derive(Debug, Clone)]
pub struct SectionObserver {
    /// Registered heading ids in document order
    order: Vec<String>,
    geometry: HashMap<String, Geometry>,
    current: Option<String>,
    state: ObserverState,
    suppression: Duration,
}

impl Default for SectionObserver {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION)
    }
}

impl SectionObserver {
    pub fn new(suppression: Duration) -> Self {
        Self {
            order: Vec::new(),
            geometry: HashMap::new(),
            current: None,
            state: ObserverState::Idle,
            suppression,
        }
    }

    /// Register the headings to watch, replacing any previous registration
    ///
    /// Geometry of headings that remain registered is kept. The current
    /// section is left alone even if its heading is gone.
    pub fn observe<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = ids.into_iter().map(Into::into).collect();
        let order = &self.order;
        self.geometry.retain(|id, _| order.contains(id));
        tracing::debug!(headings = self.order.len(), "Observing headings");
    }

    /// Current section id
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn state(&self) -> ObserverState {
        self.state
    }

    pub fn is_user_scrolling(&self) -> bool {
        matches!(self.state, ObserverState::UserScrolling { .. })
    }

    /// When the suppression window closes, if one is open
    pub fn pending_deadline(&self) -> Option<Instant> {
        match self.state {
            ObserverState::UserScrolling { until } => Some(until),
            ObserverState::Idle => None,
        }
    }

    pub fn suppression(&self) -> Duration {
        self.suppression
    }

    /// Feed a visibility batch
    ///
    /// Geometry is always recorded; it only decides the section while idle.
    pub fn on_visibility(&mut self, batch: &[HeadingVisibility], now: Instant) -> Option<Activation> {
        for entry in batch {
            if self.order.iter().any(|id| *id == entry.id) {
                self.geometry.insert(
                    entry.id.clone(),
                    Geometry { intersecting: entry.intersecting, top: entry.top },
                );
            }
        }

        if let Some(settled) = self.tick(now) {
            return Some(settled);
        }

        if self.is_user_scrolling() {
            return None;
        }

        let resolved = self.resolve()?.to_string();
        self.activate(resolved, ActivationOrigin::Passive, true)
    }

    /// Explicit navigation to a section
    ///
    /// The section becomes current at once and the suppression window
    /// (re)starts. The panel is not scrolled while the content animates.
    pub fn navigate_to(&mut self, id: &str, now: Instant) -> Activation {
        let previous = self.current.replace(id.to_string());
        self.state = ObserverState::UserScrolling { until: now + self.suppression };
        tracing::debug!(section = id, "Explicit navigation");

        Activation {
            previous,
            current: id.to_string(),
            origin: ActivationOrigin::Explicit,
            scroll_panel: false,
        }
    }

    /// Close the suppression window if it has elapsed
    pub fn tick(&mut self, now: Instant) -> Option<Activation> {
        match self.state {
            ObserverState::UserScrolling { until } if now >= until => {
                self.state = ObserverState::Idle;
                let resolved = self.resolve()?.to_string();
                self.activate(resolved, ActivationOrigin::Settled, true)
            }
            _ => None,
        }
    }

    /// Topmost intersecting heading, ties going to document order
    fn resolve(&self) -> Option<&str> {
        self.order
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                let geometry = self.geometry.get(id)?;
                geometry.intersecting.then_some((geometry.top, index, id.as_str()))
            })
            .min_by_key(|&(top, index, _)| (top, index))
            .map(|(_, _, id)| id)
    }

    fn activate(
        &mut self,
        id: String,
        origin: ActivationOrigin,
        scroll_panel: bool,
    ) -> Option<Activation> {
        if self.current.as_deref() == Some(id.as_str()) {
            return None;
        }

        let previous = self.current.replace(id.clone());
        tracing::trace!(section = %id, ?origin, "Section activated");
        Some(Activation { previous, current: id, origin, scroll_panel })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn vis(id: &str, intersecting: bool, top: i64) -> HeadingVisibility {
        HeadingVisibility { id: id.into(), intersecting, top }
    }

    fn observer() -> SectionObserver {
        let mut o = SectionObserver::default();
        o.observe(["intro", "setup", "usage"]);
        o
    }

    #[test]
    fn passive_picks_topmost_intersecting() {
        let mut o = observer();
        let now = Instant::now();

        let a = o
            .on_visibility(&[vis("intro", false, -5), vis("setup", true, 8), vis("usage", true, 3)], now)
            .unwrap();

        assert_eq!(a.current, "usage");
        assert_eq!(a.origin, ActivationOrigin::Passive);
        assert!(a.scroll_panel);
    }

    #[test]
    fn ties_go_to_document_order() {
        let mut o = observer();
        let a = o
            .on_visibility(&[vis("usage", true, 2), vis("setup", true, 2)], Instant::now())
            .unwrap();
        assert_eq!(a.current, "setup");
    }

    #[test]
    fn nothing_intersecting_keeps_current() {
        let mut o = observer();
        let now = Instant::now();
        o.on_visibility(&[vis("setup", true, 0)], now);

        let a = o.on_visibility(&[vis("setup", false, -40)], now);
        assert!(a.is_none());
        assert_eq!(o.current(), Some("setup"));
    }

    #[test]
    fn unchanged_section_emits_nothing() {
        let mut o = observer();
        let now = Instant::now();
        assert!(o.on_visibility(&[vis("intro", true, 0)], now).is_some());
        assert!(o.on_visibility(&[vis("intro", true, 1)], now).is_none());
    }

    #[test]
    fn unregistered_headings_are_ignored() {
        let mut o = observer();
        assert!(o.on_visibility(&[vis("stranger", true, 0)], Instant::now()).is_none());
        assert_eq!(o.current(), None);
    }

    #[test]
    fn explicit_navigation_is_immediate_and_suppresses_passive() {
        let mut o = observer();
        let t0 = Instant::now();
        o.on_visibility(&[vis("intro", true, 0)], t0);

        let a = o.navigate_to("usage", t0);
        assert_eq!(a.previous.as_deref(), Some("intro"));
        assert_eq!(a.current, "usage");
        assert_eq!(a.origin, ActivationOrigin::Explicit);
        assert!(!a.scroll_panel);
        assert!(o.is_user_scrolling());

        let during = t0 + Duration::from_millis(300);
        assert!(o.on_visibility(&[vis("intro", false, -3), vis("setup", true, 0)], during).is_none());
        assert_eq!(o.current(), Some("usage"));
    }

    #[test]
    fn window_close_resolves_from_latest_geometry() {
        let mut o = observer();
        let t0 = Instant::now();
        o.navigate_to("usage", t0);

        // Animation overshoots slightly: setup ends up at the top
        o.on_visibility(&[vis("setup", true, 0), vis("usage", true, 4)], t0 + Duration::from_millis(500));

        let settled = o.tick(t0 + DEFAULT_SUPPRESSION).unwrap();
        assert_eq!(settled.current, "setup");
        assert_eq!(settled.origin, ActivationOrigin::Settled);
        assert!(settled.scroll_panel);
        assert_eq!(o.state(), ObserverState::Idle);
    }

    #[test]
    fn window_close_without_drift_is_silent() {
        let mut o = observer();
        let t0 = Instant::now();
        o.navigate_to("setup", t0);
        o.on_visibility(&[vis("setup", true, 0)], t0 + Duration::from_millis(100));

        assert!(o.tick(t0 + Duration::from_secs(1)).is_none());
        assert_eq!(o.current(), Some("setup"));
        assert!(!o.is_user_scrolling());
    }

    #[test]
    fn late_batch_closes_window_first() {
        let mut o = observer();
        let t0 = Instant::now();
        o.navigate_to("intro", t0);

        let a = o.on_visibility(&[vis("usage", true, 0)], t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(a.current, "usage");
        assert_eq!(a.origin, ActivationOrigin::Settled);
    }

    #[test]
    fn second_navigation_restarts_window() {
        let mut o = observer();
        let t0 = Instant::now();
        o.navigate_to("setup", t0);
        o.navigate_to("usage", t0 + Duration::from_millis(800));

        assert!(o.tick(t0 + Duration::from_millis(1000)).is_none());
        assert!(o.is_user_scrolling());
        assert_eq!(o.pending_deadline(), Some(t0 + Duration::from_millis(1700)));
    }

    #[test]
    fn reobserve_drops_stale_geometry() {
        let mut o = observer();
        let now = Instant::now();
        o.on_visibility(&[vis("setup", true, 0)], now);

        o.observe(["intro", "usage"]);
        o.navigate_to("intro", now);
        assert!(o.tick(now + Duration::from_secs(5)).is_none());
        assert_eq!(o.current(), Some("intro"));
    }

    #[test]
    fn measure_applies_margins() {
        let viewport = Viewport { offset: 10, height: 20, margin: 2 };
        let batch = measure(viewport, [("a", 5), ("b", 11), ("c", 12), ("d", 27), ("e", 28)]);

        let flags: Vec<_> = batch.iter().map(|v| (v.id.as_str(), v.intersecting, v.top)).collect();
        assert_eq!(
            flags,
            vec![("a", false, -7), ("b", false, -1), ("c", true, 0), ("d", true, 15), ("e", false, 16)]
        );
    }

    #[test]
    fn measure_ignores_margin_on_tiny_viewport() {
        let viewport = Viewport { offset: 0, height: 3, margin: 2 };
        let batch = measure(viewport, [("a", 0)]);
        assert!(batch[0].intersecting);
    }
}
