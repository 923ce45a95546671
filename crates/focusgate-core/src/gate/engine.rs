//! Gate engine implementation.
//!
//! The gate engine is a wall-clock-based state machine. It has no timer or
//! thread of its own: every elapsed interval is derived from timestamp deltas
//! the next time someone observes the engine (a status poll or a tab event).
//!
//! ## State Transitions
//!
//! ```text
//! Locked -> Focusing -> Unlocked -> Locked
//! ```
//!
//! - `Locked -> Focusing` on [`GateEngine::start_focus_challenge`].
//! - `Focusing -> Unlocked` when a status query sees the focus requirement met.
//! - `Unlocked -> Locked` when the allowance has been used up. The allowance is
//!   only charged while the active tab is a visible blocked page.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = GateEngine::new();
//! engine.start_focus_challenge();
//! // Poll from the overlay:
//! let status = engine.get_status(); // may advance the mode
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::settings::Settings;
use super::tabs::{TabActivityTracker, TabId};
use crate::clock::{Clock, SystemClock};
use crate::events::{timestamp, Event};

/// Undrained events beyond this many push out the oldest.
pub const MAX_BUFFERED_EVENTS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Locked,
    Focusing,
    Unlocked,
}

/// Mode and counters, in memory only.
///
/// `remaining_focus_ms` is live in `Locked`/`Focusing`, `unlock_remaining_ms`
/// in `Unlocked`. While focusing, `remaining_focus_ms` is the value at
/// `focus_started_at`; the live value subtracts the time since then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    pub mode: Mode,
    pub remaining_focus_ms: u64,
    pub focus_started_at: Option<u64>,
    pub unlock_remaining_ms: u64,
    pub unlock_last_tick_at: Option<u64>,
}

impl GateState {
    fn locked(settings: &Settings) -> Self {
        Self {
            mode: Mode::Locked,
            remaining_focus_ms: settings.focus_required_ms(),
            focus_started_at: None,
            unlock_remaining_ms: 0,
            unlock_last_tick_at: None,
        }
    }
}

/// What the overlay and popup get back from a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub mode: Mode,
    pub remaining_focus_ms: u64,
    pub unlock_remaining_ms: u64,
}

/// Core gate engine.
///
/// One instance per process. Owns the mode state, the tab tracker and the
/// current settings.
#[derive(Debug)]
pub struct GateEngine<C: Clock = SystemClock> {
    clock: C,
    settings: Settings,
    state: GateState,
    tabs: TabActivityTracker,
    events: VecDeque<Event>,
}

impl GateEngine<SystemClock> {
    /// Create a locked engine with default settings on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for GateEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> GateEngine<C> {
    pub fn with_clock(clock: C) -> Self {
        let settings = Settings::default();
        Self {
            clock,
            state: GateState::locked(&settings),
            settings,
            tabs: TabActivityTracker::new(),
            events: VecDeque::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn tabs(&self) -> &TabActivityTracker {
        &self.tabs
    }

    /// Status as of now without moving the state machine.
    ///
    /// The focus countdown is derived live, but neither the focus completion
    /// nor allowance decay are applied. Use [`get_status`](Self::get_status)
    /// for the authoritative answer.
    pub fn snapshot(&self) -> GateStatus {
        self.status_at(self.clock.now_ms())
    }

    /// Events produced since the last drain, oldest first.
    ///
    /// At most [`MAX_BUFFERED_EVENTS`] are kept; an engine that is never
    /// drained loses its oldest events.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Reconcile with the clock, then report.
    ///
    /// This is not a pure read: a poll is what moves `Focusing` to `Unlocked`
    /// and what charges or expires the allowance.
    pub fn get_status(&mut self) -> GateStatus {
        let now = self.clock.now_ms();
        self.advance(now);
        self.status_at(now)
    }

    /// Reconcile with the clock without reporting.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        self.advance(now);
    }

    /// Begin a focus challenge. Only has an effect while `Locked`.
    ///
    /// A request that finds the gate in another mode only reconciles and
    /// reports, even if that reconciliation relocks the gate.
    pub fn start_focus_challenge(&mut self) -> GateStatus {
        let now = self.clock.now_ms();
        let was_locked = self.state.mode == Mode::Locked;
        self.advance(now);
        if !was_locked {
            debug!(mode = ?self.state.mode, "Focus challenge requested while not locked");
            return self.status_at(now);
        }

        let required_ms = self.settings.focus_required_ms();
        self.state = GateState {
            mode: Mode::Focusing,
            remaining_focus_ms: required_ms,
            focus_started_at: Some(now),
            unlock_remaining_ms: 0,
            unlock_last_tick_at: None,
        };
        info!(required_ms, "Focus challenge started");
        self.record(Event::FocusStarted {
            required_ms,
            at: timestamp(now),
        });
        self.status_at(now)
    }

    /// Replace the focus requirement and allowance.
    ///
    /// Both are floored to whole minutes, minimum one. A locked gate picks up
    /// the new requirement in full; a running challenge can only get shorter;
    /// an unlocked gate keeps its current allowance.
    pub fn apply_settings(&mut self, focus_minutes: f64, unlock_minutes: f64) {
        let now = self.clock.now_ms();
        self.settings = Settings::clamped(focus_minutes, unlock_minutes);
        let required_ms = self.settings.focus_required_ms();

        match self.state.mode {
            Mode::Locked => self.state.remaining_focus_ms = required_ms,
            Mode::Focusing => {
                self.state.remaining_focus_ms = self.state.remaining_focus_ms.min(required_ms);
            }
            Mode::Unlocked => {}
        }

        info!(
            focus_required_minutes = self.settings.focus_required_minutes,
            unlock_minutes = self.settings.unlock_minutes,
            mode = ?self.state.mode,
            "Settings applied"
        );
        self.record(Event::SettingsApplied {
            mode: self.state.mode,
            focus_required_ms: required_ms,
            unlock_allowance_ms: self.settings.unlock_allowance_ms(),
            at: timestamp(now),
        });
    }

    /// A tab gained focus.
    ///
    /// The interval up to now is settled against the previously active tab
    /// before the switch is recorded.
    pub fn set_active_tab(&mut self, tab: TabId) {
        let now = self.clock.now_ms();
        self.normalize(now);
        self.tabs.set_active_tab(tab);
        trace!(%tab, "Active tab changed");
    }

    /// A page reported whether it is a blocked domain and visible.
    pub fn report_tab_state(&mut self, tab: TabId, is_blocked: bool, is_visible: bool) {
        if self.tabs.is_active(tab) {
            let now = self.clock.now_ms();
            self.normalize(now);
        }
        self.tabs.report_tab_state(tab, is_blocked, is_visible);
        trace!(%tab, is_blocked, is_visible, "Tab state reported");
    }

    /// A tab was closed.
    pub fn remove_tab(&mut self, tab: TabId) {
        if self.tabs.is_active(tab) {
            let now = self.clock.now_ms();
            self.normalize(now);
        }
        self.tabs.remove_tab(tab);
        trace!(%tab, "Tab removed");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn record(&mut self, event: Event) {
        if self.events.len() == MAX_BUFFERED_EVENTS {
            self.events.pop_front();
            trace!("Event buffer full, dropped oldest event");
        }
        self.events.push_back(event);
    }

    fn advance(&mut self, now: u64) {
        self.normalize(now);
        if self.state.mode == Mode::Focusing && self.live_remaining_focus_ms(now) == 0 {
            self.complete_focus(now);
        }
    }

    /// Allowance decay checkpoint. No-op outside `Unlocked`.
    fn normalize(&mut self, now: u64) {
        if self.state.mode != Mode::Unlocked {
            return;
        }

        if let Some(last) = self.state.unlock_last_tick_at {
            let elapsed = now.saturating_sub(last);
            if self.tabs.is_active_tab_blocked_visible() {
                self.state.unlock_remaining_ms =
                    self.state.unlock_remaining_ms.saturating_sub(elapsed);
                trace!(
                    elapsed_ms = elapsed,
                    remaining_ms = self.state.unlock_remaining_ms,
                    "Allowance charged"
                );
            }
        }
        self.state.unlock_last_tick_at = Some(now);

        if self.state.unlock_remaining_ms == 0 {
            self.relock(now);
        }
    }

    fn complete_focus(&mut self, now: u64) {
        let allowance_ms = self.settings.unlock_allowance_ms();
        self.state = GateState {
            mode: Mode::Unlocked,
            remaining_focus_ms: 0,
            focus_started_at: None,
            unlock_remaining_ms: allowance_ms,
            unlock_last_tick_at: Some(now),
        };
        info!(allowance_ms, "Focus challenge completed, gate unlocked");
        self.record(Event::FocusCompleted {
            allowance_ms,
            at: timestamp(now),
        });
    }

    fn relock(&mut self, now: u64) {
        self.state = GateState::locked(&self.settings);
        info!("Viewing allowance used up, gate locked");
        self.record(Event::AllowanceExhausted {
            focus_required_ms: self.state.remaining_focus_ms,
            at: timestamp(now),
        });
    }

    fn live_remaining_focus_ms(&self, now: u64) -> u64 {
        match self.state.focus_started_at {
            Some(started) => self
                .state
                .remaining_focus_ms
                .saturating_sub(now.saturating_sub(started)),
            None => self.state.remaining_focus_ms,
        }
    }

    fn status_at(&self, now: u64) -> GateStatus {
        let remaining_focus_ms = match self.state.mode {
            Mode::Focusing => self.live_remaining_focus_ms(now),
            Mode::Locked | Mode::Unlocked => self.state.remaining_focus_ms,
        };
        let unlock_remaining_ms = match self.state.mode {
            Mode::Unlocked => self.state.unlock_remaining_ms,
            Mode::Locked | Mode::Focusing => 0,
        };
        GateStatus {
            mode: self.state.mode,
            remaining_focus_ms,
            unlock_remaining_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;

    const MINUTE: u64 = 60 * 1000;

    fn engine_at(start_ms: u64) -> (GateEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new(start_ms);
        (GateEngine::with_clock(clock.clone()), clock)
    }

    /// Drives a fresh engine through a completed challenge with the given
    /// minute settings and leaves the user on a visible blocked tab.
    fn unlocked(focus: f64, unlock: f64) -> (GateEngine<ManualClock>, ManualClock) {
        let (mut engine, clock) = engine_at(1_000_000);
        engine.apply_settings(focus, unlock);
        engine.start_focus_challenge();
        clock.advance(focus as u64 * MINUTE);
        assert_eq!(engine.get_status().mode, Mode::Unlocked);
        engine.set_active_tab(TabId(1));
        engine.report_tab_state(TabId(1), true, true);
        (engine, clock)
    }

    fn assert_invariants(engine: &GateEngine<ManualClock>) {
        let state = engine.state();
        let settings = engine.settings();
        assert!(state.focus_started_at.is_none() || state.unlock_last_tick_at.is_none());
        assert_eq!(state.focus_started_at.is_some(), state.mode == Mode::Focusing);
        if state.unlock_last_tick_at.is_some() {
            assert_eq!(state.mode, Mode::Unlocked);
        }
        if state.mode == Mode::Locked {
            assert_eq!(state.remaining_focus_ms, settings.focus_required_ms());
            assert_eq!(state.unlock_remaining_ms, 0);
        }
        if state.mode == Mode::Unlocked {
            // The allowance granted at unlock may exceed a later, smaller setting.
            assert!(state.unlock_remaining_ms > 0);
        }
    }

    #[test]
    fn starts_locked_with_default_requirement() {
        let (mut engine, _clock) = engine_at(0);
        let status = engine.get_status();
        assert_eq!(status.mode, Mode::Locked);
        assert_eq!(status.remaining_focus_ms, 60 * MINUTE);
        assert_eq!(status.unlock_remaining_ms, 0);
        assert_invariants(&engine);
    }

    #[test]
    fn start_moves_to_focusing_with_full_requirement() {
        let (mut engine, _clock) = engine_at(5_000);
        let status = engine.start_focus_challenge();
        assert_eq!(status.mode, Mode::Focusing);
        assert_eq!(status.remaining_focus_ms, engine.settings().focus_required_ms());
        assert_eq!(engine.state().focus_started_at, Some(5_000));
        assert!(matches!(
            engine.drain_events().as_slice(),
            [Event::FocusStarted { required_ms, .. }] if *required_ms == 60 * MINUTE
        ));
    }

    #[test]
    fn start_is_noop_while_focusing() {
        let (mut engine, clock) = engine_at(0);
        engine.start_focus_challenge();
        clock.advance(10 * MINUTE);
        let before = engine.get_status();
        let again = engine.start_focus_challenge();
        assert_eq!(before, again);
        assert_eq!(engine.state().focus_started_at, Some(0));
    }

    #[test]
    fn start_is_noop_while_unlocked() {
        let (mut engine, _clock) = unlocked(1.0, 5.0);
        let before = engine.get_status();
        let again = engine.start_focus_challenge();
        assert_eq!(before, again);
        assert_eq!(again.mode, Mode::Unlocked);
    }

    #[test]
    fn start_after_unobserved_expiry_only_relocks() {
        let (mut engine, clock) = unlocked(1.0, 1.0);
        clock.advance(2 * MINUTE);
        assert_eq!(engine.state().mode, Mode::Unlocked);
        engine.drain_events();

        let status = engine.start_focus_challenge();
        assert_eq!(status.mode, Mode::Locked);
        assert_eq!(status.remaining_focus_ms, MINUTE);
        assert_eq!(engine.state().focus_started_at, None);
        assert!(matches!(
            engine.drain_events().as_slice(),
            [Event::AllowanceExhausted { .. }]
        ));

        // The next request starts a challenge as usual.
        assert_eq!(engine.start_focus_challenge().mode, Mode::Focusing);
        assert_invariants(&engine);
    }

    #[test]
    fn undrained_events_are_capped() {
        let (mut engine, _clock) = engine_at(0);
        for i in 0..(MAX_BUFFERED_EVENTS + 50) {
            engine.apply_settings(1.0 + i as f64, 5.0);
        }
        let events = engine.drain_events();
        assert_eq!(events.len(), MAX_BUFFERED_EVENTS);
        assert!(matches!(
            events.last(),
            Some(Event::SettingsApplied { focus_required_ms, .. })
                if *focus_required_ms == (MAX_BUFFERED_EVENTS as u64 + 50) * MINUTE
        ));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn focusing_counts_down_live() {
        let (mut engine, clock) = engine_at(0);
        engine.apply_settings(25.0, 5.0);
        engine.start_focus_challenge();
        clock.advance(10 * MINUTE + 1);
        let status = engine.get_status();
        assert_eq!(status.mode, Mode::Focusing);
        assert_eq!(status.remaining_focus_ms, 15 * MINUTE - 1);
        // Checkpoint is not moved by polling.
        assert_eq!(engine.state().remaining_focus_ms, 25 * MINUTE);
    }

    #[test]
    fn completing_requirement_grants_full_allowance() {
        let (mut engine, clock) = engine_at(0);
        engine.apply_settings(2.0, 10.0);
        engine.start_focus_challenge();
        clock.advance(2 * MINUTE);

        let status = engine.get_status();
        assert_eq!(status.mode, Mode::Unlocked);
        assert_eq!(status.remaining_focus_ms, 0);
        assert_eq!(status.unlock_remaining_ms, 10 * MINUTE);
        assert_eq!(engine.state().unlock_last_tick_at, Some(2 * MINUTE));
        assert_eq!(engine.state().focus_started_at, None);
        assert_invariants(&engine);
    }

    #[test]
    fn late_poll_still_unlocks_with_fresh_allowance() {
        let (mut engine, clock) = engine_at(0);
        engine.apply_settings(1.0, 3.0);
        engine.start_focus_challenge();
        clock.advance(8 * 60 * MINUTE);
        let status = engine.get_status();
        assert_eq!(status.mode, Mode::Unlocked);
        assert_eq!(status.unlock_remaining_ms, 3 * MINUTE);
    }

    #[test]
    fn allowance_only_decays_while_viewed() {
        let (mut engine, clock) = unlocked(1.0, 5.0);

        clock.advance(3 * MINUTE);
        engine.set_active_tab(TabId(2));
        clock.advance(10 * MINUTE);

        let status = engine.get_status();
        assert_eq!(status.mode, Mode::Unlocked);
        assert_eq!(status.unlock_remaining_ms, 2 * MINUTE);
    }

    #[test]
    fn hidden_blocked_tab_is_not_charged() {
        let (mut engine, clock) = unlocked(1.0, 5.0);
        clock.advance(MINUTE);
        engine.report_tab_state(TabId(1), true, false);
        clock.advance(30 * MINUTE);
        engine.report_tab_state(TabId(1), true, true);
        clock.advance(MINUTE);
        assert_eq!(engine.get_status().unlock_remaining_ms, 3 * MINUTE);
    }

    #[test]
    fn exhausted_allowance_relocks_with_current_requirement() {
        let (mut engine, clock) = unlocked(1.0, 1.0);
        engine.apply_settings(45.0, 1.0);
        assert_eq!(engine.mode(), Mode::Unlocked);

        clock.advance(MINUTE + 250);
        let status = engine.get_status();
        assert_eq!(status.mode, Mode::Locked);
        assert_eq!(status.remaining_focus_ms, 45 * MINUTE);
        assert_eq!(status.unlock_remaining_ms, 0);
        assert_eq!(engine.state().unlock_last_tick_at, None);
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, Event::AllowanceExhausted { .. })));
        assert_invariants(&engine);
    }

    #[test]
    fn closing_viewed_tab_settles_then_stops_charging() {
        let (mut engine, clock) = unlocked(1.0, 5.0);
        clock.advance(MINUTE);
        engine.remove_tab(TabId(1));
        clock.advance(20 * MINUTE);
        assert_eq!(engine.get_status().unlock_remaining_ms, 4 * MINUTE);
        assert_eq!(engine.tabs().active_tab(), None);
    }

    #[test]
    fn tab_events_alone_can_relock() {
        let (mut engine, clock) = unlocked(1.0, 2.0);
        clock.advance(2 * MINUTE);
        engine.set_active_tab(TabId(9));
        assert_eq!(engine.mode(), Mode::Locked);
    }

    #[test]
    fn settings_in_locked_reset_requirement() {
        let (mut engine, _clock) = engine_at(0);
        engine.apply_settings(30.0, 5.0);
        assert_eq!(engine.get_status().remaining_focus_ms, 30 * MINUTE);
        engine.apply_settings(90.0, 5.0);
        assert_eq!(engine.get_status().remaining_focus_ms, 90 * MINUTE);
    }

    #[test]
    fn settings_in_focusing_never_extend_remaining() {
        let (mut engine, clock) = engine_at(0);
        engine.apply_settings(30.0, 5.0);
        engine.start_focus_challenge();
        clock.advance(5 * MINUTE);

        engine.apply_settings(120.0, 5.0);
        assert_eq!(engine.state().remaining_focus_ms, 30 * MINUTE);
        assert_eq!(engine.get_status().remaining_focus_ms, 25 * MINUTE);

        engine.apply_settings(10.0, 5.0);
        assert_eq!(engine.state().remaining_focus_ms, 10 * MINUTE);
        assert_eq!(engine.get_status().remaining_focus_ms, 5 * MINUTE);
    }

    #[test]
    fn settings_shrinking_below_elapsed_unlocks_on_next_poll() {
        let (mut engine, clock) = engine_at(0);
        engine.apply_settings(30.0, 5.0);
        engine.start_focus_challenge();
        clock.advance(20 * MINUTE);
        engine.apply_settings(15.0, 5.0);
        assert_eq!(engine.get_status().mode, Mode::Unlocked);
    }

    #[test]
    fn settings_in_unlocked_keep_current_allowance() {
        let (mut engine, clock) = unlocked(1.0, 10.0);
        engine.apply_settings(1.0, 2.0);
        clock.advance(3 * MINUTE);
        let status = engine.get_status();
        assert_eq!(status.mode, Mode::Unlocked);
        assert_eq!(status.unlock_remaining_ms, 7 * MINUTE);
    }

    #[test]
    fn invalid_settings_clamp_to_one_minute() {
        let (mut engine, _clock) = engine_at(0);
        engine.apply_settings(-4.0, f64::NAN);
        assert_eq!(engine.settings(), Settings::clamped(1.0, 1.0));
        assert_eq!(engine.get_status().remaining_focus_ms, MINUTE);
    }

    #[test]
    fn repeated_status_without_time_is_stable() {
        let (mut engine, clock) = unlocked(1.0, 5.0);
        clock.advance(MINUTE);
        let first = engine.get_status();
        let second = engine.get_status();
        assert_eq!(first, second);
        assert_eq!(first, engine.snapshot());
    }

    #[test]
    fn clock_going_backwards_charges_nothing() {
        let (mut engine, clock) = unlocked(1.0, 5.0);
        clock.set(0);
        assert_eq!(engine.get_status().unlock_remaining_ms, 5 * MINUTE);
    }

    #[test]
    fn status_serializes_in_camel_case() {
        let (mut engine, _clock) = engine_at(0);
        let json = serde_json::to_value(engine.get_status()).unwrap();
        assert_eq!(json["mode"], "locked");
        assert_eq!(json["remainingFocusMs"], 60 * MINUTE);
        assert_eq!(json["unlockRemainingMs"], 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Advance(u64),
        Status,
        Start,
        Activate(u32),
        Report(u32, bool, bool),
        Remove(u32),
        Settings(f64, f64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..5 * MINUTE).prop_map(Op::Advance),
            Just(Op::Status),
            Just(Op::Start),
            (0u32..4).prop_map(Op::Activate),
            (0u32..4, any::<bool>(), any::<bool>()).prop_map(|(t, b, v)| Op::Report(t, b, v)),
            (0u32..4).prop_map(Op::Remove),
            (-2.0f64..6.0, -2.0f64..6.0).prop_map(|(f, u)| Op::Settings(f, u)),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_sequence(ops in proptest::collection::vec(op(), 1..80)) {
            let (mut engine, clock) = engine_at(0);
            for op in ops {
                let before = engine.state().clone();
                match op {
                    Op::Advance(ms) => clock.advance(ms),
                    Op::Status => { engine.get_status(); }
                    Op::Start => { engine.start_focus_challenge(); }
                    Op::Activate(t) => engine.set_active_tab(TabId(t)),
                    Op::Report(t, b, v) => engine.report_tab_state(TabId(t), b, v),
                    Op::Remove(t) => engine.remove_tab(TabId(t)),
                    Op::Settings(f, u) => {
                        engine.apply_settings(f, u);
                        if before.mode == Mode::Focusing {
                            prop_assert!(engine.state().remaining_focus_ms <= before.remaining_focus_ms);
                        }
                    }
                }
                assert_invariants(&engine);
            }
        }
    }
}
