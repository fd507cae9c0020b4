use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Outcome of reserving a slot in the trailing frequency window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrequencyState {
    /// A release was recorded at `at`; `prior` releases were already in the
    /// window.
    Reserved { at: DateTime<Utc>, prior: usize },
    /// The window already holds `released` releases; nothing was recorded.
    Exhausted { released: usize },
}

/// Outcome of asking for an emergency override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideGrant {
    /// A new override window was opened.
    Granted { until: DateTime<Utc> },
    /// An earlier override window is still open.
    Active { until: DateTime<Utc> },
    /// The previous grant is too recent.
    CoolingDown { until: DateTime<Utc> },
}

#[derive(Default)]
struct CounterState {
    released: VecDeque<DateTime<Utc>>,
    override_until: Option<DateTime<Utc>>,
    last_grant: Option<DateTime<Utc>>,
    last_major_action: Option<DateTime<Utc>>,
}

impl CounterState {
    fn prune_released(&mut self, cutoff: DateTime<Utc>) {
        while self.released.front().is_some_and(|t| *t <= cutoff) {
            self.released.pop_front();
        }
    }

    fn insert_release(&mut self, at: DateTime<Utc>) {
        let position = self.released.partition_point(|t| *t <= at);
        self.released.insert(position, at);
    }

    fn expire_override(&mut self, now: DateTime<Utc>) {
        if self.override_until.is_some_and(|until| until <= now) {
            self.override_until = None;
        }
    }
}

/// Shared frequency and emergency-override state for the restraint stage.
///
/// Cloning yields another handle onto the same state, so several engines
/// (or a test and its engine) can observe one set of counters.
#[derive(Clone, Default)]
pub struct RestraintCounters {
    state: Arc<Mutex<CounterState>>,
}

impl RestraintCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Released actions in the trailing `window`. Older entries are dropped.
    pub fn released_within(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let mut state = self.state.lock();
        state.prune_released(now - window);
        state.released.len()
    }

    pub fn record_release(&self, at: DateTime<Utc>) {
        self.state.lock().insert_release(at);
    }

    /// Count the trailing window and, below `upper`, record a release at
    /// `now`. Count and record happen under one lock, so concurrent callers
    /// can never jointly exceed `upper`.
    pub fn try_reserve_release(
        &self,
        now: DateTime<Utc>,
        window: Duration,
        upper: usize,
    ) -> FrequencyState {
        let mut state = self.state.lock();
        state.prune_released(now - window);
        let released = state.released.len();
        if released >= upper {
            return FrequencyState::Exhausted { released };
        }
        state.insert_release(now);
        FrequencyState::Reserved {
            at: now,
            prior: released,
        }
    }

    /// Drop one release recorded at `at`, e.g. when its verdict could not be
    /// audited.
    pub fn cancel_release(&self, at: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        match state.released.iter().position(|t| *t == at) {
            Some(index) => {
                state.released.remove(index);
                true
            }
            None => false,
        }
    }

    /// Open an override window unless one is active or the cooldown since the
    /// last grant has not elapsed. Check and grant happen under one lock.
    pub fn request_override(
        &self,
        now: DateTime<Utc>,
        duration: Duration,
        cooldown: Duration,
    ) -> OverrideGrant {
        let mut state = self.state.lock();
        state.expire_override(now);
        if let Some(until) = state.override_until {
            return OverrideGrant::Active { until };
        }
        if let Some(last) = state.last_grant {
            let ready = last + cooldown;
            if ready > now {
                return OverrideGrant::CoolingDown { until: ready };
            }
        }
        let until = now + duration;
        state.override_until = Some(until);
        state.last_grant = Some(now);
        OverrideGrant::Granted { until }
    }

    /// Expiry of the active override, if any. Expired windows are cleared.
    pub fn override_active(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut state = self.state.lock();
        state.expire_override(now);
        state.override_until
    }

    /// Close the override window. The cooldown still runs from the grant.
    pub fn deactivate_override(&self) -> bool {
        self.state.lock().override_until.take().is_some()
    }

    pub fn note_major_action(&self, at: DateTime<Utc>) {
        let mut state = self.state.lock();
        if state.last_major_action.map_or(true, |prev| at > prev) {
            state.last_major_action = Some(at);
        }
    }

    pub fn last_major_action(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_major_action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn releases_age_out_of_the_window() {
        let counters = RestraintCounters::new();
        for i in 0..5 {
            counters.record_release(t0() + Duration::minutes(i * 20));
        }
        let now = t0() + Duration::minutes(80);
        // releases at 40, 60 and 80 minutes remain
        assert_eq!(counters.released_within(now, Duration::hours(1)), 3);
        assert_eq!(
            counters.released_within(now + Duration::hours(2), Duration::hours(1)),
            0
        );
    }

    #[test]
    fn reservation_stops_at_the_cap() {
        let counters = RestraintCounters::new();
        let window = Duration::hours(1);
        for i in 0..3 {
            assert_eq!(
                counters.try_reserve_release(t0(), window, 3),
                FrequencyState::Reserved { at: t0(), prior: i }
            );
        }
        assert_eq!(
            counters.try_reserve_release(t0(), window, 3),
            FrequencyState::Exhausted { released: 3 }
        );

        assert!(counters.cancel_release(t0()));
        assert!(matches!(
            counters.try_reserve_release(t0(), window, 3),
            FrequencyState::Reserved { prior: 2, .. }
        ));
        assert!(!counters.cancel_release(t0() - Duration::minutes(1)));
    }

    #[test]
    fn concurrent_reservations_never_exceed_the_cap() {
        let counters = RestraintCounters::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| {
                            matches!(
                                counters.try_reserve_release(t0(), Duration::hours(1), 20),
                                FrequencyState::Reserved { .. }
                            )
                        })
                        .count()
                })
            })
            .collect();
        let reserved: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(reserved, 20);
        assert_eq!(counters.released_within(t0(), Duration::hours(1)), 20);
    }

    #[test]
    fn override_grant_active_then_cooldown() {
        let counters = RestraintCounters::new();
        let duration = Duration::minutes(15);
        let cooldown = Duration::hours(1);

        let granted = counters.request_override(t0(), duration, cooldown);
        assert_eq!(
            granted,
            OverrideGrant::Granted {
                until: t0() + duration
            }
        );
        assert!(matches!(
            counters.request_override(t0() + Duration::minutes(5), duration, cooldown),
            OverrideGrant::Active { .. }
        ));

        // expired lazily, cooldown still running
        let later = t0() + Duration::minutes(30);
        assert_eq!(counters.override_active(later), None);
        assert_eq!(
            counters.request_override(later, duration, cooldown),
            OverrideGrant::CoolingDown {
                until: t0() + cooldown
            }
        );

        assert!(matches!(
            counters.request_override(t0() + Duration::minutes(61), duration, cooldown),
            OverrideGrant::Granted { .. }
        ));
    }

    #[test]
    fn manual_deactivation_keeps_cooldown() {
        let counters = RestraintCounters::new();
        counters.request_override(t0(), Duration::minutes(15), Duration::hours(1));
        assert!(counters.deactivate_override());
        assert!(!counters.deactivate_override());
        assert_eq!(counters.override_active(t0()), None);
        assert!(matches!(
            counters.request_override(t0(), Duration::minutes(15), Duration::hours(1)),
            OverrideGrant::CoolingDown { .. }
        ));
    }

    #[test]
    fn clones_share_state() {
        let counters = RestraintCounters::new();
        let other = counters.clone();
        other.record_release(t0());
        other.note_major_action(t0());
        assert_eq!(counters.released_within(t0(), Duration::hours(1)), 1);
        assert_eq!(counters.last_major_action(), Some(t0()));
    }
}
