//! Deterministic inactivity state machine.
//!
//! Time is passed in, never read, so every transition can be tested with
//! plain instants. The async tracker in [`super::timeout`] drives it from
//! timers and activity signals.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::SessionConfig;

use super::SessionError;

/// Minimum spacing between two activity-driven resets.
pub const ACTIVITY_THROTTLE: Duration = Duration::from_secs(1);

const TICK: Duration = Duration::from_secs(1);

/// Validated timeout and warning lead time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSettings {
    timeout: Duration,
    warning: Duration,
}

impl TimeoutSettings {
    /// Settings in minutes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSettings` unless `0 < warning < timeout`.
    pub fn new(timeout_minutes: u64, warning_minutes: u64) -> Result<Self, SessionError> {
        Self::from_durations(
            Duration::from_secs(timeout_minutes.saturating_mul(60)),
            Duration::from_secs(warning_minutes.saturating_mul(60)),
        )
    }

    /// Settings from durations, rounded down to whole seconds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSettings` unless `0 < warning < timeout`.
    pub fn from_durations(timeout: Duration, warning: Duration) -> Result<Self, SessionError> {
        let timeout = Duration::from_secs(timeout.as_secs());
        let warning = Duration::from_secs(warning.as_secs());
        if warning.is_zero() || warning >= timeout {
            return Err(SessionError::InvalidSettings(format!(
                "warning ({}s) must be greater than zero and less than the timeout ({}s)",
                warning.as_secs(),
                timeout.as_secs()
            )));
        }
        Ok(Self { timeout, warning })
    }

    /// Total inactivity period.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Warning lead time.
    #[must_use]
    pub const fn warning(&self) -> Duration {
        self.warning
    }

    /// Time from the last reset until the warning appears.
    #[must_use]
    pub fn warning_after(&self) -> Duration {
        self.timeout.saturating_sub(self.warning)
    }
}

impl TryFrom<SessionConfig> for TimeoutSettings {
    type Error = SessionError;

    fn try_from(config: SessionConfig) -> Result<Self, Self::Error> {
        Self::new(config.timeout_minutes, config.warning_minutes)
    }
}

/// Externally visible phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Warning { remaining_seconds: u64 },
    LoggedOut,
}

/// Something the host should react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutEvent {
    /// Show the warning with this many seconds left.
    WarningStarted { remaining_seconds: u64 },
    /// Countdown update.
    Tick { remaining_seconds: u64 },
    /// Countdown reached zero; the session is over.
    Expired,
}

/// Inactivity timer with a warning countdown.
#[derive(Debug, Clone)]
pub struct TimeoutMachine {
    settings: TimeoutSettings,
    phase: Phase,
    last_reset: Instant,
    deadline: Instant,
    next_tick: Option<Instant>,
}

impl TimeoutMachine {
    /// Start `Active` at `now`.
    #[must_use]
    pub fn new(settings: TimeoutSettings, now: Instant) -> Self {
        Self {
            settings,
            phase: Phase::Active,
            last_reset: now,
            deadline: now + settings.timeout,
            next_tick: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// When the session ends unless reset. `None` once logged out.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::LoggedOut => None,
            Phase::Active | Phase::Warning { .. } => Some(self.deadline),
        }
    }

    /// When [`poll`](Self::poll) next has something to do. `None` once logged out.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Instant> {
        match self.phase {
            Phase::Active => Some(self.deadline - self.settings.warning),
            Phase::Warning { .. } => self.next_tick,
            Phase::LoggedOut => None,
        }
    }

    /// Qualifying user activity. Resets the timer at most once per
    /// [`ACTIVITY_THROTTLE`]; ignored outside `Active`.
    ///
    /// Returns whether the timer was reset.
    pub fn record_activity(&mut self, now: Instant) -> bool {
        if self.phase != Phase::Active
            || now.saturating_duration_since(self.last_reset) < ACTIVITY_THROTTLE
        {
            return false;
        }
        self.reset(now);
        true
    }

    /// Explicit "keep me logged in" from the warning.
    ///
    /// # Errors
    ///
    /// Returns `NotInWarning` from any other phase.
    pub fn extend(&mut self, now: Instant) -> Result<(), SessionError> {
        if !matches!(self.phase, Phase::Warning { .. }) {
            return Err(SessionError::NotInWarning);
        }
        self.reset(now);
        Ok(())
    }

    /// End the session. Returns `true` only the first time.
    pub fn logout(&mut self) -> bool {
        if self.phase == Phase::LoggedOut {
            return false;
        }
        self.phase = Phase::LoggedOut;
        self.next_tick = None;
        true
    }

    /// Advance to `now`, returning every event that became due, in order.
    pub fn poll(&mut self, now: Instant) -> Vec<TimeoutEvent> {
        let mut events = Vec::new();

        if self.phase == Phase::Active {
            let warning_at = self.deadline - self.settings.warning;
            if now < warning_at {
                return events;
            }
            let remaining_seconds = self.settings.warning.as_secs();
            self.phase = Phase::Warning { remaining_seconds };
            self.next_tick = Some(warning_at + TICK);
            events.push(TimeoutEvent::WarningStarted { remaining_seconds });
        }

        while let (Phase::Warning { remaining_seconds }, Some(tick_at)) =
            (self.phase, self.next_tick)
        {
            if now < tick_at {
                break;
            }
            let remaining_seconds = remaining_seconds.saturating_sub(1);
            events.push(TimeoutEvent::Tick { remaining_seconds });

            if remaining_seconds == 0 {
                self.logout();
                events.push(TimeoutEvent::Expired);
            } else {
                self.phase = Phase::Warning { remaining_seconds };
                self.next_tick = Some(tick_at + TICK);
            }
        }

        events
    }

    fn reset(&mut self, now: Instant) {
        self.phase = Phase::Active;
        self.last_reset = now;
        self.deadline = now + self.settings.timeout;
        self.next_tick = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn machine() -> (TimeoutMachine, Instant) {
        let start = Instant::now();
        let settings = TimeoutSettings::from_durations(secs(60), secs(10)).unwrap();
        (TimeoutMachine::new(settings, start), start)
    }

    #[test]
    fn test_settings_validation() {
        assert!(TimeoutSettings::new(30, 2).is_ok());
        assert!(TimeoutSettings::new(2, 2).is_err());
        assert!(TimeoutSettings::new(2, 3).is_err());
        assert!(TimeoutSettings::new(2, 0).is_err());
        assert_eq!(TimeoutSettings::new(30, 2).unwrap().warning_after(), secs(28 * 60));
    }

    #[test]
    fn test_activity_throttled() {
        let (mut m, start) = machine();
        assert!(!m.record_activity(start + Duration::from_millis(500)));
        assert_eq!(m.deadline(), Some(start + secs(60)));

        assert!(m.record_activity(start + secs(1)));
        assert_eq!(m.deadline(), Some(start + secs(61)));

        // Rapid bursts move the deadline at most once per second
        let mut previous = m.deadline().unwrap();
        for ms in (1_100..5_000).step_by(100) {
            let now = start + Duration::from_millis(ms);
            m.record_activity(now);
            let deadline = m.deadline().unwrap();
            assert!(deadline >= previous);
            assert!(deadline + ACTIVITY_THROTTLE > now + secs(60));
            previous = deadline;
        }
    }

    #[test]
    fn test_warning_starts_and_ignores_activity() {
        let (mut m, start) = machine();
        assert!(m.poll(start + secs(49)).is_empty());

        let events = m.poll(start + secs(50));
        assert_eq!(
            events,
            vec![TimeoutEvent::WarningStarted {
                remaining_seconds: 10
            }]
        );
        let deadline = m.deadline();

        assert!(!m.record_activity(start + secs(52)));
        assert_eq!(m.deadline(), deadline);
        assert!(matches!(m.phase(), Phase::Warning { .. }));
    }

    #[test]
    fn test_countdown_logs_out_exactly_once() {
        let (mut m, start) = machine();
        m.poll(start + secs(50));

        let mut expired = 0;
        let mut last_remaining = 10;
        for tick in 1..=10 {
            for event in m.poll(start + secs(50 + tick)) {
                match event {
                    TimeoutEvent::Tick { remaining_seconds } => {
                        assert_eq!(remaining_seconds, last_remaining - 1);
                        last_remaining = remaining_seconds;
                    }
                    TimeoutEvent::Expired => expired += 1,
                    TimeoutEvent::WarningStarted { .. } => panic!("warning restarted"),
                }
            }
        }
        assert_eq!(expired, 1);
        assert_eq!(m.phase(), Phase::LoggedOut);
        assert!(m.poll(start + secs(100)).is_empty());
        assert!(!m.logout());
        assert_eq!(m.next_wakeup(), None);
    }

    #[test]
    fn test_late_poll_catches_up_in_order() {
        let (mut m, start) = machine();
        let events = m.poll(start + secs(75));
        assert_eq!(
            events.first(),
            Some(&TimeoutEvent::WarningStarted {
                remaining_seconds: 10
            })
        );
        assert_eq!(events.last(), Some(&TimeoutEvent::Expired));
        assert_eq!(events.len(), 12);
    }

    #[test]
    fn test_extend_only_from_warning() {
        let (mut m, start) = machine();
        assert!(matches!(
            m.extend(start + secs(5)),
            Err(SessionError::NotInWarning)
        ));

        m.poll(start + secs(50));
        m.poll(start + secs(53));
        m.extend(start + secs(53)).unwrap();
        assert_eq!(m.phase(), Phase::Active);
        assert_eq!(m.deadline(), Some(start + secs(113)));
        assert_eq!(m.next_wakeup(), Some(start + secs(53) + m.settings.warning_after()));
    }

    #[test]
    fn test_logout_from_any_state_once() {
        let (mut m, _) = machine();
        assert!(m.logout());
        assert!(!m.logout());
        assert_eq!(m.deadline(), None);
    }
}
