//! Background inactivity tracker.
//!
//! One task owns the [`TimeoutMachine`] and a single timer for its next
//! wakeup, so overlapping timers cannot exist. Callers talk to it through a
//! command channel; the phase is published on a `watch` channel. Dropping the
//! [`SessionTimeout`] handle aborts the task and every pending timer with it.

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, warn};

use crate::store::{ChangeKind, LocalStore, StoreChange, keys};

use super::SessionError;
use super::machine::{Phase, TimeoutEvent, TimeoutMachine, TimeoutSettings};

const COMMAND_BUFFER: usize = 64;

/// User interaction that counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    PointerMove,
    KeyPress,
    Scroll,
    Touch,
    Click,
}

#[derive(Debug)]
enum Command {
    Activity(Activity),
    Extend(oneshot::Sender<Result<(), SessionError>>),
    Logout(oneshot::Sender<bool>),
}

/// Handle to a running inactivity tracker.
#[derive(Debug)]
pub struct SessionTimeout {
    commands: mpsc::Sender<Command>,
    phase: watch::Receiver<Phase>,
    task: JoinHandle<()>,
}

impl SessionTimeout {
    /// Start tracking. Returns `None` if no auth token is stored, so
    /// anonymous visitors never get timers.
    #[must_use]
    pub fn spawn(store: LocalStore, settings: TimeoutSettings) -> Option<Self> {
        if !store.has_auth_token() {
            debug!("No auth token, session timeout not started");
            return None;
        }

        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let (phase_tx, phase) = watch::channel(Phase::Active);
        let changes = store.subscribe();

        let tracker = Tracker {
            machine: TimeoutMachine::new(settings, Instant::now()),
            store,
            commands: receiver,
            changes,
            phase: phase_tx,
        };
        let task = tokio::spawn(tracker.run());

        info!(
            timeout_secs = settings.timeout().as_secs(),
            warning_secs = settings.warning().as_secs(),
            "Session timeout started"
        );
        Some(Self {
            commands,
            phase,
            task,
        })
    }

    /// Report activity. Never blocks; bursts beyond the buffer are dropped,
    /// which the one-second throttle would have ignored anyway.
    pub fn record(&self, activity: Activity) {
        if let Err(e) = self.commands.try_send(Command::Activity(activity)) {
            debug!(error = %e, "Activity signal dropped");
        }
    }

    /// Keep the session alive from the warning.
    ///
    /// # Errors
    ///
    /// Returns `NotInWarning` outside the warning, or `Ended` once the
    /// tracker has stopped.
    pub async fn extend(&self) -> Result<(), SessionError> {
        let (respond_to, response) = oneshot::channel();
        self.commands
            .send(Command::Extend(respond_to))
            .await
            .map_err(|_| SessionError::Ended)?;
        response.await.map_err(|_| SessionError::Ended)?
    }

    /// Log out now. Returns `true` only for the call that ended the session.
    pub async fn logout(&self) -> bool {
        let (respond_to, response) = oneshot::channel();
        if self.commands.send(Command::Logout(respond_to)).await.is_err() {
            return false;
        }
        response.await.unwrap_or(false)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch phase changes; `LoggedOut` is the signal to navigate away.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }
}

impl Drop for SessionTimeout {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Tracker task
// =============================================================================

struct Tracker {
    machine: TimeoutMachine,
    store: LocalStore,
    commands: mpsc::Receiver<Command>,
    changes: broadcast::Receiver<StoreChange>,
    phase: watch::Sender<Phase>,
}

impl Tracker {
    #[instrument(name = "session_timeout", skip_all)]
    async fn run(mut self) {
        while let Some(wakeup) = self.machine.next_wakeup() {
            tokio::select! {
                () = sleep_until(wakeup) => {
                    for event in self.machine.poll(Instant::now()) {
                        match event {
                            TimeoutEvent::WarningStarted { remaining_seconds } => {
                                info!(remaining_seconds, "Session expiring soon");
                            }
                            TimeoutEvent::Tick { remaining_seconds } => {
                                debug!(remaining_seconds, "Session countdown");
                            }
                            TimeoutEvent::Expired => {
                                info!("Session expired after inactivity");
                                self.clear_token();
                            }
                        }
                    }
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        // Every handle is gone
                        break;
                    };
                    self.handle(command);
                }
                change = self.changes.recv() => {
                    self.on_store_change(change);
                }
            }

            self.publish();
        }

        debug!("Session timeout task finished");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Activity(activity) => {
                if self.machine.record_activity(Instant::now()) {
                    debug!(?activity, "Session timer reset");
                }
            }
            Command::Extend(respond_to) => {
                let result = self.machine.extend(Instant::now());
                if result.is_ok() {
                    info!("Session extended");
                }
                let _ = respond_to.send(result);
            }
            Command::Logout(respond_to) => {
                let first = self.machine.logout();
                if first {
                    info!("Session logged out");
                    self.clear_token();
                }
                let _ = respond_to.send(first);
            }
        }
    }

    fn on_store_change(&mut self, change: Result<StoreChange, broadcast::error::RecvError>) {
        match change {
            Ok(StoreChange {
                key: keys::AUTH_TOKEN,
                kind: ChangeKind::Removed,
            }) => {
                // Logged out elsewhere; nothing left to clear
                if self.machine.logout() {
                    info!("Auth token removed elsewhere, stopping session timeout");
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Session timeout missed store changes");
                if !self.store.has_auth_token() {
                    self.machine.logout();
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                // The store outlives this task, so this is unreachable in
                // practice; stop watching rather than spin
                self.machine.logout();
            }
        }
    }

    fn clear_token(&self) {
        match self.store.clear_auth_token() {
            Ok(true) => debug!("Auth token cleared"),
            Ok(false) => debug!("Auth token already absent"),
            Err(e) => error!(error = %e, "Failed to clear auth token"),
        }
    }

    fn publish(&self) {
        let phase = self.machine.phase();
        self.phase.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn logged_in_store() -> LocalStore {
        let store = LocalStore::in_memory();
        store.set_auth_token(&SecretString::from("tok")).unwrap();
        store
    }

    fn settings() -> TimeoutSettings {
        TimeoutSettings::from_durations(Duration::from_secs(60), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_no_token_no_tracker() {
        assert!(SessionTimeout::spawn(LocalStore::in_memory(), settings()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_then_logout() {
        let store = logged_in_store();
        let start = Instant::now();
        let tracker = SessionTimeout::spawn(store.clone(), settings()).unwrap();
        let mut phase = tracker.subscribe();

        phase
            .wait_for(|p| matches!(p, Phase::Warning { .. }))
            .await
            .unwrap();
        assert_eq!(Instant::now() - start, Duration::from_secs(55));
        assert!(store.has_auth_token());

        phase.wait_for(|p| *p == Phase::LoggedOut).await.unwrap();
        assert_eq!(Instant::now() - start, Duration::from_secs(60));
        assert!(!store.has_auth_token());
        assert!(!tracker.logout().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_ignored_during_warning_extend_resets() {
        let store = logged_in_store();
        let tracker = SessionTimeout::spawn(store.clone(), settings()).unwrap();
        let mut phase = tracker.subscribe();

        phase
            .wait_for(|p| matches!(p, Phase::Warning { .. }))
            .await
            .unwrap();

        tracker.record(Activity::KeyPress);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(tracker.phase(), Phase::Warning { .. }));

        tracker.extend().await.unwrap();
        assert_eq!(tracker.phase(), Phase::Active);
        assert_eq!(tracker.extend().await, Err(SessionError::NotInWarning));
        assert!(store.has_auth_token());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_logout_once() {
        let store = logged_in_store();
        let tracker = SessionTimeout::spawn(store.clone(), settings()).unwrap();

        assert!(tracker.logout().await);
        assert!(!store.has_auth_token());
        assert!(!tracker.logout().await);
        assert_eq!(tracker.extend().await, Err(SessionError::Ended));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timers() {
        let store = logged_in_store();
        let tracker = SessionTimeout::spawn(store.clone(), settings()).unwrap();
        drop(tracker);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(store.has_auth_token());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_logout_stops_tracker() {
        let store = logged_in_store();
        let tracker = SessionTimeout::spawn(store.clone(), settings()).unwrap();
        let mut phase = tracker.subscribe();

        store.clear_auth_token().unwrap();
        phase.wait_for(|p| *p == Phase::LoggedOut).await.unwrap();
    }
}
