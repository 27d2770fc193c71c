use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::scheduler::Ticker;

/// Replies stop once this many transmissions are outstanding.
pub const QUOTA_CEILING: u32 = 16;
/// The cooldown notice goes out once this many are outstanding.
pub const COOLDOWN_THRESHOLD: u32 = 11;
pub const DECAY_PERIOD: Duration = Duration::from_secs(180);
pub const COOLDOWN_RESET_PERIOD: Duration = Duration::from_secs(240);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DutyCycleState {
    pub transmission_count: u32,
    pub cooldown_active: bool,
}

/// Outcome of checking the counter against the cooldown threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    Below,
    /// Threshold crossed and no notice sent yet this cooldown period.
    EnteringCooldown,
    CoolingDown,
}

/// Rolling transmission quota shared by the message handler and the decay
/// timers. All mutation goes through the lock.
pub struct DutyCycleGuard {
    enforced: bool,
    state: Mutex<DutyCycleState>,
}

impl DutyCycleGuard {
    pub fn new(enforced: bool) -> Self {
        Self {
            enforced,
            state: Mutex::new(DutyCycleState::default()),
        }
    }

    pub fn enforced(&self) -> bool {
        self.enforced
    }

    pub fn snapshot(&self) -> DutyCycleState {
        *self.state.lock()
    }

    pub fn allows_reply(&self) -> bool {
        !self.enforced || self.state.lock().transmission_count < QUOTA_CEILING
    }

    /// Counts one dispatched command, however many messages it expands into,
    /// if the quota still has room. Check and increment share one lock.
    pub fn try_record(&self) -> bool {
        let mut state = self.state.lock();
        if self.enforced && state.transmission_count >= QUOTA_CEILING {
            return false;
        }
        state.transmission_count = state.transmission_count.saturating_add(1);
        true
    }

    /// Checks the threshold, arming the cooldown flag the first time it is
    /// crossed so the notice is only sent once per cooldown period.
    pub fn check_threshold(&self) -> Threshold {
        if !self.enforced {
            return Threshold::Below;
        }
        let mut state = self.state.lock();
        if state.transmission_count < COOLDOWN_THRESHOLD {
            Threshold::Below
        } else if state.cooldown_active {
            Threshold::CoolingDown
        } else {
            state.cooldown_active = true;
            Threshold::EnteringCooldown
        }
    }

    pub fn decay(&self) -> u32 {
        let mut state = self.state.lock();
        state.transmission_count = state.transmission_count.saturating_sub(1);
        state.transmission_count
    }

    pub fn clear_cooldown(&self) {
        self.state.lock().cooldown_active = false;
    }

    /// Starts the two recurring resets. They run until the returned tickers
    /// are dropped.
    pub fn spawn_timers(self: &Arc<Self>) -> std::io::Result<(Ticker, Ticker)> {
        let guard = Arc::clone(self);
        let decay = Ticker::spawn("duty-decay", DECAY_PERIOD, false, move || {
            let count = guard.decay();
            log::info!("Reducing transmission count {count}");
        })?;

        let guard = Arc::clone(self);
        let cooldown = Ticker::spawn("duty-cooldown", COOLDOWN_RESET_PERIOD, false, move || {
            guard.clear_cooldown();
            log::info!("Cooldown Disabled.");
        })?;
        Ok((decay, cooldown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_sixteen_commands_exhaust_quota() {
        let guard = DutyCycleGuard::new(true);
        let mut notices = 0;
        for _ in 0..QUOTA_CEILING {
            assert!(guard.allows_reply());
            guard.try_record();
            if guard.check_threshold() == Threshold::EnteringCooldown {
                notices += 1;
            }
        }
        assert!(!guard.allows_reply());
        assert_eq!(notices, 1);
    }

    #[test]
    fn test_notice_fires_at_eleven() {
        let guard = DutyCycleGuard::new(true);
        for _ in 0..10 {
            guard.try_record();
            assert_eq!(guard.check_threshold(), Threshold::Below);
        }
        guard.try_record();
        assert_eq!(guard.check_threshold(), Threshold::EnteringCooldown);
        assert_eq!(guard.check_threshold(), Threshold::CoolingDown);

        guard.clear_cooldown();
        assert_eq!(guard.check_threshold(), Threshold::EnteringCooldown);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let guard = DutyCycleGuard::new(true);
        guard.try_record();
        assert_eq!(guard.decay(), 0);
        assert_eq!(guard.decay(), 0);
        assert_eq!(guard.snapshot().transmission_count, 0);
    }

    #[test]
    fn test_decay_reopens_quota() {
        let guard = DutyCycleGuard::new(true);
        for _ in 0..QUOTA_CEILING {
            guard.try_record();
        }
        assert!(!guard.allows_reply());
        guard.decay();
        assert!(guard.allows_reply());
    }

    #[test]
    fn test_unenforced_never_throttles() {
        let guard = DutyCycleGuard::new(false);
        for _ in 0..40 {
            guard.try_record();
            assert_eq!(guard.check_threshold(), Threshold::Below);
        }
        assert!(guard.allows_reply());
    }

    #[test]
    fn test_try_record_stops_at_ceiling() {
        let guard = DutyCycleGuard::new(true);
        for _ in 0..QUOTA_CEILING {
            assert!(guard.try_record());
        }
        assert!(!guard.try_record());
        assert_eq!(guard.snapshot().transmission_count, QUOTA_CEILING);

        let unenforced = DutyCycleGuard::new(false);
        for _ in 0..QUOTA_CEILING + 4 {
            assert!(unenforced.try_record());
        }
    }

    #[test]
    fn test_contended_try_record_never_exceeds_ceiling() {
        for _ in 0..50 {
            let guard = Arc::new(DutyCycleGuard::new(true));
            let start = Arc::new(Barrier::new(32));
            let workers: Vec<_> = (0..32)
                .map(|_| {
                    let guard = Arc::clone(&guard);
                    let start = Arc::clone(&start);
                    std::thread::spawn(move || {
                        start.wait();
                        guard.try_record()
                    })
                })
                .collect();
            let granted = workers
                .into_iter()
                .map(|worker| worker.join().unwrap())
                .filter(|&granted| granted)
                .count();
            assert_eq!(granted, QUOTA_CEILING as usize);
            assert_eq!(guard.snapshot().transmission_count, QUOTA_CEILING);
        }
    }
}
