// src/engine/timer.rs

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::error::TimerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Seconds left after this tick.
    Tick(u64),
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Expired,
    Cancelled,
}

/// Countdown clock owned by a session actor.
///
/// The timer does not spawn anything: the owner polls `next_event` in its
/// select loop, so a cancelled timer cannot deliver a stray tick.
#[derive(Debug)]
pub struct CountdownTimer {
    period: Duration,
    remaining: u64,
    phase: TimerPhase,
    interval: Option<Interval>,
}

impl CountdownTimer {
    /// `period` is the real time one countdown second takes.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            remaining: 0,
            phase: TimerPhase::Idle,
            interval: None,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Starts counting down from `duration_secs`. Only one countdown per timer.
    pub fn start(&mut self, duration_secs: u64) -> Result<(), TimerError> {
        if self.phase != TimerPhase::Idle {
            return Err(TimerError::AlreadyStarted);
        }

        self.remaining = duration_secs;
        self.phase = TimerPhase::Running;

        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        Ok(())
    }

    /// Stops the countdown without expiring. No-op unless running.
    pub fn cancel(&mut self) {
        if self.phase == TimerPhase::Running {
            self.phase = TimerPhase::Cancelled;
            self.interval = None;
        }
    }

    /// Waits for the next event. Pending forever when the timer is not running.
    ///
    /// Cancel safe: state only changes after the interval has ticked.
    pub async fn next_event(&mut self) -> TimerEvent {
        if self.phase != TimerPhase::Running {
            return std::future::pending().await;
        }

        if self.remaining == 0 {
            self.phase = TimerPhase::Expired;
            self.interval = None;
            return TimerEvent::Expired;
        }

        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => return std::future::pending().await,
        }

        self.remaining -= 1;
        TimerEvent::Tick(self.remaining)
    }
}
