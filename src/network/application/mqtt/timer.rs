//! Timer identities, timer intents and a software alarm table.
//!
//! The lifecycle never touches hardware timers. Each transition reports what
//! it wants done with the four alarms as a list of [`TimerCommand`]s, and the
//! client applies the same commands to its own [`Timers`] table. Firmware can
//! either mirror the commands onto its platform timers or simply call
//! [`Client::poll`](super::Client::poll) with the current time.

use heapless::Vec;

/// The four alarms the client owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    /// Periodic check for network readiness.
    NetworkPoll,
    /// One-shot retry of a failed TCP connect.
    ConnectRetry,
    /// Idle timer that triggers a PINGREQ.
    KeepAlive,
    /// Periodic publish of the staged reading.
    Publish,
}

impl TimerId {
    /// Firing order for alarms due at the same instant.
    ///
    /// `Publish` precedes `KeepAlive`: the PUBLISH re-arms the keepalive, so a
    /// ping that became due at the same instant is superseded instead of
    /// being sent back to back with the publish.
    pub const PRIORITY: [TimerId; 4] = [
        TimerId::Publish,
        TimerId::KeepAlive,
        TimerId::ConnectRetry,
        TimerId::NetworkPoll,
    ];

    fn index(self) -> usize {
        match self {
            TimerId::NetworkPoll => 0,
            TimerId::ConnectRetry => 1,
            TimerId::KeepAlive => 2,
            TimerId::Publish => 3,
        }
    }
}

/// Whether an alarm fires once or keeps its period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Fire once, then disarm.
    OneShot,
    /// Fire every period until disarmed.
    Repeating,
}

/// A requested change to one alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerCommand {
    /// Disarm `timer` if pending, then arm it to fire `after_ms` from now.
    Arm {
        /// Alarm to arm.
        timer: TimerId,
        /// Delay from the transition instant.
        after_ms: u32,
        /// One-shot or repeating.
        mode: Mode,
    },
    /// Cancel `timer`. Disarming an idle alarm is a no-op.
    Disarm(TimerId),
}

impl TimerCommand {
    /// The alarm this command concerns.
    pub fn timer(&self) -> TimerId {
        match self {
            TimerCommand::Arm { timer, .. } => *timer,
            TimerCommand::Disarm(timer) => *timer,
        }
    }
}

/// The net timer changes of one transition, at most one command per alarm.
pub type Intents = Vec<TimerCommand, 4>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Alarm {
    deadline: u64,
    period: Option<u32>,
}

/// Software alarm table keyed by [`TimerId`].
///
/// Each alarm holds at most one pending expiry. Time is an opaque
/// millisecond counter supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timers {
    alarms: [Option<Alarm>; 4],
}

impl Timers {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `command` at instant `now_ms`.
    pub fn apply(&mut self, now_ms: u64, command: TimerCommand) {
        match command {
            TimerCommand::Arm {
                timer,
                after_ms,
                mode,
            } => {
                self.alarms[timer.index()] = Some(Alarm {
                    deadline: now_ms + u64::from(after_ms),
                    period: match mode {
                        Mode::OneShot => None,
                        Mode::Repeating => Some(after_ms),
                    },
                });
            }
            TimerCommand::Disarm(timer) => self.alarms[timer.index()] = None,
        }
    }

    /// `true` while `timer` has a pending expiry.
    pub fn is_armed(&self, timer: TimerId) -> bool {
        self.alarms[timer.index()].is_some()
    }

    /// When `timer` will next fire.
    pub fn deadline(&self, timer: TimerId) -> Option<u64> {
        self.alarms[timer.index()].map(|alarm| alarm.deadline)
    }

    /// The earliest pending deadline, for firmware that sleeps until then.
    pub fn next_deadline(&self) -> Option<u64> {
        self.alarms.iter().flatten().map(|alarm| alarm.deadline).min()
    }

    /// Take the next alarm due at or before `now_ms`.
    ///
    /// The earliest deadline wins; equal deadlines are broken by
    /// [`TimerId::PRIORITY`]. One-shot alarms are disarmed, repeating alarms
    /// move to their next period (skipping periods already in the past, so a
    /// late poll does not produce a burst).
    pub fn pop_expired(&mut self, now_ms: u64) -> Option<TimerId> {
        let mut due: Option<(TimerId, u64)> = None;
        for timer in TimerId::PRIORITY {
            if let Some(alarm) = self.alarms[timer.index()] {
                let earlier = due.is_none_or(|(_, deadline)| alarm.deadline < deadline);
                if alarm.deadline <= now_ms && earlier {
                    due = Some((timer, alarm.deadline));
                }
            }
        }

        let (timer, _) = due?;
        let slot = &mut self.alarms[timer.index()];
        *slot = slot.and_then(|alarm| {
            alarm.period.map(|period| {
                let next = alarm.deadline + u64::from(period);
                Alarm {
                    deadline: if next > now_ms { next } else { now_ms + u64::from(period) },
                    period: Some(period),
                }
            })
        });
        Some(timer)
    }
}
