//! Recurring and one-shot run control
//!
//! The scheduler owns the only state that survives between runs: the instant
//! of the last fired trigger. Runs are synchronous calls made from its own
//! loop, so two runs can never overlap; triggers that pass while a run is
//! still going are reported as skipped instead of being queued.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::pipeline::{RunError, RunSummary};
use crate::schedule::{next_trigger, triggers_between, CronSchedule, ScheduleError};

/// Upper bound on skipped triggers enumerated for logging after a long run
const MAX_REPORTED_SKIPS: usize = 32;

/// Longest single sleep; waking periodically absorbs wall-clock jumps
const MAX_SLEEP_SLICE: Duration = Duration::from_secs(60);

/// Source of wall-clock time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Block until `instant` has been reached.
    fn sleep_until(&self, instant: DateTime<Utc>);
}

/// Real clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep_until(&self, instant: DateTime<Utc>) {
        loop {
            let left = match (instant - Utc::now()).to_std() {
                Ok(left) if !left.is_zero() => left,
                _ => return,
            };
            std::thread::sleep(left.min(MAX_SLEEP_SLICE));
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn sleep_until(&self, instant: DateTime<Utc>) {
        (**self).sleep_until(instant)
    }
}

/// Lifecycle state of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Waiting,
    Running,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Waiting => write!(f, "waiting"),
            SchedulerState::Running => write!(f, "running"),
        }
    }
}

/// Bookkeeping of the last fired trigger
#[derive(Debug, Clone, Default)]
struct RunRecord {
    last_fired: Option<DateTime<Tz>>,
}

impl RunRecord {
    /// Instant the next trigger is searched from: never before the last fired
    /// trigger, so a clock stepping back cannot bring it round again.
    fn search_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_fired {
            Some(last) if last.with_timezone(&Utc) > now => last.with_timezone(&Utc),
            _ => now,
        }
    }
}

/// Result of one scheduling cycle
#[derive(Debug)]
pub struct TickOutcome {
    pub trigger: DateTime<Tz>,
    pub result: Result<RunSummary, RunError>,
    /// Triggers that passed while the run was in progress
    pub skipped: Vec<DateTime<Tz>>,
}

/// Cron-driven run loop
pub struct RunScheduler<C: Clock> {
    schedule: CronSchedule,
    tz: Tz,
    clock: C,
    state: SchedulerState,
    record: RunRecord,
}

impl<C: Clock> RunScheduler<C> {
    pub fn new(schedule: CronSchedule, tz: Tz, clock: C) -> Self {
        Self {
            schedule,
            tz,
            clock,
            state: SchedulerState::Idle,
            record: RunRecord::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Last trigger that led to a completed run
    pub fn last_fired(&self) -> Option<DateTime<Tz>> {
        self.record.last_fired
    }

    /// Next trigger as seen from the current clock and the run record
    pub fn upcoming(&self) -> Result<DateTime<Tz>, ScheduleError> {
        let from = self.record.search_from(self.clock.now());
        next_trigger(&self.schedule, self.tz, from)
            .ok_or_else(|| ScheduleError::NoUpcomingTrigger(self.schedule.to_string()))
    }

    /// Wait for the next trigger and run the pipeline once for it.
    pub fn tick<F>(&mut self, pipeline: &mut F) -> Result<TickOutcome, ScheduleError>
    where
        F: FnMut() -> Result<RunSummary, RunError>,
    {
        self.state = SchedulerState::Waiting;
        let trigger = match self.upcoming() {
            Ok(trigger) => trigger,
            Err(err) => {
                self.state = SchedulerState::Idle;
                return Err(err);
            }
        };
        info!(next_run = %trigger, state = %self.state, "Waiting for next trigger");

        self.clock.sleep_until(trigger.with_timezone(&Utc));

        self.state = SchedulerState::Running;
        info!(trigger = %trigger, state = %self.state, "Starting scheduled run");
        let result = pipeline();
        let finished = self.clock.now();

        match &result {
            Ok(summary) => info!(
                trigger = %trigger,
                issues = summary.issues,
                groups = summary.groups,
                "Scheduled run completed"
            ),
            Err(err) => error!(
                trigger = %trigger,
                stage = %err.stage,
                kind = err.error.kind(),
                error = %err,
                "Scheduled run failed"
            ),
        }
        self.record.last_fired = Some(trigger);

        let skipped = triggers_between(
            &self.schedule,
            self.tz,
            trigger.with_timezone(&Utc),
            finished,
            MAX_REPORTED_SKIPS,
        );
        for missed in &skipped {
            warn!(
                trigger = %missed,
                started = %trigger,
                "Skipping trigger: previous run was still in progress"
            );
        }

        self.state = SchedulerState::Idle;
        Ok(TickOutcome {
            trigger,
            result,
            skipped,
        })
    }

    /// Run forever. Pipeline failures are logged and never stop the loop.
    pub fn run<F>(&mut self, mut pipeline: F) -> Result<(), ScheduleError>
    where
        F: FnMut() -> Result<RunSummary, RunError>,
    {
        info!(cron = %self.schedule, timezone = %self.tz, "Scheduler started");
        loop {
            self.tick(&mut pipeline)?;
        }
    }
}

/// Execute the pipeline exactly once, for externally scheduled triggers.
pub fn run_once<F>(pipeline: F) -> Result<RunSummary, RunError>
where
    F: FnOnce() -> Result<RunSummary, RunError>,
{
    info!("Starting one-shot run");
    let result = pipeline();
    match &result {
        Ok(summary) => info!(
            issues = summary.issues,
            groups = summary.groups,
            "One-shot run completed"
        ),
        Err(err) => error!(
            stage = %err.stage,
            kind = err.error.kind(),
            error = %err,
            "One-shot run failed"
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DigestError;
    use crate::pipeline::Stage;
    use crate::schedule::parse_timezone;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::cell::{Cell, RefCell};

    /// Clock that jumps straight to the requested instant
    struct FakeClock {
        now: Cell<DateTime<Utc>>,
        sleeps: RefCell<Vec<DateTime<Utc>>>,
    }

    impl FakeClock {
        fn at(now: DateTime<Utc>) -> Self {
            Self {
                now: Cell::new(now),
                sleeps: RefCell::new(Vec::new()),
            }
        }

        fn advance(&self, by: ChronoDuration) {
            self.now.set(self.now.get() + by);
        }

        fn set(&self, to: DateTime<Utc>) {
            self.now.set(to);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            self.now.get()
        }

        fn sleep_until(&self, instant: DateTime<Utc>) {
            self.sleeps.borrow_mut().push(instant);
            if instant > self.now.get() {
                self.now.set(instant);
            }
        }
    }

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    fn summary() -> RunSummary {
        RunSummary {
            issues: 3,
            groups: 2,
            delivery: None,
        }
    }

    fn daily_at_nine(clock: &FakeClock) -> RunScheduler<&FakeClock> {
        let schedule: CronSchedule = "0 9 * * *".parse().unwrap();
        RunScheduler::new(schedule, parse_timezone("UTC").unwrap(), clock)
    }

    fn ran_trigger(outcome: &TickOutcome) -> DateTime<Utc> {
        outcome.trigger.with_timezone(&Utc)
    }

    #[test]
    fn fires_each_daily_trigger_once() {
        let clock = FakeClock::at(utc(1, 8, 0));
        let mut scheduler = daily_at_nine(&clock);
        let mut runs = 0;
        let mut pipeline = || {
            runs += 1;
            Ok(summary())
        };

        let first = scheduler.tick(&mut pipeline).unwrap();
        let second = scheduler.tick(&mut pipeline).unwrap();
        let third = scheduler.tick(&mut pipeline).unwrap();

        assert_eq!(ran_trigger(&first), utc(1, 9, 0));
        assert_eq!(ran_trigger(&second), utc(2, 9, 0));
        assert_eq!(ran_trigger(&third), utc(3, 9, 0));
        assert_eq!(runs, 3);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn clock_stepping_back_does_not_refire_trigger() {
        let clock = FakeClock::at(utc(1, 8, 0));
        let mut scheduler = daily_at_nine(&clock);
        let mut fired = Vec::new();

        let mut pipeline = || Ok(summary());
        let first = scheduler.tick(&mut pipeline).unwrap();
        fired.push(ran_trigger(&first));

        // Wall clock jumps back an hour, before the trigger that just fired
        clock.set(utc(1, 8, 30));
        let second = scheduler.tick(&mut pipeline).unwrap();
        fired.push(ran_trigger(&second));

        assert_eq!(fired, vec![utc(1, 9, 0), utc(2, 9, 0)]);
    }

    #[test]
    fn next_trigger_starts_after_recorded_fire() {
        let clock = FakeClock::at(utc(1, 8, 0));
        let mut scheduler = daily_at_nine(&clock);
        let mut runs = 0;
        let mut pipeline = || {
            runs += 1;
            Ok(summary())
        };
        scheduler.tick(&mut pipeline).unwrap();

        // A record ahead of the clock wins over the clock
        scheduler.record.last_fired = Some(
            utc(5, 9, 0).with_timezone(&parse_timezone("UTC").unwrap()),
        );
        clock.set(utc(1, 10, 0));
        assert_eq!(scheduler.upcoming().unwrap().with_timezone(&Utc), utc(6, 9, 0));

        let outcome = scheduler.tick(&mut pipeline).unwrap();
        assert_eq!(ran_trigger(&outcome), utc(6, 9, 0));
        assert_eq!(runs, 2);
    }

    /// Clock whose sleep returns at once without time passing
    struct StalledClock(DateTime<Utc>);

    impl Clock for StalledClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }

        fn sleep_until(&self, _instant: DateTime<Utc>) {}
    }

    #[test]
    fn early_wakeup_never_repeats_a_trigger() {
        let schedule: CronSchedule = "0 9 * * *".parse().unwrap();
        let clock = StalledClock(utc(1, 8, 0));
        let mut scheduler = RunScheduler::new(schedule, parse_timezone("UTC").unwrap(), clock);
        let mut pipeline = || Ok(summary());

        let fired: Vec<DateTime<Utc>> = (0..3)
            .map(|_| ran_trigger(&scheduler.tick(&mut pipeline).unwrap()))
            .collect();
        assert_eq!(fired, vec![utc(1, 9, 0), utc(2, 9, 0), utc(3, 9, 0)]);
    }

    #[test]
    fn long_run_skips_covered_triggers() {
        let clock = FakeClock::at(utc(1, 8, 0));
        let mut scheduler = daily_at_nine(&clock);
        let mut calls = 0;
        let mut pipeline = || {
            calls += 1;
            if calls == 1 {
                // First run overruns two following triggers
                clock.advance(ChronoDuration::hours(50));
            }
            Ok(summary())
        };

        let first = scheduler.tick(&mut pipeline).unwrap();
        let skipped: Vec<DateTime<Utc>> =
            first.skipped.iter().map(|t| t.with_timezone(&Utc)).collect();
        assert_eq!(skipped, vec![utc(2, 9, 0), utc(3, 9, 0)]);

        let second = scheduler.tick(&mut pipeline).unwrap();
        assert_eq!(ran_trigger(&second), utc(4, 9, 0));
        assert_eq!(calls, 2);
    }

    #[test]
    fn failed_run_is_recorded_and_loop_continues() {
        let clock = FakeClock::at(utc(1, 8, 0));
        let mut scheduler = daily_at_nine(&clock);
        let mut calls = 0;
        let mut pipeline = || {
            calls += 1;
            if calls == 1 {
                Err(RunError::new(
                    Stage::Deliver,
                    DigestError::Delivery("webhook unreachable".to_string()),
                ))
            } else {
                Ok(summary())
            }
        };

        let first = scheduler.tick(&mut pipeline).unwrap();
        assert!(first.result.is_err());
        assert_eq!(
            scheduler.last_fired().map(|t| t.with_timezone(&Utc)),
            Some(utc(1, 9, 0))
        );

        let second = scheduler.tick(&mut pipeline).unwrap();
        assert!(second.result.is_ok());
        assert_eq!(ran_trigger(&second), utc(2, 9, 0));
    }

    #[test]
    fn waits_in_configured_timezone() {
        let clock = FakeClock::at(utc(1, 0, 0));
        let schedule: CronSchedule = "0 9 * * *".parse().unwrap();
        let tz = parse_timezone("Asia/Shanghai").unwrap();
        let mut scheduler = RunScheduler::new(schedule, tz, &clock);

        let outcome = scheduler.tick(&mut || Ok(summary())).unwrap();
        // 09:00 in Shanghai is 01:00 UTC
        assert_eq!(ran_trigger(&outcome), utc(1, 1, 0));
        assert_eq!(clock.sleeps.borrow().as_slice(), &[utc(1, 1, 0)]);
    }

    #[test]
    fn run_once_returns_pipeline_outcome() {
        assert!(run_once(|| Ok(summary())).is_ok());
        let err = run_once(|| {
            Err(RunError::new(
                Stage::Fetch,
                DigestError::Auth("401".to_string()),
            ))
        })
        .unwrap_err();
        assert_eq!(err.stage, Stage::Fetch);
    }
}
