use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::batch::orchestrator::BatchOrchestrator;
use crate::config::SchedulerConfig;

/// Longest single sleep of the timer loop. The wall clock is re-read after
/// every wake, so a suspended host or a stepped clock delays a run by at most
/// this much.
pub const MAX_SLEEP: std::time::Duration = std::time::Duration::from_secs(60);

/// Longest daylight-saving gap a run time can fall into.
const MAX_GAP_MINUTES: i64 = 180;

/// Wall-clock source for the timer loop.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// When the timer loop fires.
pub trait Schedule: Send + Sync + 'static {
    /// First firing instant strictly after `after`.
    fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc>;
}

/// Once a day at a wall-clock time of day in `tz`.
///
/// An ambiguous time (clocks going back) fires at its first occurrence. A
/// time that does not exist (clocks going forward) fires at the first minute
/// after the gap.
#[derive(Debug, Clone)]
pub struct DailyTrigger<Tz: TimeZone> {
    tz: Tz,
    at: NaiveTime,
}

impl<Tz: TimeZone> DailyTrigger<Tz> {
    pub fn new(tz: Tz, at: NaiveTime) -> Self {
        Self { tz, at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        (0..=MAX_GAP_MINUTES).find_map(|m| {
            self.tz
                .from_local_datetime(&(local + Duration::minutes(m)))
                .earliest()
                .map(|t| t.with_timezone(&Utc))
        })
    }
}

impl<Tz> Schedule for DailyTrigger<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = after.with_timezone(&self.tz).date_naive();
        for _ in 0..3 {
            if let Some(fire) = self.resolve(date.and_time(self.at)) {
                if fire > after {
                    return fire;
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        after + Duration::days(1)
    }
}

/// Daily trigger for the batch job at a fixed local time of day.
///
/// The timer loop only waits and spawns; each run executes on its own task
/// so a slow job never delays the next tick or the request handlers.
pub struct BatchScheduler {
    orchestrator: Arc<BatchOrchestrator>,
    cfg: SchedulerConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BatchScheduler {
    pub fn new(orchestrator: Arc<BatchOrchestrator>, cfg: SchedulerConfig) -> Self {
        Self {
            orchestrator,
            cfg,
            task: Mutex::new(None),
        }
    }

    /// Spawn the timer loop. No-op when disabled or already started.
    pub fn start(&self) {
        if !self.cfg.enabled {
            info!("Scheduler disabled, batch job will only run on demand");
            return;
        }

        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            warn!("Scheduler already running");
            return;
        }

        let trigger = DailyTrigger::new(Local, resolve_run_time(&self.cfg.run_time));
        info!(run_time = %trigger.at(), "Scheduler started, batch job runs daily at {}", trigger.at());

        let orchestrator = Arc::clone(&self.orchestrator);
        *task = Some(tokio::spawn(run_loop(SystemClock, trigger, move || {
            fire(Arc::clone(&orchestrator));
        })));
    }

    /// Stop the timer loop. A run already in progress finishes on its own.
    pub fn stop(&self) {
        let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

/// Start one batch run on its own task. A failed run is logged and dropped.
pub fn fire(orchestrator: Arc<BatchOrchestrator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run_batch_job().await {
            error!(outcome = "failed", "Scheduled batch run failed: {e}");
        }
    })
}

async fn run_loop<C, S, F>(clock: C, schedule: S, mut on_fire: F)
where
    C: Clock,
    S: Schedule,
    F: FnMut() + Send + 'static,
{
    let mut after = clock.now();

    loop {
        let next = schedule.next_after(after);
        info!(next_run = %next.with_timezone(&Local), "Next batch run at {}", next.with_timezone(&Local));
        sleep_until(&clock, next).await;

        on_fire();

        // Missed days after a long suspend collapse into the run just made.
        after = next.max(clock.now());
    }
}

/// Sleep until `clock` reads at least `target`.
async fn sleep_until<C: Clock>(clock: &C, target: DateTime<Utc>) {
    loop {
        let remaining = match (target - clock.now()).to_std() {
            Ok(d) if !d.is_zero() => d,
            _ => return,
        };
        tokio::time::sleep(remaining.min(MAX_SLEEP)).await;
    }
}

/// `HH:MM` or `HH:MM:SS`.
pub fn parse_run_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

fn resolve_run_time(raw: &str) -> NaiveTime {
    parse_run_time(raw).unwrap_or_else(|| {
        error!("Invalid scheduler run time {raw:?}, falling back to midnight");
        NaiveTime::MIN
    })
}
