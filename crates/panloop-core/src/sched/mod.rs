//! Periodic, priority-ordered task scheduler.
//!
//! A fixed-capacity table of closures, each with a millisecond interval and
//! an 8-bit priority. [`Scheduler::run`] sorts the table once (stable,
//! highest priority first) and then loops: sample the clock, dispatch every
//! due task in table order, sleep until the earliest next deadline, repeat.
//! The loop exits when the process-wide shutdown flag (or an injected local
//! one) is set, or when a [`SchedulerHandle`] stops it.
//!
//! Two dispatch modes share the same selection and accounting:
//!
//! - [`DispatchMode::Inline`]: every callback runs on the dispatch thread,
//!   serialized. No data races between tasks are possible.
//! - [`DispatchMode::Threaded`]: each due task in a tick runs on a transient
//!   worker; the dispatcher joins them all before sleeping. One
//!   scheduler-wide mutex serializes task-field access, and callbacks run
//!   outside it, so I/O-bound tasks in the same tick overlap. Strict
//!   priority order among concurrently dispatched tasks is given up in
//!   exchange.
//!
//! Overruns (a callback finishing past `last_run + interval`) are counted
//! per task and reported through the logger; they never stop the loop. A
//! task that runs longer than its interval is rescheduled from the tick
//! start, so missed intervals do not produce catch-up bursts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::clock;
use crate::error::Error;
use crate::signal::ShutdownFlag;

/// Upper bound on the inter-tick sleep, so shutdown requests and newly due
/// work are observed promptly even when every task is far from due.
pub const SLEEP_CAP_MS: u32 = 50;

/// A task callback. Context travels inside the closure; the scheduler never
/// inspects it.
pub type TaskCallback = Box<dyn FnMut() + Send>;

/// Post-dispatch hook: `(index in sorted table, task name)`.
pub type LogHook = Box<dyn FnMut(usize, &str) + Send>;

/// How due tasks are executed within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// All callbacks on the dispatch thread, in strict priority order.
    Inline,
    /// One transient worker per due task per tick, joined before sleeping.
    Threaded,
}

/// Stable identifier returned by [`Scheduler::add_task`]; survives the
/// priority sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

/// Mutable per-task scheduling and profiling state.
#[derive(Debug, Clone, Copy, Default)]
struct TaskStats {
    last_run_ms: u32,
    deadline_ms: u32,
    run_count: u32,
    total_duration_ms: u32,
    max_duration_ms: u32,
    overrun_count: u32,
}

/// Read-only statistics snapshot for one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub name: String,
    pub interval_ms: u32,
    pub priority: u8,
    pub run_count: u32,
    pub avg_ms: u32,
    pub max_duration_ms: u32,
    pub total_duration_ms: u32,
    pub overrun_count: u32,
}

struct TaskEntry {
    id: TaskId,
    name: String,
    interval_ms: u32,
    priority: u8,
    // Exclusive access per invocation; uncontended in practice because at
    // most one worker per task is launched per tick.
    callback: Mutex<TaskCallback>,
}

/// State behind the single scheduler-wide mutex: the stats table (parallel
/// to the task table) and the log hook.
struct Shared {
    stats: Vec<TaskStats>,
    hook: Option<LogHook>,
}

/// Clonable handle that stops a running scheduler from a callback or
/// another thread. Advisory: the dispatch loop finishes the current tick
/// first.
#[derive(Clone)]
pub struct SchedulerHandle {
    running: Arc<AtomicBool>,
}

impl SchedulerHandle {
    /// Ask the dispatch loop to exit after the current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// The scheduler. See the module docs for the dispatch model.
pub struct Scheduler {
    tasks: Vec<Arc<TaskEntry>>,
    shared: Arc<Mutex<Shared>>,
    max_tasks: usize,
    mode: DispatchMode,
    running: Arc<AtomicBool>,
    shutdown: ShutdownFlag,
    next_id: usize,
}

impl Scheduler {
    /// Create an inline-mode scheduler with the given table capacity.
    pub fn new(max_tasks: usize) -> Result<Self, Error> {
        Self::with_mode(max_tasks, DispatchMode::Inline)
    }

    /// Create a scheduler with an explicit dispatch mode.
    pub fn with_mode(max_tasks: usize, mode: DispatchMode) -> Result<Self, Error> {
        if max_tasks == 0 {
            return Err(Error::InvalidCapacity);
        }
        Ok(Self {
            tasks: Vec::with_capacity(max_tasks),
            shared: Arc::new(Mutex::new(Shared {
                stats: Vec::with_capacity(max_tasks),
                hook: None,
            })),
            max_tasks,
            mode,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: ShutdownFlag::process(),
            next_id: 0,
        })
    }

    /// Replace the shutdown condition the dispatch loop polls. Defaults to
    /// the process-wide signal-driven flag; embedders and tests inject a
    /// [`ShutdownFlag::local`].
    pub fn with_shutdown_flag(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = flag;
        self
    }

    /// Register a periodic task.
    ///
    /// `last_run` starts at the current clock reading, so the first
    /// invocation happens about `interval_ms` after registration.
    pub fn add_task(
        &mut self,
        name: impl Into<String>,
        interval_ms: u32,
        priority: u8,
        callback: impl FnMut() + Send + 'static,
    ) -> Result<TaskId, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyTaskName);
        }
        if interval_ms == 0 {
            return Err(Error::InvalidInterval);
        }
        if self.tasks.len() >= self.max_tasks {
            return Err(Error::TableFull {
                capacity: self.max_tasks,
            });
        }

        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Arc::new(TaskEntry {
            id,
            name,
            interval_ms,
            priority,
            callback: Mutex::new(Box::new(callback)),
        }));
        self.lock_shared().stats.push(TaskStats {
            last_run_ms: clock::millis(),
            ..TaskStats::default()
        });
        Ok(id)
    }

    /// Install or clear the post-dispatch hook.
    pub fn set_log_hook(&mut self, hook: Option<LogHook>) {
        self.lock_shared().hook = hook;
    }

    /// Handle for stopping the loop from elsewhere.
    pub fn stop_handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Ask the dispatch loop to exit after the current tick. Advisory;
    /// termination is primarily driven by the shutdown flag.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run the dispatch loop until shutdown.
    ///
    /// Sorts the table once on entry (stable, descending priority — equal
    /// priorities keep insertion order); priority relationships are then
    /// immutable until `run` returns.
    pub fn run(&mut self) {
        self.running.store(true, Ordering::SeqCst);
        self.sort_by_priority();
        log::info!(
            "scheduler started: {} task(s), {:?} dispatch",
            self.tasks.len(),
            self.mode
        );

        while self.running.load(Ordering::SeqCst) && !self.shutdown.is_set() {
            let now = clock::millis();
            let next_due = match self.mode {
                DispatchMode::Inline => self.tick_inline(now),
                DispatchMode::Threaded => self.tick_threaded(now),
            };
            // Sleep until the earliest next deadline, capped so the loop
            // keeps observing the shutdown flag; 1ms floor when idle or
            // when every task fired this tick.
            let sleep_ms = next_due.unwrap_or(1).clamp(1, SLEEP_CAP_MS);
            std::thread::sleep(Duration::from_millis(u64::from(sleep_ms)));
        }

        self.running.store(false, Ordering::SeqCst);
        log::info!("scheduler stopped");
    }

    /// One inline tick: dispatch every due task in table order. Returns the
    /// smallest remaining wait among tasks that did not fire.
    fn tick_inline(&self, now: u32) -> Option<u32> {
        let mut next_due: Option<u32> = None;

        for (idx, entry) in self.tasks.iter().enumerate() {
            let deadline = {
                let mut shared = self.lock_shared();
                let stats = &mut shared.stats[idx];
                let elapsed = now.wrapping_sub(stats.last_run_ms);
                if elapsed < entry.interval_ms {
                    let wait = entry.interval_ms - elapsed;
                    next_due = Some(next_due.map_or(wait, |d| d.min(wait)));
                    continue;
                }
                stats.deadline_ms = stats.last_run_ms.wrapping_add(entry.interval_ms);
                stats.deadline_ms
            };

            let start = clock::millis();
            {
                let mut callback = lock_callback(entry);
                (*callback)();
            }
            let duration = clock::millis().wrapping_sub(start);

            let mut shared = self.lock_shared();
            finish_dispatch(&mut shared, entry, idx, now, duration, deadline);
        }
        next_due
    }

    /// One threaded tick: one worker per due task, all joined before
    /// returning.
    fn tick_threaded(&self, now: u32) -> Option<u32> {
        let mut next_due: Option<u32> = None;
        let mut workers = Vec::new();

        for (idx, entry) in self.tasks.iter().enumerate() {
            let due = {
                let shared = self.lock_shared();
                let elapsed = now.wrapping_sub(shared.stats[idx].last_run_ms);
                if elapsed < entry.interval_ms {
                    let wait = entry.interval_ms - elapsed;
                    next_due = Some(next_due.map_or(wait, |d| d.min(wait)));
                    false
                } else {
                    true
                }
            };
            if !due {
                continue;
            }

            let entry = Arc::clone(entry);
            let shared = Arc::clone(&self.shared);
            workers.push(std::thread::spawn(move || {
                run_worker(&entry, &shared, idx, now);
            }));
        }

        for worker in workers {
            let _ = worker.join();
        }
        next_due
    }

    /// Average callback duration in milliseconds; 0 before the first run.
    pub fn avg_ms(&self, id: TaskId) -> Option<u32> {
        let idx = self.position(id)?;
        let shared = self.lock_shared();
        let stats = &shared.stats[idx];
        Some(if stats.run_count > 0 {
            stats.total_duration_ms / stats.run_count
        } else {
            0
        })
    }

    /// Deadline overruns recorded for the task.
    pub fn overruns(&self, id: TaskId) -> Option<u32> {
        let idx = self.position(id)?;
        Some(self.lock_shared().stats[idx].overrun_count)
    }

    /// Full statistics snapshot for one task.
    pub fn stats(&self, id: TaskId) -> Option<TaskSnapshot> {
        let idx = self.position(id)?;
        Some(self.snapshot_at(idx))
    }

    /// Snapshots for every task, in sorted table order.
    pub fn snapshots(&self) -> Vec<TaskSnapshot> {
        (0..self.tasks.len()).map(|i| self.snapshot_at(i)).collect()
    }

    /// Number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Configured table capacity.
    pub fn capacity(&self) -> usize {
        self.max_tasks
    }

    /// The configured dispatch mode.
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    fn snapshot_at(&self, idx: usize) -> TaskSnapshot {
        let entry = &self.tasks[idx];
        let shared = self.lock_shared();
        let stats = &shared.stats[idx];
        TaskSnapshot {
            name: entry.name.clone(),
            interval_ms: entry.interval_ms,
            priority: entry.priority,
            run_count: stats.run_count,
            avg_ms: if stats.run_count > 0 {
                stats.total_duration_ms / stats.run_count
            } else {
                0
            },
            max_duration_ms: stats.max_duration_ms,
            total_duration_ms: stats.total_duration_ms,
            overrun_count: stats.overrun_count,
        }
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn lock_shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stable descending sort; the stats table follows the same
    /// permutation so indices stay aligned.
    fn sort_by_priority(&mut self) {
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        order.sort_by(|&a, &b| self.tasks[b].priority.cmp(&self.tasks[a].priority));

        let tasks = order.iter().map(|&i| Arc::clone(&self.tasks[i])).collect();
        self.tasks = tasks;
        let mut shared = self.lock_shared();
        let stats = order.iter().map(|&i| shared.stats[i]).collect();
        shared.stats = stats;
    }
}

fn lock_callback(entry: &TaskEntry) -> MutexGuard<'_, TaskCallback> {
    entry.callback.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Threaded-mode worker body: deadline update, timed callback outside the
/// shared mutex, then accounting.
fn run_worker(entry: &TaskEntry, shared: &Mutex<Shared>, idx: usize, now: u32) {
    let deadline = {
        let mut shared = shared.lock().unwrap_or_else(PoisonError::into_inner);
        let stats = &mut shared.stats[idx];
        stats.deadline_ms = stats.last_run_ms.wrapping_add(entry.interval_ms);
        stats.deadline_ms
    };

    let start = clock::millis();
    {
        let mut callback = lock_callback(entry);
        (*callback)();
    }
    let duration = clock::millis().wrapping_sub(start);

    let mut shared = shared.lock().unwrap_or_else(PoisonError::into_inner);
    finish_dispatch(&mut shared, entry, idx, now, duration, deadline);
}

/// Post-callback accounting, shared by both dispatch modes. Caller holds
/// the scheduler-wide mutex.
fn finish_dispatch(
    shared: &mut Shared,
    entry: &TaskEntry,
    idx: usize,
    tick_now: u32,
    duration: u32,
    deadline: u32,
) {
    let stats = &mut shared.stats[idx];
    // Reschedule from the tick start so jitter does not accumulate.
    stats.last_run_ms = tick_now;
    stats.run_count = stats.run_count.saturating_add(1);
    stats.total_duration_ms = stats.total_duration_ms.saturating_add(duration);
    if duration > stats.max_duration_ms {
        stats.max_duration_ms = duration;
    }

    let finished = clock::millis();
    if finished > deadline {
        stats.overrun_count = stats.overrun_count.saturating_add(1);
        log::warn!(
            "task {} exceeded deadline by {}ms",
            entry.name,
            finished - deadline
        );
    }

    if let Some(hook) = shared.hook.as_mut() {
        hook(idx, &entry.name);
    }
}
