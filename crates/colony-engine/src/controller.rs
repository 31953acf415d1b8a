//! [`SimulationController`]: one background worker running the cycle loop.
//!
//! The controller moves the [`Simulation`] into a named worker thread and
//! recovers it through the thread's `JoinHandle` when the run ends. The
//! only suspension point is the pause check at the top of each cycle.
//! [`cancel`](SimulationController::cancel) always releases that check, so
//! cancelling a paused run and then joining cannot deadlock.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use colony_core::CycleId;

use crate::config::{ConfigError, ControllerConfig};
use crate::cycle::{poll_interval, CycleLoop, RunShared};
use crate::event::SimState;
use crate::report::RunReport;
use crate::world::Simulation;

// ── ControllerHandle ─────────────────────────────────────────────

/// Cloneable remote control for a running simulation.
///
/// Lets another thread pause, resume, or cancel a run while the owner
/// of the [`SimulationController`] blocks in
/// [`join`](SimulationController::join).
#[derive(Clone)]
pub struct ControllerHandle {
    shared: Arc<RunShared>,
}

impl ControllerHandle {
    /// Ask the worker to pause at the top of its next cycle.
    ///
    /// Has no effect once the run has finished.
    pub fn pause(&self) {
        if self.shared.state() != SimState::Finished {
            self.shared.gate.request_pause();
        }
    }

    /// Release a paused worker.
    pub fn resume(&self) {
        self.shared.gate.release();
    }

    /// Ask the worker to stop, releasing it if paused.
    pub fn cancel(&self) {
        self.shared.gate.request_finish();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SimState {
        self.shared.state()
    }

    /// Last completed cycle.
    pub fn cycle(&self) -> CycleId {
        self.shared.cycle()
    }
}

impl std::fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("state", &self.state())
            .field("cycle", &self.cycle())
            .finish()
    }
}

// ── SimulationController ─────────────────────────────────────────

/// Runs one simulation on a background worker.
///
/// Dropping a controller whose run has not been joined cancels and joins
/// it; the simulation is dropped with it.
pub struct SimulationController {
    handle: ControllerHandle,
    worker: Option<JoinHandle<RunReport>>,
    poll_interval: Duration,
}

// Compile-time assertion: controllers and handles can cross threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SimulationController>();
    assert::<ControllerHandle>();
};

impl SimulationController {
    /// Start a run.
    ///
    /// The simulation moves into the worker thread (`colony-cycle`) until
    /// [`join`](Self::join) hands it back. Invalid configuration does not
    /// fail here: the run ends immediately as
    /// [`Aborted`](crate::RunOutcome::Aborted) and the simulation is
    /// returned intact.
    pub fn spawn(sim: Simulation, config: ControllerConfig) -> Result<Self, ConfigError> {
        let shared = Arc::new(RunShared::new());
        let poll_interval = poll_interval(&config);
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("colony-cycle".into())
            .spawn(move || CycleLoop::new(sim, worker_shared, config).run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;
        Ok(Self {
            handle: ControllerHandle { shared },
            worker: Some(worker),
            poll_interval,
        })
    }

    /// Spawn, wait for the run to end on its own, and return its report.
    pub fn run_to_completion(sim: Simulation, config: ControllerConfig) -> Result<RunReport, ConfigError> {
        Self::spawn(sim, config)?.join()
    }

    /// A cloneable handle for controlling the run from other threads.
    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Ask the worker to pause at the top of its next cycle.
    pub fn pause(&self) {
        self.handle.pause();
    }

    /// Release a paused worker.
    pub fn resume(&self) {
        self.handle.resume();
    }

    /// Ask the worker to stop. Always releases a paused worker first.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SimState {
        self.handle.state()
    }

    /// Last completed cycle.
    pub fn cycle(&self) -> CycleId {
        self.handle.cycle()
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Poll until the worker exits or `timeout` elapses. Returns whether
    /// it exited.
    pub fn wait_until_finished(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_finished() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Poll until the worker enters `state` or `timeout` elapses.
    pub fn wait_for_state(&self, state: SimState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state() == state {
                return true;
            }
            if Instant::now() >= deadline || self.is_finished() {
                return self.state() == state;
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Block until the run ends and return its report.
    ///
    /// A paused run stays paused until another [`ControllerHandle`]
    /// resumes or cancels it. Use [`cancel_and_join`](Self::cancel_and_join)
    /// to stop a run from this thread.
    pub fn join(mut self) -> Result<RunReport, ConfigError> {
        let worker = self.worker.take().ok_or(ConfigError::WorkerPanicked)?;
        worker.join().map_err(|_| ConfigError::WorkerPanicked)
    }

    /// Cancel, releasing a paused worker, then join.
    pub fn cancel_and_join(self) -> Result<RunReport, ConfigError> {
        self.cancel();
        self.join()
    }
}

impl Drop for SimulationController {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.handle.cancel();
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for SimulationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationController")
            .field("state", &self.state())
            .field("cycle", &self.cycle())
            .field("finished", &self.is_finished())
            .finish()
    }
}
