//! The worker's cycle loop.
//!
//! [`CycleLoop`] owns the [`Simulation`] exclusively for the duration of a
//! run (moved in via `thread::Builder::spawn`) and returns it inside the
//! [`RunReport`] when the loop ends. The controller and the worker share
//! only [`RunShared`]: the pause gate plus two atomics.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colony_core::{CycleId, PackageError};
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::event::{ControllerEvent, CycleReport, SimState};
use crate::gate::PauseGate;
use crate::metrics::{micros, CycleMetrics, RunMetrics};
use crate::report::{AbortReason, RunOutcome, RunReport, TerminationReason};
use crate::world::Simulation;

/// State shared between a controller and its worker.
pub(crate) struct RunShared {
    pub gate: PauseGate,
    state: AtomicU8,
    cycle: AtomicU64,
}

impl RunShared {
    pub fn new() -> Self {
        Self {
            gate: PauseGate::new(),
            state: AtomicU8::new(SimState::Init as u8),
            cycle: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SimState {
        SimState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn swap_state(&self, to: SimState) -> SimState {
        SimState::from_u8(self.state.swap(to as u8, Ordering::AcqRel))
    }

    pub fn cycle(&self) -> CycleId {
        CycleId(self.cycle.load(Ordering::Acquire))
    }
}

pub(crate) struct CycleLoop {
    sim: Simulation,
    shared: Arc<RunShared>,
    config: ControllerConfig,
    metrics: RunMetrics,
    completed: u64,
    failed: u64,
}

impl CycleLoop {
    pub fn new(sim: Simulation, shared: Arc<RunShared>, config: ControllerConfig) -> Self {
        Self {
            sim,
            shared,
            config,
            metrics: RunMetrics::default(),
            completed: 0,
            failed: 0,
        }
    }

    fn emit(&self, event: ControllerEvent) {
        if let Some(sink) = &self.config.events {
            // A full or disconnected sink drops the event.
            let _ = sink.try_send(event);
        }
    }

    fn transition(&self, to: SimState) {
        let from = self.shared.swap_state(to);
        if from != to {
            info!(%from, %to, "simulation state changed");
            self.emit(ControllerEvent::StateChanged { from, to });
        }
    }

    /// Run to the end and hand the simulation back.
    ///
    /// Before the package initializes, the grid takes its edge behavior
    /// from `toroidal` and is reseeded from `seed`, so every run (and
    /// every sweep combination) starts from the configured stream.
    pub fn run(mut self) -> RunReport {
        if let Err(e) = self
            .config
            .validate()
            .and_then(|()| self.sim.config.validate())
        {
            return self.abort(AbortReason::Config(e));
        }
        let grid = self.sim.world.grid_mut();
        grid.set_edge(self.sim.config.toroidal.into());
        grid.reseed(self.sim.config.seed);
        if let Err(e) = self
            .sim
            .package
            .initialize(&mut self.sim.world, &self.sim.config)
        {
            return self.abort(AbortReason::Init(e));
        }

        info!(
            package = self.sim.package.name(),
            cells = self.sim.world.cells().len(),
            max_cycles = ?self.sim.config.max_cycles,
            "simulation started"
        );
        self.transition(SimState::Running);
        let outcome = self.cycle_loop();

        self.sim.package.finish(&mut self.sim.world);
        self.transition(SimState::Finished);
        info!(
            cycles = self.completed,
            failed = self.failed,
            %outcome,
            "simulation finished"
        );
        self.into_report(outcome)
    }

    fn abort(self, reason: AbortReason) -> RunReport {
        error!(%reason, "simulation aborted before start");
        self.transition(SimState::Finished);
        self.into_report(RunOutcome::Aborted(reason))
    }

    fn into_report(self, outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            cycles_completed: self.completed,
            failed_cycles: self.failed,
            metrics: self.metrics,
            simulation: self.sim,
        }
    }

    fn cycle_loop(&mut self) -> RunOutcome {
        let slideshow = self.sim.config.slideshow_interval();
        let dilution = self.sim.config.dilution_interval();
        let mut cycle = 0u64;
        loop {
            if self.shared.gate.is_paused() {
                self.transition(SimState::Paused);
                self.shared
                    .gate
                    .wait(self.config.pause_mode, self.config.poll_interval);
            }
            if self.shared.gate.finish_requested() {
                return RunOutcome::Cancelled;
            }
            self.transition(SimState::Running);

            cycle += 1;
            if self.sim.world.cells().is_empty() && self.sim.package.reactions_initialized() {
                return RunOutcome::Completed(TerminationReason::NoCells);
            }
            if self.sim.config.exceeds_max_cycles(cycle) {
                return RunOutcome::Completed(TerminationReason::MaxCycles);
            }

            let report = self.step(CycleId(cycle), slideshow, dilution);
            self.shared.cycle.store(cycle, Ordering::Release);

            if self.sim.config.pause_on_step {
                self.shared.gate.request_pause();
                self.transition(SimState::Paused);
            }
            self.emit(ControllerEvent::CycleCompleted(report));
        }
    }

    fn step(&mut self, cycle: CycleId, slideshow: Option<u64>, dilution: Option<u64>) -> CycleReport {
        let start = Instant::now();
        let mut metrics = CycleMetrics::default();
        let mut status: Result<(), PackageError> = Ok(());

        if slideshow.is_some_and(|rate| cycle.0 % rate == 0) {
            self.emit(ControllerEvent::SnapshotDue { cycle });
        }

        if dilution.is_some_and(|interval| cycle.0 % interval == 0) {
            let t = Instant::now();
            let factor = self.sim.config.dilution_factor;
            match self.sim.package.dilute(&mut self.sim.world, factor) {
                Ok(()) => {
                    debug!(cycle = cycle.0, factor, "batch dilution applied");
                    self.emit(ControllerEvent::DilutionApplied { cycle, factor });
                }
                Err(e) => status = Err(e),
            }
            metrics.dilution_us = micros(t.elapsed());
        }

        let t = Instant::now();
        let stepped = self.sim.package.run(&mut self.sim.world, cycle);
        metrics.package_us = micros(t.elapsed());

        let t = Instant::now();
        let grid = self.sim.world.grid_mut();
        grid.refresh_media();
        grid.apply_static_media();
        metrics.media_us = micros(t.elapsed());

        if status.is_ok() {
            status = stepped;
        }
        if let Err(e) = &status {
            self.failed += 1;
            warn!(cycle = cycle.0, error = %e, "cycle step failed");
        }

        let elapsed = start.elapsed();
        metrics.total_us = micros(elapsed);
        self.metrics.record(&metrics);
        self.completed += 1;

        let cell_count = self.sim.world.cells().len();
        debug!(
            cycle = cycle.0,
            cells = cell_count,
            elapsed_us = metrics.total_us,
            "cycle completed"
        );
        CycleReport {
            cycle,
            elapsed,
            status,
            cell_count,
            metrics,
        }
    }
}

/// The controller's polling interval, never zero.
pub(crate) fn poll_interval(config: &ControllerConfig) -> Duration {
    if config.poll_interval.is_zero() {
        ControllerConfig::default().poll_interval
    } else {
        config.poll_interval
    }
}
