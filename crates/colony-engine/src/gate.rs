//! Pause gate shared between a controller and its worker.
//!
//! The worker checks the gate at the top of every cycle. Release happens
//! on resume and on cancel alike: [`PauseGate::request_finish`] sets the
//! finish flag and then releases, so a paused worker always wakes up to
//! observe a cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::config::PauseMode;

pub(crate) struct PauseGate {
    paused: Mutex<bool>,
    released: Condvar,
    finish: AtomicBool,
}

impl PauseGate {
    pub fn new() -> Self {
        Self {
            paused: Mutex::new(false),
            released: Condvar::new(),
            finish: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn request_pause(&self) {
        *self.lock() = true;
    }

    /// Clear the pause flag and wake a waiting worker.
    pub fn release(&self) {
        let mut paused = self.lock();
        *paused = false;
        self.released.notify_all();
    }

    /// Ask the worker to stop, then release it.
    pub fn request_finish(&self) {
        self.finish.store(true, Ordering::Release);
        self.release();
    }

    pub fn is_paused(&self) -> bool {
        *self.lock()
    }

    pub fn finish_requested(&self) -> bool {
        self.finish.load(Ordering::Acquire)
    }

    /// Block while paused. Returns once released or finishing.
    pub fn wait(&self, mode: PauseMode, poll: Duration) {
        match mode {
            PauseMode::Supervised => {
                let guard = self.lock();
                let _guard = self
                    .released
                    .wait_while(guard, |paused| *paused && !self.finish_requested())
                    .unwrap_or_else(PoisonError::into_inner);
            }
            PauseMode::Unattended => {
                while self.is_paused() && !self.finish_requested() {
                    thread::sleep(poll);
                }
            }
        }
    }
}
