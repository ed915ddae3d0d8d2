use crate::error::Chip8Error;
use crate::interpreter::Chip8Interpreter;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// nominal CHIP-8 instruction rate
pub const DEFAULT_INSTRUCTION_HZ: u32 = 500;

/// the delay and sound timers always count down at 60Hz
pub const TIMER_HZ: u32 = 60;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Cooperative cancellation, shared between the scheduler and whoever wants it
/// to stop (keyboard feed, a run time limit, tests).
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source of time for the scheduler. Times are offsets from when the clock was
/// created.
pub trait Clock {
    fn now(&self) -> Duration;
    fn sleep_until(&self, deadline: Duration);
}

/// wall clock; sleeps with spin_sleep so short waits land on time
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        if let Some(wait) = deadline.checked_sub(self.now()) {
            spin_sleep::sleep(wait);
        }
    }
}

/// virtual clock; sleeping just moves time forward
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep_until(&self, deadline: Duration) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}

/// A fixed-rate series of ticks. Deadlines are computed from the tick count
/// rather than accumulated, so they never drift.
#[derive(Debug, Clone)]
struct Cadence {
    hz: u32,
    origin: Duration,
    ticks: u64,
}

impl Cadence {
    fn new(hz: u32) -> Self {
        Cadence {
            hz: hz.max(1),
            origin: Duration::ZERO,
            ticks: 0,
        }
    }

    fn restart(&mut self, origin: Duration) {
        self.origin = origin;
        self.ticks = 0;
    }

    /// when the next tick falls due
    fn next_deadline(&self) -> Duration {
        let nanos = (self.ticks as u128 + 1) * NANOS_PER_SEC / self.hz as u128;
        self.origin + Duration::from_nanos(nanos as u64)
    }

    fn advance(&mut self) {
        self.ticks += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    /// terminal; a stopped scheduler never runs again
    Stopped,
}

/// Drives an interpreter at a fixed instruction rate, with the 60Hz timers on
/// their own independent cadence.
pub struct Scheduler<C: Clock> {
    clock: C,
    instructions: Cadence,
    timers: Cadence,
    run_for: Option<Duration>,
    state: SchedulerState,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, instruction_hz: u32) -> Self {
        Scheduler {
            clock,
            instructions: Cadence::new(instruction_hz),
            timers: Cadence::new(TIMER_HZ),
            run_for: None,
            state: SchedulerState::Running,
        }
    }

    /// stop by itself after this much time
    pub fn with_limit(mut self, run_for: Option<Duration>) -> Self {
        self.run_for = run_for;
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// instruction ticks so far, including idle ones spent waiting on a key
    pub fn instruction_ticks(&self) -> u64 {
        self.instructions.ticks
    }

    pub fn timer_ticks(&self) -> u64 {
        self.timers.ticks
    }

    /// Run until stopped, the time limit passes, or the interpreter faults.
    /// The stop signal is checked before every tick.
    pub fn run(
        &mut self,
        interpreter: &mut Chip8Interpreter,
        stop: &StopSignal,
    ) -> Result<SchedulerState, Chip8Error> {
        if self.state == SchedulerState::Stopped {
            return Ok(self.state);
        }
        let result = self.run_loop(interpreter, stop);
        self.state = SchedulerState::Stopped;
        log::info!(
            "scheduler stopped after {} instruction ticks, {} timer ticks",
            self.instructions.ticks,
            self.timers.ticks
        );
        result.map(|_| self.state)
    }

    fn run_loop(
        &mut self,
        interpreter: &mut Chip8Interpreter,
        stop: &StopSignal,
    ) -> Result<(), Chip8Error> {
        let origin = self.clock.now();
        self.instructions.restart(origin);
        self.timers.restart(origin);
        let limit = self.run_for.map(|d| origin + d);
        interpreter.present()?;

        loop {
            let now = self.clock.now();
            let horizon = limit.map_or(now, |l| now.min(l));

            // service whichever cadence is due first until both are caught up
            loop {
                if stop.is_stopped() {
                    log::info!("stop requested");
                    return Ok(());
                }
                let next_timer = self.timers.next_deadline();
                let next_instruction = self.instructions.next_deadline();
                if next_timer.min(next_instruction) > horizon {
                    break;
                }
                if next_timer <= next_instruction {
                    interpreter.tick_timers()?;
                    self.timers.advance();
                } else {
                    interpreter.step()?;
                    self.instructions.advance();
                }
            }

            if limit.is_some_and(|l| now >= l) {
                log::info!("run time limit reached");
                return Ok(());
            }

            let next = self
                .timers
                .next_deadline()
                .min(self.instructions.next_deadline());
            self.clock
                .sleep_until(limit.map_or(next, |l| next.min(l)));
        }
    }
}
