//! Progress Simulator
//!
//! Synthetic percentage shown while the image service runs and its true
//! progress is unknown. The value climbs by a fixed step on a fixed period and
//! stops at a ceiling below 100; the last stretch is left for the caller to
//! fill once the real call resolves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::timers::{TimerId, TimerRegistry};

static NEXT_SIMULATION: AtomicU64 = AtomicU64::new(1);

/// Simulator settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Percent added per tick
    pub step: u8,
    /// Highest percent the simulator will report
    pub ceiling: u8,
    /// Tick period
    pub tick: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            step: 10,
            ceiling: 90,
            tick: Duration::from_millis(300),
        }
    }
}

/// Identifies one simulation run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SimulationHandle(u64);

/// One simulated progress update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressTick {
    /// Run that produced this tick
    pub handle: SimulationHandle,
    /// New percent
    pub percent: u8,
}

/// Next simulated value: one step up, capped at the ceiling, never lower
#[must_use]
pub fn next_percent(current: u8, step: u8, ceiling: u8) -> u8 {
    current.max(current.saturating_add(step).min(ceiling))
}

/// Drives at most one simulation at a time
#[derive(Debug)]
pub struct ProgressSimulator {
    config: SimulatorConfig,
    registry: TimerRegistry,
    active: Option<(SimulationHandle, TimerId)>,
}

impl ProgressSimulator {
    /// Create a stopped simulator whose ticks are registered in `registry`
    #[must_use]
    pub fn new(config: SimulatorConfig, registry: TimerRegistry) -> Self {
        Self {
            config,
            registry,
            active: None,
        }
    }

    /// Start counting up from 0, replacing any running simulation
    ///
    /// The first tick arrives one period after start. Ticks are passed through
    /// `wrap` and sent on `tx`; the task ends once the ceiling is reached.
    pub fn start<M, F>(&mut self, tx: mpsc::UnboundedSender<M>, wrap: F) -> SimulationHandle
    where
        M: Send + 'static,
        F: Fn(ProgressTick) -> M + Send + 'static,
    {
        if let Some((old, _)) = self.active {
            self.stop(old);
        }

        let handle = SimulationHandle(NEXT_SIMULATION.fetch_add(1, Ordering::Relaxed));
        let SimulatorConfig {
            step,
            ceiling,
            tick,
        } = self.config;

        let timer = self.registry.spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the immediate first tick
            ticker.tick().await;

            let mut percent = 0u8;
            while percent < ceiling {
                ticker.tick().await;
                percent = next_percent(percent, step, ceiling);
                tracing::debug!(percent, "Simulated progress tick");
                if tx.send(wrap(ProgressTick { handle, percent })).is_err() {
                    break;
                }
            }
        });

        self.active = Some((handle, timer));
        handle
    }

    /// Stop a simulation; stopping a stopped or unknown handle is a no-op
    pub fn stop(&mut self, handle: SimulationHandle) {
        if let Some((active, timer)) = self.active {
            if active == handle {
                self.registry.cancel(timer);
                self.active = None;
            }
        }
    }

    /// Whether `handle` is the running simulation
    ///
    /// Ticks already queued when a simulation stops still arrive; callers drop
    /// any tick whose handle is no longer active.
    #[must_use]
    pub fn is_active(&self, handle: SimulationHandle) -> bool {
        self.active.is_some_and(|(active, _)| active == handle)
    }

    /// Handle of the running simulation
    #[must_use]
    pub fn active(&self) -> Option<SimulationHandle> {
        self.active.map(|(handle, _)| handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_percent_caps_at_ceiling() {
        assert_eq!(next_percent(0, 10, 90), 10);
        assert_eq!(next_percent(85, 10, 90), 90);
        assert_eq!(next_percent(90, 10, 90), 90);
        assert_eq!(next_percent(250, 10, 255), 255);
        // Never decreases, even when already above the ceiling
        assert_eq!(next_percent(95, 10, 90), 95);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_climbs_to_ceiling_and_ends() {
        let registry = TimerRegistry::new();
        let mut simulator = ProgressSimulator::new(SimulatorConfig::default(), registry);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let start = tokio::time::Instant::now();
        let handle = simulator.start(tx, |tick| tick);

        let mut values = Vec::new();
        while let Some(tick) = rx.recv().await {
            assert_eq!(tick.handle, handle);
            values.push(tick.percent);
        }

        assert_eq!(values, vec![10, 20, 30, 40, 50, 60, 70, 80, 90]);
        assert_eq!(start.elapsed(), Duration::from_millis(2700));
        assert!(simulator.is_active(handle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_silences_ticks() {
        let registry = TimerRegistry::new();
        let mut simulator = ProgressSimulator::new(SimulatorConfig::default(), registry);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = simulator.start(tx, |tick| tick.percent);
        assert_eq!(rx.recv().await, Some(10));
        assert_eq!(rx.recv().await, Some(20));

        simulator.stop(handle);
        simulator.stop(handle);
        assert!(!simulator.is_active(handle));
        assert_eq!(simulator.active(), None);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_handle() {
        let registry = TimerRegistry::new();
        let mut simulator = ProgressSimulator::new(SimulatorConfig::default(), registry);
        let (tx, _rx) = mpsc::unbounded_channel::<ProgressTick>();

        let first = simulator.start(tx.clone(), |tick| tick);
        let second = simulator.start(tx, |tick| tick);

        assert_ne!(first, second);
        assert!(!simulator.is_active(first));
        assert!(simulator.is_active(second));
    }
}
