//! Simulation engine that drives the clock, weather and power grid.

use tracing::{debug, info};

use crate::weather::WeatherProvider;

use super::clock::{ClockPulse, MarsClock};
use super::event::PowerEvent;
use super::grid::PowerGrid;
use super::types::{SimConfig, TickReport};

/// Simulation engine owning the grid, its clock and a weather provider.
///
/// Generic over `W: WeatherProvider` for static dispatch.
pub struct Engine<W: WeatherProvider> {
    config: SimConfig,
    grid: PowerGrid,
    clock: MarsClock,
    weather: W,
    log_events: bool,
}

impl<W: WeatherProvider> Engine<W> {
    /// Creates a new simulation engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulation configuration
    /// * `grid` - Settlement grid with its structures and resources
    /// * `weather` - Environment provider sampled once per tick
    pub fn new(config: SimConfig, grid: PowerGrid, weather: W) -> Self {
        let clock = MarsClock::new(config.millisols_per_tick, config.total_ticks());
        Self {
            config,
            grid,
            clock,
            weather,
            log_events: true,
        }
    }

    /// Whether drained grid events are written to the tracing subscriber.
    ///
    /// When disabled, events stay queued on the grid for the host to drain.
    pub fn with_event_logging(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    /// Balances the grid for one pulse and returns the tick record.
    pub fn step(&mut self, pulse: &ClockPulse) -> TickReport {
        let env = self.weather.sample(pulse);
        let report = self.grid.time_passing(pulse, &env);

        if self.log_events {
            self.grid.drain_events().iter().for_each(PowerEvent::log);
        }
        debug!(
            tick = report.tick,
            sol = report.mission_sol,
            stages = %report.stage_list(),
            "stages run"
        );
        report
    }

    /// Runs every remaining tick and returns the complete report vector.
    pub fn run(&mut self) -> Vec<TickReport> {
        let mut reports = Vec::with_capacity(self.clock.total_ticks());
        while let Some(pulse) = self.clock.tick() {
            reports.push(self.step(&pulse));
        }
        info!(
            ticks = reports.len(),
            sols = self.config.sols,
            "simulation complete"
        );
        reports
    }

    pub fn grid(&self) -> &PowerGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut PowerGrid {
        &mut self.grid
    }

    pub fn weather(&self) -> &W {
        &self.weather
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
