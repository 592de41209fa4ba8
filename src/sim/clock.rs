/// Millisols in one sol.
pub const MILLISOLS_PER_SOL: f64 = 1000.0;

/// Earth hours in one millisol (one sol is 24.6597 h).
pub const HOURS_PER_MILLISOL: f64 = 0.024_659_7;

/// One advance of simulated time handed to the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockPulse {
    /// Tick index, starting at 0.
    pub tick: usize,
    /// Simulated time covered by this pulse (millisols).
    pub elapsed_millisols: f64,
    /// Absolute mission time at the start of the pulse (millisols since landing).
    pub mission_millisols: f64,
}

impl ClockPulse {
    /// Creates a pulse covering `elapsed_millisols` starting at `mission_millisols`.
    pub fn new(tick: usize, elapsed_millisols: f64, mission_millisols: f64) -> Self {
        Self {
            tick,
            elapsed_millisols,
            mission_millisols,
        }
    }

    /// Mission sol, counting from 1.
    pub fn mission_sol(&self) -> u32 {
        (self.mission_millisols / MILLISOLS_PER_SOL).floor() as u32 + 1
    }

    /// Millisol within the current sol, in `[0, 1000)`.
    pub fn millisol_of_sol(&self) -> f64 {
        self.mission_millisols.rem_euclid(MILLISOLS_PER_SOL)
    }

    /// Elapsed time in Earth hours.
    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed_millisols * HOURS_PER_MILLISOL
    }

    /// Elapsed time in sols.
    pub fn elapsed_sols(&self) -> f64 {
        self.elapsed_millisols / MILLISOLS_PER_SOL
    }
}

/// A simulation clock that advances in fixed millisol increments.
///
/// # Examples
///
/// ```
/// use colony_grid::sim::clock::MarsClock;
///
/// let mut clock = MarsClock::new(250.0, 3);
/// let mut ticks = Vec::new();
///
/// clock.run(|pulse| ticks.push(pulse.mission_millisols));
/// assert_eq!(ticks, vec![0.0, 250.0, 500.0]);
/// ```
#[derive(Debug, Clone)]
pub struct MarsClock {
    /// Millisols covered by each tick.
    millisols_per_tick: f64,
    /// Current tick of the simulation.
    current: usize,
    /// Total ticks to run.
    total: usize,
}

impl MarsClock {
    /// Creates a clock that runs `total` ticks of `millisols_per_tick` each.
    ///
    /// # Panics
    ///
    /// Panics if `millisols_per_tick` is not a positive finite number.
    pub fn new(millisols_per_tick: f64, total: usize) -> Self {
        assert!(
            millisols_per_tick.is_finite() && millisols_per_tick > 0.0,
            "millisols_per_tick must be > 0"
        );
        Self {
            millisols_per_tick,
            current: 0,
            total,
        }
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some(pulse)` - The pulse for the tick just started
    /// * `None` - If the clock has reached its total ticks
    pub fn tick(&mut self) -> Option<ClockPulse> {
        if self.current < self.total {
            let tick = self.current;
            self.current += 1;
            Some(ClockPulse::new(
                tick,
                self.millisols_per_tick,
                tick as f64 * self.millisols_per_tick,
            ))
        } else {
            None
        }
    }

    /// Runs a function for each remaining tick.
    pub fn run<F>(&mut self, mut f: F)
    where
        F: FnMut(ClockPulse),
    {
        while let Some(pulse) = self.tick() {
            f(pulse);
        }
    }

    /// Millisols covered by each tick.
    pub fn millisols_per_tick(&self) -> f64 {
        self.millisols_per_tick
    }

    /// Total number of ticks.
    pub fn total_ticks(&self) -> usize {
        self.total
    }

    /// Resets the clock to the first tick.
    pub fn reset(&mut self) {
        self.current = 0;
    }
}
