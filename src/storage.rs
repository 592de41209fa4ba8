//! Battery storage owned by a structure.

/// An energy storage unit with rate limits and conversion losses.
///
/// `charge` and `discharge` work in kWh over a tick of `hours`; the rate
/// limits cap the energy moved per tick at `max_*_kw × hours`.
///
/// # Invariant
/// `0 ≤ stored_kwh ≤ capacity_kwh` after every operation.
#[derive(Debug, Clone)]
pub struct StorageUnit {
    capacity_kwh: f64,
    stored_kwh: f64,
    max_charge_kw: f64,
    max_discharge_kw: f64,
    charge_efficiency: f64,
    discharge_efficiency: f64,
}

impl StorageUnit {
    /// Creates a lossless storage unit.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Capacity in kWh (must be > 0)
    /// * `stored_kwh` - Initial energy, clamped to `[0, capacity]`
    /// * `max_charge_kw` - Maximum charging power in kW
    /// * `max_discharge_kw` - Maximum discharging power in kW
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero/negative or a rate is negative.
    pub fn new(
        capacity_kwh: f64,
        stored_kwh: f64,
        max_charge_kw: f64,
        max_discharge_kw: f64,
    ) -> Self {
        assert!(capacity_kwh > 0.0 && capacity_kwh.is_finite());
        assert!(max_charge_kw >= 0.0 && max_discharge_kw >= 0.0);

        let stored_kwh = if stored_kwh.is_finite() {
            stored_kwh.clamp(0.0, capacity_kwh)
        } else {
            0.0
        };
        Self {
            capacity_kwh,
            stored_kwh,
            max_charge_kw,
            max_discharge_kw,
            charge_efficiency: 1.0,
            discharge_efficiency: 1.0,
        }
    }

    /// Sets conversion efficiencies.
    ///
    /// # Panics
    ///
    /// Panics if either efficiency is outside `(0, 1]`.
    pub fn with_efficiencies(mut self, charge: f64, discharge: f64) -> Self {
        assert!(charge > 0.0 && charge <= 1.0);
        assert!(discharge > 0.0 && discharge <= 1.0);
        self.charge_efficiency = charge;
        self.discharge_efficiency = discharge;
        self
    }

    pub fn stored_kwh(&self) -> f64 {
        self.stored_kwh
    }

    /// Usable capacity (kWh).
    pub fn capacity_kwh(&self) -> f64 {
        self.capacity_kwh
    }

    pub fn max_charge_kw(&self) -> f64 {
        self.max_charge_kw
    }

    pub fn max_discharge_kw(&self) -> f64 {
        self.max_discharge_kw
    }

    pub fn charge_efficiency(&self) -> f64 {
        self.charge_efficiency
    }

    pub fn discharge_efficiency(&self) -> f64 {
        self.discharge_efficiency
    }

    /// Stored energy as a fraction of capacity.
    pub fn state_of_charge(&self) -> f64 {
        self.stored_kwh / self.capacity_kwh
    }

    /// Returns `true` when the unit is within 1% of full.
    pub fn is_nearly_full(&self) -> bool {
        self.stored_kwh >= self.capacity_kwh * 0.99
    }

    /// Accepts up to `excess_kwh` of grid energy over `hours`.
    ///
    /// # Returns
    ///
    /// Energy drawn from the grid (kWh); the unit stores that times the
    /// charge efficiency.
    pub fn charge(&mut self, excess_kwh: f64, hours: f64) -> f64 {
        if !valid_request(excess_kwh, hours) {
            return 0.0;
        }
        let headroom = (self.capacity_kwh - self.stored_kwh).max(0.0);
        let headroom_limit = headroom / self.charge_efficiency;
        let accepted = excess_kwh.min(self.max_charge_kw * hours);

        if accepted >= headroom_limit {
            self.stored_kwh = self.capacity_kwh;
            headroom_limit
        } else {
            self.stored_kwh = (self.stored_kwh + accepted * self.charge_efficiency)
                .clamp(0.0, self.capacity_kwh);
            accepted
        }
    }

    /// Delivers up to `needed_kwh` over `hours`.
    ///
    /// # Returns
    ///
    /// Energy delivered to the grid (kWh).
    pub fn discharge(&mut self, needed_kwh: f64, hours: f64) -> f64 {
        if !valid_request(needed_kwh, hours) {
            return 0.0;
        }
        let available = self.stored_kwh * self.discharge_efficiency;
        let delivered = needed_kwh
            .min(self.max_discharge_kw * hours)
            .min(available);

        if delivered >= available {
            self.stored_kwh = 0.0;
        } else {
            self.stored_kwh = (self.stored_kwh - delivered / self.discharge_efficiency)
                .clamp(0.0, self.capacity_kwh);
        }
        delivered.max(0.0)
    }
}

fn valid_request(kwh: f64, hours: f64) -> bool {
    kwh.is_finite() && kwh > 0.0 && hours.is_finite() && hours > 0.0
}
