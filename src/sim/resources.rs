//! Settlement bulk store of combustion fuel and oxidizer.

/// Amount-resource store holding methane and oxygen (kg).
///
/// The power subsystem only withdraws; the host refills via [`ResourceStore::deposit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceStore {
    methane_kg: f64,
    oxygen_kg: f64,
}

impl ResourceStore {
    /// Creates a store with the given amounts (negative values are treated as empty).
    pub fn new(methane_kg: f64, oxygen_kg: f64) -> Self {
        Self {
            methane_kg: sanitize(methane_kg),
            oxygen_kg: sanitize(oxygen_kg),
        }
    }

    pub fn methane_kg(&self) -> f64 {
        self.methane_kg
    }

    pub fn oxygen_kg(&self) -> f64 {
        self.oxygen_kg
    }

    /// Adds resources to the store.
    pub fn deposit(&mut self, methane_kg: f64, oxygen_kg: f64) {
        self.methane_kg += sanitize(methane_kg);
        self.oxygen_kg += sanitize(oxygen_kg);
    }

    /// Withdraws up to `fuel_kg` of methane together with `ratio` times as much oxygen.
    ///
    /// The ratio is preserved when the store is short of either resource.
    ///
    /// # Returns
    ///
    /// `(methane_kg, oxygen_kg)` actually withdrawn.
    pub fn withdraw_paired(&mut self, fuel_kg: f64, ratio: f64) -> (f64, f64) {
        let fuel_kg = sanitize(fuel_kg);
        if fuel_kg <= 0.0 || ratio <= 0.0 || !ratio.is_finite() {
            return (0.0, 0.0);
        }
        let fuel = fuel_kg.min(self.methane_kg).min(self.oxygen_kg / ratio);
        let oxidizer = fuel * ratio;
        self.methane_kg = (self.methane_kg - fuel).max(0.0);
        self.oxygen_kg = (self.oxygen_kg - oxidizer).max(0.0);
        (fuel, oxidizer)
    }
}

fn sanitize(kg: f64) -> f64 {
    if kg.is_finite() { kg.max(0.0) } else { 0.0 }
}
