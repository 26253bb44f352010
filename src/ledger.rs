use serde::{Deserialize, Serialize};

/// Food below this temperature starts to suffer freezer burn (°C).
pub const WASTE_TEMP_LOW: f64 = 3.5;
/// Food at or above this temperature starts to rot (°C).
pub const WASTE_TEMP_HIGH: f64 = 6.5;

/// Cost of food wasted during one period at temperature `temp`.
///
/// Zero on `[WASTE_TEMP_LOW, WASTE_TEMP_HIGH)`. Outside the band the cost
/// follows empirical penalty curves and is never clamped.
pub fn food_waste(temp: f64) -> f64 {
    if temp < WASTE_TEMP_LOW {
        4.39_f64.powf(-0.49 * temp)
    } else if temp >= WASTE_TEMP_HIGH {
        0.11_f64.powf(0.31 * temp)
    } else {
        0.0
    }
}

/// Running electricity and food-waste totals of one run.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Periods billed with the compressor running (one kWh each).
    pub kwh_used: u64,
    pub kwh_cost: f64,
    pub food_waste_cost: f64,
}

impl Ledger {
    /// Bill one kWh at `price` if the compressor runs; return the increment.
    pub fn bill_electricity(&mut self, comp_on: bool, price: f64) -> f64 {
        if !comp_on {
            return 0.0;
        }
        self.kwh_used += 1;
        self.kwh_cost += price;
        price
    }

    /// Book the food wasted at `temp`; return the increment.
    pub fn record_food_waste(&mut self, temp: f64) -> f64 {
        let wasted = food_waste(temp);
        self.food_waste_cost += wasted;
        wasted
    }

    pub fn total_cost(&self) -> f64 {
        self.kwh_cost + self.food_waste_cost
    }
}
