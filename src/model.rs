//! Simulation data types.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PERIODS_PER_DAY: usize = 288;
pub const DAYS_PER_MONTH: usize = 30;
/// Five-minute periods in a simulated month.
pub const PERIODS_PER_MONTH: usize = PERIODS_PER_DAY * DAYS_PER_MONTH;

const MINUTES_PER_SLOT: usize = 5;

/// Snapshot of a run at the end of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Date-time group of the start of the period.
    pub label: String,
    pub period: usize,
    /// Electricity plus food-waste cost of this period alone.
    pub period_cost: f64,
    /// Room temperature at the end of the period (°C).
    pub temperature: f64,
    pub kwh_used: u64,
    pub kwh_cost: f64,
    pub food_waste_cost: f64,
}

impl PeriodRecord {
    /// Column titles, in field order.
    pub const HEADER: [&'static str; 7] = [
        "label",
        "period",
        "period_cost",
        "temperature",
        "kwh_used",
        "kwh_cost",
        "food_waste_cost",
    ];
}

/// Every period record of one simulated month.
pub type SampleResult = Vec<PeriodRecord>;

/// Running totals of a run, with the budget left over.
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub kwh_used: u64,
    pub kwh_cost: f64,
    pub food_waste_cost: f64,
    pub remaining_budget: f64,
}

impl Totals {
    /// Human-readable statement of the budget balance.
    pub fn verdict(&self) -> String {
        let diff = self.remaining_budget;
        if diff > 0.0 {
            format!("spent LESS than budgeted, surplus is {diff:.2}")
        } else if diff < 0.0 {
            format!("spent MORE than budgeted, deficit is {:.2}", -diff)
        } else {
            "used the entire budget but no extra".to_string()
        }
    }
}

impl fmt::Display for Totals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "electricity = {} kWh at a cost of {:.2}, cost of wasted food = {:.2}",
            self.kwh_used, self.kwh_cost, self.food_waste_cost
        )
    }
}

/// Date-time group of the start of `period`, e.g. `"01 00:05 A SEP 2022"`.
pub fn period_label(period: usize) -> String {
    let day = period / PERIODS_PER_DAY + 1;
    let minute_of_day = (period % PERIODS_PER_DAY) * MINUTES_PER_SLOT;
    let hour = minute_of_day / 60;
    let minute = minute_of_day % 60;
    format!("{day:02} {hour:02}:{minute:02} A SEP 2022")
}

/// Scalar column of a period record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Column {
    PeriodCost,
    Temperature,
    KwhUsed,
    KwhCost,
    FoodWasteCost,
    /// Electricity cost plus food-waste cost so far.
    TotalCost,
}

impl Column {
    pub fn value(&self, record: &PeriodRecord) -> f64 {
        match self {
            Self::PeriodCost => record.period_cost,
            Self::Temperature => record.temperature,
            Self::KwhUsed => record.kwh_used as f64,
            Self::KwhCost => record.kwh_cost,
            Self::FoodWasteCost => record.food_waste_cost,
            Self::TotalCost => record.kwh_cost + record.food_waste_cost,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::PeriodCost => "period-cost",
            Self::Temperature => "temperature",
            Self::KwhUsed => "kwh-used",
            Self::KwhCost => "kwh-cost",
            Self::FoodWasteCost => "food-waste-cost",
            Self::TotalCost => "total-cost",
        }
    }

    /// Axis title for charts of this column.
    pub fn title(&self) -> &'static str {
        match self {
            Self::PeriodCost => "Cost of the final period",
            Self::Temperature => "Temperature in °C",
            Self::KwhUsed => "Electricity used in kWh",
            Self::KwhCost => "Cost of electricity",
            Self::FoodWasteCost => "Cost of wasted food",
            Self::TotalCost => "Total cost",
        }
    }
}
