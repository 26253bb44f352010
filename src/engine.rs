use crate::config::SimConfig;
use crate::error::SimError;
use crate::ledger::Ledger;
use crate::model::{PERIODS_PER_MONTH, PeriodRecord, SampleResult, Totals, period_label};
use crate::prices::{IndexPolicy, PriceSeries};
use crate::thermal;
use crate::thermostat::Thermostat;
use anyhow::Result;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Room temperature at the start of every run (°C).
pub const INITIAL_TEMP: f64 = 5.0;

/// Draw on which the door counts as open.
pub const DOOR_OPEN_DRAW: u32 = 10;

/// Source of the per-period door draws, uniform integers in `1..=DOOR_OPEN_DRAW`.
pub trait DoorSource {
    fn draw(&mut self) -> u32;
}

/// Door draws taken from a random number generator.
pub struct RandomDoor<R> {
    rng: R,
    dist: Uniform<u32>,
}

impl<R: Rng> RandomDoor<R> {
    pub fn new(rng: R) -> Result<Self> {
        let dist = Uniform::new_inclusive(1, DOOR_OPEN_DRAW)?;
        Ok(Self { rng, dist })
    }
}

impl<R: Rng> DoorSource for RandomDoor<R> {
    fn draw(&mut self) -> u32 {
        self.dist.sample(&mut self.rng)
    }
}

/// Lifecycle of an engine. There is no way back to `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    Completed,
}

/// Mutable state of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// Room temperature at the end of the last simulated period (°C).
    pub temp_last: f64,
    /// Next period to simulate.
    pub period: usize,
    pub ledger: Ledger,
}

impl State {
    fn new() -> Self {
        Self {
            temp_last: INITIAL_TEMP,
            period: 0,
            ledger: Ledger::default(),
        }
    }
}

/// Simulation engine.
///
/// Holds the thermostat, the shared price series, the door source and the
/// state of one run. Each engine simulates exactly one month.
pub struct Engine<'a, D> {
    thermostat: Thermostat,
    prices: &'a PriceSeries,
    door: D,
    budget: f64,
    state: State,
    phase: Phase,
    records: SampleResult,
}

impl<'a, D: DoorSource> Engine<'a, D> {
    /// Create an engine in its initial state.
    ///
    /// # Errors
    /// Fails if `prices` cannot cover a whole month.
    pub fn new(cfg: &SimConfig, prices: &'a PriceSeries, door: D) -> Result<Self, SimError> {
        if prices.len() < PERIODS_PER_MONTH {
            return Err(SimError::DataSource(format!(
                "series must contain at least {PERIODS_PER_MONTH} prices, but contains {}",
                prices.len()
            )));
        }
        Ok(Self {
            thermostat: Thermostat::from_config(cfg),
            prices,
            door,
            budget: cfg.budget,
            state: State::new(),
            phase: Phase::Created,
            records: Vec::with_capacity(PERIODS_PER_MONTH),
        })
    }

    /// Simulate every period of the month and return the records.
    ///
    /// # Errors
    /// Fails on a second call, or if a price lookup is rejected by the index
    /// policy.
    pub fn run_month(&mut self) -> Result<&[PeriodRecord], SimError> {
        if self.phase != Phase::Created {
            return Err(SimError::EngineCompleted);
        }
        self.phase = Phase::Running;

        while self.state.period < PERIODS_PER_MONTH {
            let record = self.perform_period()?;
            self.records.push(record);
            self.state.period += 1;
        }

        self.phase = Phase::Completed;
        Ok(&self.records)
    }

    fn perform_period(&mut self) -> Result<PeriodRecord, SimError> {
        let period = self.state.period;
        let thermostat = self.thermostat;
        let prices = self.prices;

        // The door stays as drawn for the whole period.
        let door_open = self.door.draw() == DOOR_OPEN_DRAW;

        let temp = thermal::integrate_period(self.state.temp_last, door_open, |temp| {
            thermostat.compressor_on(temp, period, prices)
        })?;
        self.state.temp_last = temp;

        // Billing takes one decision on the temperature at the end of the period.
        let comp_on = thermostat.compressor_on(temp, period, prices)?;
        let price = prices.at(period as i64, IndexPolicy::Strict)?;
        let ledger = &mut self.state.ledger;
        let electricity = ledger.bill_electricity(comp_on, price);
        let wasted = ledger.record_food_waste(temp);

        Ok(PeriodRecord {
            label: period_label(period),
            period,
            period_cost: electricity + wasted,
            temperature: temp,
            kwh_used: ledger.kwh_used,
            kwh_cost: ledger.kwh_cost,
            food_waste_cost: ledger.food_waste_cost,
        })
    }

    pub fn totals(&self) -> Totals {
        let ledger = &self.state.ledger;
        Totals {
            kwh_used: ledger.kwh_used,
            kwh_cost: ledger.kwh_cost,
            food_waste_cost: ledger.food_waste_cost,
            remaining_budget: self.budget - ledger.total_cost(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Give up the engine and keep its records.
    pub fn into_records(self) -> SampleResult {
        self.records
    }
}
