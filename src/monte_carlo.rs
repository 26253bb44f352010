use crate::config::SimConfig;
use crate::engine::{Engine, RandomDoor};
use crate::error::SimError;
use crate::model::{Column, PeriodRecord, SampleResult};
use crate::prices::PriceSeries;
use anyhow::{Context, Result, bail};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Monte Carlo driver.
///
/// Runs independent months that share one price series. Every sample gets
/// its own generator, seeded from the driver's master generator, so a seeded
/// batch is reproducible sample by sample.
pub struct Driver<'a> {
    cfg: SimConfig,
    prices: &'a PriceSeries,
    rng: ChaCha12Rng,
}

impl<'a> Driver<'a> {
    pub fn new(cfg: SimConfig, prices: &'a PriceSeries, rng: ChaCha12Rng) -> Result<Self> {
        cfg.validate().context("invalid simulation parameters")?;
        Ok(Self { cfg, prices, rng })
    }

    /// Simulate one month with a fresh engine.
    pub fn run_sample(&mut self) -> Result<SampleResult> {
        let rng = ChaCha12Rng::seed_from_u64(self.rng.next_u64());
        let door = RandomDoor::new(rng).context("failed to construct door source")?;
        let mut engine =
            Engine::new(&self.cfg, self.prices, door).context("failed to construct engine")?;
        engine.run_month().context("failed to run month")?;
        Ok(engine.into_records())
    }

    /// Simulate `samples` months and return the final record of each.
    ///
    /// `on_sample` receives the index and final record of every completed
    /// sample before the next one starts, along with the master generator
    /// positioned after that sample.
    pub fn run_batch<F>(&mut self, samples: usize, mut on_sample: F) -> Result<Vec<PeriodRecord>>
    where
        F: FnMut(usize, &PeriodRecord, &ChaCha12Rng) -> Result<()>,
    {
        if samples == 0 {
            bail!(SimError::Configuration(
                "number of samples must be positive".to_string()
            ));
        }

        let mut finals = Vec::with_capacity(samples);
        for i_sample in 0..samples {
            let start = Instant::now();

            let final_record = self
                .run_sample()
                .with_context(|| format!("failed to run sample {i_sample}"))?
                .pop()
                .context("sample produced no records")?;
            on_sample(i_sample, &final_record, &self.rng)
                .with_context(|| format!("failed to handle sample {i_sample}"))?;
            log::debug!("{final_record:?}");

            let elapsed = start.elapsed().as_secs_f64();
            let eta = (samples - (i_sample + 1)) as f64 * elapsed / 60.0;
            log::info!(
                "simulated sample {:02} of {samples} in {elapsed:.1} s - ETA: {eta:.2} min",
                i_sample + 1
            );

            finals.push(final_record);
        }

        Ok(finals)
    }
}

/// Cumulative mean of `vals` at every index.
pub fn running_average(vals: &[f64]) -> Vec<f64> {
    let mut avgs: Vec<f64> = Vec::with_capacity(vals.len());
    for (i_val, &val) in vals.iter().enumerate() {
        let avg = match avgs.last() {
            Some(&prev) => (prev * i_val as f64 + val) / (i_val + 1) as f64,
            None => val,
        };
        avgs.push(avg);
    }
    avgs
}

/// One column of a batch's final records and its running average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub column: Column,
    pub values: Vec<f64>,
    pub running_avg: Vec<f64>,
}

impl MonteCarloResult {
    pub fn new(column: Column, finals: &[PeriodRecord]) -> Self {
        let values: Vec<f64> = finals.iter().map(|record| column.value(record)).collect();
        let running_avg = running_average(&values);
        Self {
            column,
            values,
            running_avg,
        }
    }

    /// Running average after the last sample.
    pub fn estimate(&self) -> Option<f64> {
        self.running_avg.last().copied()
    }
}
