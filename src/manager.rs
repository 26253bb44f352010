use crate::config::{Config, SimConfig};
use crate::engine::{Engine, RandomDoor};
use crate::export::{ChartData, write_table};
use crate::model::{Column, PERIODS_PER_MONTH, PeriodRecord};
use crate::monte_carlo::{Driver, MonteCarloResult};
use crate::prices::PriceSeries;
use crate::stats::Accumulator;
use crate::thermostat::Thermostat;
use anyhow::{Context, Result, bail};
use glob::glob;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Position of a Monte Carlo batch, saved after every sample.
#[derive(Serialize, Deserialize)]
struct Checkpoint {
    sim: SimConfig,
    rng: ChaCha12Rng,
    n_samples: usize,
    /// Length of the finals file holding exactly `n_samples` records.
    finals_len: u64,
}

impl Checkpoint {
    fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, self).context("failed to serialize checkpoint")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    fn load<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let checkpoint =
            decode::from_read(&mut reader).context("failed to deserialize checkpoint")?;
        Ok(checkpoint)
    }
}

/// Overrides of the configured thermostat for a new batch.
#[derive(Debug, Default, Clone)]
pub struct SimOverrides {
    pub smart_thermostat: Option<bool>,
    pub smart_price_max: Option<f64>,
}

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Load the price series; only commands that simulate need it.
    fn load_prices(&self) -> Result<PriceSeries> {
        PriceSeries::from_file(self.sim_dir.join(&self.cfg.prices_file), PERIODS_PER_MONTH)
            .context("failed to load prices")
    }

    pub fn create_batch(&self, overrides: &SimOverrides) -> Result<()> {
        let mut sim = self.cfg.simulation.clone();
        if let Some(smart_thermostat) = overrides.smart_thermostat {
            sim.smart_thermostat = smart_thermostat;
        }
        if let Some(smart_price_max) = overrides.smart_price_max {
            sim.smart_price_max = smart_price_max;
        }
        sim.validate().context("invalid simulation parameters")?;
        let prices = self.load_prices()?;
        let rng = self.master_rng().context("failed to seed master rng")?;

        let batch_idx = self.count_batch_dirs().context("failed to count batch dirs")?;
        let batch_dir = self.batch_dir(batch_idx);
        fs::create_dir_all(&batch_dir).with_context(|| format!("failed to create {batch_dir:?}"))?;
        log::info!("created {batch_dir:?}");

        // Every batch dir holds a checkpoint, even if its first sample fails.
        let checkpoint = Checkpoint {
            sim,
            rng,
            n_samples: 0,
            finals_len: 0,
        };
        let checkpoint_file = self.checkpoint_file(batch_idx);
        checkpoint
            .save(&checkpoint_file)
            .with_context(|| format!("failed to save {checkpoint_file:?}"))?;

        self.run_batch(batch_idx, checkpoint, &prices)
    }

    pub fn resume_batch(&self, batch_idx: usize) -> Result<()> {
        let checkpoint_file = self.checkpoint_file(batch_idx);
        let checkpoint = Checkpoint::load(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
        log::info!(
            "loaded {checkpoint_file:?} with {} samples",
            checkpoint.n_samples
        );
        let prices = self.load_prices()?;
        self.run_batch(batch_idx, checkpoint, &prices)
    }

    fn run_batch(
        &self,
        batch_idx: usize,
        checkpoint: Checkpoint,
        prices: &PriceSeries,
    ) -> Result<()> {
        let Checkpoint {
            sim,
            rng,
            mut n_samples,
            finals_len,
        } = checkpoint;
        log::info!("running {} thermostat", Thermostat::from_config(&sim).name());

        // Drop any record written after the last checkpoint.
        let finals_file = self.finals_file(batch_idx);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&finals_file)
            .with_context(|| format!("failed to open {finals_file:?}"))?;
        file.set_len(finals_len)
            .with_context(|| format!("failed to truncate {finals_file:?}"))?;
        let mut writer = BufWriter::new(file);

        let checkpoint_file = self.checkpoint_file(batch_idx);
        let mut driver =
            Driver::new(sim.clone(), prices, rng).context("failed to construct driver")?;

        driver
            .run_batch(self.cfg.batch.samples, |_, record, rng| {
                encode::write(&mut writer, record).context("failed to serialize record")?;
                writer.flush().context("failed to flush writer stream")?;
                n_samples += 1;

                let finals_len = writer
                    .get_ref()
                    .metadata()
                    .context("failed to query finals length")?
                    .len();
                Checkpoint {
                    sim: sim.clone(),
                    rng: rng.clone(),
                    n_samples,
                    finals_len,
                }
                .save(&checkpoint_file)
                .with_context(|| format!("failed to save {checkpoint_file:?}"))
            })
            .context("failed to run batch")?;

        log::info!("batch {batch_idx} holds {n_samples} samples");
        Ok(())
    }

    pub fn simulate_month(&self) -> Result<()> {
        let prices = self.load_prices()?;
        let rng = self.master_rng().context("failed to seed master rng")?;
        let door = RandomDoor::new(rng).context("failed to construct door source")?;
        let mut engine = Engine::new(&self.cfg.simulation, &prices, door)
            .context("failed to construct engine")?;

        let records = engine.run_month().context("failed to run month")?;
        let month_file = self.month_file();
        write_table(&month_file, Some(&PeriodRecord::HEADER), records)
            .context("failed to write month")?;
        log::info!("wrote {month_file:?}");
        log::debug!("{:?} after {} periods", engine.phase(), engine.state().period);

        let totals = engine.totals();
        log::info!("monthly consumption: {totals}");
        log::info!("you have {}", totals.verdict());
        Ok(())
    }

    pub fn analyze_batches(&self, columns: &[Column]) -> Result<()> {
        let n_batches = self.count_batch_dirs().context("failed to count batch dirs")?;
        if n_batches == 0 {
            bail!("no batches to analyze in {:?}", self.sim_dir);
        }

        let mut labels = Vec::with_capacity(n_batches);
        let mut results: Vec<Vec<MonteCarloResult>> = Vec::with_capacity(n_batches);
        for batch_idx in 0..n_batches {
            let (sim, finals) = self
                .load_finals(batch_idx)
                .with_context(|| format!("failed to load batch {batch_idx}"))?;
            let label = batch_label(batch_idx, &sim);
            if finals.is_empty() {
                log::warn!("{label} holds no samples, skipping");
                continue;
            }

            let batch_results: Vec<_> = columns
                .iter()
                .map(|&column| MonteCarloResult::new(column, &finals))
                .collect();
            for result in &batch_results {
                let report = result.values.iter().copied().collect::<Accumulator>().report();
                log::info!(
                    "{label}: {} estimate {:?}, {report:?}",
                    result.column.key(),
                    result.estimate()
                );
            }

            self.save_convergence(batch_idx, &batch_results)
                .context("failed to save convergence")?;

            labels.push(label);
            results.push(batch_results);
        }

        if results.is_empty() {
            bail!("no samples to analyze in {:?}", self.sim_dir);
        }

        // Batches may hold different numbers of samples; compare the common prefix.
        let periods = results
            .iter()
            .filter_map(|batch| batch.first().map(|result| result.values.len()))
            .min()
            .unwrap_or(0);
        for (i_column, column) in columns.iter().enumerate() {
            let mut chart = ChartData::new(
                &format!("Monte Carlo simulation of monthly average {}", column.key()),
                "Number of simulations",
                column.title(),
                periods,
            );
            for (label, batch) in labels.iter().zip(&results) {
                let running_avg = batch[i_column].running_avg[..periods].to_vec();
                chart.push_series(label, running_avg)?;
            }
            let chart_file = self.chart_file(*column);
            chart
                .save(&chart_file)
                .with_context(|| format!("failed to save {chart_file:?}"))?;
            log::info!("wrote {chart_file:?}");
        }

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for pattern in ["batch-*", "convergence-*.json", "month.csv"] {
            for path in self.glob_paths(pattern)? {
                let removed = if path.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                removed.with_context(|| format!("failed to remove {path:?}"))?;
                log::info!("removed {path:?}");
            }
        }
        Ok(())
    }

    fn master_rng(&self) -> Result<ChaCha12Rng> {
        let rng = match self.cfg.batch.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };
        Ok(rng)
    }

    fn load_finals(&self, batch_idx: usize) -> Result<(SimConfig, Vec<PeriodRecord>)> {
        let checkpoint_file = self.checkpoint_file(batch_idx);
        let checkpoint = Checkpoint::load(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
        if checkpoint.n_samples == 0 {
            return Ok((checkpoint.sim, Vec::new()));
        }

        let finals_file = self.finals_file(batch_idx);
        let file =
            File::open(&finals_file).with_context(|| format!("failed to open {finals_file:?}"))?;
        let mut reader = BufReader::new(file);

        let mut finals = Vec::with_capacity(checkpoint.n_samples);
        for i_sample in 0..checkpoint.n_samples {
            let record: PeriodRecord = decode::from_read(&mut reader)
                .with_context(|| format!("failed to read sample {i_sample}"))?;
            finals.push(record);
        }
        Ok((checkpoint.sim, finals))
    }

    fn save_convergence(&self, batch_idx: usize, results: &[MonteCarloResult]) -> Result<()> {
        let mut header = vec!["sample".to_string()];
        for result in results {
            header.push(result.column.key().to_string());
            header.push(format!("{}-avg", result.column.key()));
        }
        let header: Vec<&str> = header.iter().map(String::as_str).collect();

        let n_samples = results.first().map_or(0, |result| result.values.len());
        let rows = (0..n_samples).map(|i_sample| {
            let mut row = vec![(i_sample + 1) as f64];
            for result in results {
                row.push(result.values[i_sample]);
                row.push(result.running_avg[i_sample]);
            }
            row
        });

        let file = self.batch_dir(batch_idx).join("convergence.csv");
        write_table(&file, Some(header.as_slice()), rows)?;
        log::info!("wrote {file:?}");
        Ok(())
    }

    fn glob_paths(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join(pattern);
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let paths = glob(pattern)
            .with_context(|| format!("failed to glob {pattern:?}"))?
            .filter_map(Result::ok)
            .collect();
        Ok(paths)
    }

    fn count_batch_dirs(&self) -> Result<usize> {
        let count = self
            .glob_paths("batch-*")?
            .into_iter()
            .filter(|p| p.is_dir())
            .count();
        Ok(count)
    }

    fn batch_dir(&self, batch_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("batch-{batch_idx:04}"))
    }

    fn checkpoint_file(&self, batch_idx: usize) -> PathBuf {
        self.batch_dir(batch_idx).join("checkpoint.msgpack")
    }

    fn finals_file(&self, batch_idx: usize) -> PathBuf {
        self.batch_dir(batch_idx).join("finals.msgpack")
    }

    fn month_file(&self) -> PathBuf {
        self.sim_dir.join("month.csv")
    }

    fn chart_file(&self, column: Column) -> PathBuf {
        self.sim_dir.join(format!("convergence-{}.json", column.key()))
    }
}

fn batch_label(batch_idx: usize, sim: &SimConfig) -> String {
    if sim.smart_thermostat {
        format!(
            "batch {batch_idx} (smart thermostat, max price {:.2})",
            sim.smart_price_max
        )
    } else {
        format!("batch {batch_idx} (simple thermostat)")
    }
}
