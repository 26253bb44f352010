use crate::error::SimError;
use crate::prices::IndexPolicy;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Price file, relative to the simulation directory.
    #[serde(default = "default_prices_file")]
    pub prices_file: String,

    /// Parameters of every simulated month.
    pub simulation: SimConfig,

    /// Monte Carlo batch parameters.
    pub batch: BatchConfig,
}

/// Parameters of a single simulated month.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Use the price-aware thermostat instead of the simple one.
    pub smart_thermostat: bool,
    /// Price below which the smart thermostat may run inside its band.
    pub smart_price_max: f64,
    /// Resolution of the price lookup before the first period.
    #[serde(default)]
    pub index_policy: IndexPolicy,
    /// Monthly budget the costs are reported against.
    #[serde(default = "default_budget")]
    pub budget: f64,
}

/// Monte Carlo batch parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Samples simulated per `create` or `resume`.
    pub samples: usize,
    /// Master seed; drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_prices_file() -> String {
    "prices.csv".to_string()
}

fn default_budget() -> f64 {
    12000.0
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;
        config.validate().context("failed to validate config")?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.simulation
            .validate()
            .context("invalid simulation parameters")?;
        check_num(self.batch.samples, 1..=100_000).context("invalid number of samples")?;
        Ok(())
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.smart_price_max.is_finite() {
            bail!(SimError::Configuration(format!(
                "price threshold must be finite, but is {}",
                self.smart_price_max
            )));
        }
        check_num(self.budget, 0.0..f64::MAX).context("invalid budget")?;
        Ok(())
    }
}

/// Fail with a [`SimError::Configuration`] unless `num` lies in `range`.
pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!(SimError::Configuration(format!(
            "number must be in the range {range:?}, but is {num:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[simulation]
smart_thermostat = true
smart_price_max = 2.10

[batch]
samples = 50
"#;

    fn root_error(err: &anyhow::Error) -> Option<&SimError> {
        err.chain().find_map(|cause| cause.downcast_ref::<SimError>())
    }

    #[test]
    fn defaults_are_filled_in() {
        let cfg = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(cfg.prices_file, "prices.csv");
        assert_eq!(cfg.simulation.index_policy, IndexPolicy::Clamp);
        assert_eq!(cfg.simulation.budget, 12000.0);
        assert_eq!(cfg.batch.seed, None);
        assert!(cfg.simulation.smart_thermostat);
    }

    #[test]
    fn full_config_is_parsed() {
        let cfg = Config::from_toml(
            r#"
prices_file = "elpris.csv"

[simulation]
smart_thermostat = false
smart_price_max = 1.5
index_policy = "wrap"
budget = 9000.0

[batch]
samples = 3
seed = 7
"#,
        )
        .unwrap();
        assert_eq!(cfg.prices_file, "elpris.csv");
        assert_eq!(cfg.simulation.index_policy, IndexPolicy::Wrap);
        assert_eq!(cfg.simulation.budget, 9000.0);
        assert_eq!(cfg.batch.samples, 3);
        assert_eq!(cfg.batch.seed, Some(7));
    }

    #[test]
    fn zero_samples_is_a_configuration_error() {
        let err = Config::from_toml(&MINIMAL.replace("samples = 50", "samples = 0")).unwrap_err();
        assert!(matches!(root_error(&err), Some(SimError::Configuration(_))));
    }

    #[test]
    fn invalid_price_threshold_is_a_configuration_error() {
        let cfg = SimConfig {
            smart_thermostat: true,
            smart_price_max: f64::NAN,
            index_policy: IndexPolicy::Clamp,
            budget: 12000.0,
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(root_error(&err), Some(SimError::Configuration(_))));
    }

    #[test]
    fn negative_budget_is_rejected() {
        let err = Config::from_toml(&MINIMAL.replace(
            "smart_price_max = 2.10",
            "smart_price_max = 2.10\nbudget = -1.0",
        ))
        .unwrap_err();
        assert!(matches!(root_error(&err), Some(SimError::Configuration(_))));
    }

    #[test]
    fn unknown_index_policy_is_rejected() {
        let err = Config::from_toml(&MINIMAL.replace(
            "smart_price_max = 2.10",
            "smart_price_max = 2.10\nindex_policy = \"modulo\"",
        ));
        assert!(err.is_err());
    }
}
