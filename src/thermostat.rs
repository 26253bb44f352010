use crate::config::SimConfig;
use crate::error::SimError;
use crate::prices::{IndexPolicy, PriceSeries};

/// Target temperature of the simple thermostat (°C).
pub const GOAL_TEMP: f64 = 5.0;
/// Above this the smart thermostat always cools, to keep food from rotting (°C).
pub const SMART_TEMP_MAX: f64 = 6.0;
/// Below this the smart thermostat never cools, to avoid freezer burn (°C).
pub const SMART_TEMP_MIN: f64 = 4.0;

/// Compressor control policy, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Thermostat {
    /// Runs whenever the room is warmer than the goal.
    Simple { goal_temp: f64 },

    /// Keeps the room inside a band and, within it, only runs while the
    /// previous period's price is below `price_max`.
    SmartPrice {
        temp_max: f64,
        temp_min: f64,
        price_max: f64,
        index_policy: IndexPolicy,
    },
}

impl Thermostat {
    pub fn from_config(cfg: &SimConfig) -> Self {
        if cfg.smart_thermostat {
            Self::SmartPrice {
                temp_max: SMART_TEMP_MAX,
                temp_min: SMART_TEMP_MIN,
                price_max: cfg.smart_price_max,
                index_policy: cfg.index_policy,
            }
        } else {
            Self::Simple {
                goal_temp: GOAL_TEMP,
            }
        }
    }

    /// Decide whether the compressor runs at temperature `temp` during `period`.
    pub fn compressor_on(
        &self,
        temp: f64,
        period: usize,
        prices: &PriceSeries,
    ) -> Result<bool, SimError> {
        match *self {
            Self::Simple { goal_temp } => Ok(temp > goal_temp),
            Self::SmartPrice {
                temp_max,
                temp_min,
                price_max,
                index_policy,
            } => {
                if temp > temp_max {
                    return Ok(true);
                }
                if temp < temp_min {
                    return Ok(false);
                }
                // Price of the previous period, one behind the billed price.
                let price = prices.at(period as i64 - 1, index_policy)?;
                Ok(price < price_max)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple { .. } => "simple",
            Self::SmartPrice { .. } => "smart",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PERIODS_PER_MONTH;

    fn smart(price_max: f64, index_policy: IndexPolicy) -> Thermostat {
        Thermostat::SmartPrice {
            temp_max: SMART_TEMP_MAX,
            temp_min: SMART_TEMP_MIN,
            price_max,
            index_policy,
        }
    }

    fn flat_prices(price: f64) -> PriceSeries {
        PriceSeries::new(vec![price; PERIODS_PER_MONTH], PERIODS_PER_MONTH).unwrap()
    }

    #[test]
    fn simple_runs_only_above_goal() {
        let prices = flat_prices(1.0);
        let thermostat = Thermostat::Simple {
            goal_temp: GOAL_TEMP,
        };
        assert_eq!(thermostat.compressor_on(5.0, 0, &prices), Ok(false));
        assert_eq!(thermostat.compressor_on(5.0001, 0, &prices), Ok(true));
        assert_eq!(thermostat.compressor_on(-3.0, 10, &prices), Ok(false));
    }

    #[test]
    fn smart_protects_the_band_regardless_of_price() {
        let prices = flat_prices(100.0);
        let thermostat = smart(2.10, IndexPolicy::Clamp);
        assert_eq!(thermostat.compressor_on(6.01, 5, &prices), Ok(true));
        assert_eq!(thermostat.compressor_on(3.99, 5, &prices), Ok(false));
        assert_eq!(thermostat.compressor_on(5.0, 5, &prices), Ok(false));
    }

    #[test]
    fn smart_runs_every_period_when_power_is_cheap() {
        let prices = flat_prices(1.0);
        let thermostat = smart(2.10, IndexPolicy::Clamp);
        for period in 0..PERIODS_PER_MONTH {
            for temp in [4.0, 5.0, 6.0] {
                assert_eq!(thermostat.compressor_on(temp, period, &prices), Ok(true));
            }
        }
    }

    #[test]
    fn smart_reads_the_previous_period_price() {
        let mut values = vec![1.0; PERIODS_PER_MONTH];
        values[9] = 3.0;
        let prices = PriceSeries::new(values, PERIODS_PER_MONTH).unwrap();
        let thermostat = smart(2.10, IndexPolicy::Strict);
        assert_eq!(thermostat.compressor_on(5.0, 9, &prices), Ok(true));
        assert_eq!(thermostat.compressor_on(5.0, 10, &prices), Ok(false));
    }

    #[test]
    fn first_period_lookup_follows_index_policy() {
        let mut values = vec![1.0; PERIODS_PER_MONTH];
        values[PERIODS_PER_MONTH - 1] = 3.0;
        let prices = PriceSeries::new(values, PERIODS_PER_MONTH).unwrap();

        let wrap = smart(2.10, IndexPolicy::Wrap);
        assert_eq!(wrap.compressor_on(5.0, 0, &prices), Ok(false));

        let clamp = smart(2.10, IndexPolicy::Clamp);
        assert_eq!(clamp.compressor_on(5.0, 0, &prices), Ok(true));

        let strict = smart(2.10, IndexPolicy::Strict);
        assert_eq!(
            strict.compressor_on(5.0, 0, &prices),
            Err(SimError::IndexPolicy {
                index: -1,
                len: PERIODS_PER_MONTH
            })
        );
        // Outside the band no price is consulted.
        assert_eq!(strict.compressor_on(7.0, 0, &prices), Ok(true));
    }

    #[test]
    fn built_from_config() {
        let mut cfg = SimConfig {
            smart_thermostat: false,
            smart_price_max: 2.10,
            index_policy: IndexPolicy::Wrap,
            budget: 12000.0,
        };
        assert_eq!(Thermostat::from_config(&cfg).name(), "simple");

        cfg.smart_thermostat = true;
        assert_eq!(
            Thermostat::from_config(&cfg),
            smart(2.10, IndexPolicy::Wrap)
        );
    }
}
