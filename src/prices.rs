use crate::error::SimError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Read, path::Path};

/// How a price lookup before the first period is resolved.
///
/// The smart thermostat reads the price of the previous period, so the very
/// first period asks for index `-1`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPolicy {
    /// Negative indices count from the end of the series.
    Wrap,
    /// Negative indices resolve to the first price.
    #[default]
    Clamp,
    /// Negative indices are an error.
    Strict,
}

/// Electricity prices indexed by period.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    prices: Vec<f64>,
}

impl PriceSeries {
    /// Build a series, requiring at least `min_len` finite non-negative prices.
    pub fn new(prices: Vec<f64>, min_len: usize) -> Result<Self, SimError> {
        if prices.len() < min_len {
            return Err(SimError::DataSource(format!(
                "series must contain at least {min_len} prices, but contains {}",
                prices.len()
            )));
        }
        if let Some((row, price)) = prices
            .iter()
            .enumerate()
            .find(|(_, price)| !price.is_finite() || **price < 0.0)
        {
            return Err(SimError::DataSource(format!(
                "price must be finite and non-negative, but is {price} at row {row}"
            )));
        }
        Ok(Self { prices })
    }

    /// Load a series from a delimited file with an index column and a price column.
    pub fn from_file<P: AsRef<Path>>(file: P, min_len: usize) -> Result<Self> {
        let file = file.as_ref();
        let reader = File::open(file)
            .map_err(|err| SimError::DataSource(format!("failed to open {file:?}: {err}")))?;
        let series = Self::from_reader(reader, min_len)?;
        log::info!("loaded {} prices from {file:?}", series.len());
        Ok(series)
    }

    /// Parse a series from delimited text.
    ///
    /// The first row is a header. Every following row holds the row index in
    /// the first column and the price in the second; the price of period `p`
    /// is the one on data row `p`.
    pub fn from_reader<R: Read>(reader: R, min_len: usize) -> Result<Self, SimError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut prices = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record =
                record.map_err(|err| SimError::DataSource(format!("row {row}: {err}")))?;
            let field = record.get(1).ok_or_else(|| {
                SimError::DataSource(format!("row {row} has no price column"))
            })?;
            let price = field.parse::<f64>().map_err(|err| {
                SimError::DataSource(format!("row {row}: invalid price {field:?}: {err}"))
            })?;
            prices.push(price);
        }

        Self::new(prices, min_len)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Look up the price at `index`, resolving negative indices with `policy`.
    ///
    /// Indices past the end are an error under every policy.
    pub fn at(&self, index: i64, policy: IndexPolicy) -> Result<f64, SimError> {
        let len = self.prices.len() as i64;
        let resolved = match policy {
            IndexPolicy::Wrap if index < 0 => index + len,
            IndexPolicy::Clamp if index < 0 => 0,
            _ => index,
        };
        if !(0..len).contains(&resolved) {
            return Err(SimError::IndexPolicy {
                index,
                len: self.prices.len(),
            });
        }
        Ok(self.prices[resolved as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> PriceSeries {
        PriceSeries::new(vec![1.0, 2.0, 3.0], 3).unwrap()
    }

    #[test]
    fn negative_index_follows_policy() {
        let prices = series();
        assert_eq!(prices.at(-1, IndexPolicy::Wrap), Ok(3.0));
        assert_eq!(prices.at(-1, IndexPolicy::Clamp), Ok(1.0));
        assert_eq!(
            prices.at(-1, IndexPolicy::Strict),
            Err(SimError::IndexPolicy { index: -1, len: 3 })
        );
        assert!(prices.at(-4, IndexPolicy::Wrap).is_err());
    }

    #[test]
    fn index_past_end_is_rejected() {
        let prices = series();
        assert_eq!(prices.at(2, IndexPolicy::Strict), Ok(3.0));
        for policy in [IndexPolicy::Wrap, IndexPolicy::Clamp, IndexPolicy::Strict] {
            assert_eq!(
                prices.at(3, policy),
                Err(SimError::IndexPolicy { index: 3, len: 3 })
            );
        }
    }

    #[test]
    fn reads_index_and_price_columns() {
        let text = ",Pris\n0,1.25\n1, 2.5\n2,0.75\n";
        let prices = PriceSeries::from_reader(text.as_bytes(), 3).unwrap();
        assert_eq!(prices.len(), 3);
        assert_eq!(prices.at(1, IndexPolicy::Strict), Ok(2.5));
        assert_eq!(prices.at(2, IndexPolicy::Strict), Ok(0.75));
    }

    #[test]
    fn short_series_is_a_data_source_error() {
        let text = ",Pris\n0,1.25\n";
        let err = PriceSeries::from_reader(text.as_bytes(), 2).unwrap_err();
        assert!(matches!(err, SimError::DataSource(_)));
    }

    #[test]
    fn malformed_rows_are_data_source_errors() {
        let missing_column = ",Pris\n0\n";
        assert!(matches!(
            PriceSeries::from_reader(missing_column.as_bytes(), 1),
            Err(SimError::DataSource(_))
        ));

        let bad_number = ",Pris\n0,cheap\n";
        assert!(matches!(
            PriceSeries::from_reader(bad_number.as_bytes(), 1),
            Err(SimError::DataSource(_))
        ));

        let negative = ",Pris\n0,-0.5\n";
        assert!(matches!(
            PriceSeries::from_reader(negative.as_bytes(), 1),
            Err(SimError::DataSource(_))
        ));
    }

    #[test]
    fn missing_file_is_a_data_source_error() {
        let err = PriceSeries::from_file("does/not/exist.csv", 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimError>(),
            Some(SimError::DataSource(_))
        ));
    }
}
