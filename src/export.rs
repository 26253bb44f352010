use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Write `rows` as comma-separated text, preceded by `header` if given.
pub fn write_table<P, S, I>(file: P, header: Option<&[&str]>, rows: I) -> Result<()>
where
    P: AsRef<Path>,
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let file = file.as_ref();
    let writer = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    write_rows(writer, header, rows).with_context(|| format!("failed to write {file:?}"))
}

/// Write `rows` to any writer, see [`write_table`].
pub fn write_rows<W, S, I>(writer: W, header: Option<&[&str]>, rows: I) -> Result<()>
where
    W: Write,
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    if let Some(header) = header {
        writer
            .write_record(header)
            .context("failed to write header")?;
    }
    for (i_row, row) in rows.into_iter().enumerate() {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row {i_row}"))?;
    }

    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

/// Series per line style before switching to the next style.
pub const SERIES_PER_STYLE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    /// Style of the series at `i_series`: ten solid, ten dashed, ten dotted,
    /// then dash-dot for the rest.
    pub fn for_series(i_series: usize) -> Self {
        match i_series / SERIES_PER_STYLE {
            0 => Self::Solid,
            1 => Self::Dashed,
            2 => Self::Dotted,
            _ => Self::DashDot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub style: LineStyle,
    pub values: Vec<f64>,
}

/// Data of a multi-line chart over sample indices `1..=periods`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub periods: usize,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn new(title: &str, x_title: &str, y_title: &str, periods: usize) -> Self {
        Self {
            title: title.to_string(),
            x_title: x_title.to_string(),
            y_title: y_title.to_string(),
            y_min: None,
            y_max: None,
            periods,
            series: Vec::new(),
        }
    }

    /// Append a series; it must hold exactly one value per period.
    pub fn push_series(&mut self, label: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.periods {
            bail!(
                "series {label:?} must have {} values, but has {}",
                self.periods,
                values.len()
            );
        }
        let style = LineStyle::for_series(self.series.len());
        self.series.push(ChartSeries {
            label: label.to_string(),
            style,
            values,
        });
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let writer = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(writer);
        serde_json::to_writer_pretty(&mut writer, self).context("failed to serialize chart")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
