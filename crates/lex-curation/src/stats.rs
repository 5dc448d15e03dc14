//! Column-level descriptive statistics.
//!
//! Thin wrappers over Polars aggregations on a single column. Nulls are
//! ignored; quantiles use [`QuantileMethod::Linear`], so Q1/Q3 and medians
//! agree with the conventional closest-rank interpolation.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Cast a column to `Float64`, keeping nulls in place.
pub fn as_float(series: &Series) -> Result<Series> {
    Ok(series.cast(&DataType::Float64)?)
}

/// Number of non-null values.
pub fn count(series: &Series) -> usize {
    series.len() - series.null_count()
}

/// Arithmetic mean. `None` for a column without values.
pub fn mean(series: &Series) -> Option<f64> {
    series.mean()
}

/// Standard deviation with `ddof` delta degrees of freedom.
///
/// `ddof = 0` gives the population deviation, `ddof = 1` the sample
/// deviation. Returns `None` when there are not enough values.
pub fn std_dev(series: &Series, ddof: u8) -> Option<f64> {
    if count(series) <= ddof as usize {
        return None;
    }
    series.std(ddof).filter(|s| !s.is_nan())
}

/// Quantile `q` in `[0, 1]` with linear interpolation.
pub fn quantile(series: &Series, q: f64) -> Result<Option<f64>> {
    let scalar = series.quantile_reduce(q.clamp(0.0, 1.0), QuantileMethod::Linear)?;
    Ok(scalar.value().extract::<f64>())
}

pub fn median(series: &Series) -> Option<f64> {
    series.median()
}

pub fn min(series: &Series) -> Result<Option<f64>> {
    Ok(series.min::<f64>()?)
}

pub fn max(series: &Series) -> Result<Option<f64>> {
    Ok(series.max::<f64>()?)
}

/// First and third quartile.
pub fn quartiles(series: &Series) -> Result<Option<(f64, f64)>> {
    Ok(quantile(series, 0.25)?.zip(quantile(series, 0.75)?))
}

/// Standard descriptive statistics of one numeric column.
///
/// `std` is the sample deviation; it is `None` for fewer than two values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl Describe {
    pub fn of(series: &Series) -> Result<Self> {
        let values = as_float(series)?.drop_nulls();
        Ok(Self {
            count: values.len(),
            mean: mean(&values),
            std: std_dev(&values, 1),
            min: min(&values)?,
            q25: quantile(&values, 0.25)?,
            q50: quantile(&values, 0.5)?,
            q75: quantile(&values, 0.75)?,
            max: max(&values)?,
        })
    }

    /// Statistic labels, in output order.
    pub const LABELS: [&'static str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    /// Values in the same order as [`Describe::LABELS`].
    pub fn values(&self) -> [Option<f64>; 8] {
        [
            Some(self.count as f64),
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.q50,
            self.q75,
            self.max,
        ]
    }
}
