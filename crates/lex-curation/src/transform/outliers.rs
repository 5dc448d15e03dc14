//! Outlier detection.
//!
//! Flags values of each scale-set feature that fall outside an IQR fence or
//! exceed a z-score cut-off. Detection only reports; it never alters data.

use crate::config::OutlierMethod;
use crate::error::Result;
use crate::stats;
use crate::utils::float_series;
use polars::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// At or above this many flagged rows the index list is replaced by a marker.
pub const MAX_LISTED_OUTLIERS: usize = 100;

const TOO_MANY_MARKER: &str = "too_many_to_list";

/// Row positions of flagged values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlaggedRows {
    Listed(Vec<usize>),
    TooManyToList,
}

impl FlaggedRows {
    fn from_indices(indices: Vec<usize>) -> Self {
        if indices.len() >= MAX_LISTED_OUTLIERS {
            Self::TooManyToList
        } else {
            Self::Listed(indices)
        }
    }

    pub fn as_slice(&self) -> Option<&[usize]> {
        match self {
            Self::Listed(indices) => Some(indices),
            Self::TooManyToList => None,
        }
    }
}

impl Serialize for FlaggedRows {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Listed(indices) => indices.serialize(serializer),
            Self::TooManyToList => serializer.serialize_str(TOO_MANY_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for FlaggedRows {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Listed(Vec<usize>),
            Marker(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Listed(indices) => Ok(Self::Listed(indices)),
            Repr::Marker(s) if s == TOO_MANY_MARKER => Ok(Self::TooManyToList),
            Repr::Marker(s) => Err(serde::de::Error::custom(format!(
                "unexpected outlier marker '{}'",
                s
            ))),
        }
    }
}

/// Outliers found in one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureOutliers {
    pub feature: String,
    pub count: usize,
    /// Share of all rows (nulls included), in percent.
    pub percentage: f64,
    /// Acceptance interval; `None` when the feature has too few values or
    /// zero spread to flag anything.
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub indices: FlaggedRows,
}

/// Result of one outlier detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    pub threshold: f64,
    pub features: Vec<FeatureOutliers>,
}

impl OutlierReport {
    pub fn feature(&self, name: &str) -> Option<&FeatureOutliers> {
        self.features.iter().find(|f| f.feature == name)
    }

    pub fn total_flagged(&self) -> usize {
        self.features.iter().map(|f| f.count).sum()
    }
}

/// Detect outliers in each of `features`.
pub(crate) fn detect(
    df: &DataFrame,
    features: &[String],
    method: OutlierMethod,
    threshold: f64,
) -> Result<OutlierReport> {
    let total_rows = df.height();
    let mut results = Vec::with_capacity(features.len());

    for feature in features {
        let series = float_series(df, feature)?;

        let bounds = match method {
            OutlierMethod::Iqr => iqr_bounds(&series, threshold)?,
            OutlierMethod::Zscore => zscore_bounds(&series, threshold),
        };

        let indices: Vec<usize> = match bounds {
            Some((lower, upper)) => series
                .f64()?
                .into_iter()
                .enumerate()
                .filter_map(|(idx, v)| v.filter(|x| *x < lower || *x > upper).map(|_| idx))
                .collect(),
            None => Vec::new(),
        };

        let count = indices.len();
        let percentage = if total_rows == 0 {
            0.0
        } else {
            count as f64 / total_rows as f64 * 100.0
        };

        debug!(
            "Outliers in '{}' ({}): {} ({:.2}%)",
            feature, method, count, percentage
        );

        results.push(FeatureOutliers {
            feature: feature.clone(),
            count,
            percentage,
            lower_bound: bounds.map(|(l, _)| l),
            upper_bound: bounds.map(|(_, u)| u),
            indices: FlaggedRows::from_indices(indices),
        });
    }

    Ok(OutlierReport {
        method,
        threshold,
        features: results,
    })
}

/// `[Q1 - t*IQR, Q3 + t*IQR]`.
fn iqr_bounds(values: &Series, threshold: f64) -> Result<Option<(f64, f64)>> {
    Ok(stats::quartiles(values)?.map(|(q1, q3)| {
        let iqr = q3 - q1;
        (q1 - threshold * iqr, q3 + threshold * iqr)
    }))
}

/// `mean ± t*std` using the sample deviation. Zero spread flags nothing.
fn zscore_bounds(values: &Series, threshold: f64) -> Option<(f64, f64)> {
    let mean = stats::mean(values)?;
    let std = stats::std_dev(values, 1)?;
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    Some((mean - threshold * std, mean + threshold * std))
}
