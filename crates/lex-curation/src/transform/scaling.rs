//! Feature scaling.
//!
//! Every scaler reduces to `(x - center) / divisor`. The fitted constants are
//! kept verbatim in [`ScalingParameters`], so a transform can be re-applied to
//! new data or inverted without refitting.

use crate::config::NormalizationMethod;
use crate::error::{CurationError, Result};
use crate::stats;
use crate::utils::{float_column, float_series};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fitted constants for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleParams {
    Standard { mean: f64, std: f64 },
    MinMax { min: f64, max: f64 },
    Robust { center: f64, scale: f64 },
}

impl ScaleParams {
    /// Fit parameters for `method` on the non-null values of a column.
    ///
    /// A column with no values fits as the identity transform.
    pub fn fit(method: NormalizationMethod, values: &Series) -> Result<Self> {
        let params = match method {
            NormalizationMethod::Standard => Self::Standard {
                mean: stats::mean(values).unwrap_or(0.0),
                std: stats::std_dev(values, 0).unwrap_or(0.0),
            },
            NormalizationMethod::MinMax => Self::MinMax {
                min: stats::min(values)?.unwrap_or(0.0),
                max: stats::max(values)?.unwrap_or(0.0),
            },
            NormalizationMethod::Robust => {
                let (center, scale) = match stats::quartiles(values)? {
                    Some((q1, q3)) => (stats::median(values).unwrap_or(0.0), q3 - q1),
                    None => (0.0, 0.0),
                };
                Self::Robust { center, scale }
            }
        };
        Ok(params)
    }

    pub fn method(&self) -> NormalizationMethod {
        match self {
            Self::Standard { .. } => NormalizationMethod::Standard,
            Self::MinMax { .. } => NormalizationMethod::MinMax,
            Self::Robust { .. } => NormalizationMethod::Robust,
        }
    }

    pub fn center(&self) -> f64 {
        match *self {
            Self::Standard { mean, .. } => mean,
            Self::MinMax { min, .. } => min,
            Self::Robust { center, .. } => center,
        }
    }

    /// Fitted spread (std, range or IQR).
    pub fn spread(&self) -> f64 {
        match *self {
            Self::Standard { std, .. } => std,
            Self::MinMax { min, max } => max - min,
            Self::Robust { scale, .. } => scale,
        }
    }

    /// Spread actually divided by; 1 when the spread is zero.
    pub fn divisor(&self) -> f64 {
        let spread = self.spread();
        if spread == 0.0 || !spread.is_finite() {
            1.0
        } else {
            spread
        }
    }

    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        (x - self.center()) / self.divisor()
    }

    #[inline]
    pub fn invert(&self, y: f64) -> f64 {
        y * self.divisor() + self.center()
    }
}

/// Parameters of one scaled feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaling {
    pub feature: String,
    #[serde(flatten)]
    pub params: ScaleParams,
}

/// Fitted parameters for a whole normalization pass, in scale-set order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingParameters {
    pub method: NormalizationMethod,
    pub features: Vec<FeatureScaling>,
}

impl ScalingParameters {
    pub fn get(&self, feature: &str) -> Option<&ScaleParams> {
        self.features
            .iter()
            .find(|f| f.feature == feature)
            .map(|f| &f.params)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.feature.clone()).collect()
    }

    fn check_consistent(&self) -> Result<()> {
        if let Some(f) = self
            .features
            .iter()
            .find(|f| f.params.method() != self.method)
        {
            return Err(CurationError::InvalidConfiguration(format!(
                "scaling parameters for '{}' are {} but the pass is {}",
                f.feature,
                f.params.method(),
                self.method
            )));
        }
        Ok(())
    }
}

/// Fit `method` on each feature and return the scaled dataset with its parameters.
pub(crate) fn fit_transform(
    df: &DataFrame,
    features: &[String],
    method: NormalizationMethod,
) -> Result<(DataFrame, ScalingParameters)> {
    let mut fitted = Vec::with_capacity(features.len());
    for feature in features {
        let values = float_series(df, feature)?.drop_nulls();
        let params = ScaleParams::fit(method, &values)?;
        debug!(
            "Fitted {} scaling for '{}': center={:.4}, spread={:.4}",
            method,
            feature,
            params.center(),
            params.spread()
        );
        fitted.push(FeatureScaling {
            feature: feature.clone(),
            params,
        });
    }

    let parameters = ScalingParameters {
        method,
        features: fitted,
    };
    let scaled = transform(df, &parameters, ScaleParams::apply)?;
    Ok((scaled, parameters))
}

/// Re-apply previously fitted parameters.
pub(crate) fn apply(df: &DataFrame, parameters: &ScalingParameters) -> Result<DataFrame> {
    parameters.check_consistent()?;
    transform(df, parameters, ScaleParams::apply)
}

/// Reconstruct the pre-scaling values.
pub(crate) fn invert(df: &DataFrame, parameters: &ScalingParameters) -> Result<DataFrame> {
    parameters.check_consistent()?;
    transform(df, parameters, ScaleParams::invert)
}

fn transform(
    df: &DataFrame,
    parameters: &ScalingParameters,
    f: fn(&ScaleParams, f64) -> f64,
) -> Result<DataFrame> {
    let mut out = df.clone();
    for scaling in &parameters.features {
        let values = float_column(df, &scaling.feature)?;
        let mapped: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.map(|x| f(&scaling.params, x)))
            .collect();
        out.replace(&scaling.feature, Series::new(scaling.feature.as_str().into(), mapped))?;
    }
    Ok(out)
}
