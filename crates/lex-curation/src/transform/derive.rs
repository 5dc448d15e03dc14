//! Derived feature computation.

use crate::error::Result;
use crate::utils::float_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const TEMP_DIFFERENCE: &str = "Temp_Difference";
pub const POWER_ESTIMATE: &str = "Power_Estimate";
pub const TOOL_WEAR_CATEGORY: &str = "Tool_Wear_Category";

/// Source columns the derived features are computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFeatureColumns {
    pub air_temperature: String,
    pub process_temperature: String,
    pub rotational_speed: String,
    pub torque: String,
    pub tool_wear: String,
}

impl Default for DerivedFeatureColumns {
    fn default() -> Self {
        Self {
            air_temperature: "Air temperature [K]".to_string(),
            process_temperature: "Process temperature [K]".to_string(),
            rotational_speed: "Rotational speed [rpm]".to_string(),
            torque: "Torque [Nm]".to_string(),
            tool_wear: "Tool wear [min]".to_string(),
        }
    }
}

/// Name and formula of one derived feature, as recorded in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFeature {
    pub name: String,
    pub formula: String,
}

impl DerivedFeatureColumns {
    fn sources(&self) -> [&str; 5] {
        [
            &self.air_temperature,
            &self.process_temperature,
            &self.rotational_speed,
            &self.torque,
            &self.tool_wear,
        ]
    }

    /// Source columns absent from `df`.
    pub fn missing_in(&self, df: &DataFrame) -> Vec<String> {
        self.sources()
            .into_iter()
            .filter(|name| df.column(name).is_err())
            .map(str::to_string)
            .collect()
    }

    pub fn describe(&self) -> Vec<DerivedFeature> {
        vec![
            DerivedFeature {
                name: TEMP_DIFFERENCE.to_string(),
                formula: format!("{} - {}", self.process_temperature, self.air_temperature),
            },
            DerivedFeature {
                name: POWER_ESTIMATE.to_string(),
                formula: format!("{} * {} * 2π / 60", self.torque, self.rotational_speed),
            },
            DerivedFeature {
                name: TOOL_WEAR_CATEGORY.to_string(),
                formula: format!(
                    "{}: Low [0, 100), Medium [100, 200), High [200, ∞)",
                    self.tool_wear
                ),
            },
        ]
    }
}

/// Mechanical power in watts from torque (Nm) and speed (rpm).
#[inline]
pub fn power_estimate(torque: f64, rpm: f64) -> f64 {
    torque * rpm * 2.0 * PI / 60.0
}

/// Closed-open wear bins. Negative wear has no category.
pub fn tool_wear_category(wear: f64) -> Option<&'static str> {
    if wear.is_nan() || wear < 0.0 {
        None
    } else if wear < 100.0 {
        Some("Low")
    } else if wear < 200.0 {
        Some("Medium")
    } else {
        Some("High")
    }
}

/// Compute the derived features from `raw` and append them to `base`.
pub(crate) fn derive(
    raw: &DataFrame,
    base: &DataFrame,
    columns: &DerivedFeatureColumns,
) -> Result<DataFrame> {
    let air = float_column(raw, &columns.air_temperature)?;
    let process = float_column(raw, &columns.process_temperature)?;
    let rpm = float_column(raw, &columns.rotational_speed)?;
    let torque = float_column(raw, &columns.torque)?;
    let wear = float_column(raw, &columns.tool_wear)?;

    let temp_difference: Vec<Option<f64>> = process
        .iter()
        .zip(&air)
        .map(|(p, a)| Some((*p)? - (*a)?))
        .collect();

    let power: Vec<Option<f64>> = torque
        .iter()
        .zip(&rpm)
        .map(|(t, r)| Some(power_estimate((*t)?, (*r)?)))
        .collect();

    let category: Vec<Option<&str>> = wear
        .iter()
        .map(|w| w.and_then(tool_wear_category))
        .collect();

    let mut out = base.clone();
    out.with_column(Series::new(TEMP_DIFFERENCE.into(), temp_difference))?;
    out.with_column(Series::new(POWER_ESTIMATE.into(), power))?;
    out.with_column(Series::new(TOOL_WEAR_CATEGORY.into(), category))?;
    Ok(out)
}
