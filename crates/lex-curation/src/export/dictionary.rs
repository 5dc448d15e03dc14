//! Data dictionary and summary statistics.

use crate::error::Result;
use crate::stats::Describe;
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of most frequent values listed for non-numeric columns.
pub const TOP_VALUES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Data dictionary entry for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub column: String,
    pub dtype: String,
    pub non_null_count: usize,
    pub null_count: usize,
    pub unique_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<NumericSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_values: Option<Vec<ValueCount>>,
}

/// Build the data dictionary, one entry per column in dataset order.
pub fn build_dictionary(df: &DataFrame) -> Result<Vec<DictionaryEntry>> {
    let mut entries = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let name = series.name().to_string();
        let null_count = series.null_count();
        let unique_count = series.drop_nulls().n_unique()?;

        let (statistics, top_values) = if is_numeric_dtype(series.dtype()) {
            let d = Describe::of(series)?;
            let summary = NumericSummary {
                mean: d.mean,
                std: d.std,
                min: d.min,
                max: d.max,
                median: d.q50,
            };
            (Some(summary), None)
        } else {
            (None, Some(top_value_counts(series, TOP_VALUES)?))
        };

        entries.push(DictionaryEntry {
            column: name,
            dtype: series.dtype().to_string(),
            non_null_count: series.len() - null_count,
            null_count,
            unique_count,
            statistics,
            top_values,
        });
    }

    Ok(entries)
}

/// Most frequent non-null values, by count descending then value ascending.
pub fn top_value_counts(series: &Series, limit: usize) -> Result<Vec<ValueCount>> {
    let values = series
        .cast(&DataType::String)?
        .drop_nulls()
        .with_name("value".into());
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let counts = values.value_counts(false, false, "count".into(), false)?.sort(
        ["count", "value"],
        SortMultipleOptions::default().with_order_descending_multi([true, false]),
    )?;
    let value_series = counts.column("value")?.as_materialized_series();
    let count_series = counts
        .column("count")?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;

    Ok(value_series
        .str()?
        .into_iter()
        .zip(count_series.u64()?.into_iter())
        .take(limit)
        .filter_map(|(value, count)| {
            Some(ValueCount {
                value: value?.to_string(),
                count: count? as usize,
            })
        })
        .collect())
}

/// Descriptive statistics of every numeric column as a table.
///
/// The first column, `statistic`, holds the labels
/// (count, mean, std, min, 25%, 50%, 75%, max).
pub fn summary_statistics(df: &DataFrame) -> Result<DataFrame> {
    let mut columns: Vec<Column> = vec![
        Series::new(
            "statistic".into(),
            Describe::LABELS.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )
        .into(),
    ];

    for column in df.get_columns() {
        if !is_numeric_dtype(column.dtype()) {
            continue;
        }
        let name = column.name().to_string();
        let d = Describe::of(column.as_materialized_series())?;
        columns.push(Series::new(name.as_str().into(), d.values().to_vec()).into());
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dictionary_numeric_and_categorical() {
        let df = df![
            "x" => [Some(1.0f64), Some(2.0), None, Some(3.0)],
            "t" => [Some("M"), Some("L"), Some("L"), None],
        ]
        .unwrap();

        let dict = build_dictionary(&df).unwrap();
        assert_eq!(dict.len(), 2);

        let x = &dict[0];
        assert_eq!(x.column, "x");
        assert_eq!(x.null_count, 1);
        assert_eq!(x.non_null_count, 3);
        assert_eq!(x.unique_count, 3);
        let stats = x.statistics.as_ref().unwrap();
        assert_eq!(stats.mean, Some(2.0));
        assert_eq!(stats.median, Some(2.0));
        assert_eq!(stats.std, Some(1.0));
        assert!(x.top_values.is_none());

        let t = &dict[1];
        assert_eq!(t.unique_count, 2);
        assert_eq!(
            t.top_values.as_ref().unwrap(),
            &vec![
                ValueCount {
                    value: "L".to_string(),
                    count: 2
                },
                ValueCount {
                    value: "M".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_top_values_ties_broken_by_value() {
        let series = Series::new("t".into(), &["b", "a", "c", "a", "b", "c"]);
        let top = top_value_counts(&series, 2).unwrap();
        let values: Vec<&str> = top.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_summary_statistics_numeric_only() {
        let df = df![
            "x" => [1.0f64, 2.0, 3.0, 4.0],
            "n" => [10i64, 20, 30, 40],
            "t" => ["a", "b", "c", "d"],
        ]
        .unwrap();

        let summary = summary_statistics(&df).unwrap();
        assert_eq!(summary.shape(), (8, 3));
        assert_eq!(
            crate::utils::column_names(&summary),
            vec!["statistic", "x", "n"]
        );

        let n = crate::utils::float_column(&summary, "n").unwrap();
        assert_eq!(n[0], Some(4.0)); // count
        assert_eq!(n[1], Some(25.0)); // mean
        assert_eq!(n[7], Some(40.0)); // max
    }

    #[test]
    fn test_summary_quantiles_interpolate_linearly() {
        let df = df![
            "x" => [100.0f64, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
        ]
        .unwrap();

        let summary = summary_statistics(&df).unwrap();
        let x = crate::utils::float_column(&summary, "x").unwrap();
        assert_eq!(x[3], Some(1.0)); // min
        assert_eq!(x[4], Some(3.25)); // 25%
        assert_eq!(x[5], Some(5.5)); // 50%
        assert_eq!(x[6], Some(7.75)); // 75%
        assert_eq!(x[7], Some(100.0)); // max
    }

    #[test]
    fn test_top_values_of_integer_codes_skip_nulls() {
        let series = Series::new("count".into(), &[Some(2i64), None, Some(1), Some(2), None]);
        let top = top_value_counts(&series, TOP_VALUES).unwrap();
        assert_eq!(
            top,
            vec![
                ValueCount {
                    value: "2".to_string(),
                    count: 2
                },
                ValueCount {
                    value: "1".to_string(),
                    count: 1
                },
            ]
        );
        assert!(top_value_counts(&Series::new_null("t".into(), 3), 5).unwrap().is_empty());
    }
}
