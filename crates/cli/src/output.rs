use accuracy::{DailyError, MetricsSummary, SliceResults, WeeklyBucket};
use anyhow::Result;
use common::types::CalendarDate;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// チャート 1 点分（週）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyChartPoint {
    pub week: String,
    pub first_date: CalendarDate,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
    pub p05: Option<f64>,
    pub p95: Option<f64>,
}

impl From<&WeeklyBucket> for WeeklyChartPoint {
    fn from(b: &WeeklyBucket) -> Self {
        Self {
            week: b.week_key.to_string(),
            first_date: b.first_date,
            actual: b.actual_sum,
            forecast: b.forecast_sum,
            p05: b.p05_sum,
            p95: b.p95_sum,
        }
    }
}

/// 失敗したスライスは error にメッセージを持つ
#[derive(Debug, Serialize)]
pub struct SliceEntry<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> From<anyhow::Result<T>> for SliceEntry<T> {
    fn from(r: anyhow::Result<T>) -> Self {
        match r {
            Ok(value) => Self {
                value: Some(value),
                error: None,
            },
            Err(e) => Self {
                value: None,
                error: Some(format!("{:#}", e)),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlicesOutput {
    pub summary: SliceEntry<MetricsSummary>,
    pub daily_errors: SliceEntry<Vec<DailyError>>,
    pub outliers: SliceEntry<Vec<DailyError>>,
}

impl From<SliceResults> for SlicesOutput {
    fn from(r: SliceResults) -> Self {
        Self {
            summary: r.summary.into(),
            daily_errors: r.daily_errors.into(),
            outliers: r.outliers.into(),
        }
    }
}

/// path があればファイルへ、無ければ標準出力へ整形済み JSON を書く
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, json)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
