use crate::point::{TimePoint, finite};
use common::types::CalendarDate;
use logging::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 実績と予測が揃った 1 日分の誤差
///
/// - `error = forecast - actual`
/// - `abs_error = |error|`
/// - `ape = abs_error / |actual|`（`|actual| >= floor` のときのみ）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyError {
    pub date: CalendarDate,
    pub actual: f64,
    pub forecast: f64,
    pub error: f64,
    pub abs_error: f64,
    pub ape: Option<f64>,
}

impl DailyError {
    pub fn new(date: CalendarDate, actual: f64, forecast: f64, floor: f64) -> Self {
        let error = forecast - actual;
        let abs_error = error.abs();
        Self {
            date,
            actual,
            forecast,
            error,
            abs_error,
            ape: compute_ape(abs_error, actual, floor),
        }
    }

    /// 1 日分の sMAPE（比率）。分母 `|actual| + |forecast|` が 0 なら未定義。
    pub fn smape(&self) -> Option<f64> {
        let denominator = self.actual.abs() + self.forecast.abs();
        if denominator == 0.0 {
            return None;
        }
        Some(2.0 * self.abs_error / denominator)
    }
}

/// `|actual| >= floor` なら `abs_error / |actual|`、それ以外は None
pub fn compute_ape(abs_error: f64, actual: f64, floor: f64) -> Option<f64> {
    let denominator = actual.abs();
    if denominator == 0.0 || denominator < floor {
        return None;
    }
    Some(abs_error / denominator)
}

/// 実績と予測を日付で内部結合し、日付昇順で誤差を計算する。
///
/// どちらかが欠けている日、値が非有限の日は結果に含めない。
pub fn compute_daily_errors(
    actuals: &[TimePoint],
    forecasts: &[TimePoint],
    floor: f64,
) -> Vec<DailyError> {
    let log = DEFAULT.new(o!("function" => "compute_daily_errors"));

    let actual_by_date: BTreeMap<CalendarDate, f64> = actuals
        .iter()
        .filter_map(|p| p.actual.and_then(finite).map(|a| (p.date, a)))
        .collect();
    let forecast_by_date: BTreeMap<CalendarDate, f64> = forecasts
        .iter()
        .filter_map(|p| p.forecast.and_then(finite).map(|f| (p.date, f)))
        .collect();

    let errors: Vec<DailyError> = actual_by_date
        .iter()
        .filter_map(|(date, actual)| {
            forecast_by_date
                .get(date)
                .map(|forecast| DailyError::new(*date, *actual, *forecast, floor))
        })
        .collect();

    debug!(log, "joined actuals and forecasts";
        "actual_days" => actual_by_date.len(),
        "forecast_days" => forecast_by_date.len(),
        "joined_days" => errors.len(),
        "floor" => floor,
    );

    errors
}

/// 日別 sMAPE（%）。集計値の `smape_pct` とは別の系列として提供する。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailySmape {
    pub date: CalendarDate,
    pub smape_pct: Option<f64>,
}

pub fn daily_smape(errors: &[DailyError]) -> Vec<DailySmape> {
    errors
        .iter()
        .map(|e| DailySmape {
            date: e.date,
            smape_pct: e.smape().map(|v| v * 100.0),
        })
        .collect()
}
