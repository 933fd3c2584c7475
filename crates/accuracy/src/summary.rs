use crate::daily_error::DailyError;
use crate::window::BacktestWindow;
use logging::*;
use serde::{Deserialize, Serialize};

/// 窓単位の集計結果
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub window: BacktestWindow,
    pub metrics: WindowMetrics,
}

/// 百分率（×100、小数点以下 2 桁に丸め）。分母が無い指標は None。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub n: usize,
    pub nonzero_actual_days: usize,
    pub zero_actual_days: usize,
    pub ape_denominator_floor: f64,
    pub mape_pct: Option<f64>,
    pub smape_pct: Option<f64>,
    pub wape_pct: Option<f64>,
    pub bias_pct: Option<f64>,
}

/// 合計と寄与件数の組。境界で初めて `Option` に射影する。
#[derive(Clone, Copy, Debug, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

fn to_pct(v: Option<f64>) -> Option<f64> {
    v.map(|r| (r * 100.0 * 100.0).round() / 100.0)
}

/// 日別誤差を窓単位の WAPE / MAPE / sMAPE / Bias に畳み込む。
///
/// 窓外の日は数えない。各指標は独立に計算され、どれかが None でも他に影響しない。
pub fn compute_summary(
    daily_errors: &[DailyError],
    window: &BacktestWindow,
    floor: f64,
) -> MetricsSummary {
    let log = DEFAULT.new(o!("function" => "compute_summary"));

    let mut n = 0usize;
    let mut nonzero_actual_days = 0usize;
    let mut ape = Accumulator::default();
    let mut smape = Accumulator::default();
    let mut sum_actual = 0.0;
    let mut sum_abs_error = 0.0;
    let mut sum_error = 0.0;

    for e in daily_errors.iter().filter(|e| window.contains(e.date)) {
        n += 1;
        if e.actual != 0.0 {
            nonzero_actual_days += 1;
        }
        if let Some(v) = e.ape {
            ape.add(v);
        }
        if let Some(v) = e.smape() {
            smape.add(v);
        }
        sum_actual += e.actual;
        sum_abs_error += e.abs_error;
        sum_error += e.error;
    }

    let wape = ratio(sum_abs_error, sum_actual);
    let bias = ratio(sum_error, sum_actual);
    if n > 0 && wape.is_none() {
        debug!(log, "sum of actuals is zero, wape and bias undefined"; "n" => n);
    }

    let metrics = WindowMetrics {
        n,
        nonzero_actual_days,
        zero_actual_days: n - nonzero_actual_days,
        ape_denominator_floor: floor,
        mape_pct: to_pct(ape.mean()),
        smape_pct: to_pct(smape.mean()),
        wape_pct: to_pct(wape),
        bias_pct: to_pct(bias),
    };

    debug!(log, "window metrics computed";
        "window" => %window.range(),
        "n" => n,
        "ape_days" => ape.count,
        "smape_days" => smape.count,
    );

    MetricsSummary {
        window: *window,
        metrics,
    }
}
