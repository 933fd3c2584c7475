use crate::band::BandPolicy;
use crate::baseline::{fill_missing_days, naive_walk_forward};
use crate::daily_error::{DailyError, compute_daily_errors};
use crate::errors::Error;
use crate::floor::estimate_floor;
use crate::outlier::rank_outliers;
use crate::point::{ActualInput, ForecastInput, TimePoint};
use crate::summary::{MetricsSummary, WindowMetrics, compute_summary};
use crate::weekly::{WeeklyBucket, weekly_chart_series};
use crate::window::BacktestWindow;
use common::config;
use common::types::parse_date;
use logging::*;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::result::Result;

/// バックテスト窓の日数デフォルト値（8 週間）
pub const DEFAULT_BACKTEST_DAYS: u32 = 56;

/// 日別誤差スライスの件数デフォルト値
pub const DEFAULT_DAILY_ERRORS_LIMIT: usize = 120;

/// 呼び出し側から届くリクエスト。未指定の項目は設定値で補う。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRequest {
    #[serde(default)]
    pub actuals: Vec<ActualInput>,
    /// None なら素朴なウォークフォワード予測で評価する
    #[serde(default)]
    pub forecast: Option<Vec<ForecastInput>>,
    /// 窓は start_date の前日で終わる。None なら実績の最終日で終わる。
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub backtest_days: Option<u32>,
    #[serde(default)]
    pub daily_errors_limit: Option<usize>,
    #[serde(default)]
    pub outliers_only: bool,
    /// 窓内の欠けた日を実績 0 として補う
    #[serde(default)]
    pub fill_missing_days: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Provided,
    NaiveWalkForward,
}

/// 日別誤差のうちレスポンスに載せる部分
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DailyErrorSlice {
    /// 日付の新しい方から n 件（日付昇順で返す）
    Latest(NonZeroUsize),
    /// 外れ値の上位 n 件
    Outliers(NonZeroUsize),
}

impl DailyErrorSlice {
    pub fn new(limit: usize, outliers_only: bool) -> Result<Self, Error> {
        let limit = NonZeroUsize::new(limit).ok_or(Error::InvalidTopN(limit))?;
        Ok(if outliers_only {
            Self::Outliers(limit)
        } else {
            Self::Latest(limit)
        })
    }

    pub fn apply(&self, daily_errors: &[DailyError]) -> Vec<DailyError> {
        match self {
            Self::Latest(n) => {
                let skip = daily_errors.len().saturating_sub(n.get());
                daily_errors[skip..].to_vec()
            }
            Self::Outliers(n) => rank_outliers(daily_errors, *n),
        }
    }
}

/// 検証・正規化済みのリクエスト。壊れた点はここで既に捨てられている。
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
    pub actuals: Vec<TimePoint>,
    pub forecasts: Vec<TimePoint>,
    pub window: BacktestWindow,
    pub daily_errors_limit: NonZeroUsize,
    pub outliers_only: bool,
    pub method: ForecastMethod,
}

impl MetricsRequest {
    pub fn prepare(&self) -> Result<PreparedRequest, Error> {
        let backtest_days = self
            .backtest_days
            .unwrap_or_else(|| config::get_or("ACCURACY_BACKTEST_DAYS", DEFAULT_BACKTEST_DAYS));
        let limit = self.daily_errors_limit.unwrap_or_else(|| {
            config::get_or("ACCURACY_DAILY_ERRORS_LIMIT", DEFAULT_DAILY_ERRORS_LIMIT)
        });
        let daily_errors_limit = NonZeroUsize::new(limit).ok_or(Error::InvalidTopN(limit))?;

        let mut actuals: Vec<TimePoint> = self
            .actuals
            .iter()
            .filter_map(ActualInput::to_point)
            .collect();

        let window = match &self.start_date {
            Some(s) => {
                let start = parse_date(s).ok_or_else(|| Error::InvalidDate(s.clone()))?;
                BacktestWindow::ending_before(start, backtest_days)?
            }
            None => BacktestWindow::latest(&actuals, backtest_days)?.ok_or(Error::NoWindowAnchor)?,
        };

        if self.fill_missing_days {
            let range = window.range();
            let filled = fill_missing_days(&actuals, range);
            actuals.retain(|p| !range.contains(p.date));
            actuals.extend(filled);
        }

        let (forecasts, method) = match &self.forecast {
            Some(points) => (
                points
                    .iter()
                    .filter_map(ForecastInput::to_point)
                    .collect(),
                ForecastMethod::Provided,
            ),
            None => (
                naive_walk_forward(&actuals, &window),
                ForecastMethod::NaiveWalkForward,
            ),
        };

        Ok(PreparedRequest {
            actuals,
            forecasts,
            window,
            daily_errors_limit,
            outliers_only: self.outliers_only,
            method,
        })
    }
}

impl PreparedRequest {
    pub fn floor(&self) -> f64 {
        estimate_floor(&self.actuals, &self.window)
    }

    /// 窓内の日別誤差（日付昇順）
    pub fn daily_errors(&self, floor: f64) -> Vec<DailyError> {
        compute_daily_errors(&self.actuals, &self.forecasts, floor)
            .into_iter()
            .filter(|e| self.window.contains(e.date))
            .collect()
    }

    pub fn summary(&self) -> MetricsSummary {
        let floor = self.floor();
        compute_summary(&self.daily_errors(floor), &self.window, floor)
    }

    /// リクエストの outliers_only に従ったスライス
    pub fn requested_slice(&self) -> DailyErrorSlice {
        if self.outliers_only {
            DailyErrorSlice::Outliers(self.daily_errors_limit)
        } else {
            DailyErrorSlice::Latest(self.daily_errors_limit)
        }
    }

    pub fn sliced_daily_errors(&self, slice: DailyErrorSlice) -> Vec<DailyError> {
        slice.apply(&self.daily_errors(self.floor()))
    }

    /// チャート用の週次系列（窓に限らず系列全体）
    pub fn weekly(&self, policy: &BandPolicy) -> Vec<WeeklyBucket> {
        weekly_chart_series(&self.actuals, &self.forecasts, policy)
    }

    /// 集計指標とスライスを 1 回の計算でまとめて返す
    pub fn evaluate(&self) -> MetricsReport {
        let log = DEFAULT.new(o!("function" => "evaluate"));

        let floor = self.floor();
        let daily_errors = self.daily_errors(floor);
        let summary = compute_summary(&daily_errors, &self.window, floor);
        let slice = self.requested_slice().apply(&daily_errors);

        info!(log, "forecast accuracy calculated";
            "window" => %self.window.range(),
            "method" => ?self.method,
            "n" => summary.metrics.n,
            "wape_pct" => summary.metrics.wape_pct,
            "mape_pct" => summary.metrics.mape_pct,
            "bias_pct" => summary.metrics.bias_pct,
            "daily_errors" => slice.len(),
        );

        MetricsReport {
            window: summary.window,
            metrics: summary.metrics,
            method: self.method,
            daily_errors: slice,
        }
    }
}

/// 集計指標 + 日別誤差スライス
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub window: BacktestWindow,
    pub metrics: WindowMetrics,
    pub method: ForecastMethod,
    pub daily_errors: Vec<DailyError>,
}

#[cfg(test)]
mod tests;
