pub mod band;
pub mod baseline;
pub mod daily_error;
pub mod errors;
pub mod floor;
pub mod outlier;
pub mod point;
pub mod report;
pub mod summary;
pub mod supervisor;
pub mod weekly;
pub mod window;

type Result<T> = anyhow::Result<T>;

pub use band::BandPolicy;
pub use daily_error::{DailyError, DailySmape, compute_daily_errors, daily_smape};
pub use errors::Error;
pub use floor::estimate_floor;
pub use outlier::{OutlierScore, ScoreKind, rank_outliers};
pub use point::TimePoint;
pub use report::{
    DailyErrorSlice, ForecastMethod, MetricsReport, MetricsRequest, PreparedRequest,
};
pub use summary::{MetricsSummary, WindowMetrics, compute_summary};
pub use supervisor::{Generation, GenerationGate, SliceResults, Supervisor, run_slices};
pub use weekly::{WeekKey, WeeklyBucket, bucket_to_weeks, weekly_chart_series};
pub use window::BacktestWindow;
