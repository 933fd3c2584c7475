use accuracy::MetricsRequest;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "accuracy", about = "Forecast accuracy metrics over a backtest window")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Window metrics and a slice of daily errors
    Metrics(RequestArgs),
    /// Weekly chart series with reconciled p05/p95 bands
    Weekly(IoArgs),
    /// Summary, latest and outlier slices computed as independent tasks
    Slices(RequestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IoArgs {
    /// Request JSON file (stdin when omitted)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output JSON file (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    #[command(flatten)]
    pub io: IoArgs,

    /// Window ends the day before this date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Window length in days
    #[arg(long)]
    pub backtest_days: Option<u32>,

    /// Number of daily errors to return
    #[arg(long)]
    pub limit: Option<usize>,

    /// Return the worst days instead of the latest ones
    #[arg(long)]
    pub outliers_only: bool,

    /// Treat days missing inside the window as zero actuals
    #[arg(long)]
    pub fill_missing_days: bool,
}

impl RequestArgs {
    /// コマンドライン指定でリクエストの値を上書きする
    pub fn apply(&self, mut request: MetricsRequest) -> MetricsRequest {
        if let Some(start_date) = &self.start_date {
            request.start_date = Some(start_date.clone());
        }
        if let Some(days) = self.backtest_days {
            request.backtest_days = Some(days);
        }
        if let Some(limit) = self.limit {
            request.daily_errors_limit = Some(limit);
        }
        request.outliers_only |= self.outliers_only;
        request.fill_missing_days |= self.fill_missing_days;
        request
    }
}

#[cfg(test)]
mod tests;
