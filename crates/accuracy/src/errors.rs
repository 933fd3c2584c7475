use thiserror::Error;

/// 呼び出し側の契約違反。データ品質の問題はここには来ない（None に縮退する）。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("top_n must be at least 1, got {0}")]
    InvalidTopN(usize),
    #[error("backtest_days must be at least 1, got {0}")]
    InvalidBacktestDays(u32),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("cannot place the backtest window: no start_date and no valid actual")]
    NoWindowAnchor,
}
