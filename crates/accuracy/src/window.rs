use crate::errors::Error;
use crate::point::TimePoint;
use chrono::Duration;
use common::types::{CalendarDate, DateRange};
use serde::{Deserialize, Serialize};

/// 窓の最大日数（10 年）
pub const MAX_BACKTEST_DAYS: u32 = 3650;

/// バックテスト窓。from / to とも含む。
///
/// 下限推定（floor）と集計指標はこの窓の中の点だけを見る。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestWindow {
    pub from: CalendarDate,
    pub to: CalendarDate,
    pub backtest_days: u32,
}

impl BacktestWindow {
    /// start_date の前日で終わる backtest_days 日間の窓。
    ///
    /// backtest_days は 1 以上 `MAX_BACKTEST_DAYS` 以下。
    pub fn ending_before(start_date: CalendarDate, backtest_days: u32) -> Result<Self, Error> {
        if !(1..=MAX_BACKTEST_DAYS).contains(&backtest_days) {
            return Err(Error::InvalidBacktestDays(backtest_days));
        }
        let from = start_date.checked_sub_signed(Duration::days(i64::from(backtest_days)));
        let to = start_date.checked_sub_signed(Duration::days(1));
        match (from, to) {
            (Some(from), Some(to)) => Ok(Self {
                from,
                to,
                backtest_days,
            }),
            _ => Err(Error::InvalidDate(start_date.to_string())),
        }
    }

    /// last を最終日とする backtest_days 日間の窓
    pub fn ending_at(last: CalendarDate, backtest_days: u32) -> Result<Self, Error> {
        let start_date = last
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| Error::InvalidDate(last.to_string()))?;
        Self::ending_before(start_date, backtest_days)
    }

    /// 実績の最終日（有効な値を持つ点）に合わせた窓。実績が無ければ None。
    pub fn latest(actuals: &[TimePoint], backtest_days: u32) -> Result<Option<Self>, Error> {
        let last = actuals
            .iter()
            .filter(|p| p.actual.is_some())
            .map(|p| p.date)
            .max();
        last.map(|d| Self::ending_at(d, backtest_days)).transpose()
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.range().contains(date)
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            from: self.from,
            to: self.to,
        }
    }
}
