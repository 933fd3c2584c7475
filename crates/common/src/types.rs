use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 時刻を持たない暦日。シリアライズ形式は `YYYY-MM-DD`。
pub type CalendarDate = NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 上流データの日付文字列を暦日として解釈する。
///
/// `YYYY-MM-DD` の他に RFC 3339 のタイムスタンプも受け付け、日付部分のみを使う。
/// 解釈できない場合は None（呼び出し側でその点を捨てる）。
pub fn parse_date(s: &str) -> Option<CalendarDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// 両端を含む日付範囲
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: CalendarDate,
    pub to: CalendarDate,
}

impl DateRange {
    pub fn contains(&self, date: CalendarDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// 範囲内の日数。from > to の場合は 0。
    pub fn num_days(&self) -> i64 {
        ((self.to - self.from).num_days() + 1).max(0)
    }

    pub fn days(&self) -> impl Iterator<Item = CalendarDate> + use<> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.from.format(DATE_FORMAT),
            self.to.format(DATE_FORMAT)
        )
    }
}
