use crate::band::BandPolicy;
use crate::point::{TimePoint, finite, merge_by_date};
use chrono::{Datelike, NaiveDate, Weekday};
use common::types::CalendarDate;
use logging::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::result::Result;
use std::str::FromStr;

/// ISO-8601 週（月曜始まり、第 1 週は最初の木曜日を含む週）。表記は `YYYY-Www`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    pub fn of(date: CalendarDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// 週の始まりの月曜日
    pub fn monday(&self) -> Option<CalendarDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, week) = s
            .split_once("-W")
            .ok_or_else(|| format!("invalid week key: {s}"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid week key year: {s}"))?;
        let week: u32 = week
            .parse()
            .map_err(|_| format!("invalid week key week: {s}"))?;
        // 存在しない週番号（例: 53 週が無い年）は拒否
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .ok_or_else(|| format!("no such iso week: {s}"))?;
        Ok(Self { year, week })
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// ISO 週ごとの合計。寄与した日が 0 のフィールドは None（「データ無し」と「合計 0」を区別する）。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub week_key: WeekKey,
    pub first_date: CalendarDate,
    pub actual_sum: Option<f64>,
    pub forecast_sum: Option<f64>,
    pub p05_sum: Option<f64>,
    pub p95_sum: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default)]
struct FieldSum {
    sum: f64,
    count: u32,
}

impl FieldSum {
    /// 負値は 0 に丸めて加算する
    fn add(&mut self, v: Option<f64>) {
        if let Some(v) = v.and_then(finite) {
            self.sum += v.max(0.0);
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then_some(self.sum)
    }
}

#[derive(Clone, Copy, Debug)]
struct Accumulator {
    first_date: CalendarDate,
    actual: FieldSum,
    forecast: FieldSum,
    p05: FieldSum,
    p95: FieldSum,
}

impl Accumulator {
    fn new(first_date: CalendarDate) -> Self {
        Self {
            first_date,
            actual: FieldSum::default(),
            forecast: FieldSum::default(),
            p05: FieldSum::default(),
            p95: FieldSum::default(),
        }
    }

    fn add(&mut self, p: &TimePoint) {
        self.first_date = self.first_date.min(p.date);
        self.actual.add(p.actual);
        self.forecast.add(p.forecast);
        self.p05.add(p.p05);
        self.p95.add(p.p95);
    }

    fn into_bucket(self, week_key: WeekKey) -> WeeklyBucket {
        WeeklyBucket {
            week_key,
            first_date: self.first_date,
            actual_sum: self.actual.value(),
            forecast_sum: self.forecast.value(),
            p05_sum: self.p05.value(),
            p95_sum: self.p95.value(),
        }
    }
}

/// 日次の点を ISO 週に束ねる。週キー昇順。
///
/// 平均ではなく合計。値を 1 つも持たない点はバケットを作らない。
pub fn bucket_to_weeks(points: &[TimePoint]) -> Vec<WeeklyBucket> {
    let mut buckets: BTreeMap<WeekKey, Accumulator> = BTreeMap::new();

    for p in points.iter().map(|p| p.sanitized()) {
        if !p.has_values() {
            continue;
        }
        buckets
            .entry(WeekKey::of(p.date))
            .or_insert_with(|| Accumulator::new(p.date))
            .add(&p);
    }

    buckets
        .into_iter()
        .map(|(key, acc)| acc.into_bucket(key))
        .collect()
}

/// チャート用の週次系列。
///
/// 実績と予測を日付で突き合わせ、日次でバンドを整合させてから週に束ね、
/// 週の合計にもう一度バンドの整合を掛ける。
pub fn weekly_chart_series(
    actuals: &[TimePoint],
    forecasts: &[TimePoint],
    policy: &BandPolicy,
) -> Vec<WeeklyBucket> {
    let log = DEFAULT.new(o!("function" => "weekly_chart_series"));

    let daily: Vec<TimePoint> = merge_by_date(actuals, forecasts)
        .into_iter()
        .map(|p| policy.reconcile(p))
        .collect();

    let weeks: Vec<WeeklyBucket> = bucket_to_weeks(&daily)
        .into_iter()
        .map(|b| policy.reconcile_weekly(b))
        .collect();

    debug!(log, "weekly chart series built";
        "days" => daily.len(),
        "weeks" => weeks.len(),
    );

    weeks
}
