use crate::point::{TimePoint, finite};
use crate::window::BacktestWindow;
use common::types::{CalendarDate, DateRange};
use std::collections::BTreeMap;

/// range 内の毎日に実績点を 1 つずつ並べる。欠けた日と値の無い日は 0.0。
pub fn fill_missing_days(actuals: &[TimePoint], range: DateRange) -> Vec<TimePoint> {
    let by_date = actual_by_date(actuals);
    range
        .days()
        .map(|d| TimePoint::actual(d, by_date.get(&d).copied().unwrap_or(0.0)))
        .collect()
}

/// 素朴なウォークフォワード予測: 各日の予測値は「その日より前の直近の実績」。
///
/// 窓内で実績を持つ日についてのみ予測点を作る。窓より前に実績が無ければ 0.0 から始める。
/// 予測値は 0 以上。
pub fn naive_walk_forward(actuals: &[TimePoint], window: &BacktestWindow) -> Vec<TimePoint> {
    let by_date = actual_by_date(actuals);

    let mut prev = by_date
        .range(..window.from)
        .next_back()
        .map(|(_, v)| *v)
        .unwrap_or(0.0);

    let mut forecasts = Vec::new();
    for (date, actual) in by_date.range(window.from..=window.to) {
        forecasts.push(TimePoint::forecast(*date, prev.max(0.0)));
        prev = *actual;
    }
    forecasts
}

fn actual_by_date(actuals: &[TimePoint]) -> BTreeMap<CalendarDate, f64> {
    actuals
        .iter()
        .filter_map(|p| p.actual.and_then(finite).map(|a| (p.date, a)))
        .collect()
}
