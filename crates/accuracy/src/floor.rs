use crate::point::TimePoint;
use crate::window::BacktestWindow;
use logging::*;

/// APE 分母の下限の最小値
pub const MIN_FLOOR: f64 = 1.0;

/// 非ゼロ実績の中央値に掛ける比率
pub const MEDIAN_FRACTION: f64 = 0.01;

/// APE を定義する実績値の下限を推定する。
///
/// 窓内の非ゼロ実績の絶対値について中央値を取り、`max(1.0, median * 0.01)` を返す。
/// 非ゼロ実績が無ければ 1.0。
///
/// 中央値は上側中央値（ソート後の `len / 2` 番目）。
pub fn estimate_floor(actuals: &[TimePoint], window: &BacktestWindow) -> f64 {
    let magnitudes: Vec<f64> = actuals
        .iter()
        .filter(|p| window.contains(p.date))
        .filter_map(|p| p.actual)
        .filter(|a| a.is_finite() && *a != 0.0)
        .map(f64::abs)
        .collect();

    let floor = match upper_median(magnitudes) {
        Some(median) => (median * MEDIAN_FRACTION).max(MIN_FLOOR),
        None => MIN_FLOOR,
    };

    let log = DEFAULT.new(o!("function" => "estimate_floor"));
    debug!(log, "estimated ape denominator floor";
        "window" => %window.range(),
        "floor" => floor,
    );

    floor
}

fn upper_median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(values[values.len() / 2])
}
