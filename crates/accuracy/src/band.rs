use crate::point::{TimePoint, finite};
use crate::weekly::WeeklyBucket;
use common::config;
use logging::*;

/// 上側バンドの基準値のデフォルト
pub const DEFAULT_UPPER_BASE: f64 = 1000.0;

/// 上側バンドの上限倍率のデフォルト
pub const DEFAULT_UPPER_MULTIPLIER: f64 = 3.0;

/// 予測点と p05/p95 バンドの整合ルール
///
/// - p05 は `[0, y]` に収める
/// - p95 は `[y, max(upper_base, y, 1) * upper_multiplier]` に収める
/// - それでも p05 > p95 なら `p05 = min(y, p95)`
///
/// 調整後は常に `p05 <= y <= p95` が成り立つ。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandPolicy {
    pub upper_base: f64,
    pub upper_multiplier: f64,
}

impl Default for BandPolicy {
    fn default() -> Self {
        Self {
            upper_base: DEFAULT_UPPER_BASE,
            upper_multiplier: DEFAULT_UPPER_MULTIPLIER,
        }
    }
}

impl BandPolicy {
    /// `BAND_UPPER_BASE` / `BAND_UPPER_MULTIPLIER` から読む。不正値はデフォルト。
    pub fn from_config() -> Self {
        let upper_base: f64 = config::get_or("BAND_UPPER_BASE", DEFAULT_UPPER_BASE);
        let upper_multiplier: f64 =
            config::get_or("BAND_UPPER_MULTIPLIER", DEFAULT_UPPER_MULTIPLIER);
        Self {
            upper_base: finite(upper_base)
                .filter(|v| *v >= 0.0)
                .unwrap_or(DEFAULT_UPPER_BASE),
            upper_multiplier: finite(upper_multiplier)
                .filter(|v| *v >= 1.0)
                .unwrap_or(DEFAULT_UPPER_MULTIPLIER),
        }
    }

    /// p95 の上限。y 未満にはならない。
    pub fn upper_cap(&self, y: f64) -> f64 {
        let base = self.upper_base.max(y).max(1.0);
        (base * self.upper_multiplier).max(y)
    }

    /// 日次の点を整合させる。非有限値は欠損扱い、予測値は 0 以上に丸める。
    pub fn reconcile(&self, point: TimePoint) -> TimePoint {
        let point = point.sanitized();
        let forecast = point.forecast.map(|y| y.max(0.0));
        let (p05, p95) = self.reconcile_band(forecast, point.p05, point.p95);
        let reconciled = TimePoint {
            forecast,
            p05,
            p95,
            ..point
        };
        if is_corrected(&point, &reconciled) {
            let log = DEFAULT.new(o!("function" => "BandPolicy::reconcile"));
            debug!(log, "band corrected";
                "date" => %point.date,
                "forecast" => ?point.forecast,
                "p05" => ?point.p05,
                "p95" => ?point.p95,
                "corrected_forecast" => ?reconciled.forecast,
                "corrected_p05" => ?reconciled.p05,
                "corrected_p95" => ?reconciled.p95,
            );
        }
        reconciled
    }

    /// 週次の合計に同じルールを適用する
    pub fn reconcile_weekly(&self, bucket: WeeklyBucket) -> WeeklyBucket {
        let forecast_sum = bucket.forecast_sum.and_then(finite).map(|y| y.max(0.0));
        let (p05_sum, p95_sum) = self.reconcile_band(
            forecast_sum,
            bucket.p05_sum.and_then(finite),
            bucket.p95_sum.and_then(finite),
        );
        let reconciled = WeeklyBucket {
            forecast_sum,
            p05_sum,
            p95_sum,
            ..bucket
        };
        if reconciled != bucket {
            let log = DEFAULT.new(o!("function" => "BandPolicy::reconcile_weekly"));
            debug!(log, "weekly band corrected";
                "week" => %bucket.week_key,
                "forecast_sum" => ?bucket.forecast_sum,
                "p05_sum" => ?bucket.p05_sum,
                "p95_sum" => ?bucket.p95_sum,
                "corrected_p05_sum" => ?reconciled.p05_sum,
                "corrected_p95_sum" => ?reconciled.p95_sum,
            );
        }
        reconciled
    }

    fn reconcile_band(
        &self,
        forecast: Option<f64>,
        p05: Option<f64>,
        p95: Option<f64>,
    ) -> (Option<f64>, Option<f64>) {
        match forecast {
            Some(y) => {
                let p05 = p05.map(|v| v.max(0.0).min(y));
                let p95 = p95.map(|v| v.max(y).min(self.upper_cap(y)));
                match (p05, p95) {
                    (Some(lo), Some(hi)) if lo > hi => (Some(y.min(hi)), Some(hi)),
                    band => band,
                }
            }
            // 基準となる予測値が無い場合は非負化と順序だけ保証する
            None => {
                let p05 = p05.map(|v| v.max(0.0));
                let p95 = p95.map(|v| v.max(0.0));
                match (p05, p95) {
                    (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(hi)),
                    band => band,
                }
            }
        }
    }
}

/// 整合によって予測値かバンドが変わったか
pub fn is_corrected(before: &TimePoint, after: &TimePoint) -> bool {
    before.forecast != after.forecast || before.p05 != after.p05 || before.p95 != after.p95
}

/// デフォルトのルールで日次の点を整合させる
pub fn reconcile(point: TimePoint) -> TimePoint {
    BandPolicy::default().reconcile(point)
}

/// デフォルトのルールで週次の合計を整合させる
pub fn reconcile_weekly(bucket: WeeklyBucket) -> WeeklyBucket {
    BandPolicy::default().reconcile_weekly(bucket)
}
