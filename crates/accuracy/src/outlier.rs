use crate::daily_error::DailyError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::num::NonZeroUsize;

/// 外れ値スコアの種類
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// 比率（abs_error / |actual|）
    Ape,
    /// APE が未定義の日のフォールバック。実数量の絶対誤差。
    AbsError,
}

/// 外れ値スコア。
///
/// Ape と AbsError は単位が異なるが、順位付けでは値そのものを比較する。
/// そのため実績が下限未満の日（AbsError）は、APE を持つ日より上位に来やすい。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlierScore {
    pub kind: ScoreKind,
    pub value: f64,
}

impl OutlierScore {
    pub fn of(e: &DailyError) -> Self {
        match e.ape {
            Some(ape) => Self {
                kind: ScoreKind::Ape,
                value: ape,
            },
            None => Self {
                kind: ScoreKind::AbsError,
                value: e.abs_error,
            },
        }
    }
}

/// 外れ値としての順位（小さい方が上位）
///
/// 1. スコア降順
/// 2. abs_error 降順
/// 3. 日付昇順
pub fn outlier_order(a: &DailyError, b: &DailyError) -> Ordering {
    let sa = OutlierScore::of(a);
    let sb = OutlierScore::of(b);
    sb.value
        .total_cmp(&sa.value)
        .then_with(|| b.abs_error.total_cmp(&a.abs_error))
        .then_with(|| a.date.cmp(&b.date))
}

/// 上位 `top_n` 件の外れ値を返す。入力の並び順には依存しない。
pub fn rank_outliers(daily_errors: &[DailyError], top_n: NonZeroUsize) -> Vec<DailyError> {
    let mut ranked = daily_errors.to_vec();
    ranked.sort_by(outlier_order);
    ranked.truncate(top_n.get());
    ranked
}
