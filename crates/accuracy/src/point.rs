use common::types::{CalendarDate, parse_date};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 1 日分の観測点。実績系列と予測系列は別々に渡され、日付で突き合わせる。
///
/// 数値フィールドは常に有限値か None（NaN / Infinity は欠損として扱う）。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: CalendarDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p05: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95: Option<f64>,
}

pub fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

impl TimePoint {
    pub fn empty(date: CalendarDate) -> Self {
        Self {
            date,
            actual: None,
            forecast: None,
            p05: None,
            p95: None,
        }
    }

    pub fn actual(date: CalendarDate, value: f64) -> Self {
        Self {
            actual: finite(value),
            ..Self::empty(date)
        }
    }

    pub fn forecast(date: CalendarDate, value: f64) -> Self {
        Self {
            forecast: finite(value),
            ..Self::empty(date)
        }
    }

    pub fn with_band(self, p05: Option<f64>, p95: Option<f64>) -> Self {
        Self {
            p05: p05.and_then(finite),
            p95: p95.and_then(finite),
            ..self
        }
    }

    /// 非有限値を None に落とす
    pub fn sanitized(self) -> Self {
        Self {
            date: self.date,
            actual: self.actual.and_then(finite),
            forecast: self.forecast.and_then(finite),
            p05: self.p05.and_then(finite),
            p95: self.p95.and_then(finite),
        }
    }

    pub fn has_values(&self) -> bool {
        self.actual.is_some()
            || self.forecast.is_some()
            || self.p05.is_some()
            || self.p95.is_some()
    }
}

/// 実績系列と予測系列を日付で外部結合する。日付昇順。
///
/// 同じ系列内で日付が重複した場合は後の点が優先される。
pub fn merge_by_date(actuals: &[TimePoint], forecasts: &[TimePoint]) -> Vec<TimePoint> {
    let mut merged: BTreeMap<CalendarDate, TimePoint> = BTreeMap::new();

    for p in actuals {
        let entry = merged
            .entry(p.date)
            .or_insert_with(|| TimePoint::empty(p.date));
        entry.actual = p.actual.and_then(finite);
    }
    for p in forecasts {
        let entry = merged
            .entry(p.date)
            .or_insert_with(|| TimePoint::empty(p.date));
        entry.forecast = p.forecast.and_then(finite);
        entry.p05 = p.p05.and_then(finite);
        entry.p95 = p.p95.and_then(finite);
    }

    merged.into_values().collect()
}

// ---- wire input ----

/// 上流から届く実績点。日付や値が壊れていても受理し、変換時に捨てる。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActualInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, alias = "actual", deserialize_with = "lenient_number")]
    pub value: Option<f64>,
}

/// 上流の予測器が出す点（分位点バンドは任意）
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub forecast: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub p05: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub p95: Option<f64>,
}

impl ActualInput {
    /// 日付が解釈できない点は None
    pub fn to_point(&self) -> Option<TimePoint> {
        let date = self.date.as_deref().and_then(parse_date)?;
        Some(TimePoint {
            actual: self.value.and_then(finite),
            ..TimePoint::empty(date)
        })
    }
}

impl ForecastInput {
    pub fn to_point(&self) -> Option<TimePoint> {
        let date = self.date.as_deref().and_then(parse_date)?;
        Some(TimePoint {
            forecast: self.forecast.and_then(finite),
            p05: self.p05.and_then(finite),
            p95: self.p95.and_then(finite),
            ..TimePoint::empty(date)
        })
    }
}

/// 数値または数値文字列を受け付ける。それ以外（null, bool, 非数文字列）は None。
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .and_then(finite))
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        _ => None,
    }))
}

#[cfg(test)]
mod tests;
