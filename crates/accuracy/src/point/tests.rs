use super::*;

fn date(s: &str) -> CalendarDate {
    parse_date(s).unwrap()
}

#[test]
fn test_constructors_drop_non_finite() {
    let d = date("2024-01-01");
    assert_eq!(TimePoint::actual(d, f64::NAN).actual, None);
    assert_eq!(TimePoint::forecast(d, f64::INFINITY).forecast, None);
    assert_eq!(TimePoint::actual(d, 0.0).actual, Some(0.0));

    let p = TimePoint::forecast(d, 10.0).with_band(Some(f64::NEG_INFINITY), Some(12.0));
    assert_eq!(p.p05, None);
    assert_eq!(p.p95, Some(12.0));
}

#[test]
fn test_sanitized() {
    let p = TimePoint {
        date: date("2024-01-01"),
        actual: Some(f64::NAN),
        forecast: Some(5.0),
        p05: Some(f64::INFINITY),
        p95: Some(7.0),
    };
    let s = p.sanitized();
    assert_eq!(s.actual, None);
    assert_eq!(s.forecast, Some(5.0));
    assert_eq!(s.p05, None);
    assert_eq!(s.p95, Some(7.0));
    assert!(s.has_values());
    assert!(!TimePoint::empty(s.date).has_values());
}

#[test]
fn test_merge_by_date_sorted_outer_join() {
    let actuals = vec![
        TimePoint::actual(date("2024-01-03"), 30.0),
        TimePoint::actual(date("2024-01-01"), 10.0),
    ];
    let forecasts = vec![
        TimePoint::forecast(date("2024-01-02"), 22.0).with_band(Some(20.0), Some(25.0)),
        TimePoint::forecast(date("2024-01-01"), 11.0),
    ];

    let merged = merge_by_date(&actuals, &forecasts);
    let dates: Vec<_> = merged.iter().map(|p| p.date).collect();
    assert_eq!(
        dates,
        vec![date("2024-01-01"), date("2024-01-02"), date("2024-01-03")]
    );

    assert_eq!(merged[0].actual, Some(10.0));
    assert_eq!(merged[0].forecast, Some(11.0));
    assert_eq!(merged[1].actual, None);
    assert_eq!(merged[1].p05, Some(20.0));
    assert_eq!(merged[2].forecast, None);
}

#[test]
fn test_merge_by_date_duplicate_last_wins() {
    let actuals = vec![
        TimePoint::actual(date("2024-01-01"), 10.0),
        TimePoint::actual(date("2024-01-01"), 15.0),
    ];
    let merged = merge_by_date(&actuals, &[]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].actual, Some(15.0));
}

#[test]
fn test_actual_input_lenient() {
    let inputs: Vec<ActualInput> = serde_json::from_str(
        r#"[
            {"date": "2024-01-01", "value": 100},
            {"date": "2024-01-02", "value": "250.5"},
            {"date": "2024-01-03", "actual": 7},
            {"date": "2024-01-04", "value": "n/a"},
            {"date": "2024-01-05", "value": null},
            {"date": "not-a-date", "value": 1},
            {"value": 1},
            {"date": 20240106, "value": 1}
        ]"#,
    )
    .unwrap();

    let points: Vec<TimePoint> = inputs.iter().filter_map(ActualInput::to_point).collect();
    assert_eq!(points.len(), 5);
    assert_eq!(points[0].actual, Some(100.0));
    assert_eq!(points[1].actual, Some(250.5));
    assert_eq!(points[2].actual, Some(7.0));
    assert_eq!(points[3].actual, None);
    assert_eq!(points[4].actual, None);
}

#[test]
fn test_forecast_input_lenient() {
    let inputs: Vec<ForecastInput> = serde_json::from_str(
        r#"[
            {"date": "2024-01-01", "forecast": 100, "p05": 80, "p95": 130},
            {"date": "2024-01-02T00:00:00Z", "forecast": 90},
            {"date": "2024-01-03", "forecast": true, "p05": "x"}
        ]"#,
    )
    .unwrap();

    let points: Vec<TimePoint> = inputs.iter().filter_map(ForecastInput::to_point).collect();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].p05, Some(80.0));
    assert_eq!(points[0].p95, Some(130.0));
    assert_eq!(points[1].date, date("2024-01-02"));
    assert_eq!(points[1].p05, None);
    assert_eq!(points[2].forecast, None);
    assert_eq!(points[2].p05, None);
}
