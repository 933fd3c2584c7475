use super::*;
use assertables::*;
use common::config::ConfigGuard;
use common::types::CalendarDate;
use serial_test::serial;

fn date(s: &str) -> CalendarDate {
    parse_date(s).unwrap()
}

fn request(json: &str) -> MetricsRequest {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_end_to_end_small_window() {
    let req = request(
        r#"{
            "actuals": [
                {"date": "2024-01-01", "value": 0},
                {"date": "2024-01-02", "value": 500}
            ],
            "forecast": [
                {"date": "2024-01-01", "forecast": 50},
                {"date": "2024-01-02", "forecast": 480}
            ],
            "backtest_days": 2,
            "daily_errors_limit": 1,
            "outliers_only": true
        }"#,
    );

    let prepared = req.prepare().unwrap();
    assert_eq!(prepared.window.from, date("2024-01-01"));
    assert_eq!(prepared.window.to, date("2024-01-02"));
    assert_eq!(prepared.method, ForecastMethod::Provided);

    let report = prepared.evaluate();
    let m = report.metrics;
    assert_eq!(m.n, 2);
    assert_eq!(m.nonzero_actual_days, 1);
    assert_eq!(m.zero_actual_days, 1);
    assert_eq!(m.ape_denominator_floor, 5.0);
    assert_eq!(m.wape_pct, Some(14.0));
    assert_eq!(m.bias_pct, Some(6.0));
    assert_eq!(m.mape_pct, Some(4.0));
    assert_in_delta!(m.smape_pct.unwrap(), 102.04, 1e-9);

    // 実績 0 の日は APE なし → abs_error 50 で外れ値首位
    assert_eq!(report.daily_errors.len(), 1);
    let top = report.daily_errors[0];
    assert_eq!(top.date, date("2024-01-01"));
    assert_eq!(top.abs_error, 50.0);
    assert_eq!(top.ape, None);
}

#[test]
fn test_latest_slice_keeps_most_recent_days_in_order() {
    let req = request(
        r#"{
            "actuals": [
                {"date": "2024-01-01", "value": 10},
                {"date": "2024-01-02", "value": 20},
                {"date": "2024-01-03", "value": 30}
            ],
            "forecast": [
                {"date": "2024-01-01", "forecast": 11},
                {"date": "2024-01-02", "forecast": 22},
                {"date": "2024-01-03", "forecast": 33}
            ],
            "backtest_days": 3,
            "daily_errors_limit": 2
        }"#,
    );

    let report = req.prepare().unwrap().evaluate();
    let dates: Vec<_> = report.daily_errors.iter().map(|e| e.date).collect();
    assert_eq!(dates, vec![date("2024-01-02"), date("2024-01-03")]);
}

#[test]
fn test_start_date_anchors_window_and_excludes_later_days() {
    let req = request(
        r#"{
            "actuals": [
                {"date": "2024-01-01", "value": 100},
                {"date": "2024-01-02", "value": 100},
                {"date": "2024-01-03", "value": 100}
            ],
            "forecast": [
                {"date": "2024-01-01", "forecast": 110},
                {"date": "2024-01-02", "forecast": 110},
                {"date": "2024-01-03", "forecast": 500}
            ],
            "start_date": "2024-01-03",
            "backtest_days": 2,
            "daily_errors_limit": 10
        }"#,
    );

    let report = req.prepare().unwrap().evaluate();
    assert_eq!(report.window.to, date("2024-01-02"));
    assert_eq!(report.metrics.n, 2);
    assert_eq!(report.metrics.wape_pct, Some(10.0));
    assert_none!(
        report
            .daily_errors
            .iter()
            .find(|e| e.date == date("2024-01-03"))
    );
}

#[test]
fn test_naive_baseline_when_forecast_absent() {
    let req = request(
        r#"{
            "actuals": [
                {"date": "2024-01-01", "value": 100},
                {"date": "2024-01-02", "value": 120},
                {"date": "2024-01-03", "value": 90}
            ],
            "backtest_days": 2,
            "daily_errors_limit": 5
        }"#,
    );

    let prepared = req.prepare().unwrap();
    assert_eq!(prepared.method, ForecastMethod::NaiveWalkForward);

    let report = prepared.evaluate();
    assert_eq!(report.method, ForecastMethod::NaiveWalkForward);
    let forecasts: Vec<_> = report.daily_errors.iter().map(|e| e.forecast).collect();
    assert_eq!(forecasts, vec![100.0, 120.0]);
    // |20| + |30| / 210
    assert_eq!(report.metrics.wape_pct, Some(23.81));
}

#[test]
fn test_fill_missing_days_counts_gaps_as_zero() {
    let json = r#"{
        "actuals": [
            {"date": "2024-01-01", "value": 100},
            {"date": "2024-01-03", "value": 100}
        ],
        "forecast": [
            {"date": "2024-01-01", "forecast": 100},
            {"date": "2024-01-02", "forecast": 10},
            {"date": "2024-01-03", "forecast": 100}
        ],
        "backtest_days": 3,
        "daily_errors_limit": 5
        FILL
    }"#;

    let sparse = request(&json.replace("FILL", "")).prepare().unwrap();
    assert_eq!(sparse.evaluate().metrics.n, 2);

    let dense = request(&json.replace("FILL", r#", "fill_missing_days": true"#))
        .prepare()
        .unwrap();
    let m = dense.evaluate().metrics;
    assert_eq!(m.n, 3);
    assert_eq!(m.zero_actual_days, 1);
    assert_eq!(m.wape_pct, Some(5.0));
}

#[test]
fn test_bad_points_are_dropped() {
    let req = request(
        r#"{
            "actuals": [
                {"date": "garbage", "value": 1},
                {"date": "2024-01-01", "value": "NaN"},
                {"date": "2024-01-02", "value": "200"}
            ],
            "forecast": [
                {"date": "2024-01-01", "forecast": 5},
                {"date": "2024-01-02", "forecast": "210"}
            ],
            "backtest_days": 7,
            "daily_errors_limit": 5
        }"#,
    );

    let report = req.prepare().unwrap().evaluate();
    assert_eq!(report.metrics.n, 1);
    assert_eq!(report.metrics.wape_pct, Some(5.0));
}

#[test]
fn test_zero_limit_rejected() {
    let req = MetricsRequest {
        start_date: Some("2024-02-01".to_string()),
        daily_errors_limit: Some(0),
        ..Default::default()
    };
    assert_eq!(req.prepare().unwrap_err(), Error::InvalidTopN(0));
}

#[test]
fn test_zero_backtest_days_rejected() {
    let req = MetricsRequest {
        start_date: Some("2024-02-01".to_string()),
        backtest_days: Some(0),
        daily_errors_limit: Some(10),
        ..Default::default()
    };
    assert_eq!(req.prepare().unwrap_err(), Error::InvalidBacktestDays(0));
}

#[test]
fn test_huge_backtest_days_rejected() {
    let req = request(
        r#"{
            "actuals": [{"date": "2024-01-01", "value": 10}],
            "backtest_days": 4000000000,
            "daily_errors_limit": 5,
            "fill_missing_days": true
        }"#,
    );
    assert_eq!(
        req.prepare().unwrap_err(),
        Error::InvalidBacktestDays(4_000_000_000)
    );
}

#[test]
fn test_invalid_start_date_rejected() {
    let req = MetricsRequest {
        start_date: Some("2024-13-40".to_string()),
        daily_errors_limit: Some(10),
        ..Default::default()
    };
    assert_eq!(
        req.prepare().unwrap_err(),
        Error::InvalidDate("2024-13-40".to_string())
    );
}

#[test]
fn test_no_anchor_rejected() {
    let req = request(r#"{"actuals": [{"date": "2024-01-01", "value": null}], "daily_errors_limit": 3}"#);
    assert_eq!(req.prepare().unwrap_err(), Error::NoWindowAnchor);
}

#[test]
fn test_empty_window_yields_undefined_metrics() {
    let req = MetricsRequest {
        start_date: Some("2024-02-01".to_string()),
        backtest_days: Some(7),
        daily_errors_limit: Some(10),
        forecast: Some(vec![]),
        ..Default::default()
    };
    let report = req.prepare().unwrap().evaluate();
    assert_eq!(report.metrics.n, 0);
    assert_eq!(report.metrics.ape_denominator_floor, 1.0);
    assert_none!(report.metrics.wape_pct);
    assert_none!(report.metrics.mape_pct);
    assert_none!(report.metrics.smape_pct);
    assert_none!(report.metrics.bias_pct);
    assert!(report.daily_errors.is_empty());
}

#[test]
#[serial]
fn test_defaults_from_config() {
    let _days = ConfigGuard::new("ACCURACY_BACKTEST_DAYS", "14");
    let _limit = ConfigGuard::new("ACCURACY_DAILY_ERRORS_LIMIT", "3");

    let req = MetricsRequest {
        start_date: Some("2024-02-01".to_string()),
        ..Default::default()
    };
    let prepared = req.prepare().unwrap();
    assert_eq!(prepared.window.backtest_days, 14);
    assert_eq!(prepared.window.from, date("2024-01-18"));
    assert_eq!(prepared.daily_errors_limit.get(), 3);
}

#[test]
fn test_slice_new() {
    assert_eq!(DailyErrorSlice::new(0, false), Err(Error::InvalidTopN(0)));
    assert!(matches!(
        DailyErrorSlice::new(5, true),
        Ok(DailyErrorSlice::Outliers(n)) if n.get() == 5
    ));
    assert!(matches!(
        DailyErrorSlice::new(5, false),
        Ok(DailyErrorSlice::Latest(n)) if n.get() == 5
    ));
}

#[test]
fn test_latest_slice_shorter_than_limit() {
    let errors = vec![
        DailyError::new(date("2024-01-01"), 10.0, 12.0, 1.0),
        DailyError::new(date("2024-01-02"), 10.0, 9.0, 1.0),
    ];
    let slice = DailyErrorSlice::new(10, false).unwrap();
    assert_eq!(slice.apply(&errors), errors);
}

#[test]
fn test_report_json_shape() {
    let req = request(
        r#"{
            "actuals": [{"date": "2024-01-01", "value": 100}],
            "forecast": [{"date": "2024-01-01", "forecast": 90}],
            "backtest_days": 1,
            "daily_errors_limit": 1
        }"#,
    );
    let report = req.prepare().unwrap().evaluate();
    let v = serde_json::to_value(&report).unwrap();

    assert_eq!(v["method"], "provided");
    assert_eq!(v["window"]["from"], "2024-01-01");
    assert_eq!(v["metrics"]["wape_pct"], 10.0);
    assert_eq!(v["daily_errors"][0]["error"], -10.0);
}
