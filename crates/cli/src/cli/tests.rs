use super::*;

#[test]
fn test_parse_metrics_overrides() {
    let cli = Cli::try_parse_from([
        "accuracy",
        "metrics",
        "--input",
        "req.json",
        "--backtest-days",
        "14",
        "--limit",
        "5",
        "--outliers-only",
    ])
    .unwrap();

    let Command::Metrics(args) = cli.command else {
        panic!("expected metrics subcommand");
    };
    assert_eq!(args.io.input, Some(PathBuf::from("req.json")));
    assert_eq!(args.io.output, None);

    let request = args.apply(MetricsRequest {
        backtest_days: Some(56),
        daily_errors_limit: Some(120),
        start_date: Some("2024-02-01".to_string()),
        ..Default::default()
    });
    assert_eq!(request.backtest_days, Some(14));
    assert_eq!(request.daily_errors_limit, Some(5));
    assert_eq!(request.start_date.as_deref(), Some("2024-02-01"));
    assert!(request.outliers_only);
    assert!(!request.fill_missing_days);
}

#[test]
fn test_flags_do_not_clear_request_values() {
    let cli = Cli::try_parse_from(["accuracy", "slices"]).unwrap();
    let Command::Slices(args) = cli.command else {
        panic!("expected slices subcommand");
    };

    let request = args.apply(MetricsRequest {
        outliers_only: true,
        fill_missing_days: true,
        ..Default::default()
    });
    assert!(request.outliers_only);
    assert!(request.fill_missing_days);
}

#[test]
fn test_weekly_has_no_request_overrides() {
    assert!(Cli::try_parse_from(["accuracy", "weekly", "--limit", "3"]).is_err());
    assert!(Cli::try_parse_from(["accuracy", "weekly", "--output", "w.json"]).is_ok());
}
