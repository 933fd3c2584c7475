mod cli;
mod output;

use accuracy::{BandPolicy, MetricsRequest, Supervisor};
use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, IoArgs};
use logging::*;
use output::{SlicesOutput, WeeklyChartPoint, write_json};
use std::path::Path;

fn read_request(path: Option<&Path>) -> anyhow::Result<MetricsRequest> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?,
    };
    serde_json::from_str(&content).context("invalid request JSON")
}

fn emit<T: serde::Serialize>(log: &Logger, value: &T, io: &IoArgs) -> anyhow::Result<()> {
    write_json(value, io.output.as_deref())?;
    if let Some(path) = &io.output {
        info!(log, "results written"; "path" => path.display().to_string());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log = DEFAULT.new(o!("function" => "main"));

    let cli = Cli::parse();

    match &cli.command {
        Command::Metrics(args) => {
            info!(log, "computing metrics");
            let request = args.apply(read_request(args.io.input.as_deref())?);
            let report = request.prepare()?.evaluate();
            emit(&log, &report, &args.io)?;
        }
        Command::Weekly(io) => {
            info!(log, "building weekly chart series");
            let request = read_request(io.input.as_deref())?;
            let prepared = request.prepare()?;
            let points: Vec<WeeklyChartPoint> = prepared
                .weekly(&BandPolicy::from_config())
                .iter()
                .map(WeeklyChartPoint::from)
                .collect();
            emit(&log, &points, io)?;
        }
        Command::Slices(args) => {
            info!(log, "computing slices");
            let request = args.apply(read_request(args.io.input.as_deref())?);
            let supervisor = Supervisor::new();
            let results = supervisor
                .submit(request.prepare()?)
                .await
                .context("results superseded by a newer request")?;
            if !results.all_ok() {
                warn!(log, "some slices failed");
            }
            emit(&log, &SlicesOutput::from(results), &args.io)?;
        }
    }

    Ok(())
}
