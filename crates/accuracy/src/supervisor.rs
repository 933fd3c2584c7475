use crate::Result;
use crate::daily_error::DailyError;
use crate::report::{DailyErrorSlice, PreparedRequest};
use crate::summary::MetricsSummary;
use anyhow::anyhow;
use logging::*;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;

/// リクエストの世代番号。大きいほど新しい。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// 最新世代以外の結果を破棄するためのゲート
#[derive(Debug, Default)]
pub struct GenerationGate {
    latest: AtomicU64,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい世代を発行する。以前の世代はこの時点で古くなる。
    pub fn begin(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest.load(Ordering::SeqCst) == generation.0
    }

    pub fn accept<T>(&self, generation: Generation, value: T) -> Option<T> {
        self.is_current(generation).then_some(value)
    }
}

/// スライスごとの計算結果。1 つが失敗しても他は残る。
#[derive(Debug)]
pub struct SliceResults {
    pub summary: Result<MetricsSummary>,
    pub daily_errors: Result<Vec<DailyError>>,
    pub outliers: Result<Vec<DailyError>>,
}

impl SliceResults {
    pub fn all_ok(&self) -> bool {
        self.summary.is_ok() && self.daily_errors.is_ok() && self.outliers.is_ok()
    }
}

async fn join<T>(handle: JoinHandle<T>, slice: &'static str) -> Result<T> {
    handle
        .await
        .map_err(|e| anyhow!("{} slice failed: {}", slice, e))
}

/// 集計・直近の日別誤差・外れ値の 3 スライスを独立したブロッキングタスクで計算する。
pub async fn run_slices(prepared: Arc<PreparedRequest>) -> SliceResults {
    let log = DEFAULT.new(o!(
        "function" => "run_slices",
        "window" => format!("{}", prepared.window.range()),
    ));
    let limit = prepared.daily_errors_limit;

    let p = Arc::clone(&prepared);
    let summary = tokio::task::spawn_blocking(move || p.summary());
    let p = Arc::clone(&prepared);
    let latest =
        tokio::task::spawn_blocking(move || p.sliced_daily_errors(DailyErrorSlice::Latest(limit)));
    let p = prepared;
    let outliers =
        tokio::task::spawn_blocking(move || p.sliced_daily_errors(DailyErrorSlice::Outliers(limit)));

    let (summary, daily_errors, outliers) = tokio::join!(
        join(summary, "summary"),
        join(latest, "daily_errors"),
        join(outliers, "outliers"),
    );

    let failures = [
        summary.as_ref().err(),
        daily_errors.as_ref().err(),
        outliers.as_ref().err(),
    ];
    for err in failures.into_iter().flatten() {
        warn!(log, "slice computation failed"; "error" => %err);
    }

    SliceResults {
        summary,
        daily_errors,
        outliers,
    }
}

/// 投入されたリクエストのうち最新のものだけが結果を返す。
#[derive(Debug, Default)]
pub struct Supervisor {
    gate: GenerationGate,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 世代は呼び出し時点で確定する（await より前）。
    /// 完了時に新しい submit があれば None。
    pub fn submit(
        &self,
        prepared: PreparedRequest,
    ) -> impl Future<Output = Option<SliceResults>> + '_ {
        let generation = self.gate.begin();
        let prepared = Arc::new(prepared);
        async move {
            let log = DEFAULT.new(o!(
                "function" => "Supervisor::submit",
                "generation" => generation.get(),
            ));
            let results = run_slices(prepared).await;
            let accepted = self.gate.accept(generation, results);
            if accepted.is_none() {
                debug!(log, "discarding stale results");
            }
            accepted
        }
    }
}
