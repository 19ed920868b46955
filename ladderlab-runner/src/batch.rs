//! Batch runs: every `[[runs]]` entry of a config, optionally in parallel.
//!
//! Each run owns its provider, plan and state; nothing mutable is shared
//! across the rayon workers.

use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

use ladderlab_core::data::PriceSeriesProvider;
use ladderlab_core::engine::EngineConfig;
use ladderlab_core::strategy::StrategyBook;

use crate::config::BacktestConfig;
use crate::data_loader::provider_for;
use crate::runner::{run_simulation, RunError, SimulationReport, SimulationRequest};

/// One unit of batch work.
pub struct BatchJob {
    pub request: SimulationRequest,
    pub provider: Box<dyn PriceSeriesProvider>,
}

/// Batch executor.
pub struct BatchRunner {
    parallel: bool,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every job; the first failure aborts the batch.
    ///
    /// Reports come back in job order regardless of parallelism.
    pub fn run(
        &self,
        book: &StrategyBook,
        engine: &EngineConfig,
        jobs: &[BatchJob],
    ) -> Result<BatchResults, RunError> {
        let run_one = |job: &BatchJob| run_simulation(book, engine, &job.request, job.provider.as_ref());

        let reports: Vec<SimulationReport> = if self.parallel {
            jobs.par_iter().map(run_one).collect::<Result<Vec<_>, _>>()?
        } else {
            jobs.iter().map(run_one).collect::<Result<Vec<_>, _>>()?
        };

        info!(runs = reports.len(), parallel = self.parallel, "batch complete");
        Ok(BatchResults::new(reports))
    }

    /// Run every `[[runs]]` entry of a validated config.
    pub fn run_config(&self, config: &BacktestConfig) -> Result<BatchResults, RunError> {
        let book = config.book()?;
        let jobs: Vec<BatchJob> = config
            .runs
            .iter()
            .zip(config.requests())
            .map(|(run, request)| BatchJob {
                request,
                provider: provider_for(&run.source, run.token),
            })
            .collect();
        self.run(&book, &config.engine, &jobs)
    }
}

/// Reports from a batch, in job order.
#[derive(Debug)]
pub struct BatchResults {
    reports: Vec<SimulationReport>,
    by_run_id: HashMap<String, usize>,
}

impl BatchResults {
    fn new(reports: Vec<SimulationReport>) -> Self {
        let by_run_id = reports
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.0.clone(), i))
            .collect();
        Self { reports, by_run_id }
    }

    pub fn all(&self) -> &[SimulationReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&SimulationReport> {
        self.by_run_id.get(run_id).map(|&i| &self.reports[i])
    }

    /// Reports sorted by total return, best first.
    pub fn sorted_by_return(&self) -> Vec<&SimulationReport> {
        let mut sorted: Vec<_> = self.reports.iter().collect();
        sorted.sort_by(|a, b| {
            b.metrics
                .total_return
                .partial_cmp(&a.metrics.total_return)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn best(&self) -> Option<&SimulationReport> {
        self.sorted_by_return().into_iter().next()
    }

    pub fn into_reports(self) -> Vec<SimulationReport> {
        self.reports
    }
}
