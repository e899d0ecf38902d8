use std::io::Write;

use crate::errors::BenchError;
use crate::filter;
use crate::report;
use crate::timer;
use crate::types::{BenchmarkGroup, RunConfiguration, TimingResult};

/// Iteration counts above this get a notice before the run starts.
pub const HEADS_UP_ITERATIONS: u32 = 100;

/// How results reach the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// One line per variant, written as soon as it is measured.
    Lines,
    /// Nothing written; the caller formats the returned results.
    Collect,
}

/// Filter every group's variants, time each survivor and report it.
///
/// Groups run in registration order. A failing variant aborts the run; lines
/// already written for earlier variants stay written.
#[tracing::instrument(level = "trace", skip_all, fields(iterations = config.iterations.get()))]
pub fn run_benchmarks(
    groups: &[BenchmarkGroup],
    config: &RunConfiguration,
    style: ReportStyle,
    out: &mut dyn Write,
) -> Result<Vec<TimingResult>, BenchError> {
    if style == ReportStyle::Lines && config.iterations.get() > HEADS_UP_ITERATIONS {
        writeln!(out, "Running benchmarks {} times each...", config.iterations)?;
        writeln!(out)?;
    }

    let selected = filter::select(
        groups.iter().flat_map(BenchmarkGroup::variants),
        &config.filter_substrings,
    );
    tracing::debug!(selected = selected.len(), "variants selected");

    let mut results = Vec::with_capacity(selected.len());
    for variant in selected {
        let result = timer::measure(&variant.description, || variant.render(), config.iterations)?;
        if style == ReportStyle::Lines {
            writeln!(out, "{}", report::format_line(&result))?;
            out.flush()?;
        }
        results.push(result);
    }

    Ok(results)
}
