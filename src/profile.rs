//! Call-graph profiling of a single benchmark pass.
//!
//! A [`CallGraphSession`] stacks an aggregating layer on top of the normal
//! logging layer and runs the pipeline under it. Every span the pipeline opens
//! (filtering, timing, rendering, formatting) counts as a call site. When the
//! session stops, the totals are written to a JSON artifact; the report is
//! always produced from the artifact on disk, never from memory.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::callsite::Identifier;
use tracing::span;
use tracing::{Metadata, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

use crate::errors::BenchError;
use crate::logging;
use crate::runner::{self, ReportStyle};
use crate::types::{BenchmarkGroup, RunConfiguration};

pub const DEFAULT_OUTPUT: &str = "template.prof";
pub const DEFAULT_TOP: usize = 30;

/// Where the artifact goes and how much of it to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOptions {
    pub output: PathBuf,
    pub top: usize,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            top: DEFAULT_TOP,
        }
    }
}

/// A profiling facility: wrap calls, then persist what was recorded.
pub trait ProfilingSession {
    fn wrap<R>(&mut self, f: impl FnOnce() -> R) -> R;

    /// Persist the recording and return the artifact path.
    fn stop(self) -> Result<PathBuf, BenchError>;
}

#[derive(Debug, Clone, Copy, Default)]
struct SiteTotals {
    calls: u64,
    cumulative: Duration,
}

type Totals = Arc<Mutex<HashMap<Identifier, (&'static Metadata<'static>, SiteTotals)>>>;

/// Entry timestamps of a span; a span may be entered again before it exits.
struct EnteredAt(Vec<Instant>);

struct CallGraphLayer {
    totals: Totals,
}

impl<S> Layer<S> for CallGraphLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_enter(&self, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<EnteredAt>() {
            Some(entered) => entered.0.push(Instant::now()),
            None => extensions.insert(EnteredAt(vec![Instant::now()])),
        }
    }

    fn on_exit(&self, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let started = span
            .extensions_mut()
            .get_mut::<EnteredAt>()
            .and_then(|entered| entered.0.pop());
        let Some(started) = started else { return };

        let elapsed = started.elapsed();
        let metadata = span.metadata();
        if let Ok(mut totals) = self.totals.lock() {
            let (_, site) = totals
                .entry(metadata.callsite())
                .or_insert((metadata, SiteTotals::default()));
            site.calls += 1;
            site.cumulative += elapsed;
        }
    }
}

/// In-process call-graph session backed by `tracing` spans.
pub struct CallGraphSession {
    output: PathBuf,
    totals: Totals,
    started_at: DateTime<Utc>,
    wall: Duration,
}

impl CallGraphSession {
    pub fn start(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            totals: Arc::default(),
            started_at: Utc::now(),
            wall: Duration::ZERO,
        }
    }

    fn snapshot(&self) -> Vec<CallSiteStats> {
        let totals = match self.totals.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        totals
            .values()
            .map(|(metadata, site)| CallSiteStats {
                file: metadata.file().unwrap_or("~").to_string(),
                line: metadata.line().unwrap_or(0),
                name: metadata.name().to_string(),
                calls: site.calls,
                cumulative_seconds: site.cumulative.as_secs_f64(),
            })
            .collect()
    }
}

impl ProfilingSession for CallGraphSession {
    fn wrap<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::registry()
            .with(logging::stderr_layer())
            .with(CallGraphLayer {
                totals: Arc::clone(&self.totals),
            });
        let start = Instant::now();
        let result = tracing::subscriber::with_default(subscriber, f);
        self.wall += start.elapsed();
        result
    }

    fn stop(self) -> Result<PathBuf, BenchError> {
        let artifact = ProfileStats {
            recorded_at: self.started_at,
            wall_seconds: self.wall.as_secs_f64(),
            sites: self.snapshot(),
        };
        write_artifact(&self.output, &artifact)?;
        tracing::info!(path = %self.output.display(), "profile data written");
        Ok(self.output)
    }
}

/// Totals for one call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSiteStats {
    pub file: String,
    pub line: u32,
    pub name: String,
    pub calls: u64,
    pub cumulative_seconds: f64,
}

impl CallSiteStats {
    /// `file:line(name)`
    pub fn label(&self) -> String {
        format!("{}:{}({})", self.file, self.line, self.name)
    }
}

/// Contents of a profiling artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub recorded_at: DateTime<Utc>,
    pub wall_seconds: f64,
    pub sites: Vec<CallSiteStats>,
}

impl ProfileStats {
    /// Drop directory prefixes from file names, merging sites that collide.
    pub fn strip_dirs(&mut self) {
        let mut merged: Vec<CallSiteStats> = Vec::with_capacity(self.sites.len());
        for mut site in self.sites.drain(..) {
            if let Some(base) = Path::new(&site.file).file_name() {
                site.file = base.to_string_lossy().into_owned();
            }
            match merged
                .iter_mut()
                .find(|m| m.file == site.file && m.line == site.line && m.name == site.name)
            {
                Some(existing) => {
                    existing.calls += site.calls;
                    existing.cumulative_seconds += site.cumulative_seconds;
                }
                None => merged.push(site),
            }
        }
        self.sites = merged;
    }

    /// Order by cumulative time, then call count, both descending.
    pub fn sort(&mut self) {
        self.sites.sort_by(|a, b| {
            b.cumulative_seconds
                .total_cmp(&a.cumulative_seconds)
                .then(b.calls.cmp(&a.calls))
        });
    }

    pub fn total_calls(&self) -> u64 {
        self.sites.iter().map(|s| s.calls).sum()
    }

    /// Summary line, column header and the first `top` sites.
    pub fn format(&self, top: usize) -> String {
        let mut out = format!(
            "         {} calls in {:.3} seconds\n\n",
            self.total_calls(),
            self.wall_seconds
        );
        out.push_str(&format!(
            "{:>9}  {:>9}  {:>9}  call site\n",
            "ncalls", "cumtime", "percall"
        ));
        for site in self.sites.iter().take(top) {
            let per_call = if site.calls == 0 {
                0.0
            } else {
                site.cumulative_seconds / site.calls as f64
            };
            out.push_str(&format!(
                "{:>9}  {:>9.3}  {:>9.3}  {}\n",
                site.calls,
                site.cumulative_seconds,
                per_call,
                site.label()
            ));
        }
        out
    }
}

fn write_artifact(path: &Path, stats: &ProfileStats) -> Result<(), BenchError> {
    let write_error = |source: std::io::Error| BenchError::ProfileWrite {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, stats).map_err(|e| write_error(e.into()))?;
    writer.flush().map_err(write_error)?;
    writer.get_ref().sync_all().map_err(write_error)?;
    Ok(())
}

/// Read an artifact back from disk.
pub fn load_stats(path: &Path) -> Result<ProfileStats, BenchError> {
    let load_error = |detail: String| BenchError::ProfileLoad {
        path: path.to_path_buf(),
        detail,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| load_error(e.to_string()))
}

/// Run one pass of every selected variant under a [`CallGraphSession`] and
/// print the hottest call sites.
///
/// The configured iteration count is ignored; each variant renders once. The
/// artifact is written even when the pass fails, and its path is the last
/// line of output on success. A failed pass is reported ahead of a failed
/// artifact write.
pub fn profile_run(
    groups: &[BenchmarkGroup],
    config: &RunConfiguration,
    options: &ProfileOptions,
    out: &mut dyn Write,
) -> Result<ProfileStats, BenchError> {
    writeln!(out, "Profiling...")?;
    writeln!(out)?;

    let single = config.single_pass();
    let mut session = CallGraphSession::start(&options.output);
    let outcome = session.wrap(|| runner::run_benchmarks(groups, &single, ReportStyle::Lines, out));
    let path = match (outcome, session.stop()) {
        (Ok(_), stopped) => stopped?,
        (Err(run_err), Ok(_)) => return Err(run_err),
        (Err(run_err), Err(write_err)) => {
            tracing::error!(error = %write_err, "profile data not written");
            return Err(run_err);
        }
    };

    let mut stats = load_stats(&path)?;
    stats.strip_dirs();
    stats.sort();

    writeln!(out)?;
    write!(out, "{}", stats.format(options.top))?;
    writeln!(out, "Profile data written to {}", path.display())?;
    Ok(stats)
}
