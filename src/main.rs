use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use renderbench::config::{self, CliOverrides, Settings};
use renderbench::engine;
use renderbench::filter;
use renderbench::fixture;
use renderbench::logging;
use renderbench::profile;
use renderbench::report;
use renderbench::runner::{self, ReportStyle};
use renderbench::variants;

#[derive(Parser)]
#[command(
    name = "renderbench",
    version,
    about = "Compare template render latency across optimization levels and render modes"
)]
struct Cli {
    /// Run one pass under the call-graph profiler
    #[arg(short, long, conflicts_with = "json")]
    profile: bool,

    /// Renders per variant (default 100)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    number: Option<u32>,

    /// Only run variants whose name contains one of these (case-insensitive)
    filters: Vec<String>,

    /// Print results as JSON once all variants have run
    #[arg(long)]
    json: bool,

    /// Print the selected variants without running them
    #[arg(long, conflicts_with_all = ["profile", "json"])]
    list: bool,

    /// Where the profiler writes its data (default template.prof)
    #[arg(long, value_name = "PATH")]
    profile_output: Option<PathBuf>,

    /// Number of call sites shown after profiling (default 30)
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Settings file (default: $RENDERBENCH_CONFIG, then <config dir>/renderbench/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let settings = Settings::discover(cli.config.as_deref())?;
    let (run_config, profile_options) = config::resolve(
        CliOverrides {
            filters: cli.filters,
            iterations: cli.number,
            profile: cli.profile,
            profile_output: cli.profile_output,
            top: cli.top,
        },
        &settings,
    )?;

    let engine = engine::default_engine();
    let groups = vec![variants::build_group(
        engine.as_ref(),
        fixture::TABLE_TEMPLATE,
        fixture::table_context(),
    )?];

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.list {
        let selected = filter::select(
            groups.iter().flat_map(|g| g.variants()),
            &run_config.filter_substrings,
        );
        write!(out, "{}", report::format_listing(&selected))?;
    } else if run_config.profile_mode {
        profile::profile_run(&groups, &run_config, &profile_options, &mut out)?;
    } else if cli.json {
        let results = runner::run_benchmarks(&groups, &run_config, ReportStyle::Collect, &mut out)?;
        writeln!(out, "{}", report::format_json(&results))?;
    } else {
        runner::run_benchmarks(&groups, &run_config, ReportStyle::Lines, &mut out)?;
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
