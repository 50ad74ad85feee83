//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::aggregate::aggregate;
use crate::domain::config_validation::{
    parse_date, parse_enum, parse_modes, positive_count, validate_evaluation_config,
};
use crate::domain::error::SlotwalkError;
use crate::domain::normalize::{NormalizedTable, normalize};
use crate::domain::selector::{RankMetric, RankedSlot, Selection, SelectionConfig};
use crate::domain::settings::{EvaluationSettings, LookbackSpec};
use crate::domain::summary::{PerformanceSummary, display_rows, format_series_table, format_slot_table};
use crate::domain::walk_forward::{Mode, WalkForwardReport, run_walk_forward};
use crate::domain::window::{Period, WindowSpec};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "slotwalk",
    about = "Walk-forward evaluation of entry time slots in trade logs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full walk-forward evaluation
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        /// Trade log CSV, overrides [data] trades
        #[arg(short, long)]
        trades: Option<PathBuf>,
        /// Directory for CSV result files
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Log cycle details to stderr
        #[arg(short, long)]
        verbose: bool,
    },
    /// Rank the slots of the lookback window only
    Slots {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        trades: Option<PathBuf>,
    },
    /// Validate an evaluation configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Evaluate {
            config,
            trades,
            output,
            verbose,
        } => {
            init_logging(verbose);
            run_evaluate(&config, trades.as_deref(), output.as_deref())
        }
        Command::Slots { config, trades } => {
            init_logging(false);
            run_slots(&config, trades.as_deref())
        }
        Command::Validate { config } => run_validate(&config),
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "slotwalk=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SlotwalkError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: SlotwalkError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Reads every evaluation setting from `config`.
pub fn build_settings(config: &dyn ConfigPort) -> Result<EvaluationSettings, SlotwalkError> {
    validate_evaluation_config(config)?;

    let metric = parse_enum::<RankMetric>(config, "selection", "rank_metric")?
        .unwrap_or(RankMetric::Pnl);
    let top_n = positive_count(config, "selection", "top_n", 5)?;
    let mut selection = SelectionConfig::new(metric, top_n)
        .by_weekday(config.get_bool("selection", "by_weekday", false));
    if let Some(period) = parse_enum::<Period>(config, "selection", "period")? {
        let top_per_period = positive_count(config, "selection", "top_per_period", 3)?;
        selection = selection.two_stage(period, top_per_period);
    }

    let lookback = match (
        parse_date(config, "lookback", "start_date")?,
        parse_date(config, "lookback", "end_date")?,
    ) {
        (Some(start), Some(end)) => LookbackSpec::Window(WindowSpec::from_dates(start, end)),
        _ => {
            let months = positive_count(config, "lookback", "months", 0)?;
            LookbackSpec::Months(u32::try_from(months).map_err(|_| {
                SlotwalkError::ConfigInvalid {
                    section: "lookback".into(),
                    key: "months".into(),
                    reason: "months is too large".into(),
                }
            })?)
        }
    };

    let forward = match (
        parse_date(config, "forward", "start_date"),
        parse_date(config, "forward", "end_date"),
    ) {
        (Ok(Some(start)), Ok(Some(end))) => Some(WindowSpec::from_dates(start, end)),
        _ => None,
    };

    Ok(EvaluationSettings {
        trades_path: config.get_value("data", "trades"),
        lookback,
        forward,
        modes: parse_modes(config)?,
        selection,
        step: parse_enum::<Period>(config, "walk_forward", "step")?.unwrap_or(Period::Month),
    })
}

/// `--trades` if given, else `[data] trades`.
pub fn resolve_trades_path(
    trades_override: Option<&Path>,
    settings: &EvaluationSettings,
) -> Result<PathBuf, SlotwalkError> {
    match (trades_override, settings.trades_path.as_deref()) {
        (Some(path), _) => Ok(path.to_path_buf()),
        (None, Some(path)) => Ok(PathBuf::from(path)),
        (None, None) => Err(SlotwalkError::ConfigMissing {
            section: "data".into(),
            key: "trades".into(),
        }),
    }
}

pub fn load_table(data_port: &dyn DataPort) -> Result<NormalizedTable, SlotwalkError> {
    let raw = data_port.load_trades()?;
    normalize(&raw)
}

/// Loads and normalizes the trade log, then runs every configured mode.
pub fn evaluate(
    data_port: &dyn DataPort,
    settings: &EvaluationSettings,
) -> Result<(NormalizedTable, WalkForwardReport), SlotwalkError> {
    let table = load_table(data_port)?;
    let config = settings.walk_forward_config(&table)?;
    let report = run_walk_forward(&table, &config)?;
    Ok((table, report))
}

fn prepare(
    config_path: &Path,
    trades_override: Option<&Path>,
) -> Result<(EvaluationSettings, CsvAdapter), ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let settings = build_settings(&adapter).map_err(fail)?;
    let trades = resolve_trades_path(trades_override, &settings).map_err(fail)?;
    Ok((settings, CsvAdapter::new(trades)))
}

fn run_evaluate(
    config_path: &Path,
    trades_override: Option<&Path>,
    output: Option<&Path>,
) -> ExitCode {
    let (settings, data_port) = match prepare(config_path, trades_override) {
        Ok(p) => p,
        Err(code) => return code,
    };

    eprintln!("Loading trades from {}", data_port.describe());
    let (table, report) = match evaluate(&data_port, &settings) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    eprintln!(
        "Evaluating {} trades, lookback {}, step {}",
        table.len(),
        report.lookback_window,
        settings.step
    );

    print_report(&report);

    if let Some(dir) = output {
        match CsvReportAdapter::new().write(&report, dir) {
            Ok(paths) => {
                for path in paths {
                    eprintln!("Wrote {}", path.display());
                }
            }
            Err(e) => return fail(e),
        }
    }
    ExitCode::SUCCESS
}

pub fn print_report(report: &WalkForwardReport) {
    println!(
        "=== Lookback {} (ranked by {}) ===",
        report.lookback_window, report.metric
    );
    print!("{}", format_slot_table(&report.lookback.slots));
    print_summary(&report.lookback.slots);

    if let Some(forward_table) = &report.forward_table {
        println!("\n=== Forward (fixed) ===");
        print!("{}", format_slot_table(forward_table));
        print_summary(forward_table);
    }

    println!("\n=== Cumulative forward PnL ===");
    print!("{}", format_series_table(report));
    for mode in report.series.keys() {
        if let Some(total) = report.final_cumulative(*mode) {
            println!("  {:<11} total {:>12.2}", mode.to_string(), total);
        }
    }
}

fn print_summary(rows: &[RankedSlot]) {
    if let Some(s) = PerformanceSummary::of(rows) {
        println!(
            "  mean PnL {:.2}, mean PCR {:.4} over {} slots",
            s.mean_pnl, s.mean_pcr, s.rows
        );
    }
}

fn run_slots(config_path: &Path, trades_override: Option<&Path>) -> ExitCode {
    let (settings, data_port) = match prepare(config_path, trades_override) {
        Ok(p) => p,
        Err(code) => return code,
    };

    eprintln!("Loading trades from {}", data_port.describe());
    let table = match load_table(&data_port) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let window = match settings.lookback.resolve(&table) {
        Ok(w) => w,
        Err(e) => return fail(e),
    };
    if let Err(e) = settings.selection.validate() {
        return fail(e);
    }

    let selection = lookback_slots(&table, &settings.selection, &window);
    println!("=== Selected slots, {} ===", window);
    print!("{}", format_slot_table(&selection.slots));
    print_summary(&selection.slots);
    ExitCode::SUCCESS
}

/// Prints every lookback slot ranked, then returns the selection.
fn lookback_slots(
    table: &NormalizedTable,
    selection: &SelectionConfig,
    window: &WindowSpec,
) -> Selection {
    let mut schema = selection.schema();
    if let Some(ts) = selection.two_stage {
        schema = schema.with_period(ts.period);
    }
    let rows = display_rows(&aggregate(table, window, schema), selection.metric);
    println!("=== All slots, {} (ranked by {}) ===", window, selection.metric);
    print!("{}", format_slot_table(&rows));
    println!();
    selection.select(table, window)
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let settings = match build_settings(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    eprintln!("\nSelection:");
    eprintln!("  rank_metric: {}", settings.selection.metric);
    eprintln!("  top_n:       {}", settings.selection.top_n);
    eprintln!("  by_weekday:  {}", settings.selection.by_weekday);
    if let Some(ts) = settings.selection.two_stage {
        eprintln!("  two-stage:   top {} per {}", ts.top_per_period, ts.period);
    }

    eprintln!("\nWalk-forward:");
    match settings.lookback {
        LookbackSpec::Window(w) => eprintln!("  lookback: {}", w),
        LookbackSpec::Months(m) => eprintln!("  lookback: first {} months of data", m),
    }
    let modes: Vec<String> = settings.modes.iter().map(Mode::to_string).collect();
    eprintln!("  modes:    {}", modes.join(", "));
    eprintln!("  step:     {}", settings.step);
    if settings.modes.contains(&Mode::Fixed) {
        if let Some(fw) = settings.forward {
            eprintln!("  forward:  {}", fw);
        }
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
