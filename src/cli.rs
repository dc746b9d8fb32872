//! CLI definition and dispatch.

use chrono::Duration;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{parse_time_of_day, BacktestParameters, Engine};
use crate::domain::combiner::{Combiner, SignalRole};
use crate::domain::config_validation::{
    signal_ids, signal_section, validate_backtest_config, validate_evaluation_config,
    validate_strategy_config,
};
use crate::domain::error::TradesimError;
use crate::domain::evaluation::{AcceptanceCriteria, EvaluationResult, Evaluator, ScoreWeights};
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::series::{IntegrityPolicy, MarketSeries};
use crate::domain::signal::registry::{self, REGISTERED_SIGNALS};
use crate::domain::strategy::presets::{lookup_preset, PRESETS};
use crate::domain::strategy::{CompositeStrategy, Strategy, StrategySignal};
use crate::domain::trade_registry::TradeRegistry;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Backtester for signal-composed trading strategies")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a CSV bar file and evaluate the result
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Out-of-sample bars used to score stability
        #[arg(long)]
        oos_data: Option<PathBuf>,
    },
    /// Validate a configuration without running it
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List registered signal kinds and strategy presets
    Signals,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            oos_data,
        } => run_backtest(&config, &data, oos_data.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Signals => run_signals(),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Loads a single CSV bar file; the file stem becomes the symbol.
pub fn load_series(path: &Path) -> Result<MarketSeries, TradesimError> {
    let (adapter, symbol) = CsvAdapter::for_file(path)?;
    adapter.load_series(&symbol)
}

/// Everything one `backtest` invocation produces.
#[derive(Debug)]
pub struct BacktestReport {
    pub strategy: String,
    pub in_sample: TradeRegistry,
    pub out_of_sample: Option<TradeRegistry>,
    pub evaluation: EvaluationResult,
}

fn run_backtest(config_path: &Path, data_path: &Path, oos_path: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut series = match load_series(data_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Loaded {} bars for {}", series.len(), series.symbol());

    let mut oos_series = match oos_path.map(load_series).transpose() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Some(oos) = &oos_series {
        eprintln!("Loaded {} out-of-sample bars for {}", oos.len(), oos.symbol());
    }

    match run_pipeline(&adapter, &mut series, oos_series.as_mut()) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            if let TradesimError::RunAborted(aborted) = &e {
                print_registry("Partial Results", &aborted.partial);
            }
            (&e).into()
        }
    }
}

/// Validates the config, builds the strategy and runs it over the in-sample
/// series (and the out-of-sample one when given), then evaluates.
pub fn run_pipeline(
    config: &dyn ConfigPort,
    in_sample: &mut MarketSeries,
    out_of_sample: Option<&mut MarketSeries>,
) -> Result<BacktestReport, TradesimError> {
    validate_config(config)?;

    let parameters = build_backtest_parameters(config)?;
    let policy = build_integrity_policy(config);
    let strategy = build_strategy(config)?;
    let evaluator = build_evaluator(config)?;

    let in_sample = run_series(&parameters, &policy, &strategy, in_sample)?;
    let out_of_sample = match out_of_sample {
        Some(series) => Some(run_series(&parameters, &policy, &strategy, series)?),
        None => None,
    };

    let is_snapshot = in_sample.get_result();
    let evaluation = match (&is_snapshot, &out_of_sample) {
        (Some(is), Some(oos)) => evaluator.evaluate_with_oos(is, oos.get_result().as_ref()),
        _ => evaluator.evaluate_result(is_snapshot.as_ref()),
    };

    Ok(BacktestReport {
        strategy: strategy.name().to_string(),
        in_sample,
        out_of_sample,
        evaluation,
    })
}

/// Every section check, first failure wins.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;
    validate_evaluation_config(config)
}

fn run_series(
    parameters: &BacktestParameters,
    policy: &IntegrityPolicy,
    strategy: &CompositeStrategy,
    series: &mut MarketSeries,
) -> Result<TradeRegistry, TradesimError> {
    let symbol = series.symbol().to_string();
    let every = (series.len() / 10).max(1);
    Engine::new(parameters.clone())
        .with_integrity_policy(policy.clone())
        .with_progress(every, |pct| debug!(symbol = %symbol, progress = pct, "backtest progress"))
        .run(strategy, series)
}

pub fn build_backtest_parameters(
    config: &dyn ConfigPort,
) -> Result<BacktestParameters, TradesimError> {
    let parameters = BacktestParameters {
        point_value: config.get_double("backtest", "point_value", 1.0),
        cost_per_trade: config.get_double("backtest", "cost_per_trade", 0.0),
        permit_swingtrade: config.get_bool("backtest", "permit_swingtrade", true),
        entry_time_limit: time_limit(config, "entry_time_limit")?,
        exit_time_limit: time_limit(config, "exit_time_limit")?,
        max_trade_day: max_trade_day(config)?,
        bypass_first_exit_check: config.get_bool("backtest", "bypass_first_exit_check", false),
    };
    parameters.validate()?;
    Ok(parameters)
}

fn time_limit(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<chrono::NaiveTime>, TradesimError> {
    match config.get_string("backtest", key) {
        Some(raw) if !raw.trim().is_empty() => parse_time_of_day(&raw)
            .map(Some)
            .ok_or_else(|| TradesimError::invalid("backtest", key, format!("invalid time '{raw}', expected HH:MM"))),
        _ => Ok(None),
    }
}

fn max_trade_day(config: &dyn ConfigPort) -> Result<Option<u32>, TradesimError> {
    match config.get_string("backtest", "max_trade_day") {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(|_| {
            TradesimError::invalid(
                "backtest",
                "max_trade_day",
                format!("expected a non-negative number of days, got '{raw}'"),
            )
        }),
        _ => Ok(None),
    }
}

pub fn build_integrity_policy(config: &dyn ConfigPort) -> IntegrityPolicy {
    let max_gap = match config.get_int("backtest", "max_gap_minutes", 0) {
        minutes if minutes > 0 => Some(Duration::minutes(minutes)),
        _ => None,
    };
    IntegrityPolicy {
        max_invalid_bars: config.get_int("backtest", "max_invalid_bars", 0).max(0) as usize,
        max_gap,
    }
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<CompositeStrategy, TradesimError> {
    if let Some(preset) = config.get_string("strategy", "preset") {
        return build_preset(config, &preset);
    }
    let name = config
        .get_string("strategy", "name")
        .unwrap_or_else(|| "Unnamed".to_string());

    let mut signals = Vec::new();
    for id in signal_ids(config)? {
        let section = signal_section(&id);
        let kind_name = config
            .get_string(&section, "kind")
            .ok_or_else(|| TradesimError::missing(&section, "kind"))?;
        let kind = registry::build_signal(&kind_name, config, &section)?;
        signals.push(StrategySignal {
            role: build_role(config, &section)?,
            weight: config.get_double(&section, "weight", 1.0),
            label: id,
            kind,
        });
    }

    Ok(CompositeStrategy::new(name, signals)
        .with_combiner(build_combiner(config)?)
        .with_always_active(config.get_bool("strategy", "always_active", false))
        .with_normalized_weights(config.get_bool("strategy", "normalize_weights", false))
        .with_amount(config.get_double("strategy", "amount", 1.0)))
}

/// A preset fixes signals, combiner and `always_active`; `name` and
/// `amount` still come from `[strategy]`.
fn build_preset(config: &dyn ConfigPort, preset: &str) -> Result<CompositeStrategy, TradesimError> {
    let preset = lookup_preset(preset).ok_or_else(|| {
        TradesimError::invalid("strategy", "preset", format!("unknown preset '{}'", preset.trim()))
    })?;
    let mut strategy = preset
        .build()
        .with_amount(config.get_double("strategy", "amount", 1.0));
    if let Some(name) = config.get_string("strategy", "name") {
        strategy = strategy.with_name(name);
    }
    Ok(strategy)
}

fn build_role(config: &dyn ConfigPort, section: &str) -> Result<SignalRole, TradesimError> {
    let role = config
        .get_string(section, "role")
        .unwrap_or_else(|| "entry".to_string());
    match role.trim().to_lowercase().as_str() {
        "entry" => Ok(SignalRole::Entry),
        "filter" => Ok(SignalRole::Filter),
        other => Err(TradesimError::invalid(
            section,
            "role",
            format!("unknown role '{other}', expected entry or filter"),
        )),
    }
}

pub fn build_combiner(config: &dyn ConfigPort) -> Result<Combiner, TradesimError> {
    let name = config
        .get_string("strategy", "combiner")
        .unwrap_or_else(|| "weighted_vote".to_string());
    match name.trim().to_lowercase().as_str() {
        "weighted_vote" => Ok(Combiner::WeightedVote),
        "thresholded" => Ok(Combiner::ThresholdedWeightedVote {
            threshold: config.get_double("strategy", "threshold", 0.0),
        }),
        "gated" => Ok(Combiner::Gated {
            require_all_filters: config.get_bool("strategy", "require_all_filters", true),
            require_entry_agreement: config.get_bool("strategy", "require_entry_agreement", false),
        }),
        "agreement" => Ok(Combiner::Agreement),
        other => Err(TradesimError::invalid(
            "strategy",
            "combiner",
            format!("unknown combiner '{other}'"),
        )),
    }
}

fn optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, TradesimError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(|_| {
            TradesimError::invalid(section, key, format!("expected a number, got '{raw}'"))
        }),
        _ => Ok(None),
    }
}

pub fn build_evaluator(config: &dyn ConfigPort) -> Result<Evaluator, TradesimError> {
    let section = "evaluation";
    let defaults = AcceptanceCriteria::default();
    let criteria = AcceptanceCriteria {
        min_trades: config
            .get_int(section, "min_trades", defaults.min_trades as i64)
            .max(0) as usize,
        min_profit_factor: config.get_double(section, "min_profit_factor", defaults.min_profit_factor),
        max_drawdown: config.get_double(section, "max_drawdown", defaults.max_drawdown),
        min_sharpe: optional_double(config, section, "min_sharpe")?,
        min_cagr: optional_double(config, section, "min_cagr")?,
        min_win_rate: optional_double(config, section, "min_win_rate")?,
        max_consecutive_losses: optional_double(config, section, "max_consecutive_losses")?
            .map(|v| v.max(0.0) as usize),
    };

    let w = ScoreWeights::default();
    let weights = ScoreWeights {
        profit_factor: config.get_double(section, "weight_profit_factor", w.profit_factor),
        drawdown: config.get_double(section, "weight_drawdown", w.drawdown),
        win_rate: config.get_double(section, "weight_win_rate", w.win_rate),
        trades: config.get_double(section, "weight_trades", w.trades),
        sharpe: config.get_double(section, "weight_sharpe", w.sharpe),
        cagr: config.get_double(section, "weight_cagr", w.cagr),
    };

    let mut evaluator = Evaluator::new(criteria)
        .with_weights(weights)
        .with_accept_threshold(config.get_double(section, "accept_threshold", 0.0))
        .with_target_cagr(config.get_double(section, "target_cagr", 0.20));
    if let Some(capital) = optional_double(config, section, "reference_capital")? {
        evaluator = evaluator.with_reference_capital(capital);
    }
    Ok(evaluator)
}

fn print_report(report: &BacktestReport) {
    eprintln!("\nStrategy: {}", report.strategy);
    print_registry("In-Sample Results", &report.in_sample);
    if let Some(oos) = &report.out_of_sample {
        print_registry("Out-of-Sample Results", oos);
    }
    print_evaluation(&report.evaluation);
}

fn print_registry(title: &str, registry: &TradeRegistry) {
    eprintln!("\n=== {title} ===");
    if registry.is_truncated() {
        eprintln!("(truncated: run stopped before the last bar)");
    }
    match registry.get_result() {
        Some(metrics) => print_metrics(&metrics),
        None => eprintln!("No closed trades"),
    }
}

fn print_metrics(m: &MetricsSnapshot) {
    eprintln!("Period:           {} -> {} ({} days)", m.start, m.end, m.duration_days);
    eprintln!(
        "Total Trades:     {} ({} day, {} swing)",
        m.total_trades, m.day_trades, m.swing_trades
    );
    eprintln!(
        "Accuracy:         {:.1}% ({} won, {} lost)",
        m.accuracy * 100.0,
        m.positive_trades,
        m.negative_trades
    );
    eprintln!("Gross Balance:    {:.2}", m.gross_balance);
    eprintln!("Costs:            {:.2}", m.total_cost);
    eprintln!("Tax:              {:.2}", m.total_tax);
    eprintln!("Net Balance:      {:.2}", m.net_balance);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!(
        "Mean Win/Loss:    {:.2} / {:.2} (ratio {:.2})",
        m.mean_win, m.mean_loss, m.mean_win_loss_ratio
    );
    eprintln!("Largest Win/Loss: {:.2} / {:.2}", m.largest_win, m.largest_loss);
    eprintln!("Result Std Dev:   {:.2}", m.result_std);
    match m.drawdown.relative {
        Some(rel) => eprintln!(
            "Max Drawdown:     {:.2} ({:.1}% of peak)",
            m.drawdown.absolute,
            rel * 100.0
        ),
        None => eprintln!("Max Drawdown:     {:.2}", m.drawdown.absolute),
    }
    eprintln!(
        "Streaks:          {} wins, {} losses",
        m.max_consecutive_wins, m.max_consecutive_losses
    );
    eprintln!("Sharpe (monthly): {:.2}", m.sharpe);
    eprintln!("Avg Month:        {:.2}", m.average_monthly_result);

    eprintln!("\n  Month      Trades       Gross       Costs         Tax         Net     Balance");
    for month in &m.monthly {
        eprintln!(
            "  {}  {:>6}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}",
            month.month.format("%Y-%m"),
            month.trades,
            month.gross,
            month.costs,
            month.tax,
            month.net,
            month.balance
        );
    }
}

fn print_evaluation(result: &EvaluationResult) {
    eprintln!("\n=== Evaluation ===");
    eprintln!("Grade:            {}", result.grade);
    eprintln!("Score:            {:.3}", result.score);
    if result.stability < 1.0 {
        eprintln!("OOS Stability:    {:.3}", result.stability);
    }
    if result.passed {
        eprintln!("All acceptance gates passed");
    } else {
        for reason in &result.reasons {
            eprintln!("  failed: {reason}");
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let built = validate_config(&adapter).and_then(|()| {
        let params = build_backtest_parameters(&adapter)?;
        let strategy = build_strategy(&adapter)?;
        let evaluator = build_evaluator(&adapter)?;
        Ok::<_, TradesimError>((params, strategy, evaluator))
    });
    let (params, strategy, evaluator) = match built {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nStrategy: {}", strategy.name());
    eprintln!("  combiner:      {}", strategy.combiner().name());
    eprintln!("  always active: {}", strategy.always_active());
    eprintln!("  amount:        {}", strategy.amount());
    for signal in strategy.signals() {
        let role = match signal.role {
            SignalRole::Entry => "entry",
            SignalRole::Filter => "filter",
        };
        eprintln!(
            "  - {} ({}, {role}, weight {})",
            signal.label,
            signal.kind.name(),
            signal.weight
        );
    }
    eprintln!("\nBacktest:");
    eprintln!("  point value:    {}", params.point_value);
    eprintln!("  cost per trade: {}", params.cost_per_trade);
    eprintln!("  swing trades:   {}", params.permit_swingtrade);
    eprintln!("\nEvaluation:");
    eprintln!("  min trades:        {}", evaluator.criteria.min_trades);
    eprintln!("  min profit factor: {}", evaluator.criteria.min_profit_factor);
    eprintln!("  max drawdown:      {}", evaluator.criteria.max_drawdown);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_signals() -> ExitCode {
    for entry in REGISTERED_SIGNALS {
        println!("{:<24} {}", entry.name, entry.summary);
    }
    println!("\nPresets:");
    for preset in PRESETS {
        println!("{:<24} {}", preset.name, preset.summary);
    }
    ExitCode::SUCCESS
}
