//! CLI integration tests for config builders and the backtest pipeline.
//!
//! Tests cover:
//! - Config parsing (build_backtest_parameters, build_strategy, build_evaluator)
//! - Pipeline runs over in-memory series, with and without out-of-sample data
//! - CSV loading from real files on disk
//! - Command dispatch and exit codes

mod common;

use approx::assert_abs_diff_eq;
use clap::Parser;
use common::*;
use std::process::ExitCode;
use tradesim::adapters::file_config_adapter::FileConfigAdapter;
use tradesim::cli::{self, Cli};
use tradesim::domain::combiner::{Combiner, SignalRole};
use tradesim::domain::error::TradesimError;
use tradesim::domain::evaluation::Grade;
use tradesim::domain::strategy::Strategy;

const VALID_INI: &str = r#"
[backtest]
point_value = 2.0
cost_per_trade = 0.5
permit_swingtrade = true
entry_time_limit = 16:00
exit_time_limit = 17:30
max_trade_day = 5
bypass_first_exit_check = false

[strategy]
name = SMA Crossover
signals = cross
combiner = weighted_vote
amount = 1

[signal.cross]
kind = ma_crossover
short_ma = sma
short_period = 1
long_ma = sma
long_period = 2

[evaluation]
min_trades = 10
min_profit_factor = 1.2
max_drawdown = 0.25
"#;

fn config(content: &str) -> FileConfigAdapter {
    FileConfigAdapter::from_string(content).unwrap()
}

fn exit_code_of(cli_args: &[&str]) -> String {
    let cli = Cli::try_parse_from(cli_args).unwrap();
    format!("{:?}", cli::run(cli))
}

fn code(value: u8) -> String {
    format!("{:?}", ExitCode::from(value))
}

mod config_loading {
    use super::*;

    #[test]
    fn build_backtest_parameters_valid_full() {
        let params = cli::build_backtest_parameters(&config(VALID_INI)).unwrap();
        assert_eq!(params.point_value, 2.0);
        assert_eq!(params.cost_per_trade, 0.5);
        assert!(params.permit_swingtrade);
        assert_eq!(params.entry_time_limit, chrono::NaiveTime::from_hms_opt(16, 0, 0));
        assert_eq!(params.exit_time_limit, chrono::NaiveTime::from_hms_opt(17, 30, 0));
        assert_eq!(params.max_trade_day, Some(5));
        assert!(!params.bypass_first_exit_check);
    }

    #[test]
    fn build_backtest_parameters_uses_defaults() {
        let params = cli::build_backtest_parameters(&config("[backtest]\n")).unwrap();
        assert_eq!(params.point_value, 1.0);
        assert_eq!(params.cost_per_trade, 0.0);
        assert!(params.permit_swingtrade);
        assert_eq!(params.entry_time_limit, None);
        assert_eq!(params.max_trade_day, None);
    }

    #[test]
    fn build_backtest_parameters_rejects_bad_values() {
        let err = cli::build_backtest_parameters(&config("[backtest]\nexit_time_limit = noon\n"))
            .unwrap_err();
        assert!(matches!(err, TradesimError::ConfigInvalid { ref key, .. } if key == "exit_time_limit"));

        let err = cli::build_backtest_parameters(&config("[backtest]\nmax_trade_day = two\n"))
            .unwrap_err();
        assert!(matches!(err, TradesimError::ConfigInvalid { ref key, .. } if key == "max_trade_day"));

        let err = cli::build_backtest_parameters(&config("[backtest]\npoint_value = -1\n"))
            .unwrap_err();
        assert!(matches!(err, TradesimError::ConfigInvalid { ref key, .. } if key == "point_value"));
    }

    #[test]
    fn build_strategy_reads_signals_in_order() {
        let ini = r#"
[strategy]
name = Gated Trend
signals = trend, fast, chop
combiner = gated
require_all_filters = false
require_entry_agreement = true
always_active = true
amount = 2

[signal.trend]
kind = adx_dmi
role = filter

[signal.fast]
kind = MA_CROSSOVER
weight = 2.5

[signal.chop]
kind = choppiness
role = Filter
"#;
        let strategy = cli::build_strategy(&config(ini)).unwrap();
        assert_eq!(strategy.name(), "Gated Trend");
        assert!(strategy.always_active());
        assert_eq!(strategy.amount(), 2.0);
        assert_eq!(
            strategy.combiner(),
            &Combiner::Gated {
                require_all_filters: false,
                require_entry_agreement: true,
            }
        );

        let labels: Vec<&str> = strategy.signals().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["trend", "fast", "chop"]);
        let signals = strategy.signals();
        assert_eq!(signals[0].role, SignalRole::Filter);
        assert_eq!(signals[0].kind.name(), "adx_dmi");
        assert_eq!(signals[1].role, SignalRole::Entry);
        assert_eq!(signals[1].weight, 2.5);
        assert_eq!(signals[2].role, SignalRole::Filter);
    }

    #[test]
    fn build_strategy_from_preset() {
        let ini = "[strategy]\npreset = range_fader\nname = Fader\namount = 2\n";
        let strategy = cli::build_strategy(&config(ini)).unwrap();
        assert_eq!(strategy.name(), "Fader");
        assert_eq!(strategy.amount(), 2.0);
        assert_eq!(strategy.combiner(), &Combiner::Agreement);
        let kinds: Vec<&str> = strategy.signals().iter().map(|s| s.kind.name()).collect();
        assert_eq!(kinds, vec!["choppiness", "rsi_reversion", "bollinger"]);

        let momentum = cli::build_strategy(&config("[strategy]\npreset = momentum_rider\n")).unwrap();
        assert_eq!(momentum.name(), "momentum_rider");
        assert!(momentum.always_active());
    }

    #[test]
    fn build_strategy_agreement_combiner() {
        let ini = "[strategy]\nsignals = a\ncombiner = agreement\n[signal.a]\nkind = rsi_reversion\n";
        let strategy = cli::build_strategy(&config(ini)).unwrap();
        assert_eq!(strategy.combiner(), &Combiner::Agreement);
    }

    #[test]
    fn build_strategy_defaults_to_weighted_vote() {
        let strategy =
            cli::build_strategy(&config("[strategy]\nsignals = a\n[signal.a]\nkind = bollinger\n"))
                .unwrap();
        assert_eq!(strategy.name(), "Unnamed");
        assert_eq!(strategy.combiner(), &Combiner::WeightedVote);
        assert!(!strategy.always_active());
    }

    #[test]
    fn build_strategy_thresholded_combiner() {
        let ini = "[strategy]\nsignals = a\ncombiner = thresholded\nthreshold = 0.4\n[signal.a]\nkind = rsi_reversion\n";
        let strategy = cli::build_strategy(&config(ini)).unwrap();
        assert_eq!(
            strategy.combiner(),
            &Combiner::ThresholdedWeightedVote { threshold: 0.4 }
        );
    }

    #[test]
    fn build_strategy_unknown_kind() {
        let err = cli::build_strategy(&config("[strategy]\nsignals = a\n[signal.a]\nkind = tarot\n"))
            .unwrap_err();
        assert!(matches!(err, TradesimError::UnknownSignal { ref name } if name == "tarot"));
    }

    #[test]
    fn build_evaluator_reads_criteria() {
        let ini = r#"
[evaluation]
min_trades = 40
min_profit_factor = 1.5
max_drawdown = 0.3
min_sharpe = 0.8
max_consecutive_losses = 6
accept_threshold = 0.4
reference_capital = 50000
weight_cagr = 0.2
"#;
        let evaluator = cli::build_evaluator(&config(ini)).unwrap();
        assert_eq!(evaluator.criteria.min_trades, 40);
        assert_eq!(evaluator.criteria.min_profit_factor, 1.5);
        assert_eq!(evaluator.criteria.max_drawdown, 0.3);
        assert_eq!(evaluator.criteria.min_sharpe, Some(0.8));
        assert_eq!(evaluator.criteria.min_cagr, None);
        assert_eq!(evaluator.criteria.max_consecutive_losses, Some(6));
        assert_eq!(evaluator.accept_threshold, 0.4);
        assert_eq!(evaluator.reference_capital, Some(50000.0));
        assert_eq!(evaluator.weights.cagr, 0.2);
        assert_eq!(evaluator.weights.profit_factor, 0.35);
    }

    #[test]
    fn build_evaluator_rejects_non_numeric_optional() {
        let err = cli::build_evaluator(&config("[evaluation]\nmin_sharpe = high\n")).unwrap_err();
        assert!(matches!(err, TradesimError::ConfigInvalid { ref key, .. } if key == "min_sharpe"));
    }

    #[test]
    fn integrity_policy_from_config() {
        let policy =
            cli::build_integrity_policy(&config("[backtest]\nmax_invalid_bars = 3\nmax_gap_minutes = 30\n"));
        assert_eq!(policy.max_invalid_bars, 3);
        assert_eq!(policy.max_gap, Some(chrono::Duration::minutes(30)));
        assert_eq!(cli::build_integrity_policy(&config("[backtest]\n")).max_gap, None);
    }
}

mod pipeline {
    use super::*;

    #[test]
    fn crossover_run_is_evaluated() {
        let mut series = daily_series(&[10.0, 10.0, 12.0, 13.0, 11.0]);
        let report = cli::run_pipeline(&config(VALID_INI), &mut series, None).unwrap();

        assert_eq!(report.strategy, "SMA Crossover");
        let trades = report.in_sample.trades();
        assert_eq!(trades.len(), 1);
        assert_abs_diff_eq!(trades[0].net_pnl, (11.0 - 12.0) * 2.0 - 0.5, epsilon = 1e-12);
        assert!(report.out_of_sample.is_none());

        let evaluation = &report.evaluation;
        assert!(!evaluation.passed);
        assert_eq!(evaluation.grade, Grade::Reject);
        assert_eq!(evaluation.metrics.trades, 1);
        assert_eq!(evaluation.stability, 1.0);
    }

    #[test]
    fn run_without_trades_is_rejected() {
        let mut series = daily_series(&[10.0, 10.0, 10.0, 10.0]);
        let report = cli::run_pipeline(&config(VALID_INI), &mut series, None).unwrap();
        assert!(report.in_sample.trades().is_empty());
        assert!(!report.evaluation.passed);
        assert_eq!(report.evaluation.metrics.trades, 0);
    }

    #[test]
    fn out_of_sample_series_is_run_too() {
        let mut in_sample = daily_series(&[10.0, 10.0, 12.0, 13.0, 11.0]);
        let mut out_of_sample = daily_series(&[20.0, 20.0, 22.0, 21.0]);
        let report =
            cli::run_pipeline(&config(VALID_INI), &mut in_sample, Some(&mut out_of_sample)).unwrap();
        let oos = report.out_of_sample.unwrap();
        assert_eq!(oos.trades().len(), 1);
        assert!((0.0..=1.0).contains(&report.evaluation.stability));
    }

    #[test]
    fn invalid_config_stops_before_running() {
        let ini = VALID_INI.replace("combiner = weighted_vote", "combiner = coin_flip");
        let mut series = daily_series(&[10.0, 10.0, 12.0]);
        let err = cli::run_pipeline(&config(&ini), &mut series, None).unwrap_err();
        assert!(matches!(err, TradesimError::ConfigInvalid { ref key, .. } if key == "combiner"));
        assert!(series.indicators().is_empty());
    }
}

mod files {
    use super::*;

    const BARS_CSV: &str = "timestamp,open,high,low,close,volume\n\
        2024-01-01,10,11,9,10,100\n\
        2024-01-02,10,11,9,10,100\n\
        2024-01-03,12,13,11,12,100\n\
        2024-01-04,13,14,12,13,100\n\
        2024-01-05,11,12,10,11,100\n";

    #[test]
    fn load_series_uses_file_stem_as_symbol() {
        let file = write_temp_file(".csv", BARS_CSV);
        let series = cli::load_series(file.path()).unwrap();
        let stem = file.path().file_stem().unwrap().to_string_lossy().into_owned();
        assert_eq!(series.symbol(), stem);
        assert_eq!(series.len(), 5);
        assert_eq!(series.bars()[2].close, 12.0);
    }

    #[test]
    fn backtest_command_succeeds() {
        let ini = write_temp_file(".ini", VALID_INI);
        let csv = write_temp_file(".csv", BARS_CSV);
        let result = exit_code_of(&[
            "tradesim",
            "backtest",
            "--config",
            ini.path().to_str().unwrap(),
            "--data",
            csv.path().to_str().unwrap(),
        ]);
        assert_eq!(result, format!("{:?}", ExitCode::SUCCESS));
    }

    #[test]
    fn backtest_command_with_missing_data_fails() {
        let ini = write_temp_file(".ini", VALID_INI);
        let result = exit_code_of(&[
            "tradesim",
            "backtest",
            "-c",
            ini.path().to_str().unwrap(),
            "-d",
            "/nonexistent/bars.csv",
        ]);
        assert_eq!(result, code(5));
    }

    #[test]
    fn validate_command_exit_codes() {
        let ini = write_temp_file(".ini", VALID_INI);
        let ok = exit_code_of(&["tradesim", "validate", "-c", ini.path().to_str().unwrap()]);
        assert_eq!(ok, format!("{:?}", ExitCode::SUCCESS));

        let bad = write_temp_file(".ini", "[backtest]\npoint_value = 0\n[strategy]\nsignals = a\n");
        let failed = exit_code_of(&["tradesim", "validate", "-c", bad.path().to_str().unwrap()]);
        assert_eq!(failed, code(2));

        let unknown = write_temp_file(".ini", "[strategy]\nsignals = a\n[signal.a]\nkind = tea_leaves\n");
        let failed = exit_code_of(&["tradesim", "validate", "-c", unknown.path().to_str().unwrap()]);
        assert_eq!(failed, code(4));
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let result = exit_code_of(&["tradesim", "validate", "-c", "/nonexistent/config.ini"]);
        assert_eq!(result, code(2));
    }

    #[test]
    fn signals_command_lists_kinds() {
        assert_eq!(
            exit_code_of(&["tradesim", "signals"]),
            format!("{:?}", ExitCode::SUCCESS)
        );
    }

    #[test]
    fn verbosity_flag_counts() {
        let cli = Cli::try_parse_from(["tradesim", "-vv", "signals"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
