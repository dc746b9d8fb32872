//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive. Sections such as
//! `[signal.fast]` are ordinary names to the parser.

use std::path::Path;
use std::str::FromStr;

use configparser::ini::Ini;

use crate::domain::error::TradesimError;
use crate::ports::config_port::ConfigPort;

/// Name reported in parse errors for configs built from a string.
const INLINE_SOURCE: &str = "<inline>";

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    /// Reads and parses `path`. An unreadable file is reported the same way
    /// as a malformed one.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradesimError> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| TradesimError::ConfigParse {
            file: source.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&source, content)
    }

    pub fn from_string(content: &str) -> Result<Self, TradesimError> {
        Self::parse(INLINE_SOURCE, content.to_string())
    }

    fn parse(source: &str, content: String) -> Result<Self, TradesimError> {
        let mut ini = Ini::new();
        ini.read(content).map_err(|reason| TradesimError::ConfigParse {
            file: source.to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    /// Value of `key` parsed as `T`; `None` when absent or unparsable.
    fn typed<T: FromStr>(&self, section: &str, key: &str) -> Option<T> {
        self.ini.get(section, key)?.trim().parse().ok()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.typed(section, key).unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.typed(section, key).unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get(section, key)
            .and_then(|v| parse_flag(&v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[backtest]
point_value = 0.2
cost_per_trade = 1.5

[strategy]
name = Trend Follower
signals = fast, trend

[signal.fast]
kind = ma_crossover
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("Trend Follower".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "signals"),
            Some("fast, trend".to_string())
        );
        assert_eq!(
            adapter.get_string("signal.fast", "kind"),
            Some("ma_crossover".to_string())
        );
    }

    #[test]
    fn time_values_keep_their_colons() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nexit_time_limit = 17:30\n").unwrap();
        assert_eq!(
            adapter.get_string("backtest", "exit_time_limit"),
            Some("17:30".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\npoint_value = 1\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nmax_trade_day = 5\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "max_trade_day", 0), 5);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "missing", 42), 42);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nmax_trade_day = abc\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "max_trade_day", 42), 42);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter = FileConfigAdapter::from_string("[backtest]\npoint_value = 0.25\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "point_value", 0.0), 0.25);
    }

    #[test]
    fn get_double_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\npoint_value = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "point_value", 99.9), 99.9);
        assert_eq!(adapter.get_double("backtest", "missing", 1.5), 1.5);
    }

    #[test]
    fn get_bool_returns_true_values() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\na = true\nb = yes\nc = 1\n").unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(adapter.get_bool("backtest", "b", false));
        assert!(adapter.get_bool("backtest", "c", false));
    }

    #[test]
    fn get_bool_returns_false_values() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\na = false\nb = no\nc = 0\n").unwrap();
        assert!(!adapter.get_bool("backtest", "a", true));
        assert!(!adapter.get_bool("backtest", "b", true));
        assert!(!adapter.get_bool("backtest", "c", true));
    }

    #[test]
    fn get_bool_accepts_on_off() {
        let adapter = FileConfigAdapter::from_string("[strategy]\na = On\nb = off\n").unwrap();
        assert!(adapter.get_bool("strategy", "a", false));
        assert!(!adapter.get_bool("strategy", "b", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing_or_garbage() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nflag = maybe\n").unwrap();
        assert!(adapter.get_bool("backtest", "missing", true));
        assert!(!adapter.get_bool("backtest", "missing", false));
        assert!(adapter.get_bool("backtest", "flag", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[evaluation]\nmin_trades = 30\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_int("evaluation", "min_trades", 0), 30);
    }

    #[test]
    fn from_file_names_the_missing_file() {
        match FileConfigAdapter::from_file("/nonexistent/path/config.ini") {
            Err(TradesimError::ConfigParse { file, .. }) => {
                assert_eq!(file, "/nonexistent/path/config.ini")
            }
            other => panic!("expected ConfigParse, got {:?}", other.err()),
        }
    }

    #[test]
    fn malformed_string_is_a_parse_error() {
        let err = FileConfigAdapter::from_string("[backtest\npoint_value = 1\n").unwrap_err();
        assert!(matches!(err, TradesimError::ConfigParse { ref file, .. } if file == "<inline>"));
    }
}
