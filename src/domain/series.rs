//! Market series, indicator side-table and causal per-bar views.

use std::collections::HashMap;

use chrono::Duration;

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::SignalId;

/// Address of one derived column: the owning signal plus a column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndicatorKey {
    pub signal: SignalId,
    pub column: &'static str,
}

impl IndicatorKey {
    pub const fn new(signal: SignalId, column: &'static str) -> Self {
        Self { signal, column }
    }
}

/// Derived columns keyed by `(signal, column)`.
///
/// Each key is written once. After [`IndicatorCache::seal`] no writes are
/// accepted until the cache is cleared for a new run.
#[derive(Debug, Clone, Default)]
pub struct IndicatorCache {
    columns: HashMap<IndicatorKey, Vec<f64>>,
    sealed: bool,
}

impl IndicatorCache {
    pub fn get(&self, key: &IndicatorKey) -> Option<&[f64]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &IndicatorKey) -> bool {
        self.columns.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn insert(&mut self, key: IndicatorKey, values: Vec<f64>) -> Result<(), TradesimError> {
        if self.sealed || self.columns.contains_key(&key) {
            return Err(TradesimError::IndicatorConflict {
                signal: key.signal.0,
                column: key.column.to_string(),
            });
        }
        self.columns.insert(key, values);
        Ok(())
    }

    fn seal(&mut self) {
        self.sealed = true;
    }

    fn clear(&mut self) {
        self.columns.clear();
        self.sealed = false;
    }
}

/// Sanity contract a series must satisfy before a run.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityPolicy {
    /// Bars with non-finite OHLC values tolerated before rejecting the series.
    pub max_invalid_bars: usize,
    /// Largest allowed spacing between consecutive timestamps.
    pub max_gap: Option<Duration>,
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        Self {
            max_invalid_bars: 0,
            max_gap: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketSeries {
    symbol: String,
    bars: Vec<Bar>,
    indicators: IndicatorCache,
}

impl MarketSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
            indicators: IndicatorCache::default(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn indicators(&self) -> &IndicatorCache {
        &self.indicators
    }

    /// Close prices, in bar order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Stores a derived column. The column must cover every bar.
    pub fn insert_column(
        &mut self,
        key: IndicatorKey,
        values: Vec<f64>,
    ) -> Result<(), TradesimError> {
        if values.len() != self.bars.len() {
            return Err(TradesimError::Data {
                reason: format!(
                    "column {} for signal {} has {} values for {} bars",
                    key.column,
                    key.signal,
                    values.len(),
                    self.bars.len()
                ),
            });
        }
        self.indicators.insert(key, values)
    }

    pub fn column(&self, key: &IndicatorKey) -> Option<&[f64]> {
        self.indicators.get(key)
    }

    pub(crate) fn seal_indicators(&mut self) {
        self.indicators.seal();
    }

    pub(crate) fn reset_indicators(&mut self) {
        self.indicators.clear();
    }

    /// Causal view ending at bar `index`, or `None` past the end.
    pub fn window(&self, index: usize) -> Option<SeriesWindow<'_>> {
        if index < self.bars.len() {
            Some(SeriesWindow {
                bars: &self.bars[..=index],
                indicators: &self.indicators,
            })
        } else {
            None
        }
    }

    /// Rejects series that break the ordering or value contract.
    pub fn validate(&self, policy: &IntegrityPolicy) -> Result<(), TradesimError> {
        if self.bars.is_empty() {
            return Err(TradesimError::InsufficientData {
                bars: 0,
                minimum: 1,
            });
        }

        let mut invalid = 0usize;
        for (index, bar) in self.bars.iter().enumerate() {
            if !bar.has_finite_prices() {
                invalid += 1;
                if invalid > policy.max_invalid_bars {
                    return Err(TradesimError::DataIntegrity {
                        index,
                        reason: format!(
                            "{invalid} bars with non-finite OHLC values (tolerance {})",
                            policy.max_invalid_bars
                        ),
                    });
                }
            } else if bar.high < bar.low {
                return Err(TradesimError::DataIntegrity {
                    index,
                    reason: format!("high {} below low {}", bar.high, bar.low),
                });
            }

            if index == 0 {
                continue;
            }
            let prev = &self.bars[index - 1];
            if bar.timestamp <= prev.timestamp {
                return Err(TradesimError::DataIntegrity {
                    index,
                    reason: format!(
                        "timestamp {} does not follow {}",
                        bar.timestamp, prev.timestamp
                    ),
                });
            }
            if let Some(max_gap) = policy.max_gap {
                let gap = bar.timestamp - prev.timestamp;
                if gap > max_gap {
                    return Err(TradesimError::DataIntegrity {
                        index,
                        reason: format!(
                            "gap of {}s exceeds limit of {}s",
                            gap.num_seconds(),
                            max_gap.num_seconds()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Read-only view of bars `0..=i` and the matching prefix of every column.
///
/// Nothing after bar `i` is reachable through a window.
#[derive(Debug, Clone, Copy)]
pub struct SeriesWindow<'a> {
    bars: &'a [Bar],
    indicators: &'a IndicatorCache,
}

impl<'a> SeriesWindow<'a> {
    /// Index of the current (last visible) bar.
    pub fn index(&self) -> usize {
        self.bars.len() - 1
    }

    pub fn current(&self) -> &'a Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    pub fn bar(&self, index: usize) -> Option<&'a Bar> {
        self.bars.get(index)
    }

    /// Bar `offset` steps before the current one.
    pub fn bar_back(&self, offset: usize) -> Option<&'a Bar> {
        self.index().checked_sub(offset).and_then(|i| self.bars.get(i))
    }

    pub fn column(&self, key: &IndicatorKey) -> Option<&'a [f64]> {
        self.indicators.get(key).map(|c| &c[..self.bars.len()])
    }

    /// Current value of a column; `None` while it is still warming up.
    pub fn value(&self, key: &IndicatorKey) -> Option<f64> {
        self.value_back(key, 0)
    }

    /// Value `offset` bars back; `None` if out of range or not finite.
    pub fn value_back(&self, key: &IndicatorKey, offset: usize) -> Option<f64> {
        let index = self.index().checked_sub(offset)?;
        let v = *self.column(key)?.get(index)?;
        v.is_finite().then_some(v)
    }
}
