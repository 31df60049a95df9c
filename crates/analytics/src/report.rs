use chrono::{DateTime, Utc};
use core_types::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-trade economics derived from a single `TradeRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedTrade {
    /// Position of the source record in the input sequence.
    pub index: usize,
    pub symbol: String,
    pub side: Side,
    pub strategy: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,

    pub gross_pnl: Decimal,
    pub commission: Decimal,
    /// Net of commission.
    pub pnl: Decimal,
    /// `pnl` as a fraction of the entry notional (0.05 == 5%).
    pub return_pct: Decimal,
    /// `None` when no stop-loss was logged or the stop sits exactly on the entry price.
    pub r_multiple: Option<Decimal>,
    pub holding_period_secs: i64,

    pub is_win: bool,
    pub is_loss: bool,
}

/// A point on the cumulative P&L curve, one per trade, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
    pub peak: Decimal,
    pub drawdown: Decimal,
}

/// The KPI set for a group of trades.
///
/// Produced once for the whole log and once per strategy / per month. Every field
/// has a well-defined zero value so an empty log renders without special cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    // I. Trade Counts
    pub total_trades: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub breakeven_count: usize,

    // II. Profitability
    pub total_pnl: Decimal,
    pub gross_pnl: Decimal,
    pub total_commission: Decimal,
    /// Fraction in [0, 1] of decided (non-breakeven) trades that won.
    pub win_rate: Decimal,
    pub avg_win: Decimal,
    /// Mean P&L of losing trades, so it is negative or zero.
    pub avg_loss: Decimal,
    pub payoff_ratio: Option<Decimal>, // Option<> because avg_loss can be 0
    pub expectancy: Decimal,
    pub avg_r_multiple: Option<Decimal>, // Option<> when no trade has a defined R
    pub best_trade: Option<Decimal>,
    pub worst_trade: Option<Decimal>,

    // III. Risk
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: Decimal,
    pub sharpe_ratio: Decimal,

    // IV. Time-Based Metrics
    #[serde(with = "humantime_serde")]
    pub avg_holding_period: Duration,
}

impl KpiSummary {
    /// Creates a new, zeroed-out summary.
    pub fn new() -> Self {
        Self {
            total_trades: 0,
            win_count: 0,
            loss_count: 0,
            breakeven_count: 0,
            total_pnl: Decimal::ZERO,
            gross_pnl: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            win_rate: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            payoff_ratio: None,
            expectancy: Decimal::ZERO,
            avg_r_multiple: None,
            best_trade: None,
            worst_trade: None,
            max_drawdown: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: Decimal::ZERO,
            avg_holding_period: Duration::ZERO,
        }
    }

    /// Trades that were either a win or a loss.
    pub fn decided_trades(&self) -> usize {
        self.win_count + self.loss_count
    }
}

impl Default for KpiSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub kpis: KpiSummary,
    /// Same order as the input records.
    pub derived: Vec<DerivedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub by_strategy: BTreeMap<String, KpiSummary>,
    /// Keyed by `YYYY-MM` of the entry time.
    pub by_month: BTreeMap<String, KpiSummary>,
}

impl AnalysisResult {
    /// The `n` most profitable trades, best first.
    pub fn top_trades(&self, n: usize) -> Vec<&DerivedTrade> {
        let mut trades: Vec<&DerivedTrade> = self.derived.iter().collect();
        trades.sort_by(|a, b| b.pnl.cmp(&a.pnl));
        trades.truncate(n);
        trades
    }

    /// The `n` least profitable trades, worst first.
    pub fn worst_trades(&self, n: usize) -> Vec<&DerivedTrade> {
        let mut trades: Vec<&DerivedTrade> = self.derived.iter().collect();
        trades.sort_by(|a, b| a.pnl.cmp(&b.pnl));
        trades.truncate(n);
        trades
    }
}
