use crate::error::AnalyticsError;
use crate::report::{AnalysisResult, DerivedTrade, EquityPoint, KpiSummary};
use core_types::TradeRecord;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::time::Duration;

/// A stateless calculator for deriving performance metrics from a trade journal.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for analysing a trade journal.
    ///
    /// # Arguments
    ///
    /// * `trades` - The closed trades, already in chronological order. The engine never
    ///   re-sorts; drawdown and Sharpe are computed in the order given.
    ///
    /// # Returns
    ///
    /// The full `AnalysisResult`, the first `AnalyticsError::Validation` encountered, or
    /// `AnalyticsError::Calculation` when a value leaves the `Decimal` range.
    /// An empty slice is not an error and yields a zeroed summary.
    pub fn compute_analysis(&self, trades: &[TradeRecord]) -> Result<AnalysisResult, AnalyticsError> {
        for (index, trade) in trades.iter().enumerate() {
            trade.validate(index)?;
        }

        let derived = trades
            .iter()
            .enumerate()
            .map(|(index, trade)| self.derive_trade(index, trade))
            .collect::<Result<Vec<DerivedTrade>, AnalyticsError>>()?;

        let equity_curve = build_equity_curve(&derived)?;
        let kpis = self.summarize(&derived)?;

        let by_strategy = self.summarize_groups(&derived, |t| t.strategy.clone())?;
        let by_month = self.summarize_groups(&derived, |t| t.entry_time.format("%Y-%m").to_string())?;

        tracing::info!(
            trades = kpis.total_trades,
            strategies = by_strategy.len(),
            months = by_month.len(),
            total_pnl = %kpis.total_pnl,
            "Trade analysis complete."
        );

        Ok(AnalysisResult {
            kpis,
            derived,
            equity_curve,
            by_strategy,
            by_month,
        })
    }

    /// Computes the per-trade economics of a single, already validated record.
    pub fn derive_trade(&self, index: usize, trade: &TradeRecord) -> Result<DerivedTrade, AnalyticsError> {
        let gross_pnl = (trade.exit_price - trade.entry_price)
            .checked_mul(trade.quantity)
            .map(|pnl| pnl * trade.side.direction())
            .ok_or_else(|| overflow("gross_pnl", index))?;
        let pnl = gross_pnl
            .checked_sub(trade.commission)
            .ok_or_else(|| overflow("pnl", index))?;

        let notional = trade
            .entry_price
            .checked_mul(trade.quantity)
            .ok_or_else(|| overflow("notional", index))?;
        let return_pct = if notional > Decimal::ZERO {
            pnl.checked_div(notional).ok_or_else(|| overflow("return_pct", index))?
        } else {
            Decimal::ZERO
        };

        // Planned risk is undefined without a stop or with a stop on the entry price.
        let r_multiple = match trade.stop_loss {
            Some(stop) => {
                let planned_risk = (trade.entry_price - stop)
                    .abs()
                    .checked_mul(trade.quantity)
                    .ok_or_else(|| overflow("planned_risk", index))?;
                if planned_risk.is_zero() {
                    None
                } else {
                    Some(pnl.checked_div(planned_risk).ok_or_else(|| overflow("r_multiple", index))?)
                }
            }
            None => None,
        };

        Ok(DerivedTrade {
            index,
            symbol: trade.symbol.clone(),
            side: trade.side,
            strategy: trade.strategy.clone(),
            entry_time: trade.entry_time,
            exit_time: trade.exit_time,
            gross_pnl,
            commission: trade.commission,
            pnl,
            return_pct,
            r_multiple,
            holding_period_secs: trade.holding_period().num_seconds(),
            is_win: pnl > Decimal::ZERO,
            is_loss: pnl < Decimal::ZERO,
        })
    }

    /// Aggregates a group of derived trades, taken in the order given, into a `KpiSummary`.
    pub fn summarize(&self, trades: &[DerivedTrade]) -> Result<KpiSummary, AnalyticsError> {
        let mut report = KpiSummary::new();

        if trades.is_empty() {
            return Ok(report);
        }

        self.calculate_profitability(trades, &mut report)?;
        self.calculate_drawdown(trades, &mut report)?;
        self.calculate_ratios(trades, &mut report)?;
        self.calculate_time_metrics(trades, &mut report);

        tracing::debug!(
            trades = report.total_trades,
            win_rate = %report.win_rate,
            max_drawdown = %report.max_drawdown,
            "Summarized trade group."
        );

        Ok(report)
    }

    /// Partitions the trades by `key` (preserving input order inside each group) and
    /// summarizes each group independently.
    fn summarize_groups<F>(
        &self,
        trades: &[DerivedTrade],
        key: F,
    ) -> Result<BTreeMap<String, KpiSummary>, AnalyticsError>
    where
        F: Fn(&DerivedTrade) -> String,
    {
        let mut groups: BTreeMap<String, Vec<DerivedTrade>> = BTreeMap::new();
        for trade in trades {
            groups.entry(key(trade)).or_default().push(trade.clone());
        }

        groups
            .into_iter()
            .map(|(label, group)| self.summarize(&group).map(|summary| (label, summary)))
            .collect()
    }

    /// Counts, averages and expectancy.
    fn calculate_profitability(
        &self,
        trades: &[DerivedTrade],
        report: &mut KpiSummary,
    ) -> Result<(), AnalyticsError> {
        report.total_trades = trades.len();

        report.total_pnl = checked_sum(trades.iter().map(|t| t.pnl), "total_pnl")?;
        report.gross_pnl = checked_sum(trades.iter().map(|t| t.gross_pnl), "gross_pnl")?;
        report.total_commission = checked_sum(trades.iter().map(|t| t.commission), "total_commission")?;

        let wins: Vec<Decimal> = trades.iter().filter(|t| t.is_win).map(|t| t.pnl).collect();
        let losses: Vec<Decimal> = trades.iter().filter(|t| t.is_loss).map(|t| t.pnl).collect();
        report.win_count = wins.len();
        report.loss_count = losses.len();
        report.breakeven_count = trades.len() - wins.len() - losses.len();

        report.best_trade = trades.iter().map(|t| t.pnl).max();
        report.worst_trade = trades.iter().map(|t| t.pnl).min();

        if !wins.is_empty() {
            report.avg_win = checked_sum(wins.into_iter(), "avg_win")? / Decimal::from(report.win_count);
        }
        if !losses.is_empty() {
            report.avg_loss = checked_sum(losses.into_iter(), "avg_loss")? / Decimal::from(report.loss_count);
        }

        // --- Ratios ---
        let decided = report.decided_trades();
        if decided > 0 {
            report.win_rate = Decimal::from(report.win_count) / Decimal::from(decided);
            report.expectancy =
                report.win_rate * report.avg_win + (Decimal::ONE - report.win_rate) * report.avg_loss;
        }

        if !report.avg_loss.is_zero() {
            let payoff = report
                .avg_win
                .checked_div(report.avg_loss.abs())
                .ok_or_else(|| range_error("payoff_ratio"))?;
            report.payoff_ratio = Some(payoff);
        }

        let r_values: Vec<Decimal> = trades.iter().filter_map(|t| t.r_multiple).collect();
        if !r_values.is_empty() {
            let count = Decimal::from(r_values.len());
            report.avg_r_multiple = Some(checked_sum(r_values.into_iter(), "avg_r_multiple")? / count);
        }

        Ok(())
    }

    /// Calculates maximum drawdown from the group's own cumulative P&L curve.
    fn calculate_drawdown(
        &self,
        trades: &[DerivedTrade],
        report: &mut KpiSummary,
    ) -> Result<(), AnalyticsError> {
        let equity = cumulative_pnl(trades)?;
        let (absolute, pct) = max_drawdown(&equity)?;
        report.max_drawdown = absolute;
        report.max_drawdown_pct = pct;
        Ok(())
    }

    /// Calculates the per-trade Sharpe ratio.
    fn calculate_ratios(&self, trades: &[DerivedTrade], report: &mut KpiSummary) -> Result<(), AnalyticsError> {
        let returns: Vec<Decimal> = trades.iter().map(|t| t.return_pct).collect();
        report.sharpe_ratio = sharpe_ratio(&returns)?;
        Ok(())
    }

    /// Calculates time-based metrics.
    fn calculate_time_metrics(&self, trades: &[DerivedTrade], report: &mut KpiSummary) {
        let total_secs: i64 = trades.iter().map(|t| t.holding_period_secs).sum();
        let avg_secs = total_secs / trades.len() as i64;
        report.avg_holding_period = Duration::from_secs(u64::try_from(avg_secs).unwrap_or(0));
    }
}

fn overflow(metric: &'static str, index: usize) -> AnalyticsError {
    AnalyticsError::Calculation {
        metric,
        reason: format!("trade at row {} exceeds the decimal range", index),
    }
}

fn range_error(metric: &'static str) -> AnalyticsError {
    AnalyticsError::Calculation {
        metric,
        reason: "result exceeds the decimal range".to_string(),
    }
}

fn checked_sum<I>(mut values: I, metric: &'static str) -> Result<Decimal, AnalyticsError>
where
    I: Iterator<Item = Decimal>,
{
    values.try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v).ok_or_else(|| range_error(metric)))
}

/// Running prefix sum of P&L in the order given.
fn cumulative_pnl(trades: &[DerivedTrade]) -> Result<Vec<Decimal>, AnalyticsError> {
    let mut curve = Vec::with_capacity(trades.len());
    let mut equity = Decimal::ZERO;
    for trade in trades {
        equity = equity.checked_add(trade.pnl).ok_or_else(|| range_error("equity"))?;
        curve.push(equity);
    }
    Ok(curve)
}

fn build_equity_curve(trades: &[DerivedTrade]) -> Result<Vec<EquityPoint>, AnalyticsError> {
    let equity = cumulative_pnl(trades)?;
    let mut curve = Vec::with_capacity(trades.len());
    let mut peak: Option<Decimal> = None;

    for (trade, value) in trades.iter().zip(equity) {
        let current_peak = peak.map_or(value, |p| p.max(value));
        peak = Some(current_peak);
        curve.push(EquityPoint {
            index: trade.index,
            timestamp: trade.exit_time,
            equity: value,
            peak: current_peak,
            drawdown: current_peak.checked_sub(value).ok_or_else(|| range_error("drawdown"))?,
        });
    }

    Ok(curve)
}

/// Largest peak-to-trough decline of an equity curve.
///
/// Returns `(absolute, percentage)`. The peak starts at the first point of the curve.
/// The percentage is measured against the running peak at the trough and only where
/// that peak is strictly positive. Both values are non-negative.
pub fn max_drawdown(equity: &[Decimal]) -> Result<(Decimal, Decimal), AnalyticsError> {
    let Some(&first) = equity.first() else {
        return Ok((Decimal::ZERO, Decimal::ZERO));
    };

    let mut peak = first;
    let mut max_dd = Decimal::ZERO;
    let mut max_dd_pct = Decimal::ZERO;

    for &value in equity {
        if value > peak {
            peak = value;
        }
        let drawdown = peak.checked_sub(value).ok_or_else(|| range_error("max_drawdown"))?;
        if drawdown > max_dd {
            max_dd = drawdown;
        }
        if peak > Decimal::ZERO {
            let pct = drawdown
                .checked_div(peak)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or_else(|| range_error("max_drawdown_pct"))?;
            if pct > max_dd_pct {
                max_dd_pct = pct;
            }
        }
    }

    Ok((max_dd, max_dd_pct))
}

/// Mean return over its Bessel-corrected standard deviation. Not annualized.
///
/// Returns zero for fewer than two returns or a zero standard deviation.
pub fn sharpe_ratio(returns: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    if returns.len() < 2 {
        return Ok(Decimal::ZERO);
    }

    let n = Decimal::from(returns.len());
    let mean = checked_sum(returns.iter().copied(), "sharpe_ratio")? / n;
    let mut sum_sq = Decimal::ZERO;
    for r in returns {
        sum_sq = r
            .checked_sub(mean)
            .and_then(|d| d.checked_mul(d))
            .and_then(|sq| sum_sq.checked_add(sq))
            .ok_or_else(|| range_error("sharpe_ratio"))?;
    }
    let variance = sum_sq / (n - Decimal::ONE);

    if variance <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    let std_dev = variance.sqrt().ok_or_else(|| AnalyticsError::Calculation {
        metric: "sharpe_ratio",
        reason: format!("square root of variance {} failed", variance),
    })?;

    if std_dev.is_zero() {
        return Ok(Decimal::ZERO);
    }

    mean.checked_div(std_dev).ok_or_else(|| range_error("sharpe_ratio"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{CoreError, Side};
    use rust_decimal_macros::dec;

    fn trade(day: u32, side: Side, entry: Decimal, exit: Decimal, qty: Decimal) -> TradeRecord {
        TradeRecord::new(
            Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, day, 14, 0, 0).unwrap(),
            "ES",
            side,
            entry,
            exit,
            qty,
        )
    }

    /// A long trade of one unit producing exactly `pnl`.
    fn with_pnl(day: u32, pnl: Decimal) -> TradeRecord {
        trade(day, Side::Buy, dec!(100), dec!(100) + pnl, dec!(1))
    }

    #[test]
    fn test_single_winning_long() {
        let engine = AnalyticsEngine::new();
        let result = engine
            .compute_analysis(&[trade(1, Side::Buy, dec!(100), dec!(110), dec!(10))])
            .unwrap();

        let derived = &result.derived[0];
        assert_eq!(derived.pnl, dec!(100));
        assert!(derived.is_win);
        assert_eq!(derived.return_pct, dec!(0.1));
        assert_eq!(result.kpis.win_rate, Decimal::ONE);
        assert_eq!(result.kpis.max_drawdown, Decimal::ZERO);
        assert_eq!(result.kpis.sharpe_ratio, Decimal::ZERO);
        assert_eq!(result.kpis.avg_holding_period, Duration::from_secs(4 * 3600));
    }

    #[test]
    fn test_short_pnl_and_commission() {
        let engine = AnalyticsEngine::new();
        let record = trade(1, Side::Sell, dec!(50), dec!(45), dec!(4)).with_commission(dec!(2));
        let derived = engine.derive_trade(0, &record).unwrap();
        assert_eq!(derived.gross_pnl, dec!(20));
        assert_eq!(derived.pnl, dec!(18));
        assert_eq!(derived.commission, dec!(2));
    }

    #[test]
    fn test_drawdown_scenario() {
        let engine = AnalyticsEngine::new();
        let trades = vec![with_pnl(1, dec!(50)), with_pnl(2, dec!(-30)), with_pnl(3, dec!(20))];
        let result = engine.compute_analysis(&trades).unwrap();

        let equity: Vec<Decimal> = result.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity, vec![dec!(50), dec!(20), dec!(40)]);
        assert_eq!(result.kpis.max_drawdown, dec!(30));
        assert_eq!(result.kpis.max_drawdown_pct, dec!(60));
        assert_eq!(result.equity_curve[2].drawdown, dec!(10));
    }

    #[test]
    fn test_max_drawdown_monotonic_curve_is_zero() {
        let (dd, pct) = max_drawdown(&[dec!(1), dec!(1), dec!(5), dec!(9)]).unwrap();
        assert_eq!(dd, Decimal::ZERO);
        assert_eq!(pct, Decimal::ZERO);
        assert_eq!(max_drawdown(&[]).unwrap(), (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn test_drawdown_pct_needs_positive_peak() {
        let (dd, pct) = max_drawdown(&[dec!(-10), dec!(-30)]).unwrap();
        assert_eq!(dd, dec!(20));
        assert_eq!(pct, Decimal::ZERO);

        let engine = AnalyticsEngine::new();
        let kpis = engine
            .compute_analysis(&[with_pnl(1, dec!(-10)), with_pnl(2, dec!(-20))])
            .unwrap()
            .kpis;
        assert_eq!(kpis.max_drawdown, dec!(20));
        assert_eq!(kpis.max_drawdown_pct, Decimal::ZERO);
    }

    #[test]
    fn test_all_breakeven_group() {
        let engine = AnalyticsEngine::new();
        let trades = vec![
            with_pnl(1, Decimal::ZERO),
            with_pnl(2, Decimal::ZERO),
            with_pnl(3, Decimal::ZERO),
        ];
        let kpis = engine.compute_analysis(&trades).unwrap().kpis;

        assert_eq!(kpis.total_trades, 3);
        assert_eq!(kpis.breakeven_count, 3);
        assert_eq!(kpis.win_count + kpis.loss_count, 0);
        assert_eq!(kpis.win_rate, Decimal::ZERO);
        assert_eq!(kpis.expectancy, Decimal::ZERO);
        assert_eq!(kpis.payoff_ratio, None);
        assert_eq!(kpis.best_trade, Some(Decimal::ZERO));
        assert_eq!(kpis.worst_trade, Some(Decimal::ZERO));
    }

    #[test]
    fn test_notional_overflow_is_a_calculation_error() {
        let engine = AnalyticsEngine::new();
        let record = trade(
            1,
            Side::Buy,
            dec!(100000000000000000000),
            dec!(100000000000000000001),
            dec!(10000000000),
        );
        assert!(record.validate(0).is_ok());

        let err = engine.compute_analysis(&[record]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Calculation { metric: "notional", .. }));
    }

    #[test]
    fn test_extreme_returns_overflow_sharpe() {
        let engine = AnalyticsEngine::new();
        let trades = vec![
            trade(1, Side::Buy, dec!(0.000001), dec!(1000000000), dec!(1)),
            trade(2, Side::Buy, dec!(1), dec!(1), dec!(1)),
        ];

        let err = engine.compute_analysis(&trades).unwrap_err();
        assert!(matches!(err, AnalyticsError::Calculation { metric: "sharpe_ratio", .. }));
    }

    #[test]
    fn test_r_multiple_undefined_when_stop_on_entry() {
        let engine = AnalyticsEngine::new();
        let record = trade(1, Side::Buy, dec!(100), dec!(104), dec!(1)).with_stop_loss(dec!(100));
        let result = engine.compute_analysis(&[record]).unwrap();
        assert_eq!(result.derived[0].r_multiple, None);
        assert_eq!(result.kpis.avg_r_multiple, None);
    }

    #[test]
    fn test_r_multiple_uses_planned_risk() {
        let engine = AnalyticsEngine::new();
        let long = trade(1, Side::Buy, dec!(100), dec!(110), dec!(2)).with_stop_loss(dec!(95));
        let short = trade(2, Side::Sell, dec!(100), dec!(104), dec!(1)).with_stop_loss(dec!(102));
        let no_stop = trade(3, Side::Buy, dec!(100), dec!(90), dec!(1));
        let result = engine.compute_analysis(&[long, short, no_stop]).unwrap();

        assert_eq!(result.derived[0].r_multiple, Some(dec!(2)));
        assert_eq!(result.derived[1].r_multiple, Some(dec!(-2)));
        assert_eq!(result.derived[2].r_multiple, None);
        assert_eq!(result.kpis.avg_r_multiple, Some(Decimal::ZERO));
    }

    #[test]
    fn test_breakeven_is_neither_win_nor_loss() {
        let engine = AnalyticsEngine::new();
        let trades = vec![with_pnl(1, dec!(10)), with_pnl(2, Decimal::ZERO), with_pnl(3, dec!(-5))];
        let kpis = engine.compute_analysis(&trades).unwrap().kpis;

        assert_eq!(kpis.total_trades, 3);
        assert_eq!(kpis.win_count, 1);
        assert_eq!(kpis.loss_count, 1);
        assert_eq!(kpis.breakeven_count, 1);
        assert_eq!(kpis.win_rate, dec!(0.5));
        assert_eq!(kpis.avg_win, dec!(10));
        assert_eq!(kpis.avg_loss, dec!(-5));
        assert_eq!(kpis.payoff_ratio, Some(dec!(2)));
        assert_eq!(kpis.expectancy, dec!(2.5));
        assert_eq!(kpis.best_trade, Some(dec!(10)));
        assert_eq!(kpis.worst_trade, Some(dec!(-5)));
    }

    #[test]
    fn test_payoff_undefined_without_losses() {
        let engine = AnalyticsEngine::new();
        let kpis = engine
            .compute_analysis(&[with_pnl(1, dec!(10)), with_pnl(2, dec!(20))])
            .unwrap()
            .kpis;
        assert_eq!(kpis.payoff_ratio, None);
        assert_eq!(kpis.avg_loss, Decimal::ZERO);
    }

    #[test]
    fn test_empty_input_yields_zeroed_summary() {
        let engine = AnalyticsEngine::new();
        let result = engine.compute_analysis(&[]).unwrap();
        assert_eq!(result.kpis, KpiSummary::new());
        assert!(result.derived.is_empty());
        assert!(result.equity_curve.is_empty());
        assert!(result.by_strategy.is_empty());
        assert!(result.by_month.is_empty());
    }

    #[test]
    fn test_sharpe_ratio_sample_std_dev() {
        // mean 0.02, sample variance 0.0008 -> sharpe 1/sqrt(2)
        let sharpe = sharpe_ratio(&[dec!(0.04), dec!(0.00)]).unwrap();
        assert!((sharpe - dec!(0.7071067811)).abs() < dec!(0.000001));

        assert_eq!(sharpe_ratio(&[dec!(0.1)]).unwrap(), Decimal::ZERO);
        assert_eq!(sharpe_ratio(&[dec!(0.1), dec!(0.1)]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_validation_error_names_record() {
        let engine = AnalyticsEngine::new();
        let mut bad = with_pnl(2, dec!(5));
        bad.quantity = dec!(-3);
        let err = engine.compute_analysis(&[with_pnl(1, dec!(5)), bad]).unwrap_err();

        match err {
            AnalyticsError::Validation(CoreError::Validation { index, field, value, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(field, "quantity");
                assert_eq!(value, "-3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_groups_by_strategy_and_month() {
        let engine = AnalyticsEngine::new();
        let mut february = with_pnl(1, dec!(-4)).with_strategy("breakout");
        february.entry_time = Utc.with_ymd_and_hms(2024, 2, 3, 9, 0, 0).unwrap();
        february.exit_time = Utc.with_ymd_and_hms(2024, 2, 3, 11, 0, 0).unwrap();

        let trades = vec![
            with_pnl(1, dec!(10)).with_strategy("breakout"),
            with_pnl(2, dec!(6)),
            february,
        ];
        let result = engine.compute_analysis(&trades).unwrap();

        assert_eq!(result.by_strategy.len(), 2);
        assert_eq!(result.by_strategy["breakout"].total_trades, 2);
        assert_eq!(result.by_strategy["breakout"].total_pnl, dec!(6));
        assert_eq!(result.by_strategy["unspecified"].win_count, 1);

        let months: Vec<&String> = result.by_month.keys().collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        assert_eq!(result.by_month["2024-02"].loss_count, 1);
    }

    #[test]
    fn test_top_and_worst_trades() {
        let engine = AnalyticsEngine::new();
        let trades = vec![with_pnl(1, dec!(3)), with_pnl(2, dec!(-7)), with_pnl(3, dec!(12))];
        let result = engine.compute_analysis(&trades).unwrap();

        let best: Vec<usize> = result.top_trades(2).iter().map(|t| t.index).collect();
        let worst: Vec<usize> = result.worst_trades(1).iter().map(|t| t.index).collect();
        assert_eq!(best, vec![2, 0]);
        assert_eq!(worst, vec![1]);
    }
}
