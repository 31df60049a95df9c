use analytics::{AnalysisResult, DerivedTrade, KpiSummary};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use configuration::ReportSettings;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// Prints the full console report: summary, per-strategy, per-month and trade tables.
pub fn print_report(result: &AnalysisResult, settings: &ReportSettings, show_trades: bool) {
    let dp = settings.decimals;

    println!("TRADE LOG ANALYSIS");
    println!("{}", summary_table(&result.kpis, dp));

    if !result.by_strategy.is_empty() {
        println!("\nBY STRATEGY");
        println!("{}", breakdown_table("Strategy", &result.by_strategy, dp));
    }

    if !result.by_month.is_empty() {
        println!("\nBY MONTH");
        println!("{}", breakdown_table("Month", &result.by_month, dp));
    }

    if show_trades && !result.derived.is_empty() {
        println!("\nBEST TRADES");
        println!("{}", trades_table(&result.top_trades(settings.top_trades), dp));
        println!("\nWORST TRADES");
        println!("{}", trades_table(&result.worst_trades(settings.top_trades), dp));
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Two-column Metric / Value table of the headline KPIs.
pub fn summary_table(kpis: &KpiSummary, dp: u32) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);

    let rows: Vec<(&str, String)> = vec![
        ("Total Trades", kpis.total_trades.to_string()),
        ("Winning Trades", kpis.win_count.to_string()),
        ("Losing Trades", kpis.loss_count.to_string()),
        ("Breakeven Trades", kpis.breakeven_count.to_string()),
        ("Win Rate", percent(kpis.win_rate, dp)),
        ("Payoff Ratio", optional(kpis.payoff_ratio, dp)),
        ("Expectancy", money(kpis.expectancy, dp)),
        ("Avg R-Multiple", optional(kpis.avg_r_multiple, dp)),
        ("Total P&L", money(kpis.total_pnl, dp)),
        ("Total Commission", money(kpis.total_commission, dp)),
        ("Avg Win", money(kpis.avg_win, dp)),
        ("Avg Loss", money(kpis.avg_loss, dp)),
        ("Best Trade", optional(kpis.best_trade, dp)),
        ("Worst Trade", optional(kpis.worst_trade, dp)),
        (
            "Max Drawdown",
            format!("{} ({}%)", money(kpis.max_drawdown, dp), money(kpis.max_drawdown_pct, dp)),
        ),
        ("Sharpe Ratio", money(kpis.sharpe_ratio, dp)),
        (
            "Avg Holding Period",
            humantime::format_duration(kpis.avg_holding_period).to_string(),
        ),
    ];

    for (metric, value) in rows {
        table.add_row(vec![metric.to_string(), value]);
    }
    table
}

/// One row per group label (strategy or month).
pub fn breakdown_table(label: &str, groups: &BTreeMap<String, KpiSummary>, dp: u32) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        label,
        "Trades",
        "Wins",
        "Win Rate",
        "Total P&L",
        "Avg P&L",
        "Avg R",
        "Max DD",
    ]);

    for (name, kpis) in groups {
        let avg_pnl = if kpis.total_trades > 0 {
            kpis.total_pnl / Decimal::from(kpis.total_trades)
        } else {
            Decimal::ZERO
        };
        table.add_row(vec![
            name.clone(),
            kpis.total_trades.to_string(),
            kpis.win_count.to_string(),
            percent(kpis.win_rate, dp),
            money(kpis.total_pnl, dp),
            money(avg_pnl, dp),
            optional(kpis.avg_r_multiple, dp),
            money(kpis.max_drawdown, dp),
        ]);
    }
    table
}

pub fn trades_table(trades: &[&DerivedTrade], dp: u32) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Entry", "Symbol", "Side", "Strategy", "P&L", "Return", "R"]);

    for trade in trades {
        table.add_row(vec![
            trade.index.to_string(),
            trade.entry_time.format("%Y-%m-%d %H:%M").to_string(),
            trade.symbol.clone(),
            trade.side.to_string(),
            trade.strategy.clone(),
            money(trade.pnl, dp),
            percent(trade.return_pct, dp),
            trade
                .r_multiple
                .map(|r| format!("{}R", money(r, dp)))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

/// Rounds half away from zero and pads to exactly `dp` decimal places.
fn money(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded.to_string()
}

/// Renders a fraction (0.25) as a percentage ("25.00%").
fn percent(fraction: Decimal, dp: u32) -> String {
    format!("{}%", money(fraction * Decimal::ONE_HUNDRED, dp))
}

fn optional(value: Option<Decimal>, dp: u32) -> String {
    value.map(|v| money(v, dp)).unwrap_or_else(|| "n/a".to_string())
}
