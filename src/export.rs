use analytics::AnalysisResult;
use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the full analysis result (KPIs, derived trades, equity curve, breakdowns) as pretty JSON.
pub fn write_json<W: Write>(result: &AnalysisResult, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, result)?;
    Ok(())
}

pub fn write_json_file(result: &AnalysisResult, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_json(result, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::AnalyticsEngine;
    use chrono::{TimeZone, Utc};
    use core_types::{Side, TradeRecord};
    use rust_decimal_macros::dec;

    #[test]
    fn test_json_contains_all_sections() {
        let at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap();
        let trade = TradeRecord::new(at, at, "MSFT", Side::Buy, dec!(100), dec!(110), dec!(10));
        let result = AnalyticsEngine::new().compute_analysis(&[trade]).unwrap();

        let mut buffer = Vec::new();
        write_json(&result, &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        for section in ["kpis", "derived", "equity_curve", "by_strategy", "by_month"] {
            assert!(value.get(section).is_some(), "missing section {}", section);
        }
        assert_eq!(value["derived"][0]["symbol"], "MSFT");
        assert_eq!(value["by_month"]["2024-06"]["total_trades"], 1);
    }
}
