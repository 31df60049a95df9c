//! # Trade Metrics Engine
//!
//! This crate turns a journal of closed trades into the KPI set a trader reviews:
//! win rate, payoff ratio, R-multiple, drawdown and a per-trade Sharpe ratio, plus the
//! same KPIs broken down per strategy and per month.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O. It depends only on `core-types` for the `TradeRecord` input.
//! - **Stateless Calculation:** `AnalyticsEngine::compute_analysis` is a pure function of
//!   its input. Every run builds a fresh `AnalysisResult`.
//! - **Fail Fast:** The first invalid record aborts the run with its index and field.
//!   Bad rows are never skipped, since dropping trades would skew every statistic.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: The calculation logic.
//! - `AnalysisResult`, `KpiSummary`, `DerivedTrade`, `EquityPoint`: The output structures.
//! - `AnalyticsError`: The errors that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{AnalyticsEngine, max_drawdown, sharpe_ratio};
pub use error::AnalyticsError;
pub use report::{AnalysisResult, DerivedTrade, EquityPoint, KpiSummary};
