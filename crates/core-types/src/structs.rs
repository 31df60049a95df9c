use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::Side;
use crate::error::CoreError;

/// Strategy label assigned to trades that were logged without one.
pub const DEFAULT_STRATEGY: &str = "unspecified";

/// A single closed trade as it appears in the journal.
///
/// Records are immutable once loaded. Call [`TradeRecord::validate`] before
/// feeding them into any calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub commission: Decimal,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Only used to derive the planned risk (R).
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,

    // Free-text journal columns, carried through untouched.
    pub timeframe: Option<String>,
    pub exit_reason: Option<String>,
    pub notes: Option<String>,
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

impl TradeRecord {
    /// Creates a record with the required fields; optional fields take their defaults.
    pub fn new(
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        symbol: impl Into<String>,
        side: Side,
        entry_price: Decimal,
        exit_price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            entry_time,
            exit_time,
            symbol: symbol.into(),
            side,
            entry_price,
            exit_price,
            quantity,
            commission: Decimal::ZERO,
            strategy: default_strategy(),
            stop_loss: None,
            take_profit: None,
            timeframe: None,
            exit_reason: None,
            notes: None,
        }
    }

    pub fn with_commission(mut self, commission: Decimal) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn with_stop_loss(mut self, stop_loss: Decimal) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_take_profit(mut self, take_profit: Decimal) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    /// Time the position was held.
    pub fn holding_period(&self) -> Duration {
        self.exit_time - self.entry_time
    }

    /// Checks every field constraint and reports the first violation.
    ///
    /// `index` is the record's position in the input sequence and is echoed back in
    /// the error so the offending CSV row can be located.
    pub fn validate(&self, index: usize) -> Result<(), CoreError> {
        let fail = |field: &'static str, value: String, reason: &'static str| {
            Err(CoreError::Validation {
                index,
                field,
                value,
                reason,
            })
        };

        if self.symbol.trim().is_empty() {
            return fail("symbol", self.symbol.clone(), "must not be empty");
        }
        if self.entry_price <= Decimal::ZERO {
            return fail("entry_price", self.entry_price.to_string(), "must be positive");
        }
        if self.exit_price <= Decimal::ZERO {
            return fail("exit_price", self.exit_price.to_string(), "must be positive");
        }
        if self.quantity <= Decimal::ZERO {
            return fail("quantity", self.quantity.to_string(), "must be positive");
        }
        if self.commission < Decimal::ZERO {
            return fail("commission", self.commission.to_string(), "must not be negative");
        }
        if let Some(sl) = self.stop_loss {
            if sl <= Decimal::ZERO {
                return fail("stop_loss", sl.to_string(), "must be positive");
            }
        }
        if let Some(tp) = self.take_profit {
            if tp <= Decimal::ZERO {
                return fail("take_profit", tp.to_string(), "must be positive");
            }
        }
        if self.entry_time > self.exit_time {
            return fail(
                "exit_time",
                self.exit_time.to_rfc3339(),
                "must not be earlier than entry_time",
            );
        }

        Ok(())
    }
}
