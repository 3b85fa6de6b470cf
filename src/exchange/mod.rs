//! The exchange is the single object the rest of the application talks to. It is built once at
//! startup from a registry and a clock and owns the ledger that trades are recorded into.
//! Every operation is keyed by instrument symbol and returns an [ExchangeError] rather than
//! panicking on bad input or undefined results.
use std::sync::Arc;

use derive_more::{Display, Error};
use log::{debug, info, warn};
use time::Duration;

use crate::calculations::{self, Undefined};
use crate::clock::Clock;
use crate::ledger::{Ledger, LedgerError, Side, Trade};
use crate::registry::{Instrument, Registry};

#[derive(Debug, Display, Error, PartialEq)]
pub enum ExchangeError {
    #[display("Instrument {symbol} not found")]
    NotFound { symbol: String },
    #[display("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },
    #[display("{source}")]
    UndefinedResult { source: Undefined },
    #[display("Exchange has no instruments to build an index from")]
    EmptyRegistry,
}

impl ExchangeError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ExchangeError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<LedgerError> for ExchangeError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::UnknownInstrument { symbol } => ExchangeError::NotFound { symbol },
            LedgerError::InvalidTrade { field, reason } => {
                ExchangeError::invalid_input(field, reason)
            }
        }
    }
}

impl From<Undefined> for ExchangeError {
    fn from(source: Undefined) -> Self {
        match source {
            Undefined::NoInstruments => ExchangeError::EmptyRegistry,
            _ => ExchangeError::UndefinedResult { source },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExchangeConfig {
    ///Trailing window used for volume-weighted prices and the index.
    pub window: Duration,
    ///How long trades are kept for. `None` keeps every trade for the life of the process.
    pub retention: Option<Duration>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            window: Duration::minutes(5),
            retention: None,
        }
    }
}

pub struct Exchange {
    registry: Registry,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
    config: ExchangeConfig,
}

impl Exchange {
    pub fn new(registry: Registry, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(registry, clock, ExchangeConfig::default())
    }

    pub fn with_config(registry: Registry, clock: Arc<dyn Clock>, config: ExchangeConfig) -> Self {
        let ledger = Ledger::new(registry.symbols());
        info!(
            "EXCHANGE: Started with {:?} instruments and a {:?} window",
            registry.len(),
            config.window
        );
        Self {
            registry,
            ledger,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    fn instrument(&self, symbol: &str) -> Result<&Instrument, ExchangeError> {
        self.registry
            .get(symbol)
            .ok_or_else(|| ExchangeError::NotFound {
                symbol: symbol.to_string(),
            })
    }

    pub fn instruments(&self) -> &[Instrument] {
        self.registry.instruments()
    }

    pub fn dividend_yield(&self, symbol: &str, price: f64) -> Result<f64, ExchangeError> {
        let instrument = self.instrument(symbol)?;
        let res = calculations::dividend_yield(instrument, price)?;
        debug!("EXCHANGE: Dividend yield of {} at {:?} is {:?}", symbol, price, res);
        Ok(res)
    }

    pub fn pe_ratio(&self, symbol: &str, price: f64) -> Result<f64, ExchangeError> {
        let instrument = self.instrument(symbol)?;
        let res = calculations::pe_ratio(instrument, price)?;
        debug!("EXCHANGE: P/E ratio of {} at {:?} is {:?}", symbol, price, res);
        Ok(res)
    }

    pub fn record_trade(
        &self,
        symbol: &str,
        timestamp: i64,
        quantity: i64,
        side: Side,
        price: f64,
    ) -> Result<(), ExchangeError> {
        self.ledger
            .record(symbol, timestamp, quantity, side, price)
            .map_err(|err| {
                warn!("EXCHANGE: Rejected trade for {}: {}", symbol, err);
                ExchangeError::from(err)
            })
    }

    pub fn trades(&self, symbol: &str) -> Result<Vec<Trade>, ExchangeError> {
        Ok(self.ledger.trades(symbol)?)
    }

    pub fn volume_weighted_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        self.volume_weighted_price_at(symbol, self.clock.now())
    }

    ///Volume-weighted price over the window ending at `reference_time`. No trades in the window
    ///gives zero, not an error.
    pub fn volume_weighted_price_at(
        &self,
        symbol: &str,
        reference_time: i64,
    ) -> Result<f64, ExchangeError> {
        let trades = self
            .ledger
            .window(symbol, reference_time, self.config.window)?;
        Ok(calculations::volume_weighted_price(&trades))
    }

    pub fn exchange_index(&self) -> Result<f64, ExchangeError> {
        self.exchange_index_at(self.clock.now())
    }

    ///Geometric mean of every instrument's volume-weighted price at `reference_time`. All
    ///instruments are measured against the same reference time.
    pub fn exchange_index_at(&self, reference_time: i64) -> Result<f64, ExchangeError> {
        let mut prices = Vec::with_capacity(self.registry.len());
        for symbol in self.registry.symbols() {
            prices.push(self.volume_weighted_price_at(symbol, reference_time)?);
        }
        let res = calculations::geometric_mean(&prices)?;
        debug!("EXCHANGE: Index at {:?} is {:?}", reference_time, res);
        Ok(res)
    }

    ///Drops trades that can no longer fall into any window. Does nothing unless a retention
    ///period is configured. The cutoff is never later than the start of the current window.
    pub fn compact(&self) -> usize {
        match self.config.retention {
            Some(retention) => {
                let keep = retention.max(self.config.window);
                let cutoff = self.clock.now().saturating_sub(keep.whole_seconds());
                self.ledger.compact(cutoff)
            }
            None => 0,
        }
    }
}
