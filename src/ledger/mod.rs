//! Append-only trade history, one book per registered instrument.
//!
//! Each book is guarded by its own lock so that trades against different instruments never
//! contend. A trade is fully built before the lock is taken and is appended with a single push,
//! so readers either see the whole trade or none of it. Reads clone the qualifying trades out of
//! the book: callers iterate over a snapshot and never hold the lock while doing so.
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use derive_more::{Display, Error};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use time::Duration;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Trade {
    //Unix seconds, UTC
    pub timestamp: i64,
    pub quantity: i64,
    pub side: Side,
    pub price: f64,
}

#[derive(Debug, Display, Error, PartialEq)]
pub enum LedgerError {
    #[display("instrument {symbol} is not registered")]
    UnknownInstrument { symbol: String },
    #[display("invalid trade {field}: {reason}")]
    InvalidTrade {
        field: &'static str,
        reason: &'static str,
    },
}

type Book = RwLock<Vec<Trade>>;

#[derive(Debug, Default)]
pub struct Ledger {
    books: HashMap<String, Book>,
}

impl Ledger {
    ///Creates an empty book for every symbol. The set of books is fixed from here on, which is
    ///what lets the map itself go without a lock.
    pub fn new<'a>(symbols: impl IntoIterator<Item = &'a str>) -> Self {
        let books = symbols
            .into_iter()
            .map(|symbol| (symbol.to_string(), RwLock::new(Vec::new())))
            .collect();
        Self { books }
    }

    fn book(&self, symbol: &str) -> Result<&Book, LedgerError> {
        self.books
            .get(symbol)
            .ok_or_else(|| LedgerError::UnknownInstrument {
                symbol: symbol.to_string(),
            })
    }

    //Appends are a single push of a complete trade so a poisoned book is never torn, carrying on
    //with the inner value is safe.
    fn read(book: &Book) -> RwLockReadGuard<'_, Vec<Trade>> {
        book.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(book: &Book) -> RwLockWriteGuard<'_, Vec<Trade>> {
        book.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate(quantity: i64, price: f64) -> Result<(), LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidTrade {
                field: "quantity",
                reason: "must be greater than 0",
            });
        }
        if !price.is_finite() || price < 0.0 {
            return Err(LedgerError::InvalidTrade {
                field: "price",
                reason: "must be a non-negative number",
            });
        }
        Ok(())
    }

    pub fn record(
        &self,
        symbol: &str,
        timestamp: i64,
        quantity: i64,
        side: Side,
        price: f64,
    ) -> Result<(), LedgerError> {
        let book = self.book(symbol)?;
        Self::validate(quantity, price)?;

        let trade = Trade {
            timestamp,
            quantity,
            side,
            price,
        };
        info!(
            "LEDGER: Recorded {:?} of {:?} {} at {:?} on {:?}",
            side, quantity, symbol, price, timestamp
        );
        Self::write(book).push(trade);
        Ok(())
    }

    ///Trades with `timestamp >= reference_time - duration`, in the order they were recorded. The
    ///lower bound is inclusive and there is no upper bound, trades stamped after the reference
    ///time are included.
    pub fn window(
        &self,
        symbol: &str,
        reference_time: i64,
        duration: Duration,
    ) -> Result<Vec<Trade>, LedgerError> {
        let book = self.book(symbol)?;
        let cutoff = reference_time.saturating_sub(duration.whole_seconds());
        let trades: Vec<Trade> = Self::read(book)
            .iter()
            .filter(|trade| trade.timestamp >= cutoff)
            .cloned()
            .collect();
        debug!(
            "LEDGER: Window for {} from {:?} holds {:?} trades",
            symbol,
            cutoff,
            trades.len()
        );
        Ok(trades)
    }

    pub fn trades(&self, symbol: &str) -> Result<Vec<Trade>, LedgerError> {
        let book = self.book(symbol)?;
        Ok(Self::read(book).clone())
    }

    pub fn len(&self, symbol: &str) -> Result<usize, LedgerError> {
        let book = self.book(symbol)?;
        Ok(Self::read(book).len())
    }

    ///Drops every trade stamped before `cutoff` and returns how many went. Kept trades stay in
    ///the order they were recorded.
    pub fn compact(&self, cutoff: i64) -> usize {
        let mut removed = 0;
        for (symbol, book) in &self.books {
            let mut trades = Self::write(book);
            let before = trades.len();
            trades.retain(|trade| trade.timestamp >= cutoff);
            let dropped = before - trades.len();
            if dropped > 0 {
                info!(
                    "LEDGER: Compacted {:?} trades older than {:?} from {}",
                    dropped, cutoff, symbol
                );
            }
            removed += dropped;
        }
        removed
    }
}
