//! Pure calculations over instruments and trades. Nothing in here touches the ledger or the
//! clock, callers pass in the instrument and the window of trades they want measured.
use derive_more::{Display, Error};

use crate::ledger::Trade;
use crate::registry::Instrument;

///Reasons a well-formed calculation has no meaningful numeric result.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
pub enum Undefined {
    #[display("Price must be greater than 0")]
    NonPositivePrice,
    #[display("Dividend must be greater than 0")]
    ZeroDividend,
    #[display("Index requires at least one instrument")]
    NoInstruments,
    #[display("Result is too large to represent")]
    NonFinite,
}

fn check_price(price: f64) -> Result<(), Undefined> {
    //NaN fails this comparison too
    if price > 0.0 {
        Ok(())
    } else {
        Err(Undefined::NonPositivePrice)
    }
}

fn check_finite(value: f64) -> Result<f64, Undefined> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Undefined::NonFinite)
    }
}

pub fn dividend_yield(instrument: &Instrument, price: f64) -> Result<f64, Undefined> {
    check_price(price)?;
    check_finite(instrument.dividend_basis() / price)
}

pub fn pe_ratio(instrument: &Instrument, price: f64) -> Result<f64, Undefined> {
    check_price(price)?;
    let dividend = instrument.dividend_basis();
    if dividend == 0.0 {
        return Err(Undefined::ZeroDividend);
    }
    check_finite(price / dividend)
}

///Quantity-weighted mean price of the trades given. An empty window is valued at zero rather than
///being undefined, which is what drives the exchange index to zero for an untraded instrument.
///
///The mean is updated one trade at a time instead of dividing total notional by total quantity,
///so it always lies between the lowest and highest price and cannot overflow.
pub fn volume_weighted_price(trades: &[Trade]) -> f64 {
    let mut mean = 0.0;
    let mut quantity = 0.0;
    for trade in trades {
        let qty = trade.quantity as f64;
        quantity += qty;
        if quantity > 0.0 {
            mean += (trade.price - mean) * (qty / quantity);
        }
    }
    mean
}

///Geometric mean of the values, `(v_1 * ... * v_n) ^ (1/n)`.
///
///The product is never formed: a large universe of prices overflows it long before the root is
///taken, and a universe of small prices underflows it. Instead the mean of the natural logs is
///exponentiated. Any zero makes the whole mean zero, which is checked first because ln(0) is
///-inf. Values are prices and so never negative.
pub fn geometric_mean(values: &[f64]) -> Result<f64, Undefined> {
    if values.is_empty() {
        return Err(Undefined::NoInstruments);
    }
    if values.iter().any(|v| *v == 0.0) {
        return Ok(0.0);
    }

    let n = values.len() as f64;
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    check_finite((log_sum / n).exp())
}
