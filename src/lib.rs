//! # What is Islay?
//!
//! Islay is a small exchange for the Global Beverage Corporation Exchange (GBCE). It records
//! trades against a fixed set of instruments and derives analytics from them: dividend yield and
//! P/E ratio for a given price, a volume-weighted price over a trailing window, and the GBCE All
//! Share Index, which is the geometric mean of every instrument's volume-weighted price. The
//! standard way to use it is the JSON server but the lib can be imported directly, which is what
//! the tests do.
//!
//! # Implementation
//!
//! An exchange is composed of:
//! - A [Registry](crate::registry::Registry) of instruments. Instruments never change once the
//! exchange starts, so the registry is built up front, either from the sample set or from a CSV
//! file.
//! - A [Ledger](crate::ledger::Ledger) that trades are appended to. Each instrument has its own
//! book and the only way trades leave a book is compaction, which is off unless a retention period
//! is configured.
//! - A [Clock](crate::clock::Clock). Nothing reads the system time directly, the window used for
//! volume-weighted prices always ends at whatever the clock says. Tests pass a
//! [FixedClock](crate::clock::FixedClock).
//! - The [calculations](crate::calculations) themselves, which are pure functions over an
//! instrument or a slice of trades.
//!
//! [Exchange](crate::exchange::Exchange) ties these together and is the only thing the server
//! talks to. It is shared across server workers without an outer lock, books lock individually.
//!
//! Undefined results are errors, not NaNs: a yield or P/E at a price of zero, or a P/E against
//! a zero dividend. The exception is the volume-weighted price of an instrument with no trades in
//! the window, which is zero. This is deliberate and it is why a single untraded instrument
//! takes the index to zero.
//!
//! # Server
//!
//! ``
//! cargo run --bin islay_server [ipv4_address] [port]
//! ``
//!
//! Routes are in [server](crate::http::server) and a Rust client is in
//! [HttpClient](crate::client::HttpClient).
pub mod calculations;
pub mod client;
pub mod clock;
pub mod config;
pub mod exchange;
pub mod http;
pub mod ledger;
pub mod registry;
