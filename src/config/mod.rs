//! Server configuration, read from positional arguments and the environment.
//!
//! ``
//! islay_server [address] [port]
//! ``
//!
//! | Variable | Default | |
//! |---|---|---|
//! | `ISLAY_WINDOW_SECS` | 300 | Trailing window for volume-weighted prices |
//! | `ISLAY_RETENTION_SECS` | unset | Keep trades this long, unset keeps everything |
//! | `ISLAY_COMPACT_EVERY_SECS` | 60 | How often retention is applied |
//! | `ISLAY_INSTRUMENTS` | unset | CSV file of instruments, unset uses the sample set |
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use time::Duration;

use crate::exchange::ExchangeConfig;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
const DEFAULT_WINDOW_SECS: i64 = 300;
const DEFAULT_COMPACT_EVERY_SECS: i64 = 60;

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub exchange: ExchangeConfig,
    pub compact_every: Duration,
    pub instruments: Option<PathBuf>,
}

fn seconds(name: &str, value: Option<String>) -> Result<Option<Duration>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let secs: i64 = value
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a whole number of seconds, got {value:?}"))?;
    if secs <= 0 {
        bail!("{name} must be greater than 0, got {secs}");
    }
    Ok(Some(Duration::seconds(secs)))
}

impl ServerConfig {
    ///`args` excludes the program name. `env` looks up a variable by name, it is a parameter so
    ///that tests do not have to mutate the process environment.
    pub fn load(
        mut args: impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let address = args.next().unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let port = match args.next() {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("port must be a number, got {port:?}"))?,
            None => DEFAULT_PORT,
        };

        let window = seconds("ISLAY_WINDOW_SECS", env("ISLAY_WINDOW_SECS"))?
            .unwrap_or(Duration::seconds(DEFAULT_WINDOW_SECS));
        let retention = seconds("ISLAY_RETENTION_SECS", env("ISLAY_RETENTION_SECS"))?;
        let compact_every = seconds("ISLAY_COMPACT_EVERY_SECS", env("ISLAY_COMPACT_EVERY_SECS"))?
            .unwrap_or(Duration::seconds(DEFAULT_COMPACT_EVERY_SECS));
        let instruments = env("ISLAY_INSTRUMENTS").map(PathBuf::from);

        Ok(Self {
            address,
            port,
            exchange: ExchangeConfig { window, retention },
            compact_every,
            instruments,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::load(std::env::args().skip(1), |name| std::env::var(name).ok())
    }
}
