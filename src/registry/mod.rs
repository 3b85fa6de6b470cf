//! Instruments tradable on the exchange and their fixed economic parameters.
//!
//! The registry is built once, before the exchange starts, and is never mutated afterwards. It
//! can be built from the sample instruments (the five GBCE beverage stocks) or read from a CSV
//! file with the header `symbol,kind,last_dividend,fixed_dividend,par_value`.
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use derive_more::{Display, Error};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub enum InstrumentKind {
    Common,
    //Fraction in [0, 1], so 2% is stored as 0.02
    Preferred { fixed_dividend: f64 },
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub kind: InstrumentKind,
    //Pennies
    pub last_dividend: f64,
    //Pennies
    pub par_value: f64,
}

impl Instrument {
    pub fn common(symbol: impl Into<String>, last_dividend: f64, par_value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            kind: InstrumentKind::Common,
            last_dividend,
            par_value,
        }
    }

    pub fn preferred(
        symbol: impl Into<String>,
        last_dividend: f64,
        fixed_dividend: f64,
        par_value: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            kind: InstrumentKind::Preferred { fixed_dividend },
            last_dividend,
            par_value,
        }
    }

    ///The dividend that yield and P/E are measured against. Common stock pays its last dividend,
    ///preferred stock pays a fixed share of par.
    pub fn dividend_basis(&self) -> f64 {
        match self.kind {
            InstrumentKind::Common => self.last_dividend,
            InstrumentKind::Preferred { fixed_dividend } => fixed_dividend * self.par_value,
        }
    }

    pub fn fixed_dividend(&self) -> Option<f64> {
        match self.kind {
            InstrumentKind::Common => None,
            InstrumentKind::Preferred { fixed_dividend } => Some(fixed_dividend),
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |field: &'static str, reason: &'static str| RegistryError::InvalidParameter {
            symbol: self.symbol.clone(),
            field,
            reason,
        };

        if self.symbol.trim().is_empty() {
            return Err(invalid("symbol", "must not be empty"));
        }
        if !self.last_dividend.is_finite() || self.last_dividend < 0.0 {
            return Err(invalid("last_dividend", "must be a non-negative number"));
        }
        if !self.par_value.is_finite() || self.par_value <= 0.0 {
            return Err(invalid("par_value", "must be greater than 0"));
        }
        if let Some(fixed_dividend) = self.fixed_dividend() {
            if !(0.0..=1.0).contains(&fixed_dividend) {
                return Err(invalid("fixed_dividend", "must be between 0 and 1"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Display, Error)]
pub enum RegistryError {
    #[display("duplicate instrument symbol {symbol}")]
    DuplicateSymbol { symbol: String },
    #[display("instrument {symbol} has invalid {field}: {reason}")]
    InvalidParameter {
        symbol: String,
        field: &'static str,
        reason: &'static str,
    },
    #[display("instrument {symbol} has unknown kind {kind}, expected Common or Preferred")]
    UnknownKind { symbol: String, kind: String },
    #[display("could not read instrument file: {source}")]
    Csv { source: csv::Error },
}

impl From<csv::Error> for RegistryError {
    fn from(source: csv::Error) -> Self {
        RegistryError::Csv { source }
    }
}

#[derive(Debug, Deserialize)]
struct InstrumentRow {
    symbol: String,
    kind: String,
    last_dividend: f64,
    fixed_dividend: Option<f64>,
    par_value: f64,
}

impl TryFrom<InstrumentRow> for Instrument {
    type Error = RegistryError;

    fn try_from(row: InstrumentRow) -> Result<Self, Self::Error> {
        match row.kind.trim().to_lowercase().as_str() {
            "common" => Ok(Instrument::common(row.symbol, row.last_dividend, row.par_value)),
            "preferred" => {
                let Some(fixed_dividend) = row.fixed_dividend else {
                    return Err(RegistryError::InvalidParameter {
                        symbol: row.symbol,
                        field: "fixed_dividend",
                        reason: "required for Preferred",
                    });
                };
                Ok(Instrument::preferred(
                    row.symbol,
                    row.last_dividend,
                    fixed_dividend,
                    row.par_value,
                ))
            }
            _ => Err(RegistryError::UnknownKind {
                symbol: row.symbol,
                kind: row.kind,
            }),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    //Kept in insertion order so listings and the index iterate deterministically
    instruments: Vec<Instrument>,
    positions: HashMap<String, usize>,
}

fn positions(instruments: &[Instrument]) -> HashMap<String, usize> {
    instruments
        .iter()
        .enumerate()
        .map(|(pos, instrument)| (instrument.symbol.clone(), pos))
        .collect()
}

impl Registry {
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, RegistryError> {
        for instrument in &instruments {
            instrument.validate()?;
        }
        let positions = positions(&instruments);
        //A repeated symbol keeps only its last position, so earlier copies point elsewhere
        if let Some(duplicate) = instruments
            .iter()
            .enumerate()
            .find(|(pos, instrument)| positions[&instrument.symbol] != *pos)
            .map(|(_, instrument)| instrument)
        {
            return Err(RegistryError::DuplicateSymbol {
                symbol: duplicate.symbol.clone(),
            });
        }
        info!("REGISTRY: Loaded {:?} instruments", instruments.len());
        Ok(Self {
            instruments,
            positions,
        })
    }

    ///Sample data for the Global Beverage Corporation Exchange.
    pub fn sample() -> Self {
        let instruments = vec![
            Instrument::common("TEA", 0.0, 100.0),
            Instrument::common("POP", 8.0, 100.0),
            Instrument::common("ALE", 23.0, 60.0),
            Instrument::preferred("GIN", 8.0, 0.02, 100.0),
            Instrument::common("JOE", 13.0, 250.0),
        ];
        let positions = positions(&instruments);
        Self {
            instruments,
            positions,
        }
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, RegistryError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut instruments = Vec::new();
        for result in rdr.deserialize::<InstrumentRow>() {
            instruments.push(Instrument::try_from(result?)?);
        }
        Self::new(instruments)
    }

    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        Self::from_reader(file)
    }

    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.positions
            .get(symbol)
            .and_then(|pos| self.instruments.get(*pos))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
