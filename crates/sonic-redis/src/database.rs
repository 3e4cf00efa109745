use std::{fmt, str::FromStr};

use sonic_common::error::{ExporterError, Result};

/// Logical SONiC databases, each living at a fixed Redis index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Database {
    Appl,
    Counters,
    Config,
    State,
}

impl Database {
    pub const ALL: [Database; 4] = [Self::Appl, Self::Counters, Self::Config, Self::State];

    pub fn index(&self) -> i64 {
        match self {
            Self::Appl => 0,
            Self::Counters => 2,
            Self::Config => 4,
            Self::State => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Appl => "APPL_DB",
            Self::Counters => "COUNTERS_DB",
            Self::Config => "CONFIG_DB",
            Self::State => "STATE_DB",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|database| database.name() == name)
            .ok_or_else(|| ExporterError::UnknownDatabase(name.to_string()))
    }
}

impl FromStr for Database {
    type Err = ExporterError;

    fn from_str(value: &str) -> Result<Self> {
        Self::from_name(value)
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
