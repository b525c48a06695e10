use ferry_connectors_base::common::context::CompileOptions;
use ferry_core::{
    config,
    err::{Context, Result},
};
use serde::{Deserialize, Serialize};

/// Options of the SQL Server connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MssqlConnectorOptions {
    /// Permit updates and deletes whose lookup matches more than one row
    pub allow_multiple_rows: bool,
    /// Round datetime literals with milliseconds up to the next second
    pub round_fractional_seconds: bool,
}

impl Default for MssqlConnectorOptions {
    fn default() -> Self {
        Self {
            allow_multiple_rows: false,
            round_fractional_seconds: true,
        }
    }
}

impl MssqlConnectorOptions {
    pub fn parse(options: config::Value) -> Result<Self> {
        config::from_value::<Self>(options).context("Failed to parse connector options")
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            round_fractional_seconds: self.round_fractional_seconds,
        }
    }
}
