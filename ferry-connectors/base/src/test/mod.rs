//! Mocks for testing connectors without a data source

pub use mock::*;
