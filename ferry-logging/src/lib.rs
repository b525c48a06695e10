use ferry_core::err::{Context, Result};
pub use env_logger::{init, init_from_env};
pub use log::*;

mod limiting;
pub use limiting::*;

/// Configures the logger for the host process
pub fn init_logging() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    )
    .try_init()
    .context("Failed to initialise logging")
}

/// Logging init function for tests
pub fn init_for_tests() {
    let res = env_logger::builder()
        .filter_module("ferry", LevelFilter::Trace)
        .is_test(true)
        .try_init();
    if let Err(err) = res {
        eprintln!("Failed to init logging: {}", err);
    }
}
