mod executor;
pub use executor::*;
mod metadata;
pub use metadata::*;
mod query_compiler;
pub use query_compiler::*;
mod statement;
pub use statement::*;
