// A vendor-neutral predicate tree supplied by hosts for queries and lookup conditions.
// Connectors compile it into their own filter syntax.

mod expr;
mod operator;

pub use expr::*;
pub use operator::*;
