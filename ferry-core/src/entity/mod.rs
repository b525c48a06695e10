mod column;
mod descriptor;
mod row;

pub use column::*;
pub use descriptor::*;
pub use row::*;
