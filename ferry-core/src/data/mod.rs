mod coerce;
mod r#type;
mod value;

pub use r#type::*;
pub use value::*;

pub use chrono;
pub use chrono_tz;
pub use rust_decimal;
pub use uuid;
