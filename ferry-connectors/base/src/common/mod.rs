pub mod bulk;
pub mod context;
pub mod hierarchy;
