pub mod config;
pub mod data;
pub mod entity;
pub mod err;
pub mod filter;
