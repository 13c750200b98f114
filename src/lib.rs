pub mod analyzers;
pub mod calendar;
pub mod config;
pub mod daily;
pub mod error;
pub mod filter;
pub mod input;
pub mod model;
pub mod output;
