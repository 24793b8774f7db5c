pub mod config;
pub mod logging;

pub mod control;
pub mod engine;
pub mod ifstats;
pub mod monitor;
pub mod reporter;
pub mod sink;
pub mod sources;
pub mod units;
pub mod worker;
