pub mod anomaly;
pub mod collector;
pub mod engine;
pub mod kill;
pub mod platform;
pub mod process;
pub mod procfs;
pub mod rates;
pub mod snapshot;
pub mod tree;
