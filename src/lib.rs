pub mod action;
pub mod app;
pub mod config;
pub mod event;
pub mod filter;
pub mod format;
pub mod record;
pub mod sort;
pub mod system;
pub mod ui;
