pub mod api;
pub mod config;
pub mod control;
pub mod db;
pub mod devices;
pub mod error;
pub mod history;
pub mod sensors;
pub mod thresholds;
