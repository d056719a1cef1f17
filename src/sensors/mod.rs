pub mod service;

pub use service::{History, Ingested, ReadingService, SystemStatus};
