pub mod service;
pub mod status;

pub use service::RelayController;
pub use status::{parse_relay_status, relay_label};
