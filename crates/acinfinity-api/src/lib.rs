pub mod config;
pub mod error;
pub mod event;

pub use config::{CardConfig, DeviceTypeOverride, ReadingSlot};
pub use error::{CardError, CardResult};
pub use event::CardEvent;
