pub mod classify;
pub mod device;
pub mod format;
pub mod hass;
pub mod rules;

pub use classify::{Devices, classify, infer_device_type};
pub use device::{Device, DeviceType, Port, PortRole, SensorRole, SpecialtyRole};
pub use format::{PLACEHOLDER, format_value};
pub use hass::{EntityRegistry, HassAttributes, HassState, StateSnapshot};
