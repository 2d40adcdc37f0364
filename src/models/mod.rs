pub mod device;
pub mod device_event;
pub mod timestamp;
