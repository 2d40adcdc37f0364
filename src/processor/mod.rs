pub mod device_processor;
pub mod reconciler;
