pub mod device;
pub mod validation;

pub use device::device_info_from_request;
pub use validation::ValidatedJson;
