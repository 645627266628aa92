mod sig_source;
mod device_source;

pub use sig_source::*;
pub use device_source::*;
