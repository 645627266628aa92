mod constant;
mod passthrough;

pub use constant::*;
pub use passthrough::*;
