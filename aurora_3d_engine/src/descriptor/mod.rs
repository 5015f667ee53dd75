/// Descriptor module - per-frame descriptor set state machine

// Module declarations
pub mod descriptor;
pub mod descriptor_handler;

pub use descriptor::*;
pub use descriptor_handler::*;
