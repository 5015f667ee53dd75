/// Parameter handlers - CPU staging for shader parameter blocks
///
/// Handlers accumulate named field writes into a staging buffer whose
/// layout matches shader-reflected metadata, and lazily (re)allocate
/// their GPU buffer when the owning block's shape changes.

// Module declarations
pub mod uniform_handler;
pub mod storage_handler;
pub mod push_handler;

pub use uniform_handler::*;
pub use storage_handler::*;
pub use push_handler::*;

/// Result of a handler `update` call
///
/// A shape change is not an error. It is a first-class expected
/// transition that descriptor handlers react to by rebuilding their
/// bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    /// The block shape matches the previous one, the buffer is unchanged
    Unchanged,
    /// The block shape changed, the backing buffer was reallocated
    Rebuilt,
}

impl HandlerStatus {
    /// Returns true if the backing buffer was reallocated
    pub fn is_rebuilt(&self) -> bool {
        matches!(self, HandlerStatus::Rebuilt)
    }
}
