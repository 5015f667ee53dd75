/// Built-in subrenderers
///
/// Each follows the same per-frame protocol: push handler data, push
/// descriptor bindings, reconcile the descriptor handler, then bind and
/// draw. A rebuilt descriptor handler skips the draw for that frame;
/// the fresh sets catch up on their next turn.

// Module declarations
pub mod mesh_subrenderer;
pub mod shadow_subrenderer;
pub mod ui_subrenderer;
pub mod filter;

pub use mesh_subrenderer::*;
pub use shadow_subrenderer::*;
pub use ui_subrenderer::*;
pub use filter::*;
