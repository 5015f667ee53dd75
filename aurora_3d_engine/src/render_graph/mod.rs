/// Render graph module - declarative multi-pass frame composition
///
/// A frame is described as an ordered list of render stages, each owning
/// attachments and subpass bindings, plus a registry of subrenderers
/// keyed by (stage, subpass). The graph dispatches subrenderers in
/// registration order.

// Module declarations
pub mod attachment;
pub mod render_stage;
pub mod render_graph;

pub use attachment::*;
pub use render_stage::*;
pub use render_graph::*;
