//! Interactive editing on top of the layer model.
//!
//! [`InteractionController`] owns the composition, the selection and the
//! drag state, and turns pointer events and panel commands into model
//! mutations. [`EditorSession`] pairs it with a renderer and re-rasterizes
//! only when the model or selection actually changed.

pub mod controller;
pub mod event;
pub mod session;

pub use controller::{DragState, InteractionController};
pub use event::{PointerEvent, Viewport};
pub use session::EditorSession;
