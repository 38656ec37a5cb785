//! Scripted edits.
//!
//! An edit script is a JSON array of operations replayed against an
//! [`InteractionController`], the same way a user would drive the editor:
//!
//! ```json
//! [
//!   {"op": "pointer_down", "x": 640, "y": 360},
//!   {"op": "pointer_move", "x": 700, "y": 380},
//!   {"op": "pointer_up"},
//!   {"op": "reorder", "id": "title", "direction": "up"},
//!   {"op": "update", "id": "title", "patch": {"text": "NEW TITLE"}}
//! ]
//! ```

use common::error::{StudioError, StudioResult};
use editor::{InteractionController, PointerEvent};
use scene::{LayerId, LayerPatch, ZDirection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    PointerLeave,
    Select { id: LayerId },
    Deselect,
    Reorder { id: LayerId, direction: ZDirection },
    Delete { id: LayerId },
    Update { id: LayerId, patch: LayerPatch },
}

impl EditOp {
    /// Apply to the controller. Returns whether the composition or the
    /// selection changed.
    ///
    /// Deleting a background layer is refused here, as the layer panel does.
    pub fn apply(&self, controller: &mut InteractionController) -> bool {
        let changed = match self {
            EditOp::PointerDown { x, y } => controller.handle_event(PointerEvent::Down { x: *x, y: *y }),
            EditOp::PointerMove { x, y } => controller.handle_event(PointerEvent::Move { x: *x, y: *y }),
            EditOp::PointerUp => controller.handle_event(PointerEvent::Up),
            EditOp::PointerLeave => controller.handle_event(PointerEvent::Leave),
            EditOp::Select { id } => controller.select(id),
            EditOp::Deselect => controller.clear_selection(),
            EditOp::Reorder { id, direction } => controller.reorder(id, *direction),
            EditOp::Delete { id } => {
                if controller.is_deletable(id) {
                    controller.delete(id)
                } else {
                    warn!(layer = %id, "refusing to delete layer");
                    false
                }
            }
            EditOp::Update { id, patch } => controller.update(id, patch),
        };
        debug!(op = ?self, changed, "applied edit");
        changed
    }
}

pub fn parse_edits(json: &str) -> StudioResult<Vec<EditOp>> {
    serde_json::from_str(json).map_err(|e| StudioError::template(format!("invalid edit script: {}", e)))
}

pub fn load_edits(path: impl AsRef<Path>) -> StudioResult<Vec<EditOp>> {
    let json = std::fs::read_to_string(path.as_ref())?;
    parse_edits(&json)
}

/// Apply edits in order. Returns how many changed something.
pub fn apply_all(controller: &mut InteractionController, edits: &[EditOp]) -> usize {
    edits.iter().filter(|op| op.apply(controller)).count()
}
