//! Pointer-driven selection and drag editing.

use crate::event::{PointerEvent, Viewport};
use common::geometry::Point;
use scene::{Composition, Layer, LayerId, LayerKind, LayerPatch, ZDirection};
use tracing::{debug, trace};

/// Drag state machine. A drag always moves the current selection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer is held down; `anchor` is the last pointer position in
    /// canvas pixels.
    Dragging { anchor: Point },
}

/// Owns the composition, the selection and the drag state.
///
/// The selection always names a layer present in the composition, or is
/// empty.
#[derive(Clone, Debug)]
pub struct InteractionController {
    composition: Composition,
    selection: Option<LayerId>,
    drag: DragState,
    viewport: Viewport,
}

impl InteractionController {
    pub fn new(composition: Composition) -> Self {
        let viewport = Viewport::native(composition.canvas_width, composition.canvas_height);
        Self {
            composition,
            selection: None,
            drag: DragState::Idle,
            viewport,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn into_composition(self) -> Composition {
        self.composition
    }

    pub fn selected(&self) -> Option<&LayerId> {
        self.selection.as_ref()
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selection.as_ref().and_then(|id| self.composition.layer(id))
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Layers in panel order, topmost first.
    pub fn layers_top_down(&self) -> Vec<&Layer> {
        self.composition.top_down()
    }

    /// Press at screen position `(x, y)`.
    ///
    /// Selects the topmost layer under the pointer and starts dragging it.
    /// A press on empty canvas clears the selection and starts nothing.
    /// Returns the newly selected layer.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Option<&LayerId> {
        let point = self.viewport.to_canvas(x, y);
        match self.composition.hit_test(point).map(|l| l.id.clone()) {
            Some(id) => {
                debug!(layer = %id, x = point.x, y = point.y, "pointer down on layer");
                self.selection = Some(id);
                self.drag = DragState::Dragging { anchor: point };
            }
            None => {
                debug!(x = point.x, y = point.y, "pointer down on empty canvas");
                self.selection = None;
                self.drag = DragState::Idle;
            }
        }
        self.selection.as_ref()
    }

    /// Move to screen position `(x, y)`.
    ///
    /// While dragging, translates the selected layer by the pointer delta
    /// since the last event and re-anchors. Returns whether the composition
    /// changed.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        let DragState::Dragging { anchor } = self.drag else {
            return false;
        };
        let point = self.viewport.to_canvas(x, y);
        self.drag = DragState::Dragging { anchor: point };

        let Some(id) = &self.selection else {
            return false;
        };
        let (dx, dy) = (point.x - anchor.x, point.y - anchor.y);
        trace!(layer = %id, dx, dy, "drag");
        self.composition.translate(id, dx, dy)
    }

    /// Release ends any drag; the selection is kept.
    pub fn pointer_up(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Leaving the canvas ends any drag, like a release.
    pub fn pointer_leave(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Dispatch a pointer event. Returns whether the composition or the
    /// selection changed.
    pub fn handle_event(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down { x, y } => {
                let before = self.selection.clone();
                self.pointer_down(x, y);
                before != self.selection
            }
            PointerEvent::Move { x, y } => self.pointer_move(x, y),
            PointerEvent::Up => {
                self.pointer_up();
                false
            }
            PointerEvent::Leave => {
                self.pointer_leave();
                false
            }
        }
    }

    /// Select a layer from the panel. Unknown ids are ignored.
    pub fn select(&mut self, id: &LayerId) -> bool {
        if !self.composition.contains(id) || self.selection.as_ref() == Some(id) {
            return false;
        }
        self.selection = Some(id.clone());
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        self.selection.take().is_some()
    }

    pub fn reorder(&mut self, id: &LayerId, direction: ZDirection) -> bool {
        self.composition.reorder(id, direction)
    }

    /// Whether the panel offers deletion for a layer. Backgrounds are kept.
    pub fn is_deletable(&self, id: &LayerId) -> bool {
        self.composition
            .layer(id)
            .map_or(false, |l| l.kind != LayerKind::Background)
    }

    /// Remove a layer, clearing the selection if it pointed at it.
    pub fn delete(&mut self, id: &LayerId) -> bool {
        if !self.composition.delete(id) {
            return false;
        }
        if self.selection.as_ref() == Some(id) {
            self.selection = None;
        }
        true
    }

    pub fn update(&mut self, id: &LayerId, patch: &LayerPatch) -> bool {
        self.composition.update(id, patch)
    }

    /// Patch the selected layer, if any.
    pub fn update_selected(&mut self, patch: &LayerPatch) -> bool {
        match self.selection.clone() {
            Some(id) => self.composition.update(&id, patch),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LayerId {
        LayerId::new(s)
    }

    /// Background plus a text box and a shape overlapping it on top.
    fn controller() -> InteractionController {
        InteractionController::new(Composition::new(
            1280,
            720,
            vec![
                Layer::background("bg", 1280.0, 720.0, "#1a1a2e").with_z_index(0),
                Layer::new("title", LayerKind::Text)
                    .with_frame(640.0, 360.0, 400.0, 100.0)
                    .with_text("HELLO", "#FFFFFF")
                    .with_z_index(1),
                Layer::new("badge", LayerKind::Shape)
                    .with_frame(800.0, 360.0, 100.0, 100.0)
                    .with_fill("#FF0000")
                    .with_z_index(2),
            ],
        ))
    }

    fn position(c: &InteractionController, layer: &str) -> (f32, f32) {
        let l = c.composition().layer(&id(layer)).unwrap();
        (l.x, l.y)
    }

    #[test]
    fn test_press_selects_topmost() {
        let mut c = controller();
        // (800, 360) is inside the title box and the badge; badge is on top.
        assert_eq!(c.pointer_down(800.0, 360.0), Some(&id("badge")));
        assert!(c.is_dragging());

        c.pointer_up();
        assert_eq!(c.pointer_down(500.0, 360.0), Some(&id("title")));
    }

    #[test]
    fn test_press_on_background() {
        let mut c = controller();
        assert_eq!(c.pointer_down(10.0, 10.0), Some(&id("bg")));
        c.pointer_up();
        assert_eq!(c.pointer_down(1000.0, 600.0), Some(&id("bg")));
        // Off-canvas presses miss everything.
        assert_eq!(c.pointer_down(1300.0, 10.0), None);
        assert!(!c.is_dragging());
    }

    #[test]
    fn test_miss_clears_selection() {
        let mut c = InteractionController::new(Composition::new(
            100,
            100,
            vec![Layer::new("s", LayerKind::Shape).with_frame(20.0, 20.0, 10.0, 10.0)],
        ));
        c.pointer_down(20.0, 20.0);
        c.pointer_up();
        assert_eq!(c.selected(), Some(&id("s")));

        c.pointer_down(90.0, 90.0);
        assert_eq!(c.selected(), None);
        assert!(!c.is_dragging());
    }

    #[test]
    fn test_drag_accumulates_deltas() {
        let mut c = controller();
        c.pointer_down(500.0, 360.0);
        assert!(c.pointer_move(510.0, 365.0));
        assert!(c.pointer_move(530.0, 345.0));
        assert!(c.pointer_move(527.0, 350.0));
        c.pointer_up();

        assert_eq!(position(&c, "title"), (667.0, 350.0));
        assert_eq!(c.selected(), Some(&id("title")));
        assert!(!c.is_dragging());
    }

    #[test]
    fn test_move_without_drag_is_ignored() {
        let mut c = controller();
        assert!(!c.pointer_move(100.0, 100.0));
        c.pointer_down(500.0, 360.0);
        c.pointer_up();
        assert!(!c.pointer_move(600.0, 400.0));
        assert_eq!(position(&c, "title"), (640.0, 360.0));
    }

    #[test]
    fn test_leave_ends_drag() {
        let mut c = controller();
        c.pointer_down(500.0, 360.0);
        c.pointer_move(520.0, 360.0);
        c.pointer_leave();
        assert!(!c.is_dragging());
        assert!(!c.pointer_move(600.0, 360.0));
        assert_eq!(position(&c, "title"), (660.0, 360.0));
    }

    #[test]
    fn test_scaled_viewport_drag() {
        let mut c = controller()
            .with_viewport(Viewport::native(1280, 720).with_display(0.0, 0.0, 640.0, 360.0));
        assert_eq!(c.pointer_down(250.0, 180.0), Some(&id("title")));
        c.pointer_move(260.0, 180.0);
        assert_eq!(position(&c, "title"), (660.0, 360.0));
    }

    #[test]
    fn test_handle_event() {
        let mut c = controller();
        assert!(c.handle_event(PointerEvent::Down { x: 500.0, y: 360.0 }));
        assert!(!c.handle_event(PointerEvent::Down { x: 500.0, y: 360.0 }));
        assert!(c.handle_event(PointerEvent::Move { x: 505.0, y: 360.0 }));
        assert!(!c.handle_event(PointerEvent::Leave));
        assert!(!c.handle_event(PointerEvent::Move { x: 600.0, y: 360.0 }));
        assert!(!c.handle_event(PointerEvent::Up));
        assert_eq!(position(&c, "title"), (645.0, 360.0));
    }

    #[test]
    fn test_select_from_panel() {
        let mut c = controller();
        assert!(c.select(&id("bg")));
        assert!(!c.select(&id("bg")));
        assert!(!c.select(&id("missing")));
        assert_eq!(c.selected(), Some(&id("bg")));
        assert!(c.clear_selection());
        assert!(!c.clear_selection());
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut c = controller();
        c.select(&id("title"));
        assert!(c.delete(&id("badge")));
        assert_eq!(c.selected(), Some(&id("title")));
        assert!(c.delete(&id("title")));
        assert_eq!(c.selected(), None);
        assert!(!c.delete(&id("title")));
        assert_eq!(c.composition().z_indices(), vec![0]);
    }

    #[test]
    fn test_drag_after_delete_is_noop() {
        let mut c = controller();
        c.pointer_down(500.0, 360.0);
        c.delete(&id("title"));
        assert!(!c.pointer_move(520.0, 360.0));
    }

    #[test]
    fn test_background_not_deletable_from_panel() {
        let c = controller();
        assert!(!c.is_deletable(&id("bg")));
        assert!(c.is_deletable(&id("title")));
        assert!(!c.is_deletable(&id("missing")));
    }

    #[test]
    fn test_reorder_and_update() {
        let mut c = controller();
        assert!(c.reorder(&id("title"), ZDirection::Up));
        let top: Vec<_> = c.layers_top_down().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(top, vec!["title", "badge", "bg"]);

        assert!(!c.update_selected(&LayerPatch::new().with_opacity(0.5)));
        c.select(&id("badge"));
        assert!(c.update_selected(&LayerPatch::new().with_opacity(0.5)));
        assert_eq!(c.selected_layer().unwrap().opacity, Some(0.5));
        assert!(!c.update(&id("missing"), &LayerPatch::position(1.0, 1.0)));
    }
}
