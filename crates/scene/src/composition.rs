//! The composition aggregate and its layer-lifecycle operations.
//!
//! Every operation is total: an unknown layer id leaves the composition
//! untouched and reports `false`. Layers are never edited in place; a
//! mutation swaps in an updated copy so callers can detect change by
//! structural comparison.

use crate::layer::{Layer, LayerId, LayerPatch};
use common::geometry::Point;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Direction for a z-order swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZDirection {
    /// Towards the top of the stack (higher z).
    Up,
    /// Towards the bottom of the stack (lower z).
    Down,
}

impl FromStr for ZDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(ZDirection::Up),
            "down" => Ok(ZDirection::Down),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Identity fields carried through the editor without interpretation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Any other template fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Canvas dimensions plus the layers drawn onto it.
#[derive(Clone, Debug, PartialEq)]
pub struct Composition {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub metadata: Metadata,
    layers: Vec<Layer>,
}

impl Composition {
    pub fn new(canvas_width: u32, canvas_height: u32, layers: Vec<Layer>) -> Self {
        Self {
            canvas_width,
            canvas_height,
            metadata: Metadata::default(),
            layers,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Layers in insertion order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.layer(id).is_some()
    }

    fn position(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    /// Layers in paint order: ascending z, ties by insertion order.
    pub fn sorted_by_z(&self) -> Vec<&Layer> {
        let mut sorted: Vec<&Layer> = self.layers.iter().collect();
        sorted.sort_by_key(|l| l.z_index);
        sorted
    }

    /// Layers topmost first, the order hit-testing and layer panels use.
    pub fn top_down(&self) -> Vec<&Layer> {
        let mut sorted = self.sorted_by_z();
        sorted.reverse();
        sorted
    }

    /// All z-index values in ascending order.
    pub fn z_indices(&self) -> Vec<i32> {
        let mut z: Vec<i32> = self.layers.iter().map(|l| l.z_index).collect();
        z.sort_unstable();
        z
    }

    /// Storage indices in paint order.
    fn paint_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.layers.len()).collect();
        order.sort_by_key(|&i| self.layers[i].z_index);
        order
    }

    /// Assign z-indices `0..N-1` following `order`.
    fn renumber(&mut self, order: &[usize]) {
        for (z, &index) in order.iter().enumerate() {
            let z = z as i32;
            if self.layers[index].z_index != z {
                let mut layer = self.layers[index].clone();
                layer.z_index = z;
                self.layers[index] = layer;
            }
        }
    }

    /// Swap a layer with its neighbour in the z-order.
    ///
    /// The stack is renumbered densely afterwards. At the top (or bottom)
    /// extreme the layer does not move, but a sparse stack is still
    /// compacted. Returns whether anything changed.
    pub fn reorder(&mut self, id: &LayerId, direction: ZDirection) -> bool {
        let Some(index) = self.position(id) else {
            debug!(layer = %id, "reorder ignored: unknown layer");
            return false;
        };

        let before = self.clone();
        let mut order = self.paint_order();
        if let Some(rank) = order.iter().position(|&i| i == index) {
            let neighbour = match direction {
                ZDirection::Up if rank + 1 < order.len() => Some(rank + 1),
                ZDirection::Down if rank > 0 => Some(rank - 1),
                _ => None,
            };
            if let Some(neighbour) = neighbour {
                order.swap(rank, neighbour);
            }
        }
        self.renumber(&order);

        let changed = *self != before;
        debug!(layer = %id, ?direction, changed, "reorder");
        changed
    }

    /// Remove a layer and compact the remaining z-indices.
    ///
    /// Background layers are not protected here; refusing to delete them is
    /// the caller's job.
    pub fn delete(&mut self, id: &LayerId) -> bool {
        let Some(index) = self.position(id) else {
            debug!(layer = %id, "delete ignored: unknown layer");
            return false;
        };

        let removed = self.layers.remove(index);
        let order = self.paint_order();
        self.renumber(&order);
        debug!(layer = %id, kind = ?removed.kind, remaining = self.layers.len(), "delete");
        true
    }

    /// Merge `patch` into a layer.
    pub fn update(&mut self, id: &LayerId, patch: &LayerPatch) -> bool {
        let Some(index) = self.position(id) else {
            debug!(layer = %id, "update ignored: unknown layer");
            return false;
        };

        let updated = self.layers[index].patched(patch);
        if updated == self.layers[index] {
            return false;
        }
        self.layers[index] = updated;
        debug!(layer = %id, "update");
        true
    }

    /// Move a layer's center by `(dx, dy)`.
    pub fn translate(&mut self, id: &LayerId, dx: f32, dy: f32) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        if dx == 0.0 && dy == 0.0 {
            return false;
        }

        let mut layer = self.layers[index].clone();
        layer.x += dx;
        layer.y += dy;
        self.layers[index] = layer;
        true
    }

    /// Topmost layer whose unrotated box contains `point`, edges inclusive.
    ///
    /// Rotation is ignored, so a rotated layer is hit by its upright box.
    pub fn hit_test(&self, point: Point) -> Option<&Layer> {
        self.top_down()
            .into_iter()
            .find(|l| l.bounds().contains_point_inclusive(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;

    fn id(s: &str) -> LayerId {
        LayerId::new(s)
    }

    fn hello_composition() -> Composition {
        Composition::new(
            1280,
            720,
            vec![
                Layer::background("bg", 1280.0, 720.0, "#FFFFFF").with_z_index(0),
                Layer::new("text", LayerKind::Text)
                    .with_frame(640.0, 360.0, 600.0, 120.0)
                    .with_text("HELLO", "#000000")
                    .with_z_index(1),
            ],
        )
    }

    fn sparse_composition() -> Composition {
        Composition::new(
            1280,
            720,
            vec![
                Layer::background("bg", 1280.0, 720.0, "#000000").with_z_index(0),
                Layer::new("text", LayerKind::Text).with_z_index(10),
                Layer::new("circle", LayerKind::Shape).with_z_index(4),
                Layer::new("arrow", LayerKind::Shape).with_z_index(5),
                Layer::new("face", LayerKind::Image).with_z_index(6),
            ],
        )
    }

    fn assert_dense(c: &Composition) {
        let expected: Vec<i32> = (0..c.len() as i32).collect();
        assert_eq!(c.z_indices(), expected);
    }

    #[test]
    fn test_sorted_by_z_is_stable() {
        let c = Composition::new(
            10,
            10,
            vec![
                Layer::new("a", LayerKind::Shape).with_z_index(1),
                Layer::new("b", LayerKind::Shape).with_z_index(0),
                Layer::new("c", LayerKind::Shape).with_z_index(1),
            ],
        );
        let ids: Vec<&str> = c.sorted_by_z().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        let ids: Vec<&str> = c.top_down().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_reorder_text_below_background() {
        let mut c = hello_composition();
        assert!(c.reorder(&id("text"), ZDirection::Down));
        assert_eq!(c.layer(&id("text")).unwrap().z_index, 0);
        assert_eq!(c.layer(&id("bg")).unwrap().z_index, 1);

        // Already at the bottom now.
        assert!(!c.reorder(&id("text"), ZDirection::Down));
        assert!(c.reorder(&id("text"), ZDirection::Up));
        assert_eq!(c, hello_composition());
    }

    #[test]
    fn test_reorder_at_extreme_is_noop_when_dense() {
        let mut c = hello_composition();
        let before = c.clone();
        assert!(!c.reorder(&id("text"), ZDirection::Up));
        assert!(!c.reorder(&id("bg"), ZDirection::Down));
        assert_eq!(c, before);
    }

    #[test]
    fn test_reorder_compacts_sparse_stack() {
        let mut c = sparse_composition();
        assert!(c.reorder(&id("arrow"), ZDirection::Up));
        assert_dense(&c);
        let ids: Vec<&str> = c.sorted_by_z().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["bg", "circle", "face", "arrow", "text"]);
    }

    #[test]
    fn test_z_order_invariant_over_sequences() {
        let mut c = sparse_composition();
        let ops: &[(&str, Option<ZDirection>)] = &[
            ("face", Some(ZDirection::Down)),
            ("bg", Some(ZDirection::Up)),
            ("text", Some(ZDirection::Up)),
            ("circle", None),
            ("arrow", Some(ZDirection::Down)),
            ("missing", Some(ZDirection::Up)),
            ("bg", None),
            ("face", Some(ZDirection::Up)),
        ];

        for (target, op) in ops {
            match op {
                Some(direction) => {
                    c.reorder(&id(target), *direction);
                }
                None => {
                    c.delete(&id(target));
                }
            }
            assert_dense(&c);
        }
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut c = sparse_composition();
        let before = c.clone();
        let missing = id("nope");

        assert!(!c.reorder(&missing, ZDirection::Up));
        assert!(!c.delete(&missing));
        assert!(!c.update(&missing, &LayerPatch::position(1.0, 2.0)));
        assert!(!c.translate(&missing, 3.0, 4.0));
        assert_eq!(c, before);
    }

    #[test]
    fn test_delete_background_succeeds() {
        let mut c = hello_composition();
        assert!(c.delete(&id("bg")));
        assert!(!c.contains(&id("bg")));
        assert_eq!(c.len(), 1);
        assert_dense(&c);
    }

    #[test]
    fn test_update_replaces_layer() {
        let mut c = hello_composition();
        let patch = LayerPatch::new().with_text("WORLD");
        assert!(c.update(&id("text"), &patch));
        assert_eq!(c.layer(&id("text")).unwrap().text.text.as_deref(), Some("WORLD"));
        // Same patch again changes nothing.
        assert!(!c.update(&id("text"), &patch));
    }

    #[test]
    fn test_translate_accumulates() {
        let mut c = hello_composition();
        assert!(c.translate(&id("text"), 10.0, -5.0));
        assert!(c.translate(&id("text"), 2.5, 1.0));
        let text = c.layer(&id("text")).unwrap();
        assert_eq!((text.x, text.y), (652.5, 356.0));
        assert!(!c.translate(&id("text"), 0.0, 0.0));
    }

    #[test]
    fn test_hit_test_priority() {
        let c = Composition::new(
            200,
            200,
            vec![
                Layer::new("low", LayerKind::Shape)
                    .with_frame(100.0, 100.0, 100.0, 100.0)
                    .with_z_index(2),
                Layer::new("high", LayerKind::Shape)
                    .with_frame(120.0, 120.0, 100.0, 100.0)
                    .with_z_index(5),
            ],
        );

        assert_eq!(c.hit_test(Point::new(110.0, 110.0)).unwrap().id, id("high"));
        assert_eq!(c.hit_test(Point::new(55.0, 55.0)).unwrap().id, id("low"));
        // Edges are inclusive.
        assert_eq!(c.hit_test(Point::new(50.0, 50.0)).unwrap().id, id("low"));
        assert!(c.hit_test(Point::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn test_hit_test_ignores_rotation() {
        let c = Composition::new(
            200,
            200,
            vec![Layer::new("r", LayerKind::Shape)
                .with_frame(100.0, 100.0, 100.0, 20.0)
                .with_rotation(90.0)],
        );
        assert!(c.hit_test(Point::new(145.0, 100.0)).is_some());
        assert!(c.hit_test(Point::new(100.0, 145.0)).is_none());
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("UP".parse::<ZDirection>(), Ok(ZDirection::Up));
        assert_eq!("down".parse::<ZDirection>(), Ok(ZDirection::Down));
        assert!("sideways".parse::<ZDirection>().is_err());
    }
}
