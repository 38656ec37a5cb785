//! Layer model for thumbnail compositions.
//!
//! A [`Composition`] is the single source of truth for an editing session:
//! canvas dimensions plus an insertion-ordered set of typed [`Layer`]s whose
//! stacking order is derived from `z_index`. [`Template`] is the JSON shape
//! compositions arrive in and leave as.

pub mod composition;
pub mod layer;
pub mod template;

pub use composition::{Composition, Metadata, ZDirection};
pub use layer::{
    FillStyle, ImageFit, ImageSource, Layer, LayerId, LayerKind, LayerPatch, TextAlign, TextStyle,
};
pub use template::Template;
