//! Editing session: controller plus a change-detected raster.

use crate::controller::InteractionController;
use common::error::{StudioError, StudioResult};
use render::{export_png, PixelBuffer, Renderer};
use scene::{Composition, LayerId, Template};
use std::future::Future;
use tracing::debug;

/// What the cached raster was rendered from.
#[derive(Clone, Debug, PartialEq)]
struct RenderedState {
    composition: Composition,
    selection: Option<LayerId>,
}

/// An editing session over one composition.
///
/// [`frame`](Self::frame) re-renders only when the composition or the
/// selection differs from what the cached raster shows.
pub struct EditorSession {
    controller: InteractionController,
    renderer: Renderer,
    rendered: Option<(RenderedState, PixelBuffer)>,
    renders: u64,
}

impl EditorSession {
    pub fn new(composition: Composition, renderer: Renderer) -> Self {
        Self {
            controller: InteractionController::new(composition),
            renderer,
            rendered: None,
            renders: 0,
        }
    }

    pub fn from_template(template: Template, renderer: Renderer) -> Self {
        Self::new(template.into_composition(), renderer)
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Number of rasterizations performed so far.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Current raster of the composition with its selection outline.
    pub fn frame(&mut self) -> StudioResult<&PixelBuffer> {
        let current = RenderedState {
            composition: self.controller.composition().clone(),
            selection: self.controller.selected().cloned(),
        };
        let stale = match &self.rendered {
            Some((state, _)) => *state != current,
            None => true,
        };

        if stale {
            let buffer = self
                .renderer
                .render(&current.composition, current.selection.as_ref())?;
            self.renders += 1;
            debug!(renders = self.renders, layers = current.composition.len(), "rendered frame");
            self.rendered = Some((current, buffer));
        }

        self.rendered
            .as_ref()
            .map(|(_, buffer)| buffer)
            .ok_or_else(|| StudioError::internal("no frame rendered"))
    }

    /// Encode the current frame as PNG.
    ///
    /// The raster is captured when this is called; later edits do not affect
    /// the bytes the returned future resolves to.
    pub fn export(&mut self) -> impl Future<Output = StudioResult<Vec<u8>>> + Send + 'static {
        let pending = self.frame().map(export_png);
        async move { pending?.await }
    }

    /// The composition as a template, ready to be saved.
    pub fn template(&self) -> Template {
        Template::from_composition(self.controller.composition())
    }
}
