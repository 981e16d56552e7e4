//! A platform-free image viewer over a guest-produced result.
//!
//! The viewer keeps a [`ResultView`] and a [`Viewport`], turns input
//! events into viewport changes, and redraws straight from guest memory
//! whenever asked. It never calls back into the guest: resizing or
//! panning only re-reads bytes the guest already produced.

use ferry_arena::{PixelDimensions, ResultView};
use ferry_core::{ArenaError, GuestMemory};

use crate::draw::draw_rgba;
use crate::surface::PixelSurface;
use crate::viewport::Viewport;

/// Input the viewer reacts to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewerEvent {
    /// The window was asked to close.
    CloseRequested,
    /// The escape key was pressed.
    Escape,
    /// The reset key (space) was pressed.
    ResetView,
    /// Vertical scroll by `lines`; positive zooms in.
    Scroll {
        /// Scroll amount in lines.
        lines: f32,
    },
    /// The drag button went down.
    DragPressed,
    /// The drag button went up.
    DragReleased,
    /// The cursor moved to `(x, y)` in surface coordinates.
    CursorMoved {
        /// Horizontal position.
        x: f64,
        /// Vertical position.
        y: f64,
    },
    /// The surface changed size.
    Resized {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
}

/// What the host loop should do after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerAction {
    /// Nothing changed.
    Idle,
    /// The frame is out of date; call [`ImageViewer::redraw`].
    Redraw,
    /// Stop the loop.
    Exit,
}

/// Interactive viewer state for one decoded image.
pub struct ImageViewer {
    view: ResultView,
    dimensions: PixelDimensions,
    viewport: Viewport,
    cursor: Option<(f64, f64)>,
    drag: Option<((f64, f64), Viewport)>,
    pending_size: Option<(u32, u32)>,
}

impl ImageViewer {
    /// A viewer for `view`, which must carry pixel dimensions.
    pub fn new(view: ResultView) -> Result<Self, ArenaError> {
        let dimensions = view.dimensions().ok_or_else(|| ArenaError::InvalidConfig {
            reason: "viewer needs a result view built with pixel dimensions".to_string(),
        })?;
        Ok(Self {
            view,
            dimensions,
            viewport: Viewport::identity(),
            cursor: None,
            drag: None,
            pending_size: None,
        })
    }

    /// The current viewport.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The result view being displayed.
    pub fn view(&self) -> &ResultView {
        &self.view
    }

    /// Apply one input event.
    pub fn handle(&mut self, event: ViewerEvent) -> ViewerAction {
        match event {
            ViewerEvent::CloseRequested | ViewerEvent::Escape => ViewerAction::Exit,
            ViewerEvent::ResetView => {
                self.viewport.reset();
                ViewerAction::Redraw
            }
            ViewerEvent::Scroll { lines } => {
                let (x, y) = self.cursor.unwrap_or((0.0, 0.0));
                if self.viewport.zoom_at((x as f32, y as f32), lines) {
                    ViewerAction::Redraw
                } else {
                    ViewerAction::Idle
                }
            }
            ViewerEvent::DragPressed => {
                self.drag = self.cursor.map(|origin| (origin, self.viewport));
                ViewerAction::Idle
            }
            ViewerEvent::DragReleased => {
                self.drag = None;
                ViewerAction::Idle
            }
            ViewerEvent::CursorMoved { x, y } => {
                self.cursor = Some((x, y));
                let Some(((ox, oy), saved)) = self.drag else {
                    return ViewerAction::Idle;
                };
                self.viewport = saved.panned((x - ox) as f32, (y - oy) as f32);
                ViewerAction::Redraw
            }
            ViewerEvent::Resized { width, height } => {
                self.pending_size = Some((width, height));
                ViewerAction::Redraw
            }
        }
    }

    /// Draw the image into `surface` and present it.
    ///
    /// If the guest memory grew since the view was built, the view is
    /// re-derived against the live memory first.
    pub fn redraw<M, S>(&mut self, memory: &M, surface: &mut S) -> Result<(), ArenaError>
    where
        M: GuestMemory + ?Sized,
        S: PixelSurface + ?Sized,
    {
        if let Some((width, height)) = self.pending_size.take() {
            surface.resize(width, height);
        }
        if !self.view.is_current(memory) {
            tracing::debug!(
                captured = %self.view.generation(),
                current = %memory.generation(),
                "re-deriving result view after memory growth"
            );
            self.view = self.view.rederive(memory)?;
        }
        let pixels = self.view.bytes(memory)?;
        draw_rgba(pixels, self.dimensions, &self.viewport, surface);
        surface.present();
        Ok(())
    }
}
