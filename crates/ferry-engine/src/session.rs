//! A loaded guest plus its input, decoding on demand.
//!
//! [`Session`] owns one [`GuestInstance`] and the encoded input fetched
//! at load time. Each [`decode`](Session::decode) runs a fresh
//! [`DecodeBatch`] through the session's scratch region and yields a
//! [`DecodedFrame`]; frames can be presented any number of times and must
//! be given back with [`release`](Session::release).

use std::time::Instant;

use ferry_arena::{PixelDimensions, ResultView, ScratchRegion};
use ferry_core::{ArenaError, AssetSource};
use ferry_guest::{GuestInstance, InstanceMemory};
use ferry_surface::{draw_rgba, ImageViewer, PixelSurface, Viewport};

use crate::batch::{BatchPhase, DecodeBatch};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::metrics::DecodeMetrics;

/// The outcome of one successful decode.
pub struct DecodedFrame {
    /// The batch, in [`BatchPhase::Resulted`] until released.
    pub batch: DecodeBatch,
    /// Zero-copy view of the decoded pixels.
    pub view: ResultView,
    /// Timing and memory data for the decode.
    pub metrics: DecodeMetrics,
}

impl DecodedFrame {
    /// Pixel geometry of the decoded image.
    pub fn dimensions(&self) -> Option<PixelDimensions> {
        self.view.dimensions()
    }
}

/// A guest module and its input, ready to decode.
pub struct Session {
    guest: GuestInstance,
    input: Vec<u8>,
    scratch: ScratchRegion,
    config: SessionConfig,
    decodes: u64,
}

impl Session {
    /// Fetch the module and input named in `config` and instantiate the
    /// guest.
    ///
    /// Both fetches complete before anything touches guest memory.
    pub fn load<A: AssetSource + ?Sized>(
        source: &A,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let module = source.fetch(&config.module_asset)?;
        let input = source.fetch(&config.image_asset)?;
        Self::from_bytes(&module, input, config)
    }

    /// Build a session from already-fetched bytes.
    pub fn from_bytes(
        module: &[u8],
        input: Vec<u8>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let guest = GuestInstance::new(module, config.guest.clone())?;
        tracing::debug!(
            module = %config.module_asset,
            input = %config.image_asset,
            input_bytes = input.len(),
            "session loaded"
        );
        Ok(Self {
            guest,
            input,
            scratch: ScratchRegion::new(),
            config,
            decodes: 0,
        })
    }

    /// The session's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The guest instance.
    pub fn guest(&self) -> &GuestInstance {
        &self.guest
    }

    /// The guest instance, mutably, for direct calls.
    pub fn guest_mut(&mut self) -> &mut GuestInstance {
        &mut self.guest
    }

    /// Borrow the guest memory, e.g. to redraw an [`ImageViewer`].
    pub fn memory(&mut self) -> Result<InstanceMemory<'_>, SessionError> {
        Ok(self.guest.memory()?)
    }

    /// The host scratch region shared by this session's batches.
    pub fn scratch(&self) -> &ScratchRegion {
        &self.scratch
    }

    /// Number of successful decodes so far.
    pub fn decodes(&self) -> u64 {
        self.decodes
    }

    /// Run one decode batch over the session's input.
    ///
    /// If the guest returns a result whose dimensions cannot be resolved,
    /// the result is released before the error is returned.
    pub fn decode(&mut self) -> Result<DecodedFrame, SessionError> {
        let start = Instant::now();
        let size_before = self.guest.memory_size();

        let input_len = u32::try_from(self.input.len()).map_err(|_| {
            ArenaError::AddressSpaceExhausted {
                requested: self.input.len() as u64,
            }
        })?;
        let mut batch = DecodeBatch::new(self.config.arena.clone(), input_len)?;

        let commit_start = Instant::now();
        batch.commit(&mut self.guest, &mut self.scratch)?;
        let commit_us = commit_start.elapsed().as_micros() as u64;

        batch.populate(&mut self.guest, &self.input)?;

        let generation_before = self.guest.memory_generation();
        let call_start = Instant::now();
        batch.call(&mut self.guest)?;
        let call_us = call_start.elapsed().as_micros() as u64;
        let guest_grew = self.guest.memory_generation() != generation_before;

        let view = match batch.resolve(&mut self.guest, self.config.channels) {
            Ok(view) => view,
            Err(e) => {
                if let Err(release_err) = batch.release(&mut self.guest) {
                    tracing::warn!(error = %release_err, "could not release unresolvable result");
                }
                return Err(e);
            }
        };

        let metrics = DecodeMetrics {
            commit_us,
            call_us,
            total_us: start.elapsed().as_micros() as u64,
            grown_bytes: self.guest.memory_size().saturating_sub(size_before),
            guest_grew,
            output_bytes: view.len(),
            scratch_reused: batch.scratch_reused(),
        };
        self.decodes += 1;
        tracing::debug!(
            address = %view.address(),
            bytes = view.len(),
            total_us = metrics.total_us,
            guest_grew,
            "decode complete"
        );
        Ok(DecodedFrame {
            batch,
            view,
            metrics,
        })
    }

    /// Draw `frame` into `surface` through `viewport` and present it.
    ///
    /// Reads straight from guest memory; the guest is not called. A view
    /// made stale by memory growth is re-derived first.
    pub fn present<S: PixelSurface + ?Sized>(
        &mut self,
        frame: &mut DecodedFrame,
        viewport: &Viewport,
        surface: &mut S,
    ) -> Result<(), SessionError> {
        if frame.batch.phase() != BatchPhase::Resulted {
            return Err(SessionError::BatchState {
                operation: "present",
                phase: frame.batch.phase(),
            });
        }
        let memory = self.guest.memory()?;
        if !frame.view.is_current(&memory) {
            frame.view = frame.view.rederive(&memory)?;
        }
        let dimensions = frame.view.dimensions().ok_or(SessionError::BatchState {
            operation: "present",
            phase: frame.batch.phase(),
        })?;
        draw_rgba(frame.view.bytes(&memory)?, dimensions, viewport, surface);
        surface.present();
        Ok(())
    }

    /// An interactive viewer over `frame`'s pixels.
    pub fn viewer(&self, frame: &DecodedFrame) -> Result<ImageViewer, SessionError> {
        Ok(ImageViewer::new(frame.view)?)
    }

    /// Hand `frame`'s result back to the guest, returning its metrics.
    pub fn release(&mut self, mut frame: DecodedFrame) -> Result<DecodeMetrics, SessionError> {
        frame.batch.release(&mut self.guest)?;
        Ok(frame.metrics)
    }
}
