// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The renderbuffer-backed pixel buffer: a pure framebuffer attachment
//! (depth/stencil, or multisampled color) with no sampling and no CPU
//! transfer story.
//!
//! Unlike a texture buffer, a renderbuffer buffer owns its GL object: it
//! is created at construction and deleted on drop, and no other buffer
//! can reference it.

use std::rc::Rc;

use glow::HasContext;

use crate::TransferError;
use crate::driver::GlDriver;
use crate::pixel_formats::{PixelFormat, gl_support};
use crate::region::{Box3, PixelView, PixelViewMut};
use crate::transfer::{self, BufferUsage, HardwarePixelBuffer};

/// Whether storage is allocated single-sample or multisampled. Split out
/// so the decision is visible to tests; the constructor matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StorageKind {
    SingleSample,
    Multisample(u32),
}

pub(crate) fn storage_kind(samples: u32) -> StorageKind {
    if samples > 0 {
        StorageKind::Multisample(samples)
    } else {
        StorageKind::SingleSample
    }
}

/// A write-only pixel buffer backed by a renderbuffer object.
pub struct GlRenderBuffer {
    driver: Rc<GlDriver>,
    renderbuffer: glow::Renderbuffer,
    width: u32,
    height: u32,
    format: PixelFormat,
    internal_format: u32,
}

impl GlRenderBuffer {
    /// Allocates a renderbuffer and its backing storage. A `samples`
    /// count above zero allocates multisample storage.
    pub fn new(
        driver: Rc<GlDriver>,
        internal_format: u32,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Result<Self, TransferError> {
        let gl = driver.gl();
        let renderbuffer = unsafe { gl.create_renderbuffer() }.map_err(TransferError::Driver)?;
        unsafe {
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
            match storage_kind(samples) {
                StorageKind::Multisample(samples) => gl.renderbuffer_storage_multisample(
                    glow::RENDERBUFFER,
                    samples as i32,
                    internal_format,
                    width as i32,
                    height as i32,
                ),
                StorageKind::SingleSample => gl.renderbuffer_storage(
                    glow::RENDERBUFFER,
                    internal_format,
                    width as i32,
                    height as i32,
                ),
            }
        }
        Ok(GlRenderBuffer {
            driver,
            renderbuffer,
            width,
            height,
            format: gl_support::closest_format(internal_format),
            internal_format,
        })
    }

    pub fn renderbuffer(&self) -> glow::Renderbuffer {
        self.renderbuffer
    }

    pub fn internal_format(&self) -> u32 {
        self.internal_format
    }

    /// Generic CPU-path blit into this buffer; expected unused for pure
    /// attachment work, and fails at the upload primitive if exercised.
    pub fn blit_from_memory(
        &mut self,
        src: &PixelView<'_>,
        dst_box: Box3,
    ) -> Result<(), TransferError> {
        let driver = self.driver.clone();
        transfer::blit_from_memory(self, driver.pixel_ops(), src, dst_box)
    }

    /// Generic CPU-path readback; fails at the download primitive.
    pub fn blit_to_memory(
        &mut self,
        src_box: Box3,
        dst: &mut PixelViewMut<'_>,
    ) -> Result<(), TransferError> {
        let driver = self.driver.clone();
        transfer::blit_to_memory(self, driver.pixel_ops(), src_box, dst)
    }
}

impl HardwarePixelBuffer for GlRenderBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn depth(&self) -> u32 {
        1
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn usage(&self) -> BufferUsage {
        BufferUsage {
            write_only: true,
            ..BufferUsage::STATIC
        }
    }

    fn supports_transfer_format(&self, format: PixelFormat) -> bool {
        gl_support::transfer_format(format).is_some()
    }

    fn upload(&mut self, _data: &PixelView<'_>, _dest: Box3) -> Result<(), TransferError> {
        Err(TransferError::Unsupported(
            "renderbuffers cannot be written from client memory",
        ))
    }

    fn download(&mut self, _into: &mut PixelViewMut<'_>) -> Result<(), TransferError> {
        Err(TransferError::Unsupported(
            "renderbuffers cannot be read back to client memory",
        ))
    }

    /// Renderbuffers have no mip/face/slice addressing; the attach is
    /// unconditional.
    fn bind_to_framebuffer(&self, attachment: u32, _zoffset: u32) {
        let gl = self.driver.gl();
        unsafe {
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment,
                glow::RENDERBUFFER,
                Some(self.renderbuffer),
            );
        }
    }
}

impl Drop for GlRenderBuffer {
    fn drop(&mut self) {
        unsafe { self.driver.gl().delete_renderbuffer(self.renderbuffer) };
    }
}

impl std::fmt::Debug for GlRenderBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlRenderBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts_select_multisample_storage() {
        assert_eq!(storage_kind(0), StorageKind::SingleSample);
        assert_eq!(storage_kind(4), StorageKind::Multisample(4));
        assert_eq!(storage_kind(1), StorageKind::Multisample(1));
    }
}
