// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The generic pixel buffer: one capability interface over the buffer
//! variants, and the CPU-mediated blit engine built on it.
//!
//! Every buffer variant provides exactly two primitive transfers, `upload`
//! and `download`, for data already in a shape the driver accepts. The
//! engine in this module normalizes arbitrary caller data down to those
//! primitives with a single three-way decision:
//!
//! | condition                         | path                              |
//! |-----------------------------------|-----------------------------------|
//! | source extent ≠ destination extent | filtered resample into a shadow   |
//! | format has no native transfer     | bulk convert into a shadow        |
//! | otherwise                         | hand the source straight through  |
//!
//! Centralizing this here means a variant's `upload`/`download` only ever
//! sees one already-normalized format, instead of every variant repeating
//! the format handling.
//!
//! The shadow buffer is a [`PixelVolume`] local to each operation:
//! allocated only on the branches that need it and dropped on every exit
//! path, including error returns.

use crate::TransferError;
use crate::pixel_formats::PixelFormat;
use crate::pixel_ops::{Filter, PixelOps};
use crate::region::{Box3, PixelView, PixelViewMut, PixelVolume};

/// How a buffer will be used, declared at creation.
///
/// These are declarations, not capabilities: the driver uses them to pick
/// storage and to decide which auxiliary resources (per-slice render
/// targets, automatic mipmaps) a buffer carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferUsage {
    /// Contents change frequently.
    pub dynamic: bool,
    /// The CPU never reads back.
    pub write_only: bool,
    /// The buffer is a rendering destination; one render target per depth
    /// slice is registered with the engine.
    pub render_target: bool,
    /// Mipmaps regenerate automatically after level-0 uploads.
    pub auto_mipmap: bool,
}

impl BufferUsage {
    /// Static upload-once contents.
    pub const STATIC: BufferUsage = BufferUsage {
        dynamic: false,
        write_only: false,
        render_target: false,
        auto_mipmap: false,
    };

    /// Static contents the CPU will never read back.
    pub const STATIC_WRITE_ONLY: BufferUsage = BufferUsage {
        dynamic: false,
        write_only: true,
        render_target: false,
        auto_mipmap: false,
    };
}

/// The capability interface shared by every pixel buffer variant.
///
/// Extent and format are immutable after construction. Any box supplied
/// to the blit engine is validated against the extent; boxes handed to
/// `upload` directly are a caller responsibility (the engine always hands
/// contained boxes down).
pub trait HardwarePixelBuffer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn depth(&self) -> u32;
    fn format(&self) -> PixelFormat;
    fn usage(&self) -> BufferUsage;

    /// Whether `format` has a layout the driver accepts from client
    /// memory. The engine probes this to choose between conversion and
    /// passthrough.
    fn supports_transfer_format(&self, format: PixelFormat) -> bool;

    /// Primitive CPU→GPU transfer of `data` into the `dest` region.
    /// `data`'s extent equals `dest`'s extent.
    fn upload(&mut self, data: &PixelView<'_>, dest: Box3) -> Result<(), TransferError>;

    /// Primitive GPU→CPU transfer of the buffer's entire extent into
    /// `into`.
    fn download(&mut self, into: &mut PixelViewMut<'_>) -> Result<(), TransferError>;

    /// Attaches this buffer to the given attachment point of the
    /// currently bound framebuffer.
    fn bind_to_framebuffer(&self, attachment: u32, zoffset: u32);

    /// The buffer's whole region.
    fn whole_extent(&self) -> Box3 {
        Box3::from_extent(self.width(), self.height(), self.depth())
    }
}

/// Copies `src` into the `dst_box` region of `buffer`, resampling or
/// converting through a scoped shadow buffer when required.
pub fn blit_from_memory(
    buffer: &mut dyn HardwarePixelBuffer,
    ops: &dyn PixelOps,
    src: &PixelView<'_>,
    dst_box: Box3,
) -> Result<(), TransferError> {
    let extent = buffer.whole_extent();
    if !extent.contains(&dst_box) {
        return Err(TransferError::OutOfRange {
            requested: dst_box,
            extent,
        });
    }

    if !src.extent().same_extent(&dst_box) {
        // Scale to destination size. This also converts the format if
        // needed. The shadow spans the full extent so the scaled region
        // keeps the buffer's natural pitches.
        logwise::trace_sync!("blit_from_memory: resampling to destination extent");
        let mut shadow = PixelVolume::new(
            buffer.width(),
            buffer.height(),
            buffer.depth(),
            buffer.format(),
        );
        ops.scale(
            src,
            &mut shadow.view_mut().sub_volume_mut(dst_box),
            Filter::Bilinear,
        )?;
        buffer.upload(&shadow.view().sub_volume(dst_box), dst_box)
    } else if !buffer.supports_transfer_format(src.format()) {
        // Extents match but the driver won't take this layout from client
        // memory; convert in a temporary buffer.
        logwise::trace_sync!(
            "blit_from_memory: converting {format} for transfer",
            format = logwise::privacy::LogIt(&src.format())
        );
        let mut shadow = PixelVolume::new(
            buffer.width(),
            buffer.height(),
            buffer.depth(),
            buffer.format(),
        );
        ops.convert(src, &mut shadow.view_mut().sub_volume_mut(dst_box))?;
        buffer.upload(&shadow.view().sub_volume(dst_box), dst_box)
    } else {
        // No scaling or conversion needed.
        buffer.upload(src, dst_box)
    }
}

/// Reads the `src_box` region of `buffer` into `dst`, going through a
/// scoped shadow buffer unless the whole buffer is wanted in a natively
/// transferable format.
pub fn blit_to_memory(
    buffer: &mut dyn HardwarePixelBuffer,
    ops: &dyn PixelOps,
    src_box: Box3,
    dst: &mut PixelViewMut<'_>,
) -> Result<(), TransferError> {
    let extent = buffer.whole_extent();
    if !extent.contains(&src_box) {
        return Err(TransferError::OutOfRange {
            requested: src_box,
            extent,
        });
    }

    let whole_buffer = src_box == extent;
    let full_size_dst = dst.width() == buffer.width()
        && dst.height() == buffer.height()
        && dst.depth() == buffer.depth();
    if whole_buffer && full_size_dst && buffer.supports_transfer_format(dst.format()) {
        // The direct case: the caller wants the entire buffer in a format
        // the driver can emit, so no intermediate copy is needed.
        buffer.download(dst)
    } else {
        let mut shadow = PixelVolume::new(
            buffer.width(),
            buffer.height(),
            buffer.depth(),
            buffer.format(),
        );
        buffer.download(&mut shadow.view_mut())?;
        let region = shadow.view().sub_volume(src_box);
        if !src_box.same_extent(&dst.extent()) {
            ops.scale(&region, dst, Filter::Bilinear)
        } else {
            // Just the sub-region, converted if the formats differ.
            ops.convert(&region, dst)
        }
    }
}

/// Buffer-to-buffer copy through CPU memory: reads the source region into
/// a temporary volume, then blits it into the destination region. The
/// GPU-resident fast path, when one applies, lives on the texture buffer
/// variant; this is the universal fallback.
pub fn blit(
    dst_buffer: &mut dyn HardwarePixelBuffer,
    src_buffer: &mut dyn HardwarePixelBuffer,
    ops: &dyn PixelOps,
    src_box: Box3,
    dst_box: Box3,
) -> Result<(), TransferError> {
    let mut staging = PixelVolume::new(
        src_box.width(),
        src_box.height(),
        src_box.depth(),
        src_buffer.format(),
    );
    blit_to_memory(src_buffer, ops, src_box, &mut staging.view_mut())?;
    blit_from_memory(dst_buffer, ops, &staging.view(), dst_box)
}
