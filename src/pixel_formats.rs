// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Runtime pixel format definitions for hardware pixel buffers.
//!
//! Formats here are an enum rather than zero-sized marker types: a pixel
//! buffer's format is decided by the driver at runtime (it is read back
//! from the texture object, not declared by the caller), so there is
//! nothing for the type system to check at compile time. The enum carries
//! the format metadata the transfer paths branch on:
//!
//! - byte size per pixel (uncompressed formats)
//! - block-compression layout (DXT formats)
//! - the luminance property, which the accelerated memory-blit path
//!   excludes
//! - total memory size of a region, including 4×4 block rounding
//!
//! The GL mapping tables (client transfer formats, data types, internal
//! storage formats) live in [`gl_support`].

pub mod gl_support;

/// An abstract pixel format, decoupled from any one GL enum.
///
/// One abstract format can correspond to several GL enums (internal
/// storage format, client transfer format, data type); the
/// [`gl_support`] tables hold those mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luminance.
    L8,
    /// 16-bit luminance.
    L16,
    /// 8-bit luminance + 8-bit alpha.
    La8,
    /// Single 8-bit channel.
    R8,
    /// Two 8-bit channels.
    Rg8,
    /// 24-bit RGB.
    Rgb8,
    /// 24-bit BGR.
    Bgr8,
    /// 32-bit RGBA.
    Rgba8,
    /// 32-bit BGRA.
    Bgra8,
    /// 32-bit ARGB. No GL client transfer layout exists for this byte
    /// order; sources in this format go through CPU conversion.
    Argb8,
    /// Four 16-bit float channels.
    Rgba16F,
    /// Four 32-bit float channels.
    Rgba32F,
    /// BC1 block compression, 8 bytes per 4×4 block.
    Dxt1,
    /// BC2 block compression, 16 bytes per 4×4 block.
    Dxt3,
    /// BC3 block compression, 16 bytes per 4×4 block.
    Dxt5,
    /// 16-bit depth.
    Depth16,
    /// Packed 24-bit depth + 8-bit stencil.
    Depth24Stencil8,
}

impl PixelFormat {
    /// Bytes per pixel, or `None` for block-compressed formats (which have
    /// no per-pixel size; see [`PixelFormat::memory_size`]).
    pub const fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            PixelFormat::L8 | PixelFormat::R8 => Some(1),
            PixelFormat::L16 | PixelFormat::La8 | PixelFormat::Rg8 | PixelFormat::Depth16 => {
                Some(2)
            }
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => Some(3),
            PixelFormat::Rgba8
            | PixelFormat::Bgra8
            | PixelFormat::Argb8
            | PixelFormat::Depth24Stencil8 => Some(4),
            PixelFormat::Rgba16F => Some(8),
            PixelFormat::Rgba32F => Some(16),
            PixelFormat::Dxt1 | PixelFormat::Dxt3 | PixelFormat::Dxt5 => None,
        }
    }

    pub const fn is_compressed(self) -> bool {
        matches!(
            self,
            PixelFormat::Dxt1 | PixelFormat::Dxt3 | PixelFormat::Dxt5
        )
    }

    /// Luminance formats are excluded from the accelerated memory-blit
    /// path; hardware handling of them through render targets is
    /// unreliable.
    pub const fn is_luminance(self) -> bool {
        matches!(self, PixelFormat::L8 | PixelFormat::L16 | PixelFormat::La8)
    }

    pub const fn is_depth(self) -> bool {
        matches!(self, PixelFormat::Depth16 | PixelFormat::Depth24Stencil8)
    }

    /// Bytes per 4×4 block for compressed formats.
    const fn block_bytes(self) -> Option<usize> {
        match self {
            PixelFormat::Dxt1 => Some(8),
            PixelFormat::Dxt3 | PixelFormat::Dxt5 => Some(16),
            _ => None,
        }
    }

    /// Byte size of a tightly packed `width`×`height`×`depth` region.
    pub fn memory_size(self, width: u32, height: u32, depth: u32) -> usize {
        match self.block_bytes() {
            Some(block) => {
                let blocks_w = width.div_ceil(4) as usize;
                let blocks_h = height.div_ceil(4) as usize;
                blocks_w * blocks_h * depth as usize * block
            }
            None => {
                // bytes_per_pixel is Some for every non-block format
                let bpp = self.bytes_per_pixel().unwrap_or(0) as usize;
                width as usize * height as usize * depth as usize * bpp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_size_uncompressed() {
        assert_eq!(PixelFormat::Rgba8.memory_size(4, 4, 1), 64);
        assert_eq!(PixelFormat::L8.memory_size(3, 3, 2), 18);
        assert_eq!(PixelFormat::Rgba32F.memory_size(2, 2, 1), 64);
    }

    #[test]
    fn memory_size_rounds_to_blocks() {
        // 5x5 rounds up to 2x2 blocks
        assert_eq!(PixelFormat::Dxt1.memory_size(5, 5, 1), 2 * 2 * 8);
        assert_eq!(PixelFormat::Dxt5.memory_size(4, 4, 1), 16);
        assert_eq!(PixelFormat::Dxt1.memory_size(1, 1, 1), 8);
    }

    #[test]
    fn property_queries() {
        assert!(PixelFormat::L16.is_luminance());
        assert!(!PixelFormat::R8.is_luminance());
        assert!(PixelFormat::Dxt3.is_compressed());
        assert!(PixelFormat::Depth24Stencil8.is_depth());
        assert_eq!(PixelFormat::Dxt1.bytes_per_pixel(), None);
    }
}
