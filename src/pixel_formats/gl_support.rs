// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! GL mapping tables for [`PixelFormat`](super::PixelFormat).
//!
//! Three independent mappings, matching the three format domains a
//! transfer reconciles:
//!
//! - [`transfer_format`]: the client-memory layout GL accepts for this
//!   format, if any. `None` means sources must be CPU-converted first.
//! - [`data_type`]: the component data type paired with the transfer
//!   format.
//! - [`internal_format`]: the sized storage format used when this crate
//!   allocates GL storage itself (temporary blit textures, renderbuffers).
//!
//! [`closest_format`] is the reverse map, used when a buffer reads its
//! format back from an already-allocated texture level.
//!
//! Luminance formats store as R/RG channels: core contexts have no
//! luminance storage, and the abstract luminance property (which gates the
//! accelerated memory-blit path) does not depend on the storage channels.

use super::PixelFormat;

/// The GL client transfer format for uploading/downloading this format
/// directly, or `None` when no client layout exists.
///
/// Compressed formats return their compressed enum: compressed payloads
/// are given to GL as-is, through the compressed entry points.
pub fn transfer_format(format: PixelFormat) -> Option<u32> {
    match format {
        PixelFormat::L8 | PixelFormat::L16 | PixelFormat::R8 => Some(glow::RED),
        PixelFormat::La8 | PixelFormat::Rg8 => Some(glow::RG),
        PixelFormat::Rgb8 => Some(glow::RGB),
        PixelFormat::Bgr8 => Some(glow::BGR),
        PixelFormat::Rgba8 | PixelFormat::Rgba16F | PixelFormat::Rgba32F => Some(glow::RGBA),
        PixelFormat::Bgra8 => Some(glow::BGRA),
        PixelFormat::Argb8 => None,
        PixelFormat::Dxt1 => Some(glow::COMPRESSED_RGBA_S3TC_DXT1_EXT),
        PixelFormat::Dxt3 => Some(glow::COMPRESSED_RGBA_S3TC_DXT3_EXT),
        PixelFormat::Dxt5 => Some(glow::COMPRESSED_RGBA_S3TC_DXT5_EXT),
        PixelFormat::Depth16 => Some(glow::DEPTH_COMPONENT),
        PixelFormat::Depth24Stencil8 => Some(glow::DEPTH_STENCIL),
    }
}

/// The GL component data type paired with [`transfer_format`].
pub fn data_type(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::L8
        | PixelFormat::La8
        | PixelFormat::R8
        | PixelFormat::Rg8
        | PixelFormat::Rgb8
        | PixelFormat::Bgr8
        | PixelFormat::Rgba8
        | PixelFormat::Bgra8
        | PixelFormat::Argb8
        | PixelFormat::Dxt1
        | PixelFormat::Dxt3
        | PixelFormat::Dxt5 => glow::UNSIGNED_BYTE,
        PixelFormat::L16 | PixelFormat::Depth16 => glow::UNSIGNED_SHORT,
        PixelFormat::Rgba16F => glow::HALF_FLOAT,
        PixelFormat::Rgba32F => glow::FLOAT,
        PixelFormat::Depth24Stencil8 => glow::UNSIGNED_INT_24_8,
    }
}

/// The sized internal format used when allocating storage for this
/// format. Hardware gamma selects sRGB storage where core GL has it.
pub fn internal_format(format: PixelFormat, hw_gamma: bool) -> u32 {
    match (format, hw_gamma) {
        (PixelFormat::L8 | PixelFormat::R8, _) => glow::R8,
        (PixelFormat::L16, _) => glow::R16,
        (PixelFormat::La8 | PixelFormat::Rg8, _) => glow::RG8,
        (PixelFormat::Rgb8 | PixelFormat::Bgr8, false) => glow::RGB8,
        (PixelFormat::Rgb8 | PixelFormat::Bgr8, true) => glow::SRGB8,
        (PixelFormat::Rgba8 | PixelFormat::Bgra8 | PixelFormat::Argb8, false) => glow::RGBA8,
        (PixelFormat::Rgba8 | PixelFormat::Bgra8 | PixelFormat::Argb8, true) => {
            glow::SRGB8_ALPHA8
        }
        (PixelFormat::Rgba16F, _) => glow::RGBA16F,
        (PixelFormat::Rgba32F, _) => glow::RGBA32F,
        (PixelFormat::Dxt1, _) => glow::COMPRESSED_RGBA_S3TC_DXT1_EXT,
        (PixelFormat::Dxt3, _) => glow::COMPRESSED_RGBA_S3TC_DXT3_EXT,
        (PixelFormat::Dxt5, _) => glow::COMPRESSED_RGBA_S3TC_DXT5_EXT,
        (PixelFormat::Depth16, _) => glow::DEPTH_COMPONENT16,
        (PixelFormat::Depth24Stencil8, _) => glow::DEPTH24_STENCIL8,
    }
}

/// The closest abstract format for a GL internal format, for buffers that
/// read their storage format back from the driver. Lossy by nature:
/// channel-compatible formats collapse (an `R8` level reads back as
/// [`PixelFormat::R8`] even if it was requested as luminance).
pub fn closest_format(gl_internal: u32) -> PixelFormat {
    match gl_internal {
        glow::R8 => PixelFormat::R8,
        glow::R16 => PixelFormat::L16,
        glow::RG8 => PixelFormat::Rg8,
        glow::RGB8 | glow::SRGB8 | glow::RGB => PixelFormat::Rgb8,
        glow::RGBA8 | glow::SRGB8_ALPHA8 | glow::RGBA => PixelFormat::Rgba8,
        glow::RGBA16F => PixelFormat::Rgba16F,
        glow::RGBA32F => PixelFormat::Rgba32F,
        glow::COMPRESSED_RGBA_S3TC_DXT1_EXT => PixelFormat::Dxt1,
        glow::COMPRESSED_RGBA_S3TC_DXT3_EXT => PixelFormat::Dxt3,
        glow::COMPRESSED_RGBA_S3TC_DXT5_EXT => PixelFormat::Dxt5,
        glow::DEPTH_COMPONENT16 | glow::DEPTH_COMPONENT => PixelFormat::Depth16,
        glow::DEPTH24_STENCIL8 | glow::DEPTH_STENCIL => PixelFormat::Depth24Stencil8,
        _ => PixelFormat::Rgba8,
    }
}

/// Rounds a dimension up to a power of two unless the driver advertises
/// full non-power-of-two texture support.
pub fn optional_po2(value: u32, npot_supported: bool) -> u32 {
    if npot_supported || value.is_power_of_two() {
        value
    } else {
        value.next_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb_has_no_client_layout() {
        assert_eq!(transfer_format(PixelFormat::Argb8), None);
        assert_eq!(transfer_format(PixelFormat::Bgra8), Some(glow::BGRA));
    }

    #[test]
    fn closest_format_round_trips_what_we_allocate() {
        for format in [
            PixelFormat::R8,
            PixelFormat::Rg8,
            PixelFormat::Rgb8,
            PixelFormat::Rgba8,
            PixelFormat::Rgba16F,
            PixelFormat::Rgba32F,
            PixelFormat::Dxt1,
            PixelFormat::Dxt3,
            PixelFormat::Dxt5,
            PixelFormat::Depth16,
            PixelFormat::Depth24Stencil8,
        ] {
            assert_eq!(closest_format(internal_format(format, false)), format);
        }
    }

    #[test]
    fn unknown_internal_formats_fall_back_to_rgba() {
        assert_eq!(closest_format(0xdead), PixelFormat::Rgba8);
    }

    #[test]
    fn po2_rounding() {
        assert_eq!(optional_po2(48, true), 48);
        assert_eq!(optional_po2(48, false), 64);
        assert_eq!(optional_po2(64, false), 64);
        assert_eq!(optional_po2(1, false), 1);
    }
}
