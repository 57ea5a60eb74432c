// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The texture-backed pixel buffer: one mip level / cube face / depth
//! range of a GL texture object, with native transfers and the
//! GPU-resident blit fast paths.
//!
//! A buffer never owns its texture object: many buffers reference
//! different levels and faces of the same texture, and the texture object
//! (not the caller) is the source of truth: construction reads the level's
//! real dimensions and storage format back from the driver, because they
//! depend on allocation calls this buffer never saw.
//!
//! Two accelerated paths live here:
//!
//! - [`GlTextureBuffer::blit_from_texture`] draws a textured quad into an
//!   offscreen framebuffer, which is what engages the sampler's filtering
//!   hardware to do the scaling on the GPU.
//! - [`GlTextureBuffer::blit_from_memory`] routes scaled memory uploads
//!   through a temporary texture and the quad path above.
//!
//! Both restore every piece of context state they touch on every exit
//! path, through scoped guards.

use std::rc::Rc;

use glow::{HasContext, PixelPackData, PixelUnpackData};

use crate::TransferError;
use crate::driver::{BlitStateGuard, BlitVertex, DriverCaps, GlDriver, SamplerKind};
use crate::pixel_formats::{PixelFormat, gl_support};
use crate::region::{Box3, PixelView, PixelViewMut, PixelVolume};
use crate::render_targets::{self, RenderTargetId, SurfaceDesc};
use crate::transfer::{self, BufferUsage, HardwarePixelBuffer};

/// Texture dimensionality. 1D surfaces ride on 2D storage with height
/// pinned to 1 (the GL binding exposes only the ES-style entry points),
/// keeping their dimensional semantics without dedicated 1D calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Tex1d,
    Tex2d,
    Tex3d,
    Tex2dArray,
    CubeMap,
}

impl TextureKind {
    pub const fn gl_target(self) -> u32 {
        match self {
            TextureKind::Tex1d | TextureKind::Tex2d => glow::TEXTURE_2D,
            TextureKind::Tex3d => glow::TEXTURE_3D,
            TextureKind::Tex2dArray => glow::TEXTURE_2D_ARRAY,
            TextureKind::CubeMap => glow::TEXTURE_CUBE_MAP,
        }
    }

    /// Targets whose depth slices are addressable framebuffer layers.
    const fn is_layered(self) -> bool {
        matches!(self, TextureKind::Tex3d | TextureKind::Tex2dArray)
    }
}

/// True when a texture-to-texture blit may take the GPU path.
///
/// Reading from a texture that is registered for rendering while also
/// drawing with it misbehaves on seemingly all drivers, so render-target
/// sources always take the CPU-mediated path. Fast-path sources must be
/// 1D/2D/3D (the blit rig samples them directly); 2D-array destinations
/// have no per-slice attach on the direct route.
pub(crate) fn fast_blit_eligible(
    caps: &DriverCaps,
    src_kind: TextureKind,
    src_is_render_target: bool,
    dst_kind: TextureKind,
) -> bool {
    caps.fbo_supported
        && !src_is_render_target
        && matches!(
            src_kind,
            TextureKind::Tex1d | TextureKind::Tex2d | TextureKind::Tex3d
        )
        && dst_kind != TextureKind::Tex2dArray
}

/// Pixel-store parameters a transfer needs beyond the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransferParams {
    /// `*_ROW_LENGTH`, when the row pitch differs from the width.
    row_length: Option<i32>,
    /// `*_IMAGE_HEIGHT`, when the slice pitch is not width × height.
    image_height: Option<i32>,
    /// Row byte width is not a multiple of 4, so the default 4-byte
    /// alignment would skew every row.
    tight_alignment: bool,
}

pub(crate) fn transfer_params(data: &PixelView<'_>) -> TransferParams {
    let row_length = (data.row_pitch() != data.width()).then_some(data.row_pitch() as i32);
    let image_height = (data.width() > 0 && data.slice_pitch() != data.width() * data.height())
        .then(|| (data.slice_pitch() / data.width()) as i32);
    let bpp = data.format().bytes_per_pixel().unwrap_or(0);
    let tight_alignment = (data.width() * bpp) & 3 != 0;
    TransferParams {
        row_length,
        image_height,
        tight_alignment,
    }
}

/// Applies pixel-store parameters on construction and restores the
/// defaults (row length 0, image height 0, alignment 4) on drop. The
/// restore happens unconditionally so a failed transfer cannot leak skewed
/// unpack state into unrelated later transfers.
struct PixelStoreGuard<'a> {
    gl: &'a glow::Context,
    row_length: u32,
    image_height: u32,
    alignment: u32,
}

impl<'a> PixelStoreGuard<'a> {
    fn unpack(gl: &'a glow::Context, params: TransferParams) -> Self {
        Self::apply(
            gl,
            params,
            glow::UNPACK_ROW_LENGTH,
            glow::UNPACK_IMAGE_HEIGHT,
            glow::UNPACK_ALIGNMENT,
        )
    }

    fn pack(gl: &'a glow::Context, params: TransferParams) -> Self {
        Self::apply(
            gl,
            params,
            glow::PACK_ROW_LENGTH,
            glow::PACK_IMAGE_HEIGHT,
            glow::PACK_ALIGNMENT,
        )
    }

    fn apply(
        gl: &'a glow::Context,
        params: TransferParams,
        row_length: u32,
        image_height: u32,
        alignment: u32,
    ) -> Self {
        unsafe {
            if let Some(pitch) = params.row_length {
                gl.pixel_store_i32(row_length, pitch);
            }
            if let Some(height) = params.image_height {
                gl.pixel_store_i32(image_height, height);
            }
            if params.tight_alignment {
                gl.pixel_store_i32(alignment, 1);
            }
        }
        PixelStoreGuard {
            gl,
            row_length,
            image_height,
            alignment,
        }
    }
}

impl Drop for PixelStoreGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            self.gl.pixel_store_i32(self.row_length, 0);
            self.gl.pixel_store_i32(self.image_height, 0);
            self.gl.pixel_store_i32(self.alignment, 4);
        }
    }
}

/// The blit quad for one destination slice: a full-viewport quad whose 3D
/// texture coordinates select the source sub-region and (for volume
/// sources) the interpolated source slice.
pub(crate) fn source_quad(
    src_width: u32,
    src_height: u32,
    src_depth: u32,
    src_box: Box3,
    dst_box: Box3,
    slice: u32,
) -> [BlitVertex; 4] {
    let u1 = src_box.left as f32 / src_width as f32;
    let v1 = src_box.top as f32 / src_height as f32;
    let u2 = src_box.right as f32 / src_width as f32;
    let v2 = src_box.bottom as f32 / src_height as f32;
    // source slice for this destination slice, as a 0..1 texture coordinate
    // centered on the slice
    let fraction = (slice - dst_box.front) as f32 / dst_box.depth() as f32;
    let slice_coord = fraction * (src_box.depth() + src_box.front) as f32;
    let w = (slice_coord + 0.5) / src_depth as f32;
    [
        BlitVertex {
            position: [-1.0, -1.0],
            texcoord: [u1, v1, w],
        },
        BlitVertex {
            position: [1.0, -1.0],
            texcoord: [u2, v1, w],
        },
        BlitVertex {
            position: [1.0, 1.0],
            texcoord: [u2, v2, w],
        },
        BlitVertex {
            position: [-1.0, 1.0],
            texcoord: [u1, v2, w],
        },
    ]
}

/// A pixel buffer over one mip level / face / depth range of a texture
/// object. See the module docs for the ownership rules.
pub struct GlTextureBuffer {
    driver: Rc<GlDriver>,
    kind: TextureKind,
    gl_target: u32,
    face_target: u32,
    texture: glow::Texture,
    level: i32,
    width: u32,
    height: u32,
    depth: u32,
    format: PixelFormat,
    internal_format: u32,
    usage: BufferUsage,
    hw_gamma: bool,
    row_pitch: u32,
    slice_pitch: u32,
    size_in_bytes: usize,
    slice_targets: Vec<Option<RenderTargetId>>,
}

impl GlTextureBuffer {
    /// Wraps `level` of `texture`, reading the level's actual dimensions
    /// and storage format back from the driver.
    ///
    /// A level with any zero dimension produces a buffer that is valid to
    /// hold but invalid for transfers (see [`GlTextureBuffer::is_valid`]);
    /// no render targets are registered for it.
    ///
    /// When `usage.render_target` is set, one render target per depth
    /// slice is registered with the engine's registry; they are released
    /// on drop.
    #[allow(clippy::too_many_arguments)] // mirrors the driver-level surface description
    pub fn new(
        driver: Rc<GlDriver>,
        base_name: &str,
        kind: TextureKind,
        texture: glow::Texture,
        face: u32,
        level: i32,
        usage: BufferUsage,
        hw_gamma: bool,
        samples: u32,
    ) -> Self {
        let gl_target = kind.gl_target();
        let face_target = if kind == TextureKind::CubeMap {
            glow::TEXTURE_CUBE_MAP_POSITIVE_X + face
        } else {
            gl_target
        };

        driver.bind_texture(gl_target, Some(texture));
        let gl = driver.gl();
        let width =
            unsafe { gl.get_tex_level_parameter_i32(face_target, level, glow::TEXTURE_WIDTH) }
                .max(0) as u32;
        let height = if kind == TextureKind::Tex1d {
            1
        } else {
            unsafe { gl.get_tex_level_parameter_i32(face_target, level, glow::TEXTURE_HEIGHT) }
                .max(0) as u32
        };
        let depth = if kind.is_layered() {
            unsafe { gl.get_tex_level_parameter_i32(face_target, level, glow::TEXTURE_DEPTH) }
                .max(0) as u32
        } else {
            1
        };
        let internal_format = unsafe {
            gl.get_tex_level_parameter_i32(face_target, level, glow::TEXTURE_INTERNAL_FORMAT)
        } as u32;
        let format = gl_support::closest_format(internal_format);

        logwise::trace_sync!(
            "texture buffer level {level}: {width}x{height}x{depth} {format}",
            level = level,
            width = width,
            height = height,
            depth = depth,
            format = logwise::privacy::LogIt(&format)
        );

        let slice_targets = if usage.render_target && width > 0 && height > 0 && depth > 0 {
            let raw = texture.0.get();
            let base = format!("{:x}.{}/{}", raw, level, base_name);
            render_targets::register_slice_targets(
                driver.render_targets(),
                &base,
                depth,
                hw_gamma,
                samples,
                |zoffset| SurfaceDesc {
                    texture,
                    level,
                    zoffset,
                    format,
                },
            )
        } else {
            Vec::new()
        };

        GlTextureBuffer {
            driver,
            kind,
            gl_target,
            face_target,
            texture,
            level,
            width,
            height,
            depth,
            format,
            internal_format,
            usage,
            hw_gamma,
            row_pitch: width,
            slice_pitch: width * height,
            size_in_bytes: format.memory_size(width, height, depth),
            slice_targets,
        }
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn texture(&self) -> glow::Texture {
        self.texture
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// The sized GL internal format the level was allocated with.
    pub fn internal_format(&self) -> u32 {
        self.internal_format
    }

    /// Byte size of the buffer's whole extent, tightly packed.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    /// Row pitch of the whole extent, in pixels.
    pub fn row_pitch(&self) -> u32 {
        self.row_pitch
    }

    /// Slice pitch of the whole extent, in pixels.
    pub fn slice_pitch(&self) -> u32 {
        self.slice_pitch
    }

    /// False when the wrapped level has a zero dimension; such a buffer
    /// must not be blitted.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.depth > 0
    }

    /// The render target registered for `zoffset`, if it has not been
    /// removed. Only meaningful for render-target usage.
    pub fn render_target(&self, zoffset: u32) -> Option<RenderTargetId> {
        assert!(self.usage.render_target);
        assert!(zoffset < self.depth);
        self.slice_targets[zoffset as usize]
    }

    /// Notification that the engine removed a slice's render target; the
    /// buffer forgets it so teardown does not release it a second time.
    pub fn clear_slice_target(&mut self, zoffset: u32) {
        if let Some(slot) = self.slice_targets.get_mut(zoffset as usize) {
            *slot = None;
        }
    }

    /// Copies the bound framebuffer's contents into this buffer at
    /// `zoffset`. The render-to-texture fallback for contexts without
    /// framebuffer objects.
    pub fn copy_from_framebuffer(&mut self, zoffset: u32) {
        self.driver.bind_texture(self.gl_target, Some(self.texture));
        let gl = self.driver.gl();
        unsafe {
            match self.kind {
                TextureKind::Tex1d | TextureKind::Tex2d | TextureKind::CubeMap => {
                    gl.copy_tex_sub_image_2d(
                        self.face_target,
                        self.level,
                        0,
                        0,
                        0,
                        0,
                        self.width as i32,
                        self.height as i32,
                    );
                }
                TextureKind::Tex3d | TextureKind::Tex2dArray => {
                    gl.copy_tex_sub_image_3d(
                        self.gl_target,
                        self.level,
                        0,
                        0,
                        zoffset as i32,
                        0,
                        0,
                        self.width as i32,
                        self.height as i32,
                    );
                }
            }
        }
    }

    /// Copies `src_box` of `src` into `dst_box` of this buffer, on the
    /// GPU when the fast path applies, else through CPU memory.
    pub fn blit(
        &mut self,
        src: &mut GlTextureBuffer,
        src_box: Box3,
        dst_box: Box3,
    ) -> Result<(), TransferError> {
        if fast_blit_eligible(
            self.driver.caps(),
            src.kind,
            src.usage.render_target,
            self.kind,
        ) {
            self.blit_from_texture(src, src_box, dst_box)
        } else {
            logwise::trace_sync!("blit: taking the CPU-mediated path");
            let driver = self.driver.clone();
            transfer::blit(self, src, driver.pixel_ops(), src_box, dst_box)
        }
    }

    /// GPU-resident blit: renders `src_box` of `src` into `dst_box` of
    /// this buffer through a temporary framebuffer, scaling on the
    /// sampler. Hardware bi/trilinear filtering applies when the extents
    /// differ.
    pub fn blit_from_texture(
        &mut self,
        src: &GlTextureBuffer,
        src_box: Box3,
        dst_box: Box3,
    ) -> Result<(), TransferError> {
        let src_extent = src.whole_extent();
        if !src_extent.contains(&src_box) {
            return Err(TransferError::OutOfRange {
                requested: src_box,
                extent: src_extent,
            });
        }
        let dst_extent = self.whole_extent();
        if !dst_extent.contains(&dst_box) {
            return Err(TransferError::OutOfRange {
                requested: dst_box,
                extent: dst_extent,
            });
        }

        let driver = self.driver.clone();
        let gl = driver.gl();
        let sampler = if src.kind == TextureKind::Tex3d {
            SamplerKind::D3
        } else {
            SamplerKind::D2
        };

        let guard = BlitStateGuard::begin(&driver);

        // Fallible acquisitions happen before any texture state changes;
        // an early return here leaves only guard-covered state to unwind.
        let rig = driver.blit_rig_for(sampler)?;
        let registry = driver.render_targets();
        let direct = registry.supports_format(self.format);
        let staging_texture = if direct {
            None
        } else {
            Some(unsafe { gl.create_texture() }.map_err(TransferError::Driver)?)
        };

        // Source sampling state. Matching extents sample pixel-exact with
        // nearest; scaling uses trilinear only when the source maintains
        // its own complete mip chain, since manually mipmapped textures
        // may have levels the author never filled.
        driver.bind_texture(src.gl_target, Some(src.texture));
        let (min_filter, mag_filter) = if src_box.same_extent(&dst_box) {
            (glow::NEAREST, glow::NEAREST)
        } else if src.usage.auto_mipmap {
            (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR)
        } else {
            (glow::LINEAR, glow::LINEAR)
        };
        driver.tex_parameter_i32(src.gl_target, glow::TEXTURE_MIN_FILTER, min_filter as i32);
        driver.tex_parameter_i32(src.gl_target, glow::TEXTURE_MAG_FILTER, mag_filter as i32);
        driver.tex_parameter_i32(
            src.gl_target,
            glow::TEXTURE_WRAP_S,
            glow::CLAMP_TO_EDGE as i32,
        );
        driver.tex_parameter_i32(
            src.gl_target,
            glow::TEXTURE_WRAP_T,
            glow::CLAMP_TO_EDGE as i32,
        );
        driver.tex_parameter_i32(
            src.gl_target,
            glow::TEXTURE_WRAP_R,
            glow::CLAMP_TO_EDGE as i32,
        );
        // sample exactly the source buffer's mip level
        driver.tex_parameter_i32(src.gl_target, glow::TEXTURE_BASE_LEVEL, src.level);

        driver.bind_framebuffer(Some(registry.temporary_framebuffer()));

        let npot = driver.caps().npot_textures;
        if let Some(staging) = staging_texture {
            // The destination format is not renderable: render into an
            // intermediate texture in a supported format instead, and copy
            // out after each slice.
            let alternative = registry.alternative_format(self.format);
            let internal = gl_support::internal_format(alternative, self.hw_gamma);
            driver.bind_texture(glow::TEXTURE_2D, Some(staging));
            driver.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, 0);
            unsafe {
                gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    internal as i32,
                    gl_support::optional_po2(dst_box.width(), npot) as i32,
                    gl_support::optional_po2(dst_box.height(), npot) as i32,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    PixelUnpackData::Slice(None),
                );
                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    glow::TEXTURE_2D,
                    Some(staging),
                    0,
                );
            }
            driver.set_viewport(0, 0, dst_box.width() as i32, dst_box.height() as i32);
        } else {
            // Attaching the destination directly; the viewport restricts
            // rendering to exactly the destination sub-region.
            driver.set_viewport(
                dst_box.left as i32,
                dst_box.top as i32,
                dst_box.width() as i32,
                dst_box.height() as i32,
            );
        }

        for slice in dst_box.front..dst_box.back {
            if staging_texture.is_none() {
                self.bind_to_framebuffer(glow::COLOR_ATTACHMENT0, slice);
            }
            let vertices = source_quad(src.width, src.height, src.depth, src_box, dst_box, slice);
            driver.bind_texture(src.gl_target, Some(src.texture));
            driver.draw_blit_quad(rig, &vertices);

            if staging_texture.is_some() {
                driver.bind_texture(self.gl_target, Some(self.texture));
                unsafe {
                    match self.kind {
                        TextureKind::Tex1d | TextureKind::Tex2d | TextureKind::CubeMap => {
                            gl.copy_tex_sub_image_2d(
                                self.face_target,
                                self.level,
                                dst_box.left as i32,
                                dst_box.top as i32,
                                0,
                                0,
                                dst_box.width() as i32,
                                dst_box.height() as i32,
                            );
                        }
                        TextureKind::Tex3d | TextureKind::Tex2dArray => {
                            gl.copy_tex_sub_image_3d(
                                self.gl_target,
                                self.level,
                                dst_box.left as i32,
                                dst_box.top as i32,
                                slice as i32,
                                0,
                                0,
                                dst_box.width() as i32,
                                dst_box.height() as i32,
                            );
                        }
                    }
                }
            }
        }

        if staging_texture.is_none() && self.usage.auto_mipmap {
            driver.bind_texture(self.gl_target, Some(self.texture));
            unsafe { gl.generate_mipmap(self.gl_target) };
        }

        // return the source to its resting sampling state
        driver.bind_texture(src.gl_target, Some(src.texture));
        driver.tex_parameter_i32(src.gl_target, glow::TEXTURE_BASE_LEVEL, 0);

        // detach from the temporary framebuffer while it is still bound
        unsafe {
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::RENDERBUFFER,
                None,
            );
        }
        if let Some(staging) = staging_texture {
            driver.delete_texture(staging);
        }
        drop(guard);
        Ok(())
    }

    /// Copies `src` into `dst_box`, scaling on the GPU through a temporary
    /// texture when that is worthwhile.
    ///
    /// The generic CPU path handles the cases the accelerated route cannot
    /// help with: no framebuffer objects, luminance formats (unreliable
    /// through render targets), and matching extents (a direct or
    /// converted upload is already optimal when no scaling happens).
    pub fn blit_from_memory(
        &mut self,
        src: &PixelView<'_>,
        dst_box: Box3,
    ) -> Result<(), TransferError> {
        let driver = self.driver.clone();
        if !driver.caps().fbo_supported
            || src.format().is_luminance()
            || self.format.is_luminance()
            || src.extent().same_extent(&dst_box)
        {
            return transfer::blit_from_memory(self, driver.pixel_ops(), src, dst_box);
        }
        let extent = self.whole_extent();
        if !extent.contains(&dst_box) {
            return Err(TransferError::OutOfRange {
                requested: dst_box,
                extent,
            });
        }
        logwise::trace_sync!("blit_from_memory: scaling through a temporary texture");

        // First convert the source to a layout GL accepts from client
        // memory; the conversion buffer lives exactly as long as this call.
        let mut converted = None;
        let src_view = if self.supports_transfer_format(src.format()) {
            *src
        } else {
            let mut volume =
                PixelVolume::new(src.width(), src.height(), src.depth(), self.format);
            driver.pixel_ops().convert(src, &mut volume.view_mut())?;
            converted.insert(volume).view()
        };

        // Temporary texture holding the source, power-of-two sized when
        // the driver wants that.
        let kind = if src_view.depth() != 1 {
            TextureKind::Tex3d
        } else {
            TextureKind::Tex2d
        };
        let gl = driver.gl();
        let npot = driver.caps().npot_textures;
        let internal = gl_support::internal_format(src_view.format(), self.hw_gamma);
        let texture = unsafe { gl.create_texture() }.map_err(TransferError::Driver)?;
        driver.bind_texture(kind.gl_target(), Some(texture));
        unsafe {
            match kind {
                TextureKind::Tex3d => gl.tex_image_3d(
                    glow::TEXTURE_3D,
                    0,
                    internal as i32,
                    gl_support::optional_po2(src_view.width(), npot) as i32,
                    gl_support::optional_po2(src_view.height(), npot) as i32,
                    gl_support::optional_po2(src_view.depth(), npot) as i32,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    PixelUnpackData::Slice(None),
                ),
                _ => gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    internal as i32,
                    gl_support::optional_po2(src_view.width(), npot) as i32,
                    gl_support::optional_po2(src_view.height(), npot) as i32,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    PixelUnpackData::Slice(None),
                ),
            }
        }

        // Wrap it as a buffer (reading the real allocation back) with
        // automatic mipmaps, so the scaled sampling below can minify
        // cleanly, then blit from it into the real destination.
        let staging_usage = BufferUsage {
            auto_mipmap: true,
            ..BufferUsage::STATIC_WRITE_ONLY
        };
        let mut staging = GlTextureBuffer::new(
            driver.clone(),
            "blit-staging",
            kind,
            texture,
            0,
            0,
            staging_usage,
            false,
            0,
        );
        let staging_box = Box3::with_depth(
            0,
            0,
            0,
            src_view.width(),
            src_view.height(),
            src_view.depth(),
        );
        let result = (|| {
            staging.upload(&src_view, staging_box)?;
            self.blit_from_texture(&staging, staging_box, dst_box)
        })();

        drop(staging);
        driver.delete_texture(texture);
        result
    }

    /// Reads the `src_box` region into `dst`, through the generic engine.
    pub fn blit_to_memory(
        &mut self,
        src_box: Box3,
        dst: &mut PixelViewMut<'_>,
    ) -> Result<(), TransferError> {
        let driver = self.driver.clone();
        transfer::blit_to_memory(self, driver.pixel_ops(), src_box, dst)
    }

    fn upload_compressed(&self, data: &PixelView<'_>, dest: Box3) -> Result<(), TransferError> {
        // Pixel-store parameters do not apply to compressed uploads, so
        // the payload must be one gap-free run in the storage format.
        if data.format() != self.format || !data.is_consecutive() {
            return Err(TransferError::CompressedTransferLayout);
        }
        let internal = gl_support::internal_format(self.format, self.hw_gamma);
        let bytes = &data.data()[..data.consecutive_len()];
        let gl = self.driver.gl();
        unsafe {
            match self.kind {
                TextureKind::Tex1d | TextureKind::Tex2d | TextureKind::CubeMap => {
                    // some drivers mishandle compressed sub-image calls, so
                    // prefer the whole-image form at the origin
                    if dest.left == 0 && dest.top == 0 {
                        gl.compressed_tex_image_2d(
                            self.face_target,
                            self.level,
                            internal as i32,
                            dest.width() as i32,
                            dest.height() as i32,
                            0,
                            glow::CompressedPixelUnpackData::Slice(bytes),
                        );
                    } else {
                        gl.compressed_tex_sub_image_2d(
                            self.face_target,
                            self.level,
                            dest.left as i32,
                            dest.top as i32,
                            dest.width() as i32,
                            dest.height() as i32,
                            internal,
                            glow::CompressedPixelUnpackData::Slice(bytes),
                        );
                    }
                }
                TextureKind::Tex3d | TextureKind::Tex2dArray => {
                    if dest.left == 0 && dest.top == 0 && dest.front == 0 {
                        gl.compressed_tex_image_3d(
                            self.gl_target,
                            self.level,
                            internal as i32,
                            dest.width() as i32,
                            dest.height() as i32,
                            dest.depth() as i32,
                            0,
                            glow::CompressedPixelUnpackData::Slice(bytes),
                        );
                    } else {
                        gl.compressed_tex_sub_image_3d(
                            self.gl_target,
                            self.level,
                            dest.left as i32,
                            dest.top as i32,
                            dest.front as i32,
                            dest.width() as i32,
                            dest.height() as i32,
                            dest.depth() as i32,
                            internal,
                            glow::CompressedPixelUnpackData::Slice(bytes),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn upload_uncompressed(&self, data: &PixelView<'_>, dest: Box3) -> Result<(), TransferError> {
        let Some(transfer_format) = gl_support::transfer_format(data.format()) else {
            return Err(TransferError::NoNativeTransferFormat(data.format()));
        };
        let data_type = gl_support::data_type(data.format());
        let gl = self.driver.gl();
        let _store = PixelStoreGuard::unpack(gl, transfer_params(data));
        unsafe {
            match self.kind {
                TextureKind::Tex1d | TextureKind::Tex2d | TextureKind::CubeMap => {
                    gl.tex_sub_image_2d(
                        self.face_target,
                        self.level,
                        dest.left as i32,
                        dest.top as i32,
                        dest.width() as i32,
                        dest.height() as i32,
                        transfer_format,
                        data_type,
                        PixelUnpackData::Slice(Some(data.data())),
                    );
                }
                TextureKind::Tex3d | TextureKind::Tex2dArray => {
                    gl.tex_sub_image_3d(
                        self.gl_target,
                        self.level,
                        dest.left as i32,
                        dest.top as i32,
                        dest.front as i32,
                        dest.width() as i32,
                        dest.height() as i32,
                        dest.depth() as i32,
                        transfer_format,
                        data_type,
                        PixelUnpackData::Slice(Some(data.data())),
                    );
                }
            }
        }
        Ok(())
    }
}

impl HardwarePixelBuffer for GlTextureBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn depth(&self) -> u32 {
        self.depth
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn supports_transfer_format(&self, format: PixelFormat) -> bool {
        gl_support::transfer_format(format).is_some()
    }

    fn upload(&mut self, data: &PixelView<'_>, dest: Box3) -> Result<(), TransferError> {
        self.driver.bind_texture(self.gl_target, Some(self.texture));
        if data.format().is_compressed() {
            self.upload_compressed(data, dest)?;
        } else {
            self.upload_uncompressed(data, dest)?;
        }
        // automatic mipmaps are only declared when no custom mip levels
        // exist, so regenerating cannot overwrite authored data
        if self.usage.auto_mipmap && self.level == 0 {
            unsafe { self.driver.gl().generate_mipmap(self.gl_target) };
        }
        Ok(())
    }

    fn download(&mut self, into: &mut PixelViewMut<'_>) -> Result<(), TransferError> {
        if into.width() != self.width || into.height() != self.height || into.depth() != self.depth
        {
            // the native readback has no sub-region form
            return Err(TransferError::PartialDownload {
                requested: (into.width(), into.height(), into.depth()),
                extent: (self.width, self.height, self.depth),
            });
        }
        self.driver.bind_texture(self.gl_target, Some(self.texture));
        let gl = self.driver.gl();
        if into.format().is_compressed() {
            if into.format() != self.format || !into.is_consecutive() {
                return Err(TransferError::CompressedTransferLayout);
            }
            // the GL binding exposes no compressed readback entry point
            return Err(TransferError::Unsupported(
                "compressed texture readback is not available",
            ));
        }
        let Some(transfer_format) = gl_support::transfer_format(into.format()) else {
            return Err(TransferError::NoNativeTransferFormat(into.format()));
        };
        let data_type = gl_support::data_type(into.format());
        let params = transfer_params(&into.as_view());
        let _store = PixelStoreGuard::pack(gl, params);
        unsafe {
            gl.get_tex_image(
                self.face_target,
                self.level,
                transfer_format,
                data_type,
                PixelPackData::Slice(Some(into.data())),
            );
        }
        Ok(())
    }

    fn bind_to_framebuffer(&self, attachment: u32, zoffset: u32) {
        assert!(zoffset < self.depth);
        let gl = self.driver.gl();
        unsafe {
            match self.kind {
                TextureKind::Tex1d | TextureKind::Tex2d | TextureKind::CubeMap => {
                    gl.framebuffer_texture_2d(
                        glow::FRAMEBUFFER,
                        attachment,
                        self.face_target,
                        Some(self.texture),
                        self.level,
                    );
                }
                TextureKind::Tex3d | TextureKind::Tex2dArray => {
                    gl.framebuffer_texture_layer(
                        glow::FRAMEBUFFER,
                        attachment,
                        Some(self.texture),
                        self.level,
                        zoffset as i32,
                    );
                }
            }
        }
    }
}

impl Drop for GlTextureBuffer {
    fn drop(&mut self) {
        // release the render targets the engine has not already removed;
        // removing an unknown id is a registry no-op
        if self.usage.render_target {
            render_targets::release_slice_targets(
                self.driver.render_targets(),
                &mut self.slice_targets,
            );
        }
    }
}

impl std::fmt::Debug for GlTextureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlTextureBuffer")
            .field("kind", &self.kind)
            .field("level", &self.level)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.depth)
            .field("format", &self.format)
            .field("usage", &self.usage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FBO_CAPS: DriverCaps = DriverCaps {
        fbo_supported: true,
        npot_textures: true,
    };
    const NO_FBO_CAPS: DriverCaps = DriverCaps {
        fbo_supported: false,
        npot_textures: true,
    };

    #[test]
    fn fast_path_requires_fbo_support() {
        assert!(fast_blit_eligible(
            &FBO_CAPS,
            TextureKind::Tex2d,
            false,
            TextureKind::Tex2d
        ));
        assert!(!fast_blit_eligible(
            &NO_FBO_CAPS,
            TextureKind::Tex2d,
            false,
            TextureKind::Tex2d
        ));
    }

    #[test]
    fn fast_path_excludes_render_target_sources() {
        assert!(!fast_blit_eligible(
            &FBO_CAPS,
            TextureKind::Tex2d,
            true,
            TextureKind::Tex2d
        ));
    }

    #[test]
    fn fast_path_source_and_destination_kinds() {
        for src in [TextureKind::Tex1d, TextureKind::Tex2d, TextureKind::Tex3d] {
            assert!(fast_blit_eligible(&FBO_CAPS, src, false, TextureKind::Tex2d));
        }
        for src in [TextureKind::Tex2dArray, TextureKind::CubeMap] {
            assert!(!fast_blit_eligible(&FBO_CAPS, src, false, TextureKind::Tex2d));
        }
        for dst in [TextureKind::Tex1d, TextureKind::Tex3d, TextureKind::CubeMap] {
            assert!(fast_blit_eligible(&FBO_CAPS, TextureKind::Tex2d, false, dst));
        }
        assert!(!fast_blit_eligible(
            &FBO_CAPS,
            TextureKind::Tex2d,
            false,
            TextureKind::Tex2dArray
        ));
    }

    #[test]
    fn transfer_params_for_a_packed_view() {
        let data = vec![0u8; 4 * 4 * 4];
        let view = PixelView::packed(4, 4, 1, PixelFormat::Rgba8, &data);
        assert_eq!(
            transfer_params(&view),
            TransferParams {
                row_length: None,
                image_height: None,
                tight_alignment: false,
            }
        );
    }

    #[test]
    fn transfer_params_for_a_pitched_view() {
        let data = vec![0u8; 8 * 8 * 2 * 4];
        let view = PixelView::with_pitches(4, 4, 2, PixelFormat::Rgba8, 8, 64, &data);
        assert_eq!(
            transfer_params(&view),
            TransferParams {
                row_length: Some(8),
                image_height: Some(16),
                tight_alignment: false,
            }
        );
    }

    #[test]
    fn odd_row_widths_drop_to_byte_alignment() {
        // 3 pixels x 1 byte = 3 bytes per row, not 4-aligned
        let data = vec![0u8; 3 * 3];
        let view = PixelView::packed(3, 3, 1, PixelFormat::L8, &data);
        assert!(transfer_params(&view).tight_alignment);
        // 3 pixels x 4 bytes = 12 bytes per row, 4-aligned
        let data = vec![0u8; 3 * 3 * 4];
        let view = PixelView::packed(3, 3, 1, PixelFormat::Rgba8, &data);
        assert!(!transfer_params(&view).tight_alignment);
    }

    #[test]
    fn source_quad_covers_the_sub_region() {
        // an 8x8 source sampled over its right half into a 2D destination
        let quad = source_quad(
            8,
            8,
            1,
            Box3::new(4, 0, 8, 8),
            Box3::new(0, 0, 4, 8),
            0,
        );
        assert_eq!(quad[0].texcoord[0], 0.5);
        assert_eq!(quad[1].texcoord[0], 1.0);
        assert_eq!(quad[0].texcoord[1], 0.0);
        assert_eq!(quad[2].texcoord[1], 1.0);
        // 2D source: slice coordinate centers on the only slice
        assert_eq!(quad[0].texcoord[2], 0.5);
        // full-viewport quad in NDC
        assert_eq!(quad[0].position, [-1.0, -1.0]);
        assert_eq!(quad[2].position, [1.0, 1.0]);
    }

    #[test]
    fn source_quad_interpolates_volume_slices() {
        // 4-deep source into a 2-deep destination: slices sample at 1/4
        // and 3/4 through the source volume
        let src_box = Box3::with_depth(0, 0, 0, 8, 8, 4);
        let dst_box = Box3::with_depth(0, 0, 0, 8, 8, 2);
        let first = source_quad(8, 8, 4, src_box, dst_box, 0);
        let second = source_quad(8, 8, 4, src_box, dst_box, 1);
        assert_eq!(first[0].texcoord[2], 0.125);
        assert_eq!(second[0].texcoord[2], 0.625);
    }
}
