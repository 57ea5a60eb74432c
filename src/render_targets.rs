// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The render-target registry seam.
//!
//! Render-target-usage texture buffers register one attachable surface per
//! depth slice with the engine's registry, and the registry can remove a
//! target independently (the engine owns render-target lifetimes). Both
//! sides therefore refer to a target by an opaque [`RenderTargetId`]
//! instead of holding pointers at each other, so teardown from either side
//! runs exactly once, safely, in either order.

use crate::pixel_formats::PixelFormat;

/// Opaque handle to a render target registered with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub u64);

/// One attachable texture surface: a specific level and depth slice of a
/// texture object. Deliberately carries no reference back to the pixel
/// buffer that registered it.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDesc {
    pub texture: glow::Texture,
    pub level: i32,
    pub zoffset: u32,
    pub format: PixelFormat,
}

/// The engine-side registry of render targets and offscreen framebuffers.
///
/// Registration attaches the target to the engine; `destroy_render_target`
/// with an id that is no longer registered MUST be a no-op, never an
/// error, so buffer teardown and engine-side removal race benignly.
pub trait RenderTargetRegistry {
    /// Creates and attaches a render target for `surface`. `samples` above
    /// zero requests multisampled rendering into the surface.
    fn create_render_target(
        &self,
        name: &str,
        surface: SurfaceDesc,
        hw_gamma: bool,
        samples: u32,
    ) -> RenderTargetId;

    /// Removes a target. No-op when `id` was already removed.
    fn destroy_render_target(&self, id: RenderTargetId);

    /// A reusable offscreen framebuffer for transient attach/draw work.
    fn temporary_framebuffer(&self) -> glow::Framebuffer;

    /// Whether `format` can be rendered to directly.
    fn supports_format(&self, format: PixelFormat) -> bool;

    /// A renderable stand-in for a format that is not directly supported.
    fn alternative_format(&self, format: PixelFormat) -> PixelFormat;
}

/// Registers one render target per depth slice and returns the slots a
/// buffer holds on to. Slot order is slice order.
pub(crate) fn register_slice_targets(
    registry: &dyn RenderTargetRegistry,
    base_name: &str,
    depth: u32,
    hw_gamma: bool,
    samples: u32,
    surface_for: impl Fn(u32) -> SurfaceDesc,
) -> Vec<Option<RenderTargetId>> {
    let mut slots = Vec::with_capacity(depth as usize);
    for zoffset in 0..depth {
        let name = format!("rtt/{}/{}", base_name, zoffset);
        let id = registry.create_render_target(&name, surface_for(zoffset), hw_gamma, samples);
        slots.push(Some(id));
    }
    slots
}

/// Destroys every slice target still held. Slots cleared by
/// [`clear_slice_target`](crate::texture::GlTextureBuffer::clear_slice_target)
/// are skipped; ids the registry already dropped destroy as no-ops.
pub(crate) fn release_slice_targets(
    registry: &dyn RenderTargetRegistry,
    slots: &mut Vec<Option<RenderTargetId>>,
) {
    for slot in slots.drain(..) {
        if let Some(id) = slot {
            registry.destroy_render_target(id);
        }
    }
}
