// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! A deduplicating cache over mutable GL context state.
//!
//! GL context state is process-wide mutable state scoped to the thread's
//! current context. Every state change this crate makes goes through this
//! cache, which drops redundant driver calls (the same bind or parameter
//! set twice in a row issues once) and remembers current values so scoped
//! guards can restore what they found.
//!
//! The cache is only as correct as the discipline around it: code that
//! mutates context state behind its back desynchronizes it. Within this
//! crate, the only deliberate bypass is the framebuffer binding, which is
//! re-queried from the driver before the blit fast path precisely because
//! outside code may have bound one directly.

use std::collections::HashMap;

use glow::HasContext;

/// Tracked GL context state. All mutation goes through the methods, which
/// issue the minimal set of driver calls.
#[derive(Debug, Default)]
pub struct StateCache {
    active_unit: u32,
    bound_textures: HashMap<(u32, u32), glow::Texture>,
    tex_params: HashMap<(glow::Texture, u32), i32>,
    enables: HashMap<u32, bool>,
    viewport: Option<(i32, i32, i32, i32)>,
    program: Option<glow::Program>,
    vertex_array: Option<glow::VertexArray>,
    framebuffer: Option<glow::Framebuffer>,
}

impl StateCache {
    pub fn new() -> Self {
        StateCache::default()
    }

    /// Selects the active texture unit.
    pub fn activate_unit(&mut self, gl: &glow::Context, unit: u32) {
        if self.active_unit != unit {
            unsafe { gl.active_texture(glow::TEXTURE0 + unit) };
            self.active_unit = unit;
        }
    }

    pub fn current_unit(&self) -> u32 {
        self.active_unit
    }

    /// Binds `texture` to `target` on the active unit.
    pub fn bind_texture(&mut self, gl: &glow::Context, target: u32, texture: Option<glow::Texture>) {
        let key = (self.active_unit, target);
        if self.bound_textures.get(&key).copied() != texture {
            unsafe { gl.bind_texture(target, texture) };
            match texture {
                Some(t) => {
                    self.bound_textures.insert(key, t);
                }
                None => {
                    self.bound_textures.remove(&key);
                }
            }
        }
    }

    pub fn bound_texture(&self, unit: u32, target: u32) -> Option<glow::Texture> {
        self.bound_textures.get(&(unit, target)).copied()
    }

    /// A copy of every tracked texture binding, for scoped save/restore.
    pub fn texture_bindings(&self) -> HashMap<(u32, u32), glow::Texture> {
        self.bound_textures.clone()
    }

    /// Sets an integer texture parameter on the texture currently bound to
    /// `target`, memoized per texture object.
    pub fn tex_parameter_i32(&mut self, gl: &glow::Context, target: u32, pname: u32, value: i32) {
        let bound = self.bound_textures.get(&(self.active_unit, target)).copied();
        if let Some(texture) = bound {
            if self.tex_params.get(&(texture, pname)).copied() == Some(value) {
                return;
            }
            self.tex_params.insert((texture, pname), value);
        }
        unsafe { gl.tex_parameter_i32(target, pname, value) };
    }

    /// Forgets memoized parameters for a texture about to be deleted.
    pub fn forget_texture(&mut self, texture: glow::Texture) {
        self.tex_params.retain(|(t, _), _| *t != texture);
        self.bound_textures.retain(|_, t| *t != texture);
    }

    /// Enables or disables a capability. Capabilities this crate touches
    /// all default to disabled on a fresh context.
    pub fn set_enabled(&mut self, gl: &glow::Context, cap: u32, enabled: bool) {
        let current = self.enables.get(&cap).copied().unwrap_or(false);
        if current != enabled {
            unsafe {
                if enabled {
                    gl.enable(cap);
                } else {
                    gl.disable(cap);
                }
            }
            self.enables.insert(cap, enabled);
        }
    }

    pub fn is_enabled(&self, cap: u32) -> bool {
        self.enables.get(&cap).copied().unwrap_or(false)
    }

    pub fn set_viewport(&mut self, gl: &glow::Context, x: i32, y: i32, width: i32, height: i32) {
        if self.viewport != Some((x, y, width, height)) {
            unsafe { gl.viewport(x, y, width, height) };
            self.viewport = Some((x, y, width, height));
        }
    }

    pub fn current_viewport(&self) -> Option<(i32, i32, i32, i32)> {
        self.viewport
    }

    pub fn use_program(&mut self, gl: &glow::Context, program: Option<glow::Program>) {
        if self.program != program {
            unsafe { gl.use_program(program) };
            self.program = program;
        }
    }

    pub fn current_program(&self) -> Option<glow::Program> {
        self.program
    }

    pub fn bind_vertex_array(&mut self, gl: &glow::Context, vao: Option<glow::VertexArray>) {
        if self.vertex_array != vao {
            unsafe { gl.bind_vertex_array(vao) };
            self.vertex_array = vao;
        }
    }

    pub fn current_vertex_array(&self) -> Option<glow::VertexArray> {
        self.vertex_array
    }

    /// Binds a framebuffer. Never deduplicated: outside code binds
    /// framebuffers without this cache, so the recorded value is a hint,
    /// not a truth.
    pub fn bind_framebuffer(&mut self, gl: &glow::Context, framebuffer: Option<glow::Framebuffer>) {
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
        self.framebuffer = framebuffer;
    }

    pub fn current_framebuffer(&self) -> Option<glow::Framebuffer> {
        self.framebuffer
    }
}
