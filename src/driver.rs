// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The driver bundle: the GL context, the state cache, the collaborator
//! seams, and the shared machinery of the GPU blit fast path.
//!
//! Pixel buffers hold an `Rc<GlDriver>` and route every state-changing
//! call through it, so the whole crate shares one [`StateCache`] per
//! context. One context per thread, strict save/restore inside each
//! operation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::rc::Rc;

use glow::HasContext;

use crate::TransferError;
use crate::pixel_ops::PixelOps;
use crate::render_targets::RenderTargetRegistry;
use crate::state_cache::StateCache;

/// Driver capabilities the transfer paths branch on, probed once by the
/// embedding engine at context creation.
#[derive(Debug, Clone, Copy)]
pub struct DriverCaps {
    /// Framebuffer objects are available. Without them every blit takes
    /// the CPU-mediated path.
    pub fbo_supported: bool,
    /// Textures may have non-power-of-two dimensions without penalty.
    /// When false, temporary blit textures round their extents up.
    pub npot_textures: bool,
}

/// Which sampler dimensionality a blit program targets. 1D sources ride
/// on 2D storage, so two programs cover every fast-path source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SamplerKind {
    D2,
    D3,
}

/// One compiled blit program with its quad geometry objects.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlitRig {
    program: glow::Program,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
}

/// One corner of the blit quad: NDC position plus a 3D source coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlitVertex {
    pub position: [f32; 2],
    pub texcoord: [f32; 3],
}

/// Reinterpret quad vertices as bytes for the vertex buffer.
fn vertex_bytes(vertices: &[BlitVertex; 4]) -> &[u8] {
    //safe because BlitVertex is repr(C) with only f32 fields
    unsafe {
        std::slice::from_raw_parts(
            vertices.as_ptr() as *const u8,
            std::mem::size_of_val(vertices),
        )
    }
}

const BLIT_VERTEX_SRC: &str = r#"#version 330 core
layout(location = 0) in vec2 position;
layout(location = 1) in vec3 texcoord;
out vec3 v_texcoord;
void main() {
    v_texcoord = texcoord;
    gl_Position = vec4(position, 0.0, 1.0);
}
"#;

const BLIT_FRAGMENT_2D_SRC: &str = r#"#version 330 core
uniform sampler2D source;
in vec3 v_texcoord;
out vec4 color;
void main() {
    color = texture(source, v_texcoord.xy);
}
"#;

const BLIT_FRAGMENT_3D_SRC: &str = r#"#version 330 core
uniform sampler3D source;
in vec3 v_texcoord;
out vec4 color;
void main() {
    color = texture(source, v_texcoord);
}
"#;

/// The per-context driver bundle.
///
/// Owns the `glow` context, the deduplicating [`StateCache`], the probed
/// [`DriverCaps`], and the two collaborator seams (CPU pixel ops and the
/// render-target registry). Single-threaded by design; interior
/// mutability covers the cache and the lazily compiled blit rigs.
pub struct GlDriver {
    gl: glow::Context,
    state: RefCell<StateCache>,
    caps: DriverCaps,
    pixel_ops: Box<dyn PixelOps>,
    render_targets: Box<dyn RenderTargetRegistry>,
    blit_rigs: RefCell<HashMap<SamplerKind, BlitRig>>,
}

impl GlDriver {
    pub fn new(
        gl: glow::Context,
        caps: DriverCaps,
        pixel_ops: Box<dyn PixelOps>,
        render_targets: Box<dyn RenderTargetRegistry>,
    ) -> Rc<Self> {
        Rc::new(GlDriver {
            gl,
            state: RefCell::new(StateCache::new()),
            caps,
            pixel_ops,
            render_targets,
            blit_rigs: RefCell::new(HashMap::new()),
        })
    }

    /// The raw context, for calls with no cacheable state (transfers,
    /// object creation). State-changing calls belong on the cache
    /// wrappers below.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn caps(&self) -> &DriverCaps {
        &self.caps
    }

    pub fn pixel_ops(&self) -> &dyn PixelOps {
        self.pixel_ops.as_ref()
    }

    pub fn render_targets(&self) -> &dyn RenderTargetRegistry {
        self.render_targets.as_ref()
    }

    // --- cache-mediated state ---

    pub fn activate_unit(&self, unit: u32) {
        self.state.borrow_mut().activate_unit(&self.gl, unit);
    }

    pub fn bind_texture(&self, target: u32, texture: Option<glow::Texture>) {
        self.state.borrow_mut().bind_texture(&self.gl, target, texture);
    }

    pub fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32) {
        self.state
            .borrow_mut()
            .tex_parameter_i32(&self.gl, target, pname, value);
    }

    pub fn set_enabled(&self, cap: u32, enabled: bool) {
        self.state.borrow_mut().set_enabled(&self.gl, cap, enabled);
    }

    pub fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state.borrow_mut().set_viewport(&self.gl, x, y, width, height);
    }

    pub fn use_program(&self, program: Option<glow::Program>) {
        self.state.borrow_mut().use_program(&self.gl, program);
    }

    pub fn bind_vertex_array(&self, vao: Option<glow::VertexArray>) {
        self.state.borrow_mut().bind_vertex_array(&self.gl, vao);
    }

    pub fn bind_framebuffer(&self, framebuffer: Option<glow::Framebuffer>) {
        self.state.borrow_mut().bind_framebuffer(&self.gl, framebuffer);
    }

    /// Deletes a texture and drops any memoized parameter state for it.
    pub fn delete_texture(&self, texture: glow::Texture) {
        self.state.borrow_mut().forget_texture(texture);
        unsafe { self.gl.delete_texture(texture) };
    }

    // --- blit rig ---

    /// The compiled blit rig for the given source dimensionality,
    /// compiling it on first use.
    pub(crate) fn blit_rig_for(&self, kind: SamplerKind) -> Result<BlitRig, TransferError> {
        if let Some(rig) = self.blit_rigs.borrow().get(&kind) {
            return Ok(*rig);
        }
        let fragment = match kind {
            SamplerKind::D2 => BLIT_FRAGMENT_2D_SRC,
            SamplerKind::D3 => BLIT_FRAGMENT_3D_SRC,
        };
        let rig = self.compile_rig(fragment)?;
        logwise::debuginternal_sync!(
            "compiled blit rig {kind}",
            kind = logwise::privacy::LogIt(&kind)
        );
        self.blit_rigs.borrow_mut().insert(kind, rig);
        Ok(rig)
    }

    fn compile_shader(&self, kind: u32, src: &str) -> Result<glow::Shader, TransferError> {
        let gl = &self.gl;
        unsafe {
            let shader = gl.create_shader(kind).map_err(TransferError::Driver)?;
            gl.shader_source(shader, src);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                return Err(TransferError::Driver(log));
            }
            Ok(shader)
        }
    }

    fn compile_rig(&self, fragment_src: &str) -> Result<BlitRig, TransferError> {
        let gl = &self.gl;
        let vertex = self.compile_shader(glow::VERTEX_SHADER, BLIT_VERTEX_SRC)?;
        let fragment = self.compile_shader(glow::FRAGMENT_SHADER, fragment_src)?;
        let program = unsafe {
            let program = gl.create_program().map_err(TransferError::Driver)?;
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            gl.link_program(program);
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);
            if !gl.get_program_link_status(program) {
                return Err(TransferError::Driver(gl.get_program_info_log(program)));
            }
            program
        };

        let (vao, vbo) = unsafe {
            let vao = gl.create_vertex_array().map_err(TransferError::Driver)?;
            let vbo = gl.create_buffer().map_err(TransferError::Driver)?;
            self.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            let stride = std::mem::size_of::<BlitVertex>() as i32;
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 8);
            self.bind_vertex_array(None);
            (vao, vbo)
        };

        // The source sampler always reads unit 0.
        self.use_program(Some(program));
        unsafe {
            let location = gl
                .get_uniform_location(program, "source")
                .ok_or_else(|| TransferError::Driver("source uniform missing".to_string()))?;
            gl.uniform_1_i32(Some(&location), 0);
        }

        Ok(BlitRig { program, vao, vbo })
    }

    /// Streams one quad's vertices and draws it with the rig's program.
    pub(crate) fn draw_blit_quad(&self, rig: BlitRig, vertices: &[BlitVertex; 4]) {
        self.use_program(Some(rig.program));
        self.bind_vertex_array(Some(rig.vao));
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(rig.vbo));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, vertex_bytes(vertices), glow::STREAM_DRAW);
            self.gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4);
        }
    }
}

impl std::fmt::Debug for GlDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlDriver").field("caps", &self.caps).finish()
    }
}

/// Scoped save/clear/restore of the render state the GPU blit touches.
///
/// Construction snapshots the state the blit will clobber and disables
/// the tests and blending that would corrupt a plain textured quad; `Drop`
/// restores everything, so every exit path of the blit (including `?`
/// returns on resource allocation) leaves the context as it found it.
pub(crate) struct BlitStateGuard<'a> {
    driver: &'a GlDriver,
    framebuffer: Option<glow::Framebuffer>,
    viewport: Option<(i32, i32, i32, i32)>,
    enables: [(u32, bool); 4],
    program: Option<glow::Program>,
    vertex_array: Option<glow::VertexArray>,
    unit: u32,
    texture_bindings: HashMap<(u32, u32), glow::Texture>,
}

const GUARDED_CAPS: [u32; 4] = [
    glow::SCISSOR_TEST,
    glow::DEPTH_TEST,
    glow::BLEND,
    glow::CULL_FACE,
];

impl<'a> BlitStateGuard<'a> {
    pub fn begin(driver: &'a GlDriver) -> Self {
        // The framebuffer binding is queried from the driver rather than
        // the cache: the engine may have bound one without going through
        // us.
        let raw = unsafe { driver.gl().get_parameter_i32(glow::FRAMEBUFFER_BINDING) };
        let framebuffer = NonZeroU32::new(raw as u32).map(glow::NativeFramebuffer);

        let (viewport, program, vertex_array, unit, enables, texture_bindings) = {
            let state = driver.state.borrow();
            (
                state.current_viewport(),
                state.current_program(),
                state.current_vertex_array(),
                state.current_unit(),
                GUARDED_CAPS.map(|cap| (cap, state.is_enabled(cap))),
                state.texture_bindings(),
            )
        };

        let guard = BlitStateGuard {
            driver,
            framebuffer,
            viewport,
            enables,
            program,
            vertex_array,
            unit,
            texture_bindings,
        };

        driver.activate_unit(0);
        for cap in GUARDED_CAPS {
            driver.set_enabled(cap, false);
        }
        guard
    }
}

impl Drop for BlitStateGuard<'_> {
    fn drop(&mut self) {
        for (cap, enabled) in self.enables {
            self.driver.set_enabled(cap, enabled);
        }
        self.driver.use_program(self.program);
        self.driver.bind_vertex_array(self.vertex_array);
        if let Some((x, y, w, h)) = self.viewport {
            self.driver.set_viewport(x, y, w, h);
        }

        // put back every texture binding the blit displaced, and unbind
        // targets that had nothing bound before
        let current = self.driver.state.borrow().texture_bindings();
        for (&(unit, target), _) in current.iter() {
            let before = self.texture_bindings.get(&(unit, target)).copied();
            if before != Some(current[&(unit, target)]) {
                self.driver.activate_unit(unit);
                self.driver.bind_texture(target, before);
            }
        }

        self.driver.activate_unit(self.unit);
        self.driver.bind_framebuffer(self.framebuffer);
    }
}
