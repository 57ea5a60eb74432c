/*! pixels_and_planes is the hardware pixel-buffer layer of an OpenGL-backed
rendering engine: it moves image data between CPU memory, textures and
renderbuffers, converting, scaling and re-slicing it along the way.

A transfer has to reconcile three independent format/size domains:

| Domain               | Decided by                  | Example                      |
|----------------------|-----------------------------|------------------------------|
| Caller data          | whoever produced the pixels | an ARGB image, 8×8           |
| Transfer layout      | the driver                  | RGBA + UNSIGNED_BYTE         |
| Destination storage  | the texture's allocation    | SRGB8_ALPHA8, level 2, 4×4   |

Rather than letting every buffer variant fight this three-way battle, the
[`transfer`] module reduces every blit to one decision (resample, convert,
or pass through) and hands the normalized result to exactly two primitive
operations, `upload` and `download`, that each variant implements natively.

# Buffer variants

| Variant                                    | Backed by        | Owns the GL object | Extra powers                                  |
|--------------------------------------------|------------------|--------------------|-----------------------------------------------|
| [`texture::GlTextureBuffer`]               | one texture level/face/slice range | no | GPU-resident blit fast paths, per-slice render targets |
| [`render_buffer::GlRenderBuffer`]          | a renderbuffer   | yes                | multisample storage, attach-only              |

# The fast path

When framebuffer objects are available, texture-to-texture blits (and
scaled memory uploads, via a temporary texture) render a single textured
quad into an offscreen framebuffer instead of copying through the CPU.
The quad draw is the point: it engages the sampler's filtering hardware,
so scaling runs at memory bandwidth with bilinear or trilinear filtering.
Context state touched on the way is snapshotted and restored by scoped
guards on every exit path.

# Collaborators

The crate deliberately does not implement filtered resampling, bulk format
conversion, or render-target lifecycle management. It consumes them
through the [`pixel_ops::PixelOps`] and
[`render_targets::RenderTargetRegistry`] seams, which the embedding engine
implements and tests fake.

# Safety and threading

All GL work assumes the thread's context is current; operations issue
driver calls synchronously and may stall until the driver acknowledges
them. One [`driver::GlDriver`] (and therefore one state cache) exists per
context, and buffers on that context share it through `Rc`; nothing here
is `Send`. Callers on multiple contexts give each thread its own driver
and buffers.
*/

pub mod driver;
mod error;
pub mod pixel_formats;
pub mod pixel_ops;
pub mod region;
pub mod render_buffer;
pub mod render_targets;
pub mod state_cache;
pub mod texture;
pub mod transfer;

pub use error::TransferError;
