//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, device and surface, and reconfigures
//!   the swapchain when the window resizes.
//! - `pipeline` builds the shared bind group layouts and compiles one render
//!   pipeline per effect stage plus the present pass.
//! - `backend` implements [`crate::backend::Backend`] on top of those, so the
//!   render graph drives the GPU exactly as it drives the CPU evaluator.

mod backend;
mod context;
mod pipeline;

pub use backend::{GpuBackend, GpuTexture};
pub(crate) use context::GpuContext;
