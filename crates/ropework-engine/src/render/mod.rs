//! Rendering: draw commands, materials, streaming buffers and the device seam.
//!
//! Producers build [`DrawCommand`]s (directly, through [`SpriteBatch`], or via
//! the legacy adapter) and hand them to a [`RenderSink`]. The [`Renderer`]
//! streams their geometry into ring buffers and forwards state + ranges to a
//! [`GpuBackend`].

pub mod backend;
pub mod camera;
pub mod command;
pub mod error;
pub mod material;
pub mod quad_batch;
pub mod renderer;
pub mod sprite_batch;
pub mod stats;
pub mod streaming;
pub mod texture;
pub mod transform;
pub mod vertex;
pub mod wgpu_backend;

pub use backend::{GpuBackend, RecordingBackend};
pub use camera::{Camera2D, CameraMode};
pub use command::{BufferRange, DrawCommand, FrameContext, IndexSource, Topology, VertexSource};
pub use error::RenderError;
pub use material::{BlendMode, Material, Program, SamplerMode};
pub use quad_batch::{MAX_QUADS_PER_BATCH, QuadBatchRenderer, QuadBatcher};
pub use renderer::{RenderSink, Renderer};
pub use sprite_batch::SpriteBatch;
pub use stats::RenderStats;
pub use streaming::{Allocation, RingCursor, StreamingBuffer};
pub use texture::{AtlasFrame, TextureAtlas, TextureId};
pub use transform::TransformStack;
pub use vertex::Vertex;
pub use wgpu_backend::WgpuBackend;
