//! # GPU Resource Lifetimes
//!
//! Descriptors of buffers, textures and pipelines, each kind in its own
//! generational [`Pool`]. Destroying a resource bumps its slot generation,
//! so an entity still pointing at it is detected at extraction time instead
//! of drawing whatever reused the slot.

use kestrel_core::{Handle, Pool};

use crate::error::{RenderError, RenderResult};
use crate::material::MaterialFlags;

/// What a buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Vertex data.
    Vertex,
    /// Index data.
    Index,
    /// Per-instance data.
    Instance,
    /// Uniform block.
    Uniform,
}

/// Buffer descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Debug label.
    pub label: String,
    /// Size in bytes.
    pub size: u64,
    /// Binding kind.
    pub usage: BufferUsage,
}

/// Texel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, sRGB.
    Rgba8Srgb,
    /// 8-bit RGBA, linear.
    Rgba8Unorm,
    /// 32-bit float depth.
    Depth32Float,
}

/// Texture descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    /// Debug label.
    pub label: String,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
}

/// Pipeline descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDesc {
    /// Debug label.
    pub label: String,
    /// Material flags the pipeline was built for.
    pub flags: MaterialFlags,
    /// Bound textures.
    pub textures: Vec<Handle>,
}

/// Live resource counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    /// Live buffers.
    pub buffers: usize,
    /// Live textures.
    pub textures: usize,
    /// Live pipelines.
    pub pipelines: usize,
}

/// Owner of every GPU resource descriptor.
#[derive(Debug, Default)]
pub struct GpuResources {
    buffers: Pool<BufferDesc>,
    textures: Pool<TextureDesc>,
    pipelines: Pool<PipelineDesc>,
}

impl GpuResources {
    /// Creates empty pools with `capacity` slots each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Pool::new(capacity),
            textures: Pool::new(capacity),
            pipelines: Pool::new(capacity),
        }
    }

    /// Registers a buffer.
    pub fn create_buffer(&mut self, desc: BufferDesc) -> Handle {
        tracing::trace!(label = %desc.label, size = desc.size, "create buffer");
        self.buffers.insert(desc)
    }

    /// Registers a texture.
    pub fn create_texture(&mut self, desc: TextureDesc) -> Handle {
        tracing::trace!(label = %desc.label, width = desc.width, height = desc.height, "create texture");
        self.textures.insert(desc)
    }

    /// Registers a pipeline.
    pub fn create_pipeline(&mut self, desc: PipelineDesc) -> Handle {
        tracing::trace!(label = %desc.label, flags = desc.flags.raw(), "create pipeline");
        self.pipelines.insert(desc)
    }

    /// Looks up a buffer.
    ///
    /// # Errors
    ///
    /// [`RenderError::StaleResource`] if the buffer was destroyed.
    pub fn buffer(&self, handle: Handle) -> RenderResult<&BufferDesc> {
        self.buffers.try_get(handle).map_err(|source| RenderError::StaleResource {
            kind: "buffer",
            source,
        })
    }

    /// Looks up a texture.
    ///
    /// # Errors
    ///
    /// [`RenderError::StaleResource`] if the texture was destroyed.
    pub fn texture(&self, handle: Handle) -> RenderResult<&TextureDesc> {
        self.textures.try_get(handle).map_err(|source| RenderError::StaleResource {
            kind: "texture",
            source,
        })
    }

    /// Looks up a pipeline.
    ///
    /// # Errors
    ///
    /// [`RenderError::StaleResource`] if the pipeline was destroyed.
    pub fn pipeline(&self, handle: Handle) -> RenderResult<&PipelineDesc> {
        self.pipelines.try_get(handle).map_err(|source| RenderError::StaleResource {
            kind: "pipeline",
            source,
        })
    }

    /// Destroys a buffer. Stale handles are a no-op.
    pub fn destroy_buffer(&mut self, handle: Handle) -> Option<BufferDesc> {
        self.buffers.remove(handle)
    }

    /// Destroys a texture. Stale handles are a no-op.
    pub fn destroy_texture(&mut self, handle: Handle) -> Option<TextureDesc> {
        self.textures.remove(handle)
    }

    /// Destroys a pipeline. Stale handles are a no-op.
    pub fn destroy_pipeline(&mut self, handle: Handle) -> Option<PipelineDesc> {
        self.pipelines.remove(handle)
    }

    /// Live resource counts.
    #[must_use]
    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            buffers: self.buffers.len(),
            textures: self.textures.len(),
            pipelines: self.pipelines.len(),
        }
    }

    /// Destroys everything. Every outstanding handle goes stale.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.textures.clear();
        self.pipelines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::PoolError;

    fn vertex_buffer(label: &str) -> BufferDesc {
        BufferDesc {
            label: label.to_owned(),
            size: 1024,
            usage: BufferUsage::Vertex,
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let mut resources = GpuResources::new(2);
        let buffer = resources.create_buffer(vertex_buffer("cube"));
        let texture = resources.create_texture(TextureDesc {
            label: "albedo".to_owned(),
            width: 256,
            height: 256,
            format: TextureFormat::Rgba8Srgb,
        });
        let pipeline = resources.create_pipeline(PipelineDesc {
            label: "lit".to_owned(),
            flags: MaterialFlags::OPAQUE,
            textures: vec![texture],
        });

        assert_eq!(resources.buffer(buffer).unwrap().label, "cube");
        assert_eq!(resources.pipeline(pipeline).unwrap().textures, vec![texture]);
        assert_eq!(
            resources.counts(),
            ResourceCounts {
                buffers: 1,
                textures: 1,
                pipelines: 1
            }
        );
    }

    #[test]
    fn test_destroyed_resource_is_stale() {
        let mut resources = GpuResources::new(1);
        let old = resources.create_buffer(vertex_buffer("old"));
        assert!(resources.destroy_buffer(old).is_some());
        assert!(resources.destroy_buffer(old).is_none());

        // Same slot, new generation.
        let new = resources.create_buffer(vertex_buffer("new"));
        assert_eq!(new.index(), old.index());

        assert!(matches!(
            resources.buffer(old),
            Err(RenderError::StaleResource {
                kind: "buffer",
                source: PoolError::Stale { .. }
            })
        ));
        assert_eq!(resources.buffer(new).unwrap().label, "new");
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut resources = GpuResources::new(4);
        let texture = resources.create_texture(TextureDesc {
            label: "shadow".to_owned(),
            width: 1024,
            height: 1024,
            format: TextureFormat::Depth32Float,
        });
        resources.clear();

        assert!(resources.texture(texture).is_err());
        assert_eq!(resources.counts(), ResourceCounts::default());
    }
}
