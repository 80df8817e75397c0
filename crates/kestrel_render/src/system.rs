//! # Render System
//!
//! Runs after the ordered systems each frame. Extraction:
//!
//! 1. query committed entities having Transform + `MeshRef` + `MaterialRef`
//!    (or the configured mask), excluding `Hidden` when it is registered
//! 2. skip entities whose mesh or pipeline handle went stale
//! 3. fold the rest into draw batches keyed by material flags
//!
//! Submission of the batches is left to the GPU backend.

use kestrel_core::{CoreResult, Entity, MaskQuery, System, World};

use crate::batch::{BatchIndex, InstanceData};
use crate::components::{Hidden, MaterialRef, MeshRef, Transform};
use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::resources::GpuResources;

/// Statistics from one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Entities matched by the drawable query.
    pub drawables: usize,
    /// Batches built, one draw call each.
    pub draw_calls: usize,
    /// Instances across all batches.
    pub instances: usize,
    /// Entities skipped because a resource handle was stale.
    pub skipped_stale: usize,
    /// Entities skipped because a render component had no value.
    pub skipped_incomplete: usize,
}

/// Extracts drawable entities into draw batches.
#[derive(Debug)]
pub struct RenderSystem {
    config: RenderConfig,
    resources: GpuResources,
    batches: BatchIndex,
    stats: FrameStats,
    frames: u64,
}

impl RenderSystem {
    /// Creates a render system with empty resource pools.
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self {
            resources: GpuResources::new(config.initial_resource_capacity),
            batches: BatchIndex::new(config.initial_batch_capacity),
            stats: FrameStats::default(),
            frames: 0,
            config,
        }
    }

    /// Registers the render component types on `world`.
    ///
    /// # Errors
    ///
    /// Fails once all 64 component bits are taken.
    pub fn register_components(world: &mut World) -> CoreResult<()> {
        world.register_component::<Transform>()?;
        world.register_component::<MeshRef>()?;
        world.register_component::<MaterialRef>()?;
        world.register_component::<Hidden>()?;
        Ok(())
    }

    /// GPU resources.
    #[must_use]
    pub fn resources(&self) -> &GpuResources {
        &self.resources
    }

    /// GPU resources, mutably.
    pub fn resources_mut(&mut self) -> &mut GpuResources {
        &mut self.resources
    }

    /// Batches from the last extraction.
    #[must_use]
    pub fn batches(&self) -> &BatchIndex {
        &self.batches
    }

    /// Statistics from the last extraction.
    #[must_use]
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Number of extractions run.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// The drawable query for `world`.
    ///
    /// # Errors
    ///
    /// Fails if the render components are not registered and no mask
    /// override is configured.
    pub fn drawable_query(&self, world: &World) -> CoreResult<MaskQuery<u64>> {
        let mask = match self.config.render_mask {
            Some(mask) => mask,
            None => world.mask::<(Transform, MeshRef, MaterialRef)>()?,
        };
        let query = MaskQuery::new().with_all(mask);
        Ok(match world.bit::<Hidden>() {
            Ok(hidden) => query.without(hidden),
            Err(_) => query,
        })
    }

    /// Rebuilds the draw batches from `world`.
    ///
    /// # Errors
    ///
    /// Fails if a render component type is not registered.
    pub fn extract(&mut self, world: &World) -> RenderResult<FrameStats> {
        let query = self.drawable_query(world)?;
        let drawables = world.get_entities(&query);

        self.batches.clear();
        let mut stats = FrameStats {
            drawables: drawables.len(),
            ..FrameStats::default()
        };

        for entity in &drawables {
            match self.instance_of(world, *entity) {
                Ok((material, mesh, instance)) => {
                    self.batches.push(material.flags, mesh.0, material.pipeline, instance);
                }
                Err(RenderError::StaleResource { kind, source }) => {
                    tracing::warn!(id = entity.id, kind, %source, "skipping drawable with stale handle");
                    stats.skipped_stale += 1;
                }
                Err(RenderError::MissingComponent { component, .. }) => {
                    tracing::trace!(id = entity.id, component, "skipping incomplete drawable");
                    stats.skipped_incomplete += 1;
                }
                Err(error) => return Err(error),
            }
        }

        stats.draw_calls = self.batches.batch_count();
        stats.instances = self.batches.instance_count();
        self.stats = stats;
        self.frames += 1;

        tracing::debug!(
            drawables = stats.drawables,
            draw_calls = stats.draw_calls,
            instances = stats.instances,
            "extracted draw batches"
        );
        Ok(stats)
    }

    fn instance_of(&self, world: &World, entity: Entity) -> RenderResult<(MaterialRef, MeshRef, InstanceData)> {
        let missing = |component| RenderError::MissingComponent {
            entity: entity.id,
            component,
        };
        let transform = world
            .component::<Transform>(entity.id)?
            .ok_or_else(|| missing("Transform"))?;
        let mesh = *world
            .component::<MeshRef>(entity.id)?
            .ok_or_else(|| missing("MeshRef"))?;
        let material = *world
            .component::<MaterialRef>(entity.id)?
            .ok_or_else(|| missing("MaterialRef"))?;

        self.resources.buffer(mesh.0)?;
        self.resources.pipeline(material.pipeline)?;

        Ok((material, mesh, InstanceData::new(transform.matrix(), entity.id)))
    }
}

impl Default for RenderSystem {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl System for RenderSystem {
    fn name(&self) -> &str {
        "render"
    }

    fn update(&mut self, world: &mut World, _dt: f32) -> CoreResult<()> {
        match self.extract(world) {
            Ok(_) => Ok(()),
            Err(RenderError::Core(error)) => Err(error),
            Err(error) => {
                // Only core failures abort the frame.
                tracing::error!(%error, "render extraction failed");
                Ok(())
            }
        }
    }
}
