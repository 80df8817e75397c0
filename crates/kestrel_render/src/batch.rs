//! # Draw Batching
//!
//! Drawables sharing a mesh, a pipeline and material flags collapse into one
//! [`DrawBatch`]. Batches are indexed by [`MaterialFlags`] in a radix trie;
//! several batches may share one flag value (different meshes or
//! pipelines), and they accumulate in that key's bucket.

use bytemuck::{Pod, Zeroable};
use kestrel_core::{EntityId, Handle, MaskQuery, RadixTrie};

use crate::material::MaterialFlags;

/// Per-instance data uploaded to the instance buffer.
///
/// 80 bytes, 16-byte aligned rows.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    /// Column-major model matrix.
    pub model: [[f32; 4]; 4],
    /// Owning entity, for picking.
    pub entity: u32,
    padding: [u32; 3],
}

impl InstanceData {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates an instance.
    #[must_use]
    pub const fn new(model: [[f32; 4]; 4], entity: EntityId) -> Self {
        Self {
            model,
            entity,
            padding: [0; 3],
        }
    }
}

/// Instances drawn with one mesh and one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    /// Vertex buffer.
    pub mesh: Handle,
    /// Pipeline.
    pub pipeline: Handle,
    /// Batch key.
    pub flags: MaterialFlags,
    /// Instances in extraction order.
    pub instances: Vec<InstanceData>,
}

impl DrawBatch {
    /// Number of instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Instances as upload-ready bytes.
    #[must_use]
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Draw batches indexed by material flags.
#[derive(Debug)]
pub struct BatchIndex {
    batches: RadixTrie<MaterialFlags, DrawBatch>,
    instances: usize,
    /// Instances reserved in each new batch.
    batch_capacity: usize,
}

impl BatchIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new(batch_capacity: usize) -> Self {
        Self {
            batches: RadixTrie::new(),
            instances: 0,
            batch_capacity,
        }
    }

    /// Adds one instance, merging into the batch with the same flags, mesh
    /// and pipeline.
    ///
    /// Returns `true` if a new batch was started.
    pub fn push(&mut self, flags: MaterialFlags, mesh: Handle, pipeline: Handle, instance: InstanceData) -> bool {
        self.instances += 1;
        if let Some(bucket) = self.batches.get_mut(flags) {
            if let Some(batch) = bucket
                .iter_mut()
                .find(|batch| batch.mesh == mesh && batch.pipeline == pipeline)
            {
                batch.instances.push(instance);
                return false;
            }
        }

        let mut instances = Vec::with_capacity(self.batch_capacity.max(1));
        instances.push(instance);
        self.batches.add(
            flags,
            DrawBatch {
                mesh,
                pipeline,
                flags,
                instances,
            },
        );
        true
    }

    /// Batches whose flags satisfy `query`, in ascending flag order.
    #[must_use]
    pub fn batches(&self, query: &MaskQuery<MaterialFlags>) -> Vec<&DrawBatch> {
        self.batches.query(query)
    }

    /// Every batch, in ascending flag order.
    #[must_use]
    pub fn draw_order(&self) -> Vec<&DrawBatch> {
        self.batches(&MaskQuery::new())
    }

    /// Batches stored under exactly `flags`.
    #[must_use]
    pub fn batches_for(&self, flags: MaterialFlags) -> &[DrawBatch] {
        self.batches.get(flags).unwrap_or_default()
    }

    /// Drops every batch under exactly `flags`, returning how many there were.
    pub fn remove_flags(&mut self, flags: MaterialFlags) -> usize {
        let dropped: usize = self.batches_for(flags).iter().map(DrawBatch::instance_count).sum();
        self.instances -= dropped;
        self.batches.remove(flags)
    }

    /// Number of batches, one draw call each.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Number of instances across all batches.
    #[must_use]
    pub const fn instance_count(&self) -> usize {
        self.instances
    }

    /// Checks if no batch is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Drops every batch.
    pub fn clear(&mut self) {
        self.batches.clear();
        self.instances = 0;
    }
}

impl Default for BatchIndex {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(entity: EntityId) -> InstanceData {
        InstanceData::new([[0.0; 4]; 4], entity)
    }

    #[test]
    fn test_instance_layout() {
        assert_eq!(InstanceData::SIZE, 80);
        let batch = DrawBatch {
            mesh: Handle::new(0, 1),
            pipeline: Handle::new(0, 1),
            flags: MaterialFlags::OPAQUE,
            instances: vec![instance(1), instance(2)],
        };
        assert_eq!(batch.instance_bytes().len(), 160);
    }

    #[test]
    fn test_same_key_merges() {
        let mut index = BatchIndex::default();
        let mesh = Handle::new(0, 1);
        let pipeline = Handle::new(3, 1);

        assert!(index.push(MaterialFlags::OPAQUE, mesh, pipeline, instance(0)));
        assert!(!index.push(MaterialFlags::OPAQUE, mesh, pipeline, instance(1)));

        assert_eq!(index.batch_count(), 1);
        assert_eq!(index.instance_count(), 2);
        assert_eq!(index.batches_for(MaterialFlags::OPAQUE)[0].instance_count(), 2);
    }

    #[test]
    fn test_same_flags_different_mesh_accumulate() {
        let mut index = BatchIndex::default();
        let pipeline = Handle::new(0, 1);

        index.push(MaterialFlags::OPAQUE, Handle::new(0, 1), pipeline, instance(0));
        index.push(MaterialFlags::OPAQUE, Handle::new(1, 1), pipeline, instance(1));

        let bucket = index.batches_for(MaterialFlags::OPAQUE);
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].mesh, Handle::new(0, 1));
        assert_eq!(bucket[1].mesh, Handle::new(1, 1));
    }

    #[test]
    fn test_query_by_flags() {
        let mut index = BatchIndex::default();
        let handle = Handle::new(0, 1);
        let glass = MaterialFlags::TRANSPARENT | MaterialFlags::DOUBLE_SIDED;
        let neon = MaterialFlags::TRANSPARENT | MaterialFlags::EMISSIVE;
        let rock = MaterialFlags::OPAQUE | MaterialFlags::SHADOW_CASTER;

        index.push(neon, handle, handle, instance(0));
        index.push(glass, handle, handle, instance(1));
        index.push(rock, handle, handle, instance(2));

        let transparent = index.batches(&MaskQuery::new().with_all(MaterialFlags::TRANSPARENT));
        let flags: Vec<_> = transparent.iter().map(|batch| batch.flags).collect();
        assert_eq!(flags, vec![glass, neon]);

        let not_emissive = index.batches(&MaskQuery::new().without(MaterialFlags::EMISSIVE));
        assert_eq!(not_emissive.len(), 2);

        // Opaque first.
        assert_eq!(index.draw_order()[0].flags, rock);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut index = BatchIndex::default();
        let handle = Handle::new(0, 1);
        index.push(MaterialFlags::OPAQUE, handle, handle, instance(0));
        index.push(MaterialFlags::OPAQUE, handle, handle, instance(1));
        index.push(MaterialFlags::ALPHA_TEST, handle, handle, instance(2));

        assert_eq!(index.remove_flags(MaterialFlags::OPAQUE), 1);
        assert_eq!(index.remove_flags(MaterialFlags::OPAQUE), 0);
        assert_eq!(index.instance_count(), 1);

        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.instance_count(), 0);
    }
}
