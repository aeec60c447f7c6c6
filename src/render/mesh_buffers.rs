use std::sync::Arc;

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use vulkano::{
    buffer::{BufferUsage, CpuAccessibleBuffer},
    memory::allocator::StandardMemoryAllocator,
};

use crate::engine::SphereMesh;

// One struct per vertex binding; field names match the shader inputs.

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
pub struct PositionAttribute {
    pub position: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
pub struct NormalAttribute {
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
pub struct TexCoordAttribute {
    pub uv: [f32; 2],
}

/// Device copies of the sphere. Written once at startup, read-only after.
pub struct MeshBuffers {
    pub positions: Arc<CpuAccessibleBuffer<[PositionAttribute]>>,
    pub normals: Arc<CpuAccessibleBuffer<[NormalAttribute]>>,
    pub tex_coords: Arc<CpuAccessibleBuffer<[TexCoordAttribute]>>,
    pub indices: Arc<CpuAccessibleBuffer<[u32]>>,
}

fn vertex_usage() -> BufferUsage {
    BufferUsage {
        vertex_buffer: true,
        ..BufferUsage::empty()
    }
}

impl MeshBuffers {
    pub fn new(mesh: &SphereMesh, memory_allocator: &StandardMemoryAllocator) -> anyhow::Result<Self> {
        let positions = CpuAccessibleBuffer::from_iter(
            memory_allocator,
            vertex_usage(),
            false,
            mesh.positions
                .iter()
                .map(|&position| PositionAttribute { position }),
        )
        .context("Failed to upload positions")?;

        let normals = CpuAccessibleBuffer::from_iter(
            memory_allocator,
            vertex_usage(),
            false,
            mesh.normals.iter().map(|&normal| NormalAttribute { normal }),
        )
        .context("Failed to upload normals")?;

        let tex_coords = CpuAccessibleBuffer::from_iter(
            memory_allocator,
            vertex_usage(),
            false,
            mesh.tex_coords.iter().map(|&uv| TexCoordAttribute { uv }),
        )
        .context("Failed to upload texture coordinates")?;

        let indices = CpuAccessibleBuffer::from_iter(
            memory_allocator,
            BufferUsage {
                index_buffer: true,
                ..BufferUsage::empty()
            },
            false,
            mesh.indices.iter().cloned(),
        )
        .context("Failed to upload indices")?;

        Ok(MeshBuffers {
            positions,
            normals,
            tex_coords,
            indices,
        })
    }
}
