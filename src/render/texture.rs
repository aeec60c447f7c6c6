use std::{path::Path, sync::Arc};

use anyhow::Context;
use vulkano::{
    command_buffer::{
        AutoCommandBufferBuilder, CommandBufferUsage, PrimaryCommandBufferAbstract,
        allocator::StandardCommandBufferAllocator,
    },
    device::{Device, Queue},
    format::Format,
    image::{ImageDimensions, ImmutableImage, MipmapsCount, view::ImageView},
    memory::allocator::StandardMemoryAllocator,
    sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo},
    sync::GpuFuture,
};

/// Sampled color texture, bound to unit 0 of the sphere pipeline.
pub struct Texture {
    pub view: Arc<ImageView<ImmutableImage>>,
    pub sampler: Arc<Sampler>,
}

impl Texture {
    pub fn load(
        path: &Path,
        device: &Arc<Device>,
        queue: &Arc<Queue>,
        memory_allocator: &StandardMemoryAllocator,
        command_buffer_allocator: &StandardCommandBufferAllocator,
    ) -> anyhow::Result<Self> {
        let pixels = image::open(path)
            .with_context(|| format!("Failed to load texture {}", path.display()))?
            .to_rgba8();
        let (width, height) = pixels.dimensions();
        log::info!("Loaded texture {} ({width}x{height})", path.display());

        let mut uploads = AutoCommandBufferBuilder::primary(
            command_buffer_allocator,
            queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )?;

        let image = ImmutableImage::from_iter(
            memory_allocator,
            pixels.into_raw(),
            ImageDimensions::Dim2d {
                width,
                height,
                array_layers: 1,
            },
            MipmapsCount::One,
            Format::R8G8B8A8_SRGB,
            &mut uploads,
        )
        .context("Failed to create texture image")?;

        uploads
            .build()?
            .execute(queue.clone())?
            .then_signal_fence_and_flush()?
            .wait(None)
            .context("Texture upload did not complete")?;

        let sampler = Sampler::new(
            device.clone(),
            SamplerCreateInfo {
                mag_filter: Filter::Linear,
                min_filter: Filter::Linear,
                address_mode: [SamplerAddressMode::Repeat; 3],
                ..Default::default()
            },
        )?;

        Ok(Texture {
            view: ImageView::new_default(image)?,
            sampler,
        })
    }
}
