pub mod mesh_buffers;
pub mod texture;

use std::{mem, path::Path, sync::Arc};

use anyhow::{Context, anyhow};
use vulkano::{
    VulkanLibrary,
    buffer::{BufferUsage, CpuAccessibleBuffer, TypedBufferAccess},
    command_buffer::{
        AutoCommandBufferBuilder, CommandBufferUsage, PrimaryAutoCommandBuffer,
        RenderPassBeginInfo, SubpassContents, allocator::StandardCommandBufferAllocator,
    },
    descriptor_set::{
        PersistentDescriptorSet, WriteDescriptorSet, allocator::StandardDescriptorSetAllocator,
    },
    device::{
        Device, DeviceCreateInfo, DeviceExtensions, Features, Queue, QueueCreateInfo,
        physical::PhysicalDeviceType,
    },
    format::Format,
    image::{AttachmentImage, ImageAccess, ImageUsage, SwapchainImage, view::ImageView},
    instance::{Instance, InstanceCreateInfo},
    memory::allocator::StandardMemoryAllocator,
    pipeline::{
        GraphicsPipeline, Pipeline, PipelineBindPoint,
        graphics::{
            depth_stencil::DepthStencilState,
            input_assembly::InputAssemblyState,
            rasterization::{CullMode, FrontFace, PolygonMode, RasterizationState},
            vertex_input::BuffersDefinition,
            viewport::{Viewport, ViewportState},
        },
    },
    render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
    shader::ShaderModule,
    swapchain::{
        self, AcquireError, PresentMode, Surface, Swapchain, SwapchainAcquireFuture,
        SwapchainCreateInfo, SwapchainCreationError, SwapchainPresentInfo,
    },
    sync::{self, FlushError, GpuFuture},
};
use vulkano_win::VkSurfaceBuild;
use winit::{
    dpi::LogicalSize,
    event_loop::EventLoop,
    window::{Window, WindowBuilder},
};

use crate::config::WindowConfig;
use crate::engine::{FrameTransforms, RasterMode, SphereMesh};
use mesh_buffers::{MeshBuffers, NormalAttribute, PositionAttribute, TexCoordAttribute};
use texture::Texture;

vulkano::impl_vertex!(PositionAttribute, position);
vulkano::impl_vertex!(NormalAttribute, normal);
vulkano::impl_vertex!(TexCoordAttribute, uv);

mod sphere_vert {
    vulkano_shaders::shader! {
        ty: "vertex",
        path: "src/render/shaders/sphere.vert",
        types_meta: {
            use bytemuck::{Pod, Zeroable};

            #[derive(Clone, Copy, Zeroable, Pod)]
        },
    }
}

mod sphere_frag {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "src/render/shaders/sphere.frag",
    }
}

fn get_window(surface: &Arc<Surface>) -> &Window {
    surface
        .object()
        .and_then(|object| object.downcast_ref::<Window>())
        .expect("surface is always built from a winit window")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderStage {
    Stopped,
    Render,
    NeedsRedraw,
}

/// One pipeline per raster mode; line variants exist only when the device
/// can rasterize polygons as lines.
struct Pipelines {
    fill: Arc<GraphicsPipeline>,
    fill_culled: Arc<GraphicsPipeline>,
    line: Option<(Arc<GraphicsPipeline>, Arc<GraphicsPipeline>)>,
}

impl Pipelines {
    fn get(&self, mode: RasterMode) -> &Arc<GraphicsPipeline> {
        match (&self.line, mode.wireframe, mode.cull_back_faces) {
            (Some((line, _)), true, false) => line,
            (Some((_, line_culled)), true, true) => line_culled,
            (_, _, true) => &self.fill_culled,
            (_, _, false) => &self.fill,
        }
    }
}

fn build_pipeline(
    device: &Arc<Device>,
    vs: &Arc<ShaderModule>,
    fs: &Arc<ShaderModule>,
    subpass: Subpass,
    mode: RasterMode,
) -> anyhow::Result<Arc<GraphicsPipeline>> {
    let cull_mode = if mode.cull_back_faces {
        CullMode::Back
    } else {
        CullMode::None
    };
    let polygon_mode = if mode.wireframe {
        PolygonMode::Line
    } else {
        PolygonMode::Fill
    };

    let pipeline = GraphicsPipeline::start()
        .vertex_input_state(
            BuffersDefinition::new()
                .vertex::<PositionAttribute>()
                .vertex::<NormalAttribute>()
                .vertex::<TexCoordAttribute>(),
        )
        .vertex_shader(
            vs.entry_point("main")
                .context("vertex shader has no main entry point")?,
            (),
        )
        .input_assembly_state(InputAssemblyState::new())
        .viewport_state(ViewportState::viewport_dynamic_scissor_irrelevant())
        .fragment_shader(
            fs.entry_point("main")
                .context("fragment shader has no main entry point")?,
            (),
        )
        .depth_stencil_state(DepthStencilState::simple_depth_test())
        .rasterization_state(
            RasterizationState::new()
                .cull_mode(cull_mode)
                // Outward faces are CCW; the Y flip in the projection keeps them CCW
                .front_face(FrontFace::CounterClockwise)
                .polygon_mode(polygon_mode),
        )
        .render_pass(subpass)
        .build(device.clone())
        .with_context(|| format!("Failed to build pipeline for {mode:?}"))?;

    Ok(pipeline)
}

pub struct Render {
    pub device: Arc<Device>,
    pub aspect_ratio: f32,

    surface: Arc<Surface>,
    queue: Arc<Queue>,
    swapchain: Arc<Swapchain>,
    memory_allocator: Arc<StandardMemoryAllocator>,
    command_buffer_allocator: StandardCommandBufferAllocator,
    descriptor_set_allocator: StandardDescriptorSetAllocator,
    render_pass: Arc<RenderPass>,
    pipelines: Pipelines,
    viewport: Viewport,
    framebuffers: Vec<Arc<Framebuffer>>,
    render_stage: RenderStage,
    commands: Option<AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>>,
    image_index: u32,
    acquire_future: Option<SwapchainAcquireFuture>,

    texture: Texture,
    warned_no_wireframe: bool,
}

impl Render {
    pub fn new(
        event_loop: &EventLoop<()>,
        window_config: &WindowConfig,
        texture_path: &Path,
    ) -> anyhow::Result<Render> {
        let instance = {
            let library = VulkanLibrary::new().context("Failed to load the Vulkan library")?;
            let extensions = vulkano_win::required_extensions(&library);

            Instance::new(
                library,
                InstanceCreateInfo {
                    enabled_extensions: extensions,
                    enumerate_portability: true,
                    max_api_version: Some(vulkano::Version::V1_1),
                    ..Default::default()
                },
            )
            .context("Failed to create a Vulkan instance")?
        };

        let surface = WindowBuilder::new()
            .with_title(window_config.title.clone())
            .with_inner_size(LogicalSize::new(window_config.width, window_config.height))
            .build_vk_surface(event_loop, instance.clone())
            .context("Failed to create the window")?;

        let device_extensions = DeviceExtensions {
            khr_swapchain: true,
            ..DeviceExtensions::empty()
        };

        let (physical_device, queue_family_index) = instance
            .enumerate_physical_devices()?
            .filter(|p| p.supported_extensions().contains(&device_extensions))
            .filter_map(|p| {
                p.queue_family_properties()
                    .iter()
                    .enumerate()
                    .position(|(i, q)| {
                        q.queue_flags.graphics
                            && p.surface_support(i as u32, &surface).unwrap_or(false)
                    })
                    .map(|i| (p, i as u32))
            })
            .min_by_key(|(p, _)| match p.properties().device_type {
                PhysicalDeviceType::DiscreteGpu => 0,
                PhysicalDeviceType::IntegratedGpu => 1,
                PhysicalDeviceType::VirtualGpu => 2,
                PhysicalDeviceType::Cpu => 3,
                PhysicalDeviceType::Other => 4,
                _ => 5,
            })
            .ok_or_else(|| anyhow!("No suitable physical device found"))?;

        log::info!(
            "Using device: {} ({:?})",
            physical_device.properties().device_name,
            physical_device.properties().device_type,
        );

        let wireframe_supported = physical_device.supported_features().fill_mode_non_solid;
        let (device, mut queues) = Device::new(
            physical_device,
            DeviceCreateInfo {
                enabled_extensions: device_extensions,
                enabled_features: Features {
                    fill_mode_non_solid: wireframe_supported,
                    ..Features::empty()
                },
                queue_create_infos: vec![QueueCreateInfo {
                    queue_family_index,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .context("Failed to create a logical device")?;

        let queue = queues
            .next()
            .ok_or_else(|| anyhow!("Device returned no queues"))?;

        let (swapchain, images) = {
            let caps = device
                .physical_device()
                .surface_capabilities(&surface, Default::default())?;

            let alpha = caps
                .supported_composite_alpha
                .iter()
                .next()
                .ok_or_else(|| anyhow!("Surface supports no composite alpha mode"))?;

            let image_format = device
                .physical_device()
                .surface_formats(&surface, Default::default())?
                .first()
                .map(|(format, _)| *format)
                .ok_or_else(|| anyhow!("Surface reports no formats"))?;

            let image_extent: [u32; 2] = get_window(&surface).inner_size().into();

            // FIFO waits for vblank and is always available
            let present_mode = if window_config.vsync {
                PresentMode::Fifo
            } else {
                device
                    .physical_device()
                    .surface_present_modes(&surface)?
                    .find(|&mode| mode == PresentMode::Mailbox)
                    .unwrap_or(PresentMode::Fifo)
            };

            Swapchain::new(
                device.clone(),
                surface.clone(),
                SwapchainCreateInfo {
                    min_image_count: caps.min_image_count,
                    image_format: Some(image_format),
                    image_extent,
                    present_mode,
                    image_usage: ImageUsage {
                        color_attachment: true,
                        ..ImageUsage::empty()
                    },
                    composite_alpha: alpha,
                    ..Default::default()
                },
            )
            .context("Failed to create the swapchain")?
        };

        let render_pass = vulkano::ordered_passes_renderpass!(device.clone(),
            attachments: {
                final_color: {
                    load: Clear,
                    store: Store,
                    format: swapchain.image_format(),
                    samples: 1,
                },
                depth: {
                    load: Clear,
                    store: DontCare,
                    format: Format::D16_UNORM,
                    samples: 1,
                }
            },
            passes: [
                {
                    color: [final_color],
                    depth_stencil: {depth},
                    input: []
                }
            ]
        )
        .context("Failed to create the render pass")?;

        let vs = sphere_vert::load(device.clone()).context("Failed to load vertex shader")?;
        let fs = sphere_frag::load(device.clone()).context("Failed to load fragment shader")?;
        let subpass = || {
            Subpass::from(render_pass.clone(), 0).ok_or_else(|| anyhow!("Render pass has no subpass 0"))
        };

        let fill_mode = |cull_back_faces| RasterMode {
            cull_back_faces,
            wireframe: false,
        };
        let line_mode = |cull_back_faces| RasterMode {
            cull_back_faces,
            wireframe: true,
        };
        let pipelines = Pipelines {
            fill: build_pipeline(&device, &vs, &fs, subpass()?, fill_mode(false))?,
            fill_culled: build_pipeline(&device, &vs, &fs, subpass()?, fill_mode(true))?,
            line: if wireframe_supported {
                Some((
                    build_pipeline(&device, &vs, &fs, subpass()?, line_mode(false))?,
                    build_pipeline(&device, &vs, &fs, subpass()?, line_mode(true))?,
                ))
            } else {
                log::warn!("Device cannot draw wireframes, the wireframe toggle is disabled");
                None
            },
        };

        let memory_allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));
        let mut viewport = Viewport {
            origin: [0.0, 0.0],
            dimensions: [0.0, 0.0],
            depth_range: 0.0..1.0,
        };

        let framebuffers = Render::window_size_dependent_setup(
            &memory_allocator,
            &images,
            render_pass.clone(),
            &mut viewport,
        )?;

        let descriptor_set_allocator = StandardDescriptorSetAllocator::new(device.clone());
        let command_buffer_allocator =
            StandardCommandBufferAllocator::new(device.clone(), Default::default());

        let texture = Texture::load(
            texture_path,
            &device,
            &queue,
            &memory_allocator,
            &command_buffer_allocator,
        )?;

        let aspect_ratio = {
            let size = get_window(&surface).inner_size();
            size.width as f32 / size.height.max(1) as f32
        };

        Ok(Render {
            surface,
            device,
            queue,
            swapchain,
            memory_allocator,
            descriptor_set_allocator,
            command_buffer_allocator,
            render_pass,
            pipelines,
            viewport,
            framebuffers,
            render_stage: RenderStage::Stopped,
            commands: None,
            image_index: 0,
            acquire_future: None,

            texture,
            aspect_ratio,
            warned_no_wireframe: false,
        })
    }

    pub fn window(&self) -> &Window {
        get_window(&self.surface)
    }

    pub fn upload_mesh(&self, mesh: &SphereMesh) -> anyhow::Result<MeshBuffers> {
        MeshBuffers::new(mesh, &self.memory_allocator)
    }

    pub fn recreate_swapchain(&mut self) {
        self.render_stage = RenderStage::NeedsRedraw;
        self.commands = None;

        let size = self.window().inner_size();
        let image_extent: [u32; 2] = size.into();
        if image_extent[0] == 0 || image_extent[1] == 0 {
            return;
        }

        let (new_swapchain, new_images) = match self.swapchain.recreate(SwapchainCreateInfo {
            image_extent,
            ..self.swapchain.create_info()
        }) {
            Ok(r) => r,
            Err(SwapchainCreationError::ImageExtentNotSupported { .. }) => return,
            Err(e) => {
                log::error!("Failed to recreate swapchain: {e}");
                return;
            }
        };

        let new_framebuffers = match Render::window_size_dependent_setup(
            &self.memory_allocator,
            &new_images,
            self.render_pass.clone(),
            &mut self.viewport,
        ) {
            Ok(framebuffers) => framebuffers,
            Err(e) => {
                log::error!("Failed to rebuild framebuffers: {e:#}");
                return;
            }
        };

        self.swapchain = new_swapchain;
        self.framebuffers = new_framebuffers;
        self.render_stage = RenderStage::Stopped;
        self.aspect_ratio = size.width as f32 / size.height as f32;
    }

    fn window_size_dependent_setup(
        allocator: &StandardMemoryAllocator,
        images: &[Arc<SwapchainImage>],
        render_pass: Arc<RenderPass>,
        viewport: &mut Viewport,
    ) -> anyhow::Result<Vec<Arc<Framebuffer>>> {
        let dimensions = images
            .first()
            .ok_or_else(|| anyhow!("Swapchain has no images"))?
            .dimensions()
            .width_height();
        viewport.dimensions = [dimensions[0] as f32, dimensions[1] as f32];

        let depth_buffer = ImageView::new_default(AttachmentImage::transient(
            allocator,
            dimensions,
            Format::D16_UNORM,
        )?)?;

        images
            .iter()
            .map(|image| -> anyhow::Result<Arc<Framebuffer>> {
                let view = ImageView::new_default(image.clone())?;
                let framebuffer = Framebuffer::new(
                    render_pass.clone(),
                    FramebufferCreateInfo {
                        attachments: vec![view, depth_buffer.clone()],
                        ..Default::default()
                    },
                )?;
                Ok(framebuffer)
            })
            .collect()
    }

    fn check_stage(&mut self, expected: RenderStage) -> bool {
        if self.render_stage == expected {
            return true;
        }

        if self.render_stage == RenderStage::NeedsRedraw {
            self.recreate_swapchain();
        }
        self.render_stage = RenderStage::Stopped;
        self.commands = None;
        false
    }

    /// Acquires the next image and begins the render pass, clearing color
    /// and depth.
    pub fn start(&mut self) {
        if !self.check_stage(RenderStage::Stopped) {
            return;
        }
        self.render_stage = RenderStage::Render;

        let (image_index, suboptimal, acquire_future) =
            match swapchain::acquire_next_image(self.swapchain.clone(), None) {
                Ok(r) => r,
                Err(AcquireError::OutOfDate) => {
                    self.recreate_swapchain();
                    return;
                }
                Err(e) => {
                    log::error!("Failed to acquire swapchain image: {e}");
                    self.render_stage = RenderStage::Stopped;
                    return;
                }
            };

        if suboptimal {
            self.recreate_swapchain();
            return;
        }

        let clear_values = vec![Some([0.0, 0.0, 0.0, 1.0].into()), Some(1.0.into())];

        let mut commands = match AutoCommandBufferBuilder::primary(
            &self.command_buffer_allocator,
            self.queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        ) {
            Ok(commands) => commands,
            Err(e) => {
                log::error!("Failed to allocate command buffer: {e}");
                self.render_stage = RenderStage::Stopped;
                return;
            }
        };

        if let Err(e) = commands.begin_render_pass(
            RenderPassBeginInfo {
                clear_values,
                ..RenderPassBeginInfo::framebuffer(self.framebuffers[image_index as usize].clone())
            },
            SubpassContents::Inline,
        ) {
            log::error!("Failed to begin render pass: {e}");
            self.render_stage = RenderStage::Stopped;
            return;
        }

        self.commands = Some(commands);
        self.image_index = image_index;
        self.acquire_future = Some(acquire_future);
    }

    /// Records one indexed draw of the sphere with this frame's matrices.
    pub fn draw(&mut self, mesh: &MeshBuffers, transforms: &FrameTransforms, mode: RasterMode) {
        if !self.check_stage(RenderStage::Render) {
            return;
        }

        if mode.wireframe && self.pipelines.line.is_none() && !self.warned_no_wireframe {
            log::warn!("Wireframe requested but not supported by this device");
            self.warned_no_wireframe = true;
        }
        let pipeline = self.pipelines.get(mode).clone();

        let uniforms = match CpuAccessibleBuffer::from_data(
            &*self.memory_allocator,
            BufferUsage {
                uniform_buffer: true,
                ..BufferUsage::empty()
            },
            false,
            sphere_vert::ty::Transforms {
                proj: transforms.projection.into(),
                model_view: transforms.model_view.into(),
                normal_matrix: transforms.normal.into(),
            },
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                log::error!("Failed to allocate transform uniforms: {e}");
                return;
            }
        };

        let Some(layout) = pipeline.layout().set_layouts().first() else {
            log::error!("Sphere pipeline has no descriptor set layout");
            return;
        };
        let set = match PersistentDescriptorSet::new(
            &self.descriptor_set_allocator,
            layout.clone(),
            [
                WriteDescriptorSet::buffer(0, uniforms),
                WriteDescriptorSet::image_view_sampler(
                    1,
                    self.texture.view.clone(),
                    self.texture.sampler.clone(),
                ),
            ],
        ) {
            Ok(set) => set,
            Err(e) => {
                log::error!("Failed to create descriptor set: {e}");
                return;
            }
        };

        let Some(commands) = self.commands.as_mut() else {
            return;
        };
        let result = commands
            .set_viewport(0, [self.viewport.clone()])
            .bind_pipeline_graphics(pipeline.clone())
            .bind_descriptor_sets(
                PipelineBindPoint::Graphics,
                pipeline.layout().clone(),
                0,
                set,
            )
            .bind_vertex_buffers(
                0,
                (
                    mesh.positions.clone(),
                    mesh.normals.clone(),
                    mesh.tex_coords.clone(),
                ),
            )
            .bind_index_buffer(mesh.indices.clone())
            .draw_indexed(mesh.indices.len() as u32, 1, 0, 0, 0);

        if let Err(e) = result {
            log::error!("Failed to record draw: {e}");
        }
    }

    pub fn finish(&mut self, previous_frame_end: &mut Option<Box<dyn GpuFuture>>) {
        if !self.check_stage(RenderStage::Render) {
            return;
        }

        let (Some(mut commands), Some(af)) = (self.commands.take(), self.acquire_future.take())
        else {
            self.render_stage = RenderStage::Stopped;
            return;
        };

        if let Err(e) = commands.end_render_pass() {
            log::error!("Failed to end render pass: {e}");
            self.render_stage = RenderStage::Stopped;
            return;
        }
        let command_buffer = match commands.build() {
            Ok(command_buffer) => command_buffer,
            Err(e) => {
                log::error!("Failed to build command buffer: {e}");
                self.render_stage = RenderStage::Stopped;
                return;
            }
        };

        let mut local_future: Option<Box<dyn GpuFuture>> =
            Some(Box::new(sync::now(self.device.clone())) as Box<dyn GpuFuture>);

        mem::swap(&mut local_future, previous_frame_end);

        let previous = local_future
            .take()
            .unwrap_or_else(|| Box::new(sync::now(self.device.clone())) as Box<dyn GpuFuture>);

        let future = match previous
            .join(af)
            .then_execute(self.queue.clone(), command_buffer)
        {
            Ok(future) => future
                .then_swapchain_present(
                    self.queue.clone(),
                    SwapchainPresentInfo::swapchain_image_index(
                        self.swapchain.clone(),
                        self.image_index,
                    ),
                )
                .then_signal_fence_and_flush(),
            Err(e) => {
                log::error!("Failed to submit frame: {e}");
                *previous_frame_end = Some(Box::new(sync::now(self.device.clone())) as Box<_>);
                self.render_stage = RenderStage::Stopped;
                return;
            }
        };

        match future {
            Ok(future) => {
                *previous_frame_end = Some(Box::new(future) as Box<_>);
            }
            Err(FlushError::OutOfDate) => {
                self.recreate_swapchain();
                *previous_frame_end = Some(Box::new(sync::now(self.device.clone())) as Box<_>);
            }
            Err(e) => {
                log::error!("Failed to flush future: {e}");
                *previous_frame_end = Some(Box::new(sync::now(self.device.clone())) as Box<_>);
            }
        }

        self.commands = None;
        self.render_stage = RenderStage::Stopped;
    }
}
