use wgpu::{
    BindGroup, BindGroupLayout, CompositeAlphaMode, Device, PresentMode, RenderPipeline, Surface,
    SurfaceConfiguration, Texture, TextureFormat, TextureView,
};

use super::gpu_context::GpuContext;
use crate::core::AlphaHandling;
use crate::error::{ManagerError, Result};

/// Blits window pixel buffers to a WebGPU surface
///
/// Each present uploads the whole RGBA buffer to a texture and draws it with a
/// fullscreen triangle, so a frame is either shown completely or not at all.
pub struct SurfaceRenderer {
    gpu: GpuContext,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    render_pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    texture: Texture,
    bind_group: BindGroup,
    alpha_handling: AlphaHandling,
    clear_color: wgpu::Color,
    width: u32,
    height: u32,
}

impl SurfaceRenderer {
    /// Configure `surface` at `width`x`height` (both at least 1)
    pub fn new(
        gpu: GpuContext,
        surface: Surface<'static>,
        width: u32,
        height: u32,
        transparent: bool,
        vsync: bool,
    ) -> Result<Self> {
        check_texture_size(width, height, gpu.device().limits().max_texture_dimension_2d)?;
        let caps = surface.get_capabilities(gpu.adapter());

        // Non-sRGB keeps channel values byte-exact on screen
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| ManagerError::Surface(String::from("surface reports no formats")))?;

        let (alpha_mode, alpha_handling) = choose_alpha_mode(&caps.alpha_modes, transparent);
        if transparent && alpha_handling == AlphaHandling::Opaque {
            log::warn!("compositor offers no alpha blending; transparent window drawn opaque");
        }

        let surface_config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: choose_present_mode(&caps.present_modes, vsync),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(gpu.device(), &surface_config);

        let bind_group_layout = Self::create_bind_group_layout(gpu.device());
        let render_pipeline =
            Self::create_render_pipeline(gpu.device(), &bind_group_layout, surface_format);
        let texture = Self::create_output_texture(gpu.device(), width, height);
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = Self::create_bind_group(gpu.device(), &bind_group_layout, &texture_view);

        Ok(Self {
            gpu,
            surface,
            surface_config,
            render_pipeline,
            bind_group_layout,
            texture,
            bind_group,
            alpha_handling,
            clear_color: if transparent {
                wgpu::Color::TRANSPARENT
            } else {
                wgpu::Color::BLACK
            },
            width,
            height,
        })
    }

    /// Render raw RGBA bytes, exactly `width * height * 4` of them
    pub fn render_pixels(&mut self, pixels: &[u8]) -> Result<()> {
        let expected_size = self.width as usize * self.height as usize * 4;
        if pixels.len() != expected_size {
            return Err(ManagerError::Present(format!(
                "invalid pixel buffer size: expected {} bytes, got {}",
                expected_size,
                pixels.len()
            )));
        }

        self.gpu.queue().write_texture(
            self.texture.as_image_copy(),
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                // Reconfigure so the next present succeeds
                self.surface.configure(self.gpu.device(), &self.surface_config);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.gpu.queue().submit(Some(encoder.finish()));
        surface_texture.present();

        Ok(())
    }

    /// Resize the surface and its backing texture
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Err(e) = check_texture_size(width, height, self.gpu.device().limits().max_texture_dimension_2d) {
            log::warn!("keeping {}x{} surface: {}", self.width, self.height, e);
            return;
        }

        self.width = width;
        self.height = height;
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(self.gpu.device(), &self.surface_config);

        self.texture = Self::create_output_texture(self.gpu.device(), width, height);
        let texture_view = self.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.bind_group =
            Self::create_bind_group(self.gpu.device(), &self.bind_group_layout, &texture_view);
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn alpha_handling(&self) -> AlphaHandling {
        self.alpha_handling
    }

    fn create_output_texture(device: &Device, width: u32, height: u32) -> Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Window Framebuffer Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Framebuffer Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        })
    }

    fn create_render_pipeline(
        device: &Device,
        bind_group_layout: &BindGroupLayout,
        surface_format: TextureFormat,
    ) -> RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Present Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("present.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Present Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Present Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_bind_group(
        device: &Device,
        layout: &BindGroupLayout,
        texture_view: &TextureView,
    ) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Framebuffer Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(texture_view),
            }],
        })
    }
}

/// Pick the compositor alpha mode and how pixels must be prepared for it
pub fn choose_alpha_mode(
    supported: &[CompositeAlphaMode],
    transparent: bool,
) -> (CompositeAlphaMode, AlphaHandling) {
    let fallback = supported.first().copied().unwrap_or(CompositeAlphaMode::Auto);
    if !transparent {
        let mode = if supported.contains(&CompositeAlphaMode::Opaque) {
            CompositeAlphaMode::Opaque
        } else {
            fallback
        };
        return (mode, AlphaHandling::Opaque);
    }

    if supported.contains(&CompositeAlphaMode::PostMultiplied) {
        (CompositeAlphaMode::PostMultiplied, AlphaHandling::Straight)
    } else if supported.contains(&CompositeAlphaMode::PreMultiplied) {
        (CompositeAlphaMode::PreMultiplied, AlphaHandling::Premultiplied)
    } else {
        (fallback, AlphaHandling::Opaque)
    }
}

/// Refuse sizes the device cannot back with a single texture
pub fn check_texture_size(width: u32, height: u32, limit: u32) -> Result<()> {
    if width > limit || height > limit {
        return Err(ManagerError::WindowCreation(format!(
            "{}x{} exceeds the device texture limit of {}",
            width, height, limit
        )));
    }
    Ok(())
}

/// Fifo when vsync is wanted, otherwise the lowest-latency mode available
pub fn choose_present_mode(supported: &[PresentMode], vsync: bool) -> PresentMode {
    if vsync {
        return PresentMode::Fifo;
    }
    [PresentMode::Mailbox, PresentMode::Immediate]
        .into_iter()
        .find(|mode| supported.contains(mode))
        .unwrap_or(PresentMode::Fifo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_size_within_limit() {
        assert!(check_texture_size(8192, 1, 8192).is_ok());
        assert!(check_texture_size(1, 1, 1).is_ok());
    }

    #[test]
    fn test_texture_size_over_limit() {
        let err = check_texture_size(8193, 10, 8192).unwrap_err();
        assert!(matches!(err, ManagerError::WindowCreation(_)));
        assert!(check_texture_size(10, u32::MAX, 8192).is_err());
    }

    #[test]
    fn test_opaque_prefers_opaque_mode() {
        let modes = [CompositeAlphaMode::PreMultiplied, CompositeAlphaMode::Opaque];
        assert_eq!(
            choose_alpha_mode(&modes, false),
            (CompositeAlphaMode::Opaque, AlphaHandling::Opaque)
        );
    }

    #[test]
    fn test_opaque_falls_back_to_first_mode() {
        let modes = [CompositeAlphaMode::Inherit];
        assert_eq!(
            choose_alpha_mode(&modes, false),
            (CompositeAlphaMode::Inherit, AlphaHandling::Opaque)
        );
    }

    #[test]
    fn test_transparent_prefers_post_multiplied() {
        let modes = [
            CompositeAlphaMode::Opaque,
            CompositeAlphaMode::PreMultiplied,
            CompositeAlphaMode::PostMultiplied,
        ];
        assert_eq!(
            choose_alpha_mode(&modes, true),
            (CompositeAlphaMode::PostMultiplied, AlphaHandling::Straight)
        );
    }

    #[test]
    fn test_transparent_premultiplied_fallback() {
        let modes = [CompositeAlphaMode::Opaque, CompositeAlphaMode::PreMultiplied];
        assert_eq!(
            choose_alpha_mode(&modes, true),
            (CompositeAlphaMode::PreMultiplied, AlphaHandling::Premultiplied)
        );
    }

    #[test]
    fn test_transparent_without_support_is_opaque() {
        let modes = [CompositeAlphaMode::Opaque];
        assert_eq!(
            choose_alpha_mode(&modes, true),
            (CompositeAlphaMode::Opaque, AlphaHandling::Opaque)
        );
    }

    #[test]
    fn test_present_mode_vsync() {
        let modes = [PresentMode::Immediate, PresentMode::Fifo];
        assert_eq!(choose_present_mode(&modes, true), PresentMode::Fifo);
    }

    #[test]
    fn test_present_mode_low_latency() {
        assert_eq!(
            choose_present_mode(&[PresentMode::Fifo, PresentMode::Immediate], false),
            PresentMode::Immediate
        );
        assert_eq!(
            choose_present_mode(&[PresentMode::Mailbox, PresentMode::Immediate], false),
            PresentMode::Mailbox
        );
        assert_eq!(choose_present_mode(&[PresentMode::Fifo], false), PresentMode::Fifo);
    }
}
