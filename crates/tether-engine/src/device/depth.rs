use winit::dpi::PhysicalSize;

/// Depth attachment format used by every pass that draws into the surface.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Depth texture sized to the surface.
pub(crate) struct DepthTarget {
    texture: wgpu::Texture,
    size: PhysicalSize<u32>,
}

impl DepthTarget {
    pub(crate) fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tether depth"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self { texture, size }
    }

    /// Recreates the texture when `size` differs from the current one.
    pub(crate) fn ensure_size(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        if size == self.size || size.width == 0 || size.height == 0 {
            return;
        }
        *self = Self::new(device, size);
    }

    pub(crate) fn view(&self) -> wgpu::TextureView {
        self.texture
            .create_view(&wgpu::TextureViewDescriptor::default())
    }
}
