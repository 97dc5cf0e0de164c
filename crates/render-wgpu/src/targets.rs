use sdfray_render::{TargetPool, TemporaryTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRole {
    /// `_Result`: written by the kernel, read by the composite pass.
    Color,
    /// `_Depth`: linear depth the kernel stops marching at.
    Depth,
}

impl TargetRole {
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            Self::Color => wgpu::TextureFormat::Rgba8Unorm,
            Self::Depth => wgpu::TextureFormat::R32Float,
        }
    }

    fn usage(self) -> wgpu::TextureUsages {
        match self {
            Self::Color => wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            Self::Depth => {
                wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_DST
            }
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Color => "raymarch_result",
            Self::Depth => "raymarch_depth",
        }
    }
}

/// Pool key for a temporary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    pub role: TargetRole,
    pub width: u32,
    pub height: u32,
}

impl TargetDesc {
    /// Whether a texture with these properties can be copied into a target
    /// of this description: same format, at least as large, and `COPY_SRC`.
    pub fn accepts_copy_from(
        &self,
        format: wgpu::TextureFormat,
        size: wgpu::Extent3d,
        usage: wgpu::TextureUsages,
    ) -> bool {
        let extent = self.extent();
        format == self.role.format()
            && size.width >= extent.width
            && size.height >= extent.height
            && usage.contains(wgpu::TextureUsages::COPY_SRC)
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width.max(1),
            height: self.height.max(1),
            depth_or_array_layers: 1,
        }
    }
}

pub struct PooledTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

pub type GpuTargetPool = TargetPool<TargetDesc, PooledTexture>;
pub type GpuTarget = TemporaryTarget<TargetDesc, PooledTexture>;

pub fn acquire(pool: &GpuTargetPool, device: &wgpu::Device, desc: TargetDesc) -> GpuTarget {
    pool.acquire(desc, |desc| {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.role.label()),
            size: desc.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.role.format(),
            usage: desc.role.usage(),
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        PooledTexture { texture, view }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPTH: TargetDesc = TargetDesc {
        role: TargetRole::Depth,
        width: 640,
        height: 480,
    };

    fn size(width: u32, height: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    fn copyable() -> wgpu::TextureUsages {
        wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT
    }

    #[test]
    fn depth_input_of_matching_size_is_copied() {
        assert!(DEPTH.accepts_copy_from(wgpu::TextureFormat::R32Float, size(640, 480), copyable()));
        assert!(DEPTH.accepts_copy_from(wgpu::TextureFormat::R32Float, size(1024, 768), copyable()));
    }

    #[test]
    fn depth_input_with_wrong_format_is_ignored() {
        assert!(!DEPTH.accepts_copy_from(wgpu::TextureFormat::Depth32Float, size(640, 480), copyable()));
        assert!(!DEPTH.accepts_copy_from(wgpu::TextureFormat::Rgba8Unorm, size(640, 480), copyable()));
    }

    #[test]
    fn depth_input_too_small_is_ignored() {
        assert!(!DEPTH.accepts_copy_from(wgpu::TextureFormat::R32Float, size(639, 480), copyable()));
        assert!(!DEPTH.accepts_copy_from(wgpu::TextureFormat::R32Float, size(640, 240), copyable()));
    }

    #[test]
    fn depth_input_without_copy_src_is_ignored() {
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        assert!(!DEPTH.accepts_copy_from(wgpu::TextureFormat::R32Float, size(640, 480), usage));
    }

    #[test]
    fn zero_sized_target_still_needs_one_texel() {
        let empty = TargetDesc {
            width: 0,
            height: 0,
            ..DEPTH
        };
        assert_eq!(empty.extent(), size(1, 1));
        assert!(!empty.accepts_copy_from(wgpu::TextureFormat::R32Float, size(0, 0), copyable()));
    }
}
