use ash::vk::{DescriptorSet, ShaderStageFlags};
use glam::{vec3, Mat4, Vec3, Vec4, Vec4Swizzles};
use ivy_resources::Handle;
use ivy_snapshot::CameraData as SnapshotCameraData;
use ivy_vulkan::{
    context::SharedVulkanContext,
    descriptors::{DescriptorAllocator, DescriptorBuilder, DescriptorLayoutCache},
    Buffer, Texture, TextureInfo,
};

use crate::Result;

/// CPU-side camera state: projection/view matrices plus the frustum derived
/// from them, used for visibility queries independent of the GPU-facing
/// uniform data uploaded by [`GpuCamera`].
#[derive(Default, Debug, Clone)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    frustum: Frustum,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_orthographic(&mut self, width: f32, height: f32, near: f32, far: f32) {
        let hw = width / 2.0;
        let hh = height / 2.0;

        self.projection = orthographic_vk(-hw, hw, -hh, hh, near, far);
        self.frustum = Frustum::ortho(hh, hw, near, far);
    }

    pub fn set_perspective(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.projection = perspective_vk(fov, aspect, near, far);
        self.frustum = Frustum::perspective(fov, aspect, near, far);
    }

    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        let mut camera = Camera::new();
        camera.set_orthographic(width, height, near, far);
        camera
    }

    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Camera::new();
        camera.set_perspective(fov, aspect, near, far);
        camera
    }

    /// Returns the combined view and projection matrix.
    pub fn viewproj(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn visible(&self, p: Vec3, radius: f32) -> bool {
        let p = self.view.transform_point3(p);
        self.frustum.visible(p, radius)
    }

    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

#[repr(C, align(16))]
#[derive(Default, Debug, Clone, Copy, PartialEq)]
/// GPU side camera data, matching the layout expected by the geometry pass's
/// camera uniform buffer.
pub struct CameraUniformData {
    pub viewproj: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec4,
    pub forward: Vec4,
}

impl From<&SnapshotCameraData> for CameraUniformData {
    fn from(camera: &SnapshotCameraData) -> Self {
        Self {
            viewproj: camera.proj * camera.view,
            view: camera.view,
            projection: camera.proj,
            position: camera.position.extend(1.0),
            forward: camera.view.transform_vector3(Vec3::Z).extend(0.0),
        }
    }
}

/// The depth attachment of a camera-driven geometry pass.
pub struct DepthAttachment(pub Handle<Texture>);

impl DepthAttachment {
    pub fn new(
        context: SharedVulkanContext,
        extent: ivy_base::Extent,
    ) -> Result<(Texture, TextureInfo)> {
        let info = TextureInfo::depth(extent);
        let texture = Texture::new(context, &info)?;
        Ok((texture, info))
    }
}

/// One uniform buffer + descriptor set per frame in flight, refilled from
/// [`ivy_snapshot::CameraData`] every frame by the geometry pass.
pub struct GpuCamera {
    uniformbuffers: Vec<Buffer>,
    sets: Vec<DescriptorSet>,
    layout_cache: DescriptorLayoutCache,
    allocator: DescriptorAllocator,
}

impl GpuCamera {
    pub fn new(context: SharedVulkanContext, frames_in_flight: usize) -> Result<Self> {
        let uniformbuffers = (0..frames_in_flight)
            .map(|_| {
                Buffer::new(
                    context.clone(),
                    ivy_vulkan::BufferUsage::UNIFORM_BUFFER,
                    ivy_vulkan::BufferAccess::Mapped,
                    &[CameraUniformData::default()],
                )
                .map_err(|e| e.into())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut layout_cache = DescriptorLayoutCache::new(context.device().clone());
        let mut allocator = DescriptorAllocator::new(context.device().clone(), frames_in_flight);

        let sets = uniformbuffers
            .iter()
            .map(|u| {
                DescriptorBuilder::new()
                    .bind_uniform_buffer(0, ShaderStageFlags::VERTEX, u)
                    .build_one(context.device(), &mut layout_cache, &mut allocator)
                    .map_err(|e| e.into())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            uniformbuffers,
            sets,
            layout_cache,
            allocator,
        })
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.uniformbuffers
    }

    pub fn buffer(&self, index: usize) -> &Buffer {
        &self.uniformbuffers[index]
    }

    pub fn set(&self, current_frame: usize) -> DescriptorSet {
        self.sets[current_frame]
    }

    /// Refills the current frame's uniform buffer from the snapshot's camera
    /// data.
    pub fn update(&mut self, camera: &SnapshotCameraData, current_frame: usize) -> Result<()> {
        self.uniformbuffers[current_frame]
            .fill(0, &[CameraUniformData::from(camera)])
            .map_err(|e| e.into())
    }
}

#[inline]
pub fn perspective_vk(vertical_fov: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Mat4 {
    let t = (vertical_fov / 2.0).tan();
    let sy = 1.0 / t;
    let sx = sy / aspect_ratio;
    let nmf = z_near - z_far;

    Mat4::from_cols(
        Vec4::new(sx, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -sy, 0.0, 0.0),
        Vec4::new(0.0, 0.0, z_far / nmf, -1.0),
        Vec4::new(0.0, 0.0, z_near * z_far / nmf, 0.0),
    )
}

/// Orthographic projection matrix for use with Vulkan.
///
/// This matrix is meant to be used when the source coordinate space is right-handed and y-up
/// (the standard computer graphics coordinate space)and the destination space is right-handed
/// and y-down, with Z (depth) clip extending from 0.0 (close) to 1.0 (far).
#[inline]
pub fn orthographic_vk(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let rml = right - left;
    let rpl = right + left;
    let tmb = top - bottom;
    let tpb = top + bottom;
    let fmn = far - near;
    Mat4::from_cols(
        Vec4::new(2.0 / rml, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -2.0 / tmb, 0.0, 0.0),
        Vec4::new(0.0, 0.0, -1.0 / fmn, 0.0),
        Vec4::new(-(rpl / rml), -(tpb / tmb), -(near / fmn), 1.0),
    )
}

#[derive(Copy, Default, Debug, Clone, PartialEq)]
pub struct Plane {
    p: f32,
    norm: Vec3,
}

impl Plane {
    #[must_use]
    pub fn new(p: f32, norm: Vec3) -> Self {
        Self {
            p,
            norm: norm.normalize(),
        }
    }

    pub fn distance(&self, p: Vec3) -> f32 {
        p.dot(self.norm) + self.p
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Frustum {
    top: Plane,
    bot: Plane,
    left: Plane,
    right: Plane,
    far: Plane,
    near: Plane,
}

impl Frustum {
    pub fn planes(&self) -> [&Plane; 6] {
        [
            &self.top,
            &self.bot,
            &self.left,
            &self.right,
            &self.far,
            &self.near,
        ]
    }

    pub fn ortho(hh: f32, hw: f32, near: f32, far: f32) -> Self {
        let top = Plane::new(hh, Vec3::Y);
        let bot = Plane::new(-hh, -Vec3::Y);
        let right = Plane::new(hw, Vec3::X);
        let left = Plane::new(-hw, -Vec3::X);
        let far = Plane::new(far, Vec3::Z);
        let near = Plane::new(near, Vec3::Z);

        Self {
            top,
            bot,
            left,
            right,
            far,
            near,
        }
    }

    #[must_use]
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let hh = (fov / 2.0).tan();
        let hw = hh * aspect;

        let nw = vec3(-hw, hh, 1.).normalize();
        let ne = vec3(hw, hh, 1.).normalize();
        let se = vec3(hw, -hh, 1.).normalize();
        let sw = vec3(-hw, -hh, 1.).normalize();

        let top = Plane::new(0., nw.cross(ne));
        let right = Plane::new(0., ne.cross(se));
        let bot = Plane::new(0., se.cross(sw));
        let left = Plane::new(0., sw.cross(nw));
        let far = Plane::new(far, Vec3::Z);
        let near = Plane::new(near, -Vec3::Z);

        Self {
            top,
            bot,
            left,
            right,
            far,
            near,
        }
    }

    pub fn visible(&self, p: Vec3, radius: f32) -> bool {
        self.planes().iter().all(|v| v.distance(p) > -radius)
    }
}
