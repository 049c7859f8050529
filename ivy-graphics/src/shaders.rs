use ivy_vulkan::ShaderModuleInfo;

/// Instanced geometry vertex shader; consumes the `InstanceData` storage
/// buffer by `gl_InstanceIndex` instead of a per-draw push constant.
pub const DEFAULT_VERTEX_SHADER: ShaderModuleInfo = ShaderModuleInfo::from_const_bytes(
    include_bytes!(concat!(env!("OUT_DIR"), "/shaders/default.vert.spv")),
);

pub const DEFAULT_FRAGMENT_SHADER: ShaderModuleInfo = ShaderModuleInfo::from_const_bytes(
    include_bytes!(concat!(env!("OUT_DIR"), "/shaders/default.frag.spv")),
);
