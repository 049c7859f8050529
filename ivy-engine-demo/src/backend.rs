use ash::vk::Handle;
use glfw::{ClientApiHint, Glfw, WindowEvent, WindowHint};
use ivy_base::Extent;
use ivy_vulkan::traits::Backend;
use std::sync::mpsc::Receiver;

/// Minimal GLFW surface provider, just enough to hand `VulkanContext::new`
/// a `vk::SurfaceKHR` and the instance extensions it needs. Window/input
/// handling beyond that is out of scope here.
pub struct DemoWindow {
    glfw: Glfw,
    window: glfw::Window,
}

impl DemoWindow {
    pub fn new(
        mut glfw: Glfw,
        extent: Extent,
        title: &str,
    ) -> anyhow::Result<(Self, Receiver<(f64, WindowEvent)>)> {
        glfw.window_hint(WindowHint::ClientApi(ClientApiHint::NoApi));
        glfw.window_hint(WindowHint::Resizable(false));

        let (mut window, events) = glfw
            .create_window(
                extent.width,
                extent.height,
                title,
                glfw::WindowMode::Windowed,
            )
            .ok_or_else(|| anyhow::anyhow!("failed to create window"))?;

        window.set_all_polling(true);

        Ok((Self { glfw, window }, events))
    }

    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }
}

impl Backend for DemoWindow {
    fn create_surface(&self, instance: &ash::Instance) -> ivy_vulkan::Result<ash::vk::SurfaceKHR> {
        let mut surface: u64 = 0;
        let result = self.window.create_window_surface(
            instance.handle().as_raw() as _,
            std::ptr::null(),
            &mut surface,
        );

        if result != ash::vk::Result::SUCCESS.as_raw() as u32 {
            return Err(ash::vk::Result::from_raw(result as i32).into());
        }

        Ok(ash::vk::SurfaceKHR::from_raw(surface))
    }

    fn framebuffer_size(&self) -> Extent {
        self.window.get_framebuffer_size().into()
    }

    fn extensions(&self) -> Vec<String> {
        self.glfw
            .get_required_instance_extensions()
            .unwrap_or_default()
    }
}
