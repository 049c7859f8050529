mod backend;

use std::sync::Arc;
use std::thread;

use anyhow::Context;
use glam::{Mat4, Quat, Vec3};
use ivy_base::{AppEvent, Clock, EngineConfig, Events, Extent, FromDuration, Logger};
use ivy_ecs::{Entity, World};
use ivy_graphics::{
    shaders::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER},
    Mesh, TextureSetRebuilt, Vertex,
};
use ivy_rendergraph::{GeometryNode, RenderGraph, SwapchainPresentNode};
use ivy_resources::Resources;
use ivy_scheduler::{AccessSet, Scheduler};
use ivy_snapshot::{EntityRenderRecord, Handoff, MeshId};
use ivy_threadpool::{Priority, Subsystem, SubsystemConfig, ThreadPool};
use ivy_vulkan::{
    buffer_manager::BufferManager,
    context::VulkanContext,
    descriptors::DescriptorLayoutCache,
    renderpass::{AttachmentDescription, LoadOp, RenderPass, RenderPassInfo, StoreOp, SubpassInfo},
    sampler::{Sampler, SamplerInfo},
    swapchain::{Swapchain, SwapchainInfo},
    texture::{Format, ImageLayout, ImageUsage, SampleCountFlags, Texture, TextureInfo},
    vk, Pipeline, PipelineInfo, VertexDesc,
};

use backend::DemoWindow;

/// World-space position of a spinning quad.
struct Position(Vec3);

/// Current rotation about the Y axis, in radians.
struct Angle(f32);

/// Radians/second rotation rate.
struct Spin {
    speed: f32,
}

/// What a renderable entity draws with; resolved against the geometry
/// node's mesh/material-set registries at extraction time.
struct Renderable {
    mesh: MeshId,
    material_set: Arc<str>,
}

const DEFAULT_MATERIAL_SET: &str = "default";
const QUAD_MESH: MeshId = MeshId(0);

fn spin_system(world: &mut World, dt: f32) -> anyhow::Result<()> {
    let spinning: Vec<Entity> = world.view::<(Spin,)>()?.iter().map(|(e, _)| e).collect();

    for e in spinning {
        let speed = world.get::<Spin>(e)?.unwrap().speed;
        let angle = world.get_mut::<Angle>(e)?.unwrap();
        angle.0 += speed * dt;
    }

    Ok(())
}

/// Reads the immutable parts of the world needed to draw this tick and
/// writes them into `snapshot`. Runs directly against `&World` after the
/// scheduler's stages have completed, since `World::view` only borrows
/// immutably.
fn extract(world: &World, snapshot: &mut ivy_snapshot::Snapshot, generation: u64) -> anyhow::Result<()> {
    snapshot.clear();

    for (_, (position, angle, renderable)) in world.view::<(Position, Angle, Renderable)>()?.iter() {
        let world_matrix = Mat4::from_rotation_translation(
            Quat::from_axis_angle(Vec3::Y, angle.0),
            position.0,
        );

        snapshot.entities.push(EntityRenderRecord {
            world_matrix,
            mesh: renderable.mesh,
            material_buffer_index: 0,
            material_set: renderable.material_set.clone(),
            flags: 0,
        });
    }

    snapshot.rebuild_batches();
    snapshot.generation = generation;

    Ok(())
}

/// Spawns a handful of spinning quads sharing one mesh and material set.
fn populate_world(world: &mut World) -> anyhow::Result<()> {
    world.register_component::<Position>()?;
    world.register_component::<Angle>()?;
    world.register_component::<Spin>()?;
    world.register_component::<Renderable>()?;

    for i in 0..4 {
        let e = world.create_entity();
        world.add(e, Position(Vec3::new(i as f32 * 1.5 - 2.25, 0.0, 0.0)))?;
        world.add(e, Angle(0.0))?;
        world.add(e, Spin { speed: 0.5 + i as f32 * 0.25 })?;
        world.add(
            e,
            Renderable {
                mesh: QUAD_MESH,
                material_set: DEFAULT_MATERIAL_SET.into(),
            },
        )?;
    }

    Ok(())
}

/// Builds a renderpass compatible with the geometry pipeline: one color and
/// one depth attachment, cleared on load, handed off to the render graph's
/// own renderpass once `RenderGraph::build` runs. `Pipeline::new` only needs
/// this for its renderpass-compatibility requirements at creation time; its
/// fixed-function state always enables the depth test, so the renderpass
/// must carry a depth attachment even for this minimal scene.
fn compatible_renderpass(device: Arc<ash::Device>, color_format: Format) -> anyhow::Result<RenderPass> {
    let attachments = [
        AttachmentDescription {
            flags: Default::default(),
            format: color_format,
            samples: SampleCountFlags::TYPE_1,
            load_op: LoadOp::CLEAR,
            store_op: StoreOp::STORE,
            stencil_load_op: LoadOp::DONT_CARE,
            stencil_store_op: StoreOp::DONT_CARE,
            initial_layout: ImageLayout::UNDEFINED,
            final_layout: ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        },
        AttachmentDescription {
            flags: Default::default(),
            format: Format::D32_SFLOAT,
            samples: SampleCountFlags::TYPE_1,
            load_op: LoadOp::CLEAR,
            store_op: StoreOp::DONT_CARE,
            stencil_load_op: LoadOp::DONT_CARE,
            stencil_store_op: StoreOp::DONT_CARE,
            initial_layout: ImageLayout::UNDEFINED,
            final_layout: ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        },
    ];

    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];

    let depth_ref = vk::AttachmentReference {
        attachment: 1,
        layout: ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let subpasses = [SubpassInfo {
        color_attachments: &color_refs,
        resolve_attachments: &[],
        input_attachments: &[],
        depth_attachment: Some(depth_ref),
    }];

    let info = RenderPassInfo {
        attachments: &attachments,
        subpasses: &subpasses,
        dependencies: &[],
    };

    Ok(RenderPass::new(device, &info)?)
}

fn main() -> anyhow::Result<()> {
    Logger::default().install();
    ivy_base::install_tracing();

    let config = EngineConfig::default();

    let glfw = glfw::init(glfw::FAIL_ON_ERRORS).context("failed to initialize glfw")?;
    let (mut window, mut events) = DemoWindow::new(glfw, config.window_size, "ivy-engine-demo")?;

    let context = Arc::new(VulkanContext::new(&window)?);

    let swapchain = Swapchain::new(context.clone(), &window, SwapchainInfo::default())?;
    let swapchain_extent = swapchain.extent();
    let swapchain_format = swapchain.image_format();

    let renderpass = compatible_renderpass(context.device().clone(), swapchain_format)?;
    let mut layout_cache = DescriptorLayoutCache::new(context.device().clone());

    let pipeline = Pipeline::new(
        context.device().clone(),
        &mut layout_cache,
        &renderpass,
        PipelineInfo {
            vertexshader: DEFAULT_VERTEX_SHADER,
            fragmentshader: DEFAULT_FRAGMENT_SHADER,
            vertex_binding: Vertex::BINDING_DESCRIPTION,
            vertex_attributes: Vertex::ATTRIBUTE_DESCRIPTIONS,
            extent: swapchain_extent,
            ..Default::default()
        },
    )?;

    let resources = Resources::new();

    let color_info = TextureInfo {
        extent: swapchain_extent,
        mip_levels: 1,
        usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_SRC,
        format: swapchain_format,
        samples: SampleCountFlags::TYPE_1,
    };
    let color_texture = Texture::new(context.clone(), &color_info)?;
    let color_handle = resources.insert(color_texture)?;

    let depth_texture = Texture::new(context.clone(), &TextureInfo::depth(swapchain_extent))?;
    let depth_handle = resources.insert(depth_texture)?;

    let white_texture = Texture::new(context.clone(), &TextureInfo::color(Extent::new(1, 1)))?;
    white_texture.write(&[255, 255, 255, 255])?;
    let white_handle = resources.insert(white_texture)?;

    let sampler = Sampler::new(context.clone(), &SamplerInfo::pixelated())?;
    let sampler_handle = resources.insert(sampler)?;

    let swapchain_handle = resources.insert(swapchain)?;

    let buffers = BufferManager::new(context.clone());

    let mut app_events = Events::new();
    let texture_set_rebuilds = app_events.subscribe::<TextureSetRebuilt>();
    let exit_requests = app_events.subscribe::<AppEvent>();

    let mut render_graph = RenderGraph::new(context.clone(), config.max_frames_in_flight)?;
    render_graph.binder_mut().register_pipeline(&pipeline)?;

    let mut geometry = GeometryNode::new(pipeline, color_handle, depth_handle, buffers);
    geometry.register_mesh(QUAD_MESH, Mesh::new_square(context.clone(), 1.0, 1.0)?);

    geometry
        .texture_sets()
        .create_set(DEFAULT_MATERIAL_SET, white_handle, sampler_handle);
    geometry
        .material_sets()
        .create_set(DEFAULT_MATERIAL_SET, DEFAULT_MATERIAL_SET);
    geometry.add_material_to_set(DEFAULT_MATERIAL_SET, white_handle)?;
    geometry.rebuild_texture_set(
        DEFAULT_MATERIAL_SET,
        &resources.fetch::<Texture>()?,
        &resources.fetch::<ivy_vulkan::Sampler>()?,
        &app_events,
    )?;
    geometry.rebuild_material_set(DEFAULT_MATERIAL_SET, 0)?;

    for rebuilt in texture_set_rebuilds.try_iter() {
        tracing::debug!(name = %rebuilt.name, generation = rebuilt.generation, "texture set rebuilt");
    }

    render_graph.add_node(geometry);
    render_graph.add_node(SwapchainPresentNode::new(
        &resources,
        context.clone(),
        swapchain_handle,
        color_handle,
    )?);

    render_graph.build(resources.fetch::<Texture>()?, swapchain_extent)?;

    let pool = Arc::new(ThreadPool::new(
        config
            .thread_pool
            .subsystems
            .iter()
            .map(|(s, c)| (*s, c.clone())),
    ));

    let handoff = Arc::new(Handoff::new());

    let sim_thread = {
        let pool = pool.clone();
        let handoff = handoff.clone();
        thread::spawn(move || -> anyhow::Result<()> {
            let mut world = World::new();
            populate_world(&mut world)?;

            let mut scheduler = Scheduler::new();
            let stage = scheduler.add_stage();
            scheduler.register_system(
                stage,
                "spin",
                AccessSet::new().reads::<Spin>().writes::<Angle>(),
                Priority::Normal,
                spin_system,
            )?;

            let clock = Clock::new();
            let mut last = clock.elapsed();
            let mut generation = 0u64;

            loop {
                let snapshot = match handoff.acquire_write() {
                    Some(snapshot) => snapshot,
                    None => break,
                };

                let now = clock.elapsed();
                let dt = (now - last).secs();
                last = now;

                let errors = scheduler.run(&pool, &mut world, dt);
                for error in errors {
                    tracing::warn!(
                        frame = generation,
                        pass = error.system,
                        stage = error.stage,
                        "system failed: {:#}",
                        error.error
                    );
                }

                generation += 1;
                extract(&world, snapshot, generation)?;

                handoff.publish_write();
            }

            Ok(())
        })
    };

    let mut should_exit = false;
    while !window.should_close() && !should_exit {
        window.poll_events();
        for (_, event) in glfw::flush_messages(&events) {
            if let glfw::WindowEvent::Close = event {
                app_events.send(AppEvent::Exit);
            }
        }

        if exit_requests.try_iter().next().is_some() {
            should_exit = true;
        }

        let snapshot = match handoff.acquire_read() {
            Some(snapshot) => snapshot,
            None => break,
        };

        let current_frame = render_graph.begin()?;
        let _frame_span = tracing::info_span!("frame", frame = current_frame).entered();

        resources
            .get_mut(swapchain_handle)?
            .acquire_next_image(render_graph.wait_semaphore(current_frame))?;

        render_graph.execute(snapshot, &resources)?;
        render_graph.end()?;

        {
            let swapchain = resources.get(swapchain_handle)?;
            swapchain.present(
                context.present_queue(),
                &[render_graph.signal_semaphore(current_frame)],
            )?;
        }

        handoff.release_read();
    }

    handoff.request_shutdown();
    sim_thread
        .join()
        .map_err(|_| anyhow::anyhow!("simulation thread panicked"))??;

    pool.shutdown();
    pool.join();

    context.wait_idle()?;

    Ok(())
}
