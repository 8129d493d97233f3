//! Headless Scene Demo
//!
//! Run with:
//! `RUST_LOG=debug cargo run -p tessel_scene --example orbit`
//!
//! A lamp circles a cube and a sphere while the camera walks forward, with a GUI
//! label drawn over the composite. Halfway through the window is resized and later
//! paused, to show attachment regeneration and the frozen camera.

use tessel_core::{DVec3, GpuBackend, InputEvent, IVec2, KeyCode, KeyEvent, Rgba8, Vec3};
use tessel_gpu::HeadlessBackend;
use tessel_gui::{GuiContext, GuiResources, Label};
use tessel_render::Texture;
use tessel_scene::{
    CameraMovement, DirectionalLight, GameObject, Material, PointLight, RenderMesh, Scene,
    SceneConfig,
};
use tracing_subscriber::EnvFilter;

const FRAMES: u32 = 120;
const DT: f32 = 1.0 / 60.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = SceneConfig::from_toml_str("[camera]\nspeed = 2.0\n")?;
    let mut backend = HeadlessBackend::new(800, 600);
    let mut scene = Scene::new(&mut backend, &config)?;
    let mut gui = GuiContext::new(&mut backend, GuiResources::headless())?;

    scene.dir_light = Some(DirectionalLight::new(Vec3::ONE, 0.2, Vec3::new(-0.3, -1.0, -0.2)));

    let albedo = Texture::solid_box(64, 64, Rgba8::new(200, 60, 60, 255), 2, Rgba8::BLACK);
    let red = Material::with_texture(albedo);
    let cube = RenderMesh::cube(scene.lit_shader(), red)?;
    scene.spawn(GameObject::new(DVec3::new(-1.5, 0.0, 0.0)).with(cube));

    let sphere = RenderMesh::sphere(scene.lit_shader(), Material::default(), 8)?;
    scene.spawn(GameObject::new(DVec3::new(1.5, 0.0, 0.0)).with(sphere));

    let warm = PointLight::new(Vec3::new(1.0, 0.9, 0.7), 8.0);
    let lamp = scene.spawn(GameObject::new(DVec3::new(3.0, 1.0, 0.0)).with(warm));

    let (tree, res) = gui.split();
    let status = Label::create(tree, res, IVec2::new(8, 8), "frame 0")?;
    tree.add_root(status)?;

    scene.set_movement(CameraMovement {
        forward: true,
        ..Default::default()
    });

    for frame in 0..FRAMES {
        let angle = frame as f64 * DT as f64;
        scene.object_mut(lamp)?.position = DVec3::new(3.0 * angle.cos(), 1.0, 3.0 * angle.sin());

        if frame == FRAMES / 2 {
            let resize = InputEvent::Resize { width: 1024, height: 768 };
            backend.resize(1024, 768);
            scene.handle_event(&resize);
            gui.handle_event(&resize)?;
        }
        if frame == FRAMES * 3 / 4 {
            scene.handle_event(&InputEvent::Key(KeyEvent::plain(KeyCode::ESCAPE)));
        }

        backend.take_commands();
        gui.begin_frame()?;
        scene.frame(&mut backend, DT)?;
        let (tree, res) = gui.split();
        Label::set_text(tree, res, status, &format!("frame {}", frame))?;
        gui.draw(&mut backend)?;
        backend.end_frame()?;
        backend.collect_garbage();
        tracing::debug!("frame {}: {} draws", frame, backend.draws().count());
    }

    let camera = &scene.camera;
    println!(
        "camera at {:?}, paused={}, render pass {:?} (generation {})",
        camera.position(),
        scene.is_paused(),
        scene.render_pass().size(),
        scene.render_pass().generation()
    );
    println!("{} objects, {} live GPU resources", scene.len(), backend.live_resources());
    Ok(())
}
