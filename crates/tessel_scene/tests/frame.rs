//! Whole scene frames through the headless backend

use tessel_core::{
    BlendMode, ClearValue, DVec3, GpuBackend, GpuResource, InputEvent, IVec2, PassTarget, Vec3,
};
use tessel_gpu::{Command, HeadlessBackend};
use tessel_gui::{GuiContext, GuiResources, Label};
use tessel_scene::{
    CameraMovement, DirectionalLight, GameObject, Material, ObjectId, PointLight, RenderMesh, Scene,
    SceneConfig,
};

fn scene(width: u32, height: u32) -> (HeadlessBackend, Scene) {
    let mut backend = HeadlessBackend::new(width, height);
    let scene = Scene::new(&mut backend, &SceneConfig::default()).unwrap();
    (backend, scene)
}

fn spawn_cube(scene: &mut Scene, position: DVec3) -> ObjectId {
    let cube = RenderMesh::cube(scene.lit_shader(), Material::default()).unwrap();
    scene.spawn(GameObject::new(position).with(cube))
}

fn num_lights(backend: &HeadlessBackend, scene: &Scene) -> u32 {
    let lit = scene.lit_shader();
    let offset = lit.require_uniform("num_lights").unwrap().offset as usize;
    let block = backend.uniform_block(lit.id()).unwrap();
    u32::from_le_bytes([block[offset], block[offset + 1], block[offset + 2], block[offset + 3]])
}

#[test]
fn geometry_pass_runs_before_composite() {
    let (mut backend, mut scene) = scene(320, 240);
    spawn_cube(&mut scene, DVec3::ZERO);

    backend.take_commands();
    scene.frame(&mut backend, 0.016).unwrap();
    let commands = backend.commands();

    let framebuffer = scene.render_pass().framebuffer();
    let passes: Vec<_> = commands
        .iter()
        .filter_map(|c| match c {
            Command::BeginPass { target, clear } => Some((*target, *clear)),
            _ => None,
        })
        .collect();
    assert_eq!(
        passes,
        vec![
            (
                PassTarget::Framebuffer(framebuffer),
                Some(ClearValue::color_depth([0.0; 4]))
            ),
            (PassTarget::Screen, Some(ClearValue::color([0.0; 4]))),
        ]
    );

    let draws: Vec<_> = backend.draws().collect();
    assert_eq!(draws.len(), 2);

    let geometry = draws[0];
    assert_eq!(geometry.target, PassTarget::Framebuffer(framebuffer));
    assert_eq!(geometry.shader, scene.lit_shader().id());
    assert!(geometry.depth_test);
    assert_eq!(geometry.blend, BlendMode::Replace);
    assert_eq!((geometry.vertex_count, geometry.index_count), (24, Some(36)));

    let composite = draws[1];
    assert_eq!(composite.target, PassTarget::Screen);
    assert!(!composite.depth_test);
    let bound: Vec<_> = composite.textures.iter().copied().collect();
    let expected: Vec<_> = scene
        .render_pass()
        .attachments()
        .into_iter()
        .enumerate()
        .map(|(unit, texture)| (unit as u32, texture))
        .collect();
    assert_eq!(bound, expected);

    // The frame is left open for the GUI
    assert!(!commands.iter().any(|c| matches!(c, Command::EndFrame)));
}

#[test]
fn resize_regenerates_attachments_on_the_next_frame() {
    let (mut backend, mut scene) = scene(320, 240);
    scene.frame(&mut backend, 0.016).unwrap();
    let old = scene.render_pass().attachments();

    backend.resize(640, 480);
    scene.handle_event(&InputEvent::Resize { width: 640, height: 480 });
    assert_eq!(scene.render_pass().attachments(), old);
    assert!((scene.camera.aspect() - 640.0 / 480.0).abs() < 1e-6);

    backend.take_commands();
    scene.frame(&mut backend, 0.016).unwrap();
    let new = scene.render_pass().attachments();
    assert_ne!(new, old);
    assert_eq!(scene.render_pass().generation(), 1);
    assert_eq!(backend.texture_desc(new[0]).unwrap().width, 640);

    // Regeneration happens before anything is drawn
    let first_pass = backend
        .commands()
        .iter()
        .position(|c| matches!(c, Command::BeginPass { .. }))
        .unwrap();
    let last_create = backend
        .commands()
        .iter()
        .rposition(|c| matches!(c, Command::CreateFramebuffer { .. }))
        .unwrap();
    assert!(last_create < first_pass);

    backend.end_frame().unwrap();
    backend.collect_garbage();
    assert!(old.iter().all(|&t| !backend.is_live(GpuResource::Texture(t))));
    assert_eq!(backend.live_textures(), 4);
}

#[test]
fn lights_and_camera_reach_the_lit_shader() {
    let (mut backend, mut scene) = scene(200, 200);
    scene.dir_light = Some(DirectionalLight::new(Vec3::ONE, 0.5, Vec3::NEG_Y));
    spawn_cube(&mut scene, DVec3::ZERO);
    let lamp = scene.spawn(GameObject::new(DVec3::new(1.0, 2.0, 3.0)).with(PointLight::default()));

    scene.frame(&mut backend, 0.016).unwrap();
    let lit = scene.lit_shader();
    let read = |name: &str| backend.uniform_f32(lit.id(), name).unwrap();

    assert_eq!(num_lights(&backend, &scene), 1);
    assert_eq!(read("point_lights[0].position"), vec![1.0, 2.0, 3.0]);
    assert_eq!(read("point_lights[0].strength"), vec![5.0]);
    assert_eq!(read("point_lights[0].quadratic"), vec![1.0]);
    assert_eq!(read("dir_light.strength"), vec![0.5]);
    assert_eq!(read("view_pos"), vec![0.0, 0.0, 10.0]);
    assert_eq!(read("material.shininess"), vec![64.0]);
    assert_eq!(read("view"), scene.camera.view().to_cols_array().to_vec());
    assert_eq!(read("projection"), scene.camera.projection().to_cols_array().to_vec());

    // Lights move with their object
    scene.object_mut(lamp).unwrap().translate(DVec3::X);
    scene.frame(&mut backend, 0.016).unwrap();
    assert_eq!(
        backend.uniform_f32(lit.id(), "point_lights[0].position").unwrap(),
        vec![2.0, 2.0, 3.0]
    );

    scene.despawn(lamp).unwrap();
    scene.dir_light = None;
    scene.frame(&mut backend, 0.016).unwrap();
    assert_eq!(num_lights(&backend, &scene), 0);
    assert_eq!(backend.uniform_f32(lit.id(), "dir_light.strength").unwrap(), vec![0.0]);
}

#[test]
fn extra_point_lights_are_dropped() {
    let (mut backend, mut scene) = scene(64, 64);
    spawn_cube(&mut scene, DVec3::ZERO);
    for i in 0..10 {
        scene.spawn(GameObject::new(DVec3::new(i as f64, 0.0, 0.0)).with(PointLight::default()));
    }
    scene.frame(&mut backend, 0.016).unwrap();
    assert_eq!(num_lights(&backend, &scene), 8);
}

#[test]
fn render_mesh_follows_its_owner() {
    let (mut backend, mut scene) = scene(64, 64);
    let id = spawn_cube(&mut scene, DVec3::new(0.0, 1.0, 0.0));
    scene.frame(&mut backend, 0.016).unwrap();

    let first = |scene: &Scene| -> Vec<f64> {
        let mesh = scene.object(id).unwrap().attribute::<RenderMesh>().unwrap().mesh();
        mesh.vertices()[..3].to_vec()
    };
    let start = first(&scene);

    scene.object_mut(id).unwrap().translate(DVec3::new(2.0, 0.0, 0.0));
    scene.frame(&mut backend, 0.016).unwrap();
    let moved = first(&scene);
    assert_eq!(moved, vec![start[0] + 2.0, start[1], start[2]]);

    // The GPU mirror was re-uploaded before the draw
    let object = scene.object(id).unwrap();
    let mesh = object.attribute::<RenderMesh>().unwrap().mesh();
    assert!(!mesh.is_dirty());
    let gpu = backend.buffer_f32(mesh.vertex_buffer().unwrap().id()).unwrap();
    assert_eq!(&gpu[..3], &[moved[0] as f32, moved[1] as f32, moved[2] as f32]);
}

#[test]
fn paused_scene_keeps_updating_objects_but_not_the_camera() {
    let (mut backend, mut scene) = scene(64, 64);
    let id = spawn_cube(&mut scene, DVec3::ZERO);
    scene.set_movement(CameraMovement {
        forward: true,
        ..Default::default()
    });

    scene.frame(&mut backend, 1.0).unwrap();
    let walked = scene.camera.position();
    assert!((walked - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);

    scene.set_paused(true);
    scene.object_mut(id).unwrap().translate(DVec3::Y);
    scene.frame(&mut backend, 1.0).unwrap();
    assert_eq!(scene.camera.position(), walked);
    let mesh = scene.object(id).unwrap().attribute::<RenderMesh>().unwrap().mesh();
    assert_eq!(mesh.center(), DVec3::Y);
}

#[test]
fn gui_draws_over_the_composite() {
    let mut backend = HeadlessBackend::new(320, 240);
    let mut scene = Scene::new(&mut backend, &SceneConfig::default()).unwrap();
    let mut gui = GuiContext::new(&mut backend, GuiResources::headless()).unwrap();
    spawn_cube(&mut scene, DVec3::ZERO);
    let (tree, res) = gui.split();
    let label = Label::create(tree, res, IVec2::new(4, 4), "fps").unwrap();
    tree.add_root(label).unwrap();

    backend.take_commands();
    gui.begin_frame().unwrap();
    scene.frame(&mut backend, 0.016).unwrap();
    gui.draw(&mut backend).unwrap();
    backend.end_frame().unwrap();
    backend.collect_garbage();

    let targets: Vec<_> = backend.draws().map(|d| d.target).collect();
    assert_eq!(
        targets,
        vec![
            PassTarget::Framebuffer(scene.render_pass().framebuffer()),
            PassTarget::Screen,
            PassTarget::Screen,
        ]
    );
    let last = backend.draws().last().unwrap();
    assert_eq!(last.shader, gui.shader().id());
    assert!(!last.depth_test);
    assert_eq!(backend.frames(), 1);
}
