//! Headless GUI Demo
//!
//! Run with:
//! `RUST_LOG=debug cargo run -p tessel_gui --example headless`
//!
//! Builds a settings panel, feeds it a scripted pointer and keyboard session and
//! reports what the headless backend recorded for each frame.

use tessel_core::{InputEvent, IVec2, KeyCode, KeyEvent, MouseButton};
use tessel_gpu::HeadlessBackend;
use tessel_gui::{
    Align, Button, Checkbox, GuiContext, GuiResources, Panel, Slider, SliderDesc, TextBox,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut backend = HeadlessBackend::new(800, 600);
    let mut ctx = GuiContext::new(&mut backend, GuiResources::headless())?;

    let (tree, res) = ctx.split();
    let panel = Panel::create(tree, res, IVec2::new(40, 40), IVec2::new(300, 200), "Scene", Align::UpperLeft)?;

    let slot = res.config.slot_size - res.config.padding;
    let wireframe = Checkbox::create(tree, res, IVec2::ZERO, slot, Align::UpperLeft)?;
    Panel::add_element(tree, res, panel, wireframe, "wireframe")?;

    let exposure = Slider::create(
        tree,
        res,
        SliderDesc {
            size: IVec2::new(120, slot),
            max: 4.0,
            value: 1.0,
            show_value: true,
            ..Default::default()
        },
    )?;
    Panel::add_element(tree, res, panel, exposure, "exposure")?;

    let name = TextBox::create(tree, res, IVec2::ZERO, IVec2::new(150, slot), Align::UpperLeft, "cube")?;
    Panel::add_element(tree, res, panel, name, "name")?;

    let reset = Button::create(tree, res, IVec2::ZERO, IVec2::new(80, slot), "Reset", Align::UpperLeft)?;
    Panel::add_element(tree, res, panel, reset, "reset")?;
    tree.add_root(panel)?;

    ctx.tree_mut().behaviour_mut::<Slider>(exposure)?.on_update(|_, value| {
        tracing::info!("exposure set to {:.2}", value);
        Ok(())
    });
    ctx.tree_mut().behaviour_mut::<TextBox>(name)?.on_submit(|_, text| {
        tracing::info!("renamed to {}", text);
        Ok(())
    });
    ctx.tree_mut().behaviour_mut::<Button>(reset)?.on_press(move |cx, ()| {
        cx.with_behaviour::<Slider, _>(exposure, |slider, cx| slider.set_value(cx, 1.0))
    });

    let center = |ctx: &GuiContext, id| -> anyhow::Result<IVec2> { Ok(ctx.tree().get(id)?.bounding_box().center()) };
    let press = |pos: IVec2| InputEvent::MouseDown {
        pos,
        button: MouseButton::PRIMARY,
    };
    let release = |pos: IVec2| InputEvent::MouseUp {
        pos,
        button: MouseButton::PRIMARY,
    };

    let slider_at = center(&ctx, exposure)?;
    let box_at = center(&ctx, name)?;
    let reset_at = center(&ctx, reset)?;
    let script = vec![
        press(slider_at),
        InputEvent::MouseMove {
            pos: slider_at + IVec2::new(30, 0),
            delta: IVec2::new(30, 0),
        },
        release(slider_at + IVec2::new(30, 0)),
        press(box_at),
        release(box_at),
        InputEvent::Key(KeyEvent::plain(KeyCode::END)),
        InputEvent::TextInput("_01".into()),
        InputEvent::Key(KeyEvent::plain(KeyCode::ENTER)),
        press(reset_at),
        release(reset_at),
    ];

    for (frame, event) in script.iter().enumerate() {
        ctx.handle_event(event)?;
        backend.take_commands();
        ctx.frame(&mut backend)?;
        tracing::debug!("frame {}: {} draws", frame, backend.draws().count());
    }

    let checked = ctx.tree().behaviour::<Checkbox>(wireframe)?.is_checked();
    let value = ctx.tree().behaviour::<Slider>(exposure)?.value();
    let text = ctx.tree().behaviour::<TextBox>(name)?.text();
    println!("wireframe={} exposure={:.2} name={}", checked, value, text);
    println!("{} elements, {} frames", ctx.tree().len(), backend.frames());
    Ok(())
}
