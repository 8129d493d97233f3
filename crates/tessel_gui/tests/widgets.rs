//! Widgets driven through raw input events

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tessel_core::{InputEvent, IVec2, KeyCode, KeyEvent, Modifiers, MouseButton};
use tessel_gpu::HeadlessBackend;
use tessel_gui::{
    Align, Button, ButtonState, Checkbox, GuiContext, GuiResources, Label, Panel, Slider, SliderDesc,
    TextBox, TextBoxState,
};

fn context() -> (HeadlessBackend, GuiContext) {
    let mut backend = HeadlessBackend::new(640, 480);
    let ctx = GuiContext::new(&mut backend, GuiResources::headless()).unwrap();
    (backend, ctx)
}

fn down(x: i32, y: i32) -> InputEvent {
    InputEvent::MouseDown {
        pos: IVec2::new(x, y),
        button: MouseButton::PRIMARY,
    }
}

fn up(x: i32, y: i32) -> InputEvent {
    InputEvent::MouseUp {
        pos: IVec2::new(x, y),
        button: MouseButton::PRIMARY,
    }
}

fn motion(from: (i32, i32), to: (i32, i32)) -> InputEvent {
    InputEvent::MouseMove {
        pos: IVec2::new(to.0, to.1),
        delta: IVec2::new(to.0 - from.0, to.1 - from.1),
    }
}

fn click(ctx: &mut GuiContext, x: i32, y: i32) {
    ctx.handle_event(&down(x, y)).unwrap();
    ctx.handle_event(&up(x, y)).unwrap();
}

#[test]
fn button_hover_and_press() {
    let (_backend, mut ctx) = context();
    let (tree, res) = ctx.split();
    let id = Button::create(tree, res, IVec2::new(50, 50), IVec2::new(40, 20), "OK", Align::UpperLeft).unwrap();
    tree.add_root(id).unwrap();

    let presses = Rc::new(Cell::new(0));
    let counter = presses.clone();
    ctx.tree_mut().behaviour_mut::<Button>(id).unwrap().on_press(move |_, ()| {
        counter.set(counter.get() + 1);
        Ok(())
    });
    let state = |ctx: &GuiContext| ctx.tree().behaviour::<Button>(id).unwrap().state();

    ctx.handle_event(&motion((0, 0), (60, 60))).unwrap();
    assert_eq!(state(&ctx), ButtonState::Hovered);

    // Motion inside the box is not another enter
    ctx.handle_event(&motion((60, 60), (61, 61))).unwrap();
    assert_eq!(state(&ctx), ButtonState::Hovered);

    ctx.handle_event(&down(61, 61)).unwrap();
    assert_eq!(state(&ctx), ButtonState::Pressed);
    ctx.handle_event(&up(61, 61)).unwrap();
    assert_eq!(state(&ctx), ButtonState::Hovered);
    assert_eq!(presses.get(), 1);

    // Releasing outside cancels the press
    ctx.handle_event(&down(61, 61)).unwrap();
    ctx.handle_event(&up(300, 300)).unwrap();
    assert_eq!(state(&ctx), ButtonState::Idle);
    assert_eq!(presses.get(), 1);

    ctx.handle_event(&motion((61, 61), (300, 300))).unwrap();
    assert_eq!(state(&ctx), ButtonState::Idle);

    let label = ctx.tree().child(id, "label").unwrap();
    assert_eq!(ctx.tree().behaviour::<Label>(label).unwrap().text(), "OK");
    assert_eq!(ctx.tree().get(label).unwrap().bounding_box().center(), IVec2::new(70, 60));
}

#[test]
fn checkbox_toggles_on_release_inside() {
    let (_backend, mut ctx) = context();
    let (tree, res) = ctx.split();
    let id = Checkbox::create(tree, res, IVec2::new(10, 10), 16, Align::UpperLeft).unwrap();
    tree.add_root(id).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    ctx.tree_mut().behaviour_mut::<Checkbox>(id).unwrap().on_toggle(move |_, checked| {
        sink.borrow_mut().push(checked);
        Ok(())
    });

    click(&mut ctx, 15, 15);
    click(&mut ctx, 15, 15);
    // Pressed outside, released inside
    ctx.handle_event(&down(100, 100)).unwrap();
    ctx.handle_event(&up(15, 15)).unwrap();

    assert_eq!(*seen.borrow(), vec![true, false]);
    assert!(!ctx.tree().behaviour::<Checkbox>(id).unwrap().is_checked());
}

#[test]
fn slider_follows_the_pointer() {
    let (_backend, mut ctx) = context();
    let (tree, res) = ctx.split();
    let id = Slider::create(
        tree,
        res,
        SliderDesc {
            position: IVec2::new(20, 40),
            size: IVec2::new(100, 20),
            max: 10.0,
            value: 5.0,
            ..Default::default()
        },
    )
    .unwrap();
    tree.add_root(id).unwrap();

    let values = Rc::new(RefCell::new(Vec::new()));
    let sink = values.clone();
    ctx.tree_mut().behaviour_mut::<Slider>(id).unwrap().on_update(move |_, value| {
        sink.borrow_mut().push(value);
        Ok(())
    });

    ctx.handle_event(&down(95, 50)).unwrap();
    ctx.handle_event(&motion((95, 50), (400, 50))).unwrap();
    ctx.handle_event(&up(400, 50)).unwrap();
    // No longer dragging
    ctx.handle_event(&motion((400, 50), (30, 50))).unwrap();

    assert_eq!(*values.borrow(), vec![7.5, 10.0]);
    let marker = ctx.tree().child(id, "marker").unwrap();
    assert_eq!(ctx.tree().get(marker).unwrap().bounding_box().center().x, 120);
}

#[test]
fn text_box_edits_through_events() {
    let (_backend, mut ctx) = context();
    let (tree, res) = ctx.split();
    let id = TextBox::create(tree, res, IVec2::new(10, 10), IVec2::new(200, 24), Align::UpperLeft, "").unwrap();
    tree.add_root(id).unwrap();

    // Idle boxes ignore typing
    ctx.handle_event(&InputEvent::TextInput("x".into())).unwrap();
    click(&mut ctx, 50, 20);
    ctx.handle_event(&InputEvent::TextInput("hi".into())).unwrap();
    ctx.handle_event(&InputEvent::Key(KeyEvent::plain(KeyCode::BACKSPACE))).unwrap();
    let text_box = ctx.tree().behaviour::<TextBox>(id).unwrap();
    assert_eq!((text_box.text(), text_box.cursor()), ("h".to_string(), 1));

    let ctrl = Modifiers::new(false, true, false, false);
    ctx.handle_event(&InputEvent::Key(KeyEvent::new(KeyCode::Z, ctrl))).unwrap();
    let text_box = ctx.tree().behaviour::<TextBox>(id).unwrap();
    assert_eq!((text_box.text(), text_box.cursor()), ("hi".to_string(), 2));

    click(&mut ctx, 400, 400);
    assert_eq!(ctx.tree().behaviour::<TextBox>(id).unwrap().state(), TextBoxState::Idle);
}

#[test]
fn panel_drags_and_closes() {
    let (mut backend, mut ctx) = context();
    let (tree, res) = ctx.split();
    let panel = Panel::create(tree, res, IVec2::new(100, 100), IVec2::new(200, 150), "Settings", Align::UpperLeft)
        .unwrap();
    let checkbox = Checkbox::create(tree, res, IVec2::ZERO, 14, Align::UpperLeft).unwrap();
    Panel::add_element(tree, res, panel, checkbox, "wireframe").unwrap();
    tree.add_root(panel).unwrap();

    // Rows start below the title bar
    let row_top = 100 + 24 + 5;
    assert_eq!(ctx.tree().get(checkbox).unwrap().bounding_box().min.y, row_top);
    assert!(ctx.tree().child(panel, "wireframe_label").is_ok());
    assert!(ctx.tree().child(panel, "wireframe_divider").is_ok());
    assert_eq!(ctx.tree().behaviour::<Panel>(panel).unwrap().used_height(), 24 + 5 + 24);

    // Events reach rows through the panel
    let x = ctx.tree().get(checkbox).unwrap().bounding_box().center().x;
    click(&mut ctx, x, row_top + 5);
    assert!(ctx.tree().behaviour::<Checkbox>(checkbox).unwrap().is_checked());

    let drag = ctx.tree().child(panel, "drag_box").unwrap();
    let grab = ctx.tree().get(drag).unwrap().bounding_box().center();
    ctx.handle_event(&down(grab.x, grab.y)).unwrap();
    ctx.handle_event(&motion((grab.x, grab.y), (grab.x + 10, grab.y + 5))).unwrap();
    ctx.handle_event(&up(grab.x + 10, grab.y + 5)).unwrap();
    assert_eq!(ctx.tree().get(panel).unwrap().bounding_box().min, IVec2::new(110, 105));
    assert_eq!(ctx.tree().get(checkbox).unwrap().bounding_box().min.y, row_top + 5);

    // Close button sits at the right end of the title bar
    let close = ctx.tree().child(panel, "close").unwrap();
    let target = ctx.tree().get(close).unwrap().bounding_box().center();
    assert_eq!(target, IVec2::new(110 + 200 - 12, 105 + 12));
    click(&mut ctx, target.x, target.y);

    assert!(ctx.tree().contains(panel));
    assert_eq!(ctx.tree().pending_len(), 1);
    ctx.frame(&mut backend).unwrap();
    assert!(!ctx.tree().contains(panel));
    assert!(!ctx.tree().contains(checkbox));
    assert!(ctx.tree().is_empty());
}
