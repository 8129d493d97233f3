//! Single-line text entry
//!
//! The text is rendered into one texture held by a `writer` child; scrolling is done
//! by resizing the writer to the visible width and moving its texture coordinates.
//! A `cursor` child under the writer is either a thin caret or, while a range is
//! selected, a translucent box spanning the selection.

use std::collections::VecDeque;
use std::ops::Range;

use tessel_core::{DVec2, IVec2, KeyCode, KeyEvent, MouseButton, Rgba8};
use tessel_render::Texture;
use tessel_text::line_height;

use crate::align::Align;
use crate::context::GuiResources;
use crate::element::ElementDesc;
use crate::error::Result;
use crate::router::{EventCx, Interactive};
use crate::tree::{ElementId, ElementTree};

use super::{impl_as_any, origin, TextCallback};

/// Characters that end a word for Ctrl+arrow movement and Ctrl+Backspace/Delete
const WORD_BREAKS: &str = "!?,.\"$%#@&()~-+*^/(){}[]|\\ \n";

/// Widest text texture the writer will upload
const MAX_TEXT_WIDTH: u32 = 8192;

fn is_break(ch: char) -> bool {
    WORD_BREAKS.contains(ch)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextBoxState {
    #[default]
    Idle,
    Editing,
    /// Editing with a non-empty selection between the anchor and the cursor
    Selecting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    text: Vec<char>,
    cursor: usize,
    anchor: usize,
    selecting: bool,
}

pub struct TextBox {
    state: TextBoxState,
    text: Vec<char>,
    /// Text the writer texture currently shows
    rendered: Option<Vec<char>>,
    advances: Vec<u32>,
    history: VecDeque<Snapshot>,
    undo_limit: usize,
    capacity: usize,

    color: Rgba8,
    text_size: u32,
    blink_frames: u32,
    blink_clock: u32,

    cursor: usize,
    anchor: usize,
    box_width: i32,
    offset: i32,
    net_width: i32,

    writer: ElementId,
    caret: ElementId,
    caret_texture: Texture,
    selection_texture: Texture,

    on_submit: Option<TextCallback>,
    on_update: Option<TextCallback>,
}

impl std::fmt::Debug for TextBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBox")
            .field("state", &self.state)
            .field("text", &self.text())
            .field("cursor", &self.cursor)
            .field("anchor", &self.anchor)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl TextBox {
    /// Box of `size` with text half its height
    pub fn create(
        tree: &mut ElementTree,
        res: &mut GuiResources,
        position: IVec2,
        size: IVec2,
        align: Align,
        default_text: &str,
    ) -> Result<ElementId> {
        let theme = &res.theme;
        let (w, h) = (size.x.max(0) as u32, size.y.max(0) as u32);
        let text_size = (h / 2).max(1);
        let lh = line_height(text_size);
        let padding = res.config.padding;
        let box_width = (size.x - padding * 2).max(0);
        let color = theme.text;

        let background = Texture::solid_box(w, h, theme.background, 0, theme.background);
        let caret_width = (text_size / 14).max(1);
        let caret_texture = Texture::solid_box(caret_width, lh, color, 0, color);
        let selection_texture =
            Texture::solid_box(box_width.max(1) as u32, lh, theme.selection, 0, theme.selection);

        let id = tree.create(ElementDesc::new(background).at(position).align(align).size(size))?;
        let at = origin(tree, id)? + IVec2::new(padding, tree.center_y_offset(id)?);
        let writer = tree.spawn_child(
            id,
            "writer",
            ElementDesc::default()
                .at(at)
                .align(Align::CenterLeft)
                .size(IVec2::new(0, lh as i32)),
        )?;
        let caret = tree.spawn_child(
            writer,
            "cursor",
            ElementDesc::new(caret_texture.clone()).align(Align::CenterLeft).hidden(),
        )?;

        let mut text_box = TextBox {
            state: TextBoxState::Idle,
            text: default_text.chars().collect(),
            rendered: None,
            advances: Vec::new(),
            history: VecDeque::new(),
            undo_limit: res.config.undo_limit.max(1),
            capacity: res.config.text_capacity,
            color,
            text_size,
            blink_frames: res.config.cursor_blink_frames.max(2),
            blink_clock: 0,
            cursor: 0,
            anchor: 0,
            box_width,
            offset: 0,
            net_width: 0,
            writer,
            caret,
            caret_texture,
            selection_texture,
            on_submit: None,
            on_update: None,
        };
        text_box.refresh(tree, res, false)?;
        tree.set_behaviour(id, Box::new(text_box))?;
        Ok(id)
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub fn state(&self) -> TextBoxState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != TextBoxState::Idle
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Fixed end of the selection
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// Selected character range, empty when nothing is selected
    pub fn selection(&self) -> Range<usize> {
        self.cursor.min(self.anchor)..self.cursor.max(self.anchor)
    }

    /// Pixels of text scrolled out on the left
    pub fn scroll_offset(&self) -> i32 {
        self.offset
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Called with the text when Enter is pressed
    pub fn on_submit(&mut self, callback: impl FnMut(&mut EventCx<'_>, &str) -> Result<()> + 'static) {
        self.on_submit = Some(Box::new(callback));
    }

    /// Called with the text after every edit
    pub fn on_update(&mut self, callback: impl FnMut(&mut EventCx<'_>, &str) -> Result<()> + 'static) {
        self.on_update = Some(Box::new(callback));
    }

    /// Replace the text and move the cursor to its end, recording an undo step
    pub fn set_text(&mut self, cx: &mut EventCx<'_>, text: &str) -> Result<()> {
        self.snapshot(false);
        self.text = text.chars().take(self.capacity).collect();
        self.cursor = self.text.len();
        self.anchor = self.cursor;
        self.offset = 0;
        self.refresh(cx.tree, cx.resources, false)?;
        self.notify_update(cx)
    }

    /// Take keyboard focus with the cursor at the end
    pub fn activate(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        if self.state == TextBoxState::Idle {
            self.state = TextBoxState::Editing;
        }
        self.set_cursor(cx.tree, cx.resources, self.text.len(), false)
    }

    /// Drop keyboard focus and any selection
    pub fn deactivate(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        if self.state == TextBoxState::Selecting {
            cx.tree.update_texture(self.caret, &self.caret_texture)?;
        }
        self.anchor = self.cursor;
        self.state = TextBoxState::Idle;
        cx.tree.set_visible(self.caret, false)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────

    fn snapshot(&mut self, selecting: bool) {
        if self.history.len() >= self.undo_limit {
            self.history.pop_front();
        }
        self.history.push_back(Snapshot {
            text: self.text.clone(),
            cursor: self.cursor,
            anchor: self.anchor,
            selecting,
        });
    }

    fn notify_update(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        if let Some(callback) = self.on_update.as_mut() {
            let text: String = self.text.iter().collect();
            callback(cx, &text)?;
        }
        Ok(())
    }

    fn removed_width(&self, range: Range<usize>) -> i32 {
        self.advances.get(range).map_or(0, |a| a.iter().sum::<u32>() as i32)
    }

    /// Delete the selection without recording history
    fn delete_selection(&mut self) {
        let range = self.selection();
        self.offset = (self.offset - self.removed_width(range.clone())).max(0);
        self.cursor = range.start;
        self.anchor = range.start;
        self.text.drain(range);
    }

    /// Type `input` at the cursor, replacing any selection
    ///
    /// Input that would overflow the capacity is dropped and the text left as it was.
    fn insert(&mut self, cx: &mut EventCx<'_>, input: &str) -> Result<()> {
        let selecting = self.state == TextBoxState::Selecting;
        let replaced = if selecting { self.selection().len() } else { 0 };
        let chars: Vec<char> = input.chars().collect();
        if self.text.len() - replaced + chars.len() > self.capacity {
            return Ok(());
        }
        self.snapshot(selecting);
        if selecting {
            self.delete_selection();
        }
        let at = self.cursor;
        self.text.splice(at..at, chars.iter().copied());
        self.cursor += chars.len();
        self.refresh(cx.tree, cx.resources, false)?;
        self.notify_update(cx)
    }

    /// Remove the selection, or `count` characters before the cursor
    fn remove(&mut self, cx: &mut EventCx<'_>, count: usize) -> Result<()> {
        if self.state == TextBoxState::Selecting {
            self.snapshot(true);
            self.delete_selection();
        } else {
            let count = count.min(self.cursor);
            if count == 0 {
                return Ok(());
            }
            self.snapshot(false);
            let range = self.cursor - count..self.cursor;
            self.offset = (self.offset - self.removed_width(range.clone())).max(0);
            self.cursor = range.start;
            self.text.drain(range);
        }
        self.refresh(cx.tree, cx.resources, false)?;
        self.notify_update(cx)
    }

    fn copy(&mut self, cx: &mut EventCx<'_>) {
        let selected: String = self.text[self.selection()].iter().collect();
        cx.resources.clipboard.set(&selected);
    }

    fn paste(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        let pasted = cx.resources.clipboard.get();
        self.insert(cx, &pasted)
    }

    fn undo(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        let Some(last) = self.history.back().cloned() else {
            return Ok(());
        };
        if self.history.len() > 1 {
            self.history.pop_back();
        }
        self.text = last.text;
        self.cursor = last.cursor.min(self.text.len());
        self.anchor = last.anchor.min(self.text.len());
        self.refresh(cx.tree, cx.resources, last.selecting)?;
        self.notify_update(cx)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cursor
    // ─────────────────────────────────────────────────────────────────────────

    fn move_cursor(&mut self, cx: &mut EventCx<'_>, delta: isize, extend: bool) -> Result<()> {
        let mut target = self.cursor.saturating_add_signed(delta);
        if self.state == TextBoxState::Selecting && !extend {
            let range = self.selection();
            target = if delta > 0 { range.end } else { range.start };
        }
        self.set_cursor(cx.tree, cx.resources, target, extend)
    }

    fn set_cursor(&mut self, tree: &mut ElementTree, res: &mut GuiResources, at: usize, extend: bool) -> Result<()> {
        self.cursor = at.min(self.text.len());
        let keep = extend && self.anchor != self.cursor;
        self.refresh(tree, res, keep)
    }

    /// End of the word after the cursor
    fn word_end(&self) -> usize {
        let mut at = self.cursor;
        while at < self.text.len() && !is_break(self.text[at]) {
            at += 1;
        }
        at
    }

    /// Start of the word before the cursor
    fn word_start(&self) -> usize {
        let mut at = self.cursor;
        while at > 0 && !is_break(self.text[at - 1]) {
            at -= 1;
        }
        at
    }

    /// Character index a window x coordinate falls before
    ///
    /// A click on the right half of a character lands after it.
    fn index_at(&self, tree: &ElementTree, x: i32) -> Result<usize> {
        let x = x - tree.get(self.writer)?.bounding_box().min.x;
        let mut left = -self.offset;
        for (i, advance) in self.advances.iter().enumerate() {
            if x <= left + *advance as i32 / 2 {
                return Ok(i);
            }
            left += *advance as i32;
        }
        Ok(self.text.len())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Display
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-render if the text changed, scroll the cursor into view and place the caret
    fn refresh(&mut self, tree: &mut ElementTree, res: &mut GuiResources, keep_selection: bool) -> Result<()> {
        if self.rendered.as_ref() != Some(&self.text) {
            let text: String = self.text.iter().collect();
            let (texture, advances) = res.text_texture(&text, self.text_size, self.color)?;
            let width: u32 = advances.iter().sum();
            if width > MAX_TEXT_WIDTH {
                tracing::warn!("text box content is {}px wide, keeping the previous rendering", width);
            } else {
                self.advances = advances;
                self.net_width = width as i32;
                tree.update_texture(self.writer, &texture)?;
                self.rendered = Some(self.text.clone());
            }
        }

        let caret_x = self.scroll(tree, keep_selection)?;
        tree.set_pos(self.caret, IVec2::new(caret_x, 0))?;
        self.blink_clock = 0;
        tree.set_visible(self.caret, self.is_active())?;

        let visible = self.box_width.min(self.net_width - self.offset).max(0);
        let height = tree.get(self.writer)?.size().y;
        tree.resize(self.writer, IVec2::new(visible, height))?;
        if self.net_width > 0 {
            let net = self.net_width as f64;
            tree.set_tex_coords(
                self.writer,
                DVec2::new(self.offset as f64 / net, 0.0),
                DVec2::new((self.offset + visible) as f64 / net, 1.0),
            )?;
        }
        Ok(())
    }

    fn advance_sum(&self, end: usize) -> i32 {
        self.advances[..end.min(self.advances.len())].iter().sum::<u32>() as i32
    }

    /// Adjust the scroll offset and return the caret x inside the writer
    fn scroll(&mut self, tree: &mut ElementTree, keep_selection: bool) -> Result<i32> {
        if self.net_width - self.offset < self.box_width && self.offset > 0 {
            self.offset = (self.net_width - self.box_width).max(0);
        }

        let mut caret_x = self.advance_sum(self.cursor) - self.offset;
        if caret_x > self.box_width {
            self.offset += caret_x - self.box_width;
            caret_x = self.box_width;
        }
        if caret_x < 0 {
            self.offset += caret_x;
            caret_x = 0;
        }

        if keep_selection {
            let range = self.selection();
            let start = (self.advance_sum(range.start) - self.offset).max(0);
            let end = (self.advance_sum(range.end) - self.offset).min(self.box_width);
            if self.state != TextBoxState::Selecting {
                tree.update_texture(self.caret, &self.selection_texture)?;
                self.state = TextBoxState::Selecting;
            }
            let height = tree.get(self.caret)?.size().y;
            tree.resize(self.caret, IVec2::new((end - start).max(0), height))?;
            caret_x = start;
        } else {
            self.anchor = self.cursor;
            if self.state == TextBoxState::Selecting {
                tree.update_texture(self.caret, &self.caret_texture)?;
                self.state = TextBoxState::Editing;
            }
        }
        Ok(caret_x)
    }
}

impl Interactive for TextBox {
    fn mouse_down(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        if button != MouseButton::PRIMARY {
            return Ok(());
        }
        if cx.tree.get(cx.id())?.bounding_box().contains_inclusive(pos) {
            if self.state == TextBoxState::Idle {
                self.state = TextBoxState::Editing;
            }
            let at = self.index_at(cx.tree, pos.x)?;
            self.set_cursor(cx.tree, cx.resources, at, false)
        } else if self.is_active() {
            self.deactivate(cx)
        } else {
            Ok(())
        }
    }

    fn mouse_drag(&mut self, cx: &mut EventCx<'_>, pos: IVec2, _delta: IVec2) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let at = self.index_at(cx.tree, pos.x)?;
        if at == self.cursor {
            return Ok(());
        }
        self.set_cursor(cx.tree, cx.resources, at, true)
    }

    fn text_input(&mut self, cx: &mut EventCx<'_>, text: &str) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        self.insert(cx, text)
    }

    fn key_input(&mut self, cx: &mut EventCx<'_>, key: KeyEvent) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let extend = key.modifiers.shift();
        let command = key.modifiers.command();
        match key.key {
            KeyCode::BACKSPACE => {
                self.remove(cx, 1)?;
                if command {
                    let count = self.cursor - self.word_start();
                    self.remove(cx, count)?;
                }
            }
            KeyCode::DELETE => {
                if self.state == TextBoxState::Selecting {
                    return self.remove(cx, 0);
                }
                if self.cursor == self.text.len() {
                    return Ok(());
                }
                self.cursor += 1;
                self.remove(cx, 1)?;
                if command {
                    let end = self.word_end();
                    let count = end - self.cursor;
                    self.cursor = end;
                    self.remove(cx, count)?;
                }
            }
            KeyCode::RIGHT => {
                self.move_cursor(cx, 1, extend)?;
                if command {
                    let end = self.word_end();
                    self.set_cursor(cx.tree, cx.resources, end, extend)?;
                }
            }
            KeyCode::LEFT => {
                self.move_cursor(cx, -1, extend)?;
                if command {
                    let start = self.word_start();
                    self.set_cursor(cx.tree, cx.resources, start, extend)?;
                }
            }
            KeyCode::HOME => self.set_cursor(cx.tree, cx.resources, 0, extend)?,
            KeyCode::END => {
                let end = self.text.len();
                self.set_cursor(cx.tree, cx.resources, end, extend)?;
            }
            KeyCode::ENTER => {
                if let Some(callback) = self.on_submit.as_mut() {
                    let text: String = self.text.iter().collect();
                    callback(cx, &text)?;
                }
                self.deactivate(cx)?;
            }
            KeyCode::A if command => {
                self.anchor = 0;
                let end = self.text.len();
                self.set_cursor(cx.tree, cx.resources, end, true)?;
            }
            KeyCode::C if command && self.state == TextBoxState::Selecting => self.copy(cx),
            KeyCode::X if command && self.state == TextBoxState::Selecting => {
                self.copy(cx);
                self.remove(cx, 0)?;
            }
            KeyCode::V if command => self.paste(cx)?,
            KeyCode::Z if command => self.undo(cx)?,
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        if self.state != TextBoxState::Editing {
            return Ok(());
        }
        self.blink_clock += 1;
        if self.blink_clock == self.blink_frames / 2 {
            cx.tree.set_visible(self.caret, false)?;
        }
        if self.blink_clock >= self.blink_frames {
            cx.tree.set_visible(self.caret, true)?;
            self.blink_clock = 0;
        }
        Ok(())
    }

    impl_as_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::Modifiers;
    use tessel_render::AttributeLayout;
    use tessel_text::FixedRasterizer;

    const CTRL: Modifiers = Modifiers::new(false, true, false, false);
    const SHIFT: Modifiers = Modifiers::new(true, false, false, false);

    struct Fixture {
        tree: ElementTree,
        res: GuiResources,
        id: ElementId,
    }

    impl Fixture {
        fn new(text: &str) -> Self {
            let layout = AttributeLayout::new([("position", 2), ("tex_coord", 2)]);
            let mut tree = ElementTree::new(layout, IVec2::new(400, 400)).unwrap();
            let mut res = GuiResources::headless();
            let id = TextBox::create(
                &mut tree,
                &mut res,
                IVec2::new(10, 10),
                IVec2::new(110, 20),
                Align::UpperLeft,
                text,
            )
            .unwrap();
            tree.add_root(id).unwrap();
            let mut fixture = Self { tree, res, id };
            fixture.with(|tb, cx| tb.activate(cx));
            fixture
        }

        fn with<R>(&mut self, f: impl FnOnce(&mut TextBox, &mut EventCx<'_>) -> Result<R>) -> R {
            let mut cx = EventCx::new(&mut self.tree, &mut self.res, Default::default(), self.id);
            cx.with_behaviour::<TextBox, R>(self.id, f).unwrap()
        }

        fn key(&mut self, key: KeyCode, modifiers: Modifiers) {
            self.with(|tb, cx| tb.key_input(cx, KeyEvent::new(key, modifiers)));
        }

        fn type_text(&mut self, text: &str) {
            self.with(|tb, cx| tb.text_input(cx, text));
        }

        fn state(&self) -> (String, usize) {
            let tb = self.tree.behaviour::<TextBox>(self.id).unwrap();
            (tb.text(), tb.cursor())
        }
    }

    #[test]
    fn test_insert_backspace_undo() {
        let mut f = Fixture::new("");
        f.type_text("ab");
        assert_eq!(f.state(), ("ab".to_string(), 2));

        f.key(KeyCode::BACKSPACE, Modifiers::NONE);
        assert_eq!(f.state(), ("a".to_string(), 1));

        f.key(KeyCode::Z, CTRL);
        assert_eq!(f.state(), ("ab".to_string(), 2));

        // The oldest entry stays
        f.key(KeyCode::Z, CTRL);
        f.key(KeyCode::Z, CTRL);
        assert_eq!(f.state(), (String::new(), 0));
        assert_eq!(f.tree.behaviour::<TextBox>(f.id).unwrap().history_len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut f = Fixture::new("");
        for _ in 0..150 {
            f.type_text("x");
        }
        assert_eq!(f.tree.behaviour::<TextBox>(f.id).unwrap().history_len(), 100);
    }

    #[test]
    fn test_capacity_rejects_overflow() {
        let mut f = Fixture::new("");
        f.with(|tb, _| {
            tb.capacity = 3;
            Ok(())
        });
        f.type_text("abcd");
        assert_eq!(f.state(), (String::new(), 0));
        f.type_text("abc");
        assert_eq!(f.state(), ("abc".to_string(), 3));
    }

    #[test]
    fn test_typing_over_selection_undoes_to_the_selection() {
        let mut f = Fixture::new("abcdef");
        f.key(KeyCode::LEFT, SHIFT);
        f.key(KeyCode::LEFT, SHIFT);
        f.type_text("x");
        assert_eq!(f.state(), ("abcdx".to_string(), 5));

        f.key(KeyCode::Z, CTRL);
        let tb = f.tree.behaviour::<TextBox>(f.id).unwrap();
        assert_eq!(tb.text(), "abcdef");
        assert_eq!(tb.selection(), 4..6);
        assert_eq!(tb.state(), TextBoxState::Selecting);
    }

    #[test]
    fn test_overflowing_replacement_keeps_the_selection() {
        let mut f = Fixture::new("abcdef");
        f.with(|tb, _| {
            tb.capacity = 6;
            Ok(())
        });
        f.key(KeyCode::LEFT, SHIFT);
        f.key(KeyCode::LEFT, SHIFT);
        let history = f.tree.behaviour::<TextBox>(f.id).unwrap().history_len();

        f.type_text("xyz");
        let tb = f.tree.behaviour::<TextBox>(f.id).unwrap();
        assert_eq!(tb.text(), "abcdef");
        assert_eq!(tb.selection(), 4..6);
        assert_eq!(tb.history_len(), history);

        f.type_text("xy");
        assert_eq!(f.state(), ("abcdxy".to_string(), 6));
    }

    #[test]
    fn test_word_movement_and_deletion() {
        let mut f = Fixture::new("hello big world");
        assert_eq!(f.state().1, 15);

        f.key(KeyCode::LEFT, CTRL);
        assert_eq!(f.state().1, 10);
        f.key(KeyCode::LEFT, CTRL);
        assert_eq!(f.state().1, 6);

        // The space goes first, then the word before it
        f.key(KeyCode::BACKSPACE, CTRL);
        assert_eq!(f.state(), ("big world".to_string(), 0));

        f.key(KeyCode::DELETE, CTRL);
        assert_eq!(f.state(), (" world".to_string(), 0));
    }

    #[test]
    fn test_select_copy_cut_paste() {
        let mut f = Fixture::new("abcdef");
        f.key(KeyCode::LEFT, SHIFT);
        f.key(KeyCode::LEFT, SHIFT);
        {
            let tb = f.tree.behaviour::<TextBox>(f.id).unwrap();
            assert_eq!(tb.state(), TextBoxState::Selecting);
            assert_eq!(tb.selection(), 4..6);
        }
        // The selection box covers two characters
        let caret = f.tree.behaviour::<TextBox>(f.id).unwrap().caret;
        let advance = FixedRasterizer::advance(10) as i32;
        assert_eq!(f.tree.get(caret).unwrap().size().x, 2 * advance);

        f.key(KeyCode::X, CTRL);
        assert_eq!(f.state(), ("abcd".to_string(), 4));
        assert_eq!(f.res.clipboard.get(), "ef");

        f.key(KeyCode::HOME, Modifiers::NONE);
        f.key(KeyCode::V, CTRL);
        assert_eq!(f.state(), ("efabcd".to_string(), 2));

        f.key(KeyCode::A, CTRL);
        f.key(KeyCode::C, CTRL);
        assert_eq!(f.res.clipboard.get(), "efabcd");
        f.type_text("z");
        assert_eq!(f.state(), ("z".to_string(), 1));
    }

    #[test]
    fn test_arrow_collapses_selection() {
        let mut f = Fixture::new("abcdef");
        f.key(KeyCode::HOME, Modifiers::NONE);
        f.key(KeyCode::RIGHT, SHIFT);
        f.key(KeyCode::RIGHT, SHIFT);
        f.key(KeyCode::LEFT, Modifiers::NONE);
        let tb = f.tree.behaviour::<TextBox>(f.id).unwrap();
        assert_eq!(tb.cursor(), 0);
        assert_eq!(tb.state(), TextBoxState::Editing);
    }

    #[test]
    fn test_long_text_scrolls() {
        // 100px box, 5px glyphs
        let mut f = Fixture::new("");
        f.type_text(&"x".repeat(30));
        let tb = f.tree.behaviour::<TextBox>(f.id).unwrap();
        assert_eq!(tb.scroll_offset(), 50);
        let writer = f.tree.get(tb.writer).unwrap();
        assert_eq!(writer.size().x, 100);
        let (min, max) = writer.tex_coords();
        assert!((min.x - 50.0 / 150.0).abs() < 1e-12);
        assert!((max.x - 1.0).abs() < 1e-12);

        f.key(KeyCode::HOME, Modifiers::NONE);
        assert_eq!(f.tree.behaviour::<TextBox>(f.id).unwrap().scroll_offset(), 0);
    }

    #[test]
    fn test_click_uses_half_advance() {
        let mut f = Fixture::new("abcd");
        // Writer starts at x = 10 + 5, glyphs are 5px wide
        let left = 15;
        let at = |f: &Fixture, x: i32| {
            let tb = f.tree.behaviour::<TextBox>(f.id).unwrap();
            tb.index_at(&f.tree, x).unwrap()
        };
        assert_eq!(at(&f, left + 2), 0);
        assert_eq!(at(&f, left + 3), 1);
        assert_eq!(at(&f, left + 7), 1);
        assert_eq!(at(&f, left + 8), 2);
        assert_eq!(at(&f, left + 100), 4);
    }

    #[test]
    fn test_enter_submits_and_deactivates() {
        let mut f = Fixture::new("go");
        let submitted = std::rc::Rc::new(std::cell::RefCell::new(String::new()));
        let sink = submitted.clone();
        f.with(move |tb, _| {
            tb.on_submit(move |_, text| {
                *sink.borrow_mut() = text.to_string();
                Ok(())
            });
            Ok(())
        });
        f.key(KeyCode::ENTER, Modifiers::NONE);
        assert_eq!(*submitted.borrow(), "go");
        let tb = f.tree.behaviour::<TextBox>(f.id).unwrap();
        assert!(!tb.is_active());
        assert!(!f.tree.get(tb.caret).unwrap().is_visible());

        // Input is ignored while idle
        f.type_text("x");
        assert_eq!(f.state().0, "go");
    }
}
