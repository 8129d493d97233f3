//! Input events
//!
//! Platform-agnostic pointer and keyboard input. The window glue converts OS events
//! into [`InputEvent`]s; [`PointerState`] tracks which buttons are held so that
//! routers can derive drag signals from plain motion.

use glam::IVec2;

/// Pointer buttons
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// The button that drives clicks and drags
    pub const PRIMARY: MouseButton = MouseButton::Left;

    const fn bit(self) -> u8 {
        match self {
            MouseButton::Left => 0b001,
            MouseButton::Right => 0b010,
            MouseButton::Middle => 0b100,
        }
    }
}

/// Platform-independent key, numbered after the Windows virtual-key table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const UNKNOWN: Self = Self(0);
    pub const BACKSPACE: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const ENTER: Self = Self(0x0D);
    pub const SHIFT: Self = Self(0x10);
    pub const ESCAPE: Self = Self(0x1B);
    pub const SPACE: Self = Self(0x20);
    pub const END: Self = Self(0x23);
    pub const HOME: Self = Self(0x24);
    pub const LEFT: Self = Self(0x25);
    pub const UP: Self = Self(0x26);
    pub const RIGHT: Self = Self(0x27);
    pub const DOWN: Self = Self(0x28);
    pub const DELETE: Self = Self(0x7F);

    pub const A: Self = Self::letter('A');
    pub const C: Self = Self::letter('C');
    pub const D: Self = Self::letter('D');
    pub const S: Self = Self::letter('S');
    pub const V: Self = Self::letter('V');
    pub const W: Self = Self::letter('W');
    pub const X: Self = Self::letter('X');
    pub const Z: Self = Self::letter('Z');

    /// Letter keys share their uppercase ASCII code
    pub const fn letter(c: char) -> Self {
        Self(c.to_ascii_uppercase() as u32)
    }
}

/// Held modifier keys, one bit each
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Self = Self(0);

    const SHIFT: u8 = 1;
    const CTRL: u8 = 1 << 1;
    const ALT: u8 = 1 << 2;
    const META: u8 = 1 << 3;

    pub const fn new(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Self {
        Self(
            (shift as u8) * Self::SHIFT
                | (ctrl as u8) * Self::CTRL
                | (alt as u8) * Self::ALT
                | (meta as u8) * Self::META,
        )
    }

    pub const fn shift(self) -> bool {
        self.0 & Self::SHIFT != 0
    }

    pub const fn ctrl(self) -> bool {
        self.0 & Self::CTRL != 0
    }

    pub const fn alt(self) -> bool {
        self.0 & Self::ALT != 0
    }

    /// Cmd on macOS, the Windows key elsewhere
    pub const fn meta(self) -> bool {
        self.0 & Self::META != 0
    }

    /// The shortcut modifier: Cmd on macOS, Ctrl everywhere else
    pub const fn command(self) -> bool {
        if cfg!(target_os = "macos") {
            self.meta()
        } else {
            self.ctrl()
        }
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A key press
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: Modifiers,
    /// Whether this is an auto-repeat
    pub repeat: bool,
}

impl KeyEvent {
    pub const fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            repeat: false,
        }
    }

    pub const fn plain(key: KeyCode) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

/// Raw input delivered by the window glue
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    MouseDown { pos: IVec2, button: MouseButton },
    MouseUp { pos: IVec2, button: MouseButton },
    /// Pointer motion; `delta` is the movement since the previous position
    MouseMove { pos: IVec2, delta: IVec2 },
    /// Committed text (may be several characters for IME)
    TextInput(String),
    Key(KeyEvent),
    Resize { width: u32, height: u32 },
}

/// Tracks held pointer buttons and the last pointer position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    buttons: u8,
    pub position: IVec2,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_down(&self, button: MouseButton) -> bool {
        self.buttons & button.bit() != 0
    }

    pub fn primary_down(&self) -> bool {
        self.is_down(MouseButton::PRIMARY)
    }

    /// Fold an event into the state
    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::MouseDown { pos, button } => {
                self.buttons |= button.bit();
                self.position = pos;
            }
            InputEvent::MouseUp { pos, button } => {
                self.buttons &= !button.bit();
                self.position = pos;
            }
            InputEvent::MouseMove { pos, .. } => self.position = pos,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers() {
        let m = Modifiers::new(true, true, false, false);
        assert!(m.shift() && m.ctrl());
        assert!(!m.alt() && !m.meta());
        assert!(Modifiers::NONE.is_empty());
        assert_eq!(KeyCode::letter('w'), KeyCode::W);
        assert_eq!(KeyCode::A, KeyCode(0x41));
    }

    #[test]
    fn test_pointer_state_tracks_buttons() {
        let mut state = PointerState::new();
        assert!(!state.primary_down());

        state.apply(&InputEvent::MouseDown {
            pos: IVec2::new(3, 4),
            button: MouseButton::Left,
        });
        assert!(state.primary_down());
        assert!(!state.is_down(MouseButton::Right));
        assert_eq!(state.position, IVec2::new(3, 4));

        state.apply(&InputEvent::MouseMove {
            pos: IVec2::new(9, 9),
            delta: IVec2::new(6, 5),
        });
        assert_eq!(state.position, IVec2::new(9, 9));

        state.apply(&InputEvent::MouseUp {
            pos: IVec2::new(9, 9),
            button: MouseButton::Left,
        });
        assert!(!state.primary_down());
    }
}
