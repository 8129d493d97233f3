//! Clipboard access for text widgets
//!
//! Clipboard failures are logged and swallowed: a paste that cannot read the system
//! clipboard inserts nothing, and a failed copy leaves the clipboard unchanged.

/// Text clipboard
pub trait Clipboard {
    fn get(&mut self) -> String;

    fn set(&mut self, text: &str);
}

/// Process-local clipboard
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    text: String,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn get(&mut self) -> String {
        self.text.clone()
    }

    fn set(&mut self, text: &str) {
        self.text = text.to_string();
    }
}

/// The operating system clipboard
#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard(Option<arboard::Clipboard>);

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    pub fn new() -> Self {
        SystemClipboard(
            arboard::Clipboard::new()
                .map_err(|e| tracing::error!(%e, "unable to initialize clipboard"))
                .ok(),
        )
    }
}

#[cfg(feature = "system-clipboard")]
impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "system-clipboard")]
impl Clipboard for SystemClipboard {
    fn get(&mut self) -> String {
        self.0
            .as_mut()
            .and_then(|inner| {
                inner
                    .get_text()
                    .map_err(|e| tracing::error!(%e, "error getting clipboard text"))
                    .ok()
            })
            .unwrap_or_default()
    }

    fn set(&mut self, text: &str) {
        if let Some(inner) = self.0.as_mut() {
            if let Err(e) = inner.set_text(text) {
                tracing::error!(%e, "error setting clipboard text");
            }
        }
    }
}

/// NUL-terminated UTF-16, the layout native text clipboards exchange
pub fn to_utf16(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode UTF-16 up to the first NUL, replacing unpaired surrogates
pub fn from_utf16(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard() {
        let mut clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.get(), "");
        clipboard.set("copied");
        assert_eq!(clipboard.get(), "copied");
    }

    #[test]
    fn test_utf16_round_trip_stops_at_nul() {
        let units = to_utf16("héllo 🙂");
        assert_eq!(units.last(), Some(&0));
        assert_eq!(from_utf16(&units), "héllo 🙂");

        let mut padded = to_utf16("ab");
        padded.extend([0x63, 0]);
        assert_eq!(from_utf16(&padded), "ab");
    }

    #[test]
    fn test_unpaired_surrogate_is_replaced() {
        assert_eq!(from_utf16(&[0x61, 0xD800, 0x62]), "a\u{FFFD}b");
    }
}
