use std::io::{self, Write};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Write-only clipboard capability supplied by the presentation.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> io::Result<()>;
}

/// Escape sequence asking the terminal to place `text` on the system clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Clipboard backed by the terminal's OSC 52 support.
///
/// Terminals without OSC 52 silently ignore the sequence.
pub struct Osc52Clipboard<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> Osc52Clipboard<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Osc52Clipboard<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Clipboard for Osc52Clipboard<W> {
    fn write_text(&self, text: &str) -> io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "clipboard writer poisoned"))?;
        writer.write_all(osc52_sequence(text).as_bytes())?;
        writer.flush()
    }
}

/// Clipboard that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn write_text(&self, _text: &str) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osc52_wraps_base64_payload() {
        assert_eq!(osc52_sequence("ABCD-1234"), "\x1b]52;c;QUJDRC0xMjM0\x07");
    }

    #[test]
    fn writes_sequence_to_underlying_writer() {
        let clipboard = Osc52Clipboard::new(Vec::new());
        clipboard.write_text("hi").unwrap();
        let written = clipboard.into_inner();
        assert_eq!(String::from_utf8(written).unwrap(), "\x1b]52;c;aGk=\x07");
    }
}
