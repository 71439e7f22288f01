// Text rendering of the item list

use crate::item::Item;
use std::io::Write;

/// Render items as `id` / `completed` / `summary` blocks, in order
pub fn render(items: &[Item]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "id:{}\ncompleted:{}\nsummary:{}\n\n",
                item.id.to_hex(),
                item.is_complete,
                item.summary
            )
        })
        .collect()
}

/// A single text display surface
pub trait TextSink {
    /// Replace the displayed text
    fn set_text(&mut self, text: &str);
}

/// In-memory label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    text: String,
    renders: usize,
}

impl Label {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// How many times the text was set
    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl TextSink for Label {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.renders += 1;
    }
}

/// Writes each rendering to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl TextSink for StdoutSink {
    fn set_text(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout leaves nothing to display on
        let _ = out.write_all(text.as_bytes()).and_then(|_| out.flush());
    }
}

impl<S: TextSink + ?Sized> TextSink for &mut S {
    fn set_text(&mut self, text: &str) {
        (**self).set_text(text);
    }
}
