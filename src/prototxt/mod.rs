//! Caffe network definitions in the protobuf text format.
//!
//! Documents are assembled as a sequence of structured items and rendered
//! once at the end, so the compiler never deals with raw text offsets.

mod layer;

pub use layer::{Entry, Layer, Value};

use std::fmt;

/// Total width of a banner comment line.
const BANNER_WIDTH: usize = 100;

/// One top-level item of a network definition.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    /// `name: "..."` followed by a blank line.
    Name(String),
    /// An empty line.
    Blank,
    /// A free-standing `# ...` line.
    Comment(String),
    /// A `layer { ... }` block.
    Layer(Layer),
}

/// A complete network definition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub items: Vec<Item>,
}

impl Document {
    /// Creates a document starting with the network name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            items: vec![Item::Name(name.into())],
        }
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn push_layer(&mut self, layer: Layer) {
        self.items.push(Item::Layer(layer));
    }

    /// Appends a blank line and a titled banner.
    pub fn push_section(&mut self, title: &str) {
        self.items.push(Item::Blank);
        self.items.push(Item::Comment(banner(title)));
    }

    /// Iterates over the layers in document order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.items.iter().filter_map(|item| match item {
            Item::Layer(layer) => Some(layer),
            _ => None,
        })
    }

    /// Looks up a layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers().find(|layer| layer.name == name)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            match item {
                Item::Name(name) => {
                    writeln!(f, "name: {}", Value::from(name.as_str()))?;
                    writeln!(f)?;
                }
                Item::Blank => writeln!(f)?,
                Item::Comment(text) => writeln!(f, "# {}", text)?,
                Item::Layer(layer) => write!(f, "{}", layer)?,
            }
        }
        Ok(())
    }
}

/// Centers ` title ` in a dashed line, e.g. `---- LOSS ---- #`.
///
/// The returned text excludes the leading `# ` and spans, together with it,
/// [`BANNER_WIDTH`] characters.
pub fn banner(title: &str) -> String {
    let label = format!(" {} ", title);
    let dashes = (BANNER_WIDTH - 4).saturating_sub(label.chars().count());
    let left = dashes / 2;
    let right = dashes - left;
    format!("{}{}{} #", "-".repeat(left), label, "-".repeat(right))
}
