//! Caffe `layer { ... }` blocks.

use std::fmt;

/// Indentation unit of the prototxt text format.
const INDENT: &str = "  ";

/// A scalar on the right-hand side of `key: value`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Quoted string.
    Str(String),
    /// Unsigned integer.
    Int(u64),
    /// Float, written with six decimals.
    Float(f64),
    /// Float, written in its shortest form (`0.33`).
    Decimal(f64),
    /// Bare enum identifier such as `MAX` or `TRAIN`.
    Ident(&'static str),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:.6}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Ident(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// One line (or nested block) inside a layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    /// `key: value`
    Field(&'static str, Value),
    /// `key { ... }`
    Block(&'static str, Vec<Entry>),
    /// `# text`
    Comment(String),
}

impl Entry {
    /// Shorthand for [`Entry::Field`].
    pub fn field(key: &'static str, value: impl Into<Value>) -> Self {
        Entry::Field(key, value.into())
    }

    /// Shorthand for [`Entry::Block`].
    pub fn block(key: &'static str, entries: Vec<Entry>) -> Self {
        Entry::Block(key, entries)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = INDENT.repeat(depth);
        match self {
            Entry::Field(key, value) => writeln!(f, "{indent}{key}: {value}"),
            Entry::Comment(text) => writeln!(f, "{indent}# {text}"),
            Entry::Block(key, entries) => {
                writeln!(f, "{indent}{key} {{")?;
                for entry in entries {
                    entry.write_indented(f, depth + 1)?;
                }
                writeln!(f, "{indent}}}")
            }
        }
    }
}

/// A named, typed layer with its bindings and parameters.
///
/// Rendering order is fixed: comments, `name`, `type`, `bottom`s, `top`s,
/// then the parameter entries in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Layer name, unique within a document.
    pub name: String,
    /// Caffe layer type (`Convolution`, `ReLU`, ...).
    pub kind: String,
    /// Input blobs.
    pub bottoms: Vec<String>,
    /// Output blobs.
    pub tops: Vec<String>,
    /// Comment lines shown at the top of the block.
    pub comments: Vec<String>,
    /// Parameter entries.
    pub entries: Vec<Entry>,
}

impl Layer {
    /// Creates a layer without bindings or parameters.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            bottoms: Vec::new(),
            tops: Vec::new(),
            comments: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn bottom(mut self, blob: impl Into<String>) -> Self {
        self.bottoms.push(blob.into());
        self
    }

    pub fn top(mut self, blob: impl Into<String>) -> Self {
        self.tops.push(blob.into());
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comments.push(text.into());
        self
    }

    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Looks up a top-level parameter block by key.
    pub fn find_block(&self, key: &str) -> Option<&[Entry]> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Block(k, entries) if *k == key => Some(entries.as_slice()),
            _ => None,
        })
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "layer {{")?;
        for text in &self.comments {
            Entry::Comment(text.clone()).write_indented(f, 1)?;
        }
        Entry::field("name", self.name.as_str()).write_indented(f, 1)?;
        Entry::field("type", self.kind.as_str()).write_indented(f, 1)?;
        for blob in &self.bottoms {
            Entry::field("bottom", blob.as_str()).write_indented(f, 1)?;
        }
        for blob in &self.tops {
            Entry::field("top", blob.as_str()).write_indented(f, 1)?;
        }
        for entry in &self.entries {
            entry.write_indented(f, 1)?;
        }
        writeln!(f, "}}")
    }
}
