//! Network description parsing.
//!
//! A network description is a small line-oriented text file:
//!
//! ```text
//! my_beautiful_network
//! r1 c0.3
//! conv k3      o64
//! conv k3  d2  o64
//! pool
//! conv k3      o128
//! macc x2
//! ```
//!
//! The first line names the network, the second carries the accumulator
//! circle radius (`r`) and the circle-to-box ratio (`c`). Every following
//! line is a layer directive, kept verbatim here and tokenized into a
//! [`Directive`] when the compiler reaches it.

pub mod directive;

pub use directive::{ConvSpec, Directive};

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::MaccError;

/// Flavor of the data, loss and decode layers of the generated network.
///
/// The two flavors differ in the number of accumulator output channels and
/// in the type prefix of the custom Caffe layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BbType {
    /// 2D bounding boxes (`BBTXT*` layers, 5 accumulator channels).
    Bbtxt,
    /// 3D bounding boxes (`BB3TXT*` layers, 8 accumulator channels).
    Bb3txt,
}

impl BbType {
    /// Human-readable name, as accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            BbType::Bbtxt => "bbtxt",
            BbType::Bb3txt => "bb3txt",
        }
    }

    /// Number of output channels of an accumulator head.
    pub fn accumulator_channels(&self) -> u64 {
        match self {
            BbType::Bbtxt => 5,
            BbType::Bb3txt => 8,
        }
    }

    /// Prefix of the custom layer types (`BBTXTData`, `BB3TXTLoss`, ...).
    pub fn layer_prefix(&self) -> &'static str {
        match self {
            BbType::Bbtxt => "BBTXT",
            BbType::Bb3txt => "BB3TXT",
        }
    }
}

/// A parsed network description.
#[derive(Clone, Debug, PartialEq)]
pub struct NetConfig {
    /// Network name, used in the document header and the output file names.
    pub name: String,
    /// Radius of the circle drawn in the accumulator.
    pub radius: u64,
    /// Size of the accumulator circle relative to max(w, h) of a box.
    pub circle_ratio: f64,
    /// Directive lines in file order, not yet tokenized.
    pub lines: Vec<String>,
}

impl NetConfig {
    /// Ideal bounding box size (in input pixels) of an accumulator at `scale`.
    pub fn ideal_box_size(&self, scale: u64) -> f64 {
        (2.0 * self.radius as f64 + 1.0) * scale as f64 / self.circle_ratio
    }
}

/// Read and parse a network description file.
pub fn read_config(path: &Path) -> Result<NetConfig, MaccError> {
    if !path.is_file() {
        return Err(MaccError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let text = fs::read_to_string(path).map_err(MaccError::Io)?;
    parse_config(&text)
}

/// Parse a network description from text.
pub fn parse_config(text: &str) -> Result<NetConfig, MaccError> {
    let mut lines = text.lines();

    let name = lines.next().unwrap_or_default().to_string();

    let params_line = lines.next().unwrap_or_default();
    let tokens: Vec<&str> = params_line.split_whitespace().collect();
    let context = format!("\"{}\"", params_line);

    let radius = directive::find_value(&tokens, "r")
        .ok_or_else(|| MaccError::MissingField {
            field: "r",
            context: context.clone(),
        })
        .and_then(|raw| directive::parse_uint(raw, "r", &context))?;

    let circle_ratio = directive::find_value(&tokens, "c")
        .ok_or_else(|| MaccError::MissingField {
            field: "c",
            context: context.clone(),
        })
        .and_then(|raw| directive::parse_float(raw, "c", &context))?;

    if !circle_ratio.is_finite() || circle_ratio <= 0.0 {
        return Err(MaccError::InvalidValue {
            field: "c",
            context,
            message: format!("circle ratio must be positive, got {circle_ratio}"),
        });
    }

    Ok(NetConfig {
        name,
        radius,
        circle_ratio,
        lines: lines.map(str::to_string).collect(),
    })
}

/// Fuzz-only entrypoint for network description parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_config(input: &str) -> Result<(), MaccError> {
    let config = parse_config(input)?;
    for line in &config.lines {
        let _ = Directive::parse(line)?;
    }
    Ok(())
}

/// Fuzz-only entrypoint compiling both documents from arbitrary text.
#[cfg(feature = "fuzzing")]
pub fn fuzz_compile_network(input: &str) -> Result<(), MaccError> {
    use crate::compiler::{compile_pair, CompileOptions};

    let config = parse_config(input)?;
    for bb_type in [BbType::Bbtxt, BbType::Bb3txt] {
        let (train_val, deploy) = compile_pair(&config, &CompileOptions::new(bb_type))?;
        let _ = train_val.document.to_string();
        let _ = deploy.document.to_string();
    }
    Ok(())
}
