//! Single-pass compiler from directive lines to prototxt layers.
//!
//! Each pass owns a fresh [`CompilerState`]; the train/val and deploy
//! documents are produced by two independent passes over the same lines so
//! that layer numbering and field-of-view tracking match between them.

pub mod document;

pub use document::{compile, compile_pair, output_paths, CompiledNetwork};

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::{BbType, ConvSpec, Directive, NetConfig};
use crate::error::MaccError;
use crate::fov::FovTracker;
use crate::prototxt::{Document, Entry, Item, Layer, Value};

/// Input blob produced by the data/input layer.
const INPUT_BLOB: &str = "data";

/// Dashes on each side of a downsampling banner.
const SCALE_BANNER_DASHES: usize = 45;

/// Settings of the data layer (train/val) and the input layer (deploy).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DataLayerSettings {
    /// Images per batch.
    pub batch_size: u64,
    /// Network input width in pixels.
    pub width: u64,
    /// Network input height in pixels.
    pub height: u64,
    /// Smallest reference object size used for training crops.
    pub reference_size_min: u64,
    /// Largest reference object size used for training crops.
    pub reference_size_max: u64,
}

impl Default for DataLayerSettings {
    fn default() -> Self {
        Self {
            batch_size: 16,
            width: 256,
            height: 128,
            reference_size_min: 60,
            reference_size_max: 120,
        }
    }
}

/// Options shared by both emission passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    pub bb_type: BbType,
    pub data: DataLayerSettings,
}

impl CompileOptions {
    pub fn new(bb_type: BbType) -> Self {
        Self {
            bb_type,
            data: DataLayerSettings::default(),
        }
    }
}

/// Which of the two documents a pass produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Training/validation network with solver parameters and loss layers.
    TrainVal,
    /// Deployment network with a plain input and box extraction layers.
    Deploy,
}

impl Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Variant::TrainVal => "train_val",
            Variant::Deploy => "deploy",
        }
    }

    fn is_training(&self) -> bool {
        *self == Variant::TrainVal
    }
}

/// A convolution emitted during a pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConvRecord {
    pub name: String,
    pub downsampling: u64,
    pub kernel_size: u64,
    pub num_output: u64,
    pub dilation: Option<u64>,
    pub pad: u64,
    pub fov: u64,
}

/// An accumulator head emitted during a pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccumulatorRecord {
    pub name: String,
    pub scale: u64,
    /// Convolution the head reads from.
    pub bottom: String,
    /// Field of view of `bottom` when the head was emitted.
    pub fov: u64,
    pub ideal_box_size: f64,
    pub num_output: u64,
}

#[derive(Clone, Debug)]
struct ScaleEntry {
    layer: String,
    fov: u64,
}

/// Mutable bookkeeping of one emission pass.
#[derive(Clone, Debug)]
pub struct CompilerState {
    variant: Variant,
    fov: FovTracker,
    previous_layer: String,
    next_conv_id: u64,
    last_in_scale: BTreeMap<u64, ScaleEntry>,
    convs: Vec<ConvRecord>,
    accumulators: Vec<AccumulatorRecord>,
    skipped: Vec<String>,
}

impl CompilerState {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            fov: FovTracker::new(),
            previous_layer: INPUT_BLOB.to_string(),
            next_conv_id: 1,
            last_in_scale: BTreeMap::new(),
            convs: Vec::new(),
            accumulators: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Current cumulative downsampling factor.
    pub fn downsampling(&self) -> u64 {
        self.fov.downsampling()
    }

    /// Convolutions emitted so far.
    pub fn convs(&self) -> &[ConvRecord] {
        &self.convs
    }

    /// Accumulator heads emitted so far, in directive order.
    pub fn accumulators(&self) -> &[AccumulatorRecord] {
        &self.accumulators
    }

    /// Directive lines that produced no layer.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Field of view of the last convolution recorded at `scale`.
    pub fn scale_fov(&self, scale: u64) -> Option<u64> {
        self.last_in_scale.get(&scale).map(|entry| entry.fov)
    }

    /// Banner announcing the current downsampling factor. The dashes stay
    /// fixed, so factors past 999 widen the line.
    pub fn downsampling_banner(&self) -> Item {
        let dashes = "-".repeat(SCALE_BANNER_DASHES);
        Item::Comment(format!("{dashes} x{:3} {dashes} #", self.downsampling()))
    }

    /// Tokenizes one directive line and appends its layers to `doc`.
    pub fn emit_line(
        &mut self,
        line: &str,
        config: &NetConfig,
        opts: &CompileOptions,
        doc: &mut Document,
    ) -> Result<(), MaccError> {
        match Directive::parse(line)? {
            Directive::Conv(spec) => {
                let conv = self.emit_conv(&spec);
                let relu = self.emit_relu();
                doc.push_layer(conv);
                doc.push_layer(relu);
            }
            Directive::Pool => {
                let pool = self.emit_pool();
                doc.push(self.downsampling_banner());
                doc.push_layer(pool);
            }
            Directive::Macc { scale } => {
                let acc = self.emit_macc(scale, line, config, opts)?;
                doc.push_layer(acc);
            }
            Directive::Unrecognized => {
                debug!(directive = line, "skipping unrecognized directive");
                self.skipped.push(line.to_string());
            }
        }
        Ok(())
    }

    fn emit_conv(&mut self, spec: &ConvSpec) -> Layer {
        let downsampling = self.downsampling();
        let name = format!("conv_x{}_{}", downsampling, self.next_conv_id);
        self.next_conv_id += 1;

        let geometry = self.fov.conv(spec);
        let fov = geometry.fov;
        debug!(layer = %name, fov, pad = geometry.pad, "convolution");

        let mut conv_param = vec![
            Entry::field("num_output", spec.num_output),
            Entry::field("kernel_size", spec.kernel_size),
            Entry::field("pad", geometry.pad),
        ];
        if let Some(d) = spec.dilation {
            conv_param.push(Entry::field("dilation", d.saturating_add(1)));
        }

        let layer = Layer::new(name.clone(), "Convolution")
            .comment(format!(
                "{}  FOV {fov} x {fov}  ({}+{}={fov})",
                "-".repeat(23),
                geometry.scaled_base,
                geometry.carried
            ))
            .bottom(self.previous_layer.clone())
            .top(name.clone());
        let layer = self.with_training_params(layer, conv_param);

        self.convs.push(ConvRecord {
            name: name.clone(),
            downsampling,
            kernel_size: spec.kernel_size,
            num_output: spec.num_output,
            dilation: spec.dilation,
            pad: geometry.pad,
            fov,
        });
        self.last_in_scale.insert(
            downsampling,
            ScaleEntry {
                layer: name.clone(),
                fov,
            },
        );
        self.previous_layer = name;

        layer
    }

    fn emit_relu(&self) -> Layer {
        Layer::new(format!("relu_{}", self.previous_layer), "ReLU")
            .bottom(self.previous_layer.clone())
            .top(self.previous_layer.clone())
    }

    fn emit_pool(&mut self) -> Layer {
        self.fov.pool();
        self.next_conv_id = 1;

        let name = format!("pool_x{}", self.downsampling());
        debug!(layer = %name, "pooling");

        let layer = Layer::new(name.clone(), "Pooling")
            .bottom(self.previous_layer.clone())
            .top(name.clone())
            .entry(Entry::block(
                "pooling_param",
                vec![
                    Entry::field("pool", Value::Ident("MAX")),
                    Entry::field("kernel_size", 2u64),
                    Entry::field("stride", 2u64),
                ],
            ));

        self.previous_layer = name;
        layer
    }

    fn emit_macc(
        &mut self,
        scale: u64,
        line: &str,
        config: &NetConfig,
        opts: &CompileOptions,
    ) -> Result<Layer, MaccError> {
        let entry = self
            .last_in_scale
            .get(&scale)
            .cloned()
            .ok_or_else(|| MaccError::UndefinedScale {
                scale,
                line: line.to_string(),
            })?;

        let name = format!("acc_x{}", scale);
        let ideal = config.ideal_box_size(scale);
        let num_output = opts.bb_type.accumulator_channels();
        debug!(layer = %name, scale, fov = entry.fov, ideal, "accumulator");

        let conv_param = vec![
            Entry::field("num_output", num_output),
            Entry::field("kernel_size", 1u64),
        ];

        let layer = Layer::new(name.clone(), "Convolution")
            .comment(format!("{}  ACCUMULATOR", "-".repeat(23)))
            .comment(scale_comment(scale, entry.fov))
            .comment(ideal_size_comment(ideal))
            .bottom(entry.layer.clone())
            .top(name.clone());
        let layer = self.with_training_params(layer, conv_param);

        self.accumulators.push(AccumulatorRecord {
            name,
            scale,
            bottom: entry.layer,
            fov: entry.fov,
            ideal_box_size: ideal,
            num_output,
        });

        Ok(layer)
    }

    /// Adds `convolution_param`, plus learning-rate multipliers and weight
    /// fillers when training.
    fn with_training_params(&self, layer: Layer, mut conv_param: Vec<Entry>) -> Layer {
        if !self.variant.is_training() {
            return layer.entry(Entry::block("convolution_param", conv_param));
        }

        conv_param.push(Entry::block(
            "weight_filler",
            vec![Entry::field("type", "xavier")],
        ));
        conv_param.push(Entry::block(
            "bias_filler",
            vec![
                Entry::field("type", "constant"),
                Entry::field("value", 0u64),
            ],
        ));

        layer
            .entry(lr_param(1, 1))
            .entry(lr_param(2, 0))
            .entry(Entry::block("convolution_param", conv_param))
    }
}

fn lr_param(lr_mult: u64, decay_mult: u64) -> Entry {
    Entry::block(
        "param",
        vec![
            Entry::field("lr_mult", lr_mult),
            Entry::field("decay_mult", decay_mult),
        ],
    )
}

/// `SCALE 1/s  (FOV f x f)` comment shared by accumulator, loss and box layers.
pub(crate) fn scale_comment(scale: u64, fov: u64) -> String {
    format!("{}  SCALE 1/{scale}  (FOV {fov} x {fov})", "-".repeat(23))
}

/// Ideal box size comment; the size is truncated to whole pixels.
pub(crate) fn ideal_size_comment(ideal: f64) -> String {
    let px = ideal.trunc() as u64;
    format!("{}  Ideal bounding box size: {px}x{px} px", "-".repeat(23))
}
