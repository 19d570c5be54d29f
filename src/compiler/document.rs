//! Assembly of the train/val and deploy network definitions.

use std::path::{Path, PathBuf};

use tracing::info;

use super::{
    ideal_size_comment, scale_comment, AccumulatorRecord, CompileOptions, CompilerState,
    ConvRecord, Variant, INPUT_BLOB,
};
use crate::config::NetConfig;
use crate::error::MaccError;
use crate::prototxt::{Document, Entry, Layer, Value};

/// File extension of the generated network definitions.
pub const PROTOTXT_EXTENSION: &str = "prototxt";

/// Label blob produced by the training data layer.
const LABEL_BLOB: &str = "label";

/// Negatives sampled per positive accumulator pixel in the loss.
const NEGATIVE_RATIO: u64 = 30;

/// Overlap tolerance of the loss's bounding box bounds.
const BOUNDS_OVERLAP: f64 = 0.33;

/// Output of one emission pass.
#[derive(Clone, Debug)]
pub struct CompiledNetwork {
    pub variant: Variant,
    pub document: Document,
    pub convs: Vec<ConvRecord>,
    pub accumulators: Vec<AccumulatorRecord>,
    pub skipped: Vec<String>,
}

/// Compiles one document with freshly reset state.
pub fn compile(
    config: &NetConfig,
    opts: &CompileOptions,
    variant: Variant,
) -> Result<CompiledNetwork, MaccError> {
    info!(network = %config.name, variant = variant.name(), "compiling network");

    let mut state = CompilerState::new(variant);
    let mut doc = Document::new(config.name.clone());

    match variant {
        Variant::TrainVal => {
            doc.push_layer(data_layer(opts, "TRAIN"));
            doc.push_layer(data_layer(opts, "TEST"));
        }
        Variant::Deploy => doc.push_layer(input_layer(opts)),
    }

    doc.push_section("NETWORK STRUCTURE");
    doc.push(state.downsampling_banner());

    for line in &config.lines {
        state.emit_line(line, config, opts, &mut doc)?;
    }

    match variant {
        Variant::TrainVal => {
            doc.push_section("LOSS");
            for acc in state.accumulators() {
                doc.push_layer(loss_layer(acc, &state, config, opts));
            }
        }
        Variant::Deploy => {
            doc.push_section("BB");
            for acc in state.accumulators() {
                doc.push_layer(bb_layer(acc, &state, opts));
            }
        }
    }

    Ok(CompiledNetwork {
        variant,
        document: doc,
        convs: state.convs().to_vec(),
        accumulators: state.accumulators().to_vec(),
        skipped: state.skipped().to_vec(),
    })
}

/// Compiles both documents; fails before producing either if one fails.
pub fn compile_pair(
    config: &NetConfig,
    opts: &CompileOptions,
) -> Result<(CompiledNetwork, CompiledNetwork), MaccError> {
    let train_val = compile(config, opts, Variant::TrainVal)?;
    let deploy = compile(config, opts, Variant::Deploy)?;
    Ok((train_val, deploy))
}

/// Paths of the train/val and deploy files of network `name` in `dir`.
pub fn output_paths(dir: &Path, name: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{}_train_val.{}", name, PROTOTXT_EXTENSION)),
        dir.join(format!("{}_deploy.{}", name, PROTOTXT_EXTENSION)),
    )
}

fn data_layer(opts: &CompileOptions, phase: &'static str) -> Layer {
    let data = &opts.data;
    Layer::new(INPUT_BLOB, format!("{}Data", opts.bb_type.layer_prefix()))
        .top(INPUT_BLOB)
        .top(LABEL_BLOB)
        .entries([
            Entry::block("include", vec![Entry::field("phase", Value::Ident(phase))]),
            Entry::block(
                "image_data_param",
                vec![
                    Entry::field("source", ""),
                    Entry::field("batch_size", data.batch_size),
                ],
            ),
            Entry::block(
                "bbtxt_param",
                vec![
                    Entry::field("width", data.width),
                    Entry::field("height", data.height),
                    Entry::field("reference_size_min", data.reference_size_min),
                    Entry::field("reference_size_max", data.reference_size_max),
                ],
            ),
        ])
}

fn input_layer(opts: &CompileOptions) -> Layer {
    let shape: Vec<Entry> = [1, 3, opts.data.height, opts.data.width]
        .into_iter()
        .map(|dim| Entry::field("dim", dim))
        .collect();

    Layer::new(INPUT_BLOB, "Input")
        .top(INPUT_BLOB)
        .entry(Entry::block(
            "input_param",
            vec![Entry::block("shape", shape)],
        ))
}

/// Comments heading loss and box layers. The FOV is looked up at the end of
/// the pass, so it reflects the last convolution at that scale.
fn tail_comments(layer: Layer, acc: &AccumulatorRecord, state: &CompilerState) -> Layer {
    let fov = state.scale_fov(acc.scale).unwrap_or(acc.fov);
    layer
        .comment(scale_comment(acc.scale, fov))
        .comment(ideal_size_comment(acc.ideal_box_size))
}

fn loss_layer(
    acc: &AccumulatorRecord,
    state: &CompilerState,
    config: &NetConfig,
    opts: &CompileOptions,
) -> Layer {
    let name = format!("loss_x{}", acc.scale);
    let layer = Layer::new(
        name.clone(),
        format!("{}Loss", opts.bb_type.layer_prefix()),
    );

    tail_comments(layer, acc, state)
        .bottom(LABEL_BLOB)
        .bottom(acc.name.clone())
        .top(name)
        .entry(Entry::block(
            "accumulator_loss_param",
            vec![
                Entry::field("radius", config.radius),
                Entry::field("downsampling", acc.scale),
                Entry::field("negative_ratio", NEGATIVE_RATIO),
                Entry::field("circle_ratio", config.circle_ratio),
                Entry::field("bounds_overlap", Value::Decimal(BOUNDS_OVERLAP)),
            ],
        ))
}

fn bb_layer(acc: &AccumulatorRecord, state: &CompilerState, opts: &CompileOptions) -> Layer {
    let layer = Layer::new(
        format!("bb_x{}", acc.scale),
        format!("{}BB", opts.bb_type.layer_prefix()),
    );

    tail_comments(layer, acc, state)
        .bottom(acc.name.clone())
        .top(acc.name.clone())
        .entry(Entry::block(
            "bbtxt_bb_param",
            vec![
                Entry::field("ideal_size", acc.ideal_box_size),
                Entry::field("downsampling", acc.scale),
            ],
        ))
}
