#![allow(dead_code)]

use std::collections::BTreeSet;

use maccnet::prototxt::Document;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A directive as generated for property tests.
#[derive(Clone, Debug, PartialEq)]
pub enum GenDirective {
    Conv {
        kernel: u64,
        outputs: u64,
        dilation: Option<u64>,
    },
    Pool,
    Macc {
        scale: u64,
    },
    Junk(String),
}

impl GenDirective {
    pub fn to_line(&self) -> String {
        match self {
            GenDirective::Conv {
                kernel,
                outputs,
                dilation: Some(d),
            } => format!("conv k{kernel} d{d} o{outputs}"),
            GenDirective::Conv {
                kernel,
                outputs,
                dilation: None,
            } => format!("conv k{kernel} o{outputs}"),
            GenDirective::Pool => "pool".to_string(),
            GenDirective::Macc { scale } => format!("macc x{scale}"),
            GenDirective::Junk(line) => line.clone(),
        }
    }
}

pub fn arb_directive() -> BoxedStrategy<GenDirective> {
    prop_oneof![
        6 => (1u64..=7, 1u64..=512, proptest::option::of(0u64..=3)).prop_map(
            |(kernel, outputs, dilation)| GenDirective::Conv {
                kernel,
                outputs,
                dilation,
            }
        ),
        2 => Just(GenDirective::Pool),
        2 => prop::sample::select(vec![1u64, 2, 4, 8, 16])
            .prop_map(|scale| GenDirective::Macc { scale }),
        1 => prop::sample::select(vec!["", "relu", "fc o10", "# note", "cnov k3 o8"])
            .prop_map(|line| GenDirective::Junk(line.to_string())),
    ]
    .boxed()
}

/// Directive sequences whose accumulators only reference scales that
/// already have a convolution.
pub fn arb_valid_directives(max_len: usize) -> BoxedStrategy<Vec<GenDirective>> {
    proptest::collection::vec(arb_directive(), 0..=max_len)
        .prop_map(|directives| {
            let mut downsampling = 1u64;
            let mut scales = BTreeSet::new();
            directives
                .into_iter()
                .filter(|directive| match directive {
                    GenDirective::Conv { .. } => {
                        scales.insert(downsampling);
                        true
                    }
                    GenDirective::Pool => {
                        downsampling *= 2;
                        true
                    }
                    GenDirective::Macc { scale } => scales.contains(scale),
                    GenDirective::Junk(_) => true,
                })
                .collect()
        })
        .boxed()
}

/// Renders a full network description.
pub fn config_text(radius: u64, circle_ratio: f64, directives: &[GenDirective]) -> String {
    let mut text = format!("net\nr{radius} c{circle_ratio}\n");
    for directive in directives {
        text.push_str(&directive.to_line());
        text.push('\n');
    }
    text
}

/// First accumulator scale that has no convolution at the time it appears.
pub fn first_undefined_scale(directives: &[GenDirective]) -> Option<u64> {
    let mut downsampling = 1u64;
    let mut scales = BTreeSet::new();
    for directive in directives {
        match directive {
            GenDirective::Conv { .. } => {
                scales.insert(downsampling);
            }
            GenDirective::Pool => downsampling *= 2,
            GenDirective::Macc { scale } if !scales.contains(scale) => return Some(*scale),
            _ => {}
        }
    }
    None
}

/// Names of the layers both documents share (data, loss and box layers
/// excluded).
pub fn shared_layer_names(doc: &Document) -> Vec<String> {
    doc.layers()
        .map(|layer| layer.name.clone())
        .filter(|name| name != "data" && !name.starts_with("loss_") && !name.starts_with("bb_"))
        .collect()
}
