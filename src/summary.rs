//! Run summary printed after generation.
//!
//! The summary can be rendered as text (Display) for the terminal or
//! serialized as JSON for scripting.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::compiler::{
    AccumulatorRecord, CompileOptions, CompiledNetwork, ConvRecord, DataLayerSettings,
};
use crate::config::{BbType, NetConfig};

/// What a generation run produced.
#[derive(Clone, Debug, Serialize)]
pub struct GenerationSummary {
    /// Network name.
    pub name: String,
    /// Flavor of the data, loss and decode layers.
    pub bb_type: BbType,
    /// Accumulator circle radius.
    pub radius: u64,
    /// Circle-to-box ratio.
    pub circle_ratio: f64,
    /// Data/input layer settings.
    pub data: DataLayerSettings,
    /// Convolutions in emission order.
    pub convolutions: Vec<ConvRecord>,
    /// Accumulator heads in directive order.
    pub accumulators: Vec<AccumulatorRecord>,
    /// Directive lines that produced no layer.
    pub skipped_lines: Vec<String>,
    /// Written train/val file.
    pub train_val_path: PathBuf,
    /// Written deploy file.
    pub deploy_path: PathBuf,
}

impl GenerationSummary {
    /// Builds the summary of a compiled pass (both passes carry the same
    /// records) and the files it was written to.
    pub fn new(
        config: &NetConfig,
        opts: &CompileOptions,
        compiled: &CompiledNetwork,
        train_val_path: PathBuf,
        deploy_path: PathBuf,
    ) -> Self {
        Self {
            name: config.name.clone(),
            bb_type: opts.bb_type,
            radius: config.radius,
            circle_ratio: config.circle_ratio,
            data: opts.data,
            convolutions: compiled.convs.clone(),
            accumulators: compiled.accumulators.clone(),
            skipped_lines: compiled.skipped.clone(),
            train_val_path,
            deploy_path,
        }
    }

    /// Largest field of view reached by any convolution.
    pub fn max_fov(&self) -> Option<u64> {
        self.convolutions.iter().map(|conv| conv.fov).max()
    }

    /// Pretty-printed JSON rendering.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for GenerationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Network '{}' ({}, r{} c{})",
            self.name,
            self.bb_type.name(),
            self.radius,
            self.circle_ratio
        )?;
        writeln!(f)?;

        let mut downsampling = 1;
        for conv in &self.convolutions {
            if conv.downsampling != downsampling {
                writeln!(f, "-- Pool (x{})", conv.downsampling)?;
                downsampling = conv.downsampling;
            }
            writeln!(f, "-- {:<14} FOV {} x {}", conv.name, conv.fov, conv.fov)?;
        }
        if let Some(fov) = self.max_fov() {
            writeln!(f, "Largest FOV: {fov} x {fov}")?;
        }

        if !self.accumulators.is_empty() {
            writeln!(f)?;
        }
        for acc in &self.accumulators {
            let px = acc.ideal_box_size.trunc() as u64;
            writeln!(
                f,
                "-- {:<14} SCALE 1/{}  (FOV {} x {}, BB {}x{} px)",
                acc.name, acc.scale, acc.fov, acc.fov, px, px
            )?;
        }

        if !self.skipped_lines.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped {} unrecognized line(s)", self.skipped_lines.len())?;
        }

        writeln!(f)?;
        writeln!(f, "Wrote {}", self.train_val_path.display())?;
        writeln!(f, "Wrote {}", self.deploy_path.display())
    }
}
