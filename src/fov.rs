//! Receptive field ("field of view") propagation.
//!
//! The tracker follows the cumulative downsampling factor of the network and
//! the span of consecutive convolutions within one downsampling block. At a
//! pooling boundary the field of view reached so far is carried into the
//! next block, whose own span then grows in units of the new downsampling.

use crate::config::ConvSpec;

/// Padding and field of view of one convolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvGeometry {
    /// Zero padding keeping the spatial size unchanged.
    pub pad: u64,
    /// Field of view of the layer in input pixels.
    pub fov: u64,
    /// Span of the current block scaled by the downsampling factor.
    pub scaled_base: u64,
    /// Contribution carried over from the previous downsampling blocks.
    /// Negative only when pooling precedes the first convolution.
    pub carried: i128,
}

/// Running field-of-view state of one emission pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FovTracker {
    downsampling: u64,
    fov_base: u64,
    fov_previous: u64,
    fov_prev_downsampling: u64,
}

impl Default for FovTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FovTracker {
    /// Creates the state seen by the first layer after the input.
    pub fn new() -> Self {
        Self {
            downsampling: 1,
            fov_base: 1,
            fov_previous: 1,
            fov_prev_downsampling: 1,
        }
    }

    /// Current cumulative downsampling factor.
    pub fn downsampling(&self) -> u64 {
        self.downsampling
    }

    /// Accounts for a convolution and returns its geometry.
    pub fn conv(&mut self, spec: &ConvSpec) -> ConvGeometry {
        let half = (spec.kernel_size - 1) / 2;
        let pad = match spec.dilation {
            Some(d) => half.saturating_mul(d.saturating_add(1)),
            None => half,
        };

        self.fov_base = self.fov_base.saturating_add(effective_span(spec)) - 1;

        let scaled_base = self.fov_base.saturating_mul(self.downsampling);
        let carried =
            i128::from(self.fov_prev_downsampling) - i128::from(self.downsampling.div_ceil(2));
        // scaled_base >= ds and fov_prev_downsampling >= 1, so the sum stays >= 1.
        let fov = u64::try_from(i128::from(scaled_base) + carried).unwrap_or(u64::MAX);

        self.fov_previous = fov;

        ConvGeometry {
            pad,
            fov,
            scaled_base,
            carried,
        }
    }

    /// Accounts for a 2x2 stride-2 pooling.
    pub fn pool(&mut self) {
        self.downsampling = self.downsampling.saturating_mul(2);
        self.fov_base = 1;
        self.fov_prev_downsampling = self.fov_previous;
    }
}

/// Input extent covered by one kernel, dilation holes included.
pub fn effective_span(spec: &ConvSpec) -> u64 {
    match spec.dilation {
        Some(d) => d.saturating_add(1).saturating_mul(spec.kernel_size - 1).saturating_add(1),
        None => spec.kernel_size,
    }
}
