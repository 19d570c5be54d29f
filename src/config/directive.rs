//! Layer directives and `letter+number` token lookup.

use crate::error::MaccError;

/// Width of the type tag that starts every directive line.
const TAG_LEN: usize = 4;

/// Parameters of a `conv` directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvSpec {
    /// Kernel size (`k`).
    pub kernel_size: u64,
    /// Number of output channels (`o`).
    pub num_output: u64,
    /// Number of holes inserted between kernel taps (`d`). The Caffe
    /// dilation rate is `d + 1`; `None` means a plain convolution.
    pub dilation: Option<u64>,
}

/// One line of the network description, tokenized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Convolution followed by a ReLU.
    Conv(ConvSpec),
    /// 2x2 max pooling with stride 2.
    Pool,
    /// Accumulator head attached to the last convolution at `scale`.
    Macc { scale: u64 },
    /// Anything else. Produces no layer and no error.
    Unrecognized,
}

impl Directive {
    /// Tokenize a directive line.
    ///
    /// The line's leading 4-character tag selects the directive; tokens
    /// after the tag carry its parameters. Lines with an unknown tag (blank
    /// lines included) become [`Directive::Unrecognized`].
    pub fn parse(line: &str) -> Result<Self, MaccError> {
        let (Some(tag), Some(rest)) = (line.get(..TAG_LEN), line.get(TAG_LEN..)) else {
            return Ok(Directive::Unrecognized);
        };
        let tokens: Vec<&str> = rest.split_whitespace().collect();

        match tag {
            "conv" => {
                let num_output = required_uint(&tokens, "o", line)?;
                let kernel_size = required_uint(&tokens, "k", line)?;
                if kernel_size == 0 {
                    return Err(MaccError::InvalidValue {
                        field: "k",
                        context: quoted(line),
                        message: "kernel size must be at least 1".to_string(),
                    });
                }
                let dilation = find_value(&tokens, "d")
                    .map(|raw| parse_uint(raw, "d", &quoted(line)))
                    .transpose()?;

                Ok(Directive::Conv(ConvSpec {
                    kernel_size,
                    num_output,
                    dilation,
                }))
            }
            "pool" => Ok(Directive::Pool),
            "macc" => Ok(Directive::Macc {
                scale: required_uint(&tokens, "x", line)?,
            }),
            _ => Ok(Directive::Unrecognized),
        }
    }
}

/// Find the value of the first token starting with `id`.
///
/// Tokens are a single letter followed by a number, e.g. `o64` or `c0.3`.
pub fn find_value<'a>(tokens: &[&'a str], id: &str) -> Option<&'a str> {
    tokens.iter().find_map(|token| token.strip_prefix(id))
}

/// Parse a non-negative integer value.
///
/// A float spelling is accepted and truncated toward zero (`3.0` and `3.7`
/// both give 3).
pub fn parse_uint(raw: &str, field: &'static str, context: &str) -> Result<u64, MaccError> {
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }

    let value = parse_float(raw, field, context)?;
    if value < 0.0 || value >= u64::MAX as f64 {
        return Err(MaccError::InvalidValue {
            field,
            context: context.to_string(),
            message: format!("expected a non-negative integer, got '{raw}'"),
        });
    }

    Ok(value.trunc() as u64)
}

/// Parse a finite floating-point value.
pub fn parse_float(raw: &str, field: &'static str, context: &str) -> Result<f64, MaccError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(MaccError::InvalidValue {
            field,
            context: context.to_string(),
            message: format!("expected a number, got '{raw}'"),
        }),
    }
}

fn required_uint(tokens: &[&str], field: &'static str, line: &str) -> Result<u64, MaccError> {
    let raw = find_value(tokens, field).ok_or_else(|| MaccError::MissingField {
        field,
        context: quoted(line),
    })?;
    parse_uint(raw, field, &quoted(line))
}

fn quoted(line: &str) -> String {
    format!("\"{}\"", line)
}
