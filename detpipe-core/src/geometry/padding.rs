//! Detection padding specifications.

use std::fmt;
use std::str::FromStr;

use super::PaddingError;

/// How much to grow (or shrink) a detection along one axis.
///
/// Written either as a whole number of pixels (`"10"`, `"-4"`) or as a
/// percentage of the detection's size along that axis (`"25%"`, `"-12.5%"`).
/// The padding is applied on both sides, so `"25%"` makes a box 50% wider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaddingSpec {
    Pixels(i32),
    Percent(f64),
}

impl PaddingSpec {
    /// Parses a padding value. A blank value means no padding.
    pub fn parse(value: &str) -> Result<Self, PaddingError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(PaddingSpec::Pixels(0));
        }
        let invalid = || PaddingError::Invalid {
            value: value.to_string(),
        };

        if let Some(number) = trimmed.strip_suffix('%') {
            if !is_signed_decimal(number) {
                return Err(invalid());
            }
            number.parse::<f64>().map(PaddingSpec::Percent).map_err(|_| invalid())
        } else {
            if !is_signed_integer(trimmed) {
                return Err(invalid());
            }
            trimmed.parse::<i32>().map(PaddingSpec::Pixels).map_err(|_| invalid())
        }
    }

    /// Parses the value of a padding property and rejects percentages that
    /// would shrink every detection to nothing.
    ///
    /// # Arguments
    ///
    /// * `property` - Property name, used in error messages
    /// * `value` - The property value
    ///
    /// # Returns
    ///
    /// * The parsed spec
    /// * `PaddingError::EmptyDetections` for percentages of -50% or less
    pub fn for_property(property: &str, value: &str) -> Result<Self, PaddingError> {
        let spec = Self::parse(value).map_err(|_| PaddingError::InvalidProperty {
            property: property.to_string(),
            value: value.to_string(),
        })?;
        if let PaddingSpec::Percent(percent) = spec {
            if percent <= -50.0 {
                return Err(PaddingError::EmptyDetections {
                    property: property.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(spec)
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            PaddingSpec::Pixels(pixels) => pixels == 0,
            PaddingSpec::Percent(percent) => percent == 0.0,
        }
    }

    /// Pixels added to each side of a box of the given length.
    ///
    /// Never shrinks the box below zero length.
    pub fn offset(&self, length: f64) -> f64 {
        match *self {
            PaddingSpec::Percent(percent) => length * percent.max(-50.0) / 100.0,
            PaddingSpec::Pixels(pixels) => {
                let pixels = f64::from(pixels);
                if length + 2.0 * pixels < 0.0 {
                    length / -2.0
                } else {
                    pixels
                }
            }
        }
    }
}

impl Default for PaddingSpec {
    fn default() -> Self {
        PaddingSpec::Pixels(0)
    }
}

impl FromStr for PaddingSpec {
    type Err = PaddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PaddingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaddingSpec::Pixels(pixels) => write!(f, "{pixels}"),
            PaddingSpec::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}

fn is_signed_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_signed_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    match unsigned.split_once('.') {
        Some((whole, fraction)) => {
            !whole.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && !fraction.is_empty()
                && fraction.bytes().all(|b| b.is_ascii_digit())
        }
        None => is_signed_integer(unsigned),
    }
}
