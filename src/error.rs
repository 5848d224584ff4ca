use core::fmt::{Display, Formatter};

/// All possible errors in this crate
///
/// None of these escape from a filter update. A tick that runs into one of
/// them skips the affected term or is dropped entirely; the variants are only
/// surfaced by the strict constructors and by [`validate`] on the configs.
///
/// [`validate`]: crate::config::GradientDescentConfig::validate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FusionError {
    /// Non-positive or non-finite sample period, or a gain/blend factor out of range.
    /// A filter configured this way is disabled until the value is corrected.
    InvalidConfiguration,
    /// A sensor reading with (near) zero magnitude or non-finite components.
    DegenerateInput,
    /// A quaternion with (near) zero norm where a unit quaternion was required.
    NumericalDegeneracy,
}

impl FusionError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration => "invalid filter configuration",
            Self::DegenerateInput => "degenerate sensor input",
            Self::NumericalDegeneracy => "numerically degenerate quaternion",
        }
    }
}

impl Display for FusionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::error::Error for FusionError {}
