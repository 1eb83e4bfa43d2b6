//! Range checks for settings that parse but cannot be used.

use tessitura_core::TuningError;
use thiserror::Error;

/// Accepted sample rates, in Hz.
pub const SAMPLE_RATE_RANGE: (u32, u32) = (8_000, 192_000);
/// Accepted buffer sizes, in frames.
pub const BUFFER_SIZE_RANGE: (u32, u32) = (16, 8_192);

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric setting outside its range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted key of the setting, e.g. `synth.volume`.
        field: &'static str,
        /// The value found.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// The `[tuning]` table describes an unusable tuning.
    #[error("invalid tuning: {0}")]
    Tuning(#[from] TuningError),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Collapses a list of problems into one error, if there are any.
    pub fn from_list(mut errors: Vec<ValidationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

/// Records an error unless `value` is in `[min, max]`.
pub(crate) fn check_range(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) {
    if !(min..=max).contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_list_collapses() {
        assert_eq!(ValidationError::from_list(Vec::new()), None);
        let one = ValidationError::Tuning(TuningError::InvalidOctaves);
        assert_eq!(
            ValidationError::from_list(vec![one.clone()]),
            Some(one.clone())
        );
        let many = ValidationError::from_list(vec![one.clone(), one]).unwrap();
        assert!(matches!(many, ValidationError::Multiple(ref v) if v.len() == 2));
        assert!(many.to_string().contains("; "));
    }

    #[test]
    fn test_check_range_is_inclusive() {
        let mut errors = Vec::new();
        check_range(&mut errors, "synth.volume", 1.0, 0.0, 1.0);
        check_range(&mut errors, "synth.volume", 0.0, 0.0, 1.0);
        assert!(errors.is_empty());
        check_range(&mut errors, "synth.volume", 1.5, 0.0, 1.0);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "'synth.volume' value 1.5 out of range [0, 1]"
        );
    }
}
