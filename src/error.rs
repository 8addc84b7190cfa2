use thiserror::Error;

/// Rejected construction or configuration input.
///
/// Stepping never fails; everything that could poison the simulation with
/// `NaN`/`Inf` is caught here instead, before it reaches the body list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid body {field}: {value} (must be finite and positive)")]
    InvalidBody { field: &'static str, value: f32 },
    #[error("invalid body {field}: ({x}, {y}) is not finite")]
    NonFiniteVector { field: &'static str, x: f32, y: f32 },
    #[error("invalid config {field}: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

impl SimError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
