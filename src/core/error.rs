#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid parameter `{field}`: {message}")]
    InvalidParameter {
        field: &'static str,
        message: String,
    },

    #[error("unknown retirement tax band: {0}")]
    UnknownRetirementBand(String),
}

impl ModelError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            field,
            message: message.into(),
        }
    }
}

pub(crate) fn ensure_rate(field: &'static str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::invalid(field, "must be a finite rate >= 0"));
    }
    Ok(())
}

pub(crate) fn ensure_unit_rate(field: &'static str, value: f64) -> Result<(), ModelError> {
    ensure_rate(field, value)?;
    if value > 1.0 {
        return Err(ModelError::invalid(field, "must be between 0 and 1"));
    }
    Ok(())
}

pub(crate) fn ensure_amount(field: &'static str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::invalid(field, "must be a finite amount >= 0"));
    }
    Ok(())
}
