use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(
        "amortization diverges: repayment {repayment_cap} never clears principal {principal} \
         at monthly rate {monthly_rate} (gave up after {months} months)"
    )]
    DivergingAmortization {
        principal: f64,
        monthly_rate: f64,
        repayment_cap: f64,
        months: u32,
    },

    #[error("cannot build a histogram from an empty value sequence")]
    EmptyHistogramInput,
}

impl SimulationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
