use thiserror::Error;
use trippilot_core::CoreError;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// An option row handed to the assembler belongs to another plan.
    #[error("{kind} option {option_id} belongs to plan {option_plan_id}, not {plan_id}")]
    ForeignOption {
        kind: &'static str,
        option_id: Uuid,
        option_plan_id: Uuid,
        plan_id: Uuid,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Typed failure an estimate provider may return instead of a snapshot.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} has no market data for {origin} -> {destination}")]
    NoData {
        provider: String,
        origin: String,
        destination: String,
    },

    #[error("{provider} unavailable: {reason}")]
    Unavailable { provider: String, reason: String },
}
