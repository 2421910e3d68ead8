use serde::Serialize;
use thiserror::Error;

use crate::browser::BrowserError;

/// Errors that abort a run. Never spoken; logged with full detail.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("resource fault: {0}")]
    ResourceFault(#[source] BrowserError),

    #[error("{action} failed after {attempts} attempts")]
    RetriesExhausted {
        action: String,
        attempts: u32,
        #[source]
        last: BrowserError,
    },
}

impl From<BrowserError> for FlowError {
    fn from(e: BrowserError) -> Self {
        FlowError::ResourceFault(e)
    }
}

/// Broad class of a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// No usable element after the whole catalogue and escalation chain.
    NotFound,
    /// Nothing intelligible heard after every prompt.
    EmptyInput,
}

/// Why a run ended in FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    PickupNotHeard,
    DestinationNotHeard,
    PickupInputNotFound,
    DestinationInputNotFound,
}

impl FailureReason {
    pub fn kind(self) -> FailureKind {
        match self {
            FailureReason::PickupNotHeard | FailureReason::DestinationNotHeard => {
                FailureKind::EmptyInput
            }
            FailureReason::PickupInputNotFound | FailureReason::DestinationInputNotFound => {
                FailureKind::NotFound
            }
        }
    }

    /// Plain-language explanation spoken to the rider.
    pub fn message(self) -> &'static str {
        match self {
            FailureReason::PickupNotHeard => {
                "I'm sorry, I couldn't understand the pickup location."
            }
            FailureReason::DestinationNotHeard => {
                "I'm sorry, I couldn't understand the destination."
            }
            FailureReason::PickupInputNotFound => {
                "I couldn't find where to enter the pickup location. Please try manually."
            }
            FailureReason::DestinationInputNotFound => {
                "I couldn't find where to enter the destination. Please try manually."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_map_to_taxonomy() {
        assert_eq!(FailureReason::PickupNotHeard.kind(), FailureKind::EmptyInput);
        assert_eq!(
            FailureReason::DestinationInputNotFound.kind(),
            FailureKind::NotFound
        );
    }

    #[test]
    fn fault_keeps_its_source() {
        let err = FlowError::from(BrowserError::Disconnected("ws closed".into()));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("browser session lost: ws closed"));
    }
}
