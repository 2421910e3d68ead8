//! Voice-driven ride booking on a site whose markup we do not control.
//!
//! The interesting part is the resolution engine: ordered selector
//! catalogues per UI role ([`catalogue`]), one interpreter for them
//! ([`resolver`]), and a state machine that sequences the booking and knows
//! when to fall back or give up ([`orchestrator`]). Browser and voice are
//! traits so the engine can run against stubs.

pub mod assistant;
pub mod auth;
pub mod browser;
pub mod catalogue;
pub mod config;
pub mod dom;
pub mod error;
pub mod face;
pub mod hands;
pub mod launcher;
pub mod orchestrator;
pub mod resolver;
pub mod retry;
pub mod types;
pub mod voice;

pub use browser::{BrowserError, BrowserHandle, ElementHandle};
pub use error::{FailureReason, FlowError};
pub use orchestrator::{BookingOrchestrator, RideHandoff, RunOutcome};
pub use types::{BookingStep, Role, SelectorStrategy};
pub use voice::VoiceChannel;
