use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a selector value is interpreted by the browser driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectorKind {
    Css,
    XPath,
    /// Any element whose own text contains the value.
    TextContains,
}

/// A logical UI purpose, independent of the markup that implements it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    StartBooking,
    LoginButton,
    AccountButton,
    PickupButton,
    PickupInput,
    DestButton,
    DestInput,
    Suggestion,
    ConfirmButton,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::StartBooking => "start-booking",
            Role::LoginButton => "login-button",
            Role::AccountButton => "account-button",
            Role::PickupButton => "pickup-button",
            Role::PickupInput => "pickup-input",
            Role::DestButton => "dest-button",
            Role::DestInput => "dest-input",
            Role::Suggestion => "suggestion",
            Role::ConfirmButton => "confirm-button",
        };
        f.write_str(name)
    }
}

/// One typed query in a role's catalogue. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorStrategy {
    pub kind: SelectorKind,
    pub value: &'static str,
    pub role: Role,
}

impl SelectorStrategy {
    pub const fn css(role: Role, value: &'static str) -> Self {
        Self {
            kind: SelectorKind::Css,
            value,
            role,
        }
    }

    pub const fn xpath(role: Role, value: &'static str) -> Self {
        Self {
            kind: SelectorKind::XPath,
            value,
            role,
        }
    }

    pub const fn text(role: Role, value: &'static str) -> Self {
        Self {
            kind: SelectorKind::TextContains,
            value,
            role,
        }
    }
}

impl fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SelectorKind::Css => "css",
            SelectorKind::XPath => "xpath",
            SelectorKind::TextContains => "text",
        };
        write!(f, "{}:{}", kind, self.value)
    }
}

/// Stable identity of a DOM node, used to tell two handles apart without
/// keeping the handles themselves alive across steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey(pub u64);

/// Keys the flow dispatches to inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
}

impl Key {
    pub fn name(self) -> &'static str {
        match self {
            Key::Enter => "Enter",
        }
    }
}

/// States of the booking state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStep {
    AwaitHome,
    LoginCheck,
    PickupPrompt,
    PickupEntry,
    PickupConfirm,
    DestPrompt,
    DestEntry,
    DestConfirm,
    ReadOptions,
    RequestRide,
    Done,
    Failed,
}

impl BookingStep {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStep::Done | BookingStep::Failed)
    }
}

/// Snapshot of the session's login state. Re-derived on every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub authenticated: bool,
    pub last_checked_at: DateTime<Utc>,
}

/// A spoken answer, tagged with the step that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub step: BookingStep,
    pub text: String,
}

impl Utterance {
    /// Trimmed text, or `None` when nothing usable was heard.
    pub fn accepted(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

pub const DEFAULT_START_URL: &str = "https://m.uber.com/go/home";
pub const PROMPT_ATTEMPTS: usize = 3;
