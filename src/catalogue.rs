//! Ordered selector catalogues, one per role.
//!
//! Each list runs from most to least trustworthy: dedicated test ids first,
//! then ARIA labels and placeholders, then text matches, and finally a
//! catch-all that trades precision for availability. The resolver stops at
//! the first strategy that yields a usable element, so order matters.

use crate::types::{Role, SelectorStrategy};

const START_BOOKING: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::StartBooking, "[data-testid=\"where-to-button\"]"),
    SelectorStrategy::xpath(
        Role::StartBooking,
        "//button[contains(., 'Where to?') or contains(., 'Where to')]",
    ),
];

const LOGIN_BUTTON: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::LoginButton, "[data-testid='header-login-button']"),
    SelectorStrategy::xpath(Role::LoginButton, "//button[contains(text(), 'Log in')]"),
    SelectorStrategy::xpath(Role::LoginButton, "//button[contains(text(), 'Login')]"),
    SelectorStrategy::css(Role::LoginButton, "button.css-dHHA-DQ"),
];

const ACCOUNT_BUTTON: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::AccountButton, "[data-testid='header-account-button']"),
    SelectorStrategy::css(Role::AccountButton, "[aria-label*=\"Account\"]"),
];

const PICKUP_BUTTON: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::PickupButton, "[data-testid=\"pudo-button-pickup\"]"),
    SelectorStrategy::css(Role::PickupButton, "[data-testid=\"pickup-button\"]"),
    SelectorStrategy::css(Role::PickupButton, "[aria-label=\"Pickup location\"]"),
    SelectorStrategy::xpath(Role::PickupButton, "//button[contains(text(), \"Pickup\")]"),
    SelectorStrategy::xpath(Role::PickupButton, "//button[contains(@class, \"pickup\")]"),
    SelectorStrategy::xpath(Role::PickupButton, "//div[contains(@class, \"pickup\")]"),
];

const PICKUP_INPUT: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::PickupInput, "[data-testid=\"pickup-input\"]"),
    SelectorStrategy::css(Role::PickupInput, "input[aria-label*=\"Pickup\"]"),
    SelectorStrategy::css(Role::PickupInput, "input[placeholder=\"Pickup location\"]"),
    SelectorStrategy::css(Role::PickupInput, "input[placeholder=\"Enter pickup location\"]"),
    SelectorStrategy::css(Role::PickupInput, "input[placeholder*=\"Pickup\"]"),
    SelectorStrategy::css(Role::PickupInput, "input[placeholder*=\"Where\"]"),
    SelectorStrategy::css(Role::PickupInput, "input"),
];

const DEST_BUTTON: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::DestButton, "[data-testid=\"pudo-button-destination\"]"),
    SelectorStrategy::css(Role::DestButton, "[data-testid=\"destination-button\"]"),
    SelectorStrategy::css(Role::DestButton, "[aria-label*=\"Destination\"]"),
    SelectorStrategy::xpath(Role::DestButton, "//button[contains(text(), \"Destination\")]"),
    SelectorStrategy::xpath(Role::DestButton, "//button[contains(text(), \"Where to\")]"),
    SelectorStrategy::xpath(Role::DestButton, "//button[contains(@class, \"destination\")]"),
];

// The catch-all only takes empty inputs so a filled pickup field is skipped.
const DEST_INPUT: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::DestInput, "[data-testid=\"destination-input\"]"),
    SelectorStrategy::css(Role::DestInput, "input[aria-label*=\"Destination\"]"),
    SelectorStrategy::css(Role::DestInput, "input[placeholder=\"Dropoff location\"]"),
    SelectorStrategy::css(Role::DestInput, "input[placeholder*=\"Dropoff\"]"),
    SelectorStrategy::css(Role::DestInput, "input[placeholder*=\"Where to\"]"),
    SelectorStrategy::css(Role::DestInput, "input[placeholder*=\"destination\"]"),
    SelectorStrategy::css(Role::DestInput, "input:not([value])"),
];

const SUGGESTION: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::Suggestion, "[data-testid*=\"suggestion\"]"),
    SelectorStrategy::css(Role::Suggestion, "[role=\"option\"]"),
    SelectorStrategy::css(Role::Suggestion, ".autocomplete-result"),
    SelectorStrategy::xpath(Role::Suggestion, "//div[contains(@class, \"suggestion\")]"),
    SelectorStrategy::xpath(Role::Suggestion, "//li[contains(@class, \"suggestion\")]"),
    SelectorStrategy::xpath(Role::Suggestion, "//div[contains(@class, \"autocomplete\")]"),
    SelectorStrategy::xpath(Role::Suggestion, "//div[contains(@class, \"result\")]"),
];

const CONFIRM_BUTTON: &[SelectorStrategy] = &[
    SelectorStrategy::css(Role::ConfirmButton, "[data-testid*=\"confirm\"]"),
    SelectorStrategy::css(Role::ConfirmButton, "button"),
];

/// Elements whose text hints at a hidden destination field.
pub const DESTINATION_REVEAL: &[SelectorStrategy] = &[
    SelectorStrategy::text(Role::DestButton, "Where to"),
    SelectorStrategy::text(Role::DestButton, "Destination"),
    SelectorStrategy::text(Role::DestButton, "Drop-off"),
];

pub const PICKUP_CONFIRM_LABELS: &[&str] = &["confirm", "next", "continue"];
pub const DEST_CONFIRM_LABELS: &[&str] = &["confirm", "next", "continue", "search"];

/// The ordered catalogue for `role`.
pub fn catalogue(role: Role) -> &'static [SelectorStrategy] {
    match role {
        Role::StartBooking => START_BOOKING,
        Role::LoginButton => LOGIN_BUTTON,
        Role::AccountButton => ACCOUNT_BUTTON,
        Role::PickupButton => PICKUP_BUTTON,
        Role::PickupInput => PICKUP_INPUT,
        Role::DestButton => DEST_BUTTON,
        Role::DestInput => DEST_INPUT,
        Role::Suggestion => SUGGESTION,
        Role::ConfirmButton => CONFIRM_BUTTON,
    }
}

/// Every input on the page, attributed to `role` for logging.
pub const fn any_input(role: Role) -> SelectorStrategy {
    SelectorStrategy::css(role, "input")
}
