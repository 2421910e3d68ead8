//! The browser capability the booking flow drives.
//!
//! The flow never talks to a concrete driver. `hands::ChromeBrowser` is the
//! production implementation; tests use in-memory stubs.

use thiserror::Error;

use crate::types::{Key, NodeKey, SelectorStrategy};

#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser process or its debugging connection is gone.
    #[error("browser session lost: {0}")]
    Disconnected(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("query {selector} failed: {message}")]
    Query { selector: String, message: String },

    #[error("interaction failed: {0}")]
    Interaction(String),
}

impl BrowserError {
    /// Fatal errors abort the run. Everything else is treated as "not found"
    /// by the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrowserError::Disconnected(_))
    }
}

/// A live handle into the current page. Only valid until the DOM changes.
pub trait ElementHandle {
    fn node_key(&self) -> NodeKey;

    /// Errors while probing read as "not visible".
    fn is_visible(&self) -> bool;
    fn is_enabled(&self) -> bool;
    fn text(&self) -> String;

    fn click(&self) -> Result<(), BrowserError>;
    fn clear(&self) -> Result<(), BrowserError>;
    fn type_text(&self, text: &str) -> Result<(), BrowserError>;
    fn scroll_into_view(&self) -> Result<(), BrowserError>;
    fn send_key(&self, key: Key) -> Result<(), BrowserError>;
}

pub trait BrowserHandle {
    type Element<'a>: ElementHandle
    where
        Self: 'a;

    fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// All elements matching `strategy`, in document order.
    fn find_all(&self, strategy: &SelectorStrategy) -> Result<Vec<Self::Element<'_>>, BrowserError>;

    /// Click whatever sits at the centre of the viewport.
    fn click_viewport_center(&self) -> Result<(), BrowserError>;
}
