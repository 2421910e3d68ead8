//! JavaScript evaluated in the page.
//!
//! Element snippets are function declarations run with the element bound to
//! `this` (via `Element::call_js_fn`); page snippets are plain expressions.

use anyhow::Result;
use headless_chrome::Tab;
use headless_chrome::protocol::cdp::Runtime::RemoteObject;
use std::sync::Arc;

/// Rendered, not hidden by style, and with a non-empty box.
pub const IS_VISIBLE_FN: &str = r#"function() {
  if (!this.isConnected) return false;
  const s = getComputedStyle(this);
  if (s.display === 'none' || s.visibility === 'hidden' || s.opacity === '0') return false;
  const r = this.getBoundingClientRect();
  return r.width > 0 && r.height > 0;
}"#;

pub const IS_ENABLED_FN: &str = r#"function() {
  return !this.disabled && this.getAttribute('aria-disabled') !== 'true';
}"#;

pub const INNER_TEXT_FN: &str = r#"function() {
  return (this.innerText || this.value || this.getAttribute('aria-label') || '').trim();
}"#;

/// Script click, so overlays sitting above the element do not swallow it.
pub const CLICK_FN: &str = "function() { this.click(); }";

/// Empties the field and tells the page's framework about it.
pub const CLEAR_FN: &str = r#"function() {
  this.focus();
  const setter = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(this), 'value');
  if (setter && setter.set) { setter.set.call(this, ''); } else { this.value = ''; }
  this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

pub const SCROLL_INTO_VIEW_FN: &str =
    "function() { this.scrollIntoView({ block: 'center', inline: 'center' }); }";

pub const CLICK_VIEWPORT_CENTER_JS: &str = r#"
(() => {
  const el = document.elementFromPoint(window.innerWidth / 2, window.innerHeight / 2);
  if (el) { el.click(); return true; }
  return false;
})()
"#;

/// XPath matching elements whose own text contains `needle`.
pub fn text_contains_xpath(needle: &str) -> String {
    format!("//*[contains(text(), {})]", xpath_literal(needle))
}

/// Quote `s` as an XPath string literal, splitting on quotes where needed.
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{}'", s);
    }
    if !s.contains('"') {
        return format!("\"{}\"", s);
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

pub fn as_bool(obj: &RemoteObject) -> bool {
    obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false)
}

pub fn as_string(obj: &RemoteObject) -> String {
    obj.value
        .as_ref()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

/// Get the current page URL.
pub fn get_current_url(tab: &Arc<Tab>) -> Result<String> {
    let result = tab.evaluate("window.location.href", false)?;
    Ok(result
        .value
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| "unknown".to_string()))
}

/// Get the current page title.
pub fn get_page_title(tab: &Arc<Tab>) -> Result<String> {
    let result = tab.evaluate("document.title", false)?;
    Ok(result
        .value
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| "untitled".to_string()))
}
