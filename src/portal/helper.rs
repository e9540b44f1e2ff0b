//! Helper functions for reading portal markup.

use crate::error::ParseError;
use scraper::Selector;

/// Creates a CSS selector from a string.
///
/// This is a wrapper around scraper's Selector::parse that converts
/// parsing errors into [`ParseError`] for consistent error handling.
pub fn html_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::invalid_selector(selector, e))
}

/// Extracts the selection token from a contract link.
///
/// The portal links contracts as `dataContextUpdate?key=<token>`; the token is
/// the query value after `key=` up to the next parameter or fragment.
///
/// # Example
///
/// ```no_run
/// let token = token_from_href("/portal/dataContextUpdate?key=a1b2c3&tab=1");
/// assert_eq!(token, Some("a1b2c3"));
/// ```
pub fn token_from_href(href: &str) -> Option<&str> {
    let (_, rest) = href.split_once("key=")?;
    let token = rest.split(['&', '#']).next()?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
