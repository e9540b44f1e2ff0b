//! Contract discovery from the portal's navigation markup.
//!
//! The portal has shipped two layouts of its contract menu. Both link each
//! contract as an anchor whose `title` is the contract label and whose `href`
//! carries the selection token, they only differ in where the anchors live.

use crate::error::ParseError;
use crate::portal::helper::{html_selector, token_from_href};
use scraper::Html;

/// Contract label to selection token, in the order the portal listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractMap {
    entries: Vec<(String, String)>,
}

impl ContractMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a contract unless its label is already known.
    ///
    /// Returns `true` if the entry was new.
    pub fn insert(&mut self, label: impl Into<String>, token: impl Into<String>) -> bool {
        let label = label.into();
        if self.get(&label).is_some() {
            return false;
        }
        self.entries.push((label, token.into()));
        true
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, token)| token.as_str())
    }

    /// First listed contract, used to switch the portal's context.
    pub fn first(&self) -> Option<(&str, &str)> {
        self.entries
            .first()
            .map(|(label, token)| (label.as_str(), token.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(label, _)| label.clone()).collect()
    }
}

/// A portal layout that lists contracts inside one container element.
pub trait ContractExtractor {
    /// Selector of the element holding the contract menu.
    fn container_selector(&self) -> &'static str;

    /// Selector of the contract anchors, relative to the container.
    fn anchor_selector(&self) -> &'static str;

    /// Merges the contracts found in `document` into `contracts`.
    ///
    /// Returns `Ok(None)` when the container is absent, otherwise the number of
    /// new entries. Anchors without a `title` or a `key=` link are skipped.
    fn merge_into(
        &self,
        document: &Html,
        contracts: &mut ContractMap,
    ) -> Result<Option<usize>, ParseError> {
        let container_selector = html_selector(self.container_selector())?;
        let anchor_selector = html_selector(self.anchor_selector())?;

        let Some(container) = document.select(&container_selector).next() else {
            return Ok(None);
        };

        let mut added = 0;
        for anchor in container.select(&anchor_selector) {
            let label = anchor.value().attr("title").map(str::trim);
            let token = anchor.value().attr("href").and_then(token_from_href);
            match (label, token) {
                (Some(label), Some(token)) if !label.is_empty() => {
                    if contracts.insert(label, token) {
                        added += 1;
                    }
                }
                _ => tracing::debug!(
                    "Skipping contract anchor without title or key: {}",
                    anchor.html()
                ),
            }
        }

        Ok(Some(added))
    }
}

/// Older portal release: a collapse menu identified by id.
pub struct LegacyLayout;

impl ContractExtractor for LegacyLayout {
    fn container_selector(&self) -> &'static str {
        "div#contractAccountCollapseMenu"
    }

    fn anchor_selector(&self) -> &'static str {
        "a"
    }
}

/// Current portal release: context-menu entries inside an accordion body.
pub struct CurrentLayout;

impl ContractExtractor for CurrentLayout {
    fn container_selector(&self) -> &'static str {
        "div.accordion-body"
    }

    fn anchor_selector(&self) -> &'static str {
        "a.context-menu-entry"
    }
}

/// Merges the contracts listed in `markup` into `contracts`.
///
/// Tries the current layout first and falls back to the legacy one. A page
/// showing neither menu leaves the map unchanged; single-contract accounts
/// are rendered that way.
pub fn extract_contracts(markup: &str, mut contracts: ContractMap) -> Result<ContractMap, ParseError> {
    let document = Html::parse_document(markup);

    let layouts: [&dyn ContractExtractor; 2] = [&CurrentLayout, &LegacyLayout];
    for layout in layouts {
        if let Some(added) = layout.merge_into(&document, &mut contracts)? {
            tracing::debug!(
                "Found {} new contracts in {}",
                added,
                layout.container_selector()
            );
            break;
        }
    }

    Ok(contracts)
}
