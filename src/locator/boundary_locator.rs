//! Boundary matching for HTML listings
//!
//! A record block is an element holding exactly one title marker (and an
//! actions marker when one is configured). Blocks are looked up by their
//! container class first; when a redesign renames the container, the walk up
//! from each title marker (then each actions marker) still finds them.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::{default_max_depth, RecordLocator};
use crate::error::SchemaError;
use crate::fragment::{Document, Fragment};
use crate::schema::parse_selector;

#[derive(Debug, Clone)]
pub struct BoundaryLocator {
    container: Option<Selector>,
    title: Selector,
    actions: Option<Selector>,
    max_depth: usize,
}

impl BoundaryLocator {
    pub fn new(title: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            container: None,
            title: parse_selector("locator.title", title)?,
            actions: None,
            max_depth: default_max_depth(),
        })
    }

    pub fn container(mut self, css: &str) -> Result<Self, SchemaError> {
        self.container = Some(parse_selector("locator.container", css)?);
        Ok(self)
    }

    pub fn actions(mut self, css: &str) -> Result<Self, SchemaError> {
        self.actions = Some(parse_selector("locator.actions", css)?);
        Ok(self)
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn qualifies(&self, element: ElementRef<'_>) -> bool {
        if element.select(&self.title).count() != 1 {
            return false;
        }
        match &self.actions {
            Some(actions) => element.select(actions).next().is_some(),
            None => true,
        }
    }

    fn by_container<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        match &self.container {
            Some(container) => html
                .select(container)
                .filter(|el| self.qualifies(*el))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Walk up from every `marker` to its closest qualifying ancestor.
    fn by_walk<'a>(&self, html: &'a Html, marker: &Selector) -> Vec<ElementRef<'a>> {
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();

        for start in html.select(marker) {
            let ancestors = start
                .ancestors()
                .filter_map(ElementRef::wrap)
                .take(self.max_depth);

            for ancestor in ancestors {
                // Encloses several records, stop climbing
                if ancestor.select(&self.title).nth(1).is_some() {
                    break;
                }
                if self.qualifies(ancestor) {
                    if seen.insert((*ancestor).id()) {
                        blocks.push(ancestor);
                    }
                    break;
                }
            }
        }

        blocks
    }
}

impl RecordLocator for BoundaryLocator {
    fn locate<'a>(&self, document: &'a Document) -> Vec<Fragment<'a>> {
        let Document::Html { source, html } = document else {
            debug!(source = %document.source(), "boundary locator skips non-html document");
            return Vec::new();
        };

        let mut blocks = self.by_container(html);
        let mut pass = "container";

        if blocks.is_empty() {
            blocks = self.by_walk(html, &self.title);
            pass = "title";
        }

        if blocks.is_empty() {
            if let Some(actions) = &self.actions {
                blocks = self.by_walk(html, actions);
                pass = "actions";
            }
        }

        if blocks.is_empty() {
            info!(source = %source, "no record blocks found");
        } else {
            debug!(source = %source, pass, count = blocks.len(), "located record blocks");
        }

        blocks.into_iter().map(Fragment::Html).collect()
    }
}
