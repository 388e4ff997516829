use super::{ElementImpl, ElementOptions};
use crate::error::HostError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Definition {
    element: ElementImpl,
    options: ElementOptions,
}

/// Write-once-per-name table of custom element types.
///
/// Clones share the same table, so several hosts can model one
/// process-wide registry. `define` checks and inserts under a single lock.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    definitions: Arc<Mutex<HashMap<String, Definition>>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.lock().contains_key(tag)
    }

    /// Define `tag`. Defining the same implementation twice is a no-op;
    /// a different implementation under a taken name is rejected.
    pub fn define(
        &self,
        tag: &str,
        element: &ElementImpl,
        options: &ElementOptions,
    ) -> Result<(), HostError> {
        if !is_valid_custom_name(tag) {
            return Err(HostError::new(format!(
                "`{tag}` is not a valid custom element name"
            )));
        }

        let mut definitions = self.definitions.lock();
        if let Some(existing) = definitions.get(tag) {
            if existing.element.same_as(element) {
                return Ok(());
            }
            return Err(HostError::new(format!(
                "`{tag}` is already defined by `{}`",
                existing.element.source()
            )));
        }

        definitions.insert(
            tag.to_string(),
            Definition {
                element: element.clone(),
                options: options.clone(),
            },
        );
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<ElementImpl> {
        self.definitions
            .lock()
            .get(tag)
            .map(|definition| definition.element.clone())
    }

    pub fn options(&self, tag: &str) -> Option<ElementOptions> {
        self.definitions
            .lock()
            .get(tag)
            .map(|definition| definition.options.clone())
    }

    pub fn len(&self) -> usize {
        self.definitions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Custom element names start with a lowercase ASCII letter and contain a `-`.
pub(crate) fn is_valid_custom_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && tag.contains('-')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
}
