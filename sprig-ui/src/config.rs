use serde::Deserialize;

use crate::error::Result;

/// Tree-wide policy knobs, shared by every component materialized through a
/// [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name given to children whose key is numeric or blank and that did not
    /// declare a name of their own.
    pub fallback_name: String,
    /// Appended to the tag of components with an element class when the
    /// name carries no `-` (custom element names require one).
    pub custom_element_suffix: String,
    /// Run pre/post render hooks again on a forced re-render.
    pub rerun_hooks_on_rerender: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fallback_name: "element".to_string(),
            custom_element_suffix: "-element".to_string(),
            rerun_hooks_on_rerender: false,
        }
    }
}

impl Settings {
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}
