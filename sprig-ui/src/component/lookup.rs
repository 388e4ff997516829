use super::Component;
use crate::error::{Error, Result};
use regex::Regex;
use std::str::FromStr;

/// Anchored name pattern used by [`Component::lookup`].
///
/// In the string form `*` stands for any run of characters and the rest is
/// regular expression syntax, matched against the whole key or name.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let anchored = format!("^{}$", pattern.replace('*', ".*"));
        Regex::new(&anchored)
            .map(Self)
            .map_err(|source| Error::LookupPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.0.is_match(candidate)
    }

    pub fn as_regex(&self) -> &Regex {
        &self.0
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(pattern: &str) -> Result<Self> {
        Self::new(pattern)
    }
}

/// Used as is, without anchoring or wildcard translation.
impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self(regex)
    }
}

impl Component {
    /// Find descendants whose key or declared name matches `pattern`.
    ///
    /// Depth first in child order. A matching child is collected and its
    /// subtree is not searched further.
    pub fn lookup(&self, pattern: &str) -> Result<Vec<Component>> {
        let pattern = Pattern::new(pattern)?;
        let mut found = Vec::new();
        self.lookup_with(&pattern, &mut found);
        Ok(found)
    }

    pub fn lookup_with(&self, pattern: &Pattern, found: &mut Vec<Component>) {
        for (key, child) in self.wrap_children() {
            let name = child.name();
            let matched = pattern.is_match(&key.to_string())
                || (!name.is_empty() && pattern.is_match(&name));

            if matched {
                found.push(child);
            } else {
                child.lookup_with(pattern, found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentDescriptor;

    fn names(found: &[Component]) -> Vec<String> {
        found.iter().map(|c| c.name().to_string()).collect()
    }

    #[test]
    fn test_pattern_wildcards() {
        let pattern = Pattern::new("item-*").unwrap();
        assert!(pattern.is_match("item-"));
        assert!(pattern.is_match("item-42"));
        assert!(!pattern.is_match("an-item-42"));

        let exact: Pattern = "title".parse().unwrap();
        assert!(exact.is_match("title"));
        assert!(!exact.is_match("subtitle"));
    }

    #[test]
    fn test_matching_prunes_branch() {
        let root = Component::new(
            ComponentDescriptor::new("div").child(
                "abc",
                ComponentDescriptor::new("section").child("abd", ComponentDescriptor::new("p")),
            ),
        );

        let found = root.lookup("a*").unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ptr_eq(&root.child("abc").unwrap()));
    }

    #[test]
    fn test_recurses_into_non_matching_children() {
        let root = Component::new(
            ComponentDescriptor::new("div")
                .child(
                    "wrapper",
                    ComponentDescriptor::new("section")
                        .child("abd", ComponentDescriptor::new("p"))
                        .child("zzz", ComponentDescriptor::new("span")),
                )
                .child("abe", ComponentDescriptor::new("em")),
        );

        assert_eq!(names(&root.lookup("a*").unwrap()), vec!["p", "em"]);
    }

    #[test]
    fn test_matches_declared_name_of_positional_child() {
        let root = Component::new(
            ComponentDescriptor::new("ul")
                .push(ComponentDescriptor::new("item-1"))
                .push(ComponentDescriptor::anonymous())
                .push(ComponentDescriptor::new("item-2")),
        );

        assert_eq!(names(&root.lookup("item-*").unwrap()), vec!["item-1", "item-2"]);
        // Positional keys match as their decimal form
        assert_eq!(root.lookup("1").unwrap().len(), 1);
    }

    #[test]
    fn test_zero_padded_keys_stay_distinct() {
        let root = Component::from_value(serde_json::json!({
            "name": "ol",
            "children": {
                "03": { "name": "padded" },
                "3": { "name": "plain" }
            }
        }))
        .unwrap();

        assert_eq!(root.child_keys().len(), 2);
        assert_eq!(names(&root.lookup("03").unwrap()), vec!["padded"]);
        assert_eq!(names(&root.lookup("3").unwrap()), vec!["plain"]);
    }

    #[test]
    fn test_regex_pattern_is_used_verbatim() {
        let root = Component::new(
            ComponentDescriptor::new("div")
                .child("header", ComponentDescriptor::new("h1"))
                .child("footer", ComponentDescriptor::new("p")),
        );

        let mut found = Vec::new();
        root.lookup_with(&Regex::new("^foot").unwrap().into(), &mut found);
        assert_eq!(names(&found), vec!["p"]);
    }

    #[test]
    fn test_malformed_pattern() {
        let root = Component::new(ComponentDescriptor::new("div"));
        let err = root.lookup("a(").unwrap_err();
        assert!(matches!(err, Error::LookupPattern { pattern, .. } if pattern == "a("));
    }
}
