use super::{Binding, ChildKey, Component, PropMap};
use crate::document::Document;
use crate::error::{BindingError, Error};
use crate::host::Host;
use serde_json::{Map, Value};

/// Outcome of a property read, tagged with where the value came from.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// An own field or an installed binding.
    Own(Value),
    Child(Component),
    /// A property of the materialized node.
    Node(Value),
    Absent,
}

impl Resolved {
    pub fn is_absent(&self) -> bool {
        matches!(self, Resolved::Absent)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Resolved::Own(value) | Resolved::Node(value) => Some(value),
            Resolved::Child(_) | Resolved::Absent => None,
        }
    }

    pub fn into_child(self) -> Option<Component> {
        match self {
            Resolved::Child(component) => Some(component),
            _ => None,
        }
    }
}

/// Merged property view over a component, its children and its node.
///
/// Reads check, in order: installed bindings and own fields, children under
/// the key, then the host node. A key found nowhere is [`Resolved::Absent`].
pub struct Accessor<'d, H: Host> {
    component: Component,
    doc: &'d Document<H>,
}

impl Component {
    pub fn access<'d, H: Host>(&self, doc: &'d Document<H>) -> Accessor<'d, H> {
        Accessor {
            component: self.clone(),
            doc,
        }
    }
}

impl<'d, H: Host> Accessor<'d, H> {
    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn get(&self, key: &str) -> Result<Resolved, BindingError> {
        if let Some(binding) = self.installed_binding(key) {
            return (binding.get)(&self.component).map(Resolved::Own);
        }
        if let Some(value) = self.own_field(key) {
            return Ok(Resolved::Own(value));
        }
        if let Some(child) = self.find_child(key) {
            return Ok(Resolved::Child(child));
        }

        let from_node = self
            .component
            .node()
            .and_then(|node| self.doc.host().property(node, key));
        Ok(from_node.map_or(Resolved::Absent, Resolved::Node))
    }

    /// Accessor of the child under `key`.
    pub fn child(&self, key: &str) -> Option<Accessor<'d, H>> {
        self.find_child(key).map(|child| child.access(self.doc))
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), BindingError> {
        if let Some(binding) = self.installed_binding(key) {
            return match binding.set {
                Some(set) => set(&self.component, value),
                None => Err(Error::ReadOnlyBinding { key: key.to_string() }.into()),
            };
        }

        let mut state = self.component.0.borrow_mut();
        match (key, value) {
            ("name", Value::String(name)) => state.name = name.into(),
            ("name", _) => return Err(field_type(key, "a string")),
            ("props", Value::Object(map)) => state.props = map.into_iter().collect(),
            ("data", Value::Object(map)) => state.data = map.into_iter().collect(),
            ("props" | "data", _) => return Err(field_type(key, "an object")),
            (_, value) => {
                state.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    fn installed_binding(&self, key: &str) -> Option<Binding> {
        let state = self.component.0.borrow();
        if !state.bindings_installed {
            return None;
        }
        state.bindings.get(key).cloned()
    }

    fn own_field(&self, key: &str) -> Option<Value> {
        let state = self.component.0.borrow();
        match key {
            "name" if !state.name.is_empty() => Some(Value::String(state.name.to_string())),
            "props" => Some(Value::Object(to_object(&state.props))),
            "data" => Some(Value::Object(to_object(&state.data))),
            _ => state.extra.get(key).cloned(),
        }
    }

    fn find_child(&self, key: &str) -> Option<Component> {
        let key = ChildKey::from(key);
        if !self.component.has_child(&key) {
            return None;
        }
        self.component.child(key)
    }
}

fn to_object(map: &PropMap) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn field_type(key: &str, expected: &'static str) -> BindingError {
    Error::FieldType {
        key: key.to_string(),
        expected,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentDescriptor;
    use crate::host::MemoryHost;
    use futures::executor::block_on;
    use serde_json::json;

    fn card() -> Component {
        Component::new(
            ComponentDescriptor::new("section")
                .prop("id", "main")
                .field("title", "own title")
                .child("title", ComponentDescriptor::new("h1"))
                .child("body", ComponentDescriptor::new("p").prop("textContent", "Hello")),
        )
    }

    #[test]
    fn test_own_fields_win_over_children() {
        let mut doc = Document::new(MemoryHost::new());
        let card = card();
        block_on(card.prepare(&mut doc, false)).unwrap();
        // Own field, child and node property all named `title`
        doc.host_mut().set_property(card.node().unwrap(), "title", &json!("node title"));
        assert!(card.has_child("title"));

        let access = card.access(&doc);

        assert!(matches!(access.get("title").unwrap(), Resolved::Own(v) if v == json!("own title")));
        assert!(matches!(access.get("name").unwrap(), Resolved::Own(v) if v == json!("section")));
        assert_eq!(
            access.get("props").unwrap().value(),
            Some(&json!({ "id": "main" }))
        );
    }

    #[test]
    fn test_children_win_over_node() {
        let mut doc = Document::new(MemoryHost::new());
        let card = card();
        block_on(card.prepare(&mut doc, false)).unwrap();
        // A node property named like a child stays hidden behind it
        doc.host_mut().set_property(card.node().unwrap(), "body", &json!("shadowed"));

        let access = card.access(&doc);
        let body = access.get("body").unwrap().into_child().unwrap();
        assert_eq!(body.name(), "p");
    }

    #[test]
    fn test_node_fallback_and_absent() {
        let mut doc = Document::new(MemoryHost::new());
        let card = card();

        assert!(card.access(&doc).get("id").unwrap().is_absent());

        block_on(card.prepare(&mut doc, false)).unwrap();
        let access = card.access(&doc);
        assert!(matches!(access.get("id").unwrap(), Resolved::Node(v) if v == json!("main")));
        assert!(matches!(access.get("tagName").unwrap(), Resolved::Node(v) if v == json!("SECTION")));
        assert!(access.get("missing").unwrap().is_absent());
    }

    #[test]
    fn test_chained_child_access() {
        let mut doc = Document::new(MemoryHost::new());
        let card = card();
        block_on(card.prepare(&mut doc, false)).unwrap();

        let text = card
            .access(&doc)
            .child("body")
            .unwrap()
            .get("textContent")
            .unwrap();
        assert_eq!(text.value(), Some(&json!("Hello")));
        assert!(card.access(&doc).child("missing").is_none());
    }

    #[test]
    fn test_bindings_apply_once_rendered() {
        let mut doc = Document::new(MemoryHost::new());
        let counter = Component::new(
            ComponentDescriptor::new("span")
                .data("count", 1)
                .binding(
                    "count",
                    Binding::new(|c| Ok(c.data("count").unwrap_or(Value::Null)))
                        .with_setter(|c, v| {
                            c.set_data("count", v);
                            Ok(())
                        }),
                ),
        );

        // Not installed yet: plain own-field lookup, nothing under `count`
        assert!(counter.access(&doc).get("count").unwrap().is_absent());

        block_on(counter.prepare(&mut doc, false)).unwrap();
        let access = counter.access(&doc);
        assert_eq!(access.get("count").unwrap().value(), Some(&json!(1)));

        access.set("count", json!(5)).unwrap();
        assert_eq!(access.get("count").unwrap().value(), Some(&json!(5)));
        assert_eq!(counter.field("count"), None);
    }

    #[test]
    fn test_read_only_binding() {
        let mut doc = Document::new(MemoryHost::new());
        let label = Component::new(
            ComponentDescriptor::new("span")
                .binding("upper", Binding::new(|c| Ok(json!(c.name().to_uppercase())))),
        );
        block_on(label.prepare(&mut doc, false)).unwrap();

        let err = label.access(&doc).set("upper", json!("x")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ReadOnlyBinding { key }) if key == "upper"
        ));
    }

    #[test]
    fn test_binding_errors_propagate() {
        let mut doc = Document::new(MemoryHost::new());
        let broken = Component::new(
            ComponentDescriptor::new("span")
                .binding("value", Binding::new(|_| Err("out of range".into()))),
        );
        block_on(broken.prepare(&mut doc, false)).unwrap();

        let err = broken.access(&doc).get("value").unwrap_err();
        assert_eq!(err.to_string(), "out of range");
    }

    #[test]
    fn test_set_own_fields() {
        let doc = Document::new(MemoryHost::new());
        let card = card();
        let access = card.access(&doc);

        access.set("name", json!("article")).unwrap();
        access.set("props", json!({ "id": "other" })).unwrap();
        access.set("role", json!("banner")).unwrap();

        assert_eq!(card.name(), "article");
        assert_eq!(card.prop("id"), Some(json!("other")));
        assert_eq!(card.field("role"), Some(json!("banner")));

        let err = access.set("data", json!(3)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::FieldType { expected: "an object", .. })
        ));
    }
}
