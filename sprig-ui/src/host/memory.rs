use super::{ElementImpl, ElementOptions, ElementRegistry, Event, Host, HostHandler, ListenerOptions, NodeId};
use super::registry::is_valid_custom_name;
use crate::error::HostError;
use futures::future::{FutureExt, LocalBoxFuture};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use smartstring::{LazyCompact, SmartString};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// What constructing a registered custom element does to a fresh node.
#[derive(Debug, Clone, Default)]
pub struct MemoryElement {
    pub properties: IndexMap<String, Value>,
    pub style: IndexMap<String, Value>,
}

struct RegisteredListener {
    event: SmartString<LazyCompact>,
    handler: HostHandler,
    options: ListenerOptions,
}

/// A node living in a [`MemoryHost`].
pub struct MemoryNode {
    pub tag: SmartString<LazyCompact>,
    pub properties: IndexMap<String, Value>,
    pub style: IndexMap<String, Value>,
    pub dataset: IndexMap<String, Value>,
    pub children: SmallVec<[NodeId; 4]>,
    pub parent: Option<NodeId>,
    listeners: Vec<RegisteredListener>,
}

impl MemoryNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.into(),
            properties: IndexMap::new(),
            style: IndexMap::new(),
            dataset: IndexMap::new(),
            children: SmallVec::new(),
            parent: None,
            listeners: Vec::new(),
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.iter().filter(|l| l.event == event).count()
    }
}

/// In-memory host: an arena of nodes with DOM-like semantics.
///
/// Used for tests and for rendering trees to markup without a browser.
/// Custom tags (containing `-`) must be registered before creation, named
/// element implementations are looked up in a module table.
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    free_list: Vec<u32>,
    registry: ElementRegistry,
    modules: HashMap<String, ElementImpl>,
    suspend_resolution: bool,
    /// Optional log buffer for testing
    log_buffer: Option<Rc<RefCell<Vec<String>>>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::with_registry(ElementRegistry::new())
    }

    /// Share custom element definitions with other hosts.
    pub fn with_registry(registry: ElementRegistry) -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            registry,
            modules: HashMap::new(),
            suspend_resolution: false,
            log_buffer: None,
        }
    }

    /// Create a MemoryHost that records host operations into `buffer`
    pub fn with_buffer(buffer: Rc<RefCell<Vec<String>>>) -> Self {
        let mut host = Self::new();
        host.log_buffer = Some(buffer);
        host
    }

    /// Make `element` resolvable under `identifier`.
    pub fn provide_module(&mut self, identifier: impl Into<String>, element: ElementImpl) {
        self.modules.insert(identifier.into(), element);
    }

    /// Yield once to the executor before every resolution.
    pub fn set_suspend_resolution(&mut self, suspend: bool) {
        self.suspend_resolution = suspend;
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id.0 as usize).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(id.0 as usize).and_then(|n| n.as_mut())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tag(&self, id: NodeId) -> &str {
        self.node(id).map(|n| n.tag.as_str()).unwrap_or("?")
    }

    fn log(&self, msg: String) {
        tracing::trace!(target: "sprig_ui::host", "{}", msg);
        if let Some(buffer) = &self.log_buffer {
            buffer.borrow_mut().push(msg);
        }
    }

    fn allocate(&mut self, node: MemoryNode) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx as usize] = Some(node);
            NodeId(idx)
        } else {
            self.nodes.push(Some(node));
            NodeId((self.nodes.len() - 1) as u32)
        }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };

        let _ = write!(out, "<{}", node.tag);
        for (key, value) in &node.properties {
            if matches!(key.as_str(), "textContent" | "innerText" | "innerHTML") {
                continue;
            }
            write_attribute(out, attribute_name(key), value);
        }
        if !node.style.is_empty() {
            let css = node
                .style
                .iter()
                .map(|(k, v)| format!("{}: {}", camel_to_kebab(k), plain_text(v)))
                .collect::<Vec<_>>()
                .join("; ");
            write_attribute(out, "style", &Value::String(css));
        }
        for (key, value) in &node.dataset {
            write_attribute(out, &format!("data-{}", camel_to_kebab(key)), value);
        }
        out.push('>');

        if let Some(html) = node.properties.get("innerHTML") {
            out.push_str(&plain_text(html));
        } else if let Some(text) = node
            .properties
            .get("textContent")
            .or_else(|| node.properties.get("innerText"))
        {
            out.push_str(&escape(&plain_text(text)));
        }
        for &child in &node.children {
            self.write_node(child, out);
        }

        let _ = write!(out, "</{}>", node.tag);
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MemoryHost {
    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError> {
        if !is_valid_tag(tag) {
            return Err(HostError::new(format!("`{tag}` is not a valid tag name")));
        }

        let mut node = MemoryNode::new(tag);
        if tag.contains('-') {
            let Some(element) = self.registry.get(tag) else {
                return Err(HostError::new(format!("custom element `{tag}` is not registered")));
            };
            if let Some(effects) = element.downcast_ref::<MemoryElement>() {
                node.properties.extend(effects.properties.clone());
                node.style.extend(effects.style.clone());
            }
        }

        let id = self.allocate(node);
        self.log(format!("create <{tag}>"));
        Ok(id)
    }

    fn is_element_type_registered(&self, tag: &str) -> bool {
        self.registry.is_defined(tag)
    }

    fn register_element_type(
        &mut self,
        tag: &str,
        element: &ElementImpl,
        options: &ElementOptions,
    ) -> Result<(), HostError> {
        self.registry.define(tag, element, options)?;
        self.log(format!("register <{tag}> from {}", element.source()));
        Ok(())
    }

    fn resolve_element<'a>(
        &'a mut self,
        identifier: &'a str,
    ) -> LocalBoxFuture<'a, Result<ElementImpl, HostError>> {
        async move {
            if self.suspend_resolution {
                YieldNow(false).await;
            }
            self.log(format!("resolve {identifier}"));
            self.modules
                .get(identifier)
                .cloned()
                .ok_or_else(|| HostError::new(format!("no element module named `{identifier}`")))
        }
        .boxed_local()
    }

    fn set_property(&mut self, node: NodeId, key: &str, value: &Value) {
        if let Some(n) = self.node_mut(node) {
            n.properties.insert(key.to_string(), value.clone());
        }
    }

    fn property(&self, node: NodeId, key: &str) -> Option<Value> {
        let n = self.node(node)?;
        match key {
            "tagName" => Some(Value::String(n.tag.to_uppercase())),
            _ => n.properties.get(key).cloned(),
        }
    }

    fn merge_style(&mut self, node: NodeId, style: &Map<String, Value>) {
        if let Some(n) = self.node_mut(node) {
            for (key, value) in style {
                n.style.insert(key.clone(), value.clone());
            }
        }
    }

    fn set_data(&mut self, node: NodeId, key: &str, value: &Value) {
        if let Some(n) = self.node_mut(node) {
            n.dataset.insert(key.to_string(), value.clone());
        }
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: HostHandler,
        options: ListenerOptions,
    ) {
        if let Some(n) = self.node_mut(node) {
            n.listeners.push(RegisteredListener {
                event: event.into(),
                handler,
                options,
            });
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        self.log(format!("append <{}> to <{}>", self.tag(child), self.tag(parent)));
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.children.first().copied()
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(child).and_then(|c| c.parent) != Some(parent) {
            return;
        }
        self.detach(child);
        self.log(format!("remove <{}> from <{}>", self.tag(child), self.tag(parent)));
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn dispatch_event(&mut self, node: NodeId, name: &str) {
        let Some(n) = self.node_mut(node) else {
            return;
        };

        let handlers: Vec<HostHandler> = n
            .listeners
            .iter()
            .filter(|l| l.event == name)
            .map(|l| l.handler.clone())
            .collect();
        n.listeners.retain(|l| !(l.event == name && l.options.once));

        self.log(format!("{name} <{}>", self.tag(node)));

        let event = Event {
            name: name.into(),
            target: node,
        };
        for handler in handlers {
            handler(&event);
        }
    }

    fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn discard_node(&mut self, node: NodeId) {
        if self.node(node).is_none() {
            return;
        }
        self.detach(node);
        let children = self
            .node_mut(node)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in children {
            if let Some(c) = self.node_mut(child) {
                c.parent = None;
            }
        }
        self.log(format!("discard <{}>", self.tag(node)));
        self.nodes[node.0 as usize] = None;
        self.free_list.push(node.0);
    }
}

/// Completes on the second poll, waking itself in between.
struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

fn is_valid_tag(tag: &str) -> bool {
    if tag.contains('-') {
        return is_valid_custom_name(tag);
    }
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric())
}

fn attribute_name(key: &str) -> &str {
    match key {
        "className" => "class",
        "htmlFor" => "for",
        other => other,
    }
}

fn write_attribute(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null | Value::Bool(false) => {}
        Value::Bool(true) => {
            let _ = write!(out, " {name}");
        }
        other => {
            let _ = write!(out, " {name}=\"{}\"", escape(&plain_text(other)));
        }
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn camel_to_kebab(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_create_and_reuse_slots() {
        let mut host = MemoryHost::new();
        let a = host.create_node("div").unwrap();
        assert_eq!(a, NodeId(0));

        host.discard_node(a);
        assert!(host.node(a).is_none());

        // Next create should reuse the freed slot
        let b = host.create_node("span").unwrap();
        assert_eq!(a, b);
        assert_eq!(host.node(b).unwrap().tag, "span");
    }

    #[test]
    fn test_invalid_and_unregistered_tags() {
        let mut host = MemoryHost::new();
        assert!(host.create_node("").is_err());
        assert!(host.create_node("1div").is_err());
        assert!(host.create_node("di v").is_err());

        let err = host.create_node("fancy-button").unwrap_err();
        assert!(err.0.contains("not registered"));
        assert!(host.is_empty());
    }

    #[test]
    fn test_registered_element_constructor_effects() {
        let mut host = MemoryHost::new();
        let mut style = IndexMap::new();
        style.insert("fontWeight".to_string(), json!("bold"));
        let element = ElementImpl::new("fancy", MemoryElement { style, ..Default::default() });

        host.register_element_type("fancy-button", &element, &ElementOptions::default())
            .unwrap();
        let node = host.create_node("fancy-button").unwrap();

        assert_eq!(host.node(node).unwrap().style["fontWeight"], json!("bold"));
    }

    #[test]
    fn test_append_moves_between_parents() {
        let mut host = MemoryHost::new();
        let a = host.create_node("div").unwrap();
        let b = host.create_node("div").unwrap();
        let child = host.create_node("span").unwrap();

        host.append_child(a, child);
        host.append_child(b, child);

        assert!(host.children(a).is_empty());
        assert_eq!(host.children(b), &[child]);
        assert_eq!(host.parent_node(child), Some(b));
    }

    #[test]
    fn test_remove_child_requires_parent() {
        let mut host = MemoryHost::new();
        let a = host.create_node("div").unwrap();
        let b = host.create_node("div").unwrap();
        let child = host.create_node("span").unwrap();
        host.append_child(a, child);

        host.remove_child(b, child);
        assert_eq!(host.parent_node(child), Some(a));

        host.remove_child(a, child);
        assert_eq!(host.first_child(a), None);
        assert_eq!(host.parent_node(child), None);
    }

    #[test]
    fn test_style_merge_keeps_existing_entries() {
        let mut host = MemoryHost::new();
        let node = host.create_node("p").unwrap();

        host.merge_style(node, json!({ "fontWeight": "bold" }).as_object().unwrap());
        host.merge_style(node, json!({ "color": "red" }).as_object().unwrap());

        let style = &host.node(node).unwrap().style;
        assert_eq!(style["fontWeight"], json!("bold"));
        assert_eq!(style["color"], json!("red"));
    }

    #[test]
    fn test_outer_html() {
        let mut host = MemoryHost::new();
        let root = host.create_node("div").unwrap();
        let title = host.create_node("h1").unwrap();

        host.set_property(root, "className", &json!("card"));
        host.set_property(root, "hidden", &json!(false));
        host.set_property(root, "draggable", &json!(true));
        host.merge_style(root, json!({ "fontWeight": "bold" }).as_object().unwrap());
        host.set_data(root, "userId", &json!(7));
        host.set_property(title, "textContent", &json!("Fish & <Chips>"));
        host.append_child(root, title);

        assert_eq!(
            host.outer_html(root),
            "<div class=\"card\" draggable style=\"font-weight: bold\" data-user-id=\"7\">\
             <h1>Fish &amp; &lt;Chips&gt;</h1></div>"
        );
    }

    #[test]
    fn test_dispatch_runs_listeners_and_drops_once() {
        let mut host = MemoryHost::new();
        let node = host.create_node("button").unwrap();
        let hits = Rc::new(Cell::new(0));

        let counter = hits.clone();
        host.add_event_listener(
            node,
            "click",
            Rc::new(move |event: &Event| {
                assert_eq!(event.name, "click");
                counter.set(counter.get() + 1);
            }),
            ListenerOptions {
                once: true,
                ..Default::default()
            },
        );

        host.dispatch_event(node, "click");
        host.dispatch_event(node, "click");

        assert_eq!(hits.get(), 1);
        assert_eq!(host.node(node).unwrap().listener_count("click"), 0);
    }

    #[test]
    fn test_resolve_element() {
        let mut host = MemoryHost::new();
        host.provide_module("widgets/fancy", ElementImpl::new("widgets/fancy", ()));
        host.set_suspend_resolution(true);

        let element = block_on(host.resolve_element("widgets/fancy")).unwrap();
        assert_eq!(element.source(), "widgets/fancy");
        assert!(block_on(host.resolve_element("widgets/missing")).is_err());
    }

    #[test]
    fn test_log_buffer() {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        let mut host = MemoryHost::with_buffer(buffer.clone());
        let root = host.create_node("div").unwrap();
        host.dispatch_event(root, "rendered");

        assert_eq!(*buffer.borrow(), vec!["create <div>", "rendered <div>"]);
    }
}
