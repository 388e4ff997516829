use crate::convert::{describe, from_js, to_js};
use futures::future::{FutureExt, LocalBoxFuture};
use js_sys::{Function, Object, Reflect};
use serde_json::{Map, Value};
use sprig_ui::{ElementImpl, ElementOptions, Event, Host, HostError, HostHandler, ListenerOptions, NodeId};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AddEventListenerOptions, CustomEvent, Document, ElementDefinitionOptions};

/// Expando property carrying the host id of an adopted DOM node.
const NODE_ID_KEY: &str = "__sprigNode";

#[wasm_bindgen(inline_js = "export function import_element(path) { \
    return import(path).then(module => class extends module.default {}); \
}")]
extern "C" {
    /// Load `path` and wrap its default export in a fresh subclass, so one
    /// module can back several custom element names.
    fn import_element(path: &str) -> js_sys::Promise;
}

type DomListener = Closure<dyn FnMut(web_sys::Event)>;

/// [`Host`] over the browser DOM.
///
/// Nodes are adopted lazily: anything reachable from a node the host hands
/// out (parents, children created by the page) gets an id the first time it
/// is seen.
pub struct DomHost {
    document: Document,
    nodes: RefCell<HashMap<NodeId, web_sys::Node>>,
    next_id: Cell<u32>,
    /// Nodes handed out by `create_node`; only these outlive removal
    created: HashSet<NodeId>,
    /// Closures stay alive as long as their node is known to the host
    listeners: HashMap<NodeId, Vec<DomListener>>,
    classes: HashMap<String, Function>,
}

impl DomHost {
    pub fn new() -> Result<Self, JsValue> {
        let document = web_sys::window()
            .ok_or("no window")?
            .document()
            .ok_or("no document")?;
        Ok(Self::with_document(document))
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            nodes: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
            created: HashSet::new(),
            listeners: HashMap::new(),
            classes: HashMap::new(),
        }
    }

    /// Id of `node`, registering it with the host if needed.
    pub fn adopt(&self, node: &web_sys::Node) -> NodeId {
        if let Some(id) = Reflect::get(node, &NODE_ID_KEY.into())
            .ok()
            .and_then(|v| v.as_f64())
            .map(|raw| NodeId::from_raw(raw as u32))
        {
            if self.nodes.borrow().contains_key(&id) {
                return id;
            }
        }

        let id = NodeId::from_raw(self.next_id.get());
        self.next_id.set(id.raw() + 1);
        let _ = Reflect::set(node, &NODE_ID_KEY.into(), &JsValue::from(id.raw()));
        self.nodes.borrow_mut().insert(id, node.clone());
        id
    }

    pub fn node(&self, id: NodeId) -> Option<web_sys::Node> {
        self.nodes.borrow().get(&id).cloned()
    }

    pub fn element(&self, id: NodeId) -> Option<web_sys::Element> {
        self.node(id).and_then(|n| n.dyn_into().ok())
    }

    /// Number of DOM nodes the host currently holds an id for.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    fn forget(&self, id: NodeId) -> Option<web_sys::Node> {
        let node = self.nodes.borrow_mut().remove(&id)?;
        let _ = Reflect::delete_property(&node, &NODE_ID_KEY.into());
        Some(node)
    }

    /// Make `constructor` resolvable under `identifier` without an import.
    pub fn provide_class(&mut self, identifier: impl Into<String>, constructor: Function) {
        self.classes.insert(identifier.into(), constructor);
    }

    fn custom_elements(&self) -> Option<web_sys::CustomElementRegistry> {
        self.document.default_view().map(|window| window.custom_elements())
    }
}

impl Host for DomHost {
    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError> {
        let element = self
            .document
            .create_element(tag)
            .map_err(|err| HostError::new(describe(&err)))?;
        tracing::trace!(tag, "created element");
        let id = self.adopt(&element);
        self.created.insert(id);
        Ok(id)
    }

    fn is_element_type_registered(&self, tag: &str) -> bool {
        self.custom_elements()
            .is_some_and(|registry| !registry.get(tag).is_undefined())
    }

    fn register_element_type(
        &mut self,
        tag: &str,
        element: &ElementImpl,
        options: &ElementOptions,
    ) -> Result<(), HostError> {
        let registry = self
            .custom_elements()
            .ok_or_else(|| HostError::new("document has no window"))?;
        let Some(constructor) = self.classes.get(element.source()) else {
            return Err(HostError::new(format!(
                "element class `{}` was not resolved by this host",
                element.source()
            )));
        };

        let existing = registry.get(tag);
        if !existing.is_undefined() {
            if Object::is(&existing, constructor) {
                return Ok(());
            }
            return Err(HostError::new(format!("`{tag}` is already defined")));
        }

        let definition = Object::new();
        if let Some(extends) = &options.extends {
            let _ = Reflect::set(&definition, &"extends".into(), &JsValue::from_str(extends));
        }
        registry
            .define_with_options(tag, constructor, definition.unchecked_ref::<ElementDefinitionOptions>())
            .map_err(|err| HostError::new(describe(&err)))?;
        tracing::debug!(tag, source = element.source(), "registered custom element");
        Ok(())
    }

    fn resolve_element<'a>(
        &'a mut self,
        identifier: &'a str,
    ) -> LocalBoxFuture<'a, Result<ElementImpl, HostError>> {
        async move {
            if !self.classes.contains_key(identifier) {
                let loaded = JsFuture::from(import_element(&format!("{identifier}.js")))
                    .await
                    .map_err(|err| HostError::new(describe(&err)))?;
                let constructor = loaded
                    .dyn_into::<Function>()
                    .map_err(|_| HostError::new(format!("`{identifier}.js` has no default class")))?;
                self.classes.insert(identifier.to_string(), constructor);
            }
            Ok(ElementImpl::new(identifier, ()))
        }
        .boxed_local()
    }

    fn set_property(&mut self, node: NodeId, key: &str, value: &Value) {
        if let Some(target) = self.node(node) {
            if let Err(err) = Reflect::set(&target, &key.into(), &to_js(value)) {
                tracing::warn!(key, error = %describe(&err), "could not set property");
            }
        }
    }

    fn property(&self, node: NodeId, key: &str) -> Option<Value> {
        let target = self.node(node)?;
        Reflect::get(&target, &key.into()).ok().and_then(|v| from_js(&v))
    }

    fn merge_style(&mut self, node: NodeId, style: &Map<String, Value>) {
        let Some(declaration) = self
            .node(node)
            .and_then(|target| Reflect::get(&target, &"style".into()).ok())
            .filter(JsValue::is_object)
        else {
            return;
        };
        for (key, value) in style {
            let _ = Reflect::set(&declaration, &JsValue::from_str(key), &to_js(value));
        }
    }

    fn set_data(&mut self, node: NodeId, key: &str, value: &Value) {
        let Some(dataset) = self
            .node(node)
            .and_then(|target| Reflect::get(&target, &"dataset".into()).ok())
            .filter(JsValue::is_object)
        else {
            return;
        };
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let _ = Reflect::set(&dataset, &key.into(), &text.into());
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: HostHandler,
        options: ListenerOptions,
    ) {
        let Some(target) = self.node(node) else {
            return;
        };

        let name = event.to_string();
        let closure = DomListener::new(move |_: web_sys::Event| {
            handler(&Event {
                name: name.as_str().into(),
                target: node,
            });
        });

        let js_options = Object::new();
        let _ = Reflect::set(&js_options, &"capture".into(), &options.capture.into());
        let _ = Reflect::set(&js_options, &"once".into(), &options.once.into());
        if let Some(passive) = options.passive {
            let _ = Reflect::set(&js_options, &"passive".into(), &passive.into());
        }

        if let Err(err) = target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            closure.as_ref().unchecked_ref(),
            js_options.unchecked_ref::<AddEventListenerOptions>(),
        ) {
            tracing::warn!(event, error = %describe(&err), "could not add listener");
            return;
        }
        self.listeners.entry(node).or_default().push(closure);
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let (Some(parent), Some(child)) = (self.node(parent), self.node(child)) else {
            return;
        };
        if let Err(err) = parent.append_child(&child) {
            tracing::warn!(error = %describe(&err), "could not append child");
        }
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        let child = self.node(node)?.first_child()?;
        Some(self.adopt(&child))
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let (Some(parent_node), Some(child_node)) = (self.node(parent), self.node(child)) else {
            return;
        };
        let _ = parent_node.remove_child(&child_node);
        // Stray nodes adopted while walking the tree are not kept alive
        if !self.created.contains(&child) && !self.listeners.contains_key(&child) {
            self.forget(child);
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent_node()?;
        Some(self.adopt(&parent))
    }

    fn dispatch_event(&mut self, node: NodeId, name: &str) {
        let Some(target) = self.node(node) else {
            return;
        };
        match CustomEvent::new(name) {
            Ok(event) => {
                let _ = target.dispatch_event(&event);
            }
            Err(err) => tracing::warn!(name, error = %describe(&err), "could not create event"),
        }
    }

    fn outer_html(&self, node: NodeId) -> String {
        let Some(target) = self.node(node) else {
            return String::new();
        };
        match target.dyn_ref::<web_sys::Element>() {
            Some(element) => element.outer_html(),
            None => target.text_content().unwrap_or_default(),
        }
    }

    fn discard_node(&mut self, node: NodeId) {
        if let Some(target) = self.forget(node) {
            if let Some(parent) = target.parent_node() {
                let _ = parent.remove_child(&target);
            }
        }
        self.created.remove(&node);
        self.listeners.remove(&node);
    }
}
