mod memory;
mod registry;

pub use memory::{MemoryElement, MemoryHost, MemoryNode};
pub use registry::ElementRegistry;

use crate::error::HostError;
use futures::future::LocalBoxFuture;
use serde::Deserialize;
use serde_json::{Map, Value};
use smartstring::{LazyCompact, SmartString};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Opaque handle of a platform node owned by a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Event delivered by the host to a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: SmartString<LazyCompact>,
    pub target: NodeId,
}

/// Listener as the host sees it: already bound to its component.
pub type HostHandler = Rc<dyn Fn(&Event)>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: Option<bool>,
}

/// Registration options for a custom element type (`elementProps`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ElementOptions {
    /// Built-in tag a customized built-in element extends.
    pub extends: Option<String>,
}

/// Resolved implementation of a custom element type.
///
/// The payload is host specific: a host hands these out from
/// [`Host::resolve_element`] and downcasts them again on registration.
#[derive(Clone)]
pub struct ElementImpl {
    source: SmartString<LazyCompact>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ElementImpl {
    pub fn new<T: Any + Send + Sync>(source: impl Into<SmartString<LazyCompact>>, payload: T) -> Self {
        Self {
            source: source.into(),
            payload: Arc::new(payload),
        }
    }

    /// Identifier the implementation was resolved from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn same_as(&self, other: &ElementImpl) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload) || self.source == other.source
    }
}

impl fmt::Debug for ElementImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementImpl")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Platform collaborator that turns component descriptions into live nodes.
///
/// Implementations handle node creation, attribute assignment, event
/// dispatch and custom element registration for their platform (an
/// in-memory tree, the browser DOM, ...). Everything but
/// [`resolve_element`](Host::resolve_element) completes synchronously.
pub trait Host {
    /// Create a detached node for `tag`. Fails for invalid or unregistered tags.
    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError>;

    fn is_element_type_registered(&self, tag: &str) -> bool;

    /// Register `element` under `tag`. A no-op if the tag is already
    /// registered to the same implementation.
    fn register_element_type(
        &mut self,
        tag: &str,
        element: &ElementImpl,
        options: &ElementOptions,
    ) -> Result<(), HostError>;

    /// Resolve an externally named element implementation. May suspend.
    fn resolve_element<'a>(
        &'a mut self,
        identifier: &'a str,
    ) -> LocalBoxFuture<'a, Result<ElementImpl, HostError>>;

    fn set_property(&mut self, node: NodeId, key: &str, value: &Value);

    fn property(&self, node: NodeId, key: &str) -> Option<Value>;

    /// Merge entries into the node's style, keeping the ones not mentioned.
    fn merge_style(&mut self, node: NodeId, style: &Map<String, Value>);

    fn set_data(&mut self, node: NodeId, key: &str, value: &Value);

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: HostHandler,
        options: ListenerOptions,
    );

    /// Append `child` under `parent`, moving it out of any previous parent.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    fn remove_child(&mut self, parent: NodeId, child: NodeId);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;

    /// Fire a payload-free notification named `name` on the node.
    fn dispatch_event(&mut self, node: NodeId, name: &str);

    fn outer_html(&self, node: NodeId) -> String;

    /// The node will never be referenced again.
    fn discard_node(&mut self, node: NodeId);
}
