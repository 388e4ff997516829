//! Components: lazily materialized element descriptions.
//!
//! A [`Component`] is a shared handle. Cloning it clones the handle, not the
//! component; parents own their children, children point back weakly.

mod accessor;
mod compose;
mod descriptor;
mod lifecycle;
mod lookup;

pub use accessor::{Accessor, Resolved};
pub use compose::Target;
pub use descriptor::{
    Binding, Child, ChildKey, ComponentDescriptor, ElementClass, Getter, Handler, Hook, Listener,
    PropMap, Setter,
};
pub use lifecycle::{RENDERED, RERENDERED};
pub use lookup::Pattern;

use crate::error::Result;
use crate::host::{ElementOptions, NodeId};
use indexmap::IndexMap;
use serde_json::Value;
use smartstring::{LazyCompact, SmartString};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unmaterialized,
    Materializing,
    Materialized,
}

pub(crate) struct ComponentState {
    name: SmartString<LazyCompact>,
    props: PropMap,
    data: PropMap,
    children: IndexMap<ChildKey, Child>,
    listeners: IndexMap<String, Listener>,
    pre_render: IndexMap<String, Hook>,
    post_render: IndexMap<String, Hook>,
    bindings: IndexMap<String, Binding>,
    bindings_installed: bool,
    element_class: Option<ElementClass>,
    element_options: ElementOptions,
    extra: PropMap,
    node: Option<NodeId>,
    parent: Weak<RefCell<ComponentState>>,
    phase: Phase,
}

#[derive(Clone)]
pub struct Component(Rc<RefCell<ComponentState>>);

impl Component {
    pub fn new(descriptor: ComponentDescriptor) -> Self {
        let ComponentDescriptor {
            name,
            props,
            data,
            children,
            listeners,
            pre_render,
            post_render,
            bindings,
            element_class,
            element_options,
            extra,
        } = descriptor;

        Self(Rc::new(RefCell::new(ComponentState {
            name: name.map(SmartString::from).unwrap_or_default(),
            props,
            data,
            children,
            listeners,
            pre_render,
            post_render,
            bindings,
            bindings_installed: false,
            element_class,
            element_options,
            extra,
            node: None,
            parent: Weak::new(),
            phase: Phase::Unmaterialized,
        })))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        ComponentDescriptor::from_value(value).map(Self::new)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        ComponentDescriptor::from_json_str(source).map(Self::new)
    }

    pub(crate) fn from_state(state: Rc<RefCell<ComponentState>>) -> Self {
        Self(state)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<ComponentState>> {
        Rc::downgrade(&self.0)
    }

    /// Name of the component; empty until declared or resolved at attach time.
    pub fn name(&self) -> SmartString<LazyCompact> {
        self.0.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<SmartString<LazyCompact>>) {
        self.0.borrow_mut().name = name.into();
    }

    /// The materialized node, if any.
    pub fn node(&self) -> Option<NodeId> {
        self.0.borrow().node
    }

    pub fn phase(&self) -> Phase {
        self.0.borrow().phase
    }

    pub fn is_materialized(&self) -> bool {
        self.phase() == Phase::Materialized
    }

    pub fn parent(&self) -> Option<Component> {
        self.0.borrow().parent.upgrade().map(Self)
    }

    pub fn prop(&self, key: &str) -> Option<Value> {
        self.0.borrow().props.get(key).cloned()
    }

    /// Takes effect on the node at the next first materialization.
    pub fn set_prop(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().props.insert(key.into(), value.into());
    }

    pub fn data(&self, key: &str) -> Option<Value> {
        self.0.borrow().data.get(key).cloned()
    }

    pub fn set_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().data.insert(key.into(), value.into());
    }

    /// Extra field carried over from the descriptor or set through an accessor.
    pub fn field(&self, key: &str) -> Option<Value> {
        self.0.borrow().extra.get(key).cloned()
    }

    pub fn child(&self, key: impl Into<ChildKey>) -> Option<Component> {
        let key = key.into();
        self.wrap_children()
            .into_iter()
            .find_map(|(k, child)| (k == key).then_some(child))
    }

    pub fn has_child(&self, key: impl Into<ChildKey>) -> bool {
        self.0.borrow().children.contains_key(&key.into())
    }

    pub fn child_keys(&self) -> Vec<ChildKey> {
        self.0.borrow().children.keys().cloned().collect()
    }

    /// Children in map order; pending descriptors are turned into components.
    pub fn children(&self) -> Vec<(ChildKey, Component)> {
        self.wrap_children()
    }

    /// Put `child` in the child map without materializing anything.
    ///
    /// An existing entry under `key` is replaced in place and returned.
    pub fn insert_child(&self, key: impl Into<ChildKey>, child: impl Into<Child>) -> Option<Child> {
        let child = child.into();
        if let Child::Component(component) = &child {
            component.0.borrow_mut().parent = self.downgrade();
        }
        self.0.borrow_mut().children.insert(key.into(), child)
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn wrap_children(&self) -> Vec<(ChildKey, Component)> {
        let parent = self.downgrade();
        let mut state = self.0.borrow_mut();
        let mut out = Vec::with_capacity(state.children.len());

        for (key, child) in state.children.iter_mut() {
            let component = match child {
                Child::Component(component) => component.clone(),
                Child::Descriptor(descriptor) => {
                    let component = Component::new(std::mem::take(&mut **descriptor));
                    component.0.borrow_mut().parent = parent.clone();
                    *child = Child::Component(component.clone());
                    component
                }
            };
            out.push((key.clone(), component));
        }
        out
    }

    /// Give an unnamed component a name derived from `key`.
    pub(crate) fn resolve_name(&self, key: &ChildKey, fallback: &str) {
        let mut state = self.0.borrow_mut();
        if state.name.is_empty() {
            state.name = key.as_name().unwrap_or(fallback).into();
        }
    }
}

impl From<ComponentDescriptor> for Component {
    fn from(descriptor: ComponentDescriptor) -> Self {
        Self::new(descriptor)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(state) => f
                .debug_struct("Component")
                .field("name", &state.name)
                .field("node", &state.node)
                .field("phase", &state.phase)
                .field("children", &state.children.keys().collect::<Vec<_>>())
                .finish_non_exhaustive(),
            Err(_) => f.write_str("Component(<borrowed>)"),
        }
    }
}
