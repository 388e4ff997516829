use super::Component;
use crate::error::{BindingError, Result};
use crate::host::{ElementImpl, ElementOptions, Event, ListenerOptions};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use smartstring::{LazyCompact, SmartString};
use std::fmt;
use std::rc::Rc;

pub type PropMap = IndexMap<String, Value>;

pub type Hook = Rc<dyn Fn(&Component)>;
pub type Handler = Rc<dyn Fn(&Component, &Event)>;
pub type Getter = Rc<dyn Fn(&Component) -> std::result::Result<Value, BindingError>>;
pub type Setter = Rc<dyn Fn(&Component, Value) -> std::result::Result<(), BindingError>>;

/// Key of a child: an explicit name or a position for unnamed children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub enum ChildKey {
    Name(SmartString<LazyCompact>),
    Index(usize),
}

impl ChildKey {
    /// The name a child attached under this key should take, if the key can
    /// serve as one (not blank, not numeric).
    pub fn as_name(&self) -> Option<&str> {
        match self {
            ChildKey::Name(name) if !name.trim().is_empty() && !is_numeric(name) => {
                Some(name.as_str())
            }
            _ => None,
        }
    }
}

fn is_numeric(key: &str) -> bool {
    key.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKey::Name(name) => f.write_str(name),
            ChildKey::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for ChildKey {
    fn from(key: &str) -> Self {
        match key.parse::<usize>() {
            // Only canonical decimals, so "03" and "3" stay distinct keys
            Ok(index) if index.to_string() == key => ChildKey::Index(index),
            _ => ChildKey::Name(key.into()),
        }
    }
}

impl From<String> for ChildKey {
    fn from(key: String) -> Self {
        ChildKey::from(key.as_str())
    }
}

impl From<usize> for ChildKey {
    fn from(index: usize) -> Self {
        ChildKey::Index(index)
    }
}

impl From<&ChildKey> for ChildKey {
    fn from(key: &ChildKey) -> Self {
        key.clone()
    }
}

/// Entry of a component's child map.
#[derive(Clone)]
pub enum Child {
    Component(Component),
    /// Not yet normalized; becomes a [`Component`] when its owner renders.
    Descriptor(Box<ComponentDescriptor>),
}

impl From<Component> for Child {
    fn from(component: Component) -> Self {
        Child::Component(component)
    }
}

impl From<ComponentDescriptor> for Child {
    fn from(descriptor: ComponentDescriptor) -> Self {
        Child::Descriptor(Box::new(descriptor))
    }
}

impl<'de> Deserialize<'de> for Child {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        ComponentDescriptor::deserialize(deserializer).map(Child::from)
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Component(c) => c.fmt(f),
            Child::Descriptor(d) => d.fmt(f),
        }
    }
}

#[derive(Clone)]
pub struct Listener {
    pub handler: Handler,
    pub options: ListenerOptions,
}

impl Listener {
    pub fn new(handler: impl Fn(&Component, &Event) + 'static) -> Self {
        Self {
            handler: Rc::new(handler),
            options: ListenerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Computed property installed on a component when it renders.
#[derive(Clone)]
pub struct Binding {
    pub get: Getter,
    pub set: Option<Setter>,
}

impl Binding {
    pub fn new(
        get: impl Fn(&Component) -> std::result::Result<Value, BindingError> + 'static,
    ) -> Self {
        Self {
            get: Rc::new(get),
            set: None,
        }
    }

    pub fn with_setter(
        mut self,
        set: impl Fn(&Component, Value) -> std::result::Result<(), BindingError> + 'static,
    ) -> Self {
        self.set = Some(Rc::new(set));
        self
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("settable", &self.set.is_some())
            .finish_non_exhaustive()
    }
}

/// Implementation behind a custom element component.
#[derive(Debug, Clone)]
pub enum ElementClass {
    /// Resolved through [`Host::resolve_element`](crate::Host::resolve_element)
    /// on first materialization.
    Named(SmartString<LazyCompact>),
    Resolved(ElementImpl),
}

/// Plain description of a component, before it becomes one.
///
/// Every field defaults to empty. From JSON, the recognized keys are `name`,
/// `props`, `data`, `children` (an object, or an array for positional
/// children), `elementClass` and `elementProps`; anything else is kept in
/// [`extra`](Self::extra). Listeners, hooks and bindings are code and can
/// only be added through the builder methods.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub props: PropMap,
    #[serde(default)]
    pub data: PropMap,
    #[serde(default, deserialize_with = "children_map")]
    pub children: IndexMap<ChildKey, Child>,
    #[serde(skip)]
    pub listeners: IndexMap<String, Listener>,
    #[serde(skip)]
    pub pre_render: IndexMap<String, Hook>,
    #[serde(skip)]
    pub post_render: IndexMap<String, Hook>,
    #[serde(skip)]
    pub bindings: IndexMap<String, Binding>,
    #[serde(default, deserialize_with = "named_class")]
    pub element_class: Option<ElementClass>,
    #[serde(default, rename = "elementProps")]
    pub element_options: ElementOptions,
    #[serde(flatten)]
    pub extra: PropMap,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Unnamed descriptor; the name comes from the key it is attached under.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Set `props.style`; merged into the node's existing style on render.
    pub fn style(self, style: Value) -> Self {
        self.prop("style", style)
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn child(mut self, key: impl Into<ChildKey>, child: impl Into<Child>) -> Self {
        self.children.insert(key.into(), child.into());
        self
    }

    /// Append an unnamed child under the next free position.
    pub fn push(mut self, child: impl Into<Child>) -> Self {
        let index = self
            .children
            .keys()
            .filter_map(|key| match key {
                ChildKey::Index(i) => Some(i + 1),
                ChildKey::Name(_) => None,
            })
            .max()
            .unwrap_or(0);
        self.children.insert(ChildKey::Index(index), child.into());
        self
    }

    pub fn on(
        mut self,
        event: impl Into<String>,
        handler: impl Fn(&Component, &Event) + 'static,
    ) -> Self {
        self.listeners.insert(event.into(), Listener::new(handler));
        self
    }

    pub fn listener(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.listeners.insert(event.into(), listener);
        self
    }

    pub fn pre_render(mut self, key: impl Into<String>, hook: impl Fn(&Component) + 'static) -> Self {
        self.pre_render.insert(key.into(), Rc::new(hook));
        self
    }

    pub fn post_render(mut self, key: impl Into<String>, hook: impl Fn(&Component) + 'static) -> Self {
        self.post_render.insert(key.into(), Rc::new(hook));
        self
    }

    pub fn binding(mut self, key: impl Into<String>, binding: Binding) -> Self {
        self.bindings.insert(key.into(), binding);
        self
    }

    pub fn element_class(mut self, class: ElementClass) -> Self {
        self.element_class = Some(class);
        self
    }

    pub fn element_options(mut self, options: ElementOptions) -> Self {
        self.element_options = options;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("data", &self.data)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("pre_render", &self.pre_render.keys().collect::<Vec<_>>())
            .field("post_render", &self.post_render.keys().collect::<Vec<_>>())
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .field("element_class", &self.element_class)
            .field("extra", &self.extra)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChildrenRepr {
    Map(IndexMap<ChildKey, Child>),
    List(Vec<Child>),
}

fn children_map<'de, D>(deserializer: D) -> std::result::Result<IndexMap<ChildKey, Child>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ChildrenRepr::deserialize(deserializer)? {
        ChildrenRepr::Map(map) => map,
        ChildrenRepr::List(list) => list
            .into_iter()
            .enumerate()
            .map(|(index, child)| (ChildKey::Index(index), child))
            .collect(),
    })
}

fn named_class<'de, D>(deserializer: D) -> std::result::Result<Option<ElementClass>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|name| ElementClass::Named(name.into())))
}
