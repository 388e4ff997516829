/// Integration tests for listeners, lifecycle hooks and the node side table
mod common;

use futures::executor::block_on;
use sprig_ui::{
    Component, ComponentDescriptor, Document, Host, Listener, ListenerOptions, MemoryHost, RENDERED,
    RERENDERED,
};
use std::cell::RefCell;
use std::rc::Rc;

type Calls = Rc<RefCell<Vec<String>>>;

fn recorder() -> Calls {
    Rc::new(RefCell::new(Vec::new()))
}

/// Handlers receive the owning component, not the raw node
#[test]
fn test_listener_receives_component() {
    common::init_tracing();
    let mut doc = Document::new(MemoryHost::new());
    let calls = recorder();

    let seen = calls.clone();
    let button = Component::new(ComponentDescriptor::new("button").on("click", move |c, e| {
        seen.borrow_mut().push(format!("{} got {}", c.name(), e.name));
    }));
    let node = block_on(button.to_node(&mut doc)).unwrap();

    doc.host_mut().dispatch_event(node, "click");
    doc.host_mut().dispatch_event(node, "keydown");

    assert_eq!(*calls.borrow(), vec!["button got click"]);
}

/// Listener options reach the host
#[test]
fn test_once_listener() {
    let mut doc = Document::new(MemoryHost::new());
    let calls = recorder();

    let seen = calls.clone();
    let button = Component::new(ComponentDescriptor::new("button").listener(
        "click",
        Listener::new(move |_, _| seen.borrow_mut().push("click".into())).with_options(
            ListenerOptions {
                once: true,
                ..Default::default()
            },
        ),
    ));
    let node = block_on(button.to_node(&mut doc)).unwrap();

    doc.host_mut().dispatch_event(node, "click");
    doc.host_mut().dispatch_event(node, "click");

    assert_eq!(calls.borrow().len(), 1);
}

/// `rendered` fires once on first materialization, `rerendered` on each
/// forced rebuild
#[test]
fn test_render_notifications() {
    let mut doc = Document::new(MemoryHost::new());
    let calls = recorder();

    let (first, again) = (calls.clone(), calls.clone());
    let panel = Component::new(
        ComponentDescriptor::new("div")
            .on(RENDERED, move |_, e| first.borrow_mut().push(e.name.to_string()))
            .on(RERENDERED, move |_, e| again.borrow_mut().push(e.name.to_string())),
    );

    block_on(panel.prepare(&mut doc, false)).unwrap();
    block_on(panel.prepare(&mut doc, false)).unwrap();
    block_on(panel.rerender(&mut doc)).unwrap();

    assert_eq!(*calls.borrow(), vec!["rendered", "rerendered"]);
}

/// Hooks run in insertion order around the children, once
#[test]
fn test_hook_order_and_no_rerun() {
    let mut doc = Document::new(MemoryHost::new());
    let calls = recorder();

    let hook = |calls: &Calls, label: &'static str| {
        let calls = calls.clone();
        move |c: &Component| calls.borrow_mut().push(format!("{label} {}", c.name()))
    };

    let root = Component::new(
        ComponentDescriptor::new("div")
            .pre_render("first", hook(&calls, "pre-1"))
            .pre_render("second", hook(&calls, "pre-2"))
            .post_render("done", hook(&calls, "post"))
            .child(
                "body",
                ComponentDescriptor::new("p")
                    .pre_render("p", hook(&calls, "pre"))
                    .post_render("p", hook(&calls, "post")),
            ),
    );

    block_on(root.prepare(&mut doc, false)).unwrap();
    block_on(root.rerender(&mut doc)).unwrap();

    assert_eq!(
        *calls.borrow(),
        vec!["pre-1 div", "pre-2 div", "pre p", "post p", "post div"]
    );
}

/// Hooks see the node only after render; pre hooks see none
#[test]
fn test_hooks_observe_materialization() {
    let mut doc = Document::new(MemoryHost::new());
    let calls = recorder();

    let (pre, post) = (calls.clone(), calls.clone());
    let root = Component::new(
        ComponentDescriptor::new("div")
            .pre_render("pre", move |c| pre.borrow_mut().push(format!("pre {}", c.node().is_some())))
            .post_render("post", move |c| {
                post.borrow_mut().push(format!("post {}", c.node().is_some()))
            }),
    );

    block_on(root.prepare(&mut doc, false)).unwrap();
    assert_eq!(*calls.borrow(), vec!["pre false", "post true"]);
}

/// Nodes map back to their components without keeping them alive
#[test]
fn test_component_for_node() {
    let mut doc = Document::new(MemoryHost::new());
    let root = Component::new(
        ComponentDescriptor::new("div").child("title", ComponentDescriptor::new("h1")),
    );
    let node = block_on(root.to_node(&mut doc)).unwrap();
    let title_node = root.child("title").unwrap().node().unwrap();

    assert!(doc.component_for(node).unwrap().ptr_eq(&root));
    assert_eq!(doc.component_for(title_node).unwrap().name(), "h1");

    drop(root);
    assert!(doc.component_for(node).is_none());
    assert_eq!(doc.prune(), 2);
}
