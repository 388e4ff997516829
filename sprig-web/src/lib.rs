use sprig_ui::{Component, Document};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;

mod convert;
pub mod host;

pub use host::DomHost;

thread_local! {
    /// Mounted trees stay alive for the lifetime of the page
    static MOUNTED: RefCell<Vec<(Document<DomHost>, Component)>> = const { RefCell::new(Vec::new()) };
}

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Build a component tree from JSON and mount it into the page
///
/// # Arguments
/// * `descriptor_json` - Component descriptor (`name`, `props`, `data`, `children`, ...)
/// * `container_id` - DOM element ID to mount the tree into
#[wasm_bindgen]
pub async fn mount(descriptor_json: String, container_id: String) -> Result<(), JsValue> {
    let host = DomHost::new()?;
    let container = web_sys::window()
        .ok_or("no window")?
        .document()
        .ok_or("no document")?
        .get_element_by_id(&container_id)
        .ok_or("container not found")?;
    let mount_point = host.adopt(&container);

    let mut doc = Document::new(host);
    let root = Component::from_json_str(&descriptor_json).map_err(to_js_error)?;
    root.attach_to(&mut doc, mount_point, 0usize)
        .await
        .map_err(to_js_error)?;

    tracing::debug!(container = %container_id, "mounted component tree");
    MOUNTED.with(|mounted| mounted.borrow_mut().push((doc, root)));
    Ok(())
}

fn to_js_error(err: sprig_ui::Error) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}
