use js_sys::JSON;
use serde_json::{Number, Value};
use wasm_bindgen::{JsCast, JsValue};

/// JS counterpart of a JSON value. Arrays and objects go through `JSON.parse`.
pub(crate) fn to_js(value: &Value) -> JsValue {
    match value {
        Value::Null => JsValue::NULL,
        Value::Bool(b) => JsValue::from_bool(*b),
        Value::Number(n) => n.as_f64().map_or(JsValue::NULL, JsValue::from_f64),
        Value::String(s) => JsValue::from_str(s),
        Value::Array(_) | Value::Object(_) => {
            JSON::parse(&value.to_string()).unwrap_or(JsValue::UNDEFINED)
        }
    }
}

/// JSON view of a JS value; `None` for `undefined` and for anything
/// `JSON.stringify` cannot represent.
pub(crate) fn from_js(value: &JsValue) -> Option<Value> {
    if value.is_undefined() {
        return None;
    }
    if value.is_null() {
        return Some(Value::Null);
    }
    if let Some(b) = value.as_bool() {
        return Some(Value::Bool(b));
    }
    if let Some(n) = value.as_f64() {
        return Some(Number::from_f64(n).map_or(Value::Null, Value::Number));
    }
    if let Some(s) = value.as_string() {
        return Some(Value::String(s));
    }
    if value.is_function() {
        return None;
    }

    let json = JSON::stringify(value).ok()?.as_string()?;
    serde_json::from_str(&json).ok()
}

/// Readable message for a thrown JS value.
pub(crate) fn describe(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    match err.dyn_ref::<js_sys::Error>() {
        Some(error) => String::from(error.message()),
        None => format!("{err:?}"),
    }
}
