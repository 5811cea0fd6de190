//! Browser adapters (`wasm` feature)
//!
//! [`BrowserSessionStore`] persists into `window.sessionStorage`;
//! [`BrowserSdkHost`] injects the SDK script tag and drives the SDK's
//! deferred `kakao.maps.load` entry point. JS handles never live across an
//! await: callbacks report back through oneshot channels.

use crate::{
    loader::{sdk::SdkStatus, LoadError},
    session::{SessionStore, StoreError},
    traits::SdkHost,
};
use async_trait::async_trait;
use futures::channel::oneshot;
use js_sys::{Function, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// `id` given to the injected script element
const SCRIPT_ELEMENT_ID: &str = "restomap-sdk";

/// Global object the SDK installs on `window`
const SDK_GLOBAL: &str = "kakao";

fn js_error(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// [`SessionStore`] over `window.sessionStorage`.
///
/// The storage handle is looked up on every call, so the store itself holds
/// no JS state.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSessionStore;

impl BrowserSessionStore {
    fn storage() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .ok_or_else(|| StoreError::Unavailable("no window".into()))?
            .session_storage()
            .map_err(|e| StoreError::Unavailable(js_error(e)))?
            .ok_or_else(|| StoreError::Unavailable("sessionStorage disabled".into()))
    }
}

impl SessionStore for BrowserSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StoreError::Backend(js_error(e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|_| StoreError::QuotaExceeded)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StoreError::Backend(js_error(e)))
    }
}

type Reply = Rc<RefCell<Option<oneshot::Sender<Result<(), String>>>>>;

fn reply_callback(reply: &Reply, outcome: Result<(), String>) -> Closure<dyn FnMut()> {
    let reply = reply.clone();
    let mut outcome = Some(outcome);
    Closure::new(move || {
        if let (Some(tx), Some(result)) = (reply.borrow_mut().take(), outcome.take()) {
            let _ = tx.send(result);
        }
    })
}

/// [`SdkHost`] for a real page
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSdkHost;

impl BrowserSdkHost {
    fn sdk_maps() -> Option<JsValue> {
        let window = web_sys::window()?;
        let sdk = Reflect::get(&window, &JsValue::from_str(SDK_GLOBAL)).ok()?;
        if sdk.is_undefined() || sdk.is_null() {
            return None;
        }
        let maps = Reflect::get(&sdk, &JsValue::from_str("maps")).ok()?;
        (!maps.is_undefined() && !maps.is_null()).then_some(maps)
    }

    fn script_present() -> bool {
        web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(SCRIPT_ELEMENT_ID))
            .is_some()
    }

    fn attach_script(url: &str) -> Result<oneshot::Receiver<Result<(), String>>, LoadError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| LoadError::Injection("no document".into()))?;
        let head = document
            .head()
            .ok_or_else(|| LoadError::Injection("document has no <head>".into()))?;

        let script: web_sys::HtmlScriptElement = document
            .create_element("script")
            .map_err(|e| LoadError::Injection(js_error(e)))?
            .dyn_into()
            .map_err(|_| LoadError::Injection("not a script element".into()))?;
        script.set_id(SCRIPT_ELEMENT_ID);
        script.set_src(url);
        script.set_async(true);

        let (tx, rx) = oneshot::channel();
        let reply: Reply = Rc::new(RefCell::new(Some(tx)));
        let on_load = reply_callback(&reply, Ok(()));
        let on_error = reply_callback(&reply, Err(format!("{url} failed to load")));
        script.set_onload(Some(on_load.as_ref().unchecked_ref()));
        script.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        on_load.forget();
        on_error.forget();

        head.append_child(&script)
            .map_err(|e| LoadError::Injection(js_error(e)))?;
        Ok(rx)
    }

    fn call_load() -> Result<oneshot::Receiver<Result<(), String>>, LoadError> {
        let maps = Self::sdk_maps()
            .ok_or_else(|| LoadError::Initialization("SDK global missing".into()))?;
        let load: Function = Reflect::get(&maps, &JsValue::from_str("load"))
            .map_err(|e| LoadError::Initialization(js_error(e)))?
            .dyn_into()
            .map_err(|_| LoadError::Initialization("maps.load is not a function".into()))?;

        let (tx, rx) = oneshot::channel();
        let reply: Reply = Rc::new(RefCell::new(Some(tx)));
        let on_ready = reply_callback(&reply, Ok(()));
        load.call1(&maps, on_ready.as_ref().unchecked_ref())
            .map_err(|e| LoadError::Initialization(js_error(e)))?;
        on_ready.forget();
        Ok(rx)
    }
}

#[async_trait]
impl SdkHost for BrowserSdkHost {
    fn status(&self) -> SdkStatus {
        match Self::sdk_maps() {
            Some(maps) => {
                let initialized = Reflect::get(&maps, &JsValue::from_str("LatLng"))
                    .map(|ctor| ctor.is_function())
                    .unwrap_or(false);
                if initialized {
                    SdkStatus::Ready
                } else {
                    SdkStatus::ScriptPresent
                }
            }
            None if Self::script_present() => SdkStatus::ScriptPresent,
            None => SdkStatus::Absent,
        }
    }

    async fn inject_script(&self, url: &str) -> Result<(), LoadError> {
        let rx = Self::attach_script(url)?;
        match rx.await {
            Ok(result) => result.map_err(LoadError::Injection),
            Err(_) => Err(LoadError::Injection("script load callback dropped".into())),
        }
    }

    async fn initialize(&self) -> Result<(), LoadError> {
        let rx = Self::call_load()?;
        match rx.await {
            Ok(result) => result.map_err(LoadError::Initialization),
            Err(_) => Err(LoadError::Initialization("load callback dropped".into())),
        }
    }

    fn has_module(&self, name: &str) -> bool {
        Self::sdk_maps()
            .and_then(|maps| Reflect::get(&maps, &JsValue::from_str(name)).ok())
            .map_or(false, |module| !module.is_undefined() && !module.is_null())
    }
}
