//! QuickJS 引擎绑定

mod runtime;
mod component;

pub use runtime::JsRuntime;
pub use component::ScriptComponent;
