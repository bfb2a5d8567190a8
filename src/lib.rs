//! Lite Render - 声明式模板绑定核心
//! 表达式绑定、repeat/match 指令、节点树物化、事件分发，QuickJS 脚本组件

pub mod error;
pub mod config;

// 值模型与表达式求值
pub mod binding;

// 模板与表达式解析器
pub mod parser;

// 节点树物化
pub mod renderer;

// 事件系统
pub mod event;

// 宿主能力
pub mod bridge;

// 组件实例与页面
pub mod runtime;

// JS 引擎绑定
pub mod js;

pub use binding::{DataContext, Value};
pub use config::EngineConfig;
pub use error::{RenderError, RuntimeError};
pub use event::{DispatchOutcome, StateChange, UiEvent};
pub use parser::TemplateDocument;
pub use renderer::{RenderPass, RenderedNode};
pub use runtime::{ComponentInstance, PageManager};

// 单元测试
#[cfg(test)]
mod tests;
