//! 运行时 - 组件实例与页面管理

mod instance;
mod pages;

pub use instance::ComponentInstance;
pub use pages::PageManager;
