//! 单元测试模块
//! 覆盖物化、事件分发、组件实例、页面管理、脚本组件

pub mod instance_tests;
pub mod puzzle_tests;
pub mod property_tests;

use crate::binding::DataContext;
use crate::parser::TemplateDocument;
use once_cell::sync::Lazy;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

/// 用 RUST_LOG 打开测试日志
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// 辅助函数：解析模板
pub fn document(json: serde_json::Value) -> TemplateDocument {
    init_tracing();
    TemplateDocument::from_value(json).expect("template should parse")
}

/// 辅助函数：构造数据上下文
pub fn data(json: serde_json::Value) -> DataContext {
    DataContext::from_json(&json).expect("data should be an object")
}
