//! 引擎配置

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// engine.json 配置结构
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// 单个 repeat 展开的最大实例数
    #[serde(default = "default_max_repeat")]
    pub max_repeat_items: usize,
    /// 事件参数中引用事件负载的保留变量名
    #[serde(default = "default_event_variable")]
    pub event_variable: String,
    /// 根节点的 ref
    #[serde(default = "default_root_ref")]
    pub root_ref: String,
    /// tracing EnvFilter 指令，RUST_LOG 优先
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_max_repeat() -> usize { 10_000 }
fn default_event_variable() -> String { "$event".to_string() }
fn default_root_ref() -> String { "__root".to_string() }
fn default_log_filter() -> String { "info".to_string() }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_repeat_items: default_max_repeat(),
            event_variable: default_event_variable(),
            root_ref: default_root_ref(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Ok(Self::from_json(&source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = EngineConfig::from_json(r#"{"maxRepeatItems": 5}"#).unwrap();
        assert_eq!(config.max_repeat_items, 5);
        assert_eq!(config.event_variable, "$event");
        assert_eq!(config.root_ref, "__root");
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let error = EngineConfig::load("no/such/engine.json").unwrap_err();
        assert!(error.to_string().contains("no/such/engine.json"));
        assert!(error.downcast_ref::<std::io::Error>().is_some());
    }
}
