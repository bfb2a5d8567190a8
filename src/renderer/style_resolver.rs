//! 样式解析器 - 把 classList 引用的具名样式与内联样式合并

use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// 样式解析器
pub struct StyleResolver<'a> {
    styles: &'a BTreeMap<String, Map<String, JsonValue>>,
}

impl<'a> StyleResolver<'a> {
    pub fn new(styles: &'a BTreeMap<String, Map<String, JsonValue>>) -> Self {
        Self { styles }
    }

    /// 按 classList 顺序叠加具名样式，后出现的类覆盖前面的
    pub fn class_styles(&self, class_names: &[String]) -> BTreeMap<String, JsonValue> {
        let mut style = BTreeMap::new();
        for class in class_names {
            match self.styles.get(class) {
                Some(properties) => {
                    for (name, value) in properties {
                        style.insert(name.clone(), value.clone());
                    }
                }
                None => tracing::trace!(class = %class, "class has no style entry"),
            }
        }
        style
    }

    /// 解析 `width: 10px; color: red` 形式的内联样式文本
    pub fn parse_inline_style(style_str: &str) -> BTreeMap<String, JsonValue> {
        let mut styles = BTreeMap::new();

        for part in style_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some(colon_pos) = part.find(':') {
                let name = part[..colon_pos].trim().to_string();
                let value = part[colon_pos + 1..].trim();
                if !name.is_empty() {
                    styles.insert(name, Self::parse_value(value));
                }
            }
        }

        styles
    }

    /// 纯数字保留为数字，其它按字符串保存
    fn parse_value(value: &str) -> JsonValue {
        match value.parse::<f64>() {
            Ok(n) if value.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') => {
                serde_json::Number::from_f64(n)
                    .map(JsonValue::Number)
                    .unwrap_or_else(|| JsonValue::String(value.to_string()))
            }
            _ => JsonValue::String(value.to_string()),
        }
    }
}
