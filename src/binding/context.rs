//! 组件数据上下文

use super::Value;
use crate::error::TemplateError;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// 常量 props
pub type Props = BTreeMap<String, Value>;

/// 组件实例的可变状态，绑定表达式的求值对象
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataContext {
    values: BTreeMap<String, Value>,
}

impl DataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 对象构建；`null` 视为空上下文
    pub fn from_json(json: &JsonValue) -> Result<Self, TemplateError> {
        match json {
            JsonValue::Object(map) => Ok(Self::from_map(map)),
            JsonValue::Null => Ok(Self::new()),
            other => Err(TemplateError::InvalidData(type_of(other).to_string())),
        }
    }

    pub fn from_map(map: &Map<String, JsonValue>) -> Self {
        Self {
            values: map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// 按顶层键合并（setState 的部分更新）
    pub fn merge(&mut self, partial: DataContext) {
        self.values.extend(partial.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn to_json(&self) -> JsonValue {
        Value::Object(self.values.clone())
            .to_json()
            .unwrap_or_else(|| JsonValue::Object(Map::new()))
    }
}

impl From<BTreeMap<String, Value>> for DataContext {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

fn type_of(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_non_object_data() {
        assert!(DataContext::from_json(&json!([1, 2])).is_err());
        assert!(DataContext::from_json(&json!(null)).unwrap().is_empty());
    }

    #[test]
    fn test_merge_overrides_top_level_keys() {
        let mut ctx = DataContext::from_json(&json!({"a": 1, "b": {"x": 1}})).unwrap();
        ctx.merge(DataContext::from_json(&json!({"b": {"y": 2}})).unwrap());
        assert_eq!(ctx.to_json(), json!({"a": 1, "b": {"y": 2}}));
    }
}
