//! 控制流指令：repeat 展开、match 条件渲染
//!
//! 无状态，每次渲染重新求值。

use crate::binding::{Frame, Resolver, Scope, Value};
use crate::error::DirectiveError;
use crate::parser::template::{Binding, RepeatDirective};
use std::collections::HashSet;

/// repeat 的一次迭代
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatInstance {
    pub index: usize,
    pub item: Value,
    /// 稳定标识，供外部渲染器做列表 diff
    pub key: String,
}

impl RepeatInstance {
    /// 该实例子树的局部变量帧
    pub fn frame(&self, directive: &RepeatDirective) -> Frame {
        let mut frame = vec![(directive.alias.clone(), self.item.clone())];
        if let Some(index_name) = &directive.iterator1 {
            frame.push((index_name.clone(), Value::Number(self.index as f64)));
        }
        frame
    }
}

/// 展开 repeat，按源序列顺序返回实例
///
/// 数组逐项迭代，非负整数 `n` 迭代 `0..n`，`undefined`/`null` 为空列表，
/// 其余类型报错。`limit` 截断超长列表。
pub fn evaluate_repeat(
    directive: &RepeatDirective,
    scope: &mut Scope,
    limit: usize,
) -> Result<Vec<RepeatInstance>, DirectiveError> {
    let source = Resolver::resolve(&directive.source, scope)?;
    // 数字只物化前 limit 个
    let (items, total): (Vec<Value>, f64) = match source {
        Value::Array(items) => {
            let total = items.len() as f64;
            (items, total)
        }
        Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => {
            let count = if n > limit as f64 { limit } else { n as usize };
            ((0..count).map(|i| Value::Number(i as f64)).collect(), n)
        }
        Value::Undefined | Value::Null => (Vec::new(), 0.0),
        other => {
            return Err(DirectiveError::NotIterable {
                expr: directive.source.source(),
                found: other.type_name().to_string(),
            })
        }
    };

    if total > limit as f64 {
        tracing::warn!(
            expr = %directive.source.source(),
            len = total,
            limit,
            "repeat list truncated"
        );
    }

    let mut instances = Vec::with_capacity(items.len().min(limit));
    let mut seen = HashSet::new();
    for (index, item) in items.into_iter().take(limit).enumerate() {
        let mut instance = RepeatInstance {
            index,
            item,
            key: index.to_string(),
        };
        if let Some(key_binding) = &directive.key {
            instance.key = instance_key(key_binding, &instance, directive, scope);
        }
        // 重复的 key 会让兄弟节点的 ref 冲突
        if !seen.insert(instance.key.clone()) {
            tracing::debug!(key = %instance.key, index, "duplicate repeat key");
            instance.key = unique_key(&instance.key, index, &mut seen);
        }
        instances.push(instance);
    }
    Ok(instances)
}

/// `key#index`，仍冲突时继续追加 `#n`
fn unique_key(key: &str, index: usize, seen: &mut HashSet<String>) -> String {
    let mut candidate = format!("{}#{}", key, index);
    let mut suffix = 1;
    while !seen.insert(candidate.clone()) {
        candidate = format!("{}#{}#{}", key, index, suffix);
        suffix += 1;
    }
    candidate
}

/// key 绑定在实例作用域内求值；失败时退回下标
fn instance_key(
    binding: &Binding,
    instance: &RepeatInstance,
    directive: &RepeatDirective,
    scope: &mut Scope,
) -> String {
    scope.push_frame(instance.frame(directive));
    let key = Resolver::resolve(binding, scope);
    scope.pop_frame();

    match key {
        Ok(value) if !value.is_nullish() => value.to_string(),
        Ok(_) => instance.index.to_string(),
        Err(error) => {
            tracing::debug!(%error, index = instance.index, "repeat key fell back to index");
            instance.index.to_string()
        }
    }
}

/// match 条件：真值才渲染
pub fn evaluate_match(binding: &Binding, scope: &Scope) -> Result<bool, DirectiveError> {
    Ok(Resolver::resolve(binding, scope)?.is_truthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{DataContext, Props};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn directive(source: &str) -> RepeatDirective {
        RepeatDirective {
            source: Binding::expression(source),
            alias: "block".into(),
            iterator1: Some("i".into()),
            key: None,
        }
    }

    #[test]
    fn test_repeat_over_number() {
        let data = DataContext::from_json(&json!({"n": 3})).unwrap();
        let (computed, props) = (BTreeMap::new(), Props::new());
        let mut scope = Scope::new(&data, &computed, &props);
        let instances = evaluate_repeat(&directive("n"), &mut scope, 100).unwrap();
        let items: Vec<Value> = instances.into_iter().map(|i| i.item).collect();
        assert_eq!(items, vec![Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)]);
    }

    #[test]
    fn test_repeat_rejects_strings() {
        let data = DataContext::from_json(&json!({"s": "abc"})).unwrap();
        let (computed, props) = (BTreeMap::new(), Props::new());
        let mut scope = Scope::new(&data, &computed, &props);
        assert!(matches!(
            evaluate_repeat(&directive("s"), &mut scope, 100),
            Err(DirectiveError::NotIterable { .. })
        ));
    }

    #[test]
    fn test_repeat_key_binding_and_limit() {
        let data = DataContext::from_json(&json!({
            "blocks": [{"id": "a"}, {"id": "b"}, {"id": "c"}]
        }))
        .unwrap();
        let (computed, props) = (BTreeMap::new(), Props::new());
        let mut scope = Scope::new(&data, &computed, &props);
        let mut d = directive("blocks");
        d.key = Some(Binding::expression("block.id"));

        let instances = evaluate_repeat(&d, &mut scope, 2).unwrap();
        let keys: Vec<&str> = instances.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(scope.depth(), 0);
    }

    #[test]
    fn test_duplicate_keys_are_disambiguated() {
        let data = DataContext::from_json(&json!({"blocks": [{"id": 1}, {"id": 1}]})).unwrap();
        let (computed, props) = (BTreeMap::new(), Props::new());
        let mut scope = Scope::new(&data, &computed, &props);
        let mut d = directive("blocks");
        d.key = Some(Binding::expression("block.id"));

        let instances = evaluate_repeat(&d, &mut scope, 10).unwrap();
        assert_eq!(instances[0].key, "1");
        assert_eq!(instances[1].key, "1#1");
    }

    #[test]
    fn test_suffixed_key_never_collides() {
        let data = DataContext::from_json(&json!({"blocks": ["a", "a#2", "a"]})).unwrap();
        let (computed, props) = (BTreeMap::new(), Props::new());
        let mut scope = Scope::new(&data, &computed, &props);
        let mut d = directive("blocks");
        d.key = Some(Binding::expression("block"));

        let instances = evaluate_repeat(&d, &mut scope, 10).unwrap();
        let keys: HashSet<&str> = instances.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(instances[2].key, "a#2#1");
    }

    #[test]
    fn test_huge_number_is_capped_before_collecting() {
        let data = DataContext::from_json(&json!({"n": 1e300})).unwrap();
        let (computed, props) = (BTreeMap::new(), Props::new());
        let mut scope = Scope::new(&data, &computed, &props);
        let instances = evaluate_repeat(&directive("n"), &mut scope, 3).unwrap();
        let items: Vec<Value> = instances.into_iter().map(|i| i.item).collect();
        assert_eq!(items, vec![Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)]);
    }
}
