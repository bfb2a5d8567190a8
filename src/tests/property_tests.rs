//! 性质测试（proptest）

use super::{data, document};
use crate::binding::{DataContext, NoComputed, Props, Resolver, Scope, Value};
use crate::config::EngineConfig;
use crate::parser::{Binding, ExpressionParser, TemplateDocument};
use crate::renderer::Materializer;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

fn list_template() -> TemplateDocument {
    document(json!({
        "body": {
            "type": "div",
            "children": [
                {
                    "type": "text",
                    "repeat": {"for": "items", "alias": "item", "iterator1": "i", "key": "item"},
                    "match": "show",
                    "attr": {"value": {"@binding": "item"}, "index": {"@binding": "i"}}
                },
                {"type": "text", "attr": {"value": {"@binding": "item"}}}
            ]
        }
    }))
}

proptest! {
    /// 性质：表达式解析对任意输入都不会 panic
    #[test]
    fn test_expression_parse_never_panics(source in ".*") {
        let _ = ExpressionParser::parse(&source);
    }

    /// 性质：任意绑定文本求值都不会 panic
    #[test]
    fn test_binding_resolution_never_panics(source in "[a-z.\\[\\]0-9+*?:!=<>&|' ]{0,24}") {
        let ctx = data(json!({"a": {"b": [1, 2]}, "s": "text"}));
        let computed = BTreeMap::new();
        let props = Props::new();
        let scope = Scope::new(&ctx, &computed, &props);
        let _ = Resolver::resolve(&Binding::expression(&source), &scope);
    }

    /// 性质：repeat 产生的节点数等于列表长度，顺序与下标一致，别名不泄漏
    #[test]
    fn test_repeat_preserves_length_and_order(items in prop::collection::vec(0u32..1000, 0..40)) {
        let doc = list_template();
        let ctx = data(json!({"items": items, "show": true}));
        let pass = Materializer::new(&doc, &EngineConfig::default()).render(&ctx, &NoComputed);
        let root = pass.root.as_ref().unwrap();

        prop_assert_eq!(root.children.len(), items.len() + 1);
        for (index, item) in items.iter().enumerate() {
            prop_assert_eq!(root.children[index].attr("value"), Some(&json!(item)));
            prop_assert_eq!(root.children[index].attr("index"), Some(&json!(index)));
        }
        prop_assert!(root.children[items.len()].attr("value").is_none());

        // ref 在一次渲染内唯一
        let mut refs: Vec<&str> = root.children.iter().map(|c| c.ref_id.as_str()).collect();
        refs.sort_unstable();
        refs.dedup();
        prop_assert_eq!(refs.len(), items.len() + 1);
    }

    /// 性质：同一数据渲染两次结果一致
    #[test]
    fn test_render_idempotent(items in prop::collection::vec(any::<i32>(), 0..20), show in any::<bool>()) {
        let doc = list_template();
        let ctx = data(json!({"items": items, "show": show}));
        let materializer = Materializer::new(&doc, &EngineConfig::default());
        let first = materializer.render(&ctx, &NoComputed);
        let second = materializer.render(&ctx, &NoComputed);

        prop_assert_eq!(&first, &second);
        let expected = if show { items.len() + 1 } else { 1 };
        prop_assert_eq!(first.root.as_ref().unwrap().children.len(), expected);
    }

    /// 性质：数字加法与 Rust 一致，与字符串相加则拼接
    #[test]
    fn test_addition_semantics(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let mut ctx = DataContext::new();
        ctx.insert("a", a as f64);
        ctx.insert("b", b as f64);
        ctx.insert("px", "px");
        let computed = BTreeMap::new();
        let props = Props::new();
        let scope = Scope::new(&ctx, &computed, &props);

        let sum = Resolver::resolve(&Binding::expression("a + b"), &scope).unwrap();
        prop_assert_eq!(sum, Value::Number((a + b) as f64));
        let text = Resolver::resolve(&Binding::expression("a + px"), &scope).unwrap();
        prop_assert_eq!(text, Value::String(format!("{}px", a)));
    }
}
