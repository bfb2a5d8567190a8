//! 节点树物化 - 静态模板 + 数据上下文 → 可渲染节点树
//!
//! 深度优先，纯变换。repeat 把一个节点展开成 N 个兄弟节点，
//! match 为假时整棵子树缺省；单个属性求值失败只让该属性缺省。

use super::directive::{evaluate_match, evaluate_repeat};
use super::style_resolver::StyleResolver;
use crate::binding::{ComputedProvider, DataContext, Frame, Resolver, Scope, Value};
use crate::config::EngineConfig;
use crate::error::{DirectiveError, RenderError};
use crate::parser::template::{Binding, EventBinding, StyleSpec, TemplateDocument, TemplateNode};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// 物化后的节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    /// 稳定标识：模板位置路径 + repeat key
    #[serde(rename = "ref")]
    pub ref_id: String,
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "classList", skip_serializing_if = "Vec::is_empty")]
    pub class_list: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, JsonValue>,
    #[serde(rename = "attr", skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, JsonValue>,
    #[serde(rename = "event", skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    pub fn attr(&self, name: &str) -> Option<&JsonValue> {
        self.attributes.get(name)
    }

    /// 文本节点的 `value` 属性
    pub fn text(&self) -> Option<&str> {
        self.attributes.get("value").and_then(|v| v.as_str())
    }

    /// 按 ref 深度优先查找
    pub fn find(&self, ref_id: &str) -> Option<&RenderedNode> {
        if self.ref_id == ref_id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(ref_id))
    }

    /// 深度优先收集满足条件的节点
    pub fn collect<'a>(&'a self, pred: &dyn Fn(&RenderedNode) -> bool, out: &mut Vec<&'a RenderedNode>) {
        if pred(self) {
            out.push(self);
        }
        for child in &self.children {
            child.collect(pred, out);
        }
    }

    /// 子树内所有文本
    pub fn texts(&self) -> Vec<&str> {
        let mut nodes = Vec::new();
        self.collect(&|n: &RenderedNode| n.text().is_some(), &mut nodes);
        nodes.into_iter().filter_map(|n| n.text()).collect()
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|c| c.count()).sum::<usize>()
    }
}

/// 某个节点上声明的事件及其物化时的局部变量
#[derive(Debug, Clone, PartialEq)]
pub struct EventSite {
    pub tag: String,
    pub bindings: Vec<EventBinding>,
    pub locals: Vec<Frame>,
}

/// ref → 事件声明
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    sites: BTreeMap<String, EventSite>,
}

impl EventTable {
    pub fn get(&self, ref_id: &str) -> Option<&EventSite> {
        self.sites.get(ref_id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn refs(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(|k| k.as_str())
    }

    fn insert(&mut self, ref_id: String, site: EventSite) {
        self.sites.insert(ref_id, site);
    }
}

/// 一次渲染的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPass {
    pub root: Option<RenderedNode>,
    pub events: EventTable,
    /// 本次渲染使用的计算属性值
    pub computed: BTreeMap<String, Value>,
    /// 被恢复的错误
    pub diagnostics: Vec<RenderError>,
}

impl RenderPass {
    pub fn find(&self, ref_id: &str) -> Option<&RenderedNode> {
        self.root.as_ref().and_then(|r| r.find(ref_id))
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(&self.root).unwrap_or(JsonValue::Null)
    }
}

struct PassState {
    events: EventTable,
    diagnostics: Vec<RenderError>,
}

impl PassState {
    fn binding_failed(&mut self, node: &str, target: &str, error: crate::error::BindingError) {
        tracing::debug!(node, binding = target, %error, "binding degraded to absent");
        self.diagnostics.push(RenderError::BindingEvaluation {
            node: node.to_string(),
            target: target.to_string(),
            error,
        });
    }

    fn directive_failed(&mut self, node: &str, error: DirectiveError) {
        tracing::warn!(node, %error, "directive failed, subtree omitted");
        self.diagnostics.push(RenderError::DirectiveEvaluation {
            node: node.to_string(),
            error,
        });
    }
}

/// 节点树物化器
pub struct Materializer<'d> {
    document: &'d TemplateDocument,
    styles: StyleResolver<'d>,
    repeat_limit: usize,
    root_ref: String,
}

impl<'d> Materializer<'d> {
    pub fn new(document: &'d TemplateDocument, config: &EngineConfig) -> Self {
        Self {
            document,
            styles: StyleResolver::new(&document.styles),
            repeat_limit: config.max_repeat_items,
            root_ref: config.root_ref.clone(),
        }
    }

    /// 执行一次完整的渲染
    pub fn render(&self, data: &DataContext, provider: &dyn ComputedProvider) -> RenderPass {
        let computed = self.evaluate_computed(data, provider);
        let mut scope = Scope::new(data, &computed, &self.document.props);
        let mut state = PassState {
            events: EventTable::default(),
            diagnostics: Vec::new(),
        };

        let body = &self.document.body;
        if body.repeat.is_some() {
            state.directive_failed(&self.root_ref, DirectiveError::RootRepeat);
        }
        let root = self.render_single(body, self.root_ref.clone(), None, &mut scope, &mut state);
        debug_assert_eq!(scope.depth(), 0);

        tracing::debug!(
            nodes = root.as_ref().map(|r| r.count()).unwrap_or(0),
            events = state.events.len(),
            diagnostics = state.diagnostics.len(),
            "render pass finished"
        );

        RenderPass {
            root,
            events: state.events,
            computed,
            diagnostics: state.diagnostics,
        }
    }

    /// 每个声明的计算属性在一次渲染中只求值一次
    fn evaluate_computed(&self, data: &DataContext, provider: &dyn ComputedProvider) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        for name in self.document.computed_names() {
            match provider.compute(name, data, &self.document.props) {
                Some(value) => {
                    values.insert(name.to_string(), value);
                }
                None => tracing::debug!(computed = name, "computed value unavailable"),
            }
        }
        values
    }

    /// 渲染一个模板节点；repeat 时返回多个兄弟节点
    fn render_node(
        &self,
        node: &TemplateNode,
        base_ref: String,
        scope: &mut Scope,
        state: &mut PassState,
    ) -> Vec<RenderedNode> {
        let Some(repeat) = &node.repeat else {
            return self
                .render_single(node, base_ref, None, scope, state)
                .into_iter()
                .collect();
        };

        let instances = match evaluate_repeat(repeat, scope, self.repeat_limit) {
            Ok(instances) => instances,
            Err(error) => {
                state.directive_failed(&base_ref, error);
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(instances.len());
        for instance in instances {
            scope.push_frame(instance.frame(repeat));
            let ref_id = format!("{}[{}]", base_ref, instance.key);
            if let Some(rendered) = self.render_single(node, ref_id, Some(instance.key), scope, state) {
                out.push(rendered);
            }
            scope.pop_frame();
        }
        out
    }

    /// 渲染单个实例（repeat 已展开），先判断 match
    fn render_single(
        &self,
        node: &TemplateNode,
        ref_id: String,
        key: Option<String>,
        scope: &mut Scope,
        state: &mut PassState,
    ) -> Option<RenderedNode> {
        if let Some(condition) = &node.match_on {
            match evaluate_match(condition, scope) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(error) => {
                    state.directive_failed(&ref_id, error);
                    return None;
                }
            }
        }

        let class_list = self.resolve_class_list(node, &ref_id, scope, state);
        let mut style = self.styles.class_styles(&class_list);
        if let Some(inline) = &node.style {
            style.extend(self.resolve_inline_style(inline, &ref_id, scope, state));
        }

        let mut attributes = BTreeMap::new();
        for (name, binding) in &node.attributes {
            if let Some(value) = self.resolve_value(binding, &ref_id, name, scope, state) {
                attributes.insert(name.clone(), value);
            }
        }

        let mut events = Vec::new();
        if !node.events.is_empty() {
            for binding in &node.events {
                if !events.contains(&binding.event_type) {
                    events.push(binding.event_type.clone());
                }
            }
            state.events.insert(
                ref_id.clone(),
                EventSite {
                    tag: node.tag.clone(),
                    bindings: node.events.clone(),
                    locals: scope.frames().to_vec(),
                },
            );
        }

        let mut children = Vec::new();
        for (index, child) in node.children.iter().enumerate() {
            let child_ref = if ref_id == self.root_ref {
                index.to_string()
            } else {
                format!("{}.{}", ref_id, index)
            };
            children.extend(self.render_node(child, child_ref, scope, state));
        }

        Some(RenderedNode {
            ref_id,
            tag: node.tag.clone(),
            id: node.id.clone(),
            key,
            class_list,
            style,
            attributes,
            events,
            children,
        })
    }

    /// 求值单个绑定；失败或 undefined 时返回 None
    fn resolve_value(
        &self,
        binding: &Binding,
        ref_id: &str,
        target: &str,
        scope: &Scope,
        state: &mut PassState,
    ) -> Option<JsonValue> {
        match Resolver::resolve(binding, scope) {
            Ok(value) => value.to_json(),
            Err(error) => {
                state.binding_failed(ref_id, target, error);
                None
            }
        }
    }

    fn resolve_class_list(
        &self,
        node: &TemplateNode,
        ref_id: &str,
        scope: &Scope,
        state: &mut PassState,
    ) -> Vec<String> {
        let mut classes = Vec::new();
        for binding in &node.class_list {
            let value = match Resolver::resolve(binding, scope) {
                Ok(value) => value,
                Err(error) => {
                    state.binding_failed(ref_id, "classList", error);
                    continue;
                }
            };
            push_classes(&value, &mut classes);
        }
        classes
    }

    fn resolve_inline_style(
        &self,
        inline: &StyleSpec,
        ref_id: &str,
        scope: &Scope,
        state: &mut PassState,
    ) -> BTreeMap<String, JsonValue> {
        match inline {
            StyleSpec::Map(entries) => {
                let mut style = BTreeMap::new();
                for (name, binding) in entries {
                    let target = format!("style.{}", name);
                    if let Some(value) = self.resolve_value(binding, ref_id, &target, scope, state) {
                        style.insert(name.clone(), value);
                    }
                }
                style
            }
            StyleSpec::Bound(binding) => match Resolver::resolve(binding, scope) {
                Ok(Value::Object(map)) => map
                    .into_iter()
                    .filter_map(|(k, v)| v.to_json().map(|json| (k, json)))
                    .collect(),
                Ok(Value::String(text)) => StyleResolver::parse_inline_style(&text),
                Ok(other) => {
                    if !other.is_nullish() {
                        tracing::debug!(node = ref_id, found = other.type_name(), "style binding ignored");
                    }
                    BTreeMap::new()
                }
                Err(error) => {
                    state.binding_failed(ref_id, "style", error);
                    BTreeMap::new()
                }
            },
        }
    }
}

/// classList 项：字符串按空白拆分，数组逐项展开，假值跳过
fn push_classes(value: &Value, classes: &mut Vec<String>) {
    match value {
        Value::String(s) => classes.extend(s.split_whitespace().map(|c| c.to_string())),
        Value::Array(items) => {
            for item in items {
                push_classes(item, classes);
            }
        }
        other if other.is_truthy() => classes.push(other.to_string()),
        _ => {}
    }
}
