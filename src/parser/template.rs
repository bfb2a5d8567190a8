//! 模板文档 - 解析带绑定声明的 JSON 模板
//!
//! 所有绑定表达式在加载时编译为 AST；语法错误不会让加载失败，
//! 而是保留为 `Binding::Invalid`，在渲染时降级。

use super::expression::{Expr, ExpressionParser};
use crate::binding::{DataContext, Props, Value};
use crate::error::{ExpressionError, TemplateError};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;

/// 绑定标记键 `{"@binding": "expr"}`
pub const BINDING_KEY: &str = "@binding";
/// 字符串简写前缀 `"@binding:expr"`
pub const BINDING_PREFIX: &str = "@binding:";

/// 可绑定的值
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Literal(Value),
    Expr { source: String, expr: Expr },
    /// 属性拼接：`["prefix-", {"@binding": "x"}]`
    Concat(Vec<Binding>),
    Invalid { source: String, error: ExpressionError },
}

impl Binding {
    /// 编译表达式源码
    pub fn expression(source: &str) -> Self {
        let source = source.trim();
        match ExpressionParser::parse(source) {
            Ok(expr) => Binding::Expr { source: source.to_string(), expr },
            Err(error) => Binding::Invalid { source: source.to_string(), error },
        }
    }

    /// 编译 JSON 值；数组按字面量处理
    pub fn compile(json: &JsonValue) -> Self {
        if let Some(source) = binding_source(json) {
            return Self::expression(source);
        }
        Binding::Literal(Value::from(json))
    }

    /// 编译属性值；数组视为拼接
    pub fn compile_concat(json: &JsonValue) -> Self {
        match json {
            JsonValue::Array(parts) => Binding::Concat(parts.iter().map(Self::compile).collect()),
            other => Self::compile(other),
        }
    }

    /// 用于日志的源码
    pub fn source(&self) -> String {
        match self {
            Binding::Literal(v) => v.to_string(),
            Binding::Expr { source, .. } | Binding::Invalid { source, .. } => source.clone(),
            Binding::Concat(parts) => parts.iter().map(|p| p.source()).collect::<Vec<_>>().join(" + "),
        }
    }
}

fn binding_source(json: &JsonValue) -> Option<&str> {
    match json {
        JsonValue::Object(map) if map.len() == 1 => map.get(BINDING_KEY).and_then(|v| v.as_str()),
        JsonValue::String(s) => s.strip_prefix(BINDING_PREFIX),
        _ => None,
    }
}

/// repeat 指令
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatDirective {
    pub source: Binding,
    pub alias: String,
    pub iterator1: Option<String>,
    pub key: Option<Binding>,
}

/// 事件绑定
#[derive(Debug, Clone, PartialEq)]
pub struct EventBinding {
    pub event_type: String,
    pub handler: String,
    pub params: Vec<Binding>,
}

/// 样式：逐项绑定或整体绑定
#[derive(Debug, Clone, PartialEq)]
pub enum StyleSpec {
    Map(BTreeMap<String, Binding>),
    Bound(Binding),
}

/// 静态模板节点
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    pub tag: String,
    pub id: Option<String>,
    pub class_list: Vec<Binding>,
    pub style: Option<StyleSpec>,
    pub attributes: BTreeMap<String, Binding>,
    pub children: Vec<TemplateNode>,
    pub repeat: Option<RepeatDirective>,
    pub match_on: Option<Binding>,
    pub events: Vec<EventBinding>,
}

impl TemplateNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            class_list: Vec::new(),
            style: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            repeat: None,
            match_on: None,
            events: Vec::new(),
        }
    }

    /// 子树节点总数
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|c| c.count()).sum::<usize>()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default, alias = "ref")]
    id: Option<String>,
    #[serde(default)]
    class_list: Vec<JsonValue>,
    #[serde(default)]
    style: Option<JsonValue>,
    #[serde(default)]
    attr: Map<String, JsonValue>,
    #[serde(default)]
    children: Vec<RawNode>,
    #[serde(default)]
    repeat: Option<RawRepeat>,
    #[serde(default, rename = "match")]
    match_on: Option<JsonValue>,
    #[serde(default)]
    event: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawRepeat {
    #[serde(rename = "for")]
    source: JsonValue,
    #[serde(default = "default_alias")]
    alias: String,
    #[serde(default, alias = "index")]
    iterator1: Option<String>,
    #[serde(default)]
    key: Option<JsonValue>,
}

fn default_alias() -> String {
    "item".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEvent {
    Type(String),
    Full {
        #[serde(rename = "type")]
        event_type: String,
        #[serde(default)]
        handler: Option<String>,
        #[serde(default)]
        params: Vec<JsonValue>,
    },
}

impl From<RawNode> for TemplateNode {
    fn from(raw: RawNode) -> Self {
        let style = raw.style.as_ref().map(|style| match style {
            JsonValue::Object(map) if binding_source(style).is_none() => StyleSpec::Map(
                map.iter().map(|(k, v)| (k.clone(), Binding::compile(v))).collect(),
            ),
            other => StyleSpec::Bound(Binding::compile(other)),
        });

        let repeat = raw.repeat.map(|r| RepeatDirective {
            source: compile_directive(&r.source),
            alias: r.alias,
            iterator1: r.iterator1,
            key: r.key.as_ref().map(compile_directive),
        });

        let events = raw
            .event
            .into_iter()
            .map(|e| match e {
                RawEvent::Type(event_type) => EventBinding {
                    handler: event_type.clone(),
                    event_type,
                    params: Vec::new(),
                },
                RawEvent::Full { event_type, handler, params } => EventBinding {
                    handler: handler.unwrap_or_else(|| event_type.clone()),
                    event_type,
                    params: params.iter().map(Binding::compile).collect(),
                },
            })
            .collect();

        Self {
            tag: raw.tag,
            id: raw.id,
            class_list: raw.class_list.iter().map(Binding::compile).collect(),
            style,
            attributes: raw
                .attr
                .iter()
                .map(|(k, v)| (k.clone(), Binding::compile_concat(v)))
                .collect(),
            children: raw.children.into_iter().map(TemplateNode::from).collect(),
            repeat,
            match_on: raw.match_on.as_ref().map(compile_directive),
            events,
        }
    }
}

/// 指令的值总是表达式：裸字符串也按表达式编译
fn compile_directive(json: &JsonValue) -> Binding {
    match json {
        JsonValue::String(s) => Binding::expression(s.strip_prefix(BINDING_PREFIX).unwrap_or(s)),
        other => Binding::compile(other),
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    body: RawNode,
    #[serde(default)]
    data: JsonValue,
    #[serde(default)]
    styles: BTreeMap<String, Map<String, JsonValue>>,
    #[serde(default)]
    props: Map<String, JsonValue>,
    #[serde(default)]
    computed: Map<String, JsonValue>,
    #[serde(default)]
    components: Vec<JsonValue>,
    #[serde(default)]
    script: Option<JsonValue>,
}

/// 模板文档
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDocument {
    pub body: TemplateNode,
    pub data: DataContext,
    pub styles: BTreeMap<String, Map<String, JsonValue>>,
    pub props: Props,
    /// 计算属性名 → 外部表达式（核心不解释其内容）
    pub computed: BTreeMap<String, JsonValue>,
    pub components: Vec<JsonValue>,
    pub script: Option<String>,
}

impl TemplateDocument {
    pub fn from_json(source: &str) -> Result<Self, TemplateError> {
        let raw: RawDocument = serde_json::from_str(source)?;
        Self::from_raw(raw)
    }

    pub fn from_value(json: JsonValue) -> Result<Self, TemplateError> {
        let raw: RawDocument = serde_json::from_value(json)?;
        Self::from_raw(raw)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&source)
    }

    fn from_raw(raw: RawDocument) -> Result<Self, TemplateError> {
        let data = DataContext::from_json(&raw.data)?;
        let script = raw.script.and_then(|s| match s {
            JsonValue::String(s) => Some(s),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        });

        let document = Self {
            body: TemplateNode::from(raw.body),
            data,
            styles: raw.styles,
            props: raw.props.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
            computed: raw.computed.into_iter().collect(),
            components: raw.components,
            script,
        };

        tracing::debug!(
            nodes = document.body.count(),
            computed = document.computed.len(),
            "template loaded"
        );
        Ok(document)
    }

    pub fn computed_names(&self) -> impl Iterator<Item = &str> {
        self.computed.keys().map(|k| k.as_str())
    }
}
