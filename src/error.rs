//! 错误类型
//!
//! 渲染核心中没有致命错误：绑定、指令、事件的错误都在局部恢复，
//! 只记录到 `RenderPass::diagnostics` 并降级输出。

use thiserror::Error;

/// 模板加载错误
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template data must be a JSON object, got {0}")]
    InvalidData(String),
}

/// 表达式语法错误
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} at offset {position}")]
pub struct ExpressionError {
    pub message: String,
    pub position: usize,
}

impl ExpressionError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self { message: message.into(), position }
    }
}

/// 绑定求值错误（属性降级为缺省）
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BindingError {
    #[error("cannot read property `{property}` of {base}")]
    MissingPath { property: String, base: String },

    #[error("invalid expression `{source_text}`: {error}")]
    Invalid { source_text: String, error: ExpressionError },
}

/// 指令求值错误（整棵子树缺省）
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DirectiveError {
    #[error("repeat over `{expr}` is not iterable: {found}")]
    NotIterable { expr: String, found: String },

    #[error("repeat is not allowed on the template root")]
    RootRepeat,

    #[error("directive binding failed: {0}")]
    Binding(#[from] BindingError),
}

/// 事件处理错误（事件被丢弃）
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HandlerError {
    #[error("handler `{0}` not found")]
    NotFound(String),

    #[error("handler `{name}` failed: {message}")]
    Failed { name: String, message: String },
}

/// 宿主能力调用错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    #[error("unknown native module `{module}.{method}`")]
    UnknownModule { module: String, method: String },

    #[error("bad arguments for `{module}.{method}`: {message}")]
    BadArguments { module: String, method: String, message: String },
}

/// 脚本引擎错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScriptError {
    #[error("js runtime init failed: {0}")]
    Init(String),

    #[error("js evaluation failed: {0}")]
    Eval(String),

    #[error("js returned malformed JSON: {0}")]
    Marshal(String),
}

/// 一次渲染 / 分发中被恢复的错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    #[error("binding `{target}` on {node}: {error}")]
    BindingEvaluation { node: String, target: String, error: BindingError },

    #[error("directive on {node}: {error}")]
    DirectiveEvaluation { node: String, error: DirectiveError },

    #[error("dispatch `{event}` on {node}: {error}")]
    HandlerDispatch { node: String, event: String, error: HandlerError },
}

/// 运行时错误
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("page `{0}` not found")]
    PageNotFound(String),

    #[error("page `{0}` already exists")]
    PageExists(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}
