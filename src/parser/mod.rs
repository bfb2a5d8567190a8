//! 模板与表达式解析器

pub mod expression;
pub mod template;

pub use expression::{Expr, ExpressionParser};
pub use template::{Binding, EventBinding, RepeatDirective, StyleSpec, TemplateDocument, TemplateNode};
