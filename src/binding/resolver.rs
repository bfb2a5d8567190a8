//! 绑定表达式求值器
//!
//! 纯函数：同样的 (表达式, 作用域) 总是得到同样的结果。缺失的路径
//! 得到 `undefined` 并继续传播；只有在 `undefined`/`null` 上取属性才
//! 返回 `BindingError`，错误止步于调用方，不会中断渲染。

use super::{Scope, Value};
use crate::error::BindingError;
use crate::parser::expression::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::parser::template::Binding;

pub struct Resolver;

impl Resolver {
    /// 求值一个可绑定值
    pub fn resolve(binding: &Binding, scope: &Scope) -> Result<Value, BindingError> {
        match binding {
            Binding::Literal(value) => Ok(value.clone()),
            Binding::Expr { expr, .. } => Self::evaluate(expr, scope),
            Binding::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    let value = Self::resolve(part, scope)?;
                    if !value.is_nullish() {
                        out.push_str(&value.to_string());
                    }
                }
                Ok(Value::String(out))
            }
            Binding::Invalid { source, error } => Err(BindingError::Invalid {
                source_text: source.clone(),
                error: error.clone(),
            }),
        }
    }

    /// 求值表达式 AST
    pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, BindingError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => Ok(scope.lookup(name).unwrap_or(Value::Undefined)),
            Expr::This => Ok(scope.component_object()),
            Expr::Member(base, property) => {
                // this.x 直接查组件状态，不构造整个对象
                if matches!(**base, Expr::This) {
                    return Ok(scope.lookup_component(property).unwrap_or(Value::Undefined));
                }
                let base = Self::evaluate(base, scope)?;
                Self::get_property(&base, property)
            }
            Expr::Index(base, index) => {
                let base = Self::evaluate(base, scope)?;
                let key = Self::evaluate(index, scope)?.to_string();
                Self::get_property(&base, &key)
            }
            Expr::Unary(op, operand) => {
                let value = Self::evaluate(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            Expr::Binary(op, left, right) => {
                let left = Self::evaluate(left, scope)?;
                let right = Self::evaluate(right, scope)?;
                Ok(Self::binary(*op, &left, &right))
            }
            Expr::Logical(op, left, right) => {
                let left = Self::evaluate(left, scope)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => Self::evaluate(right, scope),
                }
            }
            Expr::Conditional(test, consequent, alternate) => {
                if Self::evaluate(test, scope)?.is_truthy() {
                    Self::evaluate(consequent, scope)
                } else {
                    Self::evaluate(alternate, scope)
                }
            }
            Expr::Array(items) => items
                .iter()
                .map(|item| Self::evaluate(item, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    fn get_property(base: &Value, property: &str) -> Result<Value, BindingError> {
        if base.is_nullish() {
            return Err(BindingError::MissingPath {
                property: property.to_string(),
                base: base.type_name().to_string(),
            });
        }
        Ok(base.property(property).unwrap_or(Value::Undefined))
    }

    fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
        match op {
            BinaryOp::Add => {
                if is_stringish(left) || is_stringish(right) {
                    Value::String(format!("{}{}", left, right))
                } else {
                    Value::Number(left.to_number() + right.to_number())
                }
            }
            BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
            BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
            BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
            BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
            BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
            BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
            BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
            BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                Value::Bool(compare(op, left, right))
            }
        }
    }
}

/// `+` 中会触发字符串拼接的操作数
fn is_stringish(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return match op {
            BinaryOp::Lt => a < b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (left.to_number(), right.to_number());
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}
