//! QuickJS 运行时

use crate::error::ScriptError;
use rquickjs::{Context, Result as JsResult, Runtime, Value};

/// JS 运行时
pub struct JsRuntime {
    _runtime: Runtime,
    context: Context,
}

impl JsRuntime {
    pub fn new() -> Result<Self, ScriptError> {
        let runtime = Runtime::new().map_err(|e| ScriptError::Init(e.to_string()))?;
        let context = Context::full(&runtime).map_err(|e| ScriptError::Init(e.to_string()))?;

        Ok(Self {
            _runtime: runtime,
            context,
        })
    }

    /// 执行 JS 代码，结果转为字符串
    pub fn eval(&self, code: &str) -> Result<String, ScriptError> {
        self.context.with(|ctx| {
            let result: JsResult<Value> = ctx.eval(code);
            match result {
                Ok(val) => Ok(value_to_string(&val)),
                Err(e) => Err(ScriptError::Eval(format!("{:?}", e))),
            }
        })
    }

    /// 执行返回 JSON 文本的代码并解析
    pub fn eval_json<T: serde::de::DeserializeOwned>(&self, code: &str) -> Result<T, ScriptError> {
        let text = self.eval(code)?;
        serde_json::from_str(&text).map_err(|e| ScriptError::Marshal(format!("{}: {}", e, text)))
    }
}

/// 将 JS Value 转换为字符串
fn value_to_string(val: &Value) -> String {
    if val.is_undefined() {
        "undefined".to_string()
    } else if val.is_null() {
        "null".to_string()
    } else if let Some(s) = val.as_string() {
        s.to_string().unwrap_or_default()
    } else if let Some(n) = val.as_int() {
        n.to_string()
    } else if let Some(n) = val.as_float() {
        n.to_string()
    } else if let Some(b) = val.as_bool() {
        b.to_string()
    } else {
        "[object]".to_string()
    }
}
