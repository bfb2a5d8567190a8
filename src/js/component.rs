//! 脚本组件 - 由 JS 提供计算属性和事件处理函数
//!
//! 脚本需要给全局变量 `component` 赋值：
//!
//! ```js
//! component = {
//!   computed: { isWin() { return this.tiles.join() === '1,2,3'; } },
//!   methods: { move(i) { this.setState({ steps: this.steps + 1 }); } },
//! };
//! ```
//!
//! Rust 与 JS 之间只交换 JSON 文本。

use super::JsRuntime;
use crate::binding::{ComputedProvider, DataContext, Props, Value};
use crate::error::{HandlerError, ScriptError};
use crate::event::{HandlerContext, HandlerRegistry};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::rc::Rc;

const PRELUDE: &str = r#"
var component = undefined;
function __lite_self(data, props) {
  var self = Object.assign({}, data);
  self.props = props;
  return self;
}
function __lite_call(fn, self, args) {
  try {
    var r = fn.apply(self, args);
    return { ok: true, undefined: r === undefined, value: r === undefined ? null : r };
  } catch (e) {
    return { ok: false, error: String((e && e.message) || e) };
  }
}
function __lite_computed(name, data, props) {
  var c = component && component.computed && component.computed[name];
  if (typeof c !== 'function') return JSON.stringify({ missing: true });
  return JSON.stringify(__lite_call(c, __lite_self(data, props), []));
}
function __lite_method(name, data, props, args) {
  var m = component && component.methods && component.methods[name];
  if (typeof m !== 'function') return JSON.stringify({ missing: true });
  var updates = [];
  var natives = [];
  var self = __lite_self(data, props);
  self.setState = function (partial) { updates.push(partial); };
  self.callNative = function (module, method) {
    natives.push({ module: module, method: method, args: Array.prototype.slice.call(arguments, 2) });
  };
  var reply = __lite_call(m, self, args);
  reply.updates = updates;
  reply.natives = natives;
  return JSON.stringify(reply);
}
function __lite_names() {
  var c = (component && component.computed) || {};
  var m = (component && component.methods) || {};
  return JSON.stringify({ computed: Object.keys(c), methods: Object.keys(m), valid: typeof component === 'object' && component !== null });
}
"#;

#[derive(Debug, Default, Deserialize)]
struct ScriptReply {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    undefined: bool,
    #[serde(default)]
    value: JsonValue,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    updates: Vec<JsonValue>,
    #[serde(default)]
    natives: Vec<NativeCall>,
}

#[derive(Debug, Deserialize)]
struct NativeCall {
    module: String,
    method: String,
    #[serde(default)]
    args: Vec<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ScriptNames {
    computed: Vec<String>,
    methods: Vec<String>,
    valid: bool,
}

/// JS 脚本组件
pub struct ScriptComponent {
    runtime: JsRuntime,
    computed: Vec<String>,
    methods: Vec<String>,
}

impl ScriptComponent {
    pub fn new(source: &str) -> Result<Self, ScriptError> {
        let runtime = JsRuntime::new()?;
        runtime.eval(PRELUDE)?;
        runtime.eval(source)?;

        let names: ScriptNames = runtime.eval_json("__lite_names()")?;
        if !names.valid {
            return Err(ScriptError::Eval("script did not assign `component`".to_string()));
        }
        tracing::info!(
            computed = names.computed.len(),
            methods = names.methods.len(),
            "script component loaded"
        );

        Ok(Self {
            runtime,
            computed: names.computed,
            methods: names.methods,
        })
    }

    /// 脚本声明的计算属性名
    pub fn computed_names(&self) -> &[String] {
        &self.computed
    }

    /// 以共享方式同时作为计算属性提供者和处理函数注册表
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    fn call(&self, function: &str, name: &str, data: &DataContext, props: &Props, args: Option<&[Value]>) -> Result<ScriptReply, ScriptError> {
        let props_json: serde_json::Map<String, JsonValue> = props
            .iter()
            .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
            .collect();
        let mut code = format!(
            "{}({}, {}, {}",
            function,
            JsonValue::from(name),
            data.to_json(),
            JsonValue::Object(props_json)
        );
        if let Some(args) = args {
            let args: Vec<JsonValue> = args.iter().map(|a| a.to_json().unwrap_or(JsonValue::Null)).collect();
            code.push_str(", ");
            code.push_str(&JsonValue::Array(args).to_string());
        }
        code.push(')');
        self.runtime.eval_json(&code)
    }

    /// 计算属性求值；脚本异常记日志后当作不可用
    pub fn evaluate_computed(&self, name: &str, data: &DataContext, props: &Props) -> Result<Option<Value>, ScriptError> {
        let reply = self.call("__lite_computed", name, data, props, None)?;
        if reply.missing {
            return Ok(None);
        }
        if !reply.ok {
            return Err(ScriptError::Eval(reply.error.unwrap_or_default()));
        }
        if reply.undefined {
            return Ok(Some(Value::Undefined));
        }
        Ok(Some(Value::from(reply.value)))
    }

    pub fn invoke_method(&self, name: &str, args: &[Value], ctx: &mut HandlerContext) -> Result<(), HandlerError> {
        let failed = |message: String| HandlerError::Failed {
            name: name.to_string(),
            message,
        };

        let reply = self
            .call("__lite_method", name, ctx.data(), ctx.props(), Some(args))
            .map_err(|e| failed(e.to_string()))?;
        if reply.missing {
            return Err(HandlerError::NotFound(name.to_string()));
        }

        // 抛异常之前调用的 setState 仍然生效
        for update in &reply.updates {
            match DataContext::from_json(update) {
                Ok(partial) => ctx.set_state(partial),
                Err(error) => tracing::warn!(handler = name, %error, "setState ignored"),
            }
        }
        for call in reply.natives {
            let args: Vec<Value> = call.args.iter().map(Value::from).collect();
            if let Err(error) = ctx.call_module(&call.module, &call.method, &args) {
                tracing::warn!(handler = name, %error, "native call from script failed");
            }
        }

        if reply.ok {
            Ok(())
        } else {
            Err(failed(reply.error.unwrap_or_default()))
        }
    }
}

impl std::fmt::Debug for ScriptComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptComponent")
            .field("computed", &self.computed)
            .field("methods", &self.methods)
            .finish()
    }
}

impl ComputedProvider for ScriptComponent {
    fn compute(&self, name: &str, data: &DataContext, props: &Props) -> Option<Value> {
        match self.evaluate_computed(name, data, props) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(computed = name, %error, "computed script failed");
                None
            }
        }
    }
}

impl HandlerRegistry for ScriptComponent {
    fn invoke(&mut self, name: &str, args: &[Value], ctx: &mut HandlerContext) -> Result<(), HandlerError> {
        self.invoke_method(name, args, ctx)
    }
}

impl ComputedProvider for Rc<ScriptComponent> {
    fn compute(&self, name: &str, data: &DataContext, props: &Props) -> Option<Value> {
        self.as_ref().compute(name, data, props)
    }
}

impl HandlerRegistry for Rc<ScriptComponent> {
    fn invoke(&mut self, name: &str, args: &[Value], ctx: &mut HandlerContext) -> Result<(), HandlerError> {
        self.invoke_method(name, args, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryModules;
    use crate::event::StateChange;

    const SCRIPT: &str = r#"
        component = {
          computed: {
            total() { return this.items.length; },
            label() { return this.props.prefix + this.name; },
            broken() { throw new Error('boom'); },
          },
          methods: {
            add(n) { this.setState({ count: this.count + n }); },
            save() { this.callNative('storage', 'setItem', 'count', this.count); },
            fail() { throw new Error('nope'); },
            tag() { this.setState({ tag: this.props.prefix + this.name }); },
          },
        };
    "#;

    fn data() -> DataContext {
        DataContext::from_json(&serde_json::json!({"items": [1, 2, 3], "name": "tiles", "count": 2})).unwrap()
    }

    #[test]
    fn test_script_computed() {
        let script = ScriptComponent::new(SCRIPT).unwrap();
        let mut props = Props::new();
        props.insert("prefix".to_string(), Value::from("#"));

        assert_eq!(script.compute("total", &data(), &props), Some(Value::Number(3.0)));
        assert_eq!(script.compute("label", &data(), &props), Some(Value::from("#tiles")));
        assert_eq!(script.compute("unknown", &data(), &props), None);
        assert_eq!(script.compute("broken", &data(), &props), None);
        assert_eq!(script.computed_names().len(), 3);
    }

    #[test]
    fn test_script_methods_collect_state() {
        let mut script = ScriptComponent::new(SCRIPT).unwrap();
        let data = data();
        let props = Props::new();
        let mut modules = MemoryModules::new();

        let mut ctx = HandlerContext::new(&data, &props, &mut modules);
        script.invoke("add", &[Value::Number(5.0)], &mut ctx).unwrap();
        script.invoke("save", &[], &mut ctx).unwrap();
        let changes = ctx.into_changes();

        let mut expected = DataContext::new();
        expected.insert("count", 7.0);
        assert_eq!(changes, vec![StateChange::Merge(expected)]);
        assert_eq!(modules.storage().get("count").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_script_errors() {
        let mut script = ScriptComponent::new(SCRIPT).unwrap();
        let data = data();
        let props = Props::new();
        let mut modules = MemoryModules::new();
        let mut ctx = HandlerContext::new(&data, &props, &mut modules);

        assert!(matches!(
            script.invoke("fail", &[], &mut ctx),
            Err(HandlerError::Failed { .. })
        ));
        assert_eq!(
            script.invoke("missing", &[], &mut ctx),
            Err(HandlerError::NotFound("missing".to_string()))
        );
        assert!(ScriptComponent::new("var x = 1;").is_err());
        assert!(ScriptComponent::new("component = {").is_err());
    }

    #[test]
    fn test_script_methods_see_props() {
        let mut script = ScriptComponent::new(SCRIPT).unwrap();
        let data = data();
        let mut props = Props::new();
        props.insert("prefix".to_string(), Value::from("#"));
        let mut modules = MemoryModules::new();

        let mut ctx = HandlerContext::new(&data, &props, &mut modules);
        script.invoke("tag", &[], &mut ctx).unwrap();

        let mut expected = DataContext::new();
        expected.insert("tag", "#tiles");
        assert_eq!(ctx.into_changes(), vec![StateChange::Merge(expected)]);
    }
}
