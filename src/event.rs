//! 事件系统 - 把 UI 事件映射到节点声明的处理函数
//!
//! 分发是同步的，发生在两次渲染之间。处理函数产生的状态变更只被
//! 收集起来交给组件实例，由实例安排下一次渲染。

use crate::binding::{DataContext, Props, Resolver, Scope, Value};
use crate::bridge::ModuleHost;
use crate::error::{HandlerError, HostError, RenderError};
use crate::renderer::RenderPass;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// 宿主触发的 UI 事件
#[derive(Debug, Clone, PartialEq)]
pub struct UiEvent {
    pub event_type: String,
    /// 目标节点的 ref
    pub target: String,
    pub payload: JsonValue,
}

impl UiEvent {
    pub fn new(event_type: &str, target: &str, payload: JsonValue) -> Self {
        Self {
            event_type: event_type.to_string(),
            target: target.to_string(),
            payload,
        }
    }
}

/// 状态变更（setState）
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// 按顶层键合并
    Merge(DataContext),
    /// 整体替换
    Replace(DataContext),
}

impl StateChange {
    pub fn apply(self, data: &mut DataContext) {
        match self {
            StateChange::Merge(partial) => data.merge(partial),
            StateChange::Replace(next) => *data = next,
        }
    }
}

/// 处理函数可用的能力
///
/// `data()` 始终是分发时的快照，`set_state` 的效果在下一次渲染才可见。
pub struct HandlerContext<'a> {
    data: &'a DataContext,
    props: &'a Props,
    modules: &'a mut dyn ModuleHost,
    changes: Vec<StateChange>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(data: &'a DataContext, props: &'a Props, modules: &'a mut dyn ModuleHost) -> Self {
        Self {
            data,
            props,
            modules,
            changes: Vec::new(),
        }
    }

    pub fn data(&self) -> &DataContext {
        self.data
    }

    /// 父级传入的 props
    pub fn props(&self) -> &Props {
        self.props
    }

    pub fn set_state(&mut self, partial: DataContext) {
        self.changes.push(StateChange::Merge(partial));
    }

    pub fn call_module(&mut self, module: &str, method: &str, args: &[Value]) -> Result<Value, HostError> {
        self.modules.call_module(module, method, args)
    }

    pub fn into_changes(self) -> Vec<StateChange> {
        self.changes
    }
}

/// 具名处理函数注册表
pub trait HandlerRegistry {
    fn invoke(&mut self, name: &str, args: &[Value], ctx: &mut HandlerContext) -> Result<(), HandlerError>;
}

type HandlerFn = Box<dyn FnMut(&[Value], &mut HandlerContext)>;

/// 闭包实现的注册表
#[derive(Default)]
pub struct HandlerMap {
    handlers: HashMap<String, HandlerFn>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: FnMut(&[Value], &mut HandlerContext) + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    pub fn with<F>(mut self, name: &str, handler: F) -> Self
    where
        F: FnMut(&[Value], &mut HandlerContext) + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl HandlerRegistry for HandlerMap {
    fn invoke(&mut self, name: &str, args: &[Value], ctx: &mut HandlerContext) -> Result<(), HandlerError> {
        let handler = self
            .handlers
            .get_mut(name)
            .ok_or_else(|| HandlerError::NotFound(name.to_string()))?;
        handler(args, ctx);
        Ok(())
    }
}

/// 一次分发的结果
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// 实际调用的处理函数
    pub invoked: Vec<String>,
    pub changes: Vec<StateChange>,
    pub errors: Vec<RenderError>,
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        !self.invoked.is_empty()
    }
}

/// 事件分发器
pub struct EventDispatcher {
    event_variable: String,
    root_ref: String,
}

impl EventDispatcher {
    pub fn new(event_variable: &str, root_ref: &str) -> Self {
        Self {
            event_variable: event_variable.to_string(),
            root_ref: root_ref.to_string(),
        }
    }

    /// 按节点声明顺序调用所有匹配的处理函数
    pub fn dispatch(
        &self,
        event: &UiEvent,
        pass: &RenderPass,
        data: &DataContext,
        props: &Props,
        handlers: &mut dyn HandlerRegistry,
        modules: &mut dyn ModuleHost,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        if event.target == self.root_ref {
            tracing::warn!(event = %event.event_type, "event on root skipped");
            return outcome;
        }
        let Some(site) = pass.events.get(&event.target) else {
            tracing::debug!(target_ref = %event.target, event = %event.event_type, "no event site for ref");
            return outcome;
        };

        let mut scope = Scope::new(data, &pass.computed, props).with_frames(site.locals.clone());
        scope.push_frame(vec![(self.event_variable.clone(), Value::from(&event.payload))]);

        for binding in site.bindings.iter().filter(|b| b.event_type == event.event_type) {
            let mut args = Vec::with_capacity(binding.params.len());
            for (index, param) in binding.params.iter().enumerate() {
                match Resolver::resolve(param, &scope) {
                    Ok(value) => args.push(value),
                    Err(error) => {
                        tracing::debug!(%error, index, handler = %binding.handler, "event argument degraded");
                        outcome.errors.push(RenderError::BindingEvaluation {
                            node: event.target.clone(),
                            target: format!("event.{}.params[{}]", event.event_type, index),
                            error,
                        });
                        args.push(Value::Undefined);
                    }
                }
            }

            let mut ctx = HandlerContext::new(data, props, &mut *modules);
            let result = handlers.invoke(&binding.handler, &args, &mut ctx);
            // 失败之前提交的 setState 同样保留
            outcome.changes.extend(ctx.into_changes());
            match result {
                Ok(()) => outcome.invoked.push(binding.handler.clone()),
                Err(error) => {
                    tracing::warn!(%error, node = %event.target, "event dropped");
                    outcome.errors.push(RenderError::HandlerDispatch {
                        node: event.target.clone(),
                        event: event.event_type.clone(),
                        error,
                    });
                }
            }
        }

        outcome
    }
}
