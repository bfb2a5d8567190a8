//! 宿主桥接能力
//!
//! 核心不持有任何全局对象，宿主通过这里的 trait 注入能力：
//! 元素创建、刷新回调注册、原生模块调用（存储、导航、提示）。

use crate::binding::{DataContext, Value};
use crate::error::{HostError, TemplateError};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// 宿主侧节点句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u64);

/// 传给 `create_element` 的已解析属性
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementProps {
    pub ref_id: String,
    pub key: Option<String>,
    pub class_list: Vec<String>,
    pub style: BTreeMap<String, JsonValue>,
    pub attributes: BTreeMap<String, JsonValue>,
    pub events: Vec<String>,
}

/// 刷新队列句柄
///
/// 宿主可以在任何时候推入新的数据上下文；组件实例只在两次渲染之间
/// 取出并整体替换，渲染进行中的刷新会排队等待。
#[derive(Debug, Clone, Default)]
pub struct RefreshQueue {
    pending: Arc<Mutex<VecDeque<DataContext>>>,
}

impl RefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&self, data: DataContext) {
        self.pending.lock().push_back(data);
    }

    /// 原生层传来的 JSON 字符串
    pub fn refresh_json(&self, data: &str) -> Result<(), TemplateError> {
        let json: JsonValue = serde_json::from_str(data)?;
        self.refresh(DataContext::from_json(&json)?);
        Ok(())
    }

    /// 获取并清空队列
    pub fn drain(&self) -> Vec<DataContext> {
        let mut pending = self.pending.lock();
        pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

/// 渲染宿主
pub trait RenderHost {
    /// 子节点先于父节点创建
    fn create_element(&mut self, tag: &str, props: &ElementProps, children: Vec<NodeHandle>) -> NodeHandle;

    /// 挂载时调用一次，宿主保存句柄以便之后推送刷新
    fn register_refresh_handler(&mut self, queue: RefreshQueue);

    /// 一次渲染完成后提交新根节点
    fn commit(&mut self, _root: Option<NodeHandle>) {}
}

/// 原生模块宿主
pub trait ModuleHost {
    fn call_module(&mut self, module: &str, method: &str, args: &[Value]) -> Result<Value, HostError>;
}

/// 记录下来的元素
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedElement {
    pub tag: String,
    pub props: ElementProps,
    pub children: Vec<NodeHandle>,
}

/// 内存中的渲染宿主，记录所有创建的元素
#[derive(Debug, Default)]
pub struct RecordingHost {
    next_id: u64,
    elements: HashMap<NodeHandle, RecordedElement>,
    refresh: Option<RefreshQueue>,
    roots: Vec<Option<NodeHandle>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, handle: NodeHandle) -> Option<&RecordedElement> {
        self.elements.get(&handle)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// 最近一次提交的根
    pub fn root(&self) -> Option<NodeHandle> {
        self.roots.last().copied().flatten()
    }

    pub fn commit_count(&self) -> usize {
        self.roots.len()
    }

    pub fn refresh_queue(&self) -> Option<&RefreshQueue> {
        self.refresh.as_ref()
    }

    /// 从某个句柄开始按深度优先列出标签
    pub fn tags(&self, handle: NodeHandle) -> Vec<String> {
        let mut out = Vec::new();
        self.walk(handle, &mut out);
        out
    }

    fn walk(&self, handle: NodeHandle, out: &mut Vec<String>) {
        if let Some(element) = self.elements.get(&handle) {
            out.push(element.tag.clone());
            for child in &element.children {
                self.walk(*child, out);
            }
        }
    }
}

impl RenderHost for RecordingHost {
    fn create_element(&mut self, tag: &str, props: &ElementProps, children: Vec<NodeHandle>) -> NodeHandle {
        self.next_id += 1;
        let handle = NodeHandle(self.next_id);
        self.elements.insert(
            handle,
            RecordedElement {
                tag: tag.to_string(),
                props: props.clone(),
                children,
            },
        );
        handle
    }

    fn register_refresh_handler(&mut self, queue: RefreshQueue) {
        self.refresh = Some(queue);
    }

    fn commit(&mut self, root: Option<NodeHandle>) {
        self.roots.push(root);
    }
}

/// 模块调用记录
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    StorageSet { key: String, value: String },
    StorageRemove { key: String },
    StorageClear,
    NavigateTo(String),
    NavigateBack,
    ShowToast { message: String, duration: u32 },
}

/// 内存实现的原生模块：storage / navigator / modal
#[derive(Debug, Default)]
pub struct MemoryModules {
    storage: HashMap<String, String>,
    history: Vec<String>,
    events: Vec<BridgeEvent>,
}

impl MemoryModules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(&self) -> &HashMap<String, String> {
        &self.storage
    }

    /// 获取并清空调用记录
    pub fn drain_events(&mut self) -> Vec<BridgeEvent> {
        std::mem::take(&mut self.events)
    }

    fn storage_call(&mut self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        match method {
            "setItem" => {
                let key = string_arg("storage", method, args, 0)?;
                let value = string_arg("storage", method, args, 1)?;
                self.storage.insert(key.clone(), value.clone());
                self.events.push(BridgeEvent::StorageSet { key, value });
                Ok(Value::Undefined)
            }
            "getItem" => {
                let key = string_arg("storage", method, args, 0)?;
                Ok(self
                    .storage
                    .get(&key)
                    .map(|v| Value::String(v.clone()))
                    .unwrap_or(Value::Undefined))
            }
            "removeItem" => {
                let key = string_arg("storage", method, args, 0)?;
                self.storage.remove(&key);
                self.events.push(BridgeEvent::StorageRemove { key });
                Ok(Value::Undefined)
            }
            "clear" => {
                self.storage.clear();
                self.events.push(BridgeEvent::StorageClear);
                Ok(Value::Undefined)
            }
            _ => Err(unknown("storage", method)),
        }
    }

    fn navigator_call(&mut self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        match method {
            "push" => {
                let url = string_arg("navigator", method, args, 0)?;
                self.history.push(url.clone());
                self.events.push(BridgeEvent::NavigateTo(url));
                Ok(Value::Undefined)
            }
            "pop" => {
                self.events.push(BridgeEvent::NavigateBack);
                Ok(self.history.pop().map(Value::String).unwrap_or(Value::Undefined))
            }
            _ => Err(unknown("navigator", method)),
        }
    }

    fn modal_call(&mut self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        match method {
            "toast" => {
                let message = string_arg("modal", method, args, 0)?;
                let duration = args
                    .get(1)
                    .map(|v| v.to_number())
                    .filter(|n| n.is_finite() && *n >= 0.0)
                    .map(|n| n as u32)
                    .unwrap_or(1500);
                self.events.push(BridgeEvent::ShowToast { message, duration });
                Ok(Value::Undefined)
            }
            _ => Err(unknown("modal", method)),
        }
    }
}

impl ModuleHost for MemoryModules {
    fn call_module(&mut self, module: &str, method: &str, args: &[Value]) -> Result<Value, HostError> {
        tracing::debug!(module, method, argc = args.len(), "native module call");
        match module {
            "storage" => self.storage_call(method, args),
            "navigator" => self.navigator_call(method, args),
            "modal" => self.modal_call(method, args),
            _ => Err(unknown(module, method)),
        }
    }
}

fn unknown(module: &str, method: &str) -> HostError {
    HostError::UnknownModule {
        module: module.to_string(),
        method: method.to_string(),
    }
}

fn string_arg(module: &str, method: &str, args: &[Value], index: usize) -> Result<String, HostError> {
    match args.get(index) {
        Some(value) if !value.is_undefined() => Ok(value.to_string()),
        _ => Err(HostError::BadArguments {
            module: module.to_string(),
            method: method.to_string(),
            message: format!("missing argument #{}", index),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_module() {
        let mut modules = MemoryModules::new();
        modules
            .call_module("storage", "setItem", &[Value::from("best"), Value::Number(12.0)])
            .unwrap();
        assert_eq!(
            modules.call_module("storage", "getItem", &[Value::from("best")]).unwrap(),
            Value::from("12")
        );
        assert!(modules.call_module("storage", "getItem", &[]).is_err());
        assert!(matches!(
            modules.call_module("camera", "open", &[]),
            Err(HostError::UnknownModule { .. })
        ));
    }

    #[test]
    fn test_refresh_queue_drains_in_order() {
        let queue = RefreshQueue::new();
        queue.refresh_json(r#"{"n": 1}"#).unwrap();
        queue.refresh_json(r#"{"n": 2}"#).unwrap();
        assert!(queue.refresh_json("[1]").is_err());

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].get("n"), Some(&Value::Number(2.0)));
        assert!(queue.is_empty());
    }
}
