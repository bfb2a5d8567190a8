//! 组件实例 - 持有模板、数据和最近一次渲染结果

use crate::binding::{ComputedProvider, DataContext, NoComputed};
use crate::bridge::{ElementProps, MemoryModules, ModuleHost, NodeHandle, RefreshQueue, RenderHost};
use crate::config::EngineConfig;
use crate::event::{DispatchOutcome, EventDispatcher, HandlerMap, HandlerRegistry, StateChange, UiEvent};
use crate::js::ScriptComponent;
use crate::parser::TemplateDocument;
use crate::renderer::{Materializer, RenderPass, RenderedNode};
use serde_json::Value as JsonValue;

/// 组件实例
///
/// 渲染是同步的，一次 `render()` 运行到结束。数据变更（`set_state`、
/// 事件处理、宿主刷新）只会把实例标记为 dirty，下一次 `flush()` 才重新渲染。
pub struct ComponentInstance {
    document: TemplateDocument,
    config: EngineConfig,
    data: DataContext,
    computed: Box<dyn ComputedProvider>,
    handlers: Box<dyn HandlerRegistry>,
    modules: Box<dyn ModuleHost>,
    dispatcher: EventDispatcher,
    refresh: RefreshQueue,
    last_pass: Option<RenderPass>,
    dirty: bool,
    passes: u64,
}

impl ComponentInstance {
    /// 初始数据取自模板的 `data` 字段
    pub fn new(document: TemplateDocument, config: EngineConfig) -> Self {
        let data = document.data.clone();
        let dispatcher = EventDispatcher::new(&config.event_variable, &config.root_ref);
        Self {
            document,
            config,
            data,
            computed: Box::new(NoComputed),
            handlers: Box::new(HandlerMap::new()),
            modules: Box::new(MemoryModules::new()),
            dispatcher,
            refresh: RefreshQueue::new(),
            last_pass: None,
            dirty: true,
            passes: 0,
        }
    }

    pub fn with_data(mut self, data: DataContext) -> Self {
        self.data = data;
        self.dirty = true;
        self
    }

    pub fn with_computed(mut self, computed: impl ComputedProvider + 'static) -> Self {
        self.computed = Box::new(computed);
        self.dirty = true;
        self
    }

    pub fn with_handlers(mut self, handlers: impl HandlerRegistry + 'static) -> Self {
        self.handlers = Box::new(handlers);
        self
    }

    pub fn with_modules(mut self, modules: impl ModuleHost + 'static) -> Self {
        self.modules = Box::new(modules);
        self
    }

    /// 脚本同时提供计算属性和处理函数
    pub fn with_script(mut self, script: ScriptComponent) -> Self {
        for name in script.computed_names() {
            self.document
                .computed
                .entry(name.clone())
                .or_insert(JsonValue::Null);
        }
        let shared = script.shared();
        self.computed = Box::new(shared.clone());
        self.handlers = Box::new(shared);
        self.dirty = true;
        self
    }

    pub fn document(&self) -> &TemplateDocument {
        &self.document
    }

    pub fn data(&self) -> &DataContext {
        &self.data
    }

    pub fn last_pass(&self) -> Option<&RenderPass> {
        self.last_pass.as_ref()
    }

    pub fn needs_render(&self) -> bool {
        self.dirty || self.last_pass.is_none()
    }

    /// 已完成的渲染次数
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// 交给宿主的刷新句柄
    pub fn refresh_queue(&self) -> RefreshQueue {
        self.refresh.clone()
    }

    /// 执行一次完整渲染
    pub fn render(&mut self) -> &RenderPass {
        let pass = Materializer::new(&self.document, &self.config).render(&self.data, self.computed.as_ref());
        self.passes += 1;
        self.dirty = false;
        if !pass.diagnostics.is_empty() {
            tracing::debug!(pass = self.passes, diagnostics = pass.diagnostics.len(), "render pass recovered errors");
        }
        self.last_pass.insert(pass)
    }

    /// 两次渲染之间应用排队的刷新：整体替换，最后一个生效
    pub fn apply_pending_refreshes(&mut self) -> bool {
        let pending = self.refresh.drain();
        let count = pending.len();
        match pending.into_iter().last() {
            Some(latest) => {
                tracing::info!(queued = count, "applying host refresh");
                self.data = latest;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn set_state(&mut self, change: StateChange) {
        change.apply(&mut self.data);
        self.dirty = true;
    }

    /// 针对最近一次渲染分发事件，并应用处理函数产生的状态变更
    pub fn fire_event(&mut self, event: &UiEvent) -> DispatchOutcome {
        let Some(pass) = self.last_pass.as_ref() else {
            tracing::debug!(event = %event.event_type, "event before first render ignored");
            return DispatchOutcome::default();
        };

        let outcome = self.dispatcher.dispatch(
            event,
            pass,
            &self.data,
            &self.document.props,
            self.handlers.as_mut(),
            self.modules.as_mut(),
        );
        for change in outcome.changes.iter().cloned() {
            self.set_state(change);
        }
        outcome
    }

    /// 有变更时重新渲染，返回新的渲染结果
    pub fn flush(&mut self) -> Option<&RenderPass> {
        self.apply_pending_refreshes();
        if self.needs_render() {
            Some(self.render())
        } else {
            None
        }
    }

    /// 首次渲染并把节点树交给宿主
    pub fn mount(&mut self, host: &mut dyn RenderHost) -> Option<NodeHandle> {
        host.register_refresh_handler(self.refresh.clone());
        self.render();
        self.commit_to(host)
    }

    /// flush 之后如有新的渲染结果则提交给宿主
    pub fn update(&mut self, host: &mut dyn RenderHost) -> Option<NodeHandle> {
        self.flush()?;
        self.commit_to(host)
    }

    fn commit_to(&self, host: &mut dyn RenderHost) -> Option<NodeHandle> {
        let root = self
            .last_pass
            .as_ref()
            .and_then(|pass| pass.root.as_ref())
            .map(|root| build_elements(root, host));
        host.commit(root);
        root
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("data", &self.data)
            .field("dirty", &self.dirty)
            .field("passes", &self.passes)
            .finish()
    }
}

/// 子节点先于父节点创建
fn build_elements(node: &RenderedNode, host: &mut dyn RenderHost) -> NodeHandle {
    let children = node.children.iter().map(|child| build_elements(child, host)).collect();
    let props = ElementProps {
        ref_id: node.ref_id.clone(),
        key: node.key.clone(),
        class_list: node.class_list.clone(),
        style: node.style.clone(),
        attributes: node.attributes.clone(),
        events: node.events.clone(),
    };
    host.create_element(&node.tag, &props, children)
}
