//! 页面管理 - 按页面 id 持有组件实例

use super::ComponentInstance;
use crate::binding::DataContext;
use crate::config::EngineConfig;
use crate::error::RuntimeError;
use crate::event::{DispatchOutcome, UiEvent};
use crate::js::ScriptComponent;
use crate::parser::TemplateDocument;
use crate::renderer::RenderPass;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// 页面管理器
#[derive(Debug, Default)]
pub struct PageManager {
    config: EngineConfig,
    pages: HashMap<String, ComponentInstance>,
}

impl PageManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            pages: HashMap::new(),
        }
    }

    /// 创建页面并完成首次渲染
    ///
    /// `init_data` 存在时整体替换模板自带的数据。模板带有 `script` 时
    /// 用它创建脚本组件。
    pub fn create_page(
        &mut self,
        page_id: &str,
        document: TemplateDocument,
        init_data: Option<DataContext>,
    ) -> Result<&RenderPass, RuntimeError> {
        let script = match &document.script {
            Some(source) => Some(ScriptComponent::new(source)?),
            None => None,
        };
        let mut instance = ComponentInstance::new(document, self.config.clone());
        if let Some(script) = script {
            instance = instance.with_script(script);
        }
        if let Some(data) = init_data {
            instance = instance.with_data(data);
        }
        self.insert_page(page_id, instance)
    }

    /// 注册一个已经配置好的实例
    pub fn insert_page(&mut self, page_id: &str, instance: ComponentInstance) -> Result<&RenderPass, RuntimeError> {
        if self.pages.contains_key(page_id) {
            return Err(RuntimeError::PageExists(page_id.to_string()));
        }
        tracing::info!(page = page_id, "page created");
        let instance = self.pages.entry(page_id.to_string()).or_insert(instance);
        Ok(instance.render())
    }

    /// 原生层传入的 JSON 文本形式
    pub fn create_page_from_json(
        &mut self,
        page_id: &str,
        template: &str,
        init_data: Option<&str>,
    ) -> Result<&RenderPass, RuntimeError> {
        let document = TemplateDocument::from_json(template)?;
        let init_data = match init_data {
            Some(text) => {
                let json: JsonValue = serde_json::from_str(text).map_err(crate::error::TemplateError::from)?;
                Some(DataContext::from_json(&json)?)
            }
            None => None,
        };
        self.create_page(page_id, document, init_data)
    }

    /// 整体替换页面数据并立即重新渲染
    pub fn refresh_page(&mut self, page_id: &str, data: DataContext) -> Result<&RenderPass, RuntimeError> {
        let instance = self.page_mut(page_id)?;
        instance.refresh_queue().refresh(data);
        instance.flush();
        instance
            .last_pass()
            .ok_or_else(|| RuntimeError::PageNotFound(page_id.to_string()))
    }

    /// 分发事件；有状态变更时重新渲染
    pub fn fire_event(
        &mut self,
        page_id: &str,
        target: &str,
        event_type: &str,
        payload: JsonValue,
    ) -> Result<DispatchOutcome, RuntimeError> {
        let instance = self.page_mut(page_id)?;
        let outcome = instance.fire_event(&UiEvent::new(event_type, target, payload));
        instance.flush();
        Ok(outcome)
    }

    pub fn destroy_page(&mut self, page_id: &str) -> Result<(), RuntimeError> {
        self.pages
            .remove(page_id)
            .map(|_| tracing::info!(page = page_id, "page destroyed"))
            .ok_or_else(|| RuntimeError::PageNotFound(page_id.to_string()))
    }

    pub fn page(&self, page_id: &str) -> Result<&ComponentInstance, RuntimeError> {
        self.pages
            .get(page_id)
            .ok_or_else(|| RuntimeError::PageNotFound(page_id.to_string()))
    }

    pub fn page_mut(&mut self, page_id: &str) -> Result<&mut ComponentInstance, RuntimeError> {
        self.pages
            .get_mut(page_id)
            .ok_or_else(|| RuntimeError::PageNotFound(page_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
