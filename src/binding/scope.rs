//! 求值作用域：组件状态 + 局部变量帧
//!
//! repeat 的 alias / 下标和事件的 `$event` 只存在于局部帧中，
//! 帧在子树渲染结束后弹出，不会泄漏到外层。

use super::{DataContext, Props, Value};
use std::collections::BTreeMap;

/// 一层局部变量
pub type Frame = Vec<(String, Value)>;

pub struct Scope<'a> {
    data: &'a DataContext,
    computed: &'a BTreeMap<String, Value>,
    props: &'a Props,
    frames: Vec<Frame>,
}

impl<'a> Scope<'a> {
    pub fn new(data: &'a DataContext, computed: &'a BTreeMap<String, Value>, props: &'a Props) -> Self {
        Self {
            data,
            computed,
            props,
            frames: Vec::new(),
        }
    }

    /// 携带已捕获的局部帧（事件分发时恢复 repeat 变量）
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// 当前所有局部帧的快照
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// 裸标识符：由内到外查局部帧，再查组件状态
    pub fn lookup(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some((_, value)) = frame.iter().rev().find(|(k, _)| k == name) {
                return Some(value.clone());
            }
        }
        self.lookup_component(name)
    }

    /// `this.name`：data → computed → props
    pub fn lookup_component(&self, name: &str) -> Option<Value> {
        self.data
            .get(name)
            .or_else(|| self.computed.get(name))
            .or_else(|| self.props.get(name))
            .cloned()
    }

    /// `this` 本身，合并后的组件状态
    pub fn component_object(&self) -> Value {
        let mut merged = self.props.clone();
        merged.extend(self.computed.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.extend(self.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_shadow_and_pop() {
        let mut data = DataContext::new();
        data.insert("item", "outer");
        let computed = BTreeMap::new();
        let props = Props::new();
        let mut scope = Scope::new(&data, &computed, &props);

        scope.push_frame(vec![("item".to_string(), Value::from("inner"))]);
        assert_eq!(scope.lookup("item"), Some(Value::from("inner")));
        assert_eq!(scope.lookup_component("item"), Some(Value::from("outer")));

        scope.pop_frame();
        assert_eq!(scope.lookup("item"), Some(Value::from("outer")));
    }
}
