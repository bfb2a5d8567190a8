//! 计算属性 - 由外部协作者提供的纯函数 DataContext → Value

use super::{DataContext, Props, Value};
use std::collections::HashMap;

/// 计算属性提供者
pub trait ComputedProvider {
    /// 不认识的名字返回 `None`
    fn compute(&self, name: &str, data: &DataContext, props: &Props) -> Option<Value>;
}

/// 不提供任何计算属性
#[derive(Debug, Default, Clone, Copy)]
pub struct NoComputed;

impl ComputedProvider for NoComputed {
    fn compute(&self, _name: &str, _data: &DataContext, _props: &Props) -> Option<Value> {
        None
    }
}

type ComputeFn = Box<dyn Fn(&DataContext, &Props) -> Value>;

/// 闭包注册表
#[derive(Default)]
pub struct ComputedRegistry {
    entries: HashMap<String, ComputeFn>,
}

impl ComputedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, compute: F)
    where
        F: Fn(&DataContext, &Props) -> Value + 'static,
    {
        self.entries.insert(name.to_string(), Box::new(compute));
    }

    /// 链式注册
    pub fn with<F>(mut self, name: &str, compute: F) -> Self
    where
        F: Fn(&DataContext, &Props) -> Value + 'static,
    {
        self.register(name, compute);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl ComputedProvider for ComputedRegistry {
    fn compute(&self, name: &str, data: &DataContext, props: &Props) -> Option<Value> {
        self.entries.get(name).map(|f| f(data, props))
    }
}

impl std::fmt::Debug for ComputedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("ComputedRegistry").field("names", &names).finish()
    }
}
