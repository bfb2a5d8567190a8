//! 拼图示例端到端测试
//! demos/puzzle.json + demos/puzzle.js

use super::init_tracing;
use crate::bridge::{BridgeEvent, MemoryModules, ModuleHost};
use crate::binding::Value;
use crate::config::EngineConfig;
use crate::error::HostError;
use crate::event::UiEvent;
use crate::js::ScriptComponent;
use crate::parser::TemplateDocument;
use crate::runtime::ComponentInstance;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

const TEMPLATE: &str = include_str!("../../demos/puzzle.json");
const SCRIPT: &str = include_str!("../../demos/puzzle.js");

/// 共享的模块宿主，测试结束后仍能读取调用记录
#[derive(Clone, Default)]
struct SharedModules(Arc<Mutex<MemoryModules>>);

impl ModuleHost for SharedModules {
    fn call_module(&mut self, module: &str, method: &str, args: &[Value]) -> Result<Value, HostError> {
        self.0.lock().call_module(module, method, args)
    }
}

fn puzzle() -> (ComponentInstance, SharedModules) {
    init_tracing();
    let document = TemplateDocument::from_json(TEMPLATE).unwrap();
    let modules = SharedModules::default();
    let instance = ComponentInstance::new(document, EngineConfig::default())
        .with_script(ScriptComponent::new(SCRIPT).unwrap())
        .with_modules(modules.clone());
    (instance, modules)
}

/// 测试初始局面：8 个方块，没有胜利提示
#[test]
fn test_initial_board() {
    let (mut instance, _) = puzzle();
    let pass = instance.render();
    let root = pass.root.as_ref().unwrap();

    assert_eq!(root.style.get("width"), Some(&json!("300px")));
    assert_eq!(root.style.get("backgroundColor"), Some(&json!("#f5f5f5")));
    assert_eq!(pass.find("0").and_then(|n| n.text()), Some("Steps: 0"));

    let board = pass.find("1").unwrap();
    assert_eq!(board.children.len(), 8);
    assert_eq!(board.texts(), vec!["1", "2", "3", "4", "5", "6", "7", "8"]);

    let last = pass.find("1.0[8]").unwrap();
    assert_eq!(last.class_list, vec!["block", "last"]);
    assert_eq!(last.style.get("left"), Some(&json!("200px")));
    assert_eq!(last.style.get("top"), Some(&json!("200px")));
    assert_eq!(last.style.get("position"), Some(&json!("absolute")));

    assert!(pass.find("2").is_none());
    assert!(pass.diagnostics.is_empty());
}

/// 测试不相邻的方块点击无效
#[test]
fn test_illegal_move() {
    let (mut instance, _) = puzzle();
    instance.render();

    let outcome = instance.fire_event(&UiEvent::new("click", "1.0[1]", json!({"x": 0, "y": 0})));
    assert_eq!(outcome.invoked, vec!["move"]);
    assert!(outcome.changes.is_empty());
    assert!(instance.flush().is_none());
}

/// 测试移动最后一个方块赢得游戏
#[test]
fn test_winning_move() {
    let (mut instance, modules) = puzzle();
    instance.render();

    let outcome = instance.fire_event(&UiEvent::new("click", "1.0[8]", json!({"x": 250, "y": 250})));
    assert!(outcome.is_handled());
    assert!(outcome.errors.is_empty());

    let pass = instance.flush().unwrap();
    assert_eq!(pass.find("0").and_then(|n| n.text()), Some("Steps: 1"));
    assert_eq!(pass.find("1.0[8]").unwrap().style.get("left"), Some(&json!("100px")));
    assert_eq!(pass.find("2.0").and_then(|n| n.text()), Some("You Win !"));
    assert_eq!(pass.computed.get("isWin"), Some(&Value::Bool(true)));

    assert_eq!(
        modules.0.lock().drain_events(),
        vec![BridgeEvent::ShowToast {
            message: "You Win !".to_string(),
            duration: 2000,
        }]
    );
}
