//! 组件实例单元测试
//! 测试刷新队列、状态变更调度、宿主挂载

use super::{data, document};
use crate::binding::Value;
use crate::bridge::{RecordingHost, RenderHost};
use crate::config::EngineConfig;
use crate::error::{HandlerError, RenderError};
use crate::event::{HandlerMap, StateChange, UiEvent};
use crate::js::ScriptComponent;
use crate::runtime::ComponentInstance;
use crate::DataContext;
use pretty_assertions::assert_eq;
use serde_json::json;

fn counter() -> ComponentInstance {
    let doc = document(json!({
        "body": {
            "type": "div",
            "children": [
                {"type": "text", "attr": {"value": ["count: ", {"@binding": "count"}]}},
                {
                    "type": "div",
                    "classList": ["button"],
                    "event": [{"type": "click", "handler": "inc", "params": [{"@binding": "step"}]}]
                }
            ]
        },
        "data": {"count": 0, "step": 2}
    }));
    let handlers = HandlerMap::new().with("inc", |args, ctx| {
        let count = ctx.data().get("count").map(|v| v.to_number()).unwrap_or(0.0);
        let step = args.first().map(|v| v.to_number()).unwrap_or(1.0);
        let mut partial = DataContext::new();
        partial.insert("count", count + step);
        ctx.set_state(partial);
    });
    ComponentInstance::new(doc, EngineConfig::default()).with_handlers(handlers)
}

fn text(instance: &ComponentInstance) -> String {
    let pass = instance.last_pass().unwrap();
    pass.find("0").and_then(|n| n.text()).unwrap_or_default().to_string()
}

/// 测试初始数据来自模板
#[test]
fn test_initial_render_uses_template_data() {
    let mut instance = counter();
    assert!(instance.needs_render());
    instance.render();

    assert_eq!(text(&instance), "count: 0");
    assert_eq!(instance.pass_count(), 1);
    assert!(!instance.needs_render());
    assert!(instance.flush().is_none());
}

/// 测试事件产生的状态变更只调度下一次渲染
#[test]
fn test_event_schedules_render() {
    let mut instance = counter();
    instance.render();

    let outcome = instance.fire_event(&UiEvent::new("click", "1", json!({})));
    assert!(outcome.is_handled());
    assert!(instance.needs_render());
    assert_eq!(instance.data().get("count"), Some(&Value::Number(2.0)));
    // 上一次渲染结果保持不变
    assert_eq!(text(&instance), "count: 0");

    assert!(instance.flush().is_some());
    assert_eq!(text(&instance), "count: 2");
    assert_eq!(instance.pass_count(), 2);
}

/// 测试首次渲染之前的事件被忽略
#[test]
fn test_event_before_render_is_ignored() {
    let mut instance = counter();
    let outcome = instance.fire_event(&UiEvent::new("click", "1", json!({})));
    assert!(!outcome.is_handled());
    assert_eq!(instance.data().get("count"), Some(&Value::Number(0.0)));
}

/// 测试刷新排队到两次渲染之间，整体替换且最后一个生效
#[test]
fn test_refresh_queue_last_wins() {
    let mut instance = counter();
    instance.render();

    let queue = instance.refresh_queue();
    queue.refresh(data(json!({"count": 5, "step": 1})));
    queue.refresh(data(json!({"count": 7})));
    assert_eq!(text(&instance), "count: 0");
    assert_eq!(queue.len(), 2);

    assert!(instance.flush().is_some());
    assert_eq!(text(&instance), "count: 7");
    assert!(queue.is_empty());
    // 整体替换：step 不再存在
    assert!(instance.data().get("step").is_none());
}

/// 测试 set_state 的合并与替换
#[test]
fn test_set_state_merge_and_replace() {
    let mut instance = counter();
    instance.render();

    instance.set_state(StateChange::Merge(data(json!({"count": 3}))));
    assert_eq!(instance.data().get("step"), Some(&Value::Number(2.0)));
    instance.set_state(StateChange::Replace(data(json!({"count": 4}))));
    assert_eq!(instance.data().len(), 1);

    instance.flush();
    assert_eq!(text(&instance), "count: 4");
}

/// 测试挂载：子节点先创建，注册刷新回调，提交根节点
#[test]
fn test_mount_on_recording_host() {
    let mut instance = counter();
    let mut host = RecordingHost::new();

    let root = instance.mount(&mut host).unwrap();
    assert_eq!(host.root(), Some(root));
    assert_eq!(host.commit_count(), 1);
    assert_eq!(host.tags(root), vec!["div", "text", "div"]);

    let element = host.element(root).unwrap();
    assert_eq!(element.props.ref_id, "__root");
    let first_child = host.element(element.children[0]).unwrap();
    assert_eq!(first_child.props.attributes.get("value"), Some(&json!("count: 0")));
    // 句柄按创建顺序递增：子节点的句柄比父节点小
    assert!(element.children.iter().all(|child| *child < root));

    // 宿主通过注册的队列推送刷新
    host.refresh_queue().unwrap().refresh(data(json!({"count": 9})));
    let new_root = instance.update(&mut host).unwrap();
    assert_eq!(host.commit_count(), 2);
    let first_child = host.element(host.element(new_root).unwrap().children[0]).unwrap();
    assert_eq!(first_child.props.attributes.get("value"), Some(&json!("count: 9")));

    // 没有变更时不提交
    assert!(instance.update(&mut host).is_none());
    assert_eq!(host.commit_count(), 2);
}

/// 测试自定义宿主只需实现两个方法
#[test]
fn test_custom_render_host() {
    #[derive(Default)]
    struct Counting {
        created: usize,
        registered: bool,
    }
    impl RenderHost for Counting {
        fn create_element(
            &mut self,
            _tag: &str,
            _props: &crate::bridge::ElementProps,
            _children: Vec<crate::bridge::NodeHandle>,
        ) -> crate::bridge::NodeHandle {
            self.created += 1;
            crate::bridge::NodeHandle(self.created as u64)
        }
        fn register_refresh_handler(&mut self, _queue: crate::bridge::RefreshQueue) {
            self.registered = true;
        }
    }

    let mut host = Counting::default();
    counter().mount(&mut host);
    assert_eq!(host.created, 3);
    assert!(host.registered);
}

/// 测试处理函数抛异常之前的 setState 仍然生效
#[test]
fn test_state_before_throw_is_kept() {
    let doc = document(json!({
        "body": {
            "type": "div",
            "children": [{"type": "div", "event": [{"type": "click", "handler": "bump"}]}]
        },
        "data": {"count": 0}
    }));
    let script = ScriptComponent::new(
        "component = { methods: { bump() { this.setState({ count: 1 }); throw new Error('late'); } } };",
    )
    .unwrap();
    let mut instance = ComponentInstance::new(doc, EngineConfig::default()).with_script(script);
    instance.render();

    let outcome = instance.fire_event(&UiEvent::new("click", "0", json!({})));
    assert!(!outcome.is_handled());
    assert!(matches!(
        outcome.errors.as_slice(),
        [RenderError::HandlerDispatch { error: HandlerError::Failed { .. }, .. }]
    ));
    assert_eq!(instance.data().get("count"), Some(&Value::Number(1.0)));
    assert!(instance.needs_render());
}
