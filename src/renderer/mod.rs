//! 渲染器 - 将模板与数据物化为节点树

pub mod directive;
pub mod materializer;
mod style_resolver;

pub use directive::{evaluate_match, evaluate_repeat, RepeatInstance};
pub use materializer::{EventSite, EventTable, Materializer, RenderPass, RenderedNode};
pub use style_resolver::StyleResolver;
