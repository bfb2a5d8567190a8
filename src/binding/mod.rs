//! 数据绑定：值模型、作用域、表达式求值、计算属性

mod value;
mod context;
mod scope;
mod resolver;
pub mod computed;

pub use value::{format_number, Value};
pub use context::{DataContext, Props};
pub use scope::{Frame, Scope};
pub use resolver::Resolver;
pub use computed::{ComputedProvider, ComputedRegistry, NoComputed};
