//! ハンドラーの実装（関数アダプタとルート）

pub mod pattern;
pub mod body;
pub mod core;
pub mod builders;

pub use self::core::{AsyncFnHandler, DeferredHandler, FnHandler, IntoHandlerResult, Route};
pub use pattern::PathPattern;
pub use builders::{
    get, delete, options, post, put,
    async_get, async_delete, async_post, async_put,
    deferred,
};
