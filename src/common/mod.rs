//! 共通の抽象化レイヤーとトレイト定義

pub mod config;
pub mod context;
pub mod http;
pub mod traits;

pub use config::{DispatcherConfig, DEFAULT_MAX_BODY_SIZE};
pub use context::{Attributes, RequestContext};
pub use http::{Method, Request, Response, StatusCode, SECURITY_HEADERS};
pub use traits::{Handler, HandlerOutcome, Interceptor};
