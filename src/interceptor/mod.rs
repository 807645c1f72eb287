//! 組み込みインターセプター

pub mod auth;
pub mod logging;
pub mod mapped;
pub mod security;

pub use auth::HeaderTokenInterceptor;
pub use logging::LoggingInterceptor;
pub use mapped::MappedInterceptor;
pub use security::SecurityHeadersInterceptor;
