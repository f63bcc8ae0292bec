//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. Security headers (stricter CSP for admin)
//! 4. Session layer (tower-sessions with in-memory store)
//! 5. Auth guard ([`RequireAdminAuth`] on editor routes)

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{ADMIN_AUTH_KEY, RequireAdminAuth, log_in, log_out, password_matches};
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
