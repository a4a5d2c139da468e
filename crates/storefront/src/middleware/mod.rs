//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (unique ID per request, echoed in the response)
//! 4. Security headers (CSP allowing CMS media, framing and sniffing guards)
//! 5. Rate limiting (governor), on the auth proxy and suggestions routes only

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use rate_limit::{auth_rate_limiter, suggestions_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::{SecurityHeaders, security_headers_middleware};
