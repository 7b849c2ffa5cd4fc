pub mod auth;
pub mod redaction;

pub use auth::{basic_auth_header, bearer_header};
pub use redaction::{RedactingWriter, redact_secrets};
