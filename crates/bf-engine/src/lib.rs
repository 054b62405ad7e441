//! bf-engine: invoking the external text-generation engine.
//!
//! The [`GenerationEngine`] trait is the single seam to the outside world;
//! [`CliEngine`] implements it by running an LLM command-line tool through
//! [`ToolCommand`]. [`GenerationClient`] layers prompt audit logging, the
//! shared [`RateLimiter`], and transient-failure retry on top of any engine.

pub mod audit;
pub mod client;
pub mod command;
pub mod engine;
pub mod limiter;
pub mod retry;
pub mod template;

pub use audit::AuditLog;
pub use client::{CallSpec, GenerationClient};
pub use command::{ToolCommand, ToolOutput};
pub use engine::{CliEngine, GenerationEngine, OutputFormat};
pub use limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use template::PromptContext;
