//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files.
//!
//! Template loading chain:
//! 1. `{prompts.dir}/{name}.pmt` (configured override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution, with HTML
//! escaping turned off.

pub mod embedded;
mod loader;

pub use loader::{AdvisorPromptContext, PromptLoader};
