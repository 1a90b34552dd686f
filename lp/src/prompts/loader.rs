//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Values substituted into `advisor.pmt`
#[derive(Debug, Clone, Serialize)]
pub struct AdvisorPromptContext {
    pub catalog: String,
    pub schema: String,
    /// One `- ...` line per table
    pub tables: String,
    /// One `- ...` line per workload query
    pub queries: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// Override directory holding `{name}.pmt` files
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that prefers templates found in `dir`
    pub fn new(dir: Option<&Path>) -> Self {
        debug!(?dir, "PromptLoader::new: called");
        let user_dir = dir.filter(|d| d.exists()).map(Path::to_path_buf);
        if dir.is_some() && user_dir.is_none() {
            debug!("PromptLoader::new: override directory missing, using embedded prompts");
        }
        Self {
            hbs: Self::engine(),
            user_dir,
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    /// Prompts are plain text, never HTML
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks the override directory first, then the embedded defaults.
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in override directory");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    pub fn render_advisor(&self, context: &AdvisorPromptContext) -> Result<String> {
        self.render("advisor", context)
    }
}
