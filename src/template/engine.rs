//! Template engine for rendering task instructions

use super::context::RenderContext;
use super::errors::TemplateError;
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde::Serialize;

const TEMPLATE_NAME: &str = "instruction";

/// Template rendering engine
///
/// Wraps minijinja with strict undefined handling. Templates keep their
/// trailing newline so text without references passes through unchanged.
#[derive(Clone)]
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine {
    /// Create a new template engine with default configuration
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Render a template string against any serializable context
    ///
    /// # Example
    ///
    /// ```ignore
    /// let engine = TemplateEngine::new();
    /// let out = engine.render("Hello, {{ name }}!", &json!({"name": "Orquestra"}))?;
    /// assert_eq!(out, "Hello, Orquestra!");
    /// ```
    pub fn render<C: Serialize + ?Sized>(
        &self,
        template: &str,
        ctx: &C,
    ) -> Result<String, TemplateError> {
        let ctx = RenderContext::from_serialize(ctx)?;
        self.render_context(template, &ctx)
    }

    /// Render against an already converted context
    pub fn render_context(
        &self,
        template: &str,
        ctx: &RenderContext,
    ) -> Result<String, TemplateError> {
        let mut env = self.env.clone();
        env.add_template_owned(TEMPLATE_NAME, template.to_string())
            .map_err(|e| TemplateError::syntax(e.to_string(), e.line().unwrap_or(0)))?;

        let tmpl = env.get_template(TEMPLATE_NAME)?;

        tmpl.render(ctx.to_value()).map_err(|err| {
            if err.kind() == ErrorKind::UndefinedError {
                let mut referenced: Vec<String> =
                    tmpl.undeclared_variables(true).into_iter().collect();
                let name = first_unresolved(template, &mut referenced, ctx)
                    .unwrap_or_else(|| extract_var_from_error(&err.to_string()));
                TemplateError::undefined_reference(
                    name,
                    err.line().unwrap_or(0),
                    &ctx.known_paths(),
                )
            } else if err.kind() == ErrorKind::SyntaxError {
                TemplateError::syntax(err.to_string(), err.line().unwrap_or(0))
            } else {
                TemplateError::Internal(err)
            }
        })
    }

    /// Check if a template is syntactically valid
    pub fn validate(&self, template: &str) -> Result<(), TemplateError> {
        let mut env = self.env.clone();
        env.add_template_owned(TEMPLATE_NAME, template.to_string())
            .map_err(|e| TemplateError::syntax(e.to_string(), e.line().unwrap_or(0)))?;
        Ok(())
    }

    /// Context paths a template references, sorted
    pub fn references(&self, template: &str) -> Result<Vec<String>, TemplateError> {
        let mut env = self.env.clone();
        env.add_template_owned(TEMPLATE_NAME, template.to_string())
            .map_err(|e| TemplateError::syntax(e.to_string(), e.line().unwrap_or(0)))?;
        let tmpl = env.get_template(TEMPLATE_NAME)?;

        let mut refs: Vec<String> = tmpl.undeclared_variables(true).into_iter().collect();
        refs.sort();
        Ok(refs)
    }
}

/// Pick the unresolved reference that appears first in the template
fn first_unresolved(
    template: &str,
    referenced: &mut [String],
    ctx: &RenderContext,
) -> Option<String> {
    referenced.sort_by(|a, b| {
        let pos = |path: &str| template.find(path).unwrap_or(usize::MAX);
        pos(a).cmp(&pos(b)).then_with(|| a.cmp(b))
    });
    referenced
        .iter()
        .find(|path| ctx.lookup(path).is_none())
        .cloned()
}

/// Extract variable name from a minijinja error message
fn extract_var_from_error(msg: &str) -> String {
    if let Some(start) = msg.find('`') {
        if let Some(end) = msg[start + 1..].find('`') {
            return msg[start + 1..start + 1 + end].to_string();
        }
    }
    "unknown".to_string()
}
