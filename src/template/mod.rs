//! Template rendering for task instructions
//!
//! Provides Jinja2-compatible templating with strict reference resolution.
//!
//! # Features
//!
//! - Variable substitution: `{{ topic }}`, `{{ tasks.draft.output }}`
//! - Strict lookup: a reference that doesn't resolve is an error, never an
//!   empty string
//! - Suggestions for misspelled paths
//! - Conditionals and loops from the underlying engine
//!
//! # Example
//!
//! ```ignore
//! use orquestra::template::render;
//! use serde_json::json;
//!
//! let ctx = json!({"tasks": {"draft": {"output": "A first draft"}}});
//! let prompt = render("Edit this: {{ tasks.draft.output }}", &ctx)?;
//! ```

mod context;
mod engine;
mod errors;

pub use context::{RenderContext, lookup_path};
pub use engine::TemplateEngine;
pub use errors::{SourceLocation, TemplateError, suggest_correction};

use serde::Serialize;

/// Render a template with a default engine
pub fn render<C: Serialize + ?Sized>(template: &str, ctx: &C) -> Result<String, TemplateError> {
    TemplateEngine::new().render(template, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accumulating_context() {
        // Outputs become visible as they are added to the context
        let engine = TemplateEngine::new();
        let mut ctx = json!({"topic": "ownership", "tasks": {}});

        let draft_prompt = engine
            .render("Write about {{ topic }}.", &ctx)
            .unwrap();
        assert_eq!(draft_prompt, "Write about ownership.");

        assert!(engine
            .render("Edit: {{ tasks.draft.output }}", &ctx)
            .is_err());

        ctx["tasks"]["draft"] = json!({"output": "Borrowing is neat."});
        let edit_prompt = engine
            .render("Edit: {{ tasks.draft.output }}", &ctx)
            .unwrap();
        assert_eq!(edit_prompt, "Edit: Borrowing is neat.");
    }

    #[test]
    fn test_render_free_function() {
        let out = render("Hello, {{ name }}!", &json!({"name": "Orquestra"})).unwrap();
        assert_eq!(out, "Hello, Orquestra!");
        assert!(render("Hello, {{ name }}!", &json!({})).is_err());
    }
}
