//! Template error types with source locations and suggestions

use std::fmt;
use thiserror::Error;

/// Location in a template where an error occurred
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub template_name: Option<String>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref name) = self.template_name {
            write!(f, "{}:{}", name, self.line)
        } else {
            write!(f, "line {}", self.line)
        }
    }
}

/// Template rendering errors
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Referenced path doesn't resolve in the context
    #[error("undefined reference '{name}' at {location}{}", .suggestion.as_ref().map(|s| format!(", did you mean '{}'?", s)).unwrap_or_default())]
    UndefinedReference {
        name: String,
        location: SourceLocation,
        suggestion: Option<String>,
    },

    /// Template syntax error
    #[error("syntax error at {location}: {message}")]
    SyntaxError {
        message: String,
        location: SourceLocation,
    },

    /// The context could not be turned into template values
    #[error("invalid template context: {message}")]
    InvalidContext { message: String },

    /// Wrapped minijinja error
    #[error("template error: {0}")]
    Internal(#[from] minijinja::Error),
}

impl TemplateError {
    /// Create an undefined reference error with optional suggestion
    pub fn undefined_reference<S: AsRef<str>>(
        name: impl Into<String>,
        line: usize,
        known_paths: &[S],
    ) -> Self {
        let name = name.into();
        let suggestion = suggest_correction(&name, known_paths);
        Self::UndefinedReference {
            name,
            location: SourceLocation {
                line,
                template_name: None,
            },
            suggestion,
        }
    }

    /// Create a syntax error
    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        Self::SyntaxError {
            message: message.into(),
            location: SourceLocation {
                line,
                template_name: None,
            },
        }
    }

    /// Create an invalid context error
    pub fn invalid_context(message: impl Into<String>) -> Self {
        Self::InvalidContext {
            message: message.into(),
        }
    }

    /// Name of the unresolved reference, for undefined reference errors
    pub fn undefined_name(&self) -> Option<&str> {
        match self {
            Self::UndefinedReference { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Suggest a correction for a typo using Levenshtein distance
pub fn suggest_correction<S: AsRef<str>>(typo: &str, candidates: &[S]) -> Option<String> {
    let mut best_match = None;
    let mut best_distance = usize::MAX;
    let max_distance = (typo.len() / 2).max(2);

    for candidate in candidates {
        let candidate = candidate.as_ref();
        let distance = levenshtein_distance(typo, candidate);
        if distance < best_distance && distance <= max_distance {
            best_distance = distance;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single rolling row instead of the full matrix
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != b_ch);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}
