use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kind for parse failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    Syntax,
    UnterminatedLiteral,
    InvalidNumber,
    DuplicateRouteId,
}

/// Produced by the expression parser when annotation text does not follow the
/// eskip grammar. Line and column are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// A single semantic defect found in an otherwise well-formed expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum Problem {
    #[error("filter \"{name}\" not found")]
    UnknownFilter { name: String },

    #[error("invalid arguments for filter \"{name}\": {reason}")]
    InvalidFilterArgs { name: String, reason: String },

    #[error("predicate \"{name}\" not found")]
    UnknownPredicate { name: String },

    #[error("invalid arguments for predicate \"{name}\": {reason}")]
    InvalidPredicateArgs { name: String, reason: String },

    #[error("conflicting path predicates {first} and {second}")]
    ConflictingPaths { first: String, second: String },

    #[error("invalid backend {backend}: {reason}")]
    InvalidBackend { backend: String, reason: String },
}

/// Produced by a semantic checker. Carries every problem found in one filter
/// chain, one predicate chain or one route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{}", describe_problems(.route_id, .problems))]
pub struct SemanticError {
    /// Set when the error belongs to a named route definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    pub problems: Vec<Problem>,
}

fn describe_problems(route_id: &Option<String>, problems: &[Problem]) -> String {
    let joined = problems
        .iter()
        .map(Problem::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    match route_id {
        Some(id) => format!("route \"{}\": {}", id, joined),
        None => joined,
    }
}

/// Why an annotation was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AnnotationErrorKind {
    #[error("{0}")]
    Syntax(#[from] ParseError),

    #[error("{0}")]
    Semantic(#[from] SemanticError),
}

/// A problem with one annotation, qualified by the annotation key.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid \"{key}\" annotation: {kind}")]
pub struct AnnotationError {
    pub key: String,
    #[source]
    pub kind: AnnotationErrorKind,
}

impl AnnotationError {
    pub fn syntax(key: impl Into<String>, err: ParseError) -> Self {
        AnnotationError {
            key: key.into(),
            kind: AnnotationErrorKind::Syntax(err),
        }
    }

    pub fn semantic(key: impl Into<String>, err: SemanticError) -> Self {
        AnnotationError {
            key: key.into(),
            kind: AnnotationErrorKind::Semantic(err),
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, AnnotationErrorKind::Syntax(_))
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self.kind, AnnotationErrorKind::Semantic(_))
    }
}

/// Every annotation problem found while validating one resource.
///
/// Members keep the order in which annotations are checked: filter, predicate,
/// routes. An empty set is never returned as an error; see
/// [`ValidationErrors::into_result`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("{}", join_lines(.errors))]
pub struct ValidationErrors {
    errors: Vec<AnnotationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: AnnotationError) {
        self.errors.push(err);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnnotationError> {
        self.errors.iter()
    }

    /// Errors reported against a single annotation key.
    pub fn for_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a AnnotationError> + 'a {
        self.errors.iter().filter(move |e| e.key == key)
    }

    pub fn into_vec(self) -> Vec<AnnotationError> {
        self.errors
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn join_lines(errors: &[AnnotationError]) -> String {
    errors
        .iter()
        .map(AnnotationError::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Extend<AnnotationError> for ValidationErrors {
    fn extend<I: IntoIterator<Item = AnnotationError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl FromIterator<AnnotationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = AnnotationError>>(iter: I) -> Self {
        ValidationErrors {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = AnnotationError;
    type IntoIter = std::vec::IntoIter<AnnotationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a AnnotationError;
    type IntoIter = std::slice::Iter<'a, AnnotationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Combined error type for the [`validate_manifest`](crate::validate_manifest)
/// entry point.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("manifest decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}
