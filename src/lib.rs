//! Validation of eskip routing annotations on ingress resources.
//!
//! An ingress may carry three annotations holding eskip expressions: a filter
//! chain, a predicate chain and a list of complete routes. This crate checks
//! that each present annotation parses and, with advanced validation enabled,
//! that it only uses registered filter and predicate kinds with acceptable
//! arguments and that every route is well formed:
//!
//! ```text
//! manifest → IngressItem → IngressValidator::validate → Ok(()) | ValidationErrors
//!                          ├─ parse (syntax, always)
//!                          └─ check (registries, with advanced validation)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use ingress_annotations::{
//!     INGRESS_FILTER_ANNOTATION, IngressItem, IngressValidator, Validator, ValidatorConfig,
//! };
//!
//! let validator = IngressValidator::new(ValidatorConfig {
//!     enable_advanced_validation: true,
//! });
//!
//! let item = IngressItem::new("default", "shop")
//!     .with_annotation(INGRESS_FILTER_ANNOTATION, r#"setPath("/") -> foo()"#);
//!
//! let errors = validator.validate(&item).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! println!("{}", errors);
//! ```
//!
//! # Feature Flags
//!
//! | Feature         | Default | Description |
//! |-----------------|---------|-------------|
//! | `builtin-specs` | yes     | Built-in filter and predicate tables in [`registry::builtin`], used by [`IngressValidator::new`]. |

pub mod check;
pub mod error;
pub mod ingress;
pub mod metrics;
pub mod parse;
pub mod registry;
pub mod types;
pub mod validator;

pub use error::*;
pub use ingress::{IngressItem, ObjectMeta};
pub use types::*;
pub use validator::{
    INGRESS_FILTER_ANNOTATION, INGRESS_PREDICATE_ANNOTATION, INGRESS_ROUTES_ANNOTATION,
    IngressValidator, Validator, ValidatorConfig,
};

// Re-export entry-point functions at the crate root for convenience.
pub use parse::{parse_filters, parse_predicates, parse_routes};

/// Convenience entry point composing decode → validate.
///
/// Accepts a JSON or YAML ingress manifest and returns the decoded item when
/// its annotations are valid.
///
/// # Errors
///
/// Returns [`ManifestError::Decode`] if the manifest cannot be decoded and
/// [`ManifestError::Invalid`] with every annotation problem otherwise.
///
/// # Example
///
/// ```rust
/// use ingress_annotations::{IngressValidator, ValidatorConfig};
///
/// let manifest = r#"
/// apiVersion: networking.k8s.io/v1
/// kind: Ingress
/// metadata:
///   namespace: default
///   name: shop
///   annotations:
///     zalando.org/skipper-predicate: 'Method("GET")'
/// "#;
///
/// let validator = IngressValidator::new(ValidatorConfig::default());
/// match ingress_annotations::validate_manifest(manifest, &validator) {
///     Ok(item) => println!("{} is valid", item.metadata.name),
///     Err(err) => eprintln!("{}", err),
/// }
/// ```
pub fn validate_manifest<V: Validator<IngressItem>>(
    input: &str,
    validator: &V,
) -> Result<IngressItem, ManifestError> {
    let item = IngressItem::decode(input)?;
    validator.validate(&item)?;
    Ok(item)
}
