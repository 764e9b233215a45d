//! Annotation validation for ingress resources.
//!
//! Each of the three annotation slots goes through the same two stages:
//!
//! ```text
//! inspect: annotation text → Absent | Malformed(ParseError) | Parsed(definitions)
//! finish:  Parsed(definitions) → semantic errors (only with advanced validation)
//! ```
//!
//! A parse failure therefore never reaches a semantic checker, and the three
//! slots never affect each other. Results are joined in the fixed order
//! filter, predicate, routes.

use crate::check::{RegistryChecker, ResourceContext, ResourceType, RouteOptions, SemanticChecker};
use crate::error::{AnnotationError, ParseError, SemanticError, ValidationErrors};
use crate::ingress::IngressItem;
use crate::metrics::{Metrics, NoopMetrics};
use crate::parse::{parse_filters, parse_predicates, parse_routes};
use crate::registry::{FilterRegistry, PredicateSpecs};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Annotation carrying a filter chain appended to every route of the ingress.
pub const INGRESS_FILTER_ANNOTATION: &str = "zalando.org/skipper-filter";
/// Annotation carrying a predicate chain added to every route of the ingress.
pub const INGRESS_PREDICATE_ANNOTATION: &str = "zalando.org/skipper-predicate";
/// Annotation carrying additional complete route definitions.
pub const INGRESS_ROUTES_ANNOTATION: &str = "zalando.org/skipper-routes";

/// Validates one kind of resource item.
pub trait Validator<T> {
    /// Returns every problem found in `item`, or `Ok(())` if there is none.
    fn validate(&self, item: &T) -> Result<(), ValidationErrors>;
}

/// Validator settings that can be read from a host's configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// Check registered kinds and argument shapes, not just syntax.
    pub enable_advanced_validation: bool,
}

/// Checks the filter, predicate and routes annotations of an ingress.
///
/// All components are shared read-only, so one validator can serve
/// concurrent calls.
#[derive(Clone)]
pub struct IngressValidator<C = RegistryChecker> {
    filter_registry: Arc<FilterRegistry>,
    predicate_specs: Arc<PredicateSpecs>,
    metrics: Arc<dyn Metrics>,
    enable_advanced_validation: bool,
    checker: C,
}

impl IngressValidator<RegistryChecker> {
    /// Builds a validator with the built-in filter and predicate kinds (when
    /// the `builtin-specs` feature is on) and a no-op metrics sink.
    pub fn new(config: ValidatorConfig) -> Self {
        IngressValidator {
            filter_registry: Arc::new(default_filters()),
            predicate_specs: Arc::new(default_predicates()),
            metrics: Arc::new(NoopMetrics),
            enable_advanced_validation: config.enable_advanced_validation,
            checker: RegistryChecker,
        }
    }
}

impl<C: SemanticChecker> IngressValidator<C> {
    pub fn with_filter_registry(mut self, registry: impl Into<Arc<FilterRegistry>>) -> Self {
        self.filter_registry = registry.into();
        self
    }

    pub fn with_predicate_specs(mut self, specs: impl Into<Arc<PredicateSpecs>>) -> Self {
        self.predicate_specs = specs.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_checker<D: SemanticChecker>(self, checker: D) -> IngressValidator<D> {
        IngressValidator {
            filter_registry: self.filter_registry,
            predicate_specs: self.predicate_specs,
            metrics: self.metrics,
            enable_advanced_validation: self.enable_advanced_validation,
            checker,
        }
    }

    pub fn advanced_validation_enabled(&self) -> bool {
        self.enable_advanced_validation
    }

    pub fn filter_registry(&self) -> &FilterRegistry {
        &self.filter_registry
    }

    pub fn predicate_specs(&self) -> &PredicateSpecs {
        &self.predicate_specs
    }

    fn validate_filter_annotation(&self, item: &IngressItem) -> Vec<AnnotationError> {
        let check = inspect(item, INGRESS_FILTER_ANNOTATION, parse_filters);
        self.finish(INGRESS_FILTER_ANNOTATION, check, |filters| {
            self.checker
                .check_filters(
                    &resource_context(item),
                    &self.filter_registry,
                    self.metrics.as_ref(),
                    &filters,
                )
                .err()
                .into_iter()
                .collect()
        })
    }

    fn validate_predicate_annotation(&self, item: &IngressItem) -> Vec<AnnotationError> {
        let check = inspect(item, INGRESS_PREDICATE_ANNOTATION, parse_predicates);
        self.finish(INGRESS_PREDICATE_ANNOTATION, check, |predicates| {
            self.checker
                .check_predicates(
                    &resource_context(item),
                    &self.predicate_specs,
                    self.metrics.as_ref(),
                    &predicates,
                )
                .err()
                .into_iter()
                .collect()
        })
    }

    fn validate_routes_annotation(&self, item: &IngressItem) -> Vec<AnnotationError> {
        let check = inspect(item, INGRESS_ROUTES_ANNOTATION, parse_routes);
        self.finish(INGRESS_ROUTES_ANNOTATION, check, |routes| {
            let options = RouteOptions {
                filter_registry: &self.filter_registry,
                predicate_specs: &self.predicate_specs,
            };
            // One error per failing route; a bad route does not hide later ones.
            routes
                .iter()
                .filter_map(|route| {
                    self.checker
                        .check_route(
                            &resource_context(item),
                            &options,
                            self.metrics.as_ref(),
                            route,
                        )
                        .err()
                })
                .collect()
        })
    }

    fn finish<T>(
        &self,
        key: &'static str,
        check: AnnotationCheck<T>,
        semantic: impl FnOnce(T) -> Vec<SemanticError>,
    ) -> Vec<AnnotationError> {
        match check {
            AnnotationCheck::Absent => vec![],
            AnnotationCheck::Malformed(err) => {
                debug!(annotation = key, error = %err, "annotation failed to parse");
                vec![AnnotationError::syntax(key, err)]
            }
            AnnotationCheck::Parsed(_) if !self.enable_advanced_validation => vec![],
            AnnotationCheck::Parsed(definitions) => semantic(definitions)
                .into_iter()
                .map(|err| {
                    debug!(annotation = key, error = %err, "annotation failed semantic check");
                    AnnotationError::semantic(key, err)
                })
                .collect(),
        }
    }
}

impl<C: SemanticChecker> Validator<IngressItem> for IngressValidator<C> {
    fn validate(&self, item: &IngressItem) -> Result<(), ValidationErrors> {
        let span = tracing::debug_span!(
            "validate_ingress",
            namespace = %item.metadata.namespace,
            name = %item.metadata.name
        );
        let _entered = span.enter();

        let mut errors = ValidationErrors::new();
        errors.extend(self.validate_filter_annotation(item));
        errors.extend(self.validate_predicate_annotation(item));
        errors.extend(self.validate_routes_annotation(item));

        if !errors.is_empty() {
            debug!(errors = errors.len(), "ingress annotations rejected");
        }
        errors.into_result()
    }
}

// ─── Two-stage annotation check ─────────────────────────────────────────────

/// Outcome of reading and parsing one annotation.
#[derive(Debug)]
enum AnnotationCheck<T> {
    Absent,
    Malformed(ParseError),
    Parsed(T),
}

fn inspect<T>(
    item: &IngressItem,
    key: &str,
    parse: fn(&str) -> Result<T, ParseError>,
) -> AnnotationCheck<T> {
    match item.annotation(key) {
        None => AnnotationCheck::Absent,
        Some(text) => match parse(text) {
            Ok(definitions) => AnnotationCheck::Parsed(definitions),
            Err(err) => AnnotationCheck::Malformed(err),
        },
    }
}

fn resource_context(item: &IngressItem) -> ResourceContext {
    ResourceContext {
        namespace: item.metadata.namespace.clone(),
        name: item.metadata.name.clone(),
        resource_type: ResourceType::Ingress,
    }
}

#[cfg(feature = "builtin-specs")]
fn default_filters() -> FilterRegistry {
    crate::registry::builtin::filters()
}

#[cfg(not(feature = "builtin-specs"))]
fn default_filters() -> FilterRegistry {
    FilterRegistry::new()
}

#[cfg(feature = "builtin-specs")]
fn default_predicates() -> PredicateSpecs {
    crate::registry::builtin::predicates()
}

#[cfg(not(feature = "builtin-specs"))]
fn default_predicates() -> PredicateSpecs {
    PredicateSpecs::new()
}
