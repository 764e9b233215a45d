//! Semantic checks of parsed expressions against filter and predicate
//! registries.
//!
//! Each checker collects **all** problems of its input into one
//! [`SemanticError`] instead of stopping at the first one.

use crate::error::{Problem, SemanticError};
use crate::metrics::{Metrics, OUTCOME_CHECKED, OUTCOME_INVALID, validation_key};
use crate::registry::{FilterRegistry, PredicateSpecs};
use crate::types::{Backend, Filter, Predicate, Route};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;
use url::Url;

/// Load balancer algorithms accepted in `<algorithm, ...>` backends.
pub const LB_ALGORITHMS: &[&str] = &[
    "roundRobin",
    "random",
    "consistentHash",
    "powerOfRandomNChoices",
];

/// Predicates that match on the request path. A route may carry at most one.
const PATH_PREDICATES: &[&str] = &["Path", "PathSubtree"];

/// Kind of resource an expression was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Ingress,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Ingress => "ingress",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies where a checked expression came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContext {
    pub namespace: String,
    pub name: String,
    pub resource_type: ResourceType,
}

/// Registries a complete route is checked against.
#[derive(Clone, Copy, Debug)]
pub struct RouteOptions<'a> {
    pub filter_registry: &'a FilterRegistry,
    pub predicate_specs: &'a PredicateSpecs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CheckKind {
    Filters,
    Predicates,
    Routes,
}

impl CheckKind {
    fn as_str(self) -> &'static str {
        match self {
            CheckKind::Filters => "filters",
            CheckKind::Predicates => "predicates",
            CheckKind::Routes => "routes",
        }
    }
}

// ─── Checkers ───────────────────────────────────────────────────────────────

/// Checks every filter of a chain against the registry.
pub fn check_filters(
    ctx: &ResourceContext,
    registry: &FilterRegistry,
    metrics: &dyn Metrics,
    filters: &[Filter],
) -> Result<(), SemanticError> {
    let mut problems = Vec::new();
    filter_problems(registry, filters, &mut problems);
    record(ctx, metrics, CheckKind::Filters, None, problems)
}

/// Checks every predicate of a chain against the known predicate specs.
pub fn check_predicates(
    ctx: &ResourceContext,
    specs: &PredicateSpecs,
    metrics: &dyn Metrics,
    predicates: &[Predicate],
) -> Result<(), SemanticError> {
    let mut problems = Vec::new();
    predicate_problems(specs, predicates, &mut problems);
    record(ctx, metrics, CheckKind::Predicates, None, problems)
}

/// Checks one complete route: its filters, its predicates, path predicate
/// conflicts and the backend address.
pub fn check_route(
    ctx: &ResourceContext,
    options: &RouteOptions<'_>,
    metrics: &dyn Metrics,
    route: &Route,
) -> Result<(), SemanticError> {
    let mut problems = Vec::new();
    predicate_problems(options.predicate_specs, &route.predicates, &mut problems);
    path_problems(&route.predicates, &mut problems);
    filter_problems(options.filter_registry, &route.filters, &mut problems);
    backend_problems(&route.backend, &mut problems);

    let route_id = (!route.id.is_empty()).then(|| route.id.clone());
    record(ctx, metrics, CheckKind::Routes, route_id, problems)
}

fn record(
    ctx: &ResourceContext,
    metrics: &dyn Metrics,
    kind: CheckKind,
    route_id: Option<String>,
    problems: Vec<Problem>,
) -> Result<(), SemanticError> {
    let resource_type = ctx.resource_type.as_str();
    metrics.inc_counter(&validation_key(resource_type, kind.as_str(), OUTCOME_CHECKED));
    if problems.is_empty() {
        return Ok(());
    }

    metrics.inc_counter(&validation_key(resource_type, kind.as_str(), OUTCOME_INVALID));
    trace!(
        namespace = %ctx.namespace,
        name = %ctx.name,
        resource_type,
        check = kind.as_str(),
        problems = problems.len(),
        "semantic check failed"
    );
    Err(SemanticError { route_id, problems })
}

fn filter_problems(registry: &FilterRegistry, filters: &[Filter], problems: &mut Vec<Problem>) {
    for filter in filters {
        match registry.get(&filter.name) {
            None => problems.push(Problem::UnknownFilter {
                name: filter.name.clone(),
            }),
            Some(spec) => {
                if let Err(reason) = spec.check_args(&filter.args) {
                    problems.push(Problem::InvalidFilterArgs {
                        name: filter.name.clone(),
                        reason,
                    });
                }
            }
        }
    }
}

fn predicate_problems(
    specs: &PredicateSpecs,
    predicates: &[Predicate],
    problems: &mut Vec<Problem>,
) {
    for predicate in predicates {
        match specs.find(&predicate.name) {
            None => problems.push(Problem::UnknownPredicate {
                name: predicate.name.clone(),
            }),
            Some(spec) => {
                if let Err(reason) = spec.check_args(&predicate.args) {
                    problems.push(Problem::InvalidPredicateArgs {
                        name: predicate.name.clone(),
                        reason,
                    });
                }
            }
        }
    }
}

fn path_problems(predicates: &[Predicate], problems: &mut Vec<Problem>) {
    let mut paths = predicates
        .iter()
        .filter(|p| PATH_PREDICATES.contains(&p.name.as_str()));
    if let Some(first) = paths.next() {
        for other in paths {
            problems.push(Problem::ConflictingPaths {
                first: first.to_string(),
                second: other.to_string(),
            });
        }
    }
}

fn backend_problems(backend: &Backend, problems: &mut Vec<Problem>) {
    match backend {
        Backend::Network(address) => {
            if let Err(reason) = check_endpoint(address) {
                problems.push(Problem::InvalidBackend {
                    backend: backend.to_string(),
                    reason,
                });
            }
        }
        Backend::LoadBalanced {
            algorithm,
            endpoints,
        } => {
            if let Some(algorithm) = algorithm
                && !LB_ALGORITHMS.contains(&algorithm.as_str())
            {
                problems.push(Problem::InvalidBackend {
                    backend: backend.to_string(),
                    reason: format!("unknown load balancer algorithm \"{}\"", algorithm),
                });
            }
            if endpoints.is_empty() {
                problems.push(Problem::InvalidBackend {
                    backend: backend.to_string(),
                    reason: "no endpoints".to_string(),
                });
            }
            for endpoint in endpoints {
                if let Err(reason) = check_endpoint(endpoint) {
                    problems.push(Problem::InvalidBackend {
                        backend: format!("\"{}\"", endpoint),
                        reason,
                    });
                }
            }
        }
        Backend::Shunt | Backend::Loopback | Backend::Dynamic => {}
    }
}

fn check_endpoint(address: &str) -> Result<(), String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme \"{}\"", other)),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(())
}

// ─── Checker seam ───────────────────────────────────────────────────────────

/// The three semantic checks a validator delegates to.
///
/// [`RegistryChecker`] is the production implementation; substitute another
/// one to instrument or restrict checking.
pub trait SemanticChecker: Send + Sync {
    fn check_filters(
        &self,
        ctx: &ResourceContext,
        registry: &FilterRegistry,
        metrics: &dyn Metrics,
        filters: &[Filter],
    ) -> Result<(), SemanticError>;

    fn check_predicates(
        &self,
        ctx: &ResourceContext,
        specs: &PredicateSpecs,
        metrics: &dyn Metrics,
        predicates: &[Predicate],
    ) -> Result<(), SemanticError>;

    fn check_route(
        &self,
        ctx: &ResourceContext,
        options: &RouteOptions<'_>,
        metrics: &dyn Metrics,
        route: &Route,
    ) -> Result<(), SemanticError>;
}

/// Delegates to [`check_filters`], [`check_predicates`] and [`check_route`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistryChecker;

impl SemanticChecker for RegistryChecker {
    fn check_filters(
        &self,
        ctx: &ResourceContext,
        registry: &FilterRegistry,
        metrics: &dyn Metrics,
        filters: &[Filter],
    ) -> Result<(), SemanticError> {
        check_filters(ctx, registry, metrics, filters)
    }

    fn check_predicates(
        &self,
        ctx: &ResourceContext,
        specs: &PredicateSpecs,
        metrics: &dyn Metrics,
        predicates: &[Predicate],
    ) -> Result<(), SemanticError> {
        check_predicates(ctx, specs, metrics, predicates)
    }

    fn check_route(
        &self,
        ctx: &ResourceContext,
        options: &RouteOptions<'_>,
        metrics: &dyn Metrics,
        route: &Route,
    ) -> Result<(), SemanticError> {
        check_route(ctx, options, metrics, route)
    }
}
