use ingress_annotations::check::*;
use ingress_annotations::error::Problem;
use ingress_annotations::metrics::{CounterMetrics, NoopMetrics};
use ingress_annotations::parse::{parse_filters, parse_predicates, parse_routes};
use ingress_annotations::registry::builtin;
use ingress_annotations::registry::*;
use ingress_annotations::types::Arg;
use std::collections::BTreeMap;
use std::sync::Arc;

fn ctx() -> ResourceContext {
    ResourceContext {
        namespace: "default".to_string(),
        name: "shop".to_string(),
        resource_type: ResourceType::Ingress,
    }
}

/// Helper: check a filter chain against the built-in registry, return problems.
fn filter_problems(input: &str) -> Vec<Problem> {
    let filters = parse_filters(input).expect("parse should succeed");
    match check_filters(&ctx(), &builtin::filters(), &NoopMetrics, &filters) {
        Ok(()) => vec![],
        Err(e) => e.problems,
    }
}

/// Helper: check a predicate chain against the built-in specs, return problems.
fn predicate_problems(input: &str) -> Vec<Problem> {
    let predicates = parse_predicates(input).expect("parse should succeed");
    match check_predicates(&ctx(), &builtin::predicates(), &NoopMetrics, &predicates) {
        Ok(()) => vec![],
        Err(e) => e.problems,
    }
}

/// Helper: check the first route of `input` against the built-in kinds.
fn route_problems(input: &str) -> Vec<Problem> {
    let routes = parse_routes(input).expect("parse should succeed");
    let filters = builtin::filters();
    let predicates = builtin::predicates();
    let options = RouteOptions {
        filter_registry: &filters,
        predicate_specs: &predicates,
    };
    match check_route(&ctx(), &options, &NoopMetrics, &routes[0]) {
        Ok(()) => vec![],
        Err(e) => e.problems,
    }
}

// ─── Argument shapes ────────────────────────────────────────────────────────

#[test]
fn arg_shape_exact_count() {
    let shape = ArgShape::new("pair").required(&[ArgKind::String, ArgKind::String]);
    assert!(FilterSpec::check_args(&shape, &[Arg::String("a".into()), Arg::String("b".into())]).is_ok());
    let err = FilterSpec::check_args(&shape, &[Arg::String("a".into())]).unwrap_err();
    assert_eq!(err, "expected 2 argument(s), got 1");
}

#[test]
fn arg_shape_optional_and_variadic_bounds() {
    let optional = ArgShape::new("opt")
        .required(&[ArgKind::Number])
        .optional(&[ArgKind::String]);
    let three = [Arg::Number(1.0), Arg::String("a".into()), Arg::String("b".into())];
    assert_eq!(
        PredicateSpec::check_args(&optional, &three).unwrap_err(),
        "expected at most 2 argument(s), got 3"
    );
    assert_eq!(
        PredicateSpec::check_args(&optional, &[]).unwrap_err(),
        "expected at least 1 argument(s), got 0"
    );

    let variadic = ArgShape::new("many")
        .required(&[ArgKind::String])
        .variadic(ArgKind::String);
    let args: Vec<Arg> = (0..10).map(|i| Arg::String(i.to_string())).collect();
    assert!(PredicateSpec::check_args(&variadic, &args).is_ok());
    assert!(PredicateSpec::check_args(&variadic, &[]).is_err());
}

#[test]
fn arg_shape_reports_position_and_type() {
    let shape = ArgShape::new("status").required(&[ArgKind::Number]);
    let err = FilterSpec::check_args(&shape, &[Arg::String("418".into())]).unwrap_err();
    assert_eq!(err, "argument 1: expected number, got string");
}

#[test]
fn regex_kind_compiles_patterns() {
    assert!(ArgKind::Regex.accepts(&Arg::Regex("^/api/.*$".into())).is_ok());
    assert!(ArgKind::Regex.accepts(&Arg::String("^[a-z]+$".into())).is_ok());
    let err = ArgKind::Regex.accepts(&Arg::Regex("(unclosed".into())).unwrap_err();
    assert!(err.starts_with("invalid regexp /(unclosed/"), "got: {}", err);
    assert!(ArgKind::Regex.accepts(&Arg::Number(1.0)).is_err());
}

// ─── Registries ─────────────────────────────────────────────────────────────

#[test]
fn filter_registry_replaces_same_name() {
    let mut registry = FilterRegistry::new();
    registry.register(ArgShape::new("f").required(&[ArgKind::Number]));
    registry.register(ArgShape::new("f"));
    assert_eq!(registry.len(), 1);
    assert!(registry.get("f").unwrap().check_args(&[]).is_ok());
    assert_eq!(registry.names(), vec!["f"]);
}

#[test]
fn predicate_specs_later_registration_wins() {
    let mut specs = PredicateSpecs::new();
    specs.push(ArgShape::new("P").required(&[ArgKind::Number]));
    specs.push(ArgShape::new("P"));
    assert_eq!(specs.len(), 2);
    assert!(specs.find("P").unwrap().check_args(&[]).is_ok());
    assert!(specs.find("Q").is_none());
}

#[test]
fn registries_collect_from_shared_specs() {
    let filters: FilterRegistry = [
        Arc::new(ArgShape::new("a")) as Arc<dyn FilterSpec>,
        Arc::new(ArgShape::new("b").required(&[ArgKind::String])) as Arc<dyn FilterSpec>,
        Arc::new(ArgShape::new("a").required(&[ArgKind::Number])) as Arc<dyn FilterSpec>,
    ]
    .into_iter()
    .collect();
    assert_eq!(filters.names(), vec!["a", "b"]);
    assert!(filters.get("a").unwrap().check_args(&[Arg::Number(1.0)]).is_ok());

    let mut predicates: PredicateSpecs = [Arc::new(ArgShape::new("Host")) as Arc<dyn PredicateSpec>]
        .into_iter()
        .collect();
    predicates.push_arc(Arc::new(ArgShape::new("Host").required(&[ArgKind::Regex])));
    let names: Vec<&str> = predicates.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["Host", "Host"]);
    assert!(predicates.find("Host").unwrap().check_args(&[]).is_err());
}

#[test]
fn builtin_tables_have_unique_names() {
    let filters = builtin::filters();
    assert_eq!(filters.len(), builtin::FILTERS.len());
    let mut names: Vec<&str> = builtin::PREDICATES.iter().map(|e| e.name).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), builtin::PREDICATES.len());
}

// ─── Filter and predicate checks ────────────────────────────────────────────

#[test]
fn known_filters_pass() {
    assert!(filter_problems(r#"setRequestHeader("X-A", "b") -> status(200) -> compress()"#).is_empty());
}

#[test]
fn unknown_filter_is_reported() {
    assert_eq!(
        filter_problems("foo()"),
        vec![Problem::UnknownFilter { name: "foo".into() }]
    );
}

#[test]
fn all_filter_problems_are_collected() {
    let problems = filter_problems(r#"foo() -> status("x") -> bar() -> setPath("/")"#);
    assert_eq!(problems.len(), 3, "got: {:?}", problems);
    assert!(matches!(problems[0], Problem::UnknownFilter { ref name } if name == "foo"));
    assert!(matches!(problems[1], Problem::InvalidFilterArgs { ref name, .. } if name == "status"));
    assert!(matches!(problems[2], Problem::UnknownFilter { ref name } if name == "bar"));
}

#[test]
fn empty_filter_chain_is_valid() {
    assert!(filter_problems("").is_empty());
}

#[test]
fn unknown_predicate_is_reported() {
    assert_eq!(
        predicate_problems(r#"Path("/") && Foo()"#),
        vec![Problem::UnknownPredicate { name: "Foo".into() }]
    );
}

#[test]
fn predicate_with_bad_regexp() {
    let problems = predicate_problems("PathRegexp(/[a-/)");
    assert_eq!(problems.len(), 1);
    assert!(matches!(problems[0], Problem::InvalidPredicateArgs { ref name, .. } if name == "PathRegexp"));
}

#[test]
fn semantic_error_display_joins_problems() {
    let filters = parse_filters("foo() -> bar()").unwrap();
    let err = check_filters(&ctx(), &builtin::filters(), &NoopMetrics, &filters).unwrap_err();
    assert_eq!(err.route_id, None);
    assert_eq!(err.to_string(), r#"filter "foo" not found; filter "bar" not found"#);
}

// ─── Route checks ───────────────────────────────────────────────────────────

#[test]
fn valid_route_passes() {
    assert!(route_problems(
        r#"r: Path("/") && Method("GET") -> setPath("/v1") -> "https://backend.example.org:8443/base""#
    )
    .is_empty());
}

#[test]
fn route_collects_filter_and_predicate_problems() {
    let problems = route_problems(r#"r: Nope() -> nope() -> <shunt>"#);
    assert_eq!(
        problems,
        vec![
            Problem::UnknownPredicate { name: "Nope".into() },
            Problem::UnknownFilter { name: "nope".into() },
        ]
    );
}

#[test]
fn route_rejects_conflicting_paths() {
    let problems = route_problems(r#"r: Path("/a") && PathSubtree("/b") -> <shunt>"#);
    assert_eq!(
        problems,
        vec![Problem::ConflictingPaths {
            first: r#"Path("/a")"#.into(),
            second: r#"PathSubtree("/b")"#.into(),
        }]
    );
}

#[test]
fn route_rejects_bad_network_backends() {
    let problems = route_problems(r#"r: * -> "ftp://files.example.org""#);
    assert!(
        matches!(&problems[..], [Problem::InvalidBackend { reason, .. }] if reason.contains("ftp")),
        "got: {:?}",
        problems
    );
    assert_eq!(route_problems(r#"r: * -> "not a url""#).len(), 1);
    assert_eq!(route_problems(r#"r: * -> "http://""#).len(), 1);
}

#[test]
fn route_checks_load_balancer_algorithm_and_endpoints() {
    assert!(route_problems(r#"r: * -> <powerOfRandomNChoices, "http://a:80", "http://b:80">"#).is_empty());
    let problems = route_problems(r#"r: * -> <leastBusy, "http://a:80", "mailto:x@y">"#);
    assert_eq!(problems.len(), 2, "got: {:?}", problems);
    assert!(matches!(&problems[0], Problem::InvalidBackend { reason, .. } if reason.contains("leastBusy")));
    assert!(matches!(&problems[1], Problem::InvalidBackend { backend, .. } if backend == "\"mailto:x@y\""));
}

#[test]
fn special_backends_need_no_address() {
    assert!(route_problems("a: * -> <shunt>").is_empty());
    assert!(route_problems("a: * -> <loopback>").is_empty());
    assert!(route_problems("a: * -> <dynamic>").is_empty());
}

#[test]
fn route_error_carries_route_id() {
    let routes = parse_routes("mine: Foo() -> <shunt>").unwrap();
    let filters = builtin::filters();
    let predicates = builtin::predicates();
    let options = RouteOptions {
        filter_registry: &filters,
        predicate_specs: &predicates,
    };
    let err = check_route(&ctx(), &options, &NoopMetrics, &routes[0]).unwrap_err();
    assert_eq!(err.route_id.as_deref(), Some("mine"));
    assert_eq!(err.to_string(), r#"route "mine": predicate "Foo" not found"#);
}

// ─── Metrics ────────────────────────────────────────────────────────────────

#[test]
fn checkers_count_checked_and_invalid() {
    let metrics = CounterMetrics::new();
    let registry = builtin::filters();
    let ok = parse_filters("status(200)").unwrap();
    let bad = parse_filters("foo()").unwrap();

    check_filters(&ctx(), &registry, &metrics, &ok).unwrap();
    check_filters(&ctx(), &registry, &metrics, &bad).unwrap_err();

    assert_eq!(metrics.get("ingress.validation.filters.checked"), 2);
    assert_eq!(metrics.get("ingress.validation.filters.invalid"), 1);
    assert_eq!(metrics.get("ingress.validation.routes.checked"), 0);
    assert_eq!(
        metrics.snapshot(),
        BTreeMap::from([
            ("ingress.validation.filters.checked".to_string(), 2),
            ("ingress.validation.filters.invalid".to_string(), 1),
        ])
    );
}

#[test]
fn registry_checker_delegates() {
    let metrics = CounterMetrics::new();
    let predicates = parse_predicates("Bogus()").unwrap();
    let err = RegistryChecker
        .check_predicates(&ctx(), &builtin::predicates(), &metrics, &predicates)
        .unwrap_err();
    assert_eq!(err.problems.len(), 1);
    assert_eq!(metrics.get("ingress.validation.predicates.invalid"), 1);
}
