use ingress_annotations::registry::builtin;
use ingress_annotations::*;
use proptest::prelude::*;

fn validator(advanced: bool) -> IngressValidator {
    IngressValidator::new(ValidatorConfig {
        enable_advanced_validation: advanced,
    })
}

/// Strategy for filter names that are not registered as built-ins.
fn arb_unknown_filter() -> impl Strategy<Value = String> {
    "zz[a-z]{1,8}"
}

/// Strategy for well-formed filter chains made of built-in filters.
fn arb_known_filters() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            r#"status(200)"#,
            r#"setPath("/x")"#,
            r#"setRequestHeader("X-A", "b")"#,
            r#"compress()"#,
            r#"modPath(/^\/api/, "/")"#,
        ]),
        1..4,
    )
    .prop_map(|filters| filters.join(" -> "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Without advanced validation, unknown kinds never produce errors
    #[test]
    fn syntax_only_ignores_unknown_kinds(name in arb_unknown_filter()) {
        prop_assert!(!builtin::filters().contains(&name));
        let item = IngressItem::new("ns", "n")
            .with_annotation(INGRESS_FILTER_ANNOTATION, format!("{}()", name))
            .with_annotation(INGRESS_PREDICATE_ANNOTATION, format!("Z{}()", name))
            .with_annotation(
                INGRESS_ROUTES_ANNOTATION,
                format!("r: * -> {}() -> <shunt>", name),
            );
        prop_assert!(validator(false).validate(&item).is_ok());
    }

    // With advanced validation, an unknown filter is reported against its key
    #[test]
    fn advanced_reports_unknown_filter(name in arb_unknown_filter(), known in arb_known_filters()) {
        let chain = format!("{} -> {}()", known, name);
        let item = IngressItem::new("ns", "n").with_annotation(INGRESS_FILTER_ANNOTATION, chain);
        let errs = validator(true).validate(&item).unwrap_err();
        prop_assert_eq!(errs.len(), 1);
        let err = errs.iter().next().unwrap();
        prop_assert_eq!(err.key.as_str(), INGRESS_FILTER_ANNOTATION);
        prop_assert!(err.to_string().contains(&name));
    }

    // Known chains pass in both modes
    #[test]
    fn known_filters_pass(known in arb_known_filters(), advanced in any::<bool>()) {
        let item = IngressItem::new("ns", "n").with_annotation(INGRESS_FILTER_ANNOTATION, known);
        prop_assert!(validator(advanced).validate(&item).is_ok());
    }

    // Malformed text yields exactly one syntax error regardless of the flag
    #[test]
    fn malformed_text_is_one_syntax_error(known in arb_known_filters(), advanced in any::<bool>()) {
        let item = IngressItem::new("ns", "n")
            .with_annotation(INGRESS_FILTER_ANNOTATION, format!("{} ->", known));
        let errs = validator(advanced).validate(&item).unwrap_err();
        prop_assert_eq!(errs.len(), 1);
        prop_assert!(errs.iter().all(AnnotationError::is_syntax));
    }

    // N routes with K failing produce exactly K route errors
    #[test]
    fn failing_routes_are_counted(failing in prop::collection::vec(any::<bool>(), 1..8)) {
        let routes: Vec<String> = failing
            .iter()
            .enumerate()
            .map(|(i, fail)| {
                let filter = if *fail { "nope()" } else { "status(200)" };
                format!("r{}: * -> {} -> <shunt>;", i, filter)
            })
            .collect();
        let item = IngressItem::new("ns", "n")
            .with_annotation(INGRESS_ROUTES_ANNOTATION, routes.join("\n"));

        let expected = failing.iter().filter(|f| **f).count();
        match validator(true).validate(&item) {
            Ok(()) => prop_assert_eq!(expected, 0),
            Err(errs) => {
                prop_assert_eq!(errs.len(), expected);
                prop_assert!(errs.iter().all(|e| e.key == INGRESS_ROUTES_ANNOTATION));
            }
        }
    }

    // Each annotation contributes independently of the others
    #[test]
    fn annotations_are_independent(bad_filter in any::<bool>(), bad_predicate in any::<bool>(), bad_routes in any::<bool>()) {
        let mut item = IngressItem::new("ns", "n");
        item = item.with_annotation(
            INGRESS_FILTER_ANNOTATION,
            if bad_filter { "foo()" } else { "status(200)" },
        );
        item = item.with_annotation(
            INGRESS_PREDICATE_ANNOTATION,
            if bad_predicate { "Path(" } else { r#"Path("/")"# },
        );
        item = item.with_annotation(
            INGRESS_ROUTES_ANNOTATION,
            if bad_routes { "a: Nope() -> <shunt>" } else { "a: * -> <shunt>" },
        );

        let keys: Vec<String> = match validator(true).validate(&item) {
            Ok(()) => vec![],
            Err(errs) => errs.into_iter().map(|e| e.key).collect(),
        };
        let mut expected = vec![];
        if bad_filter {
            expected.push(INGRESS_FILTER_ANNOTATION.to_string());
        }
        if bad_predicate {
            expected.push(INGRESS_PREDICATE_ANNOTATION.to_string());
        }
        if bad_routes {
            expected.push(INGRESS_ROUTES_ANNOTATION.to_string());
        }
        prop_assert_eq!(keys, expected);
    }
}
