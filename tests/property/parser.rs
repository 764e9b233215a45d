use ingress_annotations::parse::{parse_filters, parse_predicates, parse_routes};
use ingress_annotations::types::*;
use proptest::prelude::*;

/// Strategy for regexp bodies built from pieces that include slashes,
/// escaped backslashes and other escapes. Bodies are non-empty since `//`
/// starts a comment.
fn arb_regex() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "a", "z0", ".", "*", "^", "$", "|", "/", r"\\", r"\\/", r"\d", r"\.", r"\\\\",
        ]),
        1..6,
    )
    .prop_map(|pieces| pieces.concat())
}

/// Strategy for argument literals.
fn arb_arg() -> impl Strategy<Value = Arg> {
    prop_oneof![
        "[ -~]{0,12}".prop_map(Arg::String),
        (-1.0e6f64..1.0e6).prop_map(Arg::Number),
        (-1000i64..1000).prop_map(|n| Arg::Number(n as f64)),
        arb_regex().prop_map(Arg::Regex),
    ]
}

fn arb_filter() -> impl Strategy<Value = Filter> {
    ("[a-z][a-zA-Z0-9_]{0,8}", prop::collection::vec(arb_arg(), 0..4))
        .prop_map(|(name, args)| Filter { name, args })
}

fn arb_predicate() -> impl Strategy<Value = Predicate> {
    ("[A-Z][a-zA-Z0-9]{0,8}", prop::collection::vec(arb_arg(), 0..4))
        .prop_map(|(name, args)| Predicate { name, args })
}

fn arb_backend() -> impl Strategy<Value = Backend> {
    prop_oneof![
        Just(Backend::Shunt),
        Just(Backend::Loopback),
        Just(Backend::Dynamic),
        "https?://[a-z]{1,8}(\\.[a-z]{2,3})?(:[0-9]{2,4})?".prop_map(Backend::Network),
        (
            prop::option::of(prop::sample::select(vec!["roundRobin", "random", "custom"])),
            prop::collection::vec("http://[a-z]{1,6}:[0-9]{2,4}", 1..4),
        )
            .prop_map(|(algorithm, endpoints)| Backend::LoadBalanced {
                algorithm: algorithm.map(str::to_string),
                endpoints,
            }),
    ]
}

fn arb_routes() -> impl Strategy<Value = Vec<Route>> {
    prop::collection::vec(
        (
            prop::collection::vec(arb_predicate(), 0..3),
            prop::collection::vec(arb_filter(), 0..3),
            arb_backend(),
        ),
        0..5,
    )
    .prop_map(|defs| {
        defs.into_iter()
            .enumerate()
            .map(|(i, (predicates, filters, backend))| Route {
                id: format!("route{}", i),
                predicates,
                filters,
                backend,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // Rendering a filter chain and parsing it back yields the same chain
    #[test]
    fn filter_chain_survives_rendering(filters in prop::collection::vec(arb_filter(), 0..5)) {
        let text = filters_to_string(&filters);
        let parsed = parse_filters(&text);
        prop_assert_eq!(parsed, Ok(filters), "text: {}", text);
    }

    // Rendering a predicate chain and parsing it back yields the same chain
    #[test]
    fn predicate_chain_survives_rendering(predicates in prop::collection::vec(arb_predicate(), 0..5)) {
        let text = predicates_to_string(&predicates);
        let parsed = parse_predicates(&text);
        prop_assert_eq!(parsed, Ok(predicates), "text: {}", text);
    }

    // Named route lists survive rendering, including every backend form
    #[test]
    fn routes_survive_rendering(routes in arb_routes()) {
        let text = routes_to_string(&routes);
        let parsed = parse_routes(&text);
        prop_assert_eq!(parsed, Ok(routes), "text: {}", text);
    }

    // A rendered regexp never ends in an escape that swallows its closing slash
    #[test]
    fn regexp_survives_rendering(pattern in arb_regex()) {
        let filter = Filter::new("f", vec![Arg::Regex(pattern)]);
        let text = filter.to_string();
        prop_assert_eq!(parse_filters(&text), Ok(vec![filter]), "text: {}", text);
    }

    // Arbitrary text never panics the parser
    #[test]
    fn parser_never_panics(input in "\\PC{0,64}") {
        let _ = parse_filters(&input);
        let _ = parse_predicates(&input);
        let _ = parse_routes(&input);
    }

    // Token soup close to the grammar never panics and errors carry a position
    #[test]
    fn grammar_soup_reports_positions(input in "[a-zA-Z0-9()\"/<>,;:*&. -]{0,40}") {
        if let Err(e) = parse_routes(&input) {
            prop_assert!(e.line >= 1);
            prop_assert!(e.column >= 1);
            prop_assert!(e.column <= input.chars().count() + 1);
        }
    }

    // A chain with its closing parenthesis removed never parses
    #[test]
    fn truncated_call_is_rejected(filters in prop::collection::vec(arb_filter(), 1..4)) {
        let text = filters_to_string(&filters);
        let truncated = &text[..text.len() - 1];
        prop_assert!(parse_filters(truncated).is_err(), "accepted: {}", truncated);
    }
}
