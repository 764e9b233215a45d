#![no_main]

use ingress_annotations::{parse_routes, routes_to_string};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    if let Ok(routes) = parse_routes(&s) {
        // Anonymous routes render without an id and only re-parse on their own.
        if routes.iter().any(|r| r.id.is_empty()) {
            return;
        }
        let rendered = routes_to_string(&routes);
        let reparsed = parse_routes(&rendered).expect("rendered routes must parse");
        assert_eq!(routes.len(), reparsed.len());
    }
});
