#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    let _ = ingress_annotations::parse_filters(&s);
    let _ = ingress_annotations::parse_predicates(&s);
    let _ = ingress_annotations::parse_routes(&s);
});
