#![no_main]

use ingress_annotations::{
    INGRESS_FILTER_ANNOTATION, INGRESS_PREDICATE_ANNOTATION, INGRESS_ROUTES_ANNOTATION,
    IngressItem, IngressValidator, Validator, ValidatorConfig,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    let item = IngressItem::new("fuzz", "fuzz")
        .with_annotation(INGRESS_FILTER_ANNOTATION, s.as_ref())
        .with_annotation(INGRESS_PREDICATE_ANNOTATION, s.as_ref())
        .with_annotation(INGRESS_ROUTES_ANNOTATION, s.as_ref());
    let validator = IngressValidator::new(ValidatorConfig {
        enable_advanced_validation: true,
    });
    if let Err(errs) = validator.validate(&item) {
        assert!(!errs.is_empty());
        assert!(errs.len() <= 3 || errs.for_key(INGRESS_ROUTES_ANNOTATION).count() > 1);
    }
});
