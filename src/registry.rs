//! Registries of known filter and predicate kinds.
//!
//! A kind is anything implementing [`FilterSpec`] or [`PredicateSpec`]: it has
//! a name and decides whether a given argument list is acceptable. Most kinds
//! only constrain argument count and literal types, which [`ArgShape`]
//! expresses declaratively.

use crate::types::Arg;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A filter kind known to the routing runtime.
pub trait FilterSpec: Send + Sync {
    fn name(&self) -> &str;

    /// Returns a human-readable reason when `args` cannot configure this filter.
    fn check_args(&self, args: &[Arg]) -> Result<(), String>;
}

/// A predicate kind known to the routing runtime.
pub trait PredicateSpec: Send + Sync {
    fn name(&self) -> &str;

    /// Returns a human-readable reason when `args` cannot configure this predicate.
    fn check_args(&self, args: &[Arg]) -> Result<(), String>;
}

// ─── Argument shapes ────────────────────────────────────────────────────────

/// Literal type accepted at one argument position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Number,
    /// A string or `/regexp/` literal that must compile as a regular expression.
    Regex,
    Any,
}

impl ArgKind {
    pub fn accepts(self, arg: &Arg) -> Result<(), String> {
        match (self, arg) {
            (ArgKind::Any, _) => Ok(()),
            (ArgKind::String, Arg::String(_)) => Ok(()),
            (ArgKind::Number, Arg::Number(_)) => Ok(()),
            (ArgKind::Regex, Arg::String(pattern) | Arg::Regex(pattern)) => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| format!("invalid regexp /{}/: {}", pattern, e)),
            (expected, actual) => Err(format!(
                "expected {}, got {}",
                expected.as_str(),
                actual.kind_name()
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArgKind::String => "string",
            ArgKind::Number => "number",
            ArgKind::Regex => "regexp",
            ArgKind::Any => "any",
        }
    }
}

/// Declarative argument signature: required positions, then optional
/// positions, then an optional repeated tail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgShape {
    name: String,
    required: Vec<ArgKind>,
    optional: Vec<ArgKind>,
    variadic: Option<ArgKind>,
}

impl ArgShape {
    pub fn new(name: impl Into<String>) -> Self {
        ArgShape {
            name: name.into(),
            required: vec![],
            optional: vec![],
            variadic: None,
        }
    }

    pub fn required(mut self, kinds: &[ArgKind]) -> Self {
        self.required = kinds.to_vec();
        self
    }

    pub fn optional(mut self, kinds: &[ArgKind]) -> Self {
        self.optional = kinds.to_vec();
        self
    }

    pub fn variadic(mut self, kind: ArgKind) -> Self {
        self.variadic = Some(kind);
        self
    }

    fn check(&self, args: &[Arg]) -> Result<(), String> {
        let min = self.required.len();
        let max = min + self.optional.len();

        if self.variadic.is_none() && args.len() > max || args.len() < min {
            return Err(match (self.variadic, min == max) {
                (None, true) => format!("expected {} argument(s), got {}", min, args.len()),
                (None, false) if args.len() > max => {
                    format!("expected at most {} argument(s), got {}", max, args.len())
                }
                _ => format!("expected at least {} argument(s), got {}", min, args.len()),
            });
        }

        for (i, arg) in args.iter().enumerate() {
            let kind = if i < min {
                self.required[i]
            } else if i < max {
                self.optional[i - min]
            } else {
                // Bounds were checked above, so only a variadic tail reaches here.
                self.variadic.unwrap_or(ArgKind::Any)
            };
            kind.accepts(arg)
                .map_err(|e| format!("argument {}: {}", i + 1, e))?;
        }
        Ok(())
    }
}

impl FilterSpec for ArgShape {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_args(&self, args: &[Arg]) -> Result<(), String> {
        self.check(args)
    }
}

impl PredicateSpec for ArgShape {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_args(&self, args: &[Arg]) -> Result<(), String> {
        self.check(args)
    }
}

// ─── Filter registry ────────────────────────────────────────────────────────

/// Filter kinds by name.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    specs: HashMap<String, Arc<dyn FilterSpec>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a filter kind, replacing any kind with the same name.
    pub fn register(&mut self, spec: impl FilterSpec + 'static) {
        self.register_arc(Arc::new(spec));
    }

    pub fn register_arc(&mut self, spec: Arc<dyn FilterSpec>) {
        self.specs.insert(spec.name().to_string(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FilterSpec>> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.specs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

impl FromIterator<Arc<dyn FilterSpec>> for FilterRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn FilterSpec>>>(iter: I) -> Self {
        let mut registry = FilterRegistry::new();
        for spec in iter {
            registry.register_arc(spec);
        }
        registry
    }
}

// ─── Predicate specs ────────────────────────────────────────────────────────

/// Predicate kinds in registration order. Later registrations shadow earlier
/// ones with the same name.
#[derive(Clone, Default)]
pub struct PredicateSpecs {
    specs: Vec<Arc<dyn PredicateSpec>>,
}

impl PredicateSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: impl PredicateSpec + 'static) {
        self.specs.push(Arc::new(spec));
    }

    pub fn push_arc(&mut self, spec: Arc<dyn PredicateSpec>) {
        self.specs.push(spec);
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn PredicateSpec>> {
        self.specs.iter().rev().find(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PredicateSpec>> {
        self.specs.iter()
    }
}

impl fmt::Debug for PredicateSpecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.specs.iter().map(|s| s.name()))
            .finish()
    }
}

impl FromIterator<Arc<dyn PredicateSpec>> for PredicateSpecs {
    fn from_iter<I: IntoIterator<Item = Arc<dyn PredicateSpec>>>(iter: I) -> Self {
        PredicateSpecs {
            specs: iter.into_iter().collect(),
        }
    }
}

// ─── Built-in kinds ─────────────────────────────────────────────────────────

/// Argument signatures of the filters and predicates shipped with the
/// routing runtime.
#[cfg(feature = "builtin-specs")]
pub mod builtin {
    use super::{ArgKind, ArgShape, FilterRegistry, PredicateSpecs};
    use super::ArgKind::{Any, Number as N, Regex as R, String as S};

    /// A built-in registry entry.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ShapeEntry {
        pub name: &'static str,
        pub required: &'static [ArgKind],
        pub optional: &'static [ArgKind],
        pub variadic: Option<ArgKind>,
    }

    impl From<&ShapeEntry> for ArgShape {
        fn from(entry: &ShapeEntry) -> Self {
            let shape = ArgShape::new(entry.name)
                .required(entry.required)
                .optional(entry.optional);
            match entry.variadic {
                Some(kind) => shape.variadic(kind),
                None => shape,
            }
        }
    }

    const fn fixed(name: &'static str, required: &'static [ArgKind]) -> ShapeEntry {
        ShapeEntry {
            name,
            required,
            optional: &[],
            variadic: None,
        }
    }

    const fn with_optional(
        name: &'static str,
        required: &'static [ArgKind],
        optional: &'static [ArgKind],
    ) -> ShapeEntry {
        ShapeEntry {
            name,
            required,
            optional,
            variadic: None,
        }
    }

    const fn repeated(
        name: &'static str,
        required: &'static [ArgKind],
        tail: ArgKind,
    ) -> ShapeEntry {
        ShapeEntry {
            name,
            required,
            optional: &[],
            variadic: Some(tail),
        }
    }

    pub static FILTERS: &[ShapeEntry] = &[
        // Headers
        fixed("setRequestHeader", &[S, S]),
        fixed("setResponseHeader", &[S, S]),
        fixed("appendRequestHeader", &[S, S]),
        fixed("appendResponseHeader", &[S, S]),
        fixed("dropRequestHeader", &[S]),
        fixed("dropResponseHeader", &[S]),
        fixed("copyRequestHeader", &[S, S]),
        fixed("copyResponseHeader", &[S, S]),
        fixed("headerToQuery", &[S, S]),
        fixed("queryToHeader", &[S, S]),
        fixed("preserveHost", &[S]),
        // Paths and queries
        fixed("setPath", &[S]),
        fixed("modPath", &[R, S]),
        with_optional("setQuery", &[S], &[S]),
        fixed("dropQuery", &[S]),
        with_optional("stripQuery", &[], &[S]),
        // Redirects and responses
        with_optional("redirectTo", &[N], &[S]),
        with_optional("redirectToLower", &[N], &[S]),
        fixed("status", &[N]),
        with_optional("inlineContent", &[S], &[S]),
        fixed("randomContent", &[N]),
        fixed("repeatContent", &[S, N]),
        repeated("compress", &[], Any),
        // Cookies
        fixed("requestCookie", &[S, S]),
        with_optional("responseCookie", &[S, S], &[N, S]),
        // Rate limits and timeouts
        with_optional("ratelimit", &[N, Any], &[S]),
        with_optional("clientRatelimit", &[N, Any], &[S]),
        with_optional("localRatelimit", &[N, Any], &[S]),
        fixed("backendTimeout", &[Any]),
        fixed("latency", &[Any]),
        fixed("bandwidth", &[N]),
        fixed("chunks", &[N, Any]),
        // Traffic shaping and observability
        with_optional("flowId", &[], &[S]),
        fixed("tee", &[S]),
        fixed("teenf", &[S]),
        repeated("corsOrigin", &[], S),
        fixed("tracingTag", &[S, S]),
        fixed("stateBagToTag", &[S, S]),
        repeated("disableAccessLog", &[], N),
        repeated("enableAccessLog", &[], N),
        fixed("setDynamicBackendUrl", &[S]),
        fixed("setDynamicBackendHost", &[S]),
        fixed("setDynamicBackendScheme", &[S]),
    ];

    pub static PREDICATES: &[ShapeEntry] = &[
        fixed("Path", &[S]),
        fixed("PathSubtree", &[S]),
        fixed("PathRegexp", &[R]),
        fixed("Host", &[R]),
        repeated("HostAny", &[S], S),
        fixed("Method", &[S]),
        repeated("Methods", &[S], S),
        fixed("Header", &[S, S]),
        fixed("HeaderRegexp", &[S, R]),
        fixed("Cookie", &[S, R]),
        with_optional("QueryParam", &[S], &[R]),
        repeated("Source", &[S], S),
        repeated("SourceFromLast", &[S], S),
        repeated("ClientIP", &[S], S),
        fixed("Weight", &[N]),
        with_optional("Traffic", &[N], &[S, S]),
        fixed("True", &[]),
        fixed("False", &[]),
        fixed("Between", &[Any, Any]),
        fixed("After", &[Any]),
        fixed("Before", &[Any]),
        fixed("Cron", &[S]),
        fixed("Shutdown", &[]),
        fixed("Tee", &[S]),
        fixed("ContentLengthBetween", &[N, N]),
        repeated("JWTPayloadAnyKV", &[S, S], S),
        repeated("JWTPayloadAllKV", &[S, S], S),
    ];

    /// A registry holding every built-in filter.
    pub fn filters() -> FilterRegistry {
        let mut registry = FilterRegistry::new();
        for entry in FILTERS {
            registry.register(ArgShape::from(entry));
        }
        registry
    }

    /// Every built-in predicate, in table order.
    pub fn predicates() -> PredicateSpecs {
        let mut specs = PredicateSpecs::new();
        for entry in PREDICATES {
            specs.push(ArgShape::from(entry));
        }
        specs
    }
}
