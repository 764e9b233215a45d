use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Arguments ──────────────────────────────────────────────────────────────

/// A literal argument passed to a filter or predicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Arg {
    String(String),
    Number(f64),
    /// A `/.../` regular expression literal, stored without delimiters.
    Regex(String),
}

impl Arg {
    /// Name of the literal kind, used in argument diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Arg::String(_) => "string",
            Arg::Number(_) => "number",
            Arg::Regex(_) => "regexp",
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::String(s) => write_quoted(f, s),
            Arg::Number(n) => write!(f, "{}", n),
            Arg::Regex(r) => {
                // A backslash always pairs with the next character, so an
                // escape never swallows the closing slash.
                f.write_str("/")?;
                let mut chars = r.chars();
                while let Some(c) = chars.next() {
                    match c {
                        '/' => f.write_str("\\/")?,
                        '\\' => match chars.next() {
                            Some('/') => f.write_str("\\/")?,
                            Some(next) => write!(f, "\\{}", next)?,
                            None => f.write_str("\\\\")?,
                        },
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("/")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("\"")
}

fn write_call(f: &mut fmt::Formatter<'_>, name: &str, args: &[Arg]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg)?;
    }
    f.write_str(")")
}

// ─── Filters and predicates ─────────────────────────────────────────────────

/// One element of a filter chain, e.g. `setPath("/")`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,
}

impl Filter {
    pub fn new(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Filter {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_call(f, &self.name, &self.args)
    }
}

/// One match condition of a predicate chain, e.g. `Path("/foo")`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,
}

impl Predicate {
    pub fn new(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Predicate {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_call(f, &self.name, &self.args)
    }
}

// ─── Routes ─────────────────────────────────────────────────────────────────

/// Where a matching request is sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "snake_case")]
pub enum Backend {
    /// A proxied network address, e.g. `"https://example.org"`.
    Network(String),
    Shunt,
    Loopback,
    Dynamic,
    /// `<algorithm, "endpoint", ...>`; the algorithm is optional.
    LoadBalanced {
        algorithm: Option<String>,
        endpoints: Vec<String>,
    },
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Network(address) => write_quoted(f, address),
            Backend::Shunt => f.write_str("<shunt>"),
            Backend::Loopback => f.write_str("<loopback>"),
            Backend::Dynamic => f.write_str("<dynamic>"),
            Backend::LoadBalanced {
                algorithm,
                endpoints,
            } => {
                f.write_str("<")?;
                let mut first = true;
                if let Some(algorithm) = algorithm {
                    f.write_str(algorithm)?;
                    first = false;
                }
                for endpoint in endpoints {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, endpoint)?;
                    first = false;
                }
                f.write_str(">")
            }
        }
    }
}

/// A complete route definition. Anonymous routes have an empty `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    pub backend: Backend,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.id.is_empty() {
            write!(f, "{}: ", self.id)?;
        }
        write!(f, "{}", predicates_to_string(&self.predicates))?;
        for filter in &self.filters {
            write!(f, " -> {}", filter)?;
        }
        write!(f, " -> {}", self.backend)
    }
}

/// Renders a filter chain in eskip syntax.
pub fn filters_to_string(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Renders a predicate chain in eskip syntax. An empty chain renders as `*`.
pub fn predicates_to_string(predicates: &[Predicate]) -> String {
    if predicates.is_empty() {
        return "*".to_string();
    }
    predicates
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Renders route definitions in eskip syntax, one per line.
pub fn routes_to_string(routes: &[Route]) -> String {
    routes
        .iter()
        .map(|r| format!("{};", r))
        .collect::<Vec<_>>()
        .join("\n")
}
