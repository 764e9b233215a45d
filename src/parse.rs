//! Parser for the eskip routing expression language.
//!
//! Three entry points cover the three annotation shapes: a filter chain
//! (`a() -> b("x")`), a predicate chain (`Path("/") && Method("GET")`, or `*`)
//! and a list of route definitions (`r1: Path("/") -> setPath("/x") -> "https://b";`).
//! Parsing is purely syntactic: names are not checked against any registry.
//!
//! The grammar is written with `nom` combinators over `&str`. Failures carry
//! the remaining input, which is turned into a 1-based line and column of
//! the original text when the error leaves this module.

use nom::{
    IResult, Offset,
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{alpha1, alphanumeric1, anychar, char, digit0, digit1, multispace1, none_of},
    combinator::{cut, eof, map, opt, recognize, value},
    error::{ContextError, ErrorKind, ParseError as NomParseError, context},
    multi::{fold_many0, many0, many0_count, separated_list1},
    sequence::{pair, preceded, terminated, tuple},
};
use std::collections::HashSet;

use crate::error::{ParseError, ParseErrorKind};
use crate::types::{Arg, Backend, Filter, Predicate, Route};

// ============================================================================
// Public API
// ============================================================================

/// Parse a filter chain. Empty input yields an empty chain.
pub fn parse_filters(input: &str) -> Result<Vec<Filter>, ParseError> {
    run(
        input,
        alt((value(vec![], end_of_input), terminated(filter_chain, end_of_input))),
    )
}

/// Parse a predicate chain. Empty input and the catch-all `*` both yield an
/// empty chain.
pub fn parse_predicates(input: &str) -> Result<Vec<Predicate>, ParseError> {
    run(
        input,
        alt((value(vec![], end_of_input), terminated(predicate_chain, end_of_input))),
    )
}

/// Parse route definitions.
///
/// Accepts either a `;`-separated list of `id: ...` definitions or a single
/// anonymous route body, whose id is left empty. Route ids must be unique.
pub fn parse_routes(input: &str) -> Result<Vec<Route>, ParseError> {
    run(
        input,
        alt((value(vec![], end_of_input), terminated(routes, end_of_input))),
    )
}

fn run<'a, O, F>(source: &'a str, mut parser: F) -> Result<O, ParseError>
where
    F: FnMut(&'a str) -> Res<'a, O>,
{
    match parser(source) {
        Ok((_, output)) => Ok(output),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e.locate(source)),
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError::at(&source[source.len()..]).locate(source)),
    }
}

// ============================================================================
// Errors
// ============================================================================

type Res<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

/// Error threaded through the combinators. `at` is the unconsumed input where
/// the failure was detected.
#[derive(Debug)]
struct SyntaxError<'a> {
    at: &'a str,
    kind: ParseErrorKind,
    expected: Option<&'static str>,
    message: Option<String>,
}

impl<'a> SyntaxError<'a> {
    fn at(at: &'a str) -> Self {
        SyntaxError {
            at,
            kind: ParseErrorKind::Syntax,
            expected: None,
            message: None,
        }
    }

    fn locate(self, source: &str) -> ParseError {
        let offset = source.offset(self.at).min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;

        let message = match self.message {
            Some(message) => message,
            None => format!(
                "expected {}, found {}",
                self.expected.unwrap_or("expression"),
                describe(self.at)
            ),
        };
        ParseError {
            kind: self.kind,
            message,
            line,
            column,
        }
    }
}

impl<'a> NomParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        SyntaxError::at(input)
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    // Report the alternative that got furthest.
    fn or(self, other: Self) -> Self {
        if other.at.len() <= self.at.len() {
            other
        } else {
            self
        }
    }
}

impl<'a> ContextError<&'a str> for SyntaxError<'a> {
    fn add_context(_input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        if other.expected.is_none() {
            other.expected = Some(ctx);
        }
        other
    }
}

fn failure(at: &str, kind: ParseErrorKind, message: String) -> nom::Err<SyntaxError<'_>> {
    nom::Err::Failure(SyntaxError {
        at,
        kind,
        expected: None,
        message: Some(message),
    })
}

fn describe(at: &str) -> String {
    let word: String = at
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match at.chars().next() {
        None => "end of input".to_string(),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => format!("identifier '{}'", word),
        Some(c) => format!("'{}'", c),
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

/// Whitespace and `//` line comments.
fn trivia(input: &str) -> Res<'_, ()> {
    value(
        (),
        many0_count(alt((
            multispace1,
            recognize(pair(tag("//"), take_while(|c: char| c != '\n'))),
        ))),
    )(input)
}

fn lexeme<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: nom::Parser<&'a str, O, SyntaxError<'a>>,
{
    preceded(trivia, parser)
}

fn end_of_input(input: &str) -> Res<'_, ()> {
    context("end of input", value((), lexeme(eof)))(input)
}

fn closing<'a>(delimiter: char) -> impl FnMut(&'a str) -> Res<'a, char> {
    char(delimiter)
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn arrow(input: &str) -> Res<'_, &str> {
    lexeme(tag("->"))(input)
}

// ============================================================================
// Literals
// ============================================================================

#[derive(Clone, Copy)]
enum Fragment<'a> {
    Literal(&'a str),
    Char(char),
    /// An escape the literal does not interpret; the backslash is kept.
    Kept(char),
}

fn push_fragment(mut text: String, fragment: Fragment<'_>) -> String {
    match fragment {
        Fragment::Literal(s) => text.push_str(s),
        Fragment::Char(c) => text.push(c),
        Fragment::Kept(c) => {
            text.push('\\');
            text.push(c);
        }
    }
    text
}

fn string_fragment(input: &str) -> Res<'_, Fragment<'_>> {
    alt((
        map(is_not("\"\\"), Fragment::Literal),
        preceded(
            char('\\'),
            alt((
                map(
                    alt((
                        value('\n', char('n')),
                        value('\r', char('r')),
                        value('\t', char('t')),
                        value('\u{8}', char('b')),
                        value('\u{c}', char('f')),
                        value('\u{b}', char('v')),
                        char('"'),
                        char('\\'),
                    )),
                    Fragment::Char,
                ),
                map(anychar, Fragment::Kept),
            )),
        ),
    ))(input)
}

fn quoted(input: &str) -> Res<'_, String> {
    let (rest, _) = char('"')(input)?;
    let (rest, text) = fold_many0(string_fragment, String::new, push_fragment)(rest)?;
    let (rest, _) = closing('"')(rest).map_err(|_| {
        failure(input, ParseErrorKind::UnterminatedLiteral, "unterminated string".to_string())
    })?;
    Ok((rest, text))
}

fn raw_string(input: &str) -> Res<'_, String> {
    let (rest, _) = char('`')(input)?;
    let (rest, text) = take_while(|c: char| c != '`')(rest)?;
    let (rest, _) = closing('`')(rest).map_err(|_| {
        failure(input, ParseErrorKind::UnterminatedLiteral, "unterminated raw string".to_string())
    })?;
    Ok((rest, text.to_string()))
}

fn string_literal(input: &str) -> Res<'_, String> {
    alt((quoted, raw_string))(input)
}

// `\/` stands for `/`; every other escape belongs to the regexp itself and
// is kept together with its backslash.
fn regex_fragment(input: &str) -> Res<'_, Fragment<'_>> {
    alt((
        map(is_not("/\\\n"), Fragment::Literal),
        map(preceded(char('\\'), none_of("\n")), |c| match c {
            '/' => Fragment::Char('/'),
            other => Fragment::Kept(other),
        }),
    ))(input)
}

fn regex(input: &str) -> Res<'_, String> {
    let (rest, _) = char('/')(input)?;
    let (rest, pattern) = fold_many0(regex_fragment, String::new, push_fragment)(rest)?;
    let (rest, _) = closing('/')(rest).map_err(|_| {
        failure(input, ParseErrorKind::UnterminatedLiteral, "unterminated regexp".to_string())
    })?;
    Ok((rest, pattern))
}

fn number_text(input: &str) -> Res<'_, &str> {
    recognize(tuple((
        opt(char('-')),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)
}

fn number(input: &str) -> Res<'_, f64> {
    let starts_number = input.starts_with(|c: char| c == '-' || c == '.' || c.is_ascii_digit());
    if !starts_number || input.starts_with("->") {
        return Err(nom::Err::Error(SyntaxError::at(input)));
    }

    let invalid = || {
        let text: String = input
            .chars()
            .take_while(|c| *c == '-' || *c == '.' || c.is_ascii_digit())
            .collect();
        failure(input, ParseErrorKind::InvalidNumber, format!("invalid number '{}'", text))
    };
    let (rest, text) = number_text(input).map_err(|_| invalid())?;
    let n = text
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(invalid)?;
    Ok((rest, n))
}

fn arg(input: &str) -> Res<'_, Arg> {
    context(
        "argument",
        lexeme(alt((
            map(string_literal, Arg::String),
            map(regex, Arg::Regex),
            map(number, Arg::Number),
        ))),
    )(input)
}

// ============================================================================
// Filters and predicates
// ============================================================================

fn arguments(input: &str) -> Res<'_, Vec<Arg>> {
    alt((
        value(vec![], lexeme(char(')'))),
        terminated(
            separated_list1(lexeme(char(',')), cut(arg)),
            cut(context("',' or ')'", lexeme(char(')')))),
        ),
    ))(input)
}

fn call<'a>(input: &'a str, expected: &'static str) -> Res<'a, (&'a str, Vec<Arg>)> {
    let (input, name) = context(expected, lexeme(identifier))(input)?;
    let (input, _) = cut(context("'('", lexeme(char('('))))(input)?;
    let (input, args) = cut(arguments)(input)?;
    Ok((input, (name, args)))
}

fn filter(input: &str) -> Res<'_, Filter> {
    let (rest, (name, args)) = call(input, "filter name")?;
    Ok((rest, Filter::new(name, args)))
}

fn predicate(input: &str) -> Res<'_, Predicate> {
    let (rest, (name, args)) = call(input, "predicate name")?;
    Ok((rest, Predicate::new(name, args)))
}

fn filter_chain(input: &str) -> Res<'_, Vec<Filter>> {
    separated_list1(arrow, cut(filter))(input)
}

fn predicate_chain(input: &str) -> Res<'_, Vec<Predicate>> {
    alt((
        value(vec![], lexeme(char('*'))),
        separated_list1(lexeme(tag("&&")), cut(predicate)),
    ))(input)
}

// ============================================================================
// Routes
// ============================================================================

fn starts_definition(input: &str) -> bool {
    pair(lexeme(identifier), lexeme(char(':')))(input).is_ok()
}

fn routes(input: &str) -> Res<'_, Vec<Route>> {
    if starts_definition(input) {
        return definitions(input);
    }
    let (rest, route) = route_body(input, "")?;
    let (rest, _) = opt(lexeme(char(';')))(rest)?;
    Ok((rest, vec![route]))
}

fn definitions<'a>(input: &'a str) -> Res<'a, Vec<Route>> {
    let mut routes = Vec::new();
    let mut seen = HashSet::new();
    let mut rest = input;
    loop {
        let (next, id) = context("route id", lexeme(identifier))(rest)?;
        if !seen.insert(id) {
            return Err(failure(
                id,
                ParseErrorKind::DuplicateRouteId,
                format!("duplicate route id \"{}\"", id),
            ));
        }
        let (next, _) = cut(context("':'", lexeme(char(':'))))(next)?;
        let (next, route) = cut(|i: &'a str| route_body(i, id))(next)?;
        routes.push(route);

        match lexeme(char(';'))(next) {
            Ok((next, _)) if end_of_input(next).is_err() => rest = next,
            Ok((next, _)) => return Ok((next, routes)),
            Err(_) => return Ok((next, routes)),
        }
    }
}

fn route_body<'a>(input: &'a str, id: &str) -> Res<'a, Route> {
    let (input, predicates) = predicate_chain(input)?;
    let (input, _) = cut(context("'->'", arrow))(input)?;
    let (input, filters) = many0(terminated(filter, cut(context("'->'", arrow))))(input)?;
    let (input, backend) = cut(context("filter or backend", backend))(input)?;
    Ok((
        input,
        Route {
            id: id.to_string(),
            predicates,
            filters,
            backend,
        },
    ))
}

fn backend(input: &str) -> Res<'_, Backend> {
    alt((
        map(lexeme(string_literal), Backend::Network),
        preceded(lexeme(char('<')), cut(backend_body)),
    ))(input)
}

fn backend_body(input: &str) -> Res<'_, Backend> {
    let Ok((rest, name)) = lexeme(identifier)(input) else {
        let (rest, endpoints) = endpoints(input)?;
        return Ok((
            rest,
            Backend::LoadBalanced {
                algorithm: None,
                endpoints,
            },
        ));
    };

    if let Ok((rest, _)) = lexeme(char('>'))(rest) {
        let backend = match name {
            "shunt" => Backend::Shunt,
            "loopback" => Backend::Loopback,
            "dynamic" => Backend::Dynamic,
            _ => {
                return Err(failure(
                    name,
                    ParseErrorKind::Syntax,
                    format!("unknown special backend '<{}>'", name),
                ));
            }
        };
        return Ok((rest, backend));
    }

    let (rest, _) = context("',' or '>'", lexeme(char(',')))(rest)?;
    let (rest, endpoints) = endpoints(rest)?;
    Ok((
        rest,
        Backend::LoadBalanced {
            algorithm: Some(name.to_string()),
            endpoints,
        },
    ))
}

fn endpoints(input: &str) -> Res<'_, Vec<String>> {
    terminated(
        separated_list1(
            lexeme(char(',')),
            cut(context("endpoint string", lexeme(string_literal))),
        ),
        context("',' or '>'", lexeme(char('>'))),
    )(input)
}
