// ==============================================================================
// Type Expressions
// ==============================================================================
//
// Reader for the type syntax used in catalog files and on the command line
// (grammar in type_expr.pest):
//
//   int   List<string>   Dictionary<string, int[]>   int[,]   int*   int&   !0
//
// `!n` stands for the n-th generic parameter and is only meaningful inside a
// type definition (bases, interfaces, bounds).

use catalog_ty::{base_name, Catalog, DefId, InstantiateError, Ty};
use miette::{Diagnostic, SourceSpan};
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use smol_str::SmolStr;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "type_expr.pest"]
struct TypeExprParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Param(u32),
    Named { name: SmolStr, args: Vec<TypeExpr> },
    Array { elem: Box<TypeExpr>, rank: u32 },
    Pointer(Box<TypeExpr>),
    ByRef(Box<TypeExpr>),
}

#[derive(Debug, Error, Diagnostic)]
#[error("invalid type expression")]
#[diagnostic(code(type_expr::parse))]
pub struct ParseError {
    reason: String,
    #[source_code]
    src: String,
    #[label("{reason}")]
    span: SourceSpan,
}

impl ParseError {
    fn new(src: &str, reason: impl Into<String>, span: impl Into<SourceSpan>) -> Self {
        Self {
            reason: reason.into(),
            src: src.to_string(),
            span: span.into(),
        }
    }

    fn from_pest(src: &str, err: pest::error::Error<Rule>) -> Self {
        let err = err.renamed_rules(|rule| {
            match rule {
                Rule::name => "a type name",
                Rule::param => "a generic parameter",
                Rule::index => "a parameter index",
                Rule::EOI => "end of input",
                Rule::type_args => "type arguments",
                Rule::array => "`[`",
                Rule::pointer => "`*`",
                Rule::by_ref => "`&`",
                Rule::comma => "`,`",
                _ => "a type",
            }
            .to_string()
        });
        let span = match err.location {
            InputLocation::Pos(pos) => (pos, 0),
            InputLocation::Span((start, end)) => (start, end - start),
        };
        Self::new(src, err.variant.message(), span)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum TypeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("no type named `{name}` taking {arity} type arguments")]
    Unknown { name: SmolStr, arity: usize },

    #[error("generic parameter `!{0}` used outside a type definition")]
    Open(u32),

    #[error(transparent)]
    Instantiate(#[from] InstantiateError),
}

pub fn parse(src: &str) -> Result<TypeExpr, ParseError> {
    let mut pairs = TypeExprParser::parse(Rule::type_expr, src)
        .map_err(|err| ParseError::from_pest(src, err))?;
    match pairs.next().and_then(|top| top.into_inner().next()) {
        Some(ty) => lower(src, ty),
        None => Err(ParseError::new(src, "empty type expression", (0, 0))),
    }
}

/// Parse and build a closed type. Generic arguments are checked against the
/// definition's bounds.
pub fn closed_type(catalog: &Catalog, src: &str) -> Result<Ty, TypeError> {
    parse(src)?.to_ty(catalog, Mode::Closed)
}

/// Parse and build a type that may mention the parameters of the definition
/// it appears in.
pub fn open_type(catalog: &Catalog, src: &str) -> Result<Ty, TypeError> {
    parse(src)?.to_ty(catalog, Mode::Open)
}

/// Find a definition by name. `List` finds `List`1` when `arity` is one;
/// `None` accepts any arity.
pub fn find_definition(catalog: &Catalog, name: &str, arity: Option<usize>) -> Option<DefId> {
    let fits = |def: DefId| arity.map_or(true, |n| catalog.def(def).arity() == n);

    arity
        .filter(|n| *n > 0)
        .and_then(|n| catalog.lookup(&format!("{name}`{n}")))
        .or_else(|| catalog.lookup(name).filter(|def| fits(*def)))
        .or_else(|| {
            catalog
                .defs()
                .find(|(id, def)| base_name(&def.name) == name && fits(*id))
                .map(|(id, _)| id)
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Closed,
    Open,
}

impl TypeExpr {
    fn to_ty(&self, catalog: &Catalog, mode: Mode) -> Result<Ty, TypeError> {
        match self {
            TypeExpr::Param(index) => match mode {
                Mode::Open => Ok(Ty::Param(*index)),
                Mode::Closed => Err(TypeError::Open(*index)),
            },
            TypeExpr::Named { name, args } => {
                let def = find_definition(catalog, name, Some(args.len())).ok_or_else(|| {
                    TypeError::Unknown {
                        name: name.clone(),
                        arity: args.len(),
                    }
                })?;
                let args = args
                    .iter()
                    .map(|arg| arg.to_ty(catalog, mode))
                    .collect::<Result<Vec<_>, _>>()?;
                match mode {
                    Mode::Closed => Ok(catalog.instantiate(def, args)?),
                    Mode::Open => Ok(Ty::generic(def, args)),
                }
            }
            TypeExpr::Array { elem, rank } => Ok(Ty::array(elem.to_ty(catalog, mode)?, *rank)),
            TypeExpr::Pointer(elem) => Ok(Ty::pointer(elem.to_ty(catalog, mode)?)),
            TypeExpr::ByRef(elem) => Ok(Ty::by_ref(elem.to_ty(catalog, mode)?)),
        }
    }
}

/// Turn a `ty` pair into a [`TypeExpr`]: the atom first, then each suffix
/// wraps what came before.
fn lower(src: &str, pair: Pair<'_, Rule>) -> Result<TypeExpr, ParseError> {
    let mut ty = None;
    for part in pair.into_inner() {
        let span = part.as_span();
        ty = Some(match (part.as_rule(), ty) {
            (Rule::param, None) => {
                let index = part.as_str().trim_start_matches('!').parse().map_err(|_| {
                    let len = span.end() - span.start();
                    ParseError::new(src, "parameter index out of range", (span.start(), len))
                })?;
                TypeExpr::Param(index)
            }
            (Rule::named, None) => {
                let mut inner = part.into_inner();
                let name = SmolStr::from(inner.next().map_or("", |name| name.as_str()));
                let args = match inner.next() {
                    Some(args) => args
                        .into_inner()
                        .map(|arg| lower(src, arg))
                        .collect::<Result<Vec<_>, _>>()?,
                    None => Vec::new(),
                };
                TypeExpr::Named { name, args }
            }
            (Rule::array, Some(elem)) => TypeExpr::Array {
                elem: Box::new(elem),
                rank: 1 + part.into_inner().count() as u32,
            },
            (Rule::pointer, Some(elem)) => TypeExpr::Pointer(Box::new(elem)),
            (Rule::by_ref, Some(elem)) => TypeExpr::ByRef(Box::new(elem)),
            (rule, _) => unreachable!("`{rule:?}` out of place in a type"),
        });
    }
    ty.ok_or_else(|| ParseError::new(src, "expected a type", (0, 0)))
}

#[cfg(test)]
mod tests {
    use catalog_ty::{GenericParam, TypeDef};

    use super::*;

    fn named(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
        TypeExpr::Named {
            name: name.into(),
            args,
        }
    }

    #[test]
    fn parse_forms() {
        assert_eq!(parse("int").unwrap(), named("int", vec![]));
        assert_eq!(
            parse(" Dictionary< string , int[] > ").unwrap(),
            named(
                "Dictionary",
                vec![
                    named("string", vec![]),
                    TypeExpr::Array {
                        elem: Box::new(named("int", vec![])),
                        rank: 1
                    }
                ]
            )
        );
        assert_eq!(
            parse("int[,]*&").unwrap(),
            TypeExpr::ByRef(Box::new(TypeExpr::Pointer(Box::new(TypeExpr::Array {
                elem: Box::new(named("int", vec![])),
                rank: 2,
            }))))
        );
        assert_eq!(
            parse("IList<!0>").unwrap(),
            named("IList", vec![TypeExpr::Param(0)])
        );
        assert_eq!(parse("List`1").unwrap(), named("List`1", vec![]));
    }

    #[track_caller]
    fn error_at(src: &str) -> usize {
        parse(src).unwrap_err().span.offset()
    }

    #[test]
    fn parse_errors() {
        assert_eq!(error_at("List<"), 5);
        assert_eq!(error_at("List<int"), 8);
        assert_eq!(error_at("int["), 4);
        assert!(parse("!x").is_err());
        assert!(parse("int int").is_err());
        assert!(parse("").is_err());
        assert_eq!(
            parse("!99999999999").unwrap_err().reason,
            "parameter index out of range"
        );
    }

    #[test]
    fn lookup_by_arity() {
        let mut catalog = Catalog::new();
        let int = catalog.add(TypeDef::value("int"));
        let list = catalog.add(TypeDef::class("List`1").param(GenericParam::new("T")));

        assert_eq!(find_definition(&catalog, "int", Some(0)), Some(int));
        assert_eq!(find_definition(&catalog, "List", Some(1)), Some(list));
        assert_eq!(find_definition(&catalog, "List", None), Some(list));
        assert_eq!(find_definition(&catalog, "List", Some(2)), None);

        assert_eq!(
            closed_type(&catalog, "List<int[]>").unwrap(),
            Ty::generic(list, [Ty::array(Ty::named(int), 1)])
        );
        assert!(matches!(
            closed_type(&catalog, "List<!0>"),
            Err(TypeError::Open(0))
        ));
        assert_eq!(
            open_type(&catalog, "List<!0>").unwrap(),
            Ty::generic(list, [Ty::Param(0)])
        );
        assert!(matches!(
            closed_type(&catalog, "Map<int>"),
            Err(TypeError::Unknown { arity: 1, .. })
        ));
    }
}
