use std::fmt;

use crate::{Catalog, Ty};

/// Renders a type with the catalog's names, e.g. `List<int[,]>`.
///
/// The generic arity suffix of a definition name (`List`1`) is left out.
pub struct TyDisplay<'a> {
    catalog: &'a Catalog,
    ty: &'a Ty,
}

impl Catalog {
    pub fn display<'a>(&'a self, ty: &'a Ty) -> TyDisplay<'a> {
        TyDisplay { catalog: self, ty }
    }
}

/// A definition name without its trailing "`N".
pub fn base_name(name: &str) -> &str {
    match name.rsplit_once('`') {
        Some((base, arity)) if !arity.is_empty() && arity.bytes().all(|b| b.is_ascii_digit()) => {
            base
        }
        _ => name,
    }
}

impl fmt::Display for TyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Ty::Param(index) => write!(f, "!{index}"),
            Ty::Named { def, args } => {
                f.write_str(base_name(self.catalog.name(*def)))?;
                if args.is_empty() {
                    return Ok(());
                }
                f.write_str("<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.catalog.display(arg))?;
                }
                f.write_str(">")
            }
            Ty::Array { rank, elem } => {
                let commas = ",".repeat(rank.saturating_sub(1) as usize);
                write!(f, "{}[{commas}]", self.catalog.display(elem))
            }
            Ty::Pointer(elem) => write!(f, "{}*", self.catalog.display(elem)),
            Ty::ByRef(elem) => write!(f, "{}&", self.catalog.display(elem)),
        }
    }
}
