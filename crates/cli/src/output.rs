use std::fmt;

use catalog_ty::{Catalog, Ty};
use specializer::{Arg, InvokeError};

/// The value every configured producer builds: the closed type it was asked
/// for plus whatever its parameters received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built {
    pub ty: Ty,
    pub args: Vec<BuiltArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltArg {
    Value(Built),
    Default,
    Sequence(Vec<Built>),
}

impl Built {
    /// Record the arguments of one producer call. Sequence parameters are
    /// drained here, so nested failures surface as failures of this call.
    pub fn new(ty: &Ty, args: &[Arg<'_, Built>]) -> Result<Self, InvokeError> {
        let args = args
            .iter()
            .map(|arg| -> Result<BuiltArg, InvokeError> {
                Ok(match arg {
                    Arg::Value(value) => BuiltArg::Value(value.clone()),
                    Arg::Default => BuiltArg::Default,
                    Arg::Sequence(seq) => BuiltArg::Sequence(seq.collect()?),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ty: ty.clone(),
            args,
        })
    }

    pub fn display<'a>(&'a self, catalog: &'a Catalog) -> BuiltDisplay<'a> {
        BuiltDisplay {
            catalog,
            built: self,
        }
    }
}

/// Renders as `Wrapper<int>(Match2<int>, default, [a, b])`.
pub struct BuiltDisplay<'a> {
    catalog: &'a Catalog,
    built: &'a Built,
}

impl fmt::Display for BuiltDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.catalog.display(&self.built.ty))?;
        if self.built.args.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, arg) in self.built.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match arg {
                BuiltArg::Value(value) => write!(f, "{}", value.display(self.catalog))?,
                BuiltArg::Default => f.write_str("default")?,
                BuiltArg::Sequence(values) => {
                    f.write_str("[")?;
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", value.display(self.catalog))?;
                    }
                    f.write_str("]")?;
                }
            }
        }
        f.write_str(")")
    }
}
