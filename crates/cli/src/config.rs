// ==============================================================================
// Catalog Files
// ==============================================================================
//
// A catalog file declares the type universe and the ordered pattern list the
// resolver runs against. Example:
//
// ```toml
// [[types]]
// name = "object"
//
// [[types]]
// name = "IEnumerable"
// kind = "interface"
// params = [{ name = "T", variance = "covariant" }]
//
// [[types]]
// name = "List"
// params = ["T"]
// base = "object"
// interfaces = ["IEnumerable<!0>"]
//
// [arrays]
// base = "object"
// interfaces = ["IEnumerable<!0>"]
//
// [[patterns]]
// template = "Wrapper"
// slots = [{ def = "IEnumerable", args = ["T"], variance = "covariant" }]
// producers = [{ params = [{ specialize = ["T"], direction = "following", default = true }] }]
// ```
//
// Constraints are written as tables (`param`, `def`, `type`, `marker`, `rank`,
// `not`) or as a bare string: `"_"` is the wildcard, anything else names a
// generic parameter of the pattern's template.

use catalog_ty::{Catalog, GenericParam, Marker, ParamBound, Ty, TypeDef, TypeKind, Variance};
use miette::Diagnostic;
use serde::Deserialize;
use smol_str::SmolStr;
use specializer::{
    Arg, Constraint, Directive, FailureCategory, InvokeError, ParamDecl, Pattern, Produced, Producer,
    ResolveError, Resolver, Slot,
};
use thiserror::Error;

use crate::output::Built;
use crate::type_expr::{self, find_definition, TypeError, TypeExpr};

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),

    #[error("type `{0}` is declared twice")]
    DuplicateType(SmolStr),

    #[error("invalid pattern `{template}`")]
    Pattern {
        template: String,
        #[source]
        source: ResolveError,
    },
}

/// Top-level catalog file.
#[derive(Debug, Default, Deserialize)]
pub struct SpecializeConfig {
    #[serde(default)]
    pub types: Vec<TypeConfig>,

    /// Ancestry shared by every array type.
    pub arrays: Option<ArrayConfig>,

    /// Tried in declaration order.
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,

    pub fallback: Option<PatternConfig>,

    /// Producer failure categories that count as "no result". Absent means
    /// `["system"]`.
    pub expected_failures: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindName {
    #[default]
    Class,
    Interface,
    Struct,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceName {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
    Ambivariant,
}

impl From<VarianceName> for Variance {
    fn from(name: VarianceName) -> Self {
        match name {
            VarianceName::Invariant => Variance::Invariant,
            VarianceName::Covariant => Variance::Covariant,
            VarianceName::Contravariant => Variance::Contravariant,
            VarianceName::Ambivariant => Variance::Ambivariant,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeConfig {
    /// Generic definitions get the "`N" arity suffix appended unless the
    /// name already carries one.
    pub name: SmolStr,
    #[serde(default)]
    pub kind: KindName,
    #[serde(default)]
    pub params: Vec<GenericParamConfig>,
    pub base: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
}

impl TypeConfig {
    fn full_name(&self) -> SmolStr {
        if self.params.is_empty() || self.name.contains('`') {
            self.name.clone()
        } else {
            format!("{}`{}", self.name, self.params.len()).into()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GenericParamConfig {
    Name(SmolStr),
    Detailed {
        name: SmolStr,
        #[serde(default)]
        variance: VarianceName,
        /// `"class"`, `"struct"`, or a type the argument must be assignable to.
        #[serde(default)]
        bounds: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArrayConfig {
    pub base: Option<String>,
    /// Apply to single-dimensional arrays; `!0` is the element type.
    #[serde(default)]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerName {
    Array,
    Pointer,
    ByRef,
    Value,
    Reference,
}

impl From<MarkerName> for Marker {
    fn from(name: MarkerName) -> Self {
        match name {
            MarkerName::Array => Marker::Array,
            MarkerName::Pointer => Marker::Pointer,
            MarkerName::ByRef => Marker::ByRef,
            MarkerName::Value => Marker::ValueType,
            MarkerName::Reference => Marker::ReferenceType,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConstraintConfig {
    /// `"_"` or a parameter name.
    Short(SmolStr),
    Param {
        param: SmolStr,
        #[serde(default)]
        variance: VarianceName,
    },
    Definition {
        def: String,
        #[serde(default)]
        args: Vec<ConstraintConfig>,
        #[serde(default)]
        variance: VarianceName,
    },
    Type {
        r#type: String,
        #[serde(default)]
        variance: VarianceName,
    },
    Marker {
        marker: MarkerName,
        #[serde(default)]
        args: Vec<ConstraintConfig>,
        #[serde(default)]
        variance: VarianceName,
    },
    Rank {
        rank: u32,
    },
    Not {
        not: Vec<ConstraintConfig>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SlotConfig {
    Many(Vec<ConstraintConfig>),
    Detailed {
        constraints: Vec<ConstraintConfig>,
        #[serde(default)]
        definitive: bool,
    },
    One(ConstraintConfig),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerKindName {
    #[default]
    Constructor,
    Factory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProducerConfig {
    #[serde(default)]
    pub kind: ProducerKindName,
    #[serde(default)]
    pub definitive: bool,
    #[serde(default)]
    pub params: Vec<ArgConfig>,
    /// Fail every call with this category instead of building a value.
    pub fail: Option<String>,
    /// How many values a factory yields per call.
    #[serde(default = "one")]
    pub yields: usize,
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionName {
    #[default]
    Any,
    Following,
    Preceding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlainArg {
    Optional,
    Required,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgConfig {
    Plain(PlainArg),
    Specialize {
        specialize: Vec<ConstraintConfig>,
        #[serde(default)]
        direction: DirectionName,
        #[serde(default)]
        global: bool,
        #[serde(default)]
        definitive: bool,
        /// Pass the nested results as one lazy sequence.
        #[serde(default)]
        sequence: bool,
        /// Fall back to the parameter default when nothing resolves.
        #[serde(default)]
        default: bool,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternConfig {
    /// A definition name (`List`) or a closed type (`List<int>`).
    pub template: String,
    #[serde(default)]
    pub definitive: bool,
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
    /// Without any, the pattern gets a single parameterless constructor.
    #[serde(default)]
    pub producers: Vec<ProducerConfig>,
}

pub fn load_config(contents: &str) -> Result<SpecializeConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}

// ==============================================================================
// Building
// ==============================================================================

impl SpecializeConfig {
    /// Build the catalog. Definitions are registered first and filled in
    /// afterwards, so bases and bounds may refer to types declared later.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        let mut catalog = Catalog::new();

        let mut ids = Vec::with_capacity(self.types.len());
        for ty in &self.types {
            let name = ty.full_name();
            if catalog.lookup(&name).is_some() {
                return Err(ConfigError::DuplicateType(name));
            }
            let kind = match ty.kind {
                KindName::Class => TypeKind::Class,
                KindName::Interface => TypeKind::Interface,
                KindName::Struct => TypeKind::Struct,
            };
            let mut def = TypeDef::new(name, kind);
            for param in &ty.params {
                def = def.param(match param {
                    GenericParamConfig::Name(name) => GenericParam::new(name.clone()),
                    GenericParamConfig::Detailed { name, variance, .. } => {
                        GenericParam::new(name.clone()).with_variance((*variance).into())
                    }
                });
            }
            ids.push(catalog.add(def));
        }

        for (ty, id) in self.types.iter().zip(ids) {
            let base = ty
                .base
                .as_deref()
                .map(|base| type_expr::open_type(&catalog, base))
                .transpose()?;
            let interfaces = ty
                .interfaces
                .iter()
                .map(|interface| type_expr::open_type(&catalog, interface))
                .collect::<Result<Vec<_>, _>>()?;
            let bounds = ty
                .params
                .iter()
                .map(|param| match param {
                    GenericParamConfig::Name(_) => Ok(Vec::new()),
                    GenericParamConfig::Detailed { bounds, .. } => bounds
                        .iter()
                        .map(|bound| param_bound(&catalog, bound))
                        .collect::<Result<Vec<_>, _>>(),
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;

            let def = catalog.def_mut(id);
            def.base = base;
            def.interfaces = interfaces;
            for (param, bounds) in def.params.iter_mut().zip(bounds) {
                param.bounds = bounds;
            }
        }

        if let Some(arrays) = &self.arrays {
            let base = arrays
                .base
                .as_deref()
                .map(|base| type_expr::open_type(&catalog, base))
                .transpose()?;
            let interfaces = arrays
                .interfaces
                .iter()
                .map(|interface| type_expr::open_type(&catalog, interface))
                .collect::<Result<Vec<_>, _>>()?;
            catalog.set_array_ancestry(base, interfaces);
        }

        Ok(catalog)
    }

    pub fn resolver(&self) -> Result<Resolver<Built>, ConfigError> {
        let catalog = self.catalog()?;

        let patterns = self
            .patterns
            .iter()
            .map(|pattern| -> Result<_, ConfigError> {
                Ok((pattern.template.clone(), pattern.build(&catalog)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let fallback = self
            .fallback
            .as_ref()
            .map(|fallback| -> Result<_, ConfigError> {
                Ok((fallback.template.clone(), fallback.build(&catalog)?))
            })
            .transpose()?;

        let mut resolver = Resolver::new(catalog);
        for (template, pattern) in patterns {
            resolver
                .add_pattern(pattern)
                .map_err(|source| ConfigError::Pattern { template, source })?;
        }
        if let Some((template, fallback)) = fallback {
            resolver
                .set_fallback(Some(fallback))
                .map_err(|source| ConfigError::Pattern { template, source })?;
        }
        if let Some(expected) = &self.expected_failures {
            resolver.set_expected_failures(Some(expected.iter().map(|name| category(name)).collect()));
        }
        Ok(resolver)
    }
}

fn param_bound(catalog: &Catalog, bound: &str) -> Result<ParamBound, ConfigError> {
    Ok(match bound {
        "class" => ParamBound::ReferenceType,
        "struct" => ParamBound::ValueType,
        other => ParamBound::Implements(type_expr::open_type(catalog, other)?),
    })
}

fn category(name: &str) -> FailureCategory {
    match name {
        "system" => FailureCategory::System,
        other => FailureCategory::Custom(other.into()),
    }
}

impl PatternConfig {
    fn build(&self, catalog: &Catalog) -> Result<Pattern<Built>, ConfigError> {
        let expr = type_expr::parse(&self.template).map_err(TypeError::from)?;
        let definition = match &expr {
            TypeExpr::Named { name, args } if args.is_empty() => {
                find_definition(catalog, name, None)
            }
            _ => None,
        };
        let mut pattern = match definition {
            Some(def) => Pattern::definition(def),
            None => Pattern::closed(type_expr::closed_type(catalog, &self.template)?),
        };
        pattern.definitive = self.definitive;

        for slot in &self.slots {
            pattern = pattern.slot(slot.build(catalog)?);
        }

        if self.producers.is_empty() {
            pattern = pattern.producer(Producer::constructor(builder(None)));
        }
        for producer in &self.producers {
            pattern = pattern.producer(producer.build(catalog)?);
        }
        Ok(pattern)
    }
}

impl SlotConfig {
    fn build(&self, catalog: &Catalog) -> Result<Slot, ConfigError> {
        let (constraints, definitive) = match self {
            SlotConfig::Many(constraints) => (constraints.as_slice(), false),
            SlotConfig::Detailed {
                constraints,
                definitive,
            } => (constraints.as_slice(), *definitive),
            SlotConfig::One(constraint) => (std::slice::from_ref(constraint), false),
        };
        let mut slot = Slot::new(build_all(catalog, constraints)?);
        slot.definitive = definitive;
        Ok(slot)
    }
}

fn build_all(catalog: &Catalog, constraints: &[ConstraintConfig]) -> Result<Vec<Constraint>, ConfigError> {
    constraints
        .iter()
        .map(|constraint| constraint.build(catalog))
        .collect()
}

impl ConstraintConfig {
    fn build(&self, catalog: &Catalog) -> Result<Constraint, ConfigError> {
        Ok(match self {
            ConstraintConfig::Short(name) if name == "_" => Constraint::Wildcard,
            ConstraintConfig::Short(name) => Constraint::param(name.clone()),
            ConstraintConfig::Param { param, variance } => {
                Constraint::param_with(param.clone(), (*variance).into())
            }
            ConstraintConfig::Definition {
                def,
                args,
                variance,
            } => {
                let target = find_definition(catalog, def, Some(args.len())).ok_or_else(|| {
                    TypeError::Unknown {
                        name: def.as_str().into(),
                        arity: args.len(),
                    }
                })?;
                Constraint::definition(target, build_all(catalog, args)?)
                    .with_variance((*variance).into())
            }
            ConstraintConfig::Type { r#type, variance } => {
                let ty = type_expr::closed_type(catalog, r#type)?;
                Constraint::from_type(catalog, &ty).with_variance((*variance).into())
            }
            ConstraintConfig::Marker {
                marker,
                args,
                variance,
            } => Constraint::marker(catalog, (*marker).into(), build_all(catalog, args)?)
                .with_variance((*variance).into()),
            ConstraintConfig::Rank { rank } => Constraint::rank(catalog, *rank),
            ConstraintConfig::Not { not } => Constraint::not(build_all(catalog, not)?),
        })
    }
}

/// Builds a [`Built`] value, or fails with `failure` when one is configured.
fn builder(
    failure: Option<FailureCategory>,
) -> impl Fn(&Ty, &[Arg<'_, Built>]) -> Result<Built, InvokeError> + 'static {
    move |ty, args| match &failure {
        Some(category) => Err(InvokeError {
            category: category.clone(),
            message: "configured to fail".into(),
        }),
        None => Built::new(ty, args),
    }
}

impl ProducerConfig {
    fn build(&self, catalog: &Catalog) -> Result<Producer<Built>, ConfigError> {
        let build = builder(self.fail.as_deref().map(category));

        let mut producer = match self.kind {
            ProducerKindName::Constructor => Producer::constructor(build),
            ProducerKindName::Factory => {
                let yields = self.yields;
                Producer::factory(move |ty, args| {
                    let built = build(ty, args)?;
                    Ok(Produced::Many(vec![built; yields]))
                })
            }
        };
        producer.definitive = self.definitive;

        for param in &self.params {
            producer = producer.param(param.build(catalog)?);
        }
        Ok(producer)
    }
}

impl ArgConfig {
    fn build(&self, catalog: &Catalog) -> Result<ParamDecl, ConfigError> {
        Ok(match self {
            ArgConfig::Plain(PlainArg::Optional) => ParamDecl::Optional,
            ArgConfig::Plain(PlainArg::Required) => ParamDecl::Required,
            ArgConfig::Specialize {
                specialize,
                direction,
                global,
                definitive,
                sequence,
                default,
            } => {
                let mut directive = Directive::new(build_all(catalog, specialize)?);
                directive = match direction {
                    DirectionName::Any => directive,
                    DirectionName::Following => directive.following(),
                    DirectionName::Preceding => directive.preceding(),
                };
                directive.global = *global;
                directive.definitive = *definitive;
                if *sequence {
                    directive = directive.sequence();
                }
                ParamDecl::Specialize {
                    directive,
                    has_default: *default,
                }
            }
        })
    }
}
