//! A small catalog modelled on the core of a managed runtime's base library.
//! Used by the tests of this crate and of the resolver.

use crate::{Catalog, DefId, GenericParam, ParamBound, Ty, TypeDef};

pub struct Fixture {
    pub catalog: Catalog,

    pub object: DefId,
    pub value_type: DefId,
    pub array: DefId,
    pub enumerable: DefId,
    pub enumerable_t: DefId,
    pub list_iface_t: DefId,
    pub list_t: DefId,
    pub func_t: DefId,
    pub action_t: DefId,
    pub convertible: DefId,
    pub string: DefId,
    pub int: DefId,
    pub long: DefId,
    pub nullable_t: DefId,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let mut catalog = Catalog::new();

        let object = catalog.add(TypeDef::class("object"));
        let object_ty = Ty::named(object);

        let value_type = catalog.add(TypeDef::class("ValueType").base(object_ty.clone()));
        let enumerable = catalog.add(TypeDef::interface("IEnumerable"));
        let enumerable_t = catalog.add(
            TypeDef::interface("IEnumerable`1")
                .param(GenericParam::new("T").covariant())
                .implements(Ty::named(enumerable)),
        );
        let list_iface_t = catalog.add(
            TypeDef::interface("IList`1")
                .param(GenericParam::new("T"))
                .implements(Ty::generic(enumerable_t, [Ty::Param(0)])),
        );
        let array = catalog.add(
            TypeDef::class("Array")
                .base(object_ty.clone())
                .implements(Ty::named(enumerable)),
        );
        let list_t = catalog.add(
            TypeDef::class("List`1")
                .param(GenericParam::new("T"))
                .base(object_ty.clone())
                .implements(Ty::generic(list_iface_t, [Ty::Param(0)])),
        );
        let func_t = catalog.add(
            TypeDef::interface("Func`1").param(GenericParam::new("TResult").covariant()),
        );
        let action_t = catalog
            .add(TypeDef::interface("Action`1").param(GenericParam::new("T").contravariant()));

        let convertible = catalog.add(TypeDef::interface("IConvertible"));
        let string = catalog.add(
            TypeDef::class("string")
                .base(object_ty.clone())
                .implements(Ty::named(convertible))
                .implements(Ty::named(enumerable)),
        );
        let int = catalog.add(
            TypeDef::value("int")
                .base(Ty::named(value_type))
                .implements(Ty::named(convertible)),
        );
        let long = catalog.add(
            TypeDef::value("long")
                .base(Ty::named(value_type))
                .implements(Ty::named(convertible)),
        );
        let nullable_t = catalog.add(
            TypeDef::value("Nullable`1")
                .param(GenericParam::new("T").bound(ParamBound::ValueType))
                .base(Ty::named(value_type)),
        );

        catalog.set_array_ancestry(
            Some(Ty::named(array)),
            vec![Ty::generic(list_iface_t, [Ty::Param(0)])],
        );

        Self {
            catalog,
            object,
            value_type,
            array,
            enumerable,
            enumerable_t,
            list_iface_t,
            list_t,
            func_t,
            action_t,
            convertible,
            string,
            int,
            long,
            nullable_t,
        }
    }

    pub fn ty(&self, def: DefId) -> Ty {
        Ty::named(def)
    }

    #[track_caller]
    pub fn generic(&self, def: DefId, args: impl IntoIterator<Item = Ty>) -> Ty {
        match self.catalog.instantiate(def, args.into_iter().collect()) {
            Ok(ty) => ty,
            Err(err) => panic!("fixture instantiation failed: {err}"),
        }
    }
}
