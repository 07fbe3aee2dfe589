use catalog_ty::Ty;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Named type parameters bound during one resolution attempt.
///
/// Entries are only ever added through [`Bindings::with`], which removes the
/// entry again once the scope returns, so nothing survives into a sibling
/// alternative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    map: FxHashMap<SmolStr, Ty>,
}

impl Bindings {
    pub fn get(&self, name: &str) -> Option<&Ty> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Bind `name` to `ty` for the duration of `scope`.
    pub(crate) fn with<R>(&mut self, name: SmolStr, ty: Ty, scope: impl FnOnce(&mut Self) -> R) -> R {
        let shadowed = self.map.insert(name.clone(), ty);
        let out = scope(self);
        match shadowed {
            Some(previous) => {
                self.map.insert(name, previous);
            }
            None => {
                self.map.remove(&name);
            }
        }
        out
    }

    /// Bind for the lifetime of the environment. Used for the arguments of a
    /// closed pattern template, which hold for every attempt of that pattern.
    pub(crate) fn prebind(&mut self, name: SmolStr, ty: Ty) {
        self.map.insert(name, ty);
    }
}
