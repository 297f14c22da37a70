//! `TypeResolver`: clasifica tipos declarados y decide asignabilidad.

use std::sync::Arc;

use super::class::{ClassHierarchy, ClassRef, OBJECT};
use super::declared::{DeclaredType, Shape};

/// Resolver de formas respaldado por la jerarquía de clases del host.
#[derive(Debug, Clone)]
pub struct TypeResolver {
    hierarchy: Arc<ClassHierarchy>,
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new(Arc::new(ClassHierarchy::with_builtins()))
    }
}

impl TypeResolver {
    pub fn new(hierarchy: Arc<ClassHierarchy>) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &Arc<ClassHierarchy> {
        &self.hierarchy
    }

    /// Clasifica `declared` en una `Shape`.
    ///
    /// - Erasure tipo lista ⇒ `Sequence` con el primer argumento (u `Opaque`).
    /// - Erasure tipo mapa ⇒ `Mapping` con los dos primeros argumentos.
    /// - Wildcard ⇒ forma de su primera cota superior, u `Opaque`.
    /// - Cualquier otra cosa ⇒ `Scalar(clase)`.
    pub fn resolve(&self, declared: &DeclaredType) -> Shape {
        match declared {
            DeclaredType::Sequence(element) => Shape::Sequence(Box::new(self.resolve(element))),
            DeclaredType::Mapping(key, value) => Shape::Mapping(Box::new(self.resolve(key)), Box::new(self.resolve(value))),
            DeclaredType::Scalar(class) => self.resolve_class(class, &[]),
            DeclaredType::Parameterized { raw, args } => self.resolve_class(raw, args),
            DeclaredType::Wildcard(bounds) => bounds.first().map(|b| self.resolve(b)).unwrap_or(Shape::Opaque),
        }
    }

    fn resolve_class(&self, class: &ClassRef, args: &[DeclaredType]) -> Shape {
        let arg = |i: usize| args.get(i).map(|a| self.resolve(a)).unwrap_or(Shape::Opaque);
        if class.name() == OBJECT {
            Shape::Opaque
        } else if self.hierarchy.is_list_class(class) {
            Shape::Sequence(Box::new(arg(0)))
        } else if self.hierarchy.is_map_class(class) {
            Shape::Mapping(Box::new(arg(0)), Box::new(arg(1)))
        } else {
            Shape::Scalar(class.clone())
        }
    }

    /// ¿Un valor de clase `runtime` satisface `shape` sin transformación?
    ///
    /// Un primitivo declarado acepta su clase boxed (y viceversa) antes de
    /// delegar en el subtipado de la jerarquía.
    pub fn is_assignable(&self, shape: &Shape, runtime: &ClassRef) -> bool {
        match shape {
            Shape::Opaque => true,
            Shape::Sequence(_) => self.hierarchy.is_list_class(runtime),
            Shape::Mapping(_, _) => self.hierarchy.is_map_class(runtime),
            Shape::Scalar(expected) => {
                if self.hierarchy.boxed_of(expected) == Some(runtime) || self.hierarchy.boxed_of(runtime) == Some(expected) {
                    return true;
                }
                self.hierarchy.is_subclass(runtime, expected)
            }
        }
    }

    /// Variante sobre el tipo declarado (resuelve primero).
    pub fn is_assignable_declared(&self, declared: &DeclaredType, runtime: &ClassRef) -> bool {
        self.is_assignable(&self.resolve(declared), runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::class::{ARRAY_LIST, HASH_MAP, STRING};

    fn resolver() -> TypeResolver {
        TypeResolver::default()
    }

    #[test]
    fn parameterized_list_carries_first_argument() {
        let shape = resolver().resolve(&DeclaredType::parameterized(ARRAY_LIST, vec![DeclaredType::scalar(STRING)]));
        assert_eq!(shape, Shape::Sequence(Box::new(Shape::Scalar(ClassRef::new(STRING)))));
    }

    #[test]
    fn raw_map_class_is_opaque_mapping() {
        let shape = resolver().resolve(&DeclaredType::scalar(HASH_MAP));
        assert_eq!(shape, Shape::Mapping(Box::new(Shape::Opaque), Box::new(Shape::Opaque)));
    }

    #[test]
    fn wildcard_uses_first_bound_or_opaque() {
        let r = resolver();
        let bounded = DeclaredType::Wildcard(vec![DeclaredType::sequence(DeclaredType::scalar("int")), DeclaredType::scalar(STRING)]);
        assert_eq!(r.resolve(&bounded), Shape::Sequence(Box::new(Shape::Scalar(ClassRef::new("int")))));
        assert_eq!(r.resolve(&DeclaredType::any()), Shape::Opaque);
    }

    #[test]
    fn primitive_accepts_boxed_value() {
        let r = resolver();
        assert!(r.is_assignable_declared(&DeclaredType::scalar("int"), &ClassRef::new("Integer")));
        assert!(r.is_assignable_declared(&DeclaredType::scalar("Long"), &ClassRef::new("long")));
        assert!(!r.is_assignable_declared(&DeclaredType::scalar("int"), &ClassRef::new("Long")));
    }

    #[test]
    fn subtype_check_walks_hierarchy() {
        let r = resolver();
        assert!(r.is_assignable_declared(&DeclaredType::scalar("CharSequence"), &ClassRef::new(STRING)));
        assert!(r.is_assignable_declared(&DeclaredType::sequence(DeclaredType::any()), &ClassRef::new(ARRAY_LIST)));
        assert!(!r.is_assignable_declared(&DeclaredType::scalar(STRING), &ClassRef::new(ARRAY_LIST)));
    }
}
