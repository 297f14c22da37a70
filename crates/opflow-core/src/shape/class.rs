//! Referencias a clases del host y su jerarquía.
//!
//! El host describe sus clases con superclase, interfaces y, para
//! primitivos, la clase boxed equivalente. Las consultas "¿es tipo lista?" y
//! "¿es tipo mapa?" recorren esta jerarquía.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

pub const OBJECT: &str = "Object";
pub const STRING: &str = "String";
pub const COLLECTION: &str = "Collection";
pub const LIST: &str = "List";
pub const ARRAY_LIST: &str = "ArrayList";
pub const MAP: &str = "Map";
pub const HASH_MAP: &str = "HashMap";

/// (primitivo, boxed)
const PRIMITIVES: &[(&str, &str)] = &[("int", "Integer"), ("long", "Long"), ("double", "Double"), ("boolean", "Boolean")];

/// Nombre de una clase del host. La igualdad es por nombre.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassRef(String);

impl ClassRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn object() -> Self {
        Self::new(OBJECT)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Default)]
struct ClassInfo {
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    boxed: Option<ClassRef>,
}

/// Jerarquía de clases conocida por el host.
///
/// Clases no declaradas se tratan como hojas sin ancestros (salvo `Object`,
/// del que todo desciende).
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    classes: HashMap<ClassRef, ClassInfo>,
}

impl ClassHierarchy {
    /// Jerarquía vacía (sin builtins).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Jerarquía con las clases builtin: `Object`, `String`, primitivos y sus
    /// boxed, `Collection`/`List`/`ArrayList`, `Map`/`HashMap`.
    pub fn with_builtins() -> Self {
        let mut h = Self::empty();
        h.define_interface(COLLECTION, &[]);
        h.define_interface(LIST, &[COLLECTION]);
        h.define_interface(MAP, &[]);
        h.define_interface("CharSequence", &[]);
        h.define(OBJECT, None, &[]);
        h.define(STRING, Some(OBJECT), &["CharSequence"]);
        h.define("Number", Some(OBJECT), &[]);
        h.define(ARRAY_LIST, Some(OBJECT), &[LIST]);
        h.define(HASH_MAP, Some(OBJECT), &[MAP]);
        for (primitive, boxed) in PRIMITIVES {
            let parent = if *boxed == "Boolean" { OBJECT } else { "Number" };
            h.define(boxed, Some(parent), &[]);
            h.define_primitive(primitive, boxed);
        }
        h
    }

    /// Declara (o redefine) una clase con su superclase e interfaces.
    pub fn define(&mut self, class: &str, superclass: Option<&str>, interfaces: &[&str]) -> &mut Self {
        let info = self.classes.entry(ClassRef::new(class)).or_default();
        info.superclass = superclass.map(ClassRef::new);
        info.interfaces = interfaces.iter().map(|i| ClassRef::new(*i)).collect();
        self
    }

    /// Declara una interfaz (sin superclase) que extiende otras interfaces.
    pub fn define_interface(&mut self, interface: &str, extends: &[&str]) -> &mut Self {
        self.define(interface, None, extends)
    }

    /// Declara un primitivo y su clase boxed equivalente.
    pub fn define_primitive(&mut self, primitive: &str, boxed: &str) -> &mut Self {
        let info = self.classes.entry(ClassRef::new(primitive)).or_default();
        info.boxed = Some(ClassRef::new(boxed));
        self
    }

    pub fn is_defined(&self, class: &ClassRef) -> bool {
        self.classes.contains_key(class)
    }

    /// Clase boxed de un primitivo, si `class` es primitivo.
    pub fn boxed_of(&self, class: &ClassRef) -> Option<&ClassRef> {
        self.classes.get(class).and_then(|i| i.boxed.as_ref())
    }

    fn superclass_of(&self, class: &ClassRef) -> Option<&ClassRef> {
        self.classes.get(class).and_then(|i| i.superclass.as_ref())
    }

    fn interfaces_of(&self, class: &ClassRef) -> &[ClassRef] {
        self.classes.get(class).map(|i| i.interfaces.as_slice()).unwrap_or(&[])
    }

    /// Todas las superclases e interfaces de `class` (incluida ella misma).
    ///
    /// Recorre superclases primero y, en cada nivel, cada interfaz
    /// recursivamente. Corta en cuanto encuentra una clase ya visitada, por lo
    /// que termina aunque la jerarquía declarada tenga ciclos.
    pub fn compute_hierarchy(&self, class: &ClassRef) -> IndexSet<ClassRef> {
        let mut classes = IndexSet::new();
        self.collect_hierarchy(class, &mut classes);
        classes
    }

    fn collect_hierarchy(&self, class: &ClassRef, classes: &mut IndexSet<ClassRef>) {
        let mut current = Some(class);
        while let Some(c) = current {
            if !classes.insert(c.clone()) {
                return;
            }
            for interface in self.interfaces_of(c) {
                self.collect_hierarchy(interface, classes);
            }
            current = self.superclass_of(c);
        }
    }

    /// Subtipado nativo: `class` es `ancestor` o desciende de él.
    pub fn is_subclass(&self, class: &ClassRef, ancestor: &ClassRef) -> bool {
        ancestor.name() == OBJECT || class == ancestor || self.compute_hierarchy(class).contains(ancestor)
    }

    pub fn is_list_class(&self, class: &ClassRef) -> bool {
        self.compute_hierarchy(class).contains(&ClassRef::new(LIST))
    }

    pub fn is_map_class(&self, class: &ClassRef) -> bool {
        self.compute_hierarchy(class).contains(&ClassRef::new(MAP))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_list_is_list_and_collection() {
        let h = ClassHierarchy::with_builtins();
        let hierarchy = h.compute_hierarchy(&ClassRef::new(ARRAY_LIST));
        let names: Vec<&str> = hierarchy.iter().map(|c| c.name()).collect();
        // la clase, sus interfaces (recursivo) y luego la superclase
        assert_eq!(names, vec![ARRAY_LIST, LIST, COLLECTION, OBJECT]);
        assert!(h.is_list_class(&ClassRef::new(ARRAY_LIST)));
        assert!(!h.is_map_class(&ClassRef::new(ARRAY_LIST)));
    }

    #[test]
    fn cyclic_hierarchy_terminates() {
        let mut h = ClassHierarchy::empty();
        h.define("A", Some("B"), &["I"]);
        h.define("B", Some("A"), &[]);
        h.define_interface("I", &["J"]);
        h.define_interface("J", &["I"]);
        let all = h.compute_hierarchy(&ClassRef::new("A"));
        assert_eq!(all.len(), 4);
        assert!(!h.is_list_class(&ClassRef::new("A")));
    }

    #[test]
    fn diamond_interfaces_visited_once() {
        let mut h = ClassHierarchy::with_builtins();
        h.define_interface("SortedList", &[LIST]);
        h.define("TreeList", Some(ARRAY_LIST), &["SortedList", LIST]);
        let all = h.compute_hierarchy(&ClassRef::new("TreeList"));
        let lists = all.iter().filter(|c| c.name() == LIST).count();
        assert_eq!(lists, 1);
        assert!(h.is_list_class(&ClassRef::new("TreeList")));
    }

    #[test]
    fn unknown_class_only_descends_from_object() {
        let h = ClassHierarchy::with_builtins();
        let widget = ClassRef::new("Widget");
        assert!(h.is_subclass(&widget, &ClassRef::object()));
        assert!(!h.is_subclass(&widget, &ClassRef::new(STRING)));
        assert_eq!(h.compute_hierarchy(&widget).len(), 1);
    }

    #[test]
    fn primitive_knows_its_boxed_class() {
        let h = ClassHierarchy::with_builtins();
        assert_eq!(h.boxed_of(&ClassRef::new("int")), Some(&ClassRef::new("Integer")));
        assert_eq!(h.boxed_of(&ClassRef::new("Integer")), None);
        assert!(h.is_subclass(&ClassRef::new("Integer"), &ClassRef::new("Number")));
    }
}
