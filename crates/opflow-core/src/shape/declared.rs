//! Tipos declarados por un parámetro y su forma resuelta.

use serde::{Deserialize, Serialize};

use super::class::{ClassRef, LIST, MAP, OBJECT};

/// Descripción estructural del tipo esperado de un parámetro, tal y como la
/// expone el sistema de tipos del host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaredType {
    /// Clase simple (puede ser una clase lista/mapa "raw", sin argumentos).
    Scalar(ClassRef),
    /// `List<T>`.
    Sequence(Box<DeclaredType>),
    /// `Map<K, V>`.
    Mapping(Box<DeclaredType>, Box<DeclaredType>),
    /// Clase genérica arbitraria con sus argumentos reificados
    /// (`ArrayList<String>`, `Holder<T>`...).
    Parameterized { raw: ClassRef, args: Vec<DeclaredType> },
    /// `? extends A & B`. Sin cotas equivale a "cualquier objeto".
    Wildcard(Vec<DeclaredType>),
}

impl DeclaredType {
    pub fn scalar(class: &str) -> Self {
        DeclaredType::Scalar(ClassRef::new(class))
    }

    pub fn sequence(element: DeclaredType) -> Self {
        DeclaredType::Sequence(Box::new(element))
    }

    pub fn mapping(key: DeclaredType, value: DeclaredType) -> Self {
        DeclaredType::Mapping(Box::new(key), Box::new(value))
    }

    pub fn parameterized(raw: &str, args: Vec<DeclaredType>) -> Self {
        DeclaredType::Parameterized { raw: ClassRef::new(raw),
                                      args }
    }

    pub fn wildcard(bound: DeclaredType) -> Self {
        DeclaredType::Wildcard(vec![bound])
    }

    pub fn any() -> Self {
        DeclaredType::Wildcard(vec![])
    }

    /// Clase "borrada" del tipo (sin argumentos genéricos).
    pub fn erasure(&self) -> ClassRef {
        match self {
            DeclaredType::Scalar(c) => c.clone(),
            DeclaredType::Sequence(_) => ClassRef::new(LIST),
            DeclaredType::Mapping(_, _) => ClassRef::new(MAP),
            DeclaredType::Parameterized { raw, .. } => raw.clone(),
            DeclaredType::Wildcard(bounds) => bounds.first().map(|b| b.erasure()).unwrap_or_else(ClassRef::object),
        }
    }
}

/// Forma cerrada de un tipo declarado. Se calcula una vez por parámetro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Scalar(ClassRef),
    Sequence(Box<Shape>),
    Mapping(Box<Shape>, Box<Shape>),
    /// Sin información de tipo: acepta cualquier valor.
    Opaque,
}

impl Shape {
    /// Clase destino usada al buscar transformers.
    pub fn target_class(&self) -> ClassRef {
        match self {
            Shape::Scalar(c) => c.clone(),
            Shape::Sequence(_) => ClassRef::new(LIST),
            Shape::Mapping(_, _) => ClassRef::new(MAP),
            Shape::Opaque => ClassRef::new(OBJECT),
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Shape::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Shape::Mapping(_, _))
    }
}
