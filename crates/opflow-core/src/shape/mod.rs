//! Resolución de formas de tipos declarados.
//!
//! Un parámetro de operación declara su tipo esperado (`DeclaredType`). Antes
//! de coercionar valores lo clasificamos una sola vez en una `Shape` cerrada
//! (`Scalar | Sequence | Mapping | Opaque`) consultando la jerarquía de clases
//! del host (`ClassHierarchy`). El motor de coerción trabaja sólo sobre
//! `Shape`.

pub mod class;
pub mod declared;
pub mod resolver;

pub use class::{ClassHierarchy, ClassRef};
pub use declared::{DeclaredType, Shape};
pub use resolver::TypeResolver;
