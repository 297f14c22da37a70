//! Modelo de datos que atraviesa el protocolo: valores, mensajes y eventos.

pub mod message;
pub mod value;

pub use message::{Event, Message, PropertyScope};
pub use value::Value;
