//! Firma de una operación: parámetros declarados con su forma ya resuelta.

use crate::model::Value;
use crate::shape::{DeclaredType, Shape, TypeResolver};

/// Cómo se produce el argumento de un parámetro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// Valor coercionado a la forma declarada.
    Standard,
    /// El mensaje completo, sin coerción.
    Message,
    /// Sólo el payload, sin coerción.
    Payload,
    /// Mapa vacío que la operación rellena; se fusiona en el scope outbound.
    OutboundHeaders,
    /// Header(s) inbound con ese nombre (o lista de nombres).
    InboundHeaders(String),
    /// Propiedad(es) de invocación con ese nombre.
    InvocationHeaders(String),
    /// Sub-pipeline o literal.
    Nested,
    /// Lista de sub-pipelines o literales.
    NestedList,
    InterceptCallback,
    SourceCallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub declared: DeclaredType,
    pub shape: Shape,
    pub optional: bool,
    pub default: Option<Value>,
    pub mime_type: Option<String>,
}

impl ParameterSpec {
    fn new(name: &str, kind: ParameterKind, declared: DeclaredType) -> Self {
        Self { name: name.to_string(),
               kind,
               declared,
               shape: Shape::Opaque,
               optional: false,
               default: None,
               mime_type: None }
    }
}

/// Firma completa. Las formas se calculan una sola vez en `build`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationSignature {
    pub name: String,
    pub parameters: Vec<ParameterSpec>,
    pub connection_parameters: Vec<ParameterSpec>,
    pub void: bool,
}

impl OperationSignature {
    pub fn builder(name: &str) -> SignatureBuilder {
        SignatureBuilder { signature: OperationSignature { name: name.to_string(),
                                                           ..Default::default() } }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn has_kind(&self, kind: &ParameterKind) -> bool {
        self.parameters.iter().any(|p| &p.kind == kind)
    }
}

pub struct SignatureBuilder {
    signature: OperationSignature,
}

impl SignatureBuilder {
    fn push(mut self, spec: ParameterSpec) -> Self {
        self.signature.parameters.push(spec);
        self
    }

    fn last(&mut self) -> Option<&mut ParameterSpec> {
        self.signature.parameters.last_mut()
    }

    pub fn param(self, name: &str, declared: DeclaredType) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::Standard, declared))
    }

    /// Parámetro opcional con valor por defecto (previo a la coerción).
    pub fn optional(self, name: &str, declared: DeclaredType, default: Option<Value>) -> Self {
        let mut b = self.param(name, declared);
        if let Some(p) = b.last() {
            p.optional = true;
            p.default = default;
        }
        b
    }

    /// Mime type de la coerción del último parámetro declarado.
    pub fn mime_type(mut self, mime: &str) -> Self {
        if let Some(p) = self.last() {
            p.mime_type = Some(mime.to_string());
        }
        self
    }

    pub fn message(self, name: &str) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::Message, DeclaredType::any()))
    }

    pub fn payload(self, name: &str) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::Payload, DeclaredType::any()))
    }

    pub fn outbound_headers(self, name: &str) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::OutboundHeaders, DeclaredType::mapping(DeclaredType::scalar("String"), DeclaredType::any())))
    }

    pub fn inbound_headers(self, name: &str, header: &str, declared: DeclaredType) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::InboundHeaders(header.to_string()), declared))
    }

    pub fn invocation_headers(self, name: &str, header: &str, declared: DeclaredType) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::InvocationHeaders(header.to_string()), declared))
    }

    pub fn nested(self, name: &str) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::Nested, DeclaredType::scalar("NestedProcessor")))
    }

    pub fn nested_list(self, name: &str) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::NestedList, DeclaredType::sequence(DeclaredType::scalar("NestedProcessor"))))
    }

    pub fn intercept_callback(self, name: &str) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::InterceptCallback, DeclaredType::scalar("InterceptCallback")))
    }

    pub fn source_callback(self, name: &str) -> Self {
        self.push(ParameterSpec::new(name, ParameterKind::SourceCallback, DeclaredType::scalar("SourceCallback")))
    }

    /// Parámetro que forma parte de la `ConnectionKey`.
    pub fn connection_param(mut self, name: &str, declared: DeclaredType) -> Self {
        self.signature.connection_parameters.push(ParameterSpec::new(name, ParameterKind::Standard, declared));
        self
    }

    /// La operación no devuelve resultado (no sobrescribe el payload).
    pub fn void(mut self) -> Self {
        self.signature.void = true;
        self
    }

    pub fn build(mut self, resolver: &TypeResolver) -> OperationSignature {
        for p in self.signature.parameters.iter_mut().chain(self.signature.connection_parameters.iter_mut()) {
            p.shape = resolver.resolve(&p.declared);
        }
        self.signature
    }
}
