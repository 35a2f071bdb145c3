//! Structural facts extracted from source files
//!
//! Architecture: Value Objects - Source units and declarations are read-only once scanned
//! - A SourceUnit owns its declarations in source order
//! - Declarations carry the fact set rules are evaluated against
//! - Nothing here knows which language produced the facts

use crate::domain::violations::DeclarationRef;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Lexicographic order of the rendered paths, so `a-b.java` sorts before `a/Z.java`
pub fn compare_paths(a: &Path, b: &Path) -> Ordering {
    a.to_string_lossy().cmp(&b.to_string_lossy())
}

/// A scanned source artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path the unit was read from
    pub path: PathBuf,
    /// Name of the language adapter that produced the facts
    pub language: String,
    /// Declarations in pre-order source order
    pub declarations: Vec<Declaration>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, language: impl Into<String>, declarations: Vec<Declaration>) -> Self {
        Self { path: path.into(), language: language.into(), declarations }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declaration at a given position
    pub fn declaration(&self, index: usize) -> Option<&Declaration> {
        self.declarations.get(index)
    }

    /// Enclosing type declaration, if any
    pub fn container_of(&self, declaration: &Declaration) -> Option<&Declaration> {
        declaration.container.and_then(|index| self.declaration(index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Class,
    Method,
    Field,
}

impl DeclarationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Method => "method",
            Self::Field => "field",
        }
    }
}

/// Flavour of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Record => "record",
            Self::Annotation => "annotation",
        }
    }

    /// Whether members of this type are public unless stated otherwise
    pub fn members_implicitly_public(self) -> bool {
        matches!(self, Self::Interface | Self::Annotation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    /// No access modifier
    Package,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Package => "package",
            Self::Private => "private",
        }
    }
}

/// Structural signals extracted from a declaration and its body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFeature {
    /// A catch clause names the root or another broad error type
    CatchesBroadThrowable,
    /// A broad error type is instantiated in a throw statement
    ThrowsBroadThrowable,
    /// The signature declares a broad error type
    DeclaresBroadThrows,
    /// Scoped acquisition with guaranteed release is used
    UsesScopedResource,
    /// A resource is acquired outside a scoped acquisition
    AcquiresUnscopedResource,
    /// The declaration hands a resource to its caller
    ReturnsResource,
    /// The declaration is marked as a test
    TestMarker,
}

/// One occurrence of a body feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub feature: BodyFeature,
    pub line: u32,
    /// Type or construct that triggered the signal
    pub detail: String,
}

impl Signal {
    pub fn new(feature: BodyFeature, line: u32, detail: impl Into<String>) -> Self {
        Self { feature, line, detail: detail.into() }
    }
}

/// A class, method or field extracted from a source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Position within the owning unit
    pub index: usize,
    pub name: String,
    pub kind: DeclarationKind,
    pub visibility: Visibility,
    /// Literal presence of a documentation comment
    pub documented: bool,
    /// Line of the declared name
    pub line: u32,
    pub modifiers: Vec<String>,
    /// Annotation names without the leading `@`
    pub annotations: Vec<String>,
    /// Declared return type for methods; `None` for constructors
    pub return_type: Option<String>,
    /// Type kind when this declaration is itself a type
    pub type_kind: Option<TypeKind>,
    /// Index of the enclosing type declaration
    pub container: Option<usize>,
    pub signals: Vec<Signal>,
}

impl Declaration {
    pub fn new(index: usize, name: impl Into<String>, kind: DeclarationKind, line: u32) -> Self {
        Self {
            index,
            name: name.into(),
            kind,
            visibility: Visibility::Package,
            documented: false,
            line,
            modifiers: Vec::new(),
            annotations: Vec::new(),
            return_type: None,
            type_kind: None,
            container: None,
            signals: Vec::new(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// Whether an annotation is present, by simple or qualified name
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations
            .iter()
            .any(|a| a == name || a.rsplit('.').next() == Some(name))
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == DeclarationKind::Method && self.return_type.is_none()
    }

    pub fn has_feature(&self, feature: BodyFeature) -> bool {
        self.signals.iter().any(|s| s.feature == feature)
    }

    /// All signals of one feature, in source order
    pub fn signals_of(&self, feature: BodyFeature) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(move |s| s.feature == feature)
    }

    pub fn to_ref(&self) -> DeclarationRef {
        DeclarationRef { index: self.index, name: self.name.clone(), kind: self.kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_queries() {
        let mut decl = Declaration::new(2, "close", DeclarationKind::Method, 10);
        decl.annotations.push("org.junit.jupiter.api.Test".to_string());
        decl.modifiers.push("static".to_string());
        decl.signals.push(Signal::new(BodyFeature::CatchesBroadThrowable, 12, "Exception"));
        decl.signals.push(Signal::new(BodyFeature::CatchesBroadThrowable, 15, "Throwable"));

        assert!(decl.has_annotation("Test"));
        assert!(decl.has_modifier("static"));
        assert!(decl.is_constructor());
        assert!(!decl.is_public());
        assert_eq!(decl.signals_of(BodyFeature::CatchesBroadThrowable).count(), 2);
        assert!(!decl.has_feature(BodyFeature::UsesScopedResource));

        let r = decl.to_ref();
        assert_eq!((r.index, r.name.as_str()), (2, "close"));
    }

    #[test]
    fn test_container_lookup() {
        let mut class = Declaration::new(0, "Api", DeclarationKind::Class, 1);
        class.type_kind = Some(TypeKind::Interface);
        let mut method = Declaration::new(1, "call", DeclarationKind::Method, 2);
        method.container = Some(0);

        let unit = SourceUnit::new("Api.java", "java", vec![class, method]);
        let container = unit.container_of(&unit.declarations[1]).unwrap();
        assert_eq!(container.name, "Api");
        assert!(container.type_kind.unwrap().members_implicitly_public());
    }
}
