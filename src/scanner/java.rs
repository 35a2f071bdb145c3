//! Java language adapter
//!
//! Architecture: Adapter - Translates Java tokens into language-neutral declarations
//! - Declarations are emitted in pre-order source order (a type precedes its members)
//! - Method bodies are reduced to signals, local classes and lambdas are not declarations
//! - Initializer blocks and enum constant bodies report to their type, field initializers to their field
//! - Unknown syntax degrades to fewer facts instead of failing the file

use crate::config::ConductConfig;
use crate::domain::source::{BodyFeature, Declaration, DeclarationKind, Signal, TypeKind, Visibility};
use crate::scanner::lexer::{tokenize, LexError, Token, TokenKind};
use crate::scanner::taxonomy::{ErrorTaxonomy, ResourceTaxonomy};
use crate::scanner::LanguageAdapter;

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "default",
    "synchronized",
    "native",
    "transient",
    "volatile",
    "strictfp",
    "sealed",
];

/// Language conventions the Java adapter classifies against
#[derive(Debug, Clone)]
pub struct JavaConventions {
    pub errors: ErrorTaxonomy,
    pub resources: ResourceTaxonomy,
    pub test_annotations: Vec<String>,
}

impl JavaConventions {
    pub fn from_config(config: &ConductConfig) -> Self {
        Self {
            errors: ErrorTaxonomy::from_config(&config.taxonomy),
            resources: ResourceTaxonomy::from_config(&config.taxonomy),
            test_annotations: config.naming.test_annotations.clone(),
        }
    }

    fn is_test_annotation(&self, annotation: &str) -> bool {
        let simple = annotation.rsplit('.').next().unwrap_or(annotation);
        self.test_annotations.iter().any(|a| a == simple || a == annotation)
    }
}

impl Default for JavaConventions {
    fn default() -> Self {
        Self::from_config(&ConductConfig::default())
    }
}

pub struct JavaAdapter {
    conventions: JavaConventions,
    extensions: Vec<String>,
}

impl JavaAdapter {
    pub fn new(conventions: JavaConventions, extensions: Vec<String>) -> Self {
        Self { conventions, extensions }
    }

    pub fn from_config(config: &ConductConfig) -> Self {
        Self::new(JavaConventions::from_config(config), config.paths.extensions.clone())
    }

    pub fn conventions(&self) -> &JavaConventions {
        &self.conventions
    }
}

impl Default for JavaAdapter {
    fn default() -> Self {
        Self::new(JavaConventions::default(), vec!["java".to_string()])
    }
}

impl LanguageAdapter for JavaAdapter {
    fn name(&self) -> &str {
        "java"
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn extract(&self, source: &str) -> Result<Vec<Declaration>, LexError> {
        let tokens = tokenize(source)?;
        let mut extractor = Extractor {
            tokens: &tokens,
            pos: 0,
            conventions: &self.conventions,
            declarations: Vec::new(),
        };
        extractor.members(None);
        Ok(extractor.declarations)
    }
}

/// How a member header ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    /// `{` consumed
    Body,
    /// `;` consumed
    Semicolon,
    /// `=` consumed
    Initializer,
    /// Enclosing `}` reached, not consumed
    Closed,
    End,
}

/// Annotations and modifiers stripped from a member header
struct Header<'t> {
    annotations: Vec<String>,
    modifiers: Vec<String>,
    rest: Vec<&'t Token>,
}

#[derive(Debug, Clone, Copy)]
struct Container {
    index: usize,
    kind: TypeKind,
}

struct Extractor<'a> {
    tokens: &'a [Token],
    pos: usize,
    conventions: &'a JavaConventions,
    declarations: Vec<Declaration>,
}

impl<'a> Extractor<'a> {
    /// Parse members until the closing brace of the current type body or EOF
    fn members(&mut self, container: Option<Container>) {
        if let Some(container) = container.filter(|c| c.kind == TypeKind::Enum) {
            let mut signals = Vec::new();
            self.scan_initializer(&mut signals);
            self.attach(container.index, signals);
        }

        let tokens = self.tokens;
        let mut documented = false;
        while let Some(tok) = tokens.get(self.pos) {
            if tok.kind == TokenKind::DocComment {
                documented = true;
                self.pos += 1;
            } else if tok.is_punct('}') {
                self.pos += 1;
                if container.is_some() {
                    return;
                }
                documented = false;
            } else if tok.is_punct(';') {
                self.pos += 1;
                documented = false;
            } else {
                self.member(container, documented);
                documented = false;
            }
        }
    }

    fn member(&mut self, container: Option<Container>, documented: bool) {
        let start = self.pos;
        let (raw, terminator) = self.collect_header();
        if self.pos == start {
            // no progress
            self.pos += 1;
            return;
        }

        let header = parse_header(&raw);
        let rest = &header.rest;
        let Some(first) = rest.first() else {
            match (container, terminator) {
                (Some(container), Terminator::Body) => {
                    // static or instance initializer
                    let mut signals = Vec::new();
                    self.scan_body(&mut signals);
                    self.attach(container.index, signals);
                }
                _ => self.finish_unknown(terminator),
            }
            return;
        };

        if first.is_ident("package") || first.is_ident("import") || first.is_ident("module") {
            self.finish_unknown(terminator);
            return;
        }

        if let Some((kind, name)) = type_keyword(rest) {
            self.type_declaration(header, kind, name, terminator, container, documented);
            return;
        }

        let paren = rest.iter().position(|t| t.is_punct('('));
        match (paren, terminator) {
            (Some(paren), Terminator::Body | Terminator::Semicolon) => {
                self.method(header, paren, terminator, container, documented)
            }
            (None, Terminator::Body) => self.compact_constructor(header, container, documented),
            (None, Terminator::Semicolon | Terminator::Initializer) => {
                self.field(header, terminator, container, documented)
            }
            _ => self.finish_unknown(terminator),
        }
    }

    /// Collect header tokens up to `{`, `;` or `=` outside parentheses
    fn collect_header(&mut self) -> (Vec<&'a Token>, Terminator) {
        let tokens = self.tokens;
        let mut header = Vec::new();
        let mut parens = 0usize;

        while let Some(tok) = tokens.get(self.pos) {
            if tok.kind == TokenKind::DocComment {
                self.pos += 1;
                continue;
            }
            if tok.is_punct('(') {
                parens += 1;
            } else if tok.is_punct(')') {
                parens = parens.saturating_sub(1);
            } else if parens == 0 {
                let terminator = if tok.is_punct('{') {
                    Some(Terminator::Body)
                } else if tok.is_punct(';') {
                    Some(Terminator::Semicolon)
                } else if tok.is_punct('=') {
                    Some(Terminator::Initializer)
                } else if tok.is_punct('}') {
                    return (header, Terminator::Closed);
                } else {
                    None
                };
                if let Some(terminator) = terminator {
                    self.pos += 1;
                    return (header, terminator);
                }
            }
            header.push(tok);
            self.pos += 1;
        }

        (header, Terminator::End)
    }

    fn finish_unknown(&mut self, terminator: Terminator) {
        match terminator {
            Terminator::Body => self.skip_block(),
            Terminator::Initializer => self.scan_initializer(&mut Vec::new()),
            _ => {}
        }
    }

    fn push(&mut self, mut decl: Declaration) -> usize {
        let index = self.declarations.len();
        decl.index = index;
        self.declarations.push(decl);
        index
    }

    fn attach(&mut self, index: usize, signals: Vec<Signal>) {
        if let Some(decl) = self.declarations.get_mut(index) {
            decl.signals.extend(signals);
        }
    }

    fn base_declaration(
        &self,
        header: &Header<'_>,
        name: &Token,
        kind: DeclarationKind,
        container: Option<Container>,
        documented: bool,
    ) -> Declaration {
        let mut decl = Declaration::new(self.declarations.len(), name.text.as_str(), kind, name.line);
        decl.visibility = visibility(&header.modifiers, container);
        decl.documented = documented;
        decl.modifiers = header.modifiers.clone();
        decl.annotations = header.annotations.clone();
        decl.container = container.map(|c| c.index);
        decl
    }

    fn type_declaration(
        &mut self,
        header: Header<'_>,
        kind: TypeKind,
        name: &Token,
        terminator: Terminator,
        container: Option<Container>,
        documented: bool,
    ) {
        let mut decl = self.base_declaration(&header, name, DeclarationKind::Class, container, documented);
        decl.type_kind = Some(kind);
        if container.is_some_and(|c| c.kind.members_implicitly_public()) && !decl.has_modifier("static") {
            decl.modifiers.push("static".to_string());
        }
        let index = self.push(decl);

        match terminator {
            Terminator::Body => self.members(Some(Container { index, kind })),
            other => self.finish_unknown(other),
        }
    }

    fn method(
        &mut self,
        header: Header<'_>,
        paren: usize,
        terminator: Terminator,
        container: Option<Container>,
        documented: bool,
    ) {
        let rest = &header.rest;
        let Some(name) = paren.checked_sub(1).and_then(|i| rest.get(i)).filter(|t| t.kind == TokenKind::Ident)
        else {
            self.finish_unknown(terminator);
            return;
        };

        let mut decl = self.base_declaration(&header, name, DeclarationKind::Method, container, documented);
        let mut type_start = 0;
        if rest.first().is_some_and(|t| t.is_punct('<')) {
            type_start = skip_angles(rest, 0);
        }
        let return_type = join_type(&rest[type_start.min(paren - 1)..paren - 1]);
        if !return_type.is_empty() {
            if self.conventions.resources.is_resource(&return_type) {
                decl.signals.push(Signal::new(BodyFeature::ReturnsResource, name.line, return_type.as_str()));
            }
            decl.return_type = Some(return_type);
        }

        for annotation in &header.annotations {
            if self.conventions.is_test_annotation(annotation) {
                decl.signals.push(Signal::new(BodyFeature::TestMarker, name.line, annotation.as_str()));
            }
        }

        let after_params = skip_parens(rest, paren);
        if let Some(throws) = rest[after_params.min(rest.len())..].iter().position(|t| t.is_ident("throws")) {
            let mut i = after_params + throws + 1;
            while let Some((type_name, next)) = qualified_name(rest, i) {
                if self.conventions.errors.is_broad(&type_name) {
                    decl.signals.push(Signal::new(BodyFeature::DeclaresBroadThrows, rest[i].line, type_name));
                }
                i = next;
                match rest.get(i) {
                    Some(t) if t.is_punct(',') => i += 1,
                    _ => break,
                }
            }
        }

        if terminator == Terminator::Body {
            self.scan_body(&mut decl.signals);
        }
        self.push(decl);
    }

    /// `public Point { ... }` inside a record
    fn compact_constructor(&mut self, header: Header<'_>, container: Option<Container>, documented: bool) {
        let record = container.filter(|c| c.kind == TypeKind::Record);
        let record_name = record.and_then(|c| self.declarations.get(c.index)).map(|d| d.name.clone());

        match (header.rest.as_slice(), record_name.as_ref()) {
            ([name], Some(record_name)) if name.text == *record_name => {
                let mut decl = self.base_declaration(&header, name, DeclarationKind::Method, container, documented);
                self.scan_body(&mut decl.signals);
                self.push(decl);
            }
            _ => self.skip_block(),
        }
    }

    fn field(&mut self, header: Header<'_>, terminator: Terminator, container: Option<Container>, documented: bool) {
        let mut signals = Vec::new();
        if terminator == Terminator::Initializer {
            self.scan_initializer(&mut signals);
        }

        let Some(name) = declarator_name(&header.rest) else {
            return;
        };
        let mut decl = self.base_declaration(&header, name, DeclarationKind::Field, container, documented);
        decl.signals = signals;
        if container.is_some_and(|c| c.kind.members_implicitly_public()) {
            for implicit in ["static", "final"] {
                if !decl.has_modifier(implicit) {
                    decl.modifiers.push(implicit.to_string());
                }
            }
        }
        self.push(decl);
    }

    /// Skip to the end of a block whose `{` was consumed
    fn skip_block(&mut self) {
        let tokens = self.tokens;
        let mut depth = 1usize;
        while let Some(tok) = tokens.get(self.pos) {
            self.pos += 1;
            if tok.is_punct('{') {
                depth += 1;
            } else if tok.is_punct('}') {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }

    /// Reduce a block whose `{` was consumed to signals
    fn scan_body(&mut self, signals: &mut Vec<Signal>) {
        self.scan_code(1, signals);
    }

    /// Reduce an initializer expression to signals, through its `;` and
    /// stopping before an enclosing `}`
    fn scan_initializer(&mut self, signals: &mut Vec<Signal>) {
        self.scan_code(0, signals);
    }

    fn scan_code(&mut self, mut depth: usize, signals: &mut Vec<Signal>) {
        let tokens = self.tokens;
        let in_block = depth > 0;
        let mut parens = 0usize;
        // paren depth of an open try-with-resources header
        let mut resource_header: Option<usize> = None;

        while let Some(tok) = tokens.get(self.pos) {
            if depth == 0 && tok.is_punct('}') {
                return;
            }
            self.pos += 1;
            match tok.kind {
                TokenKind::Punct if tok.is_punct('{') => depth += 1,
                TokenKind::Punct if tok.is_punct('}') => {
                    depth -= 1;
                    if depth == 0 && in_block {
                        return;
                    }
                }
                TokenKind::Punct if tok.is_punct(';') && !in_block && depth == 0 && parens == 0 => return,
                TokenKind::Punct if tok.is_punct('(') => parens += 1,
                TokenKind::Punct if tok.is_punct(')') => {
                    if resource_header == Some(parens) {
                        resource_header = None;
                    }
                    parens = parens.saturating_sub(1);
                }
                TokenKind::Ident => match tok.text.as_str() {
                    "try" if tokens.get(self.pos).is_some_and(|t| t.is_punct('(')) => {
                        signals.push(Signal::new(BodyFeature::UsesScopedResource, tok.line, "try"));
                        self.pos += 1;
                        parens += 1;
                        resource_header = Some(parens);
                    }
                    "catch" if tokens.get(self.pos).is_some_and(|t| t.is_punct('(')) => {
                        let end = skip_parens(tokens, self.pos);
                        let params = tokens.get(self.pos + 1..end.saturating_sub(1)).unwrap_or_default();
                        if let Some(broad) = self.broad_catch_type(params) {
                            signals.push(Signal::new(BodyFeature::CatchesBroadThrowable, tok.line, broad));
                        }
                        self.pos = end;
                    }
                    "throw" if tokens.get(self.pos).is_some_and(|t| t.is_ident("new")) => {
                        if let Some((type_name, _)) = qualified_name(tokens, self.pos + 1) {
                            if self.conventions.errors.is_broad(&type_name) {
                                signals.push(Signal::new(BodyFeature::ThrowsBroadThrowable, tok.line, type_name));
                            }
                        }
                    }
                    "new" => {
                        let Some((type_name, next)) = qualified_name(tokens, self.pos) else {
                            continue;
                        };
                        let instantiation = tokens.get(next).is_some_and(|t| t.is_punct('(') || t.is_punct('<'));
                        if !instantiation || !self.conventions.resources.is_resource(&type_name) {
                            continue;
                        }
                        let returned = self.pos >= 2 && tokens[self.pos - 2].is_ident("return");
                        if returned {
                            signals.push(Signal::new(BodyFeature::ReturnsResource, tok.line, type_name));
                        } else if resource_header.is_none() {
                            signals.push(Signal::new(BodyFeature::AcquiresUnscopedResource, tok.line, type_name));
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    /// First broad type named by a catch parameter, `catch (A | B e)`
    fn broad_catch_type(&self, params: &[Token]) -> Option<String> {
        params
            .split(|t| t.is_punct('|'))
            .filter_map(|alternative| {
                let mut i = 0;
                loop {
                    match alternative.get(i) {
                        Some(t) if t.is_ident("final") => i += 1,
                        Some(t) if t.is_punct('@') => {
                            i = qualified_name(alternative, i + 1).map_or(i + 1, |(_, next)| next);
                        }
                        _ => break,
                    }
                }
                qualified_name(alternative, i).map(|(name, _)| name)
            })
            .find(|name| self.conventions.errors.is_broad(name))
    }
}

/// Strip leading annotations and modifiers from a header
fn parse_header<'t>(tokens: &[&'t Token]) -> Header<'t> {
    let mut annotations = Vec::new();
    let mut modifiers = Vec::new();
    let mut i = 0;

    loop {
        match tokens.get(i) {
            Some(t) if t.is_punct('@') && !tokens.get(i + 1).is_some_and(|n| n.is_ident("interface")) => {
                let Some((name, next)) = qualified_name(tokens, i + 1) else {
                    i += 1;
                    continue;
                };
                i = next;
                if tokens.get(i).is_some_and(|t| t.is_punct('(')) {
                    i = skip_parens(tokens, i);
                }
                annotations.push(name);
            }
            Some(t) if t.kind == TokenKind::Ident && MODIFIERS.contains(&t.text.as_str()) => {
                modifiers.push(t.text.clone());
                i += 1;
            }
            Some(t)
                if t.is_ident("non")
                    && tokens.get(i + 1).is_some_and(|t| t.is_punct('-'))
                    && tokens.get(i + 2).is_some_and(|t| t.is_ident("sealed")) =>
            {
                modifiers.push("non-sealed".to_string());
                i += 3;
            }
            _ => break,
        }
    }

    Header { annotations, modifiers, rest: tokens[i.min(tokens.len())..].to_vec() }
}

fn type_keyword<'t>(rest: &[&'t Token]) -> Option<(TypeKind, &'t Token)> {
    let first = rest.first()?;
    let (kind, name) = if first.is_punct('@') && rest.get(1).is_some_and(|t| t.is_ident("interface")) {
        (TypeKind::Annotation, rest.get(2)?)
    } else {
        let kind = match first.text.as_str() {
            "class" => TypeKind::Class,
            "interface" => TypeKind::Interface,
            "enum" => TypeKind::Enum,
            "record" => TypeKind::Record,
            _ => return None,
        };
        if first.kind != TokenKind::Ident {
            return None;
        }
        (kind, rest.get(1)?)
    };

    (name.kind == TokenKind::Ident).then_some((kind, *name))
}

fn visibility(modifiers: &[String], container: Option<Container>) -> Visibility {
    let has = |m: &str| modifiers.iter().any(|x| x == m);
    if has("public") {
        Visibility::Public
    } else if has("protected") {
        Visibility::Protected
    } else if has("private") {
        Visibility::Private
    } else if container.is_some_and(|c| c.kind.members_implicitly_public()) {
        Visibility::Public
    } else {
        Visibility::Package
    }
}

/// Name of the first declarator in a field header
fn declarator_name<'t>(rest: &[&'t Token]) -> Option<&'t Token> {
    let mut angles = 0usize;
    let mut name = None;
    for tok in rest {
        if tok.is_punct('<') {
            angles += 1;
        } else if tok.is_punct('>') {
            angles = angles.saturating_sub(1);
        } else if tok.is_punct(',') && angles == 0 {
            break;
        } else if tok.kind == TokenKind::Ident {
            name = Some(*tok);
        }
    }
    // a lone identifier is a statement fragment, not a typed declarator
    name.filter(|_| rest.len() > 1)
}

/// Render type tokens compactly, e.g. `Map<String, List<Integer>>`
fn join_type(tokens: &[&Token]) -> String {
    let mut out = String::new();
    let mut previous_ident = false;
    for tok in tokens {
        let ident = tok.kind == TokenKind::Ident;
        if ident && previous_ident {
            out.push(' ');
        }
        out.push_str(&tok.text);
        if tok.is_punct(',') {
            out.push(' ');
        }
        previous_ident = ident;
    }
    out
}

/// Dotted name starting at `start`, with the index after it
fn qualified_name<T: std::borrow::Borrow<Token>>(tokens: &[T], start: usize) -> Option<(String, usize)> {
    let first: &Token = tokens.get(start)?.borrow();
    if first.kind != TokenKind::Ident {
        return None;
    }

    let mut name = first.text.clone();
    let mut i = start + 1;
    while let (Some(dot), Some(part)) = (tokens.get(i), tokens.get(i + 1)) {
        let (dot, part): (&Token, &Token) = (dot.borrow(), part.borrow());
        if !dot.is_punct('.') || part.kind != TokenKind::Ident {
            break;
        }
        name.push('.');
        name.push_str(&part.text);
        i += 2;
    }
    Some((name, i))
}

/// Index after the parenthesis matching the one at `open`
fn skip_parens<T: std::borrow::Borrow<Token>>(tokens: &[T], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        let tok: &Token = tok.borrow();
        if tok.is_punct('(') {
            depth += 1;
        } else if tok.is_punct(')') {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return i + 1;
            }
        }
    }
    tokens.len()
}

/// Index after the angle bracket matching the one at `open`
fn skip_angles(tokens: &[&Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.is_punct('<') {
            depth += 1;
        } else if tok.is_punct('>') {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return i + 1;
            }
        }
    }
    tokens.len()
}
