//! Closed syntax model lowered from the tree-sitter PHP tree.
//!
//! The rewrite passes only care about four kinds of node: namespace
//! declarations, `use` imports, plain string literals and qualified names.
//! Everything else is lowered to [`SyntaxNode::Other`], which keeps only the
//! interesting descendants in document order. Lowering of `Other` subtrees is
//! iterative, so deeply nested expressions cannot exhaust the stack.

use std::ops::Range;

use tree_sitter::Node;

use crate::core::namespace::{is_label, SEPARATOR};

/// Stand-in for a decoded escape such as `\n` that can never be part of a name.
const ESCAPED: char = '\0';

/// Leading keyword of a name relative to the current namespace.
const RELATIVE_MARKER: &str = "namespace\\";

/// Node kinds that can hold an imported name inside a use clause.
const NAME_KINDS: &[&str] = &["qualified_name", "namespace_name", "name", "relative_name"];

/// Node kinds of the individual clauses of a use declaration.
const CLAUSE_KINDS: &[&str] = &["namespace_use_clause", "namespace_use_group_clause"];

/// Children of an encapsed string that are plain text rather than interpolation.
const STRING_PARTS: &[&str] = &["string_content", "string_value", "string", "escape_sequence"];

/// A lowered PHP file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyntaxTree {
    /// Top-level nodes in document order
    pub nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// Every namespace declared in the file, in source form without
    /// surrounding separators.
    pub fn declared_namespaces(&self) -> Vec<String> {
        let mut found = Vec::new();
        let mut pending: Vec<&SyntaxNode> = self.nodes.iter().rev().collect();

        while let Some(node) = pending.pop() {
            match node {
                SyntaxNode::NamespaceDecl(decl) => {
                    if let Some(name) = &decl.name {
                        found.push(name.segments.join("\\"));
                    }
                    if let Some(body) = &decl.body {
                        pending.extend(body.iter().rev());
                    }
                }
                SyntaxNode::Other(children) => pending.extend(children.iter().rev()),
                SyntaxNode::Import(_)
                | SyntaxNode::StringLiteral(_)
                | SyntaxNode::QualifiedReference(_) => {}
            }
        }

        found
    }
}

/// The node kinds the rewrite passes distinguish.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    /// `namespace Foo;` or `namespace Foo { ... }`
    NamespaceDecl(NamespaceDecl),
    /// `use`, `use function`, `use const`, including group imports
    Import(ImportDecl),
    /// A single- or double-quoted string without interpolation
    StringLiteral(StringLiteral),
    /// A name with at least one separator (`A\B`, `\A\B`, `namespace\A`)
    QualifiedReference(NameRef),
    /// Any other node, reduced to its interesting descendants
    Other(Vec<SyntaxNode>),
}

/// A namespace declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    /// Declared name, `None` for `namespace { ... }`
    pub name: Option<NameRef>,
    /// Statements of a braced declaration
    pub body: Option<Vec<SyntaxNode>>,
}

/// A use declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    /// Shared prefix of a group import (`A\B` in `use A\B\{C, D}`)
    pub group_prefix: Option<NameRef>,
    /// Imported names
    pub clauses: Vec<ImportClause>,
}

/// One imported name and its optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportClause {
    /// Imported name
    pub name: NameRef,
    /// Name bound by `as`
    pub alias: Option<String>,
}

/// A name as written in the source, with its byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    /// Byte span of the name, including a leading separator
    pub span: Range<usize>,
    /// Source text of `span`
    pub text: String,
    /// Written with a leading separator
    pub fully_qualified: bool,
    /// Written relative to the current namespace (`namespace\A`)
    pub relative: bool,
    /// The segments after any leading separator or `namespace\`
    pub segments: Vec<String>,
}

impl NameRef {
    /// Parse a name from its source text. Returns `None` if the text is not a
    /// well-formed PHP name.
    pub fn parse(text: &str, span: Range<usize>) -> Option<Self> {
        let mut rest = text;
        let fully_qualified = rest.starts_with(SEPARATOR);
        if fully_qualified {
            rest = &rest[1..];
        }

        let relative = !fully_qualified
            && rest
                .get(..RELATIVE_MARKER.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(RELATIVE_MARKER));
        if relative {
            rest = &rest[RELATIVE_MARKER.len()..];
        }

        let segments: Vec<String> = rest.split(SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(|segment| !is_label(segment)) {
            return None;
        }

        Some(Self {
            span,
            text: text.to_string(),
            fully_qualified,
            relative,
            segments,
        })
    }

    /// True when the name has more than one segment.
    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1
    }

    /// Leading segment, the one an alias would bind.
    pub fn first_segment(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    /// Every segment but the last.
    pub fn namespace_part(&self) -> &[String] {
        &self.segments[..self.segments.len().saturating_sub(1)]
    }

    /// The final segment (class, function or constant name).
    pub fn last_segment(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

/// Quoting style of a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `'...'`
    Single,
    /// `"..."` without interpolation
    Double,
}

impl QuoteStyle {
    fn quote(self) -> char {
        match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }
}

/// A string literal with its decoded value.
///
/// Each decoded character remembers the byte offset where its raw
/// representation starts, so text can be inserted before any character
/// without re-encoding the rest of the literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Byte span of the whole literal including quotes
    pub span: Range<usize>,
    /// Quote character used
    pub style: QuoteStyle,
    decoded: Vec<(char, usize)>,
    content_end: usize,
    escaped_separators: bool,
}

impl StringLiteral {
    /// Decode a literal from its source text starting at byte `start`.
    ///
    /// Returns `None` for anything that is not a complete quoted string.
    pub fn from_source(raw: &str, start: usize) -> Option<Self> {
        let binary = usize::from(raw.starts_with(|c: char| c == 'b' || c == 'B'));
        let quoted = &raw[binary..];
        let style = match quoted.chars().next()? {
            '\'' => QuoteStyle::Single,
            '"' => QuoteStyle::Double,
            _ => return None,
        };
        if quoted.len() < 2 || !quoted.ends_with(style.quote()) {
            return None;
        }

        let content = &quoted[1..quoted.len() - 1];
        let content_start = start + binary + 1;

        Some(Self {
            span: start..start + raw.len(),
            style,
            decoded: decode(content, style, content_start),
            content_end: content_start + content.len(),
            escaped_separators: content.contains("\\\\"),
        })
    }

    /// The runtime value of the literal. Escapes that cannot occur in a name
    /// decode to a NUL placeholder.
    pub fn value(&self) -> String {
        self.decoded.iter().map(|(c, _)| *c).collect()
    }

    /// Byte offset just past any leading separators of the value.
    pub fn insertion_offset(&self) -> usize {
        self.decoded
            .iter()
            .find(|(c, _)| *c != SEPARATOR)
            .map(|(_, offset)| *offset)
            .unwrap_or(self.content_end)
    }

    /// Encode `namespace` followed by a separator for this literal.
    pub fn encode_namespace_prefix(&self, namespace: &str) -> String {
        let separator = match (self.style, self.escaped_separators) {
            (QuoteStyle::Double, _) | (QuoteStyle::Single, true) => "\\\\",
            (QuoteStyle::Single, false) => "\\",
        };
        let mut encoded = namespace.split(SEPARATOR).collect::<Vec<_>>().join(separator);
        encoded.push_str(separator);
        encoded
    }
}

/// Decode the content of a literal, pairing each character with the
/// absolute offset of its raw form.
fn decode(content: &str, style: QuoteStyle, base: usize) -> Vec<(char, usize)> {
    let bytes = content.as_bytes();
    let mut decoded = Vec::with_capacity(content.len());
    let mut i = 0;

    while i < content.len() {
        let Some(c) = content[i..].chars().next() else {
            break;
        };
        if c != '\\' || i + 1 >= content.len() {
            decoded.push((c, base + i));
            i += c.len_utf8();
            continue;
        }

        let next = bytes[i + 1];
        let consumed = match (style, next) {
            (_, b'\\') | (QuoteStyle::Single, b'\'') | (QuoteStyle::Double, b'"' | b'$') => {
                decoded.push((char::from(next), base + i));
                2
            }
            (QuoteStyle::Double, b'n' | b't' | b'r' | b'v' | b'e' | b'f') => {
                decoded.push((ESCAPED, base + i));
                2
            }
            (QuoteStyle::Double, b'0'..=b'7') => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take(3)
                    .take_while(|b| (b'0'..=b'7').contains(b))
                    .count();
                decoded.push((ESCAPED, base + i));
                1 + digits
            }
            (QuoteStyle::Double, b'x')
                if bytes.get(i + 2).is_some_and(|b| b.is_ascii_hexdigit()) =>
            {
                let digits = bytes[i + 2..]
                    .iter()
                    .take(2)
                    .take_while(|b| b.is_ascii_hexdigit())
                    .count();
                decoded.push((ESCAPED, base + i));
                2 + digits
            }
            (QuoteStyle::Double, b'u') if bytes.get(i + 2) == Some(&b'{') => {
                match bytes[i + 2..].iter().position(|&b| b == b'}') {
                    Some(close) => {
                        decoded.push((ESCAPED, base + i));
                        3 + close
                    }
                    None => {
                        decoded.push(('\\', base + i));
                        1
                    }
                }
            }
            _ => {
                decoded.push(('\\', base + i));
                1
            }
        };
        i += consumed;
    }

    decoded
}

/// Collect the named children of `node`.
pub fn named_children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Source text of `node`, empty if the span is not valid UTF-8.
///
/// Names and literals that matter to a rewrite are ASCII, so anything in a
/// legacy encoding reads as empty and is left alone.
pub fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> &'a str {
    source
        .get(node.byte_range())
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .unwrap_or_default()
}

/// First `ERROR` or missing node below `root`, in document order.
pub fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            pending.extend(children.into_iter().rev());
        }
    }
    None
}

/// Lower the children of `node` into the closed syntax model.
pub fn lower_children(node: Node<'_>, source: &[u8]) -> Vec<SyntaxNode> {
    named_children(node)
        .into_iter()
        .filter_map(|child| match lower_special(child, source) {
            Some(lowered) => Some(lowered),
            None => {
                let descendants = lower_descendants(child, source);
                (!descendants.is_empty()).then_some(SyntaxNode::Other(descendants))
            }
        })
        .collect()
}

/// Collect the outermost special nodes below `node` in document order.
fn lower_descendants(node: Node<'_>, source: &[u8]) -> Vec<SyntaxNode> {
    let mut lowered = Vec::new();
    let mut pending: Vec<Node<'_>> = named_children(node).into_iter().rev().collect();

    while let Some(current) = pending.pop() {
        match lower_special(current, source) {
            Some(special) => lowered.push(special),
            None => pending.extend(named_children(current).into_iter().rev()),
        }
    }

    lowered
}

/// Lower a node of one of the distinguished kinds. `None` means "descend".
fn lower_special(node: Node<'_>, source: &[u8]) -> Option<SyntaxNode> {
    match node.kind() {
        "namespace_definition" => Some(lower_namespace(node, source)),
        "namespace_use_declaration" => Some(SyntaxNode::Import(lower_import(node, source))),
        "string" | "encapsed_string" => lower_string(node, source),
        "qualified_name" | "relative_name" => Some(
            name_ref(node, source)
                .map(SyntaxNode::QualifiedReference)
                .unwrap_or(SyntaxNode::Other(Vec::new())),
        ),
        _ => None,
    }
}

fn lower_namespace(node: Node<'_>, source: &[u8]) -> SyntaxNode {
    let children = named_children(node);
    let name_node = node
        .child_by_field_name("name")
        .or_else(|| children.iter().copied().find(|c| c.kind() == "namespace_name"));
    let body_node = node
        .child_by_field_name("body")
        .or_else(|| children.iter().copied().find(|c| c.kind() == "compound_statement"));

    SyntaxNode::NamespaceDecl(NamespaceDecl {
        name: name_node.and_then(|n| name_ref(n, source)),
        body: body_node.map(|body| lower_children(body, source)),
    })
}

fn lower_import(node: Node<'_>, source: &[u8]) -> ImportDecl {
    let children = named_children(node);

    match children.iter().find(|c| c.kind() == "namespace_use_group") {
        Some(group) => ImportDecl {
            group_prefix: children
                .iter()
                .find(|c| NAME_KINDS.contains(&c.kind()))
                .and_then(|prefix| name_ref(*prefix, source)),
            clauses: named_children(*group)
                .into_iter()
                .filter(|c| CLAUSE_KINDS.contains(&c.kind()))
                .filter_map(|c| lower_clause(c, source))
                .collect(),
        },
        None => ImportDecl {
            group_prefix: None,
            clauses: children
                .into_iter()
                .filter(|c| CLAUSE_KINDS.contains(&c.kind()))
                .filter_map(|c| lower_clause(c, source))
                .collect(),
        },
    }
}

fn lower_clause(clause: Node<'_>, source: &[u8]) -> Option<ImportClause> {
    let children = named_children(clause);

    let mut alias_node = clause.child_by_field_name("alias").or_else(|| {
        children
            .iter()
            .find(|c| c.kind() == "namespace_aliasing_clause")
            .and_then(|aliasing| named_children(*aliasing).into_iter().find(|c| c.kind() == "name"))
    });

    let names: Vec<Node<'_>> = children
        .iter()
        .copied()
        .filter(|c| NAME_KINDS.contains(&c.kind()))
        .filter(|c| alias_node.map_or(true, |alias| alias.id() != c.id()))
        .collect();

    // `use A as B` where the grammar exposes both as plain names
    if alias_node.is_none() && names.len() >= 2 && names.iter().all(|n| n.kind() == "name") {
        alias_node = names.last().copied();
    }

    let name = name_ref(*names.first()?, source)?;
    Some(ImportClause {
        name,
        alias: alias_node.map(|alias| node_text(alias, source).to_string()),
    })
}

fn lower_string(node: Node<'_>, source: &[u8]) -> Option<SyntaxNode> {
    let interpolated = named_children(node)
        .iter()
        .any(|c| !STRING_PARTS.contains(&c.kind()));
    if interpolated {
        return None;
    }

    Some(
        StringLiteral::from_source(node_text(node, source), node.start_byte())
            .map(SyntaxNode::StringLiteral)
            .unwrap_or(SyntaxNode::Other(Vec::new())),
    )
}

/// Build a [`NameRef`] for `node`, widening the span over a leading `\` or
/// `namespace\` that the grammar keeps outside the node.
fn name_ref(node: Node<'_>, source: &[u8]) -> Option<NameRef> {
    let Range { mut start, end } = node.byte_range();
    if start > 0 && source.get(start - 1) == Some(&b'\\') {
        start -= 1;
        let keyword = &RELATIVE_MARKER.as_bytes()[..RELATIVE_MARKER.len() - 1];
        let relative = start >= keyword.len()
            && source
                .get(start - keyword.len()..start)
                .is_some_and(|word| word.eq_ignore_ascii_case(keyword));
        if relative {
            start -= keyword.len();
        }
    }
    let text = std::str::from_utf8(source.get(start..end)?).ok()?;
    NameRef::parse(text, start..end)
}
