/// Token produced by the tokenizer, borrowing its text from the abbreviation.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Element name, optionally followed by a `*N` multiplier
    Element(Element<'a>),
    /// Verbatim text between balanced `{` and `}`
    Content(Span<'a>),
    /// Raw text between balanced `[` and `]`, split into pairs by the parser
    Attribute(Span<'a>),
    /// `>` or `+`
    Operator(Operator),
    /// Parenthesized sub-expression, already tokenized
    Group(Group<'a>),
}

/// Discriminant of a [`Token`]. Multipliers are not tokens of their own:
/// they live on the [`Element`] they follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Element,
    Content,
    Attribute,
    Operator,
    Group,
}

impl<'a> Token<'a> {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Element(_) => TokenKind::Element,
            Token::Content(_) => TokenKind::Content,
            Token::Attribute(_) => TokenKind::Attribute,
            Token::Operator(_) => TokenKind::Operator,
            Token::Group(_) => TokenKind::Group,
        }
    }

    /// Text the token stands for: the element name, the inner text of a
    /// content, attribute or group span, or the operator symbol.
    pub fn value(&self) -> &'a str {
        match self {
            Token::Element(element) => element.name,
            Token::Content(span) | Token::Attribute(span) => span.text,
            Token::Operator(op) => op.as_str(),
            Token::Group(group) => group.inner,
        }
    }

    /// Byte offset of the token's first character in the original input.
    pub fn offset(&self) -> usize {
        match self {
            Token::Element(element) => element.offset,
            Token::Content(span) | Token::Attribute(span) => span.offset,
            Token::Operator(op) => op.offset(),
            Token::Group(group) => group.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    pub name: &'a str,
    pub offset: usize,
    /// Only elements can carry a multiplier.
    pub multiplier: Option<Multiplier<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Multiplier<'a> {
    /// Digits as written, e.g. `"3"` for `*3`
    pub value: &'a str,
    pub count: u32,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `>`: following element nests under the current one
    Child(usize),
    /// `+`: following element is a sibling of the current one
    Sibling(usize),
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Child(_) => ">",
            Operator::Sibling(_) => "+",
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            Operator::Child(offset) | Operator::Sibling(offset) => *offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a> {
    /// Text between the parentheses
    pub inner: &'a str,
    pub offset: usize,
    pub tokens: Vec<Token<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    #[default]
    Element,
}

/// Attribute pairs in insertion order.
///
/// Re-inserting a key replaces its value but keeps its original position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

/// One node of the parsed abbreviation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub content: Option<String>,
    pub attributes: Option<Attributes>,
    /// Number of copies of this subtree to render, at least 1
    pub repeat: u32,
    pub children: Vec<Node>,
    /// Name of the parent element, for display only
    pub parent: Option<String>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            kind: NodeKind::Element,
            name: None,
            content: None,
            attributes: None,
            repeat: 1,
            children: Vec::new(),
            parent: None,
        }
    }
}

impl Node {
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Number of units this node renders, counting every repeated copy of
    /// every descendant. Saturates instead of overflowing.
    pub fn unit_count(&self) -> u64 {
        let per_copy = self
            .children
            .iter()
            .fold(1u64, |total, child| total.saturating_add(child.unit_count()));
        per_copy.saturating_mul(u64::from(self.repeat.max(1)))
    }
}

/// Total units a forest renders.
pub fn unit_count(forest: &[Node]) -> u64 {
    forest
        .iter()
        .fold(0u64, |total, node| total.saturating_add(node.unit_count()))
}
