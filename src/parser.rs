use crate::ast::{Attributes, Node, NodeKind, Operator, Token};
use crate::error::{ExpandError, Result, StructureError};

/// Builds the node forest from a token stream.
///
/// Each call to `parse_level` owns one nesting level. A `>` hands the rest
/// of the stream to a deeper call, so `a>b+c` gives `a` two children while
/// `a>b>c` nests three levels. Groups and `>` both count towards the depth
/// limit.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(crate::settings::DEFAULT_MAX_DEPTH)
    }
}

impl Parser {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Parse a full token stream, then run [`Parser::validate`] over the result.
    pub fn parse(&self, tokens: &[Token]) -> Result<Vec<Node>> {
        let forest = self.parse_stream(tokens, 0)?;
        if !Self::validate(&forest) {
            return Err(StructureError::EmptyName.into());
        }
        Ok(forest)
    }

    /// True when every element node in the forest has a non-empty name.
    pub fn validate(forest: &[Node]) -> bool {
        forest.iter().all(|node| {
            let named = match node.kind {
                NodeKind::Element => node.name.as_deref().is_some_and(|n| !n.is_empty()),
            };
            named && Self::validate(&node.children)
        })
    }

    fn parse_stream(&self, tokens: &[Token], depth: usize) -> Result<Vec<Node>> {
        let mut cursor = 0;
        self.parse_level(tokens, &mut cursor, depth)
    }

    fn parse_level(&self, tokens: &[Token], cursor: &mut usize, depth: usize) -> Result<Vec<Node>> {
        let mut level: Vec<Node> = Vec::new();

        while let Some(token) = tokens.get(*cursor) {
            *cursor += 1;
            match token {
                Token::Element(element) => {
                    let mut node = Node::element(element.name);
                    if let Some(multiplier) = &element.multiplier {
                        node.repeat = multiplier.count;
                    }
                    level.push(node);
                }
                Token::Content(span) => {
                    let current = level.last_mut().ok_or(StructureError::MissingElement {
                        what: "content",
                        offset: span.offset,
                    })?;
                    current.content = Some(span.text.to_string());
                }
                Token::Attribute(span) => {
                    let current = level.last_mut().ok_or(StructureError::MissingElement {
                        what: "attribute",
                        offset: span.offset,
                    })?;
                    current.attributes = Some(parse_attributes(span.text));
                }
                Token::Group(group) => {
                    self.check_depth(depth + 1)?;
                    // Groups only control precedence: their nodes join this level.
                    level.extend(self.parse_stream(&group.tokens, depth + 1)?);
                }
                Token::Operator(op) => {
                    Self::check_operand(tokens, *cursor, *op, &level)?;
                    if let Operator::Child(_) = op {
                        self.check_depth(depth + 1)?;
                        let mut children = self.parse_level(tokens, cursor, depth + 1)?;
                        if let Some(current) = level.last_mut() {
                            for child in &mut children {
                                child.parent = current.name.clone();
                            }
                            current.children.append(&mut children);
                        }
                    }
                }
            }
        }

        Ok(level)
    }

    /// An operator needs a node before it and an element or group after it.
    fn check_operand(tokens: &[Token], next: usize, op: Operator, level: &[Node]) -> Result<()> {
        let followed = matches!(tokens.get(next), Some(Token::Element(_) | Token::Group(_)));
        if level.is_empty() || !followed {
            return Err(StructureError::DanglingOperator {
                operator: op.as_str(),
                offset: op.offset(),
            }
            .into());
        }
        Ok(())
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(ExpandError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}

/// Split raw attribute text into pairs.
///
/// `key=value` pieces are separated by whitespace and values lose their
/// surrounding quotes. Each piece splits at its first `=` and keeps the rest
/// whole, so `k=a=b` maps `k` to `a=b` instead of dropping the tail. Text
/// without `=` is kept whole under `value`.
pub fn parse_attributes(text: &str) -> Attributes {
    if !text.contains('=') {
        let text = text.trim();
        if text.is_empty() {
            return Attributes::new();
        }
        return [("value", text)].into_iter().collect();
    }

    text.split_whitespace()
        .filter_map(|piece| piece.split_once('='))
        .map(|(key, value)| (key, value.trim_matches(['"', '\''])))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .collect()
}
