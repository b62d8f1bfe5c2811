use pest::Parser;
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::ast::{Element, Group, Multiplier, Operator, Span, Token};
use crate::error::{ExpandError, LexError, Result};

#[derive(Parser)]
#[grammar = "src/abbreviation.pest"]
struct AbbreviationGrammar;

/// Turns abbreviation text into a token stream.
///
/// Stateless apart from the depth limit: every call, including the recursive
/// calls for group interiors, works on its own slice of the input.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    max_depth: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(crate::settings::DEFAULT_MAX_DEPTH)
    }
}

impl Tokenizer {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Tokenize an abbreviation such as `ul>li*3`.
    pub fn tokenize<'a>(&self, input: &'a str) -> Result<Vec<Token<'a>>> {
        self.tokenize_at(input, 0, 0)
    }

    fn tokenize_at<'a>(&self, input: &'a str, base: usize, depth: usize) -> Result<Vec<Token<'a>>> {
        // The grammar matches balanced spans recursively, so bound the
        // nesting before handing it the input.
        if depth > self.max_depth || span_depth(input) > self.max_depth {
            return Err(ExpandError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        let mut pairs = AbbreviationGrammar::parse(Rule::abbreviation, input)
            .map_err(|e| grammar_error(e, input, base))?;
        let Some(abbreviation) = pairs.next() else {
            return Ok(Vec::new());
        };

        abbreviation
            .into_inner()
            .filter(|pair| pair.as_rule() != Rule::EOI)
            .map(|pair| self.token(pair, base, depth))
            .collect()
    }

    fn token<'a>(&self, pair: Pair<'a, Rule>, base: usize, depth: usize) -> Result<Token<'a>> {
        let offset = base + pair.as_span().start();
        match pair.as_rule() {
            Rule::element => Ok(Token::Element(Self::element(pair, base)?)),
            Rule::child => Ok(Token::Operator(Operator::Child(offset))),
            Rule::sibling => Ok(Token::Operator(Operator::Sibling(offset))),
            Rule::content => Ok(Token::Content(Self::span(pair, base))),
            Rule::attribute => Ok(Token::Attribute(Self::span(pair, base))),
            Rule::group => {
                let Span { text, offset: inner_offset } = Self::span(pair, base);
                let tokens = self.tokenize_at(text, inner_offset, depth + 1)?;
                Ok(Token::Group(Group {
                    inner: text,
                    offset,
                    tokens,
                }))
            }
            Rule::unclosed => Err(LexError::Unclosed {
                delimiter: first_char(pair.as_str()),
                offset,
            }
            .into()),
            _ => Err(LexError::UnexpectedCharacter {
                character: first_char(pair.as_str()),
                offset,
            }
            .into()),
        }
    }

    fn element<'a>(pair: Pair<'a, Rule>, base: usize) -> Result<Element<'a>> {
        let offset = base + pair.as_span().start();
        let mut inner = pair.into_inner();

        let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
        let multiplier = inner
            .next()
            .map(|p| Self::multiplier(p, base))
            .transpose()?;

        Ok(Element {
            name,
            offset,
            multiplier,
        })
    }

    fn multiplier<'a>(pair: Pair<'a, Rule>, base: usize) -> Result<Multiplier<'a>> {
        let offset = base + pair.as_span().start();
        let Some(count) = pair.into_inner().next() else {
            return Err(LexError::MissingMultiplierCount { offset }.into());
        };

        let value = count.as_str();
        match value.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Multiplier {
                value,
                count: n,
                offset,
            }),
            _ => Err(LexError::InvalidMultiplier {
                count: value.to_string(),
                offset,
            }
            .into()),
        }
    }

    /// Inner text of a delimited span, with the offset just past the opener.
    fn span<'a>(pair: Pair<'a, Rule>, base: usize) -> Span<'a> {
        let start = pair.as_span().start();
        match pair.into_inner().next() {
            Some(body) => Span {
                text: body.as_str(),
                offset: base + body.as_span().start(),
            },
            None => Span {
                text: "",
                offset: base + start + 1,
            },
        }
    }
}

fn first_char(text: &str) -> char {
    text.chars().next().unwrap_or_default()
}

/// The grammar accepts any input, so a rejection can only point at a
/// character it could not place.
fn grammar_error(error: pest::error::Error<Rule>, input: &str, base: usize) -> ExpandError {
    let offset = match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    LexError::UnexpectedCharacter {
        character: input.get(offset..).map(first_char).unwrap_or_default(),
        offset: base + offset,
    }
    .into()
}

/// Deepest recursion one grammar run performs on `input`.
///
/// Inside a span only its own delimiter nests: content on braces,
/// attributes on brackets, groups on parentheses. Group interiors are
/// measured again when they are tokenized.
fn span_depth(input: &str) -> usize {
    let mut open: Option<(char, char, usize)> = None;
    let mut deepest = 0;
    for c in input.chars() {
        match open {
            None => {
                open = match c {
                    '{' => Some(('{', '}', 1)),
                    '[' => Some(('[', ']', 1)),
                    '(' => Some(('(', ')', 1)),
                    _ => None,
                };
            }
            Some((opener, closer, depth)) => {
                open = if c == opener {
                    Some((opener, closer, depth + 1))
                } else if c == closer {
                    (depth > 1).then_some((opener, closer, depth - 1))
                } else {
                    open
                };
            }
        }
        if let Some((_, _, depth)) = open {
            deepest = deepest.max(depth);
        }
    }
    deepest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TokenKind;

    fn tokenize(input: &str) -> Result<Vec<Token<'_>>> {
        Tokenizer::default().tokenize(input)
    }

    #[test]
    fn test_element_with_multiplier() {
        let tokens = tokenize("div*3").unwrap();
        assert_eq!(tokens.len(), 1);

        match &tokens[0] {
            Token::Element(Element {
                name, multiplier, ..
            }) => {
                assert_eq!(*name, "div");
                let multiplier = multiplier.as_ref().expect("multiplier child");
                assert_eq!(multiplier.value, "3");
                assert_eq!(multiplier.count, 3);
            }
            other => panic!("Expected Element token, got {other:?}"),
        }
    }

    #[test]
    fn test_operators_and_names() {
        let tokens = tokenize("ul>li+a_b-c").unwrap();
        let kinds: Vec<_> = tokens.iter().map(Token::kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Element,
                TokenKind::Operator,
                TokenKind::Element,
                TokenKind::Operator,
                TokenKind::Element,
            ]
        );
        assert_eq!(tokens[1], Token::Operator(Operator::Child(2)));
        assert_eq!(tokens[3], Token::Operator(Operator::Sibling(5)));
        assert_eq!(tokens[4].value(), "a_b-c");
    }

    #[test]
    fn test_content_is_verbatim_with_nested_braces() {
        let tokens = tokenize("p{Hello {world} \\n}").unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(matches!(&tokens[1], Token::Content(span) if span.text == "Hello {world} \\n"));
        assert_eq!(tokens[1].offset(), 2);
    }

    #[test]
    fn test_attribute_is_raw() {
        let tokens = tokenize("a[href=\"x\" title=y]").unwrap();
        assert!(matches!(&tokens[1], Token::Attribute(span) if span.text == "href=\"x\" title=y"));
    }

    #[test]
    fn test_empty_spans() {
        let tokens = tokenize("p{}[]").unwrap();
        assert!(matches!(&tokens[1], Token::Content(span) if span.text.is_empty()));
        assert!(matches!(&tokens[2], Token::Attribute(span) if span.text.is_empty()));
    }

    #[test]
    fn test_group_is_tokenized_eagerly() {
        let tokens = tokenize("(a>b)+c").unwrap();
        assert_eq!(tokens.len(), 3);

        match &tokens[0] {
            Token::Group(group) => {
                assert_eq!(group.inner, "a>b");
                assert_eq!(group.offset, 0);
                assert_eq!(group.tokens.len(), 3);
                // offsets inside groups are absolute
                assert_eq!(group.tokens[2].offset(), 3);
            }
            other => panic!("Expected Group token, got {other:?}"),
        }
    }

    #[test]
    fn test_whitespace_is_skipped() {
        let tokens = tokenize(" ul \t>\n li ").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].value(), "li");
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_unclosed_content() {
        let err = tokenize("div{hello").unwrap_err();
        assert_eq!(
            err,
            ExpandError::Lex(LexError::Unclosed {
                delimiter: '{',
                offset: 3
            })
        );
    }

    #[test]
    fn test_unclosed_bracket_and_paren() {
        assert!(matches!(
            tokenize("a[x=1"),
            Err(ExpandError::Lex(LexError::Unclosed { delimiter: '[', offset: 1 }))
        ));
        assert!(matches!(
            tokenize("(a>(b)"),
            Err(ExpandError::Lex(LexError::Unclosed { delimiter: '(', offset: 0 }))
        ));
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            tokenize("div!").unwrap_err(),
            ExpandError::Lex(LexError::UnexpectedCharacter {
                character: '!',
                offset: 3
            })
        );
        // a closer without an opener is just another stray character
        assert!(matches!(
            tokenize("a}"),
            Err(ExpandError::Lex(LexError::UnexpectedCharacter { character: '}', offset: 1 }))
        ));
    }

    #[test]
    fn test_standalone_star_is_rejected() {
        assert!(matches!(
            tokenize("div *3"),
            Err(ExpandError::Lex(LexError::UnexpectedCharacter { character: '*', offset: 4 }))
        ));
    }

    #[test]
    fn test_bare_multiplier() {
        assert_eq!(
            tokenize("li*").unwrap_err(),
            ExpandError::Lex(LexError::MissingMultiplierCount { offset: 2 })
        );
        assert!(matches!(
            tokenize("li*>a"),
            Err(ExpandError::Lex(LexError::MissingMultiplierCount { offset: 2 }))
        ));
    }

    #[test]
    fn test_invalid_multiplier_counts() {
        assert!(matches!(
            tokenize("li*0"),
            Err(ExpandError::Lex(LexError::InvalidMultiplier { .. }))
        ));
        assert!(matches!(
            tokenize("li*99999999999"),
            Err(ExpandError::Lex(LexError::InvalidMultiplier { .. }))
        ));
    }

    #[test]
    fn test_errors_inside_groups_use_absolute_offsets() {
        assert_eq!(
            tokenize("a+(b>c!)").unwrap_err(),
            ExpandError::Lex(LexError::UnexpectedCharacter {
                character: '!',
                offset: 6
            })
        );
    }

    #[test]
    fn test_depth_limit() {
        let tokenizer = Tokenizer::new(3);
        assert!(tokenizer.tokenize("(((a)))").is_ok());
        assert_eq!(
            tokenizer.tokenize("((((a))))").unwrap_err(),
            ExpandError::DepthExceeded { limit: 3 }
        );

        let deep = format!("{}a{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(
            Tokenizer::default().tokenize(&deep),
            Err(ExpandError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn test_span_depth() {
        assert_eq!(span_depth("a>b"), 0);
        assert_eq!(span_depth("(a{x}[y])"), 1);
        assert_eq!(span_depth("p{{{}}}"), 3);
        assert_eq!(span_depth("(a)(b)"), 1);
        assert_eq!(span_depth("p{(((}[a=[[]]]"), 3);
        assert_eq!(span_depth("((a))+p{x"), 2);
    }

    #[test]
    fn test_deep_parentheses_in_content_and_attributes() {
        let parens = "(".repeat(40);

        let input = format!("p{{{parens}}}");
        let tokens = tokenize(&input).unwrap();
        assert!(matches!(&tokens[1], Token::Content(span) if span.text == parens));

        let input = format!("p[title={parens}]");
        let tokens = tokenize(&input).unwrap();
        assert!(matches!(&tokens[1], Token::Attribute(span) if span.text.ends_with(&parens)));

        let input = format!("p{{{}}}", "{".repeat(40) + &"}".repeat(40));
        assert_eq!(
            tokenize(&input).unwrap_err(),
            ExpandError::DepthExceeded { limit: 32 }
        );
    }
}
