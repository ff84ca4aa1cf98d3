//! Path-expression evaluation over a tree snapshot
//!
//! The document mirrors the uiautomator XML dump: an element's name is its
//! class name and a whole-tree document is wrapped in a `hierarchy` element.
//! A scoped document has the scope node as its only top-level element, so no
//! expression evaluated against it can reach outside the scope.

use thiserror::Error;
use ui_tree::{NodeHandle, UiNode};

use crate::errors::LocatorError;

/// Name of the synthetic wrapper around an unscoped document.
pub const HIERARCHY_ELEMENT: &str = "hierarchy";

/// Structural problems in a path expression
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: usize },

    #[error("unterminated string literal starting at {0}")]
    UnterminatedLiteral(usize),

    #[error("expected {expected} at {position}")]
    Expected {
        expected: &'static str,
        position: usize,
    },

    #[error("unsupported function '{0}()'")]
    UnsupportedFunction(String),

    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("conditions nested deeper than {} levels at {}", MAX_NESTING, .0)]
    TooDeep(usize),
}

/// Deepest nesting of `(` and `not(` accepted inside a predicate.
pub const MAX_NESTING: usize = 32;

impl From<PathError> for LocatorError {
    fn from(err: PathError) -> Self {
        LocatorError::InvalidSelector(format!("invalid path expression: {err}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Eq,
    NotEq,
    Star,
    Pipe,
    Name(String),
    Literal(String),
    Number(usize),
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '$')
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, PathError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let start = i;
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let token = match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                i += 2;
                Token::DoubleSlash
            }
            '.' if chars.get(i + 1) == Some(&'.') => {
                i += 2;
                Token::DotDot
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                i += 2;
                Token::NotEq
            }
            '/' | '.' | '[' | ']' | '(' | ')' | '@' | ',' | '=' | '*' | '|' => {
                i += 1;
                match c {
                    '/' => Token::Slash,
                    '.' => Token::Dot,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '@' => Token::At,
                    ',' => Token::Comma,
                    '=' => Token::Eq,
                    '*' => Token::Star,
                    _ => Token::Pipe,
                }
            }
            '\'' | '"' => {
                i += 1;
                let begin = i;
                while i < chars.len() && chars[i] != c {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(PathError::UnterminatedLiteral(start));
                }
                let literal: String = chars[begin..i].iter().collect();
                i += 1;
                Token::Literal(literal)
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let value = digits.parse().map_err(|_| PathError::Expected {
                    expected: "a position that fits in usize",
                    position: start,
                })?;
                Token::Number(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                Token::Name(chars[start..i].iter().collect())
            }
            other => {
                return Err(PathError::UnexpectedCharacter {
                    character: other,
                    position: start,
                })
            }
        };
        tokens.push((start, token));
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    DescendantOrSelf,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    AnyNode,
    AnyElement,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Attribute(String),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Exists(Operand),
    Equals(Operand, String),
    NotEquals(Operand, String),
    Contains(Operand, String),
    StartsWith(Operand, String),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    /// 1-based position among the step's candidates for one context node
    Position(usize),
    Filter(Condition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::AnyNode,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

/// A compiled path expression; a union of location paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    paths: Vec<LocationPath>,
}

/// Compile `expression`. Blank input compiles to an expression that matches
/// nothing.
pub fn compile(expression: &str) -> Result<PathExpr, PathError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: expression.chars().count(),
        depth: 0,
    };
    parser.parse_expr()
}

/// Compile and evaluate in one go, returning handles in document order.
pub fn find_all(
    expression: &str,
    root: &UiNode,
    scoped: bool,
) -> Result<Vec<NodeHandle>, PathError> {
    let expr = compile(expression)?;
    Ok(expr
        .evaluate(root, scoped)
        .into_iter()
        .map(UiNode::handle)
        .collect())
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(position, _)| *position)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, token)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, expected: &'static str) -> PathError {
        if self.pos >= self.tokens.len() {
            PathError::UnexpectedEnd(expected)
        } else {
            PathError::Expected {
                expected,
                position: self.position(),
            }
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), PathError> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_literal(&mut self) -> Result<String, PathError> {
        match self.peek() {
            Some(Token::Literal(value)) => {
                let value = value.clone();
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error("a quoted string")),
        }
    }

    fn parse_expr(&mut self) -> Result<PathExpr, PathError> {
        let mut paths = Vec::new();
        if self.peek().is_none() {
            return Ok(PathExpr { paths });
        }
        loop {
            paths.push(self.parse_location_path()?);
            if self.peek() == Some(&Token::Pipe) {
                self.pos += 1;
                continue;
            }
            break;
        }
        if self.peek().is_some() {
            return Err(self.error("end of expression"));
        }
        Ok(PathExpr { paths })
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::Dot | Token::DotDot)
        )
    }

    fn parse_location_path(&mut self) -> Result<LocationPath, PathError> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if !self.at_step_start() {
                    // bare "/" selects the document itself
                    return Ok(LocationPath {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                    steps.push(self.parse_step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                    steps.push(self.parse_step()?);
                }
                _ => break,
            }
        }

        Ok(LocationPath { absolute, steps })
    }

    fn parse_step(&mut self) -> Result<Step, PathError> {
        let (axis, test) = match self.peek() {
            Some(Token::Dot) => (Axis::SelfNode, NodeTest::AnyNode),
            Some(Token::DotDot) => (Axis::Parent, NodeTest::AnyNode),
            Some(Token::Star) => (Axis::Child, NodeTest::AnyElement),
            Some(Token::Name(name)) if self.peek_at(1) != Some(&Token::LParen) => {
                (Axis::Child, NodeTest::Name(name.clone()))
            }
            _ => return Err(self.error("an element name, '*', '.' or '..'")),
        };
        self.pos += 1;

        let mut predicates = Vec::new();
        if matches!(axis, Axis::Child) {
            while self.peek() == Some(&Token::LBracket) {
                self.pos += 1;
                predicates.push(self.parse_predicate()?);
                self.expect(Token::RBracket, "']'")?;
            }
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_predicate(&mut self) -> Result<Predicate, PathError> {
        if let (Some(Token::Number(n)), Some(Token::RBracket)) = (self.peek(), self.peek_at(1)) {
            let n = *n;
            self.pos += 1;
            return Ok(Predicate::Position(n));
        }
        Ok(Predicate::Filter(self.parse_or()?))
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, PathError>,
    ) -> Result<T, PathError> {
        if self.depth >= MAX_NESTING {
            return Err(PathError::TooDeep(self.position()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(name)) if name == keyword)
    }

    fn parse_or(&mut self) -> Result<Condition, PathError> {
        let mut left = self.parse_and()?;
        while self.is_keyword("or") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, PathError> {
        let mut left = self.parse_primary()?;
        while self.is_keyword("and") {
            self.pos += 1;
            let right = self.parse_primary()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Condition, PathError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.nested(Self::parse_or)?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::At) => {
                let operand = self.parse_operand()?;
                self.parse_comparison(operand)
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::LParen) => {
                match name.as_str() {
                    "text" => {
                        let operand = self.parse_operand()?;
                        self.parse_comparison(operand)
                    }
                    "contains" | "starts-with" => {
                        let contains = name == "contains";
                        self.pos += 2;
                        let operand = self.parse_operand()?;
                        self.expect(Token::Comma, "','")?;
                        let needle = self.expect_literal()?;
                        self.expect(Token::RParen, "')'")?;
                        Ok(if contains {
                            Condition::Contains(operand, needle)
                        } else {
                            Condition::StartsWith(operand, needle)
                        })
                    }
                    "not" => {
                        self.pos += 2;
                        let inner = self.nested(Self::parse_or)?;
                        self.expect(Token::RParen, "')'")?;
                        Ok(Condition::Not(Box::new(inner)))
                    }
                    other => Err(PathError::UnsupportedFunction(other.to_string())),
                }
            }
            _ => Err(self.error("a predicate condition")),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, PathError> {
        match self.advance() {
            Some(Token::At) => match self.advance() {
                Some(Token::Name(name)) => Ok(Operand::Attribute(name)),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    Err(self.error("an attribute name"))
                }
            },
            Some(Token::Name(name)) if name == "text" => {
                self.expect(Token::LParen, "'('")?;
                self.expect(Token::RParen, "')'")?;
                Ok(Operand::Text)
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("'@attribute' or 'text()'"))
            }
        }
    }

    fn parse_comparison(&mut self, operand: Operand) -> Result<Condition, PathError> {
        match self.peek() {
            Some(Token::Eq) => {
                self.pos += 1;
                Ok(Condition::Equals(operand, self.expect_literal()?))
            }
            Some(Token::NotEq) => {
                self.pos += 1;
                Ok(Condition::NotEquals(operand, self.expect_literal()?))
            }
            _ => Ok(Condition::Exists(operand)),
        }
    }
}

enum Kind<'a> {
    Document,
    Hierarchy,
    Element(&'a UiNode),
}

struct Entry<'a> {
    kind: Kind<'a>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Flattened view of a snapshot; entry indexes follow document order.
struct Document<'a> {
    entries: Vec<Entry<'a>>,
}

impl<'a> Document<'a> {
    const ROOT: usize = 0;

    fn build(root: &'a UiNode, scoped: bool) -> Self {
        let mut doc = Self {
            entries: vec![Entry {
                kind: Kind::Document,
                parent: None,
                children: Vec::new(),
            }],
        };
        let top = if scoped {
            Self::ROOT
        } else {
            doc.push(Kind::Hierarchy, Self::ROOT)
        };
        doc.push_subtree(root, top);
        doc
    }

    fn push(&mut self, kind: Kind<'a>, parent: usize) -> usize {
        let index = self.entries.len();
        self.entries.push(Entry {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.entries[parent].children.push(index);
        index
    }

    fn push_subtree(&mut self, node: &'a UiNode, parent: usize) {
        let index = self.push(Kind::Element(node), parent);
        for child in &node.children {
            self.push_subtree(child, index);
        }
    }

    fn name(&self, index: usize) -> Option<&str> {
        match self.entries[index].kind {
            Kind::Document => None,
            Kind::Hierarchy => Some(HIERARCHY_ELEMENT),
            Kind::Element(node) => Some(node.class_name.as_str()),
        }
    }

    fn axis(&self, index: usize, axis: Axis) -> Vec<usize> {
        match axis {
            Axis::SelfNode => vec![index],
            Axis::Child => self.entries[index].children.clone(),
            Axis::Parent => self.entries[index].parent.into_iter().collect(),
            Axis::DescendantOrSelf => {
                let mut out = Vec::new();
                let mut stack = vec![index];
                while let Some(current) = stack.pop() {
                    out.push(current);
                    stack.extend(self.entries[current].children.iter().rev());
                }
                out
            }
        }
    }

    fn matches(&self, index: usize, test: &NodeTest) -> bool {
        match test {
            NodeTest::AnyNode => true,
            NodeTest::AnyElement => self.name(index).is_some(),
            NodeTest::Name(name) => self.name(index) == Some(name.as_str()),
        }
    }

    fn operand(&self, index: usize, operand: &Operand) -> Option<String> {
        let Kind::Element(node) = self.entries[index].kind else {
            return None;
        };
        match operand {
            Operand::Attribute(name) => node.attribute(name),
            Operand::Text => Some(node.text.clone()),
        }
    }

    fn holds(&self, index: usize, condition: &Condition) -> bool {
        match condition {
            Condition::Exists(op) => self.operand(index, op).is_some_and(|v| !v.is_empty()),
            Condition::Equals(op, expected) => {
                self.operand(index, op).as_deref() == Some(expected.as_str())
            }
            Condition::NotEquals(op, expected) => self
                .operand(index, op)
                .is_some_and(|v| v != *expected),
            Condition::Contains(op, needle) => self
                .operand(index, op)
                .is_some_and(|v| v.contains(needle.as_str())),
            Condition::StartsWith(op, prefix) => self
                .operand(index, op)
                .is_some_and(|v| v.starts_with(prefix.as_str())),
            Condition::Not(inner) => !self.holds(index, inner),
            Condition::And(a, b) => self.holds(index, a) && self.holds(index, b),
            Condition::Or(a, b) => self.holds(index, a) || self.holds(index, b),
        }
    }

    fn select(&self, path: &LocationPath, context: usize) -> Vec<usize> {
        let mut current = vec![if path.absolute { Self::ROOT } else { context }];
        for step in &path.steps {
            let mut next = Vec::new();
            for &index in &current {
                let mut candidates: Vec<usize> = self
                    .axis(index, step.axis)
                    .into_iter()
                    .filter(|&candidate| self.matches(candidate, &step.test))
                    .collect();
                for predicate in &step.predicates {
                    candidates = match predicate {
                        Predicate::Position(n) => n
                            .checked_sub(1)
                            .and_then(|i| candidates.get(i).copied())
                            .into_iter()
                            .collect(),
                        Predicate::Filter(condition) => candidates
                            .into_iter()
                            .filter(|&candidate| self.holds(candidate, condition))
                            .collect(),
                    };
                }
                next.extend(candidates);
            }
            next.sort_unstable();
            next.dedup();
            current = next;
        }
        current
    }
}

impl PathExpr {
    /// Whether the expression can match anything at all
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Evaluate against `root`. With `scoped`, `root` is the query scope and
    /// relative paths start from it; otherwise `root` is the whole tree and
    /// relative paths start from the document.
    pub fn evaluate<'a>(&self, root: &'a UiNode, scoped: bool) -> Vec<&'a UiNode> {
        if self.paths.is_empty() {
            return Vec::new();
        }
        let doc = Document::build(root, scoped);
        // scoped documents put the scope node right after the document entry
        let context = if scoped { 1 } else { Document::ROOT };

        let mut selected: Vec<usize> = self
            .paths
            .iter()
            .flat_map(|path| doc.select(path, context))
            .collect();
        selected.sort_unstable();
        selected.dedup();

        selected
            .into_iter()
            .filter_map(|index| match doc.entries[index].kind {
                Kind::Element(node) => Some(node),
                _ => None,
            })
            .collect()
    }
}
