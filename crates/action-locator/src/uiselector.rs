//! Declarative query-language support
//!
//! The dispatcher hands `ByQueryLanguage` expressions to a
//! [`QueryLanguageEvaluator`]. [`UiSelectorEvaluator`] understands the
//! chained-call `UiSelector` syntax:
//!
//! ```text
//! new UiSelector().resourceId("com.app:id/list").className("android.widget.Button").instance(1)
//! ```
//!
//! The `new UiSelector()` prefix may be omitted, and several selectors may be
//! joined with `;`. They are tried in order and the first one that matches wins.

use tracing::trace;
use ui_tree::{NodeHandle, UiNode};

use crate::errors::LocatorError;

/// Evaluates a query-language expression against a snapshot
pub trait QueryLanguageEvaluator: Send + Sync {
    /// First match in document order. `scoped` means `root` is the query scope
    /// and only its descendants are candidates.
    fn find_first(
        &self,
        expression: &str,
        root: &UiNode,
        scoped: bool,
    ) -> Result<Option<NodeHandle>, LocatorError>;
}

/// One criterion of a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    ResourceId(String),
    ClassName(String),
    Text(String),
    TextContains(String),
    TextStartsWith(String),
    Description(String),
    DescriptionContains(String),
    DescriptionStartsWith(String),
    PackageName(String),
    Enabled(bool),
    Index(usize),
}

impl Criterion {
    fn matches(&self, node: &UiNode) -> bool {
        match self {
            Criterion::ResourceId(v) => node.resource_id == *v,
            Criterion::ClassName(v) => node.class_name == *v,
            Criterion::Text(v) => node.text == *v,
            Criterion::TextContains(v) => node.text.contains(v.as_str()),
            Criterion::TextStartsWith(v) => node.text.starts_with(v.as_str()),
            Criterion::Description(v) => node.content_desc == *v,
            Criterion::DescriptionContains(v) => node.content_desc.contains(v.as_str()),
            Criterion::DescriptionStartsWith(v) => node.content_desc.starts_with(v.as_str()),
            Criterion::PackageName(v) => node.package == *v,
            Criterion::Enabled(v) => node.enabled == *v,
            Criterion::Index(v) => node.index == *v,
        }
    }
}

/// A parsed `UiSelector` statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiSelector {
    pub criteria: Vec<Criterion>,
    /// Zero-based pick among all matches
    pub instance: Option<usize>,
}

impl UiSelector {
    pub fn matches(&self, node: &UiNode) -> bool {
        self.criteria.iter().all(|criterion| criterion.matches(node))
    }

    pub fn find_first<'a>(&self, root: &'a UiNode, scoped: bool) -> Option<&'a UiNode> {
        let skip = usize::from(scoped);
        root.descendants()
            .into_iter()
            .skip(skip)
            .filter(|node| self.matches(node))
            .nth(self.instance.unwrap_or(0))
    }
}

/// Default evaluator for the `UiSelector` language
#[derive(Debug, Clone, Copy, Default)]
pub struct UiSelectorEvaluator;

impl UiSelectorEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Parse every `;`-separated statement. Blank statements are ignored.
    pub fn parse(&self, expression: &str) -> Result<Vec<UiSelector>, LocatorError> {
        split_statements(expression)?
            .into_iter()
            .filter(|statement| !statement.trim().is_empty())
            .map(|statement| {
                StatementParser::new(&statement)
                    .parse()
                    .map_err(|reason| invalid(&statement, &reason))
            })
            .collect()
    }
}

impl QueryLanguageEvaluator for UiSelectorEvaluator {
    fn find_first(
        &self,
        expression: &str,
        root: &UiNode,
        scoped: bool,
    ) -> Result<Option<NodeHandle>, LocatorError> {
        let selectors = self.parse(expression)?;
        for (position, selector) in selectors.iter().enumerate() {
            if let Some(node) = selector.find_first(root, scoped) {
                trace!(statement = position, node = %node.id, "UiSelector matched");
                return Ok(Some(node.handle()));
            }
        }
        Ok(None)
    }
}

fn invalid(statement: &str, reason: &str) -> LocatorError {
    LocatorError::InvalidSelector(format!(
        "invalid UiSelector expression '{}': {reason}",
        statement.trim()
    ))
}

fn split_statements(expression: &str) -> Result<Vec<String>, LocatorError> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in expression.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            ';' => statements.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if in_string {
        return Err(invalid(expression, "unterminated string literal"));
    }
    statements.push(current);
    Ok(statements)
}

enum Argument {
    None,
    Str(String),
    Int(usize),
    Bool(bool),
}

struct StatementParser {
    chars: Vec<char>,
    pos: usize,
}

impl StatementParser {
    fn new(statement: &str) -> Self {
        Self {
            chars: statement.chars().collect(),
            pos: 0,
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> Result<(), String> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(format!("expected '{expected}' but found '{c}' at {}", self.pos)),
            None => Err(format!("expected '{expected}' but the expression ended")),
        }
    }

    fn identifier(&mut self) -> Result<String, String> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected a method name at {start}"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse(mut self) -> Result<UiSelector, String> {
        let mut selector = UiSelector::default();
        let prefixed = self.parse_prefix()?;

        let mut first = true;
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                break;
            }
            if prefixed || !first {
                self.eat('.')?;
            } else if self.peek() == Some('.') {
                self.pos += 1;
            }
            first = false;

            let method = self.identifier()?;
            self.eat('(')?;
            let argument = self.argument()?;
            self.eat(')')?;
            self.apply(&mut selector, &method, argument)?;
        }

        Ok(selector)
    }

    fn parse_prefix(&mut self) -> Result<bool, String> {
        self.skip_ws();
        let rest: String = self.chars[self.pos..].iter().collect();
        let Some(after_new) = rest.strip_prefix("new") else {
            return Ok(false);
        };
        if !after_new.starts_with(char::is_whitespace) {
            return Ok(false);
        }
        self.pos += 3;
        let class = self.identifier()?;
        if class != "UiSelector" {
            return Err(format!("unsupported selector class '{class}'"));
        }
        self.eat('(')?;
        self.eat(')')?;
        Ok(true)
    }

    fn argument(&mut self) -> Result<Argument, String> {
        self.skip_ws();
        match self.peek() {
            Some(')') => Ok(Argument::None),
            Some('"') => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => return Err("unterminated string literal".to_string()),
                        Some('"') => {
                            self.pos += 1;
                            return Ok(Argument::Str(value));
                        }
                        Some('\\') => {
                            self.pos += 1;
                            match self.peek() {
                                Some(escaped) => {
                                    value.push(escaped);
                                    self.pos += 1;
                                }
                                None => return Err("unterminated escape".to_string()),
                            }
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                    }
                }
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                digits
                    .parse()
                    .map(Argument::Int)
                    .map_err(|err| format!("bad integer '{digits}': {err}"))
            }
            Some(_) => match self.identifier()?.as_str() {
                "true" => Ok(Argument::Bool(true)),
                "false" => Ok(Argument::Bool(false)),
                other => Err(format!("unsupported argument '{other}'")),
            },
            None => Err("expected an argument but the expression ended".to_string()),
        }
    }

    fn apply(
        &self,
        selector: &mut UiSelector,
        method: &str,
        argument: Argument,
    ) -> Result<(), String> {
        let criterion = match (method, argument) {
            ("resourceId", Argument::Str(v)) => Criterion::ResourceId(v),
            ("className", Argument::Str(v)) => Criterion::ClassName(v),
            ("text", Argument::Str(v)) => Criterion::Text(v),
            ("textContains", Argument::Str(v)) => Criterion::TextContains(v),
            ("textStartsWith", Argument::Str(v)) => Criterion::TextStartsWith(v),
            ("description", Argument::Str(v)) => Criterion::Description(v),
            ("descriptionContains", Argument::Str(v)) => Criterion::DescriptionContains(v),
            ("descriptionStartsWith", Argument::Str(v)) => Criterion::DescriptionStartsWith(v),
            ("packageName", Argument::Str(v)) => Criterion::PackageName(v),
            ("enabled", Argument::Bool(v)) => Criterion::Enabled(v),
            ("index", Argument::Int(v)) => Criterion::Index(v),
            ("instance", Argument::Int(v)) => {
                selector.instance = Some(v);
                return Ok(());
            }
            (
                "resourceId" | "className" | "text" | "textContains" | "textStartsWith"
                | "description" | "descriptionContains" | "descriptionStartsWith"
                | "packageName" | "enabled" | "index" | "instance",
                _,
            ) => return Err(format!("wrong argument type for {method}()")),
            (other, _) => return Err(format!("unsupported method '{other}'")),
        };
        selector.criteria.push(criterion);
        Ok(())
    }
}
