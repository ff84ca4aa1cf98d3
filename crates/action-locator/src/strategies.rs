//! Strategy resolution
//!
//! Maps the client's strategy name onto a [`Locator`] variant. Names this
//! dispatcher cannot execute are still recognized so that they fail as
//! unsupported rather than unknown.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{errors::LocatorError, types::Locator};

/// Marker separating package and entry name in a qualified resource id.
pub const QUALIFIED_ID_MARKER: &str = ":id/";

/// Locator strategy enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorStrategy {
    /// Resource id, short or package-qualified
    Id,

    /// Content description
    AccessibilityId,

    /// Reported class name
    ClassName,

    /// Path expression over the hierarchy dump
    XPath,

    /// UiSelector expression
    AndroidUiAutomator,

    // Recognized, not dispatchable
    Name,
    CssSelector,
    LinkText,
    PartialLinkText,
    TagName,
    AndroidDataMatcher,
    AndroidViewMatcher,
    AndroidViewTag,
    Image,
}

impl LocatorStrategy {
    const ALL: [LocatorStrategy; 14] = [
        LocatorStrategy::Id,
        LocatorStrategy::AccessibilityId,
        LocatorStrategy::ClassName,
        LocatorStrategy::XPath,
        LocatorStrategy::AndroidUiAutomator,
        LocatorStrategy::Name,
        LocatorStrategy::CssSelector,
        LocatorStrategy::LinkText,
        LocatorStrategy::PartialLinkText,
        LocatorStrategy::TagName,
        LocatorStrategy::AndroidDataMatcher,
        LocatorStrategy::AndroidViewMatcher,
        LocatorStrategy::AndroidViewTag,
        LocatorStrategy::Image,
    ];

    /// Get strategy name as sent by clients
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Id => "id",
            LocatorStrategy::AccessibilityId => "accessibility id",
            LocatorStrategy::ClassName => "class name",
            LocatorStrategy::XPath => "xpath",
            LocatorStrategy::AndroidUiAutomator => "-android uiautomator",
            LocatorStrategy::Name => "name",
            LocatorStrategy::CssSelector => "css selector",
            LocatorStrategy::LinkText => "link text",
            LocatorStrategy::PartialLinkText => "partial link text",
            LocatorStrategy::TagName => "tag name",
            LocatorStrategy::AndroidDataMatcher => "-android datamatcher",
            LocatorStrategy::AndroidViewMatcher => "-android viewmatcher",
            LocatorStrategy::AndroidViewTag => "-android viewtag",
            LocatorStrategy::Image => "-image",
        }
    }

    /// Look a strategy up by its client-facing name
    pub fn from_name(name: &str) -> Result<Self, LocatorError> {
        Self::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.name() == name)
            .ok_or_else(|| LocatorError::UnknownStrategy(name.to_string()))
    }

    /// All recognized strategies
    pub fn all() -> &'static [LocatorStrategy] {
        &Self::ALL
    }

    /// Whether the tree query dispatcher can execute this strategy
    pub fn is_supported(&self) -> bool {
        self.to_variant(String::new()).is_some()
    }

    /// Build the locator for `selector`, qualifying short ids with `package`
    pub fn to_locator(&self, selector: &str, package: Option<&str>) -> Result<Locator, LocatorError> {
        let value = match self {
            LocatorStrategy::Id => rewrite_id_locator(selector, package),
            _ => selector.to_string(),
        };
        let locator = self
            .to_variant(value)
            .ok_or_else(|| LocatorError::UnsupportedStrategy(self.name().to_string()))?;
        locator.validate()?;
        Ok(locator)
    }

    fn to_variant(&self, value: String) -> Option<Locator> {
        match self {
            LocatorStrategy::Id => Some(Locator::ById(value)),
            LocatorStrategy::AccessibilityId => Some(Locator::ByLabel(value)),
            LocatorStrategy::ClassName => Some(Locator::ByClassName(value)),
            LocatorStrategy::XPath => Some(Locator::ByPath(value)),
            LocatorStrategy::AndroidUiAutomator => Some(Locator::ByQueryLanguage(value)),
            LocatorStrategy::Name
            | LocatorStrategy::CssSelector
            | LocatorStrategy::LinkText
            | LocatorStrategy::PartialLinkText
            | LocatorStrategy::TagName
            | LocatorStrategy::AndroidDataMatcher
            | LocatorStrategy::AndroidViewMatcher
            | LocatorStrategy::AndroidViewTag
            | LocatorStrategy::Image => None,
        }
    }
}

/// Parse a (strategy, selector) pair into a locator
pub fn parse_locator(
    strategy: &str,
    selector: &str,
    package: Option<&str>,
) -> Result<Locator, LocatorError> {
    let strategy = LocatorStrategy::from_name(strategy)?;
    let locator = strategy.to_locator(selector, package)?;
    debug!("Parsed {} locator: {}", strategy.name(), locator);
    Ok(locator)
}

/// Qualify a short resource id with the target application's package.
///
/// Already-qualified ids, empty ids and a missing package leave the value
/// untouched, so the rewrite is idempotent.
pub fn rewrite_id_locator(selector: &str, package: Option<&str>) -> String {
    if selector.is_empty() || selector.contains(QUALIFIED_ID_MARKER) {
        return selector.to_string();
    }
    match package.map(str::trim).filter(|pkg| !pkg.is_empty()) {
        Some(pkg) => format!("{pkg}{QUALIFIED_ID_MARKER}{selector}"),
        None => selector.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKG: Option<&str> = Some("com.example.app");

    #[test]
    fn test_supported_strategies_map_to_variants() {
        let cases = [
            ("id", Locator::ById("com.example.app:id/login".into())),
            ("accessibility id", Locator::ByLabel("login".into())),
            ("class name", Locator::ByClassName("login".into())),
            ("xpath", Locator::ByPath("login".into())),
            ("-android uiautomator", Locator::ByQueryLanguage("login".into())),
        ];
        for (name, expected) in cases {
            assert_eq!(parse_locator(name, "login", PKG).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert_eq!(
            parse_locator("xyz", "anything", PKG),
            Err(LocatorError::UnknownStrategy("xyz".into()))
        );
        assert!(matches!(
            parse_locator("ID", "anything", PKG),
            Err(LocatorError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_recognized_but_unsupported_strategies() {
        for strategy in LocatorStrategy::all() {
            let result = strategy.to_locator("value", PKG);
            if strategy.is_supported() {
                assert!(result.is_ok(), "{}", strategy.name());
            } else {
                assert_eq!(
                    result,
                    Err(LocatorError::UnsupportedStrategy(strategy.name().to_string()))
                );
            }
        }
    }

    #[test]
    fn test_names_round_trip() {
        for strategy in LocatorStrategy::all() {
            assert_eq!(LocatorStrategy::from_name(strategy.name()), Ok(*strategy));
        }
    }

    #[test]
    fn test_id_rewrite() {
        assert_eq!(
            rewrite_id_locator("login_button", PKG),
            "com.example.app:id/login_button"
        );
        assert_eq!(
            rewrite_id_locator("android:id/text1", PKG),
            "android:id/text1"
        );
        assert_eq!(rewrite_id_locator("login_button", None), "login_button");
        assert_eq!(rewrite_id_locator("login_button", Some("  ")), "login_button");
    }

    #[test]
    fn test_id_rewrite_is_idempotent() {
        for raw in ["login_button", "com.other:id/x", "a:id/", "plain.dotted"] {
            let once = rewrite_id_locator(raw, PKG);
            let twice = rewrite_id_locator(&once, PKG);
            assert_eq!(once, twice, "{raw}");
        }
    }

    #[test]
    fn test_rewrite_applies_only_to_ids() {
        assert_eq!(
            parse_locator("accessibility id", "login_button", PKG).unwrap(),
            Locator::ByLabel("login_button".into())
        );
    }

    #[test]
    fn test_empty_id_is_invalid() {
        assert!(matches!(
            parse_locator("id", "", PKG),
            Err(LocatorError::InvalidSelector(_))
        ));
        assert!(parse_locator("xpath", "", PKG).is_ok());
    }
}
