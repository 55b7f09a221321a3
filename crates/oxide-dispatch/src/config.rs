//! Router configuration.

use serde::Deserialize;

use crate::error::Result;

/// Settings shared by a root router and its transport-specific children.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use oxide_dispatch::RouterConfig;
///
/// let config = RouterConfig::from_json(r#"{"redirect_code": 308}"#).unwrap();
/// assert_eq!(config.redirect_code, 308);
/// assert!(config.handle_options);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Status code used by [`crate::Router::redir`].
    pub redirect_code: u16,
    /// Initial method-not-allowed mode of every new table.
    pub handle_method_not_allowed: bool,
    /// Initial automatic-OPTIONS mode of every new table.
    pub handle_options: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            redirect_code: 301,
            handle_method_not_allowed: true,
            handle_options: true,
        }
    }
}

impl RouterConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::from_json("{}").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.redirect_code, 301);
    }

    #[test]
    fn test_overrides() {
        let config =
            RouterConfig::from_json(r#"{"handle_method_not_allowed": false, "handle_options": false}"#)
                .unwrap();
        assert!(!config.handle_method_not_allowed);
        assert!(!config.handle_options);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            RouterConfig::from_json("{not json"),
            Err(RouterError::Config(_))
        ));
    }
}
