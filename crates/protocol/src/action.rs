//! Action bindings and action URIs

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{BridgeError, InvocationArgs};

/// A `Label|URI` pair supplied with `--action`.
///
/// Registered by the host before the script runs; never exposed to the
/// script itself. The label is the human-readable action name, the URI
/// is what an external app opens to re-trigger the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBinding {
    pub label: String,
    pub uri: String,
}

impl ActionBinding {
    /// Parse the raw `--action` value. The URI half must itself be a
    /// well-formed action URI.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let Some((label, uri)) = raw.split_once('|') else {
            return Err(BridgeError::MalformedAction(format!(
                "expected Label|URI, got {raw:?}"
            )));
        };
        if label.is_empty() || uri.is_empty() {
            return Err(BridgeError::MalformedAction(
                "label and URI must both be non-empty".into(),
            ));
        }
        ActionUri::parse(uri)?;
        Ok(Self {
            label: label.to_string(),
            uri: uri.to_string(),
        })
    }
}

/// A custom-scheme URI of the form `scheme://action/<name>/<path>?<query>`.
///
/// Opening one externally causes the host to re-run the bound script with
/// the query pairs as its invocation arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionUri {
    pub scheme: String,
    /// Action name, the first path segment after the `action` host
    pub action: String,
    /// Remaining path segments
    pub path: Vec<String>,
    /// Query pairs in order of appearance
    pub params: Vec<(String, String)>,
}

impl ActionUri {
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let url = Url::parse(raw)
            .map_err(|e| BridgeError::MalformedAction(format!("{raw:?}: {e}")))?;
        if url.host_str() != Some("action") {
            return Err(BridgeError::MalformedAction(format!(
                "expected <scheme>://action/..., got {raw:?}"
            )));
        }
        let mut segments: Vec<String> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        if segments.is_empty() {
            return Err(BridgeError::MalformedAction(format!(
                "missing action name in {raw:?}"
            )));
        }
        let action = segments.remove(0);
        let params = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Self {
            scheme: url.scheme().to_string(),
            action,
            path: segments,
            params,
        })
    }

    /// Rebuild the argument store a re-triggered run should see.
    #[must_use]
    pub fn invocation_args(&self) -> InvocationArgs {
        InvocationArgs::from_pairs(self.params.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_action_uri() {
        let uri =
            ActionUri::parse("chanify://action/run-script/test?name=test").expect("parse");
        assert_eq!(uri.scheme, "chanify");
        assert_eq!(uri.action, "run-script");
        assert_eq!(uri.path, vec!["test".to_string()]);
        assert_eq!(uri.params, vec![("name".to_string(), "test".to_string())]);
    }

    #[test]
    fn retriggered_uri_rebuilds_invocation_args() {
        let uri =
            ActionUri::parse("chanify://action/run-script/test?name=test&n=2").expect("parse");
        let args = uri.invocation_args();
        assert_eq!(args.get("name"), Some("test"));
        assert_eq!(args.get("n"), Some("2"));
        assert_eq!(args.get("absent"), None);
    }

    #[test]
    fn rejects_non_action_host() {
        let result = ActionUri::parse("chanify://send/run-script/test");
        assert!(matches!(result, Err(BridgeError::MalformedAction(_))));
    }

    #[test]
    fn rejects_missing_action_name() {
        let result = ActionUri::parse("chanify://action");
        assert!(matches!(result, Err(BridgeError::MalformedAction(_))));
    }

    #[test]
    fn rejects_unparseable_uri() {
        let result = ActionUri::parse("not a uri at all");
        assert!(matches!(result, Err(BridgeError::MalformedAction(_))));
    }

    #[test]
    fn binding_requires_pipe_delimiter() {
        assert!(ActionBinding::parse("Test|chanify://action/run/x?a=1").is_ok());
        assert!(matches!(
            ActionBinding::parse("JustALabel"),
            Err(BridgeError::MalformedAction(_))
        ));
        assert!(matches!(
            ActionBinding::parse("|chanify://action/run/x"),
            Err(BridgeError::MalformedAction(_))
        ));
    }
}
