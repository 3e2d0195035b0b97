//! Read-only invocation argument store

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ActionBinding, BridgeError};

/// Invocation-time parameters for one script run.
///
/// Populated once from `--key=value` tokens before the script starts and
/// immutable for the lifetime of the run. Each run gets its own store;
/// concurrent runs never share one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationArgs {
    values: HashMap<String, String>,
}

impl InvocationArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw invocation tokens.
    ///
    /// `--action="Label|URI"` is reserved for the host: it is returned
    /// separately and never enters the store. Tokens that are not
    /// `--key=value` pairs are ignored, and duplicate keys keep their
    /// first occurrence.
    pub fn parse<I, S>(tokens: I) -> Result<(Self, Option<ActionBinding>), BridgeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = HashMap::new();
        let mut action = None;
        for token in tokens {
            let Some(rest) = token.as_ref().strip_prefix("--") else {
                continue;
            };
            let Some((key, value)) = rest.split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            if key == "action" {
                let binding = ActionBinding::parse(value)?;
                action.get_or_insert(binding);
                continue;
            }
            values
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
        Ok((Self { values }, action))
    }

    /// Build a store from already-split pairs, e.g. an action URI query.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut values = HashMap::new();
        for (key, value) in pairs {
            values.entry(key).or_insert(value);
        }
        Self { values }
    }

    /// Look up a value. Absence is a value, not an error.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs() {
        let (args, action) =
            InvocationArgs::parse(["--name=test", "--count=3"]).expect("parse");
        assert!(action.is_none());
        assert_eq!(args.get("name"), Some("test"));
        assert_eq!(args.get("count"), Some("3"));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn absent_keys_are_none() {
        let (args, _) = InvocationArgs::parse(["--name=test"]).expect("parse");
        assert_eq!(args.get("missing"), None);
    }

    #[test]
    fn first_occurrence_wins() {
        let (args, _) =
            InvocationArgs::parse(["--name=first", "--name=second"]).expect("parse");
        assert_eq!(args.get("name"), Some("first"));
    }

    #[test]
    fn ignores_non_flag_tokens() {
        let (args, _) =
            InvocationArgs::parse(["script.js", "--name=test", "--bare", "-x=1"])
                .expect("parse");
        assert_eq!(args.len(), 1);
        assert_eq!(args.get("name"), Some("test"));
    }

    #[test]
    fn value_may_contain_equals() {
        let (args, _) = InvocationArgs::parse(["--query=a=b"]).expect("parse");
        assert_eq!(args.get("query"), Some("a=b"));
    }

    #[test]
    fn action_is_reserved_for_the_host() {
        let (args, action) = InvocationArgs::parse([
            "--name=test",
            "--action=Test|chanify://action/run-script/test?name=test",
        ])
        .expect("parse");
        assert_eq!(args.get("action"), None);
        let action = action.expect("binding");
        assert_eq!(action.label, "Test");
        assert_eq!(action.uri, "chanify://action/run-script/test?name=test");
    }

    #[test]
    fn malformed_action_is_rejected() {
        let result = InvocationArgs::parse(["--action=NoPipeHere"]);
        assert!(matches!(result, Err(BridgeError::MalformedAction(_))));
    }
}
