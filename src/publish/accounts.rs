//! Mapping a sender's email address to a tracker account.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::AccountsConfig;
use crate::error::Result;

/// One source of email → login knowledge (repository owner, organization
/// members, collaborators...).
pub trait AccountLookup {
    /// Short name used in logs.
    fn source(&self) -> &str;

    /// The login registered for `email`, if any.
    fn find_login(&self, email: &str) -> Result<Option<String>>;
}

/// Ask each source in order and return the first login found.
///
/// A failing source counts as "no match": lookup errors are logged and never
/// stop the issue from being created.
pub fn resolve_author(sources: &[&dyn AccountLookup], email: &str) -> Option<String> {
    if email.is_empty() {
        return None;
    }
    for source in sources {
        match source.find_login(email) {
            Ok(Some(login)) => {
                debug!(source = source.source(), login = %login, "Resolved sender");
                return Some(login);
            }
            Ok(None) => {}
            Err(e) => {
                debug!(source = source.source(), error = %e, "Account lookup failed, ignoring");
            }
        }
    }
    None
}

/// A fixed email → login table.
#[derive(Debug, Clone, Default)]
pub struct StaticAccounts {
    source: String,
    logins: BTreeMap<String, String>,
}

impl StaticAccounts {
    pub fn new(source: impl Into<String>, logins: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            source: source.into(),
            logins: logins
                .into_iter()
                .map(|(email, login)| (email.trim().to_lowercase(), login))
                .collect(),
        }
    }

    /// Owner, members, collaborators: the lookup chain described by `[accounts]`.
    pub fn chain_from_config(config: &AccountsConfig) -> Vec<Self> {
        let owner = config
            .owner
            .iter()
            .map(|o| (o.email.clone(), o.login.clone()));
        vec![
            Self::new("owner", owner),
            Self::new("members", config.members.clone()),
            Self::new("collaborators", config.collaborators.clone()),
        ]
    }
}

impl AccountLookup for StaticAccounts {
    fn source(&self) -> &str {
        &self.source
    }

    fn find_login(&self, email: &str) -> Result<Option<String>> {
        Ok(self.logins.get(&email.trim().to_lowercase()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountEntry;
    use crate::error::MailError;

    struct Broken;

    impl AccountLookup for Broken {
        fn source(&self) -> &str {
            "broken"
        }

        fn find_login(&self, _email: &str) -> Result<Option<String>> {
            Err(MailError::Tracker("401 Unauthorized".into()))
        }
    }

    #[test]
    fn test_first_source_wins() {
        let owner = StaticAccounts::new("owner", [("boss@acme.test".to_string(), "boss".to_string())]);
        let members = StaticAccounts::new("members", [("Boss@Acme.test".to_string(), "other".to_string())]);
        let sources: [&dyn AccountLookup; 2] = [&owner, &members];
        assert_eq!(resolve_author(&sources, "boss@acme.test").as_deref(), Some("boss"));
    }

    #[test]
    fn test_failing_source_is_skipped() {
        let members = StaticAccounts::new("members", [("dev@acme.test".to_string(), "dev".to_string())]);
        let sources: [&dyn AccountLookup; 2] = [&Broken, &members];
        assert_eq!(resolve_author(&sources, "dev@acme.test").as_deref(), Some("dev"));
        assert_eq!(resolve_author(&sources, "stranger@else.test"), None);
        assert_eq!(resolve_author(&sources, ""), None);
    }

    #[test]
    fn test_chain_from_config_order() {
        let mut config = AccountsConfig {
            owner: Some(AccountEntry {
                login: "boss".into(),
                email: "boss@acme.test".into(),
            }),
            ..Default::default()
        };
        config.collaborators.insert("ext@partner.test".into(), "ext".into());

        let chain = StaticAccounts::chain_from_config(&config);
        let names: Vec<&str> = chain.iter().map(|s| s.source()).collect();
        assert_eq!(names, ["owner", "members", "collaborators"]);

        let sources: Vec<&dyn AccountLookup> = chain.iter().map(|s| s as &dyn AccountLookup).collect();
        assert_eq!(resolve_author(&sources, "EXT@partner.test").as_deref(), Some("ext"));
    }
}
