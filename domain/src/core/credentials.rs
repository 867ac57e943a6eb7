//! Caller identity carried through a request.

use serde::{Deserialize, Serialize};

/// Principal id used when the caller did not identify itself.
pub const ANONYMOUS_PRINCIPAL_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Principal name used when the caller did not identify itself.
pub const ANONYMOUS_PRINCIPAL_NAME: &str = "anonymous";

/// Who is asking, and what they may see.
///
/// Passed explicitly to every tool handler so retrieval can be filtered by
/// the caller's security groups and query engines can act on their behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub principal_id: String,
    pub principal_name: String,
    #[serde(default)]
    pub group_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Credentials {
    pub fn new(principal_id: impl Into<String>, principal_name: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            principal_name: principal_name.into(),
            group_names: Vec::new(),
            access_token: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_PRINCIPAL_ID, ANONYMOUS_PRINCIPAL_NAME)
    }

    pub fn with_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.group_names = groups
            .into_iter()
            .map(Into::into)
            .filter(|g: &String| !g.trim().is_empty())
            .collect();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.principal_id.is_empty() || self.principal_id == ANONYMOUS_PRINCIPAL_ID
    }

    /// Comma-separated identifiers used as the retrieval security filter.
    ///
    /// `"<id>,<group>,<group>"`, or `"anonymous"` for an unidentified caller.
    pub fn security_ids(&self) -> String {
        if self.is_anonymous() {
            return ANONYMOUS_PRINCIPAL_NAME.to_string();
        }
        let mut ids = self.principal_id.clone();
        if !self.group_names.is_empty() {
            ids.push(',');
            ids.push_str(&self.group_names.join(","));
        }
        ids
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_security_ids() {
        assert_eq!(Credentials::anonymous().security_ids(), "anonymous");
        assert_eq!(Credentials::new("", "someone").security_ids(), "anonymous");
    }

    #[test]
    fn security_ids_without_groups() {
        let creds = Credentials::new("user-1", "Ana");
        assert_eq!(creds.security_ids(), "user-1");
    }

    #[test]
    fn security_ids_with_groups() {
        let creds = Credentials::new("user-1", "Ana").with_groups(["finance", " ", "sales"]);
        assert_eq!(creds.security_ids(), "user-1,finance,sales");
    }
}
