use serde::{Deserialize, Serialize};

/// Group identifier the identity provider assigns to users authenticated by an
/// external identity provider who are not members of the tenant.
pub const EXTERNAL_USER_GROUP_ID: &str = "3E093BE5-CCCE-435D-99F8-544656B98681";

/// Email address attached to a principal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Email {
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

/// Group membership of a principal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    /// Opaque group identifier
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Identity resolved by the identity provider for a credential
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Principal {
    /// Stable user identifier, empty for external-only principals
    pub id: String,
    pub user_name: String,
    pub display_name: String,
    pub emails: Vec<Email>,
    pub groups: Vec<Group>,
}

impl Principal {
    /// True if the principal was authenticated by an external identity provider
    /// without being a known user of the tenant.
    pub fn is_external(&self) -> bool {
        self.groups
            .iter()
            .any(|g| g.value.eq_ignore_ascii_case(EXTERNAL_USER_GROUP_ID))
    }

    /// First email marked as primary, or the first email listed
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary == Some(true))
            .or_else(|| self.emails.first())
            .map(|e| e.value.as_str())
    }
}

/// Bearer credential that authenticated the current request.
///
/// Published next to the [`Principal`] in the request extensions so handlers
/// can present the same credential to further platform calls.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<sensitive>)")
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<sensitive credential>")
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value)
    }
}
