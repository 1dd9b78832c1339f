//! Directory user models returned by the user lookup service.

use serde::Deserialize;

/// A directory entry as returned by user search.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

/// The signed-in user's own profile.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Returns the mail address when the directory has one on file.
    pub fn email(&self) -> Option<String> {
        self.mail
            .as_deref()
            .map(str::trim)
            .filter(|mail| !mail.is_empty())
            .map(str::to_string)
    }
}
