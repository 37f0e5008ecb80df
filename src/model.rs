use serde::Deserialize;

use crate::{app_err, error::AppError};

/// A single entry of `okteto preview endpoints --output=json`.
#[derive(Debug, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub private: bool,
}

#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Result<Self, AppError> {
        let token = token.into();
        if token.trim().is_empty() {
            return app_err!(Input, "Okteto token is empty");
        }
        Ok(Self(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiToken(***)")
    }
}

/// Name of a preview environment. Okteto only accepts lowercase names, so the
/// branch is lowercased on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewName(String);

impl PreviewName {
    pub fn from_branch(branch: &str) -> Result<Self, AppError> {
        if branch.trim().is_empty() {
            return app_err!(Input, "Branch name is empty");
        }
        Ok(Self(branch.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
