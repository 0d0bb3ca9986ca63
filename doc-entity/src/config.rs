use crate::{codec::DecodeOptions, error::Error};

pub const DEFAULT_BRANCH: &str = "main";

/// Client settings carried into every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub project: String,
    pub branch: String,
    /// Decode integers beyond `2^53 - 1` as numbers instead of strings.
    pub support_big_int: bool,
}

impl Config {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            branch: DEFAULT_BRANCH.to_string(),
            support_big_int: true,
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn support_big_int(mut self, enabled: bool) -> Self {
        self.support_big_int = enabled;
        self
    }

    /// Reads `DOC_ENTITY_PROJECT` (required), `DOC_ENTITY_BRANCH` and
    /// `DOC_ENTITY_SUPPORT_BIGINT`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let project = lookup("DOC_ENTITY_PROJECT")
            .filter(|project| !project.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig("DOC_ENTITY_PROJECT is not set".to_string()))?;
        let mut config = Config::new(project.trim());

        if let Some(branch) = lookup("DOC_ENTITY_BRANCH") {
            if !branch.trim().is_empty() {
                config.branch = branch.trim().to_string();
            }
        }

        if let Some(value) = lookup("DOC_ENTITY_SUPPORT_BIGINT") {
            config.support_big_int = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(Error::InvalidConfig(format!(
                        "DOC_ENTITY_SUPPORT_BIGINT must be a boolean, got `{other}`"
                    )));
                }
            };
        }

        Ok(config)
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            support_big_int: self.support_big_int,
        }
    }
}
