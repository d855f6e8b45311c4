use serde::{Deserialize, Serialize};

/// Token ceiling applied to every thinking level other than `off`.
pub const MAX_THINKING_TOKENS_DEFAULT: u32 = 31_999;

/// Extended-thinking setting carried on launch and `set_thinking_level`.
///
/// The value set is open on the wire (`off`, `default_on`, and whatever a
/// newer client sends); the token-budget policy only distinguishes `off`
/// from everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThinkingLevel(String);

impl ThinkingLevel {
    pub const OFF: &'static str = "off";
    pub const DEFAULT_ON: &'static str = "default_on";

    pub fn new(level: impl Into<String>) -> Self {
        Self(level.into())
    }

    pub fn default_on() -> Self {
        Self(Self::DEFAULT_ON.to_string())
    }

    pub fn off() -> Self {
        Self(Self::OFF.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_off(&self) -> bool {
        self.0 == Self::OFF
    }

    pub fn max_thinking_tokens(&self) -> u32 {
        if self.is_off() {
            0
        } else {
            MAX_THINKING_TOKENS_DEFAULT
        }
    }
}

impl Default for ThinkingLevel {
    fn default() -> Self {
        Self::default_on()
    }
}

impl std::fmt::Display for ThinkingLevel {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}
