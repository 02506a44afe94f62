use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

pub const DEFAULT_CLIENT_VERSION: &str = "2.0.12341";

/// Body of the `speech.config` handshake message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub system: ContextSystem,
    pub os: ContextOs,
    pub device: ContextDevice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSystem {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOs {
    pub platform: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDevice {
    pub manufacturer: String,
    pub model: String,
    pub version: String,
}

static OS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)on\s([0-9]{2}\sbit\s)?([A-Za-z0-9\s]*)$").expect("valid regex"));
static VERSION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+\.[0-9]+(\.[0-9]+)?(\.[0-9]+)?").expect("valid regex"));
static LEADING_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("valid regex"));
static DEVICE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9.,]+").expect("valid regex"));

impl SpeechConfig {
    /// Build the context from free-form OS and device descriptions
    ///
    /// `os_description` looks like `"Windows 10 (10.0.0) 64bit"` or
    /// `"Linux 6.1 on 64 bit Ubuntu"`; `device_model` like `"MacBookPro14,3"`.
    pub fn from_descriptors(version: &str, os_description: &str, device_model: &str) -> Self {
        Self {
            system: ContextSystem {
                version: version.to_string(),
            },
            os: ContextOs {
                platform: platform_name(std::env::consts::OS),
                name: os_name(os_description),
                version: first_match(&VERSION_NUMBER, os_description),
            },
            device: ContextDevice {
                manufacturer: first_match(&LEADING_WORD, device_model),
                model: device_model.to_string(),
                version: first_match(&DEVICE_VERSION, device_model),
            },
        }
    }

    /// Context for the running host
    pub fn detect(version: &str) -> Self {
        let platform = platform_name(std::env::consts::OS);
        Self {
            system: ContextSystem {
                version: version.to_string(),
            },
            os: ContextOs {
                platform: platform.clone(),
                name: platform,
                version: String::new(),
            },
            device: ContextDevice {
                manufacturer: String::new(),
                model: std::env::consts::ARCH.to_string(),
                version: String::new(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, SpeechError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self::detect(DEFAULT_CLIENT_VERSION)
    }
}

/// Map a Rust target OS name to the platform label the service expects
pub fn platform_name(os: &str) -> String {
    match os {
        "windows" => "Windows",
        "macos" => "Mac",
        "linux" => "Linux",
        "ios" => "iOS",
        "android" => "Android",
        other => other,
    }
    .to_string()
}

fn os_name(description: &str) -> String {
    if description.contains("Mac OS X") {
        return "Mac OS X".to_string();
    }
    OS_NAME
        .captures(description)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| description.to_string())
}

/// First match of `re`, or the whole input when nothing matches
fn first_match(re: &Regex, input: &str) -> String {
    re.find(input)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| input.to_string())
}

/// `speech.hypothesis` body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechHypothesis {
    pub text: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub duration: u64,
}

/// `speech.phrase` body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechPhrase {
    pub recognition_status: String,
    #[serde(default)]
    pub display_text: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub duration: u64,
}

impl SpeechPhrase {
    pub fn is_success(&self) -> bool {
        self.recognition_status == "Success"
    }
}

/// `speech.startDetected` / `speech.endDetected` body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechDetected {
    #[serde(default)]
    pub offset: u64,
}

/// `turn.start` body
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TurnStart {
    #[serde(default)]
    pub context: TurnContext,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnContext {
    #[serde(default)]
    pub service_tag: Option<String>,
}

/// Parse the first JSON value in `body`, ignoring anything after it
pub fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, SpeechError> {
    let mut values = serde_json::Deserializer::from_str(body).into_iter::<T>();
    match values.next() {
        Some(value) => value
            .map_err(|e| SpeechError::MalformedMessage(format!("invalid JSON body: {}", e))),
        None => Err(SpeechError::MalformedMessage("empty JSON body".into())),
    }
}
