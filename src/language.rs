use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ENDPOINT_BASE: &str =
    "wss://speech.platform.bing.com/speech/recognition/interactive/cognitiveservices/v1";

/// Interactive recognition mode languages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageMode {
    #[serde(rename = "ar-EG")]
    ArEg,
    #[serde(rename = "ca-ES")]
    CaEs,
    #[serde(rename = "da-DK")]
    DaDk,
    #[serde(rename = "de-DE")]
    DeDe,
    #[serde(rename = "en-AU")]
    EnAu,
    #[serde(rename = "en-CA")]
    EnCa,
    #[default]
    #[serde(rename = "en-GB")]
    EnGb,
    #[serde(rename = "en-IN")]
    EnIn,
    #[serde(rename = "en-NZ")]
    EnNz,
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "es-ES")]
    EsEs,
    #[serde(rename = "es-MX")]
    EsMx,
    #[serde(rename = "fi-FI")]
    FiFi,
    #[serde(rename = "fr-CA")]
    FrCa,
    #[serde(rename = "fr-FR")]
    FrFr,
    #[serde(rename = "hi-IN")]
    HiIn,
    #[serde(rename = "it-IT")]
    ItIt,
    #[serde(rename = "ja-JP")]
    JaJp,
    #[serde(rename = "ko-KR")]
    KoKr,
    #[serde(rename = "nb-NO")]
    NbNo,
    #[serde(rename = "nl-NL")]
    NlNl,
    #[serde(rename = "pl-PL")]
    PlPl,
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "pt-PT")]
    PtPt,
    #[serde(rename = "ru-RU")]
    RuRu,
    #[serde(rename = "sv-SE")]
    SvSe,
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "zh-HK")]
    ZhHk,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl LanguageMode {
    pub const ALL: [LanguageMode; 29] = [
        LanguageMode::ArEg,
        LanguageMode::CaEs,
        LanguageMode::DaDk,
        LanguageMode::DeDe,
        LanguageMode::EnAu,
        LanguageMode::EnCa,
        LanguageMode::EnGb,
        LanguageMode::EnIn,
        LanguageMode::EnNz,
        LanguageMode::EnUs,
        LanguageMode::EsEs,
        LanguageMode::EsMx,
        LanguageMode::FiFi,
        LanguageMode::FrCa,
        LanguageMode::FrFr,
        LanguageMode::HiIn,
        LanguageMode::ItIt,
        LanguageMode::JaJp,
        LanguageMode::KoKr,
        LanguageMode::NbNo,
        LanguageMode::NlNl,
        LanguageMode::PlPl,
        LanguageMode::PtBr,
        LanguageMode::PtPt,
        LanguageMode::RuRu,
        LanguageMode::SvSe,
        LanguageMode::ZhCn,
        LanguageMode::ZhHk,
        LanguageMode::ZhTw,
    ];

    /// BCP-47 style code, e.g. `en-GB`
    pub fn code(&self) -> &'static str {
        match self {
            LanguageMode::ArEg => "ar-EG",
            LanguageMode::CaEs => "ca-ES",
            LanguageMode::DaDk => "da-DK",
            LanguageMode::DeDe => "de-DE",
            LanguageMode::EnAu => "en-AU",
            LanguageMode::EnCa => "en-CA",
            LanguageMode::EnGb => "en-GB",
            LanguageMode::EnIn => "en-IN",
            LanguageMode::EnNz => "en-NZ",
            LanguageMode::EnUs => "en-US",
            LanguageMode::EsEs => "es-ES",
            LanguageMode::EsMx => "es-MX",
            LanguageMode::FiFi => "fi-FI",
            LanguageMode::FrCa => "fr-CA",
            LanguageMode::FrFr => "fr-FR",
            LanguageMode::HiIn => "hi-IN",
            LanguageMode::ItIt => "it-IT",
            LanguageMode::JaJp => "ja-JP",
            LanguageMode::KoKr => "ko-KR",
            LanguageMode::NbNo => "nb-NO",
            LanguageMode::NlNl => "nl-NL",
            LanguageMode::PlPl => "pl-PL",
            LanguageMode::PtBr => "pt-BR",
            LanguageMode::PtPt => "pt-PT",
            LanguageMode::RuRu => "ru-RU",
            LanguageMode::SvSe => "sv-SE",
            LanguageMode::ZhCn => "zh-CN",
            LanguageMode::ZhHk => "zh-HK",
            LanguageMode::ZhTw => "zh-TW",
        }
    }

    /// Recognition endpoint for this language (simple result format)
    pub fn endpoint(&self) -> String {
        format!("{}?format=simple&language={}", ENDPOINT_BASE, self.code())
    }
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LanguageMode {
    type Err = String;

    /// Accepts `en-GB` as well as `en_GB`, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.code().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unsupported language: {}", s))
    }
}
