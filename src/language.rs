//! Closed set of supported languages.
//!
//! Every language can be transcribed. Only those covered by the translation
//! backend's model (mBART-50) can be used as a translation source or target.

use crate::error::{CaptionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! languages {
    ($( $variant:ident => $name:literal, $code:literal, $translatable:literal; )*) => {
        /// A supported transcription language.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Language {
            $($variant,)*
        }

        impl Language {
            pub const ALL: &'static [Language] = &[$(Language::$variant,)*];

            /// Lowercase English name, e.g. `english`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Language::$variant => $name,)*
                }
            }

            /// ISO 639-1 code passed to backends, e.g. `en`.
            pub fn code(self) -> &'static str {
                match self {
                    $(Language::$variant => $code,)*
                }
            }

            pub fn is_translatable(self) -> bool {
                match self {
                    $(Language::$variant => $translatable,)*
                }
            }
        }
    };
}

languages! {
    English => "english", "en", true;
    Hindi => "hindi", "hi", true;
    French => "french", "fr", true;
    German => "german", "de", true;
    Spanish => "spanish", "es", true;
    Italian => "italian", "it", true;
    Portuguese => "portuguese", "pt", true;
    Russian => "russian", "ru", true;
    Japanese => "japanese", "ja", true;
    Chinese => "chinese", "zh", true;
    Korean => "korean", "ko", true;
    Arabic => "arabic", "ar", true;
    Dutch => "dutch", "nl", true;
    Turkish => "turkish", "tr", true;
    Polish => "polish", "pl", true;
    Ukrainian => "ukrainian", "uk", true;
    Vietnamese => "vietnamese", "vi", true;
    Bengali => "bengali", "bn", true;
    Tamil => "tamil", "ta", true;
    Urdu => "urdu", "ur", true;
    Nepali => "nepali", "ne", true;
    Marathi => "marathi", "mr", true;
    Gujarati => "gujarati", "gu", true;
    Indonesian => "indonesian", "id", true;
    Persian => "persian", "fa", true;
    Swedish => "swedish", "sv", true;
    Finnish => "finnish", "fi", true;
    Czech => "czech", "cs", true;
    Romanian => "romanian", "ro", true;
    Hebrew => "hebrew", "he", true;
    Welsh => "welsh", "cy", false;
    Greek => "greek", "el", false;
    Hungarian => "hungarian", "hu", false;
    Danish => "danish", "da", false;
    Catalan => "catalan", "ca", false;
    Latin => "latin", "la", false;
}

impl Language {
    /// Return `self` if it can be used for translation.
    pub fn ensure_translatable(self) -> Result<Self> {
        if self.is_translatable() {
            Ok(self)
        } else {
            Err(CaptionError::UntranslatableLanguage {
                language: self.name().to_string(),
            })
        }
    }

    pub fn translatable() -> impl Iterator<Item = Language> {
        Self::ALL.iter().copied().filter(|l| l.is_translatable())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = CaptionError;

    /// Accepts a name (`english`) or a code (`en`), case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.name() == wanted || l.code() == wanted)
            .ok_or_else(|| CaptionError::UnsupportedLanguage {
                language: s.to_string(),
            })
    }
}

impl TryFrom<String> for Language {
    type Error = CaptionError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.name().to_string()
    }
}
