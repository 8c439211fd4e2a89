
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    He,
    En,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown locale {:?} (expected \"he\" or \"en\")", .0)]
pub struct UnknownLocale(pub String);

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::He => "he",
            Locale::En => "en",
        }
    }

    /// Value for the `dir` attribute of content in this locale
    pub fn dir(self) -> &'static str {
        match self {
            Locale::He => "rtl",
            Locale::En => "ltr",
        }
    }

    /// Pick the string for this locale
    pub fn pick<'a>(self, he: &'a str, en: &'a str) -> &'a str {
        match self {
            Locale::He => he,
            Locale::En => en,
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = UnknownLocale;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "he" | "he-il" | "iw" => Ok(Locale::He),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            _ => Err(UnknownLocale(s.into())),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
