use serde::{Deserialize, Serialize};

/// Output format the generated script can be previewed and saved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFormat {
    #[default]
    Txt,
    Json,
    Html,
}

impl ScriptFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptFormat::Txt => "txt",
            ScriptFormat::Json => "json",
            ScriptFormat::Html => "html",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "txt" | "text" => Some(ScriptFormat::Txt),
            "json" => Some(ScriptFormat::Json),
            "html" => Some(ScriptFormat::Html),
            _ => None,
        }
    }

    pub fn all() -> Vec<ScriptFormat> {
        vec![ScriptFormat::Txt, ScriptFormat::Json, ScriptFormat::Html]
    }

    /// The format after this one, wrapping around.
    pub fn next(&self) -> Self {
        match self {
            ScriptFormat::Txt => ScriptFormat::Json,
            ScriptFormat::Json => ScriptFormat::Html,
            ScriptFormat::Html => ScriptFormat::Txt,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ScriptFormat::Txt => "Plain text (.txt)",
            ScriptFormat::Json => "JSON (.json)",
            ScriptFormat::Html => "HTML (.html)",
        }
    }
}

impl std::fmt::Display for ScriptFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
