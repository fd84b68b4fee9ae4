//! Response tones and the question prompt template.

use std::fmt;
use std::str::FromStr;

/// Response style preset chosen per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Formal,
    Friendly,
}

impl Tone {
    pub fn all() -> &'static [Tone] {
        &[Tone::Formal, Tone::Friendly]
    }

    /// Label stored in the log's Style column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formal => "Formal",
            Self::Friendly => "Friendly",
        }
    }

    /// Label shown on the tone selector.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Formal => "Professional 🎓",
            Self::Friendly => "Conversational 🗨️",
        }
    }

    pub fn instruction(&self) -> &'static str {
        instruction_for(self.as_str())
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::Formal => Self::Friendly,
            Self::Friendly => Self::Formal,
        }
    }
}

/// Accepts the style labels plus the selector's names, case-insensitively.
impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "formal" | "professional" => Ok(Self::Formal),
            "friendly" | "conversational" => Ok(Self::Friendly),
            _ => Err(format!("unknown tone '{s}' (formal/professional or friendly/conversational)")),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruction sentence for a style label. Unknown labels get no instruction.
pub fn instruction_for(style: &str) -> &'static str {
    match style {
        "Formal" => "Please respond in a professional and formal tone.",
        "Friendly" => "Please respond in a warm and friendly tone, as if chatting casually.",
        _ => "",
    }
}

/// Fill the fixed template with the document text, question and tone instruction.
pub fn compose_prompt(content: &str, question: &str, style: &str) -> String {
    let instruction = instruction_for(style);
    format!(
        "\nContent:\n{content}\n\nQuestion:\n{question}\n\n{instruction}\n\n\
         Provide a short, clear response.\n"
    )
}
