//! Structured command templates.
//!
//! A template is an ordered list of argument slots. Each slot is a literal,
//! one of a fixed set of placeholders, or an optional group that is dropped
//! as a whole when one of its placeholders has no value. Resolution yields an
//! argument vector that is handed directly to process creation, so quoting
//! never goes through a shell.
//!
//! In preset files a template is a JSON array; nested arrays are optional
//! groups:
//!
//! ```json
//! ["ffmpeg", "-ss", "{start}", "-i", "{input}", ["-t", "{duration}"], "{output}"]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing or resolving a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,

    #[error("template must start with a program name")]
    MissingProgram,

    #[error("unknown placeholder {0}")]
    UnknownPlaceholder(String),

    #[error("placeholder must be a whole argument, found {0:?}")]
    EmbeddedPlaceholder(String),

    #[error("optional groups cannot be nested or empty")]
    InvalidGroup,

    #[error("template is missing required placeholder {0}")]
    MissingPlaceholder(Placeholder),

    #[error("placeholder {0} must be inside an optional group")]
    MustBeOptional(Placeholder),

    #[error("no value bound for {0}")]
    Unbound(Placeholder),
}

/// Substitution points supported by templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Input,
    Output,
    Start,
    Duration,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::Input,
        Placeholder::Output,
        Placeholder::Start,
        Placeholder::Duration,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Input => "{input}",
            Placeholder::Output => "{output}",
            Placeholder::Start => "{start}",
            Placeholder::Duration => "{duration}",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// One position in a command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSlot {
    Literal(String),
    Placeholder(Placeholder),
    /// Emitted only when every placeholder inside is bound.
    Optional(Vec<ArgSlot>),
}

impl ArgSlot {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    fn parse(token: &str) -> Result<Self, TemplateError> {
        if token.starts_with('{') && token.ends_with('}') {
            return Placeholder::from_token(token)
                .map(ArgSlot::Placeholder)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(token.to_string()));
        }

        if Placeholder::ALL.iter().any(|p| token.contains(p.token())) {
            return Err(TemplateError::EmbeddedPlaceholder(token.to_string()));
        }

        Ok(ArgSlot::Literal(token.to_string()))
    }

    fn placeholders(&self) -> Vec<Placeholder> {
        match self {
            ArgSlot::Literal(_) => Vec::new(),
            ArgSlot::Placeholder(p) => vec![*p],
            ArgSlot::Optional(slots) => slots.iter().flat_map(ArgSlot::placeholders).collect(),
        }
    }

    fn to_token(&self) -> TemplateToken {
        match self {
            ArgSlot::Literal(value) => TemplateToken::Arg(value.clone()),
            ArgSlot::Placeholder(p) => TemplateToken::Arg(p.token().to_string()),
            ArgSlot::Optional(slots) => TemplateToken::Group(
                slots
                    .iter()
                    .map(|slot| match slot {
                        ArgSlot::Literal(value) => value.clone(),
                        ArgSlot::Placeholder(p) => p.token().to_string(),
                        ArgSlot::Optional(_) => String::new(),
                    })
                    .collect(),
            ),
        }
    }
}

/// Serialized form of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateToken {
    Arg(String),
    Group(Vec<String>),
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<Placeholder, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.set(Placeholder::Input, path.as_ref().to_string_lossy())
    }

    pub fn output(self, path: impl AsRef<Path>) -> Self {
        self.set(Placeholder::Output, path.as_ref().to_string_lossy())
    }

    /// Start offset in seconds, microsecond precision.
    pub fn start(self, seconds: f64) -> Self {
        self.set(Placeholder::Start, format!("{:.6}", seconds))
    }

    /// Duration in seconds; `None` leaves the placeholder unbound.
    pub fn duration(self, seconds: Option<f64>) -> Self {
        match seconds {
            Some(seconds) => self.set(Placeholder::Duration, format!("{:.4}", seconds)),
            None => self,
        }
    }

    fn set(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.values.insert(placeholder, value.into());
        self
    }

    fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }
}

/// An ordered list of argument slots, program first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TemplateToken>", into = "Vec<TemplateToken>")]
pub struct CommandTemplate {
    slots: Vec<ArgSlot>,
}

impl CommandTemplate {
    /// Build from slots, checking the program position and group shape.
    pub fn new(slots: Vec<ArgSlot>) -> Result<Self, TemplateError> {
        match slots.first() {
            None => return Err(TemplateError::Empty),
            Some(ArgSlot::Literal(program)) if !program.is_empty() => {}
            Some(_) => return Err(TemplateError::MissingProgram),
        }

        for slot in &slots {
            if let ArgSlot::Optional(group) = slot {
                if group.is_empty() || group.iter().any(|s| matches!(s, ArgSlot::Optional(_))) {
                    return Err(TemplateError::InvalidGroup);
                }
            }
        }

        Ok(Self { slots })
    }

    /// Parse from serialized tokens.
    pub fn from_tokens(tokens: Vec<TemplateToken>) -> Result<Self, TemplateError> {
        let slots = tokens
            .into_iter()
            .map(|token| match token {
                TemplateToken::Arg(arg) => ArgSlot::parse(&arg),
                TemplateToken::Group(args) => args
                    .iter()
                    .map(|arg| ArgSlot::parse(arg))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ArgSlot::Optional),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(slots)
    }

    /// Program name (first slot).
    pub fn program(&self) -> &str {
        match self.slots.first() {
            Some(ArgSlot::Literal(program)) => program,
            _ => "",
        }
    }

    pub fn slots(&self) -> &[ArgSlot] {
        &self.slots
    }

    /// Whether `placeholder` appears anywhere, including optional groups.
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.slots
            .iter()
            .flat_map(ArgSlot::placeholders)
            .any(|p| p == placeholder)
    }

    /// Check that every placeholder in `required` appears somewhere.
    pub fn require(&self, required: &[Placeholder]) -> Result<(), TemplateError> {
        match required.iter().find(|p| !self.uses(**p)) {
            Some(missing) => Err(TemplateError::MissingPlaceholder(*missing)),
            None => Ok(()),
        }
    }

    /// Check that `placeholder` never appears outside an optional group.
    pub fn require_optional(&self, placeholder: Placeholder) -> Result<(), TemplateError> {
        let bare = self
            .slots
            .iter()
            .any(|slot| matches!(slot, ArgSlot::Placeholder(p) if *p == placeholder));
        if bare {
            Err(TemplateError::MustBeOptional(placeholder))
        } else {
            Ok(())
        }
    }

    /// Substitute `bindings` into an argument vector.
    pub fn resolve(&self, bindings: &Bindings) -> Result<Vec<String>, TemplateError> {
        let mut args = Vec::with_capacity(self.slots.len());

        for slot in &self.slots {
            match slot {
                ArgSlot::Literal(value) => args.push(value.clone()),
                ArgSlot::Placeholder(p) => {
                    let value = bindings.get(*p).ok_or(TemplateError::Unbound(*p))?;
                    args.push(value.to_string());
                }
                ArgSlot::Optional(group) => {
                    let bound = group
                        .iter()
                        .flat_map(ArgSlot::placeholders)
                        .all(|p| bindings.get(p).is_some());
                    if !bound {
                        continue;
                    }
                    for inner in group {
                        match inner {
                            ArgSlot::Literal(value) => args.push(value.clone()),
                            ArgSlot::Placeholder(p) => {
                                let value = bindings.get(*p).ok_or(TemplateError::Unbound(*p))?;
                                args.push(value.to_string());
                            }
                            ArgSlot::Optional(_) => return Err(TemplateError::InvalidGroup),
                        }
                    }
                }
            }
        }

        Ok(args)
    }
}

impl TryFrom<Vec<TemplateToken>> for CommandTemplate {
    type Error = TemplateError;

    fn try_from(tokens: Vec<TemplateToken>) -> Result<Self, Self::Error> {
        Self::from_tokens(tokens)
    }
}

impl From<CommandTemplate> for Vec<TemplateToken> {
    fn from(template: CommandTemplate) -> Self {
        template.slots.iter().map(ArgSlot::to_token).collect()
    }
}
