use thiserror::Error;

/// Errors raised while configuring an [`App`](crate::App), parsing tokens, or
/// reading typed results back out of an option.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    /// Invalid option/app construction (bad names, conflicting arity, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A name is already registered in the same app.
    #[error("option name already added: {name}")]
    DuplicateName { name: String },

    /// Wrong number of values for an option, or a single-valued option given twice.
    #[error("argument mismatch for {option}: {reason}")]
    ArgumentMismatch { option: String, reason: String },

    /// A validator rejected a value.
    #[error("invalid value '{value}' for {option}: {reason}")]
    Validation {
        option: String,
        value: String,
        reason: String,
    },

    #[error("{option} is required")]
    RequiredMissing { option: String },

    #[error("a subcommand is required for '{app}'")]
    RequiredSubcommand { app: String },

    /// Typed conversion failed. `value` is `None` when there was nothing to convert.
    #[error("could not convert {} for {option}: {reason}", quoted(.value))]
    Conversion {
        option: String,
        value: Option<String>,
        reason: String,
    },

    #[error("{option} requires {other}")]
    Requires { option: String, other: String },

    #[error("{option} excludes {other}")]
    Excludes { option: String, other: String },

    #[error("unexpected arguments: {}", .tokens.join(" "))]
    Extras { tokens: Vec<String> },

    #[error("no option named {name}")]
    OptionNotFound { name: String },
}

impl ArgError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn mismatch(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArgumentMismatch {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code conventionally associated with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 100,
            Self::DuplicateName { .. } => 102,
            Self::Conversion { .. } => 104,
            Self::Validation { .. } => 105,
            Self::RequiredMissing { .. } | Self::RequiredSubcommand { .. } => 106,
            Self::Requires { .. } => 107,
            Self::Excludes { .. } => 108,
            Self::Extras { .. } => 109,
            Self::OptionNotFound { .. } => 113,
            Self::ArgumentMismatch { .. } => 114,
        }
    }

    /// Errors that describe how the app was built rather than what the user typed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::DuplicateName { .. })
    }
}

fn quoted(value: &Option<String>) -> String {
    match value {
        Some(v) => format!("'{v}'"),
        None => "<none>".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ArgError>;
