use thiserror::Error;

pub type RadResult<T> = Result<T, RadError>;

/// What went wrong, which fixes the process exit code and the placeholder
/// prefix (`INPUT.`, `IO.`, `RUN.`, `SYS.`) errors of that kind carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadErrorCategory {
    /// Bad configuration: windows, rules, concentrations, stored profiles
    /// built with other settings.
    InputValidationError,
    IoSystemError,
    /// Numerical failure on valid input.
    ComputationError,
    /// A broken internal invariant such as an out-of-order state transition.
    InternalError,
}

impl RadErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn placeholder_prefix(self) -> &'static str {
        match self {
            Self::InputValidationError => "INPUT",
            Self::IoSystemError => "IO",
            Self::ComputationError => "RUN",
            Self::InternalError => "SYS",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InputValidationError => "input error",
            Self::IoSystemError => "i/o error",
            Self::ComputationError => "computation error",
            Self::InternalError => "internal error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} [{placeholder}] {message}", category.label())]
pub struct RadError {
    category: RadErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl RadError {
    pub fn new(
        category: RadErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RadErrorCategory::InputValidationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RadErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RadErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RadErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> RadErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    /// `ERROR: [PLACEHOLDER] message`, the first line printed on exit.
    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}
