use std::error::Error;
use std::fmt;
use std::io;

/// Enumeration of all possible errors that can occur while detecting and splitting scenes
#[derive(Debug)]
pub enum SceneCutError {
    InvalidConfiguration(ConfigError),
    EmptySequence(EmptySequenceError),
    Classifier(ClassifierError),
    Decode(DecodeError),
    Encoding(EncodingError),
    Cancelled,
    Io(io::Error),
}

/// Bad window/stride/threshold or other pipeline parameters
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raised when a stage receives no frames or no probabilities
#[derive(Debug)]
pub struct EmptySequenceError {
    pub stage: &'static str,
}

impl EmptySequenceError {
    pub fn new(stage: &'static str) -> Self {
        Self { stage }
    }
}

/// Classifier collaborator failures (transport, malformed tensor or output shape)
#[derive(Debug)]
pub struct ClassifierError {
    pub message: String,
    /// Window the failure belongs to, when known
    pub window_index: Option<usize>,
}

impl ClassifierError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            window_index: None,
        }
    }

    /// Attach the offending window index.
    pub fn at_window(mut self, window_index: usize) -> Self {
        self.window_index = Some(window_index);
        self
    }
}

/// Demuxing or decoding failures
#[derive(Debug)]
pub struct DecodeError {
    pub message: String,
}

impl DecodeError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Encoding or muxing failures for one scene interval
#[derive(Debug, Clone)]
pub struct EncodingError {
    pub message: String,
    /// Interval the failure belongs to, when known
    pub interval_index: Option<usize>,
}

impl EncodingError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            interval_index: None,
        }
    }

    /// Attach the offending interval index.
    pub fn at_interval(mut self, interval_index: usize) -> Self {
        self.interval_index = Some(interval_index);
        self
    }
}

impl SceneCutError {
    /// Pipeline stage the error originated from, used for user-facing messages
    pub fn stage(&self) -> &'static str {
        match self {
            SceneCutError::InvalidConfiguration(_) => "configuration",
            SceneCutError::EmptySequence(err) => err.stage,
            SceneCutError::Classifier(_) => "inference",
            SceneCutError::Decode(_) => "decode",
            SceneCutError::Encoding(_) => "encode",
            SceneCutError::Cancelled => "cancelled",
            SceneCutError::Io(_) => "io",
        }
    }
}

impl fmt::Display for SceneCutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneCutError::InvalidConfiguration(err) => {
                write!(f, "Invalid configuration: {}", err)
            }
            SceneCutError::EmptySequence(err) => write!(f, "Empty sequence: {}", err),
            SceneCutError::Classifier(err) => write!(f, "Classifier error: {}", err),
            SceneCutError::Decode(err) => write!(f, "Decode error: {}", err),
            SceneCutError::Encoding(err) => write!(f, "Encoding error: {}", err),
            SceneCutError::Cancelled => write!(f, "Pipeline cancelled"),
            SceneCutError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for EmptySequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nothing to process in {} stage", self.stage)
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window_index {
            Some(index) => write!(f, "window {}: {}", index, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.interval_index {
            Some(index) => write!(f, "interval {}: {}", index, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for SceneCutError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SceneCutError::Io(err) => Some(err),
            _ => None,
        }
    }
}
impl Error for ConfigError {}
impl Error for EmptySequenceError {}
impl Error for ClassifierError {}
impl Error for DecodeError {}
impl Error for EncodingError {}

// Conversion implementations
impl From<io::Error> for SceneCutError {
    fn from(err: io::Error) -> Self {
        SceneCutError::Io(err)
    }
}

impl From<ConfigError> for SceneCutError {
    fn from(err: ConfigError) -> Self {
        SceneCutError::InvalidConfiguration(err)
    }
}

impl From<EmptySequenceError> for SceneCutError {
    fn from(err: EmptySequenceError) -> Self {
        SceneCutError::EmptySequence(err)
    }
}

impl From<ClassifierError> for SceneCutError {
    fn from(err: ClassifierError) -> Self {
        SceneCutError::Classifier(err)
    }
}

impl From<DecodeError> for SceneCutError {
    fn from(err: DecodeError) -> Self {
        SceneCutError::Decode(err)
    }
}

impl From<EncodingError> for SceneCutError {
    fn from(err: EncodingError) -> Self {
        SceneCutError::Encoding(err)
    }
}

// Conversion to io::Error for callers that only deal in io results
impl From<SceneCutError> for io::Error {
    fn from(err: SceneCutError) -> Self {
        match err {
            SceneCutError::Io(inner) => inner,
            other => io::Error::other(other),
        }
    }
}

// Type alias for Result with SceneCutError
pub type SceneCutResult<T> = Result<T, SceneCutError>;
