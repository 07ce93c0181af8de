use std::error::Error;
use std::fmt::Display;

#[derive(Debug)]
pub enum EditorError {
    /// A node was asked for a value of a type it isn't bound to. This is a bug in the caller
    TypeMismatch {
        label: String,
        expected: &'static str,
    },
    /// A node without any value was asked for one
    Unbound { label: String },
    Message(String),
}

impl EditorError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self::Message(msg.into())
    }
}

// std::io::Error and the toml errors will automatically convert into EditorError with the ?
// operator. If more details are desireable, convert into an EditorError manually with editor_error!

#[macro_export]
macro_rules! editor_error {
    ($($arg:tt)*) => {{

        $crate::util::EditorError::new(format!("[{} line {}] {}", file!(), line!(),
            format!($($arg)*)
        ))
    }};
}

impl From<std::io::Error> for EditorError {
    fn from(err: std::io::Error) -> Self {
        EditorError::new(format!("I/O error: {err}"))
    }
}

impl From<toml::de::Error> for EditorError {
    fn from(err: toml::de::Error) -> Self {
        EditorError::new(format!("could not parse toml: {err}"))
    }
}

impl From<toml::ser::Error> for EditorError {
    fn from(err: toml::ser::Error) -> Self {
        EditorError::new(format!("could not write toml: {err}"))
    }
}

impl From<toml_edit::TomlError> for EditorError {
    fn from(err: toml_edit::TomlError) -> Self {
        EditorError::new(format!("invalid toml document: {err}"))
    }
}

impl From<tempfile::PersistError> for EditorError {
    fn from(err: tempfile::PersistError) -> Self {
        EditorError::new(format!("could not replace file: {err}"))
    }
}

impl Display for EditorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            EditorError::TypeMismatch { label, expected } => {
                write!(f, "node \"{label}\" is not bound to a value of type {expected}")
            }
            EditorError::Unbound { label } => write!(f, "node \"{label}\" has no bound value"),
            EditorError::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for EditorError {}
