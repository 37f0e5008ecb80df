#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An `okteto` invocation failed or the execution environment broke.
    Process,
    /// The CLI output was not in the expected shape.
    Parse,
    /// Invalid arguments.
    Input,
    /// The operation was cancelled before it finished.
    Interrupted,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Process => write!(f, "process error"),
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::Input => write!(f, "input error"),
            ErrorKind::Interrupted => write!(f, "interrupted"),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

#[macro_export]
macro_rules! app_error {
    ($kind:ident, $($arg:tt)*) => {
        $crate::error::AppError {
            kind: $crate::error::ErrorKind::$kind,
            message: format!($($arg)*),
        }
    };
}

#[macro_export]
macro_rules! app_err {
    ($kind:ident, $($arg:tt)*) => {
        Err($crate::app_error!($kind, $($arg)*))
    };
}

impl std::error::Error for AppError {}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<bollard::errors::Error> for AppError {
    fn from(err: bollard::errors::Error) -> Self {
        AppError::new(ErrorKind::Process, &format!("{}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::new(ErrorKind::Process, &format!("{}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::new(ErrorKind::Parse, &format!("{}", err))
    }
}
