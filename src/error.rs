//! Blesense errors

/// The error type for refused transport requests and invalid configuration
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    message: String,
}

impl Error {
    /// Creates a new error from its parts.
    pub fn new(
        kind: ErrorKind,
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
        message: impl Into<String>,
    ) -> Self {
        Error {
            kind,
            source,
            message: message.into(),
        }
    }

    /// Returns the corresponding [ErrorKind] for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message for this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.message.is_empty(), &self.source) {
            (true, None) => write!(f, "{}", &self.kind),
            (false, None) => write!(f, "{}: {}", &self.kind, &self.message),
            (true, Some(err)) => write!(f, "{}: {}", &self.kind, err),
            (false, Some(err)) => write!(f, "{}: {} ({})", &self.kind, &self.message, err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|x| {
            let x: &(dyn std::error::Error + 'static) = &**x;
            x
        })
    }
}

/// A list of general categories of transport error.
#[non_exhaustive]
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// connection failed
    ConnectionFailed,
    /// the Bluetooth device isn't connected
    NotConnected,
    /// the Bluetooth operation is unsupported
    NotSupported,
    /// not found
    NotFound,
    /// invalid parameter
    InvalidParameter,
    /// another GATT operation is outstanding
    Busy,
    /// timed out
    Timeout,
    /// protocol error: ATT code {0}
    Protocol(u8),
    /// an internal error has occured
    Internal,
    /// error
    Other,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            source: None,
            message: String::new(),
        }
    }
}

/// Failures converting between characteristic payloads and display strings.
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecError {
    /// the characteristic is not registered
    UnknownCharacteristic,
    /// the payload is too short for the characteristic's wire format
    MalformedPayload,
    /// the characteristic cannot be written
    WriteUnsupported,
    /// the value cannot be represented by the characteristic
    InvalidValue,
}

impl std::error::Error for CodecError {}

/// Failures of session operations. None of them terminate the session.
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionError {
    /// a connection attempt is already in progress
    AlreadyConnecting,
    /// a peripheral is already connected
    AlreadyConnected,
    /// no peripheral is connected
    NotConnected,
    /// the characteristic does not support this operation
    UnsupportedOperation,
    /// the peripheral does not expose a known service
    InvalidDevice,
    /// codec error: {0}
    Codec(CodecError),
    /// the transport refused the request: {0}
    Transport(ErrorKind),
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        SessionError::Codec(err)
    }
}

impl From<Error> for SessionError {
    fn from(err: Error) -> Self {
        SessionError::Transport(err.kind())
    }
}
