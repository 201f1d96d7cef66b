//! Error types for the RPC bridge.

use std::fmt;
use std::io;

/// Result type for bridge operations.
pub type RpcResult<T = ()> = Result<T, RpcError>;

/// Error from a bridge operation.
#[derive(Debug)]
pub enum RpcError {
    /// The operation cannot be carried by the active transport, e.g. a live
    /// stream handle over a serialized channel.
    NotImplemented { method: &'static str },
    Encode(String),
    Decode(String),
    Io(io::Error),
    Config(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotImplemented { method } => {
                write!(f, "not implemented over a serialized channel: {}", method)
            }
            Self::Encode(e) => write!(f, "encode error: {}", e),
            Self::Decode(e) => write!(f, "decode error: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Config(e) => write!(f, "config error: {}", e),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RpcError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for RpcError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// A positional argument was missing or held another type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgError {
    pub index: usize,
    pub expected: &'static str,
    /// Kind actually found, `None` when the position is out of range.
    pub found: Option<&'static str>,
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.found {
            Some(found) => write!(
                f,
                "argument {}: expected {}, found {}",
                self.index, self.expected, found
            ),
            None => write!(f, "argument {}: expected {}, found nothing", self.index, self.expected),
        }
    }
}

impl std::error::Error for ArgError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_implemented_names_the_method() {
        let e = RpcError::NotImplemented { method: "setMIDITrack" };
        assert_eq!(
            e.to_string(),
            "not implemented over a serialized channel: setMIDITrack"
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        let e: RpcError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(std::error::Error::source(&e).is_some());
    }
}
