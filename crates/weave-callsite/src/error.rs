use std::fmt;

/// A cast-adapted method was given a parameter list of the wrong length.
///
/// This is a construction bug in the compiler, never a user error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureAdaptationError {
    pub method: String,
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for SignatureAdaptationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "method argument count mismatch adapting {}: expected {} parameter types, found {}",
            self.method, self.expected, self.found
        )
    }
}

impl std::error::Error for SignatureAdaptationError {}
