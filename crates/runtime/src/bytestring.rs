//! Byte strings: spec §3 requires `string` to hold arbitrary bytes, not
//! necessarily UTF-8, with copy-on-write sharing as an allowed (but not
//! observable) optimisation.

use asteria_core::limits::MAX_STRING_LEN;
use asteria_core::{ErrorKind, Fault};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// A reference-counted, copy-on-write byte string.
///
/// Cloning is O(1) (an `Rc` bump); mutating through [`ByteString::make_mut`]
/// clones the backing buffer only if it is actually shared, exactly like
/// `Rc::make_mut`'s contract, which this wraps directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByteString(Rc<Vec<u8>>);

impl ByteString {
    pub fn new() -> Self {
        ByteString(Rc::new(Vec::new()))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Fault> {
        if bytes.len() > MAX_STRING_LEN {
            return Err(Fault::new(
                ErrorKind::Overflow,
                format!(
                    "string length {} exceeds the maximum of {MAX_STRING_LEN}",
                    bytes.len()
                ),
            ));
        }
        Ok(ByteString(Rc::new(bytes)))
    }

    /// Only for constructing literals/known-short strings where the length
    /// cap cannot possibly be exceeded (e.g. identifiers, error messages).
    pub fn from_static(s: &str) -> Self {
        ByteString(Rc::new(s.as_bytes().to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossy UTF-8 view, for diagnostics and printing; Asteria strings are
    /// not required to be valid UTF-8 so this is never used for semantics.
    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn concat(&self, other: &ByteString) -> Result<ByteString, Fault> {
        let mut buf = Vec::with_capacity(self.len() + other.len());
        buf.extend_from_slice(&self.0);
        buf.extend_from_slice(&other.0);
        ByteString::from_bytes(buf)
    }

    /// String duplication per spec §4.A: negative count fails, zero yields
    /// empty, and the result length is capped by the string-length policy.
    pub fn duplicate(&self, count: i64) -> Result<ByteString, Fault> {
        if count < 0 {
            return Err(Fault::new(
                ErrorKind::TypeMismatch,
                "string duplication count must not be negative",
            ));
        }
        if count == 0 || self.is_empty() {
            return Ok(ByteString::new());
        }
        let total = (self.len() as u128) * (count as u128);
        if total > MAX_STRING_LEN as u128 {
            return Err(Fault::new(
                ErrorKind::Overflow,
                format!("duplicated string length {total} exceeds the maximum of {MAX_STRING_LEN}"),
            ));
        }
        let mut buf = Vec::with_capacity(total as usize);
        for _ in 0..count {
            buf.extend_from_slice(&self.0);
        }
        ByteString::from_bytes(buf)
    }
}

impl Default for ByteString {
    fn default() -> Self {
        ByteString::new()
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        ByteString(Rc::new(s.as_bytes().to_vec()))
    }
}

impl From<String> for ByteString {
    fn from(s: String) -> Self {
        ByteString(Rc::new(s.into_bytes()))
    }
}

impl PartialOrd for ByteString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.0.cmp(&other.0))
    }
}

impl Ord for ByteString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_zero_is_empty() {
        let s = ByteString::from("meow");
        assert_eq!(s.duplicate(0).unwrap(), ByteString::new());
    }

    #[test]
    fn duplicate_negative_fails() {
        let s = ByteString::from("meow");
        assert!(s.duplicate(-1).is_err());
    }

    #[test]
    fn clone_is_cheap_and_equal() {
        let s = ByteString::from("shared");
        let t = s.clone();
        assert_eq!(s, t);
    }
}
