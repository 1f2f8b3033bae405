//! Catchable exceptions (spec §4.I): a `Value` payload plus the backtrace
//! accumulated as the exception unwinds through call frames.

use crate::value::Value;
use asteria_core::SourceLocation;
use std::fmt;

/// What role a frame played when the exception passed through it,
/// mirroring the original's `Backtrace_frame::ftype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Raised directly by a native (core-provided) operation.
    Native,
    /// The `throw` statement that originated the exception.
    ThrowSite,
    /// A `try` block that caught and (optionally) is re-throwing it.
    CatchSite,
    /// An ordinary function call frame the exception unwound through.
    FunctionCall,
}

#[derive(Debug, Clone)]
pub struct BacktraceFrame {
    pub ftype: FrameType,
    pub location: SourceLocation,
    /// The exception's payload at the moment it passed through this
    /// frame (spec §4.I: each frame record carries "a carried value").
    pub value: Value,
}

/// A thrown value plus the backtrace accumulated while unwinding.
/// `Value::test()`/`typeof` apply to `.value` exactly as in script code,
/// per spec §8 scenario 4 (`try`/`catch` inspects the thrown value's
/// type).
#[derive(Debug, Clone)]
pub struct Exception {
    pub value: Value,
    pub backtrace: Vec<BacktraceFrame>,
}

impl Exception {
    pub fn new(value: Value) -> Self {
        Exception { value, backtrace: Vec::new() }
    }

    pub fn push_frame(&mut self, ftype: FrameType, location: SourceLocation) {
        let value = self.value.clone();
        self.backtrace.push(BacktraceFrame { ftype, location, value });
    }

    /// Build the `__backtrace` array a `catch` clause binds alongside its
    /// exception variable (spec §4.I): an array of `{ftype, file, line,
    /// value}` objects, in unwind order (innermost first).
    pub fn backtrace_array(&self) -> Value {
        use crate::bytestring::ByteString;
        use crate::object::Object;
        use std::rc::Rc;

        let frames = self
            .backtrace
            .iter()
            .map(|frame| {
                let mut obj = Object::new();
                obj.insert(
                    ByteString::from("ftype"),
                    Value::string_from_static(match frame.ftype {
                        FrameType::Native => "native",
                        FrameType::ThrowSite => "throw",
                        FrameType::CatchSite => "catch",
                        FrameType::FunctionCall => "call",
                    }),
                );
                obj.insert(ByteString::from("file"), Value::string_from_static(frame.location.file()));
                obj.insert(ByteString::from("line"), Value::Integer(frame.location.line()));
                obj.insert(ByteString::from("value"), frame.value.clone());
                Value::Object(Rc::new(obj))
            })
            .collect();
        Value::Array(Rc::new(frames))
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::new();
        let _ = self.value.print(&mut buf, false);
        write!(f, "uncaught exception: {buf}")?;
        for frame in &self.backtrace {
            write!(f, "\n  at {} ({:?})", frame.location, frame.ftype)?;
        }
        Ok(())
    }
}

impl std::error::Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtrace_frame_has_ftype_file_line_and_value() {
        let mut exc = Exception::new(Value::string_from_static("meow"));
        exc.push_frame(FrameType::ThrowSite, SourceLocation::new("<test>".to_string(), 3));
        let Value::Array(frames) = exc.backtrace_array() else { panic!("expected an array") };
        assert_eq!(frames.len(), 1);
        let Value::Object(frame) = &frames[0] else { panic!("expected a frame object") };
        assert_eq!(frame.get(&crate::bytestring::ByteString::from("ftype")).unwrap(), &Value::string_from_static("throw"));
        assert_eq!(frame.get(&crate::bytestring::ByteString::from("file")).unwrap(), &Value::string_from_static("<test>"));
        assert_eq!(frame.get(&crate::bytestring::ByteString::from("line")).unwrap(), &Value::Integer(3));
        assert_eq!(frame.get(&crate::bytestring::ByteString::from("value")).unwrap(), &Value::string_from_static("meow"));
    }
}
