//! Implementation-defined caps required by spec §9 Open Question (iii):
//! the upper bound on string length and numeric literal magnitude must be
//! explicit and diagnosable rather than left to silently wrap or OOM.

/// Maximum length, in bytes, of an Asteria `string` value.
///
/// The original imposes no single constant here (it is bounded only by
/// `cow_string`'s allocator), but a re-implementation is required to pick
/// and enforce one. 1 GiB comfortably exceeds every real script while
/// still catching runaway `**` duplication before it exhausts memory.
pub const MAX_STRING_LEN: usize = 1 << 30;

/// Maximum magnitude (in significant decimal digits) accepted for an
/// integer or real numeric literal before the lexer reports `parse`.
pub const MAX_NUMERIC_LITERAL_DIGITS: usize = 72;

/// Maximum depth of nested (non-tail) calls and nested expression
/// recursion — guards recursive descent in both the parser and the AIR
/// executor against host stack overflow, per
/// `test/c_stack_overflow.cpp` / `test/stack_overflow.cpp`.
pub const MAX_RECURSION_DEPTH: usize = 512;
