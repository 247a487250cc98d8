/*! Errors raised while interpreting a document.

   Most problems a TeX document can have are *not* errors: unknown control sequences, missing
   files or missing numbers are reported via [`log::warn!`] and processing continues. What remains
   is a [`TeXError`], classified by its [`ErrorKind`], which aborts the current
   [`parse`](crate::engine::Engine::parse).
 */

use std::fmt::{Display, Formatter};
use crate::tex::tokens::SourceRef;

/// The class of a [`TeXError`].
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum ErrorKind {
    /// Unbalanced groups, `\end` without `\begin`, ...
    Structure,
    /// A required argument is missing or can not be cast to its declared type
    Argument,
    /// A malformed relation in `\ifnum`/`\ifdim`
    Conditional,
    /// A command was used in a way that requires it to be defined
    Undefined,
    /// Reading or writing a file failed in a way that can not be skipped
    Io,
    /// Anything else, e.g. runaway recursion
    Other
}
impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        f.write_str(match self {
            Structure => "Structure error",
            Argument => "Argument error",
            Conditional => "Conditional error",
            Undefined => "Undefined",
            Io => "I/O error",
            Other => "Error"
        })
    }
}

/// Where an error occurred: the position of the token being processed and the
/// remainder of the current input line.
#[derive(Debug,Clone,Default)]
pub struct ErrorPosition {
    pub source:Option<SourceRef>,
    pub line:Option<String>
}
impl Display for ErrorPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(s) = &self.source {
            write!(f," at {}",s)?;
        }
        if let Some(l) = &self.line {
            write!(f,"\nl.{} {}",self.source.as_ref().map(|s| s.line).unwrap_or(0),l)?;
        }
        Ok(())
    }
}

/// An error that aborts interpretation.
#[derive(Debug,Clone,thiserror::Error)]
#[error("! {kind}: {msg}{position}")]
pub struct TeXError {
    pub kind:ErrorKind,
    pub msg:String,
    pub position:ErrorPosition
}
impl TeXError {
    pub fn new<S:Into<String>>(kind:ErrorKind,msg:S) -> Self {
        TeXError{kind,msg:msg.into(),position:ErrorPosition::default()}
    }
    /// Attaches a source position, unless one is already present.
    pub fn at(mut self,source:Option<SourceRef>,line:Option<String>) -> Self {
        if self.position.source.is_none() {
            self.position.source = source;
            self.position.line = line;
        }
        self
    }
    pub fn has_position(&self) -> bool { self.position.source.is_some() }
}
impl From<std::io::Error> for TeXError {
    fn from(e: std::io::Error) -> Self {
        TeXError::new(ErrorKind::Io,e.to_string())
    }
}

/// The result type of every fallible operation in this crate.
pub type TeXResult<A> = Result<A,TeXError>;

/// Returns early from the current function with a [`TeXError`] of the given [`ErrorKind`].
/// ```rust
/// use tex_dom::throw;
/// use tex_dom::utils::errors::*;
/// fn check(i:i32) -> TeXResult<i32> {
///     if i < 0 { throw!(Argument => "Negative number {}",i) }
///     Ok(i)
/// }
/// assert_eq!(check(-1).unwrap_err().kind,ErrorKind::Argument);
/// ```
#[macro_export]
macro_rules! throw {
    ($kind:ident => $arg:expr) => {
        return Err($crate::utils::errors::TeXError::new($crate::utils::errors::ErrorKind::$kind,$arg.to_string()))
    };
    ($kind:ident => $first:expr,$($arg:expr),*) => {
        return Err($crate::utils::errors::TeXError::new($crate::utils::errors::ErrorKind::$kind,format!($first,$($arg),*)))
    };
}

/// "File ended while scanning use of ..."
#[macro_export]
macro_rules! file_end {
    () => ($crate::throw!(Argument => "File ended unexpectedly"));
    ($name:expr) => ($crate::throw!(Argument => "File ended while scanning use of \\{}",$name));
}
