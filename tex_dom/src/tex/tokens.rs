/*! [`Token`]s: the atoms everything in TeX is made of.

A token is a pair of a text and a [`CategoryCode`], plus the position it was read from.
Control sequences are tokens of category [`Escape`](CategoryCode::Escape) whose text is the
name of the control sequence (without the escape character); active characters are
represented as control sequences named `active::c`.
*/

use std::fmt::{Display, Formatter, Write};
use crate::tex::catcodes::CategoryCode;
use crate::utils::Ptr;

/// A position in an input file.
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct SourceRef {
    pub file:Ptr<str>,
    pub line:usize,
    pub column:usize
}
impl Display for SourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f,"{} l. {} c. {}",self.file,self.line,self.column)
    }
}

/// The prefix of the names of active characters.
pub const ACTIVE_PREFIX:&str = "active::";

/** A single token.

Two tokens are equal iff their category codes and texts agree; comparing a token with a
[`str`] only compares the text:
```rust
use tex_dom::tex::tokens::Token;
use tex_dom::tex::catcodes::CategoryCode;
assert_eq!(Token::letter('a'),Token::new("a",CategoryCode::Letter));
assert_ne!(Token::letter('a'),Token::other('a'));
assert!(Token::other('a') == *"a");
```
*/
#[derive(Clone)]
pub struct Token {
    pub text:Ptr<str>,
    pub catcode:CategoryCode,
    pub source:Option<SourceRef>
}
impl Token {
    pub fn new<S:Into<Ptr<str>>>(text:S,catcode:CategoryCode) -> Self {
        Token { text:text.into(), catcode, source:None }
    }
    pub fn with_source(mut self,source:Option<SourceRef>) -> Self {
        self.source = source;
        self
    }
    /// A control sequence token `\name`
    pub fn cs<S:Into<Ptr<str>>>(name:S) -> Self { Self::new(name,CategoryCode::Escape) }
    pub fn letter(c:char) -> Self { Self::from_char(c,CategoryCode::Letter) }
    pub fn other(c:char) -> Self { Self::from_char(c,CategoryCode::Other) }
    pub fn space() -> Self { Self::new(" ",CategoryCode::Space) }
    pub fn begin_group() -> Self { Self::new("{",CategoryCode::BeginGroup) }
    pub fn end_group() -> Self { Self::new("}",CategoryCode::EndGroup) }
    /// The token representing the active character `c`.
    pub fn active(c:char) -> Self {
        let mut s = String::with_capacity(ACTIVE_PREFIX.len() + 4);
        s.push_str(ACTIVE_PREFIX);
        s.push(c);
        Self::cs(s)
    }
    /// A marker delimiting a token list pushed to the input for internal processing.
    pub fn end_tokens<S:Into<Ptr<str>>>(tag:S) -> Self { Self::new(tag,CategoryCode::EndTokens) }
    pub fn from_char(c:char,catcode:CategoryCode) -> Self {
        let mut buf = [0u8;4];
        Self::new(&*c.encode_utf8(&mut buf),catcode)
    }
    /// Converts a string to a list of [`Letter`](CategoryCode::Letter), [`Other`](CategoryCode::Other)
    /// and [`Space`](CategoryCode::Space) tokens, as `\the` and friends do.
    pub fn from_text(s:&str) -> Vec<Token> {
        s.chars().map(|c| match c {
            ' ' => Token::space(),
            c if c.is_ascii_alphabetic() => Token::letter(c),
            c => Token::other(c)
        }).collect()
    }

    pub fn is_cs(&self) -> bool { self.catcode == CategoryCode::Escape }
    /// Whether this token is the control sequence `\name`.
    pub fn is_cs_named(&self,name:&str) -> bool { self.is_cs() && &*self.text == name }
    /// The first character of the text of this token.
    pub fn char(&self) -> Option<char> { self.text.chars().next() }

    /// The name under which the command of this token is registered, if it has one: control
    /// sequences (including active characters) map to their name, `{`/`}` to `bgroup`/`egroup` and
    /// math shift, alignment, super- and subscript characters to `active::c`.
    pub fn macro_name(&self) -> Option<&str> {
        use CategoryCode::*;
        match self.catcode {
            Escape => Some(&self.text),
            BeginGroup => Some("bgroup"),
            EndGroup => Some("egroup"),
            MathShift => Some("active::$"),
            AlignmentTab => Some("active::&"),
            Superscript => Some("active::^"),
            Subscript => Some("active::_"),
            _ => None
        }
    }

    /// The source representation of this token: `\par` is a blank line, active characters are
    /// the character itself and control words are written with a trailing space.
    pub fn source(&self) -> String {
        let mut s = String::new();
        let _ = self.source_fmt(&mut s);
        s
    }
    fn source_fmt<W:Write>(&self,f:&mut W) -> std::fmt::Result {
        match self.catcode {
            CategoryCode::Escape if &*self.text == "par" => f.write_str("\n\n"),
            CategoryCode::Escape => match self.text.strip_prefix(ACTIVE_PREFIX) {
                Some(c) => f.write_str(c),
                None if self.is_control_word() => write!(f,"\\{} ",self.text),
                None => write!(f,"\\{}",self.text)
            }
            CategoryCode::EndTokens => Ok(()),
            _ => f.write_str(&self.text)
        }
    }
    /// Whether this token is a control *word*, i.e. its name ends with a letter (so that a letter
    /// following it in the source would become part of its name).
    pub fn is_control_word(&self) -> bool {
        self.is_cs() && !self.text.starts_with(ACTIVE_PREFIX) &&
            self.text.chars().last().map(|c| c.is_alphabetic()).unwrap_or(false)
    }
}

/// Renders a list of tokens as source text. Control words are followed by a space only if the
/// next token starts with a letter, so `\bf` followed by `x` is rendered `\bf x`,
/// never `\bfx`.
pub fn tokens_to_source(tks:&[Token]) -> String {
    let mut ret = String::new();
    let mut iter = tks.iter().peekable();
    while let Some(t) = iter.next() {
        if t.is_control_word() && &*t.text != "par" {
            ret.push('\\');
            ret.push_str(&t.text);
            match iter.peek() {
                Some(n) if n.catcode == CategoryCode::Letter || (n.catcode != CategoryCode::Escape &&
                    n.char().map(|c| c.is_alphabetic()).unwrap_or(false)) => ret.push(' '),
                _ => ()
            }
        } else {
            let _ = t.source_fmt(&mut ret);
        }
    }
    ret
}

/// Concatenates the texts of the given tokens; control sequences are written as `\name`.
pub fn tokens_to_string(tks:&[Token]) -> String {
    let mut ret = String::new();
    for t in tks { let _ = write!(ret,"{}",t); }
    ret
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.catcode == other.catcode && self.text == other.text
    }
}
impl Eq for Token {}
impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool { &*self.text == other }
}
impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.catcode {
            CategoryCode::Escape => match self.text.strip_prefix(ACTIVE_PREFIX) {
                Some(c) => f.write_str(c),
                None => write!(f,"\\{}",self.text)
            }
            CategoryCode::EndTokens => Ok(()),
            _ => f.write_str(&self.text)
        }
    }
}
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f,"{:?}({:?})",self.catcode,&*self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn names() {
        assert_eq!(Token::begin_group().macro_name(),Some("bgroup"));
        assert_eq!(Token::active('~').macro_name(),Some("active::~"));
        assert_eq!(Token::new("$",CategoryCode::MathShift).macro_name(),Some("active::$"));
        assert_eq!(Token::letter('a').macro_name(),None);
    }
    #[test]
    fn source() {
        assert_eq!(Token::cs("par").source(),"\n\n");
        assert_eq!(Token::active('~').source(),"~");
        assert_eq!(Token::cs("foo").source(),"\\foo ");
        let tks = vec![Token::cs("bf"),Token::letter('x'),Token::cs("relax"),Token::other('1'),Token::cs("%")];
        assert_eq!(tokens_to_source(&tks),"\\bf x\\relax1\\%");
    }
}
