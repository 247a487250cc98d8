/*! A [`Mouth`] is the source of [`Token`]s processed by the [`Engine`](crate::engine::Engine).

 It is a stack of [`MouthSource`]s, each either a list of [`Token`]s that have already been
 processed (e.g. the expansion of a macro, or tokens that were read ahead and put back) or a
 [`StringTokenizer`] reading from a file or string. Exhausted sources are popped.

 The [`Mouth`] does *not* resolve `\let` aliases; that happens when the engine looks up the
 meaning of a token (see [`Engine::get_next_token`](crate::engine::Engine::get_next_token)),
 so that commands reading control sequence *names* (`\def`, `\let`, ...) see the raw token.
 */
pub mod strings;

use log::debug;
use crate::engine::mouth::strings::StringTokenizer;
use crate::tex::catcodes::CategoryTable;
use crate::tex::tokens::{SourceRef, Token};
use crate::utils::Ptr;

/// A source of [`Token`]s on the stack of a [`Mouth`].
#[derive(Clone,Debug)]
pub enum MouthSource {
    /// Already tokenized input, stored in *reverse* order
    Tokens(Vec<Token>),
    /// A string (usually the contents of a file) to be tokenized
    String(StringTokenizer)
}

/// The input stack; see the [module documentation](self).
#[derive(Clone,Debug,Default)]
pub struct Mouth {
    sources:Vec<MouthSource>
}

impl Mouth {
    pub fn new() -> Self { Mouth { sources:Vec::new() } }

    /// Pushes a string to be tokenized next. `file` names it in source references.
    pub fn push_string<S:Into<Ptr<str>>>(&mut self,s:&str,file:S) {
        let file = file.into();
        debug!(target:"tokenizer","Reading {}",file);
        self.sources.push(MouthSource::String(StringTokenizer::new(s,file)))
    }

    /// Pushes `tks` to be processed next, in order.
    pub fn push_tokens(&mut self,tks:Vec<Token>) {
        if tks.is_empty() { return }
        match self.sources.last_mut() {
            Some(MouthSource::Tokens(v)) => v.extend(tks.into_iter().rev()),
            _ => self.sources.push(MouthSource::Tokens(tks.into_iter().rev().collect()))
        }
    }

    /// Puts a single token back, to be returned by the next call to [`get_next`](Self::get_next).
    pub fn requeue(&mut self,tk:Token) {
        match self.sources.last_mut() {
            Some(MouthSource::Tokens(v)) => v.push(tk),
            _ => self.sources.push(MouthSource::Tokens(vec!(tk)))
        }
    }

    /// The next token, tokenizing with `cc` if necessary; `None` iff all sources are exhausted.
    pub fn get_next(&mut self,cc:&CategoryTable) -> Option<Token> {
        loop {
            match self.sources.last_mut()? {
                MouthSource::Tokens(v) => match v.pop() {
                    Some(t) => return Some(t),
                    None => { self.sources.pop(); }
                }
                MouthSource::String(s) => match s.get_next(cc) {
                    Some(t) => return Some(t),
                    None => {
                        debug!(target:"tokenizer","End of {}",s.file());
                        self.sources.pop();
                    }
                }
            }
        }
    }

    /// Whether there is nothing left to read.
    pub fn is_empty(&self) -> bool {
        self.sources.iter().all(|s| match s {
            MouthSource::Tokens(v) => v.is_empty(),
            MouthSource::String(s) => s.eof()
        })
    }

    /// The topmost string source, discarding exhausted token lists above it. Token lists that
    /// still hold tokens are left alone, and `None` is returned in that case.
    fn top_string(&mut self) -> Option<&mut StringTokenizer> {
        while let Some(MouthSource::Tokens(v)) = self.sources.last() {
            if !v.is_empty() { return None }
            self.sources.pop();
        }
        match self.sources.last_mut() {
            Some(MouthSource::String(s)) => Some(s),
            _ => None
        }
    }

    /// `\endinput`: stops reading the innermost file after its current line.
    pub fn end_input(&mut self) {
        for s in self.sources.iter_mut().rev() {
            if let MouthSource::String(s) = s {
                s.end_input();
                return
            }
        }
    }

    /// Reads the next character verbatim, e.g. the delimiter of `\verb`. If tokens are pending,
    /// the first character of the next token's text is used.
    pub fn read_char(&mut self,cc:&CategoryTable) -> Option<char> {
        if let Some(s) = self.top_string() {
            return s.read_char()
        }
        let tk = self.get_next(cc)?;
        let mut chars = tk.to_string().chars().collect::<Vec<_>>().into_iter();
        let c = chars.next();
        let rest:String = chars.collect();
        if !rest.is_empty() {
            self.push_tokens(Token::from_text(&rest))
        }
        c
    }

    /// Reads verbatim text up to (and excluding) `end`. Pending tokens are converted back into text
    /// first. Returns `None` if the input ends before `end`.
    pub fn read_verbatim(&mut self,end:&str,cc:&CategoryTable) -> Option<String> {
        let mut ret = String::new();
        loop {
            if let Some(s) = self.top_string() {
                return s.read_until(end).map(|r| { ret.push_str(&r); ret })
            }
            let tk = self.get_next(cc)?;
            ret.push_str(&tk.to_string());
            if let Some(i) = ret.find(end) {
                let rest = ret.split_off(i);
                let rest = &rest[end.len()..];
                if !rest.is_empty() { self.push_tokens(Token::from_text(rest)) }
                return Some(ret)
            }
        }
    }

    fn current_string(&self) -> Option<&StringTokenizer> {
        self.sources.iter().rev().find_map(|s| match s {
            MouthSource::String(s) => Some(s),
            _ => None
        })
    }
    /// The position of the innermost string source
    pub fn source_ref(&self) -> Option<SourceRef> {
        self.current_string().map(|s| s.source_ref())
    }
    /// The name of the innermost file being read
    pub fn current_file(&self) -> Option<Ptr<str>> {
        self.current_string().map(|s| s.file().clone())
    }
    /// The unread rest of the current line, for error messages
    pub fn preview(&self) -> String {
        let mut ret = String::new();
        for s in self.sources.iter().rev() {
            match s {
                MouthSource::Tokens(v) => for t in v.iter().rev() { ret.push_str(&t.to_string()) }
                MouthSource::String(s) => {
                    ret.push_str(&s.preview());
                    break
                }
            }
            if ret.len() > 80 { break }
        }
        if ret.len() > 80 {
            let mut i = 80;
            while !ret.is_char_boundary(i) { i -= 1 }
            ret.truncate(i);
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::catcodes::DEFAULT_TABLE;

    #[test]
    fn stack() {
        let mut m = Mouth::new();
        m.push_string("ab","<string>");
        let a = m.get_next(&DEFAULT_TABLE).unwrap();
        m.push_tokens(vec!(Token::other('1'),Token::other('2')));
        m.requeue(a);
        let mut out = Vec::new();
        while let Some(t) = m.get_next(&DEFAULT_TABLE) { out.push(t) }
        assert_eq!(out,vec!(Token::letter('a'),Token::other('1'),Token::other('2'),Token::letter('b')));
        assert!(m.is_empty());
    }

    #[test]
    fn verbatim_with_pending_tokens() {
        let mut m = Mouth::new();
        m.push_string("rest|more","<string>");
        m.push_tokens(Token::from_text("xy"));
        assert_eq!(m.read_char(&DEFAULT_TABLE),Some('x'));
        assert_eq!(m.read_verbatim("|",&DEFAULT_TABLE).as_deref(),Some("yrest"));
        assert_eq!(m.get_next(&DEFAULT_TABLE),Some(Token::letter('m')));
    }
}
