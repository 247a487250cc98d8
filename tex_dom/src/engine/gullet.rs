/*! Reading and expanding tokens: everything between the [`Mouth`](crate::engine::mouth::Mouth)
and the digestion of nodes.

Two ways of reading are distinguished: *raw* reading ([`get_next_raw`](Engine::get_next_raw))
returns tokens as they come, as needed for macro arguments and definitions;
[`next_unexpandable`](Engine::next_unexpandable) expands macros and conditionals until it
finds a token that is not expandable, as needed for numbers, dimensions and keywords.
*/

pub mod numeric_methods;

use log::{debug, trace, warn};
use crate::commands::{methods, PrimitiveCommand, TeXCommand};
use crate::engine::Engine;
use crate::tex::catcodes::CategoryCode;
use crate::tex::tokens::{tokens_to_string, Token};
use crate::utils::errors::TeXResult;
use crate::{file_end, throw};

impl Engine {
    /// The next token, exactly as it is in the input.
    pub fn get_next_raw(&mut self) -> Option<Token> {
        self.mouth.get_next(self.state.catcodes())
    }
    /// The next token, with control sequences that have been `\let` to a character replaced by
    /// that character.
    pub fn get_next_token(&mut self) -> Option<Token> {
        let tk = self.get_next_raw()?;
        if tk.is_cs() {
            if let Some(t) = self.state.get_let(&tk.text) {
                return Some(t.clone().with_source(tk.source))
            }
        }
        Some(tk)
    }
    pub fn requeue(&mut self,tk:Token) { self.mouth.requeue(tk) }

    /// Skips space tokens without expanding.
    pub fn skip_whitespace(&mut self) {
        while let Some(tk) = self.get_next_raw() {
            if tk.catcode != CategoryCode::Space {
                self.requeue(tk);
                return
            }
        }
    }
    /// Skips space tokens, expanding macros on the way.
    pub fn skip_whitespace_expanded(&mut self) -> TeXResult<()> {
        while let Some((tk,_)) = self.next_unexpandable()? {
            if tk.catcode != CategoryCode::Space {
                self.requeue(tk);
                break
            }
        }
        Ok(())
    }

    /// Reads the tokens up to the `}` matching an already consumed `{`.
    pub fn read_group(&mut self) -> TeXResult<Vec<Token>> {
        let mut depth = 0usize;
        let mut ret = Vec::new();
        while let Some(tk) = self.get_next_raw() {
            match tk.catcode {
                CategoryCode::BeginGroup => depth += 1,
                CategoryCode::EndGroup if depth == 0 => return Ok(ret),
                CategoryCode::EndGroup => depth -= 1,
                _ => ()
            }
            ret.push(tk)
        }
        file_end!()
    }

    /// Reads an undelimited argument: a braced group (without the braces), a math group
    /// `$...$` (with the `$`s) or a single token. The boolean is `true` for a braced group.
    /// Returns `None` at the end of the input or of an internal token list.
    pub fn read_argument(&mut self) -> TeXResult<Option<(Vec<Token>,bool)>> {
        self.skip_whitespace();
        let Some(tk) = self.get_next_raw() else { return Ok(None) };
        match tk.catcode {
            CategoryCode::BeginGroup => Ok(Some((self.read_group()?,true))),
            CategoryCode::EndTokens | CategoryCode::EndGroup => {
                self.requeue(tk);
                Ok(None)
            }
            CategoryCode::MathShift => {
                let mut ret = vec!(tk);
                loop {
                    let Some(t) = self.get_next_raw() else { file_end!() };
                    match t.catcode {
                        CategoryCode::BeginGroup => {
                            ret.push(t);
                            ret.extend(self.read_group()?);
                            ret.push(Token::end_group());
                        }
                        CategoryCode::MathShift => {
                            ret.push(t);
                            return Ok(Some((ret,false)))
                        }
                        _ => ret.push(t)
                    }
                }
            }
            _ => Ok(Some((vec!(tk),false)))
        }
    }

    /// Reads an optional argument delimited by `open` and `close`, if the next non-space token
    /// is `open`. Nested pairs of `open`/`close` and braced groups are skipped over.
    pub fn read_optional(&mut self,open:char,close:char) -> TeXResult<Option<Vec<Token>>> {
        self.skip_whitespace();
        let Some(tk) = self.get_next_raw() else { return Ok(None) };
        if !is_char(&tk,open) {
            self.requeue(tk);
            return Ok(None)
        }
        let mut depth = 0usize;
        let mut ret = Vec::new();
        while let Some(tk) = self.get_next_raw() {
            if tk.catcode == CategoryCode::BeginGroup {
                ret.push(tk);
                ret.extend(self.read_group()?);
                ret.push(Token::end_group());
                continue
            }
            if is_char(&tk,close) {
                if depth == 0 { return Ok(Some(ret)) }
                depth -= 1;
            } else if open != close && is_char(&tk,open) {
                depth += 1;
            }
            ret.push(tk)
        }
        file_end!()
    }

    /// Reads an argument as a plain string, e.g. the name of an environment or counter.
    pub fn read_name(&mut self) -> TeXResult<String> {
        match self.read_argument()? {
            Some((tks,_)) => Ok(tokens_to_string(&tks).trim().to_string()),
            None => file_end!()
        }
    }

    /// Reads a control sequence, possibly in braces, as in `\newcommand{\foo}`.
    pub fn read_cs_name(&mut self) -> TeXResult<Token> {
        self.skip_whitespace();
        let Some(tk) = self.get_next_raw() else { file_end!() };
        if tk.catcode != CategoryCode::BeginGroup { return Ok(tk) }
        let mut group = self.read_group()?.into_iter().filter(|t| t.catcode != CategoryCode::Space);
        let Some(first) = group.next() else { throw!(Argument => "Missing control sequence") };
        if group.next().is_some() {
            warn!(target:"gullet","Ignoring tokens after \\{} in control sequence argument",first.text);
        }
        Ok(first)
    }

    /// Expands `cmd`, the meaning of `tk`, if it is expandable, pushing the result back to the
    /// input; returns whether it was.
    pub fn expand_once(&mut self,tk:&Token,cmd:&TeXCommand) -> TeXResult<bool> {
        if !cmd.is_expandable() { return Ok(false) }
        self.aux.expansions += 1;
        if self.aux.expansions > self.config.max_expansion_depth {
            throw!(Other => "Runaway expansion at {}; more than {} expansions without output",tk,self.config.max_expansion_depth)
        }
        match cmd {
            TeXCommand::Primitive{cmd:PrimitiveCommand::Expandable(f),..} => {
                let tks = f(self,tk)?;
                self.mouth.push_tokens(tks);
            }
            TeXCommand::Primitive{cmd:PrimitiveCommand::Conditional(f),name} => {
                trace!(target:"gullet","\\{}",name);
                let b = f(self,tk)?;
                methods::process_if(self,b)?;
            }
            TeXCommand::Macro(m) => {
                let m = m.clone();
                let tks = methods::expand_macro(self,&m,tk)?;
                self.mouth.push_tokens(tks);
            }
            TeXCommand::Switch{state,..} => methods::process_if(self,*state)?,
            TeXCommand::TheCounter{counter,..} => {
                let s = self.state.format_counter(counter).unwrap_or_default();
                self.mouth.push_tokens(Token::from_text(&s));
            }
            _ => return Ok(false)
        }
        Ok(true)
    }

    /// The next token that is not expandable, together with its meaning if it is a control
    /// sequence.
    pub fn next_unexpandable(&mut self) -> TeXResult<Option<(Token,Option<TeXCommand>)>> {
        while let Some(tk) = self.get_next_token() {
            if !tk.is_cs() { return Ok(Some((tk,None))) }
            let cmd = self.state.get_command(&tk.text).cloned();
            match cmd {
                Some(c) if self.expand_once(&tk,&c)? => continue,
                cmd => {
                    self.aux.expansions = 0;
                    return Ok(Some((tk,cmd)))
                }
            }
        }
        Ok(None)
    }

    /// Expands `tks` completely, as `\edef` and `\write` do. Protected macros, undefined and
    /// unexpandable commands are kept.
    pub fn expand_fully(&mut self,mut tks:Vec<Token>) -> TeXResult<Vec<Token>> {
        tks.push(Token::end_tokens("expand"));
        self.mouth.push_tokens(tks);
        let mut ret = Vec::new();
        while let Some(tk) = self.get_next_raw() {
            match tk.catcode {
                CategoryCode::EndTokens if &*tk.text == "expand" => {
                    self.aux.expansions = 0;
                    return Ok(ret)
                }
                CategoryCode::EndTokens => debug!(target:"gullet","Dropping marker {} in expansion",tk.text),
                CategoryCode::Expanded => ret.push(Token::cs(tk.text.clone())),
                CategoryCode::Escape if self.state.get_let(&tk.text).is_some() => ret.push(tk),
                CategoryCode::Escape => match self.state.get_command(&tk.text).cloned() {
                    Some(TeXCommand::Macro(m)) if m.protected => ret.push(tk),
                    Some(c) => if !self.expand_once(&tk,&c)? { ret.push(tk) },
                    None => ret.push(tk)
                }
                _ => ret.push(tk)
            }
        }
        file_end!()
    }

    /// Reads the keyword `kw` (case insensitively, expanding macros) and one optional space after
    /// it. If the keyword is not present, everything read is put back.
    pub fn read_keyword(&mut self,kw:&str) -> TeXResult<bool> {
        self.skip_whitespace_expanded()?;
        let mut read = Vec::new();
        for c in kw.chars() {
            match self.next_unexpandable()? {
                Some((tk,None)) if matches!(tk.catcode,CategoryCode::Letter | CategoryCode::Other) &&
                    tk.text.chars().count() == 1 && tk.char().map(|x| x.eq_ignore_ascii_case(&c)).unwrap_or(false) => read.push(tk),
                Some((tk,_)) => {
                    read.push(tk);
                    self.mouth.push_tokens(read);
                    return Ok(false)
                }
                None => {
                    self.mouth.push_tokens(read);
                    return Ok(false)
                }
            }
        }
        self.skip_one_space()?;
        Ok(true)
    }
    /// Consumes one (expanded) space token, if present.
    pub fn skip_one_space(&mut self) -> TeXResult<()> {
        if let Some((tk,_)) = self.next_unexpandable()? {
            if tk.catcode != CategoryCode::Space { self.requeue(tk) }
        }
        Ok(())
    }
    /// Skips spaces and an optional `=`.
    pub fn read_optional_equals(&mut self) -> TeXResult<()> {
        self.skip_whitespace_expanded()?;
        if let Some((tk,cmd)) = self.next_unexpandable()? {
            if !(cmd.is_none() && tk.catcode == CategoryCode::Other && &*tk.text == "=") {
                self.requeue(tk)
            }
        }
        Ok(())
    }

    /// Reads a file name, as for `\input`: either braced, or characters up to the next space.
    pub fn read_file_name(&mut self) -> TeXResult<String> {
        self.skip_whitespace_expanded()?;
        let Some((tk,_)) = self.next_unexpandable()? else { file_end!() };
        if tk.catcode == CategoryCode::BeginGroup {
            let tks = self.read_group()?;
            let tks = self.expand_fully(tks)?;
            return Ok(tokens_to_string(&tks).trim().to_string())
        }
        self.requeue(tk);
        let mut ret = String::new();
        while let Some((tk,cmd)) = self.next_unexpandable()? {
            match (tk.catcode,cmd) {
                (CategoryCode::Letter | CategoryCode::Other,None) => ret.push_str(&tk.text),
                (CategoryCode::Space,_) => break,
                _ => {
                    self.requeue(tk);
                    break
                }
            }
        }
        Ok(ret)
    }

    /// Runs `f` on `tks` (instead of the input), e.g. to read a number from an argument. Tokens
    /// that `f` does not consume are dropped with a warning.
    pub fn read_from_tokens<R,F:FnOnce(&mut Engine) -> TeXResult<R>>(&mut self,mut tks:Vec<Token>,f:F) -> TeXResult<R> {
        tks.push(Token::end_tokens("cast"));
        self.mouth.push_tokens(tks);
        let r = f(self);
        let mut rest = Vec::new();
        while let Some(tk) = self.get_next_raw() {
            if tk.catcode == CategoryCode::EndTokens && &*tk.text == "cast" { break }
            rest.push(tk)
        }
        if rest.iter().any(|t| t.catcode != CategoryCode::Space) {
            warn!(target:"gullet","Ignoring trailing tokens: {}",tokens_to_string(&rest));
        }
        r
    }
}

/// Whether `tk` is the character `c` (and not a control sequence or marker).
pub(crate) fn is_char(tk:&Token,c:char) -> bool {
    !matches!(tk.catcode,CategoryCode::Escape | CategoryCode::EndTokens | CategoryCode::Expanded) &&
        tk.char() == Some(c) && tk.text.len() == c.len_utf8()
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::tex::catcodes::CategoryCode;
    use crate::tex::tokens::{tokens_to_string, Token};

    fn engine(s:&str) -> Engine {
        let mut e = Engine::default();
        e.mouth.push_string(s,"<string>");
        e
    }

    #[test]
    fn arguments() {
        let mut e = engine("  {a{b}c} x $y^2$ }");
        assert_eq!(e.read_argument().unwrap().map(|(t,b)| (tokens_to_string(&t),b)),Some(("a{b}c".to_string(),true)));
        assert_eq!(e.read_argument().unwrap().map(|(t,b)| (tokens_to_string(&t),b)),Some(("x".to_string(),false)));
        assert_eq!(e.read_argument().unwrap().map(|(t,_)| tokens_to_string(&t)),Some("$y^2$".to_string()));
        assert_eq!(e.read_argument().unwrap(),None);
        assert_eq!(e.get_next_raw(),Some(Token::end_group()));
    }

    #[test]
    fn optionals() {
        let mut e = engine("[a[b]{]}c]d");
        assert_eq!(e.read_optional('[',']').unwrap().map(|t| tokens_to_string(&t)),Some("a[b]{]}c".to_string()));
        assert_eq!(e.read_optional('[',']').unwrap(),None);
        assert_eq!(e.get_next_raw(),Some(Token::letter('d')));
    }

    #[test]
    fn keywords() {
        let mut e = engine("PLUS 3 minu");
        assert!(e.read_keyword("plus").unwrap());
        assert!(!e.read_keyword("fil").unwrap());
        assert_eq!(e.get_next_raw(),Some(Token::other('3')));
        assert!(!e.read_keyword("minus").unwrap());
        assert_eq!(e.get_next_raw().map(|t| t.catcode),Some(CategoryCode::Letter));
    }

    #[test]
    fn full_expansion() {
        let mut e = Engine::default();
        e.parse_string(r"\def\a{x}\def\b{\a\a}\protected\def\c{z}").unwrap();
        let tks = e.expand_fully(vec!(Token::cs("b"),Token::cs("c"),Token::cs("relax"))).unwrap();
        assert_eq!(tokens_to_string(&tks),"xx\\c\\relax");
    }
}
