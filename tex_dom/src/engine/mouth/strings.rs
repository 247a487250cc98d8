/*! String tokenizer for TeX input, primarily from files.
*/
use crate::tex::catcodes::{CategoryCode, CategoryTable};
use crate::tex::tokens::{SourceRef, Token};
use crate::utils::Ptr;

/// A [`StringTokenizer`] is in one of three states
#[derive(Copy,Clone,PartialEq,Eq,Debug)]
pub enum MouthState {
    /// Beginning of line
    NewLine,
    /// After a space (or control word)
    SkipBlank,
    /// In the middle of a line
    MidLine
}

/** Takes a string and lazily turns it into [`Token`]s, according to a [`CategoryTable`] that
  may change between any two calls to [`get_next`](StringTokenizer::get_next).

  *Example:*
```rust
use tex_dom::engine::mouth::strings::StringTokenizer;
use tex_dom::tex::catcodes::{CategoryCode,DEFAULT_TABLE};

let cc = &*DEFAULT_TABLE;
let mut tokenizer = StringTokenizer::new("\\foo   \n  \n   {a}{!}","<string>");
let next = tokenizer.get_next(cc).unwrap(); // \foo
assert!(next.is_cs_named("foo"));
let next = tokenizer.get_next(cc).unwrap(); // \par
assert!(next.is_cs_named("par"));
let next = tokenizer.get_next(cc).unwrap(); // {
assert_eq!(next.catcode, CategoryCode::BeginGroup);
let next = tokenizer.get_next(cc).unwrap(); // a
assert_eq!(next.catcode, CategoryCode::Letter);
let next = tokenizer.get_next(cc).unwrap(); // }
assert_eq!(next.catcode, CategoryCode::EndGroup);
let next = tokenizer.get_next(cc).unwrap(); // {
assert_eq!(next.catcode, CategoryCode::BeginGroup);
let next = tokenizer.get_next(cc).unwrap(); // !
assert_eq!(next.catcode, CategoryCode::Other);
let next = tokenizer.get_next(cc).unwrap(); // }
assert_eq!(next.catcode, CategoryCode::EndGroup);
assert!(tokenizer.get_next(cc).is_none()); // EOF
```
*/
#[derive(Clone,Debug)]
pub struct StringTokenizer {
    state : MouthState,
    file:Ptr<str>,
    lines:Vec<Vec<char>>,
    line : usize,
    col : usize,
    /// whether the last token returned was a paragraph break
    prev_par:bool,
    tempstr:String
}

impl StringTokenizer {
    /// Create a new [`StringTokenizer`] for the string `source`, originating from `file`. Line
    /// endings are normalized to `\n`, which is kept at the end of every line that has one.
    pub fn new<S:Into<Ptr<str>>>(source:&str,file:S) -> Self {
        let normalized = source.replace("\r\n","\n").replace('\r',"\n");
        let lines = normalized.split_inclusive('\n').map(|l| l.chars().collect()).collect();
        Self {
            state: MouthState::NewLine,
            file:file.into(),
            lines,
            line: 0,
            col: 0,
            prev_par:false,
            tempstr:String::new()
        }
    }
    /// The file name this tokenizer reads from
    pub fn file(&self) -> &Ptr<str> { &self.file }
    /// The current line (1-based)
    #[inline(always)]
    pub fn line(&self) -> usize { self.line + 1 }
    /// The current column (1-based)
    #[inline(always)]
    pub fn column(&self) -> usize { self.col + 1 }
    pub fn state(&self) -> MouthState { self.state }
    /// whether the end of the input has been reached
    #[inline(always)]
    pub fn eof(&self) -> bool {
        self.line >= self.lines.len()
    }
    /// The current position
    pub fn source_ref(&self) -> SourceRef {
        SourceRef { file:self.file.clone(), line:self.line(), column:self.column() }
    }
    /// The unread rest of the current line
    pub fn preview(&self) -> String {
        match self.lines.get(self.line) {
            Some(l) => l.iter().skip(self.col).filter(|c| **c != '\n').collect(),
            None => String::new()
        }
    }
    /// Skips the rest of the current line
    pub fn skip_line(&mut self) {
        if !self.eof() {
            self.line += 1;
            self.col = 0;
        }
    }

    /// `\endinput`: the rest of the current line is still read, everything after it is dropped
    pub fn end_input(&mut self) {
        self.lines.truncate(self.line + 1);
    }
    /// Reads the next character without assigning it a category code
    pub fn read_char(&mut self) -> Option<char> {
        self.state = MouthState::MidLine;
        self.get_char()
    }
    /// Reads characters verbatim until `end` is encountered, and returns them without `end`. Returns `None`
    /// (having consumed the rest of the input) if `end` never occurs.
    pub fn read_until(&mut self,end:&str) -> Option<String> {
        let mut ret = String::new();
        while let Some(c) = self.get_char() {
            ret.push(c);
            if ret.ends_with(end) {
                ret.truncate(ret.len() - end.len());
                self.state = MouthState::MidLine;
                return Some(ret)
            }
        }
        None
    }

    #[inline(always)]
    fn get_char(&mut self) -> Option<char> {
        loop {
            let line = self.lines.get(self.line)?;
            match line.get(self.col) {
                Some(c) => {
                    self.col += 1;
                    return Some(*c)
                }
                None => {
                    self.line += 1;
                    self.col = 0;
                }
            }
        }
    }
    /// Moves to the start of the next line if the current one is exhausted.
    fn normalize(&mut self) {
        while let Some(l) = self.lines.get(self.line) {
            if self.col < l.len() { break }
            self.line += 1;
            self.col = 0;
        }
    }
    #[inline(always)]
    fn peek_char(&self) -> Option<char> {
        self.lines.get(self.line).and_then(|l| l.get(self.col)).copied()
    }

    /// Reads the next character and its category code, resolving `^^` notation and dropping
    /// ignored and invalid characters.
    fn next_char(&mut self, cc:&CategoryTable) -> Option<(char,CategoryCode)> { loop {
        let c = self.get_char()?;
        let (c,code) = match cc.which_code(c) {
            CategoryCode::Superscript => match self.maybe_superscript(c) {
                Some(c) => (c,cc.which_code(c)),
                None => (c,CategoryCode::Superscript)
            }
            code => (c,code)
        };
        match code {
            CategoryCode::Ignored | CategoryCode::Invalid => continue,
            _ => return Some((c,code))
        }
    }}

    /// Returns the next [`Token`], or `None` at the end of the input.
    pub fn get_next(&mut self, cc: &CategoryTable) -> Option<Token> { loop {
        self.normalize();
        let source = self.source_ref();
        let (c,code) = self.next_char(cc)?;
        if let Some(tk) = self.check_char(cc,c,code) {
            self.prev_par = tk.is_cs_named("par");
            return Some(tk.with_source(Some(source)))
        }
    }}

    fn check_char(&mut self, cc:&CategoryTable, c:char, code:CategoryCode) -> Option<Token> {
        use CategoryCode::*;
        match code {
            Letter | Other => {
                self.state = MouthState::MidLine;
                Some(Token::from_char(c,code))
            }
            Space if self.state == MouthState::MidLine => {
                self.state = MouthState::SkipBlank;
                Some(Token::space())
            }
            Space => None,
            EOL => {
                self.skip_rest_of_line();
                self.return_endline()
            }
            Escape => Some(self.get_escape(cc)),
            Comment => {
                self.skip_rest_of_line();
                self.state = MouthState::NewLine;
                None
            }
            Active => {
                self.state = MouthState::MidLine;
                Some(Token::active(c))
            }
            _ => {
                self.state = MouthState::MidLine;
                Some(Token::from_char(c,code))
            }
        }
    }

    fn skip_rest_of_line(&mut self) {
        if let Some(l) = self.lines.get(self.line) {
            self.col = l.len();
        }
    }

    fn return_endline(&mut self) -> Option<Token> {
        match self.state {
            MouthState::SkipBlank => {
                self.state = MouthState::NewLine;
                None
            }
            MouthState::MidLine => {
                self.state = MouthState::NewLine;
                Some(Token::space())
            }
            MouthState::NewLine => self.do_par()
        }
    }

    /// A paragraph break, unless the previous token was one already.
    fn do_par(&mut self) -> Option<Token> {
        if self.prev_par { None } else { Some(Token::cs("par")) }
    }

    fn get_escape(&mut self, cc:&CategoryTable) -> Token {
        match self.next_char(cc) {
            None => {
                self.state = MouthState::SkipBlank;
                Token::cs("")
            }
            Some((_,CategoryCode::EOL)) => {
                self.state = MouthState::SkipBlank;
                Token::cs("")
            }
            Some((c,CategoryCode::Letter)) => self.get_cs_name(cc,c),
            Some((c,_)) => {
                self.state = MouthState::MidLine;
                Token::from_char(c,CategoryCode::Escape)
            }
        }
    }

    fn get_cs_name(&mut self, cc:&CategoryTable, first:char) -> Token {
        self.tempstr.clear();
        self.tempstr.push(first);
        self.state = MouthState::SkipBlank;
        loop {
            let (line,col) = (self.line,self.col);
            match self.next_char(cc) {
                Some((c,CategoryCode::Letter)) => self.tempstr.push(c),
                _ => {
                    self.line = line;
                    self.col = col;
                    break
                }
            }
        }
        Token::cs(self.tempstr.as_str())
    }

    #[inline(always)]
    fn is_hex(c:char) -> bool {
        c.is_ascii_digit() || ('a'..='f').contains(&c)
    }

    /// Having read a superscript character `firstsup`, checks whether it is followed by
    /// `firstsup` again (`^^` notation); if so, consumes and returns the encoded character,
    /// otherwise consumes nothing.
    fn maybe_superscript(&mut self, firstsup:char) -> Option<char> {
        let (line,col) = (self.line,self.col);
        if self.peek_char() != Some(firstsup) { return None }
        self.col += 1;
        let first = match self.peek_char() {
            Some(c) if c != '\n' => c,
            _ => {
                self.line = line;
                self.col = col;
                return None
            }
        };
        self.col += 1;
        if let Some(second) = self.peek_char() {
            if Self::is_hex(first) && Self::is_hex(second) {
                let mut s = String::with_capacity(2);
                s.push(first);
                s.push(second);
                if let Some(c) = u8::from_str_radix(&s,16).ok().map(|u| u as char) {
                    self.col += 1;
                    return Some(c)
                }
            }
        }
        let u = first as u32;
        if u < 128 {
            let u = if u < 64 { u + 64 } else { u - 64 };
            char::from_u32(u)
        } else {
            self.line = line;
            self.col = col;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::catcodes::DEFAULT_TABLE;
    use CategoryCode::*;

    fn tokenize(s:&str) -> Vec<Token> {
        let mut t = StringTokenizer::new(s,"<string>");
        let mut ret = Vec::new();
        while let Some(tk) = t.get_next(&DEFAULT_TABLE) { ret.push(tk) }
        ret
    }

    #[test]
    fn hskip() {
        assert_eq!(tokenize("{\\hskip 36 pt}"),vec![
            Token::begin_group(),Token::cs("hskip"),Token::other('3'),Token::other('6'),
            Token::space(),Token::letter('p'),Token::letter('t'),Token::end_group()
        ]);
    }
    #[test]
    fn comment() {
        assert_eq!(tokenize("line % comment"),Token::from_text("line "));
    }
    #[test]
    fn symbols() {
        assert_eq!(tokenize("\\ { } $ & # ^ _ ~ %"),vec![
            Token::cs(" "),Token::begin_group(),Token::space(),Token::end_group(),Token::space(),
            Token::new("$",MathShift),Token::space(),Token::new("&",AlignmentTab),Token::space(),
            Token::new("#",Parameter),Token::space(),Token::new("^",Superscript),Token::space(),
            Token::new("_",Subscript),Token::space(),Token::active('~'),Token::space()
        ]);
        assert_eq!(tokenize("\\\\ \\{ \\%"),vec![
            Token::cs("\\"),Token::space(),Token::cs("{"),Token::space(),Token::cs("%")
        ]);
    }
    #[test]
    fn double_superscript() {
        assert_eq!(tokenize("^^I ^^A ^^@ ^^M"),vec![Token::other('\u{1}'),Token::space()]);
        assert_eq!(tokenize("^^41^^5a"),vec![Token::letter('A'),Token::letter('Z')]);
        assert_eq!(tokenize("^^B^^BM^^A^^B^^C^^M^^@\\M "),vec![
            Token::other('\u{2}'),Token::other('\u{2}'),Token::letter('M'),Token::other('\u{1}'),
            Token::other('\u{2}'),Token::other('\u{3}'),Token::space()
        ]);
        // `^^M` ends the line, the rest of it is dropped
        assert_eq!(tokenize("a^^Mb c\nd"),vec![Token::letter('a'),Token::space(),Token::letter('d')]);
        assert_eq!(tokenize("a^^M\n\nb"),vec![Token::letter('a'),Token::space(),Token::cs("par"),Token::letter('b')]);
    }
    #[test]
    fn paragraphs() {
        assert_eq!(tokenize("1\n   2\n   \n   3\n"),vec![
            Token::other('1'),Token::space(),Token::other('2'),Token::space(),Token::cs("par"),
            Token::other('3'),Token::space()
        ]);
        // several blank lines collapse into one paragraph break
        assert_eq!(tokenize("Hi!\n\n\n"),vec![
            Token::letter('H'),Token::letter('i'),Token::other('!'),Token::space(),Token::cs("par")
        ]);
    }
    #[test]
    fn exercises() {
        assert_eq!(tokenize(" $x^2$~  \\TeX  ^^C"),vec![
            Token::new("$",MathShift),Token::letter('x'),Token::new("^",Superscript),Token::other('2'),
            Token::new("$",MathShift),Token::active('~'),Token::space(),Token::cs("TeX"),Token::other('\u{3}')
        ]);
    }
    #[test]
    fn escape_at_line_end() {
        assert_eq!(tokenize("a\\\nb"),vec![Token::letter('a'),Token::cs(""),Token::letter('b')]);
    }
    #[test]
    fn verbatim() {
        let mut t = StringTokenizer::new("\\verb|\\x{ }|y\n%\\end{verbatim}","<string>");
        assert!(t.get_next(&DEFAULT_TABLE).unwrap().is_cs_named("verb"));
        assert_eq!(t.read_char(),Some('|'));
        assert_eq!(t.read_until("|").as_deref(),Some("\\x{ }"));
        assert_eq!(t.get_next(&DEFAULT_TABLE),Some(Token::letter('y')));
        assert_eq!(t.read_until("\\end{verbatim}").as_deref(),Some("\n%"));
        assert_eq!(t.get_next(&DEFAULT_TABLE),None);
        let mut t = StringTokenizer::new("abc","<string>");
        assert_eq!(t.read_until("x"),None);
    }
    #[test]
    fn end_input() {
        let mut t = StringTokenizer::new("a\\endinput b\nc","<string>");
        assert_eq!(t.get_next(&DEFAULT_TABLE),Some(Token::letter('a')));
        assert!(t.get_next(&DEFAULT_TABLE).unwrap().is_cs_named("endinput"));
        t.end_input();
        assert_eq!(t.get_next(&DEFAULT_TABLE),Some(Token::letter('b')));
        assert_eq!(t.get_next(&DEFAULT_TABLE),Some(Token::space()));
        assert_eq!(t.get_next(&DEFAULT_TABLE),None);
    }
    #[test]
    fn positions() {
        let mut t = StringTokenizer::new("a\n\\foo","test.tex");
        let a = t.get_next(&DEFAULT_TABLE).unwrap();
        assert_eq!(a.source.map(|s| (s.line,s.column)),Some((1,1)));
        let _space = t.get_next(&DEFAULT_TABLE);
        let foo = t.get_next(&DEFAULT_TABLE).unwrap();
        assert_eq!(foo.source.map(|s| (s.line,s.column)),Some((2,1)));
    }
}
