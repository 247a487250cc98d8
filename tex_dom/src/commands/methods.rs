/*! Methods shared by the definition primitives: compiling and expanding [`Macro`]s, and
scanning conditionals.
*/

use log::{debug, trace, warn};
use crate::commands::{ExpToken, Macro, MacroKind, ParamToken, PrimitiveCommand, TeXCommand};
use crate::engine::Engine;
use crate::tex::catcodes::CategoryCode;
use crate::tex::tokens::Token;
use crate::utils::errors::TeXResult;
use crate::{file_end, throw};

/// Collapses runs of parameter characters: a run of `n` becomes a run of `⌈n/2⌉`, so that
/// `##1` in a definition read without an enclosing expansion means `#1`.
pub fn normalize_params(tks:Vec<Token>) -> Vec<Token> {
    let mut runs = Vec::with_capacity(tks.len());
    let mut run = 0usize;
    for t in &tks {
        if t.catcode == CategoryCode::Parameter { run += 1 } else if run > 0 {
            runs.push(run);
            run = 0;
        }
    }
    if run > 0 { runs.push(run) }
    let mut runs = runs.into_iter();
    let mut ret = Vec::with_capacity(tks.len());
    let mut iter = tks.into_iter().peekable();
    while let Some(t) = iter.next() {
        if t.catcode != CategoryCode::Parameter {
            ret.push(t);
            continue
        }
        let n = runs.next().unwrap_or(1);
        for _ in 1..n { iter.next(); }
        for _ in 0..n.div_ceil(2) { ret.push(t.clone()) }
    }
    ret
}

/// Whether a signature contains a run of two or more parameter characters.
fn has_doubled_params(tks:&[Token]) -> bool {
    tks.windows(2).any(|w| w[0].catcode == CategoryCode::Parameter && w[1].catcode == CategoryCode::Parameter)
}

fn param_number(t:&Token) -> Option<u8> {
    match t.char() {
        Some(c @ '1'..='9') if t.catcode != CategoryCode::Escape && t.text.len() == 1 => Some(c as u8 - b'0'),
        _ => None
    }
}

/// Compiles a parameter text: `#n` becomes a parameter, everything else a delimiter.
pub fn compile_signature(tks:Vec<Token>) -> Vec<ParamToken> {
    let mut ret = Vec::new();
    let mut iter = tks.into_iter().peekable();
    while let Some(t) = iter.next() {
        if t.catcode == CategoryCode::Parameter {
            if let Some(n) = iter.peek().and_then(param_number) {
                iter.next();
                ret.push(ParamToken::Param(n));
                continue
            }
            warn!(target:"expansion","Parameters must be numbered consecutively");
            continue
        }
        ret.push(ParamToken::Token(t))
    }
    ret
}

/// Compiles a replacement text: `#n` becomes a parameter and `##` a single `#`.
pub fn compile_body(tks:Vec<Token>) -> Vec<ExpToken> {
    let mut ret = Vec::new();
    let mut iter = tks.into_iter().peekable();
    while let Some(t) = iter.next() {
        if t.catcode == CategoryCode::Parameter {
            match iter.peek() {
                Some(n) if n.catcode == CategoryCode::Parameter => {
                    if let Some(n) = iter.next() { ret.push(ExpToken::Token(n)) }
                    continue
                }
                Some(n) => if let Some(i) = param_number(n) {
                    iter.next();
                    ret.push(ExpToken::Param(i));
                    continue
                }
                None => ()
            }
            warn!(target:"expansion","Illegal parameter number in definition");
        }
        ret.push(ExpToken::Token(t))
    }
    ret
}

/// Reads the parameter text and the body of a `\def`-like definition. `expand` makes it an `\edef`.
pub fn read_definition(engine:&mut Engine,name:&str,expand:bool) -> TeXResult<Macro> {
    let mut sig = Vec::new();
    loop {
        let Some(t) = engine.get_next_raw() else { file_end!(name) };
        if t.catcode == CategoryCode::BeginGroup { break }
        sig.push(t)
    }
    if sig.last().map(|t| t.catcode == CategoryCode::Parameter).unwrap_or(false) {
        debug!(target:"expansion","Ignoring trailing # in parameter text of \\{}",name);
        sig.pop();
    }
    let mut body = engine.read_group()?;
    if expand { body = engine.expand_fully(body)? }
    if has_doubled_params(&sig) {
        sig = normalize_params(sig);
        body = normalize_params(body);
    }
    let protected = std::mem::take(&mut engine.aux.protected_next);
    Ok(Macro {
        name:name.into(),
        kind:MacroKind::Def,
        signature:compile_signature(sig),
        default:None,
        expansion:compile_body(body),
        protected
    })
}

/// Strips one pair of braces enclosing all of `tks`.
fn strip_braces(mut tks:Vec<Token>) -> Vec<Token> {
    if tks.len() < 2 || tks[0].catcode != CategoryCode::BeginGroup ||
        tks[tks.len() - 1].catcode != CategoryCode::EndGroup { return tks }
    let mut depth = 0usize;
    for (i,t) in tks.iter().enumerate() {
        match t.catcode {
            CategoryCode::BeginGroup => depth += 1,
            CategoryCode::EndGroup => {
                depth -= 1;
                if depth == 0 && i < tks.len() - 1 { return tks }
            }
            _ => ()
        }
    }
    tks.pop();
    tks.remove(0);
    tks
}

/// Reads the arguments of an invocation of `m`.
pub fn read_macro_args(engine:&mut Engine,m:&Macro,tk:&Token) -> TeXResult<Vec<Vec<Token>>> {
    let mut args = Vec::new();
    if m.kind == MacroKind::NewCommand {
        for i in 0..m.arity() {
            if i == 0 {
                if let Some(d) = &m.default {
                    args.push(engine.read_optional('[',']')?.unwrap_or_else(|| d.clone()));
                    continue
                }
            }
            match engine.read_argument()? {
                Some((a,_)) => args.push(a),
                None => file_end!(tk.text)
            }
        }
        return Ok(args)
    }
    let sig = &m.signature;
    let mut i = 0;
    while i < sig.len() {
        match &sig[i] {
            ParamToken::Token(t) => {
                let Some(next) = engine.get_next_raw() else { file_end!(tk.text) };
                if next != *t {
                    throw!(Argument => "Use of \\{} doesn't match its definition: expected {}, found {}",tk.text,t,next)
                }
                i += 1;
            }
            ParamToken::Param(_) => {
                let delim:Vec<Token> = sig[i + 1..].iter().map_while(|p| match p {
                    ParamToken::Token(t) => Some(t.clone()),
                    ParamToken::Param(_) => None
                }).collect();
                if delim.is_empty() {
                    match engine.read_argument()? {
                        Some((a,_)) => args.push(a),
                        None => file_end!(tk.text)
                    }
                } else {
                    let mut ret = Vec::new();
                    loop {
                        let Some(t) = engine.get_next_raw() else { file_end!(tk.text) };
                        if t.catcode == CategoryCode::BeginGroup {
                            ret.push(t);
                            ret.extend(engine.read_group()?);
                            ret.push(Token::end_group());
                            continue
                        }
                        ret.push(t);
                        if ret.ends_with(&delim) {
                            ret.truncate(ret.len() - delim.len());
                            break
                        }
                    }
                    args.push(strip_braces(ret));
                    i += delim.len();
                }
                i += 1;
            }
        }
    }
    Ok(args)
}

/// Replaces the parameters in the body of `m` by `args`.
pub fn substitute(m:&Macro,args:&[Vec<Token>]) -> Vec<Token> {
    let mut ret = Vec::with_capacity(m.expansion.len());
    for e in &m.expansion {
        match e {
            ExpToken::Token(t) => ret.push(t.clone()),
            ExpToken::Param(n) => if let Some(a) = args.get(*n as usize - 1) {
                ret.extend(a.iter().cloned())
            }
        }
    }
    ret
}

/// Reads the arguments of `m` and returns its expansion.
pub fn expand_macro(engine:&mut Engine,m:&Macro,tk:&Token) -> TeXResult<Vec<Token>> {
    let args = read_macro_args(engine,m,tk)?;
    trace!(target:"expansion","\\{} with {} arguments",tk.text,args.len());
    Ok(substitute(m,&args))
}

/// The branches of a conditional, up to its `\fi`.
#[derive(Clone,Debug,Default,PartialEq)]
pub struct IfContent {
    /// The branches separated by `\or`; a plain `\if` has only one
    pub cases:Vec<Vec<Token>>,
    pub else_:Option<Vec<Token>>
}

fn primitive_name(engine:&Engine,tk:&Token) -> Option<&'static str> {
    match engine.state.get_command(&tk.text) {
        Some(TeXCommand::Primitive{name,..}) => Some(name),
        _ => None
    }
}
fn is_conditional(engine:&Engine,tk:&Token) -> bool {
    match engine.state.get_command(&tk.text) {
        Some(TeXCommand::Primitive{cmd:PrimitiveCommand::Conditional(_),..}) => true,
        Some(TeXCommand::Primitive{name:"ifcase",..}) => true,
        Some(TeXCommand::Switch{..}) => true,
        None | Some(TeXCommand::Unrecognized(_)) => tk.text.starts_with("if") && engine.state.get_let(&tk.text).is_none(),
        _ => false
    }
}

/// Reads the rest of a conditional without expanding anything; nested conditionals are
/// skipped over as a whole.
pub fn read_if_content(engine:&mut Engine) -> TeXResult<IfContent> {
    let mut depth = 0usize;
    let mut ret = IfContent { cases:vec!(Vec::new()), else_:None };
    loop {
        let Some(t) = engine.get_next_raw() else {
            warn!(target:"conditionals","Input ended inside a conditional");
            break
        };
        if t.is_cs() {
            if is_conditional(engine,&t) {
                depth += 1;
            } else {
                match primitive_name(engine,&t) {
                    Some("fi") if depth == 0 => break,
                    Some("fi") => depth -= 1,
                    Some("else") if depth == 0 && ret.else_.is_none() => {
                        ret.else_ = Some(Vec::new());
                        continue
                    }
                    Some("or") if depth == 0 && ret.else_.is_none() => {
                        ret.cases.push(Vec::new());
                        continue
                    }
                    _ => ()
                }
            }
        }
        match &mut ret.else_ {
            Some(e) => e.push(t),
            None => if let Some(c) = ret.cases.last_mut() { c.push(t) }
        }
    }
    Ok(ret)
}

/// Continues with the true or the false branch of a conditional.
pub fn process_if(engine:&mut Engine,b:bool) -> TeXResult<()> {
    let content = read_if_content(engine)?;
    trace!(target:"conditionals","Taking {} branch",if b {"true"} else {"false"});
    let branch = if b { content.cases.into_iter().next() } else { content.else_ };
    if let Some(tks) = branch { engine.mouth.push_tokens(tks) }
    Ok(())
}

/// Continues with branch `n` of an `\ifcase`, or its `\else` branch.
pub fn process_ifcase(engine:&mut Engine,n:i64) -> TeXResult<()> {
    let content = read_if_content(engine)?;
    let branch = if n >= 0 && (n as usize) < content.cases.len() {
        content.cases.into_iter().nth(n as usize)
    } else {
        content.else_
    };
    if let Some(tks) = branch { engine.mouth.push_tokens(tks) }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::tokens::{tokens_to_source, tokens_to_string};

    fn param() -> Token { Token::new("#",CategoryCode::Parameter) }

    #[test]
    fn normalization() {
        let tks = vec!(param(),param(),Token::other('1'),Token::letter('a'),param(),Token::other('2'),
                       param(),param(),param(),param(),Token::other('1'));
        let out = normalize_params(tks);
        assert_eq!(tokens_to_string(&out),"#1a#2##1");
        assert!(!has_doubled_params(&out[..3]));
        assert!(has_doubled_params(&out));
    }

    #[test]
    fn bodies() {
        let mut tks = vec!(Token::letter('a'),param(),Token::other('1'),param(),param(),Token::other('2'));
        tks.push(param());
        let body = compile_body(tks);
        assert_eq!(body,vec!(ExpToken::Token(Token::letter('a')),ExpToken::Param(1),ExpToken::Token(param()),
                             ExpToken::Token(Token::other('2')),ExpToken::Token(param())));
    }

    #[test]
    fn braces() {
        let g = |s:&str| {
            let mut v = vec!(Token::begin_group());
            v.extend(Token::from_text(s));
            v.push(Token::end_group());
            v
        };
        assert_eq!(tokens_to_string(&strip_braces(g("ab"))),"ab");
        let mut two = g("a");
        two.extend(g("b"));
        assert_eq!(strip_braces(two.clone()),two);
    }

    #[test]
    fn delimited_arguments() {
        let mut e = Engine::default();
        e.parse_string(r"\def\a#1.#2\stop{[#2|#1]}").unwrap();
        e.mouth.push_string(r"x{.}y.{z}\stop rest","<string>");
        let Some(TeXCommand::Macro(m)) = e.state.get_command("a").cloned() else { panic!("no macro") };
        let out = expand_macro(&mut e,&m,&Token::cs("a")).unwrap();
        assert_eq!(tokens_to_string(&out),"[z|x{.}y]");
        assert_eq!(e.get_next_raw(),Some(Token::letter('r')));
    }

    #[test]
    fn mismatch() {
        let mut e = Engine::default();
        e.parse_string(r"\def\a.#1{#1}").unwrap();
        e.mouth.push_string(r"x","<string>");
        let Some(TeXCommand::Macro(m)) = e.state.get_command("a").cloned() else { panic!("no macro") };
        assert!(expand_macro(&mut e,&m,&Token::cs("a")).is_err());
    }

    #[test]
    fn if_content() {
        let mut e = Engine::default();
        e.mouth.push_string(r"a\ifx b\else c\fi\or d\else e\fi f","<string>");
        let c = read_if_content(&mut e).unwrap();
        assert_eq!(c.cases.len(),2);
        assert_eq!(tokens_to_source(&c.cases[0]),"a\\ifx b\\else c\\fi");
        assert_eq!(tokens_to_string(&c.cases[1]),"d");
        assert_eq!(c.else_.map(|e| tokens_to_string(&e)).as_deref(),Some("e"));
        assert_eq!(e.get_next_raw(),Some(Token::letter('f')));
    }
}
