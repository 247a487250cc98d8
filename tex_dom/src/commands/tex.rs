/*! The TeX primitives: definitions, category codes, grouping, registers, conditionals, files.

Primitives that only change the state are [`Unexpandable`](crate::commands::PrimitiveCommand::Unexpandable),
those that rewrite the input [`Expandable`](crate::commands::PrimitiveCommand::Expandable). Grouping produces
`bgroup`/`egroup` nodes, so that the digestion of the document tree can follow the scopes.
*/

use chrono::Datelike;
use log::{debug, info, warn};
use crate::commands::{methods, ElementSpec, TeXCommand};
use crate::commands::primitives::*;
use crate::engine::Engine;
use crate::engine::gullet::numeric_methods::*;
use crate::tex::catcodes::CategoryCode;
use crate::tex::nodes::{Digest, MacroMode, NodeId, NodeLevel};
use crate::tex::numerics::{Dim, Fill, RegisterValue, Skip};
use crate::tex::tokens::{tokens_to_string, Token, ACTIVE_PREFIX};
use crate::utils::errors::TeXResult;
use crate::utils::{to_roman, Ptr};
use crate::{file_end, throw};

/// Tokens of category other (and space), as produced by `\string`, `\the` and `\meaning`.
pub fn string_tokens(s:&str) -> Vec<Token> {
    s.chars().map(|c| if c == ' ' { Token::space() } else { Token::other(c) }).collect()
}

/// Reads the control sequence (or active character) that is being defined.
fn read_defined_cs(engine:&mut Engine,cmd:&str) -> TeXResult<Ptr<str>> {
    engine.skip_whitespace();
    match engine.get_next_raw() {
        Some(t) if t.is_cs() => Ok(t.text),
        Some(t) => throw!(Argument => "Missing control sequence after \\{} (found {})",cmd,t),
        None => file_end!(cmd)
    }
}

pub fn def(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let global = engine.state.take_global();
    define(engine,"def",false,global)
}
pub fn edef(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let global = engine.state.take_global();
    define(engine,"edef",true,global)
}
pub fn gdef(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    engine.state.take_global();
    define(engine,"gdef",false,true)
}
pub fn xdef(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    engine.state.take_global();
    define(engine,"xdef",true,true)
}
fn define(engine:&mut Engine,cmd:&str,expand:bool,global:bool) -> TeXResult<()> {
    let name = read_defined_cs(engine,cmd)?;
    let m = methods::read_definition(engine,&name,expand)?;
    debug!(target:"expansion","\\{} \\{}",cmd,name);
    engine.state.set_command(name,TeXCommand::Macro(Ptr::new(m)),global);
    Ok(())
}

/// `\let\cs = token`: an optional `=` and one optional space after it.
pub fn let_(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let global = engine.state.take_global();
    let name = read_defined_cs(engine,"let")?;
    engine.skip_whitespace();
    let Some(mut source) = engine.get_next_raw() else { file_end!("let") };
    if source.catcode == CategoryCode::Other && &*source.text == "=" {
        source = match engine.get_next_raw() {
            Some(t) if t.catcode == CategoryCode::Space => match engine.get_next_raw() {
                Some(t) => t,
                None => file_end!("let")
            },
            Some(t) => t,
            None => file_end!("let")
        };
    }
    engine.state.let_token(&name,&source,global);
    Ok(())
}

/// `\futurelet\cs t1 t2`: lets `\cs` be `t2`, then continues with `t1 t2`.
pub fn futurelet(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let global = engine.state.take_global();
    let name = read_defined_cs(engine,"futurelet")?;
    let (Some(first),Some(second)) = (engine.get_next_raw(),engine.get_next_raw()) else { file_end!("futurelet") };
    engine.state.let_token(&name,&second,global);
    engine.mouth.push_tokens(vec!(first,second));
    Ok(())
}

pub fn chardef(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    let global = engine.state.take_global();
    let math = tk.is_cs_named("mathchardef");
    let name = read_defined_cs(engine,&tk.text)?;
    engine.read_optional_equals()?;
    let i = read_int(engine)?;
    let code = if math { i & 0xFF } else { i };
    let Some(c) = u32::try_from(code).ok().and_then(char::from_u32) else {
        warn!(target:"commands","Bad character code ({}) for \\{}",i,name);
        return Ok(())
    };
    let cmd = if math { TeXCommand::MathCharDef(c) } else { TeXCommand::CharDef(c) };
    engine.state.set_command(name,cmd,global);
    Ok(())
}

pub fn char(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let i = read_int(engine)?;
    match u32::try_from(i).ok().and_then(char::from_u32) {
        Some(c) => engine.requeue(Token::from_char(c,CategoryCode::Other)),
        None => warn!(target:"commands","Bad character code ({})",i)
    }
    Ok(())
}

/// `\catcode c = n`. Local to the current group unless `\global`.
pub fn catcode(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let global = engine.state.take_global();
    let c = read_int(engine)?;
    engine.read_optional_equals()?;
    let code = read_int(engine)?;
    let Some(c) = u32::try_from(c).ok().and_then(char::from_u32) else {
        throw!(Structure => "Bad character code ({})",c)
    };
    let Some(code) = u8::try_from(code).ok().and_then(|i| CategoryCode::try_from(i).ok()) else {
        throw!(Structure => "Invalid code ({}), should be in the range 0..15",code)
    };
    debug!(target:"tokenizer","\\catcode`{}={}",c,code);
    engine.state.set_catcode(c,code,global);
    Ok(())
}

/// `\csname ... \endcsname`; an undefined name is locally defined as `\relax`.
pub fn csname(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    let mut name = String::new();
    loop {
        match engine.next_unexpandable()? {
            None => file_end!("csname"),
            Some((_,Some(TeXCommand::Primitive{name:"endcsname",..}))) => break,
            Some((tk,_)) if tk.is_cs() => throw!(Argument => "Missing \\endcsname inserted before \\{}",tk.text),
            Some((tk,_)) => name.push_str(&tk.text)
        }
    }
    if !engine.state.is_defined(&name) {
        if let Some(relax) = engine.state.get_command("relax").cloned() {
            engine.state.set_command(name.as_str(),relax,false)
        }
    }
    Ok(vec!(Token::cs(name)))
}

pub fn string(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    let Some(t) = engine.get_next_raw() else { file_end!("string") };
    Ok(match t.text.strip_prefix(ACTIVE_PREFIX) {
        Some(c) if t.is_cs() => string_tokens(c),
        _ if t.is_cs() => string_tokens(&format!("\\{}",t.text)),
        _ => string_tokens(&t.text)
    })
}

/// Marks the next token as not to be expanded.
pub fn noexpand(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    let Some(t) = engine.get_next_raw() else { file_end!("noexpand") };
    let expandable = t.macro_name().and_then(|n| engine.state.get_command(n)).map(|c| c.is_expandable()).unwrap_or(false);
    if t.is_cs() && expandable {
        Ok(vec!(Token::new(t.text.clone(),CategoryCode::Expanded).with_source(t.source)))
    } else {
        Ok(vec!(t))
    }
}

/// Expands the token after the next one once.
pub fn expandafter(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    let Some(first) = engine.get_next_raw() else { file_end!("expandafter") };
    let Some(second) = engine.get_next_token() else { file_end!("expandafter") };
    let cmd = second.macro_name().and_then(|n| engine.state.get_command(n).cloned());
    match cmd {
        Some(c) if engine.expand_once(&second,&c)? => Ok(vec!(first)),
        _ => Ok(vec!(first,second))
    }
}

/// `{` and `\bgroup`: opens a scope and a `bgroup` node that absorbs everything up to the
/// matching `}`.
pub fn bgroup(engine:&mut Engine,tk:&Token) -> TeXResult<Option<NodeId>> {
    open_group(engine,if tk.is_cs_named("begingroup") {"begingroup"} else {"bgroup"})
}
pub fn egroup(engine:&mut Engine,tk:&Token) -> TeXResult<Option<NodeId>> {
    close_group(engine,if tk.is_cs_named("endgroup") {"endgroup"} else {"egroup"})
}
fn open_group(engine:&mut Engine,name:&str) -> TeXResult<Option<NodeId>> {
    let node = engine.doc.create_element(name,NodeLevel::COMMAND,MacroMode::None);
    engine.doc.node_mut(node).digest = Digest::Group;
    engine.state.push(None,&[]);
    Ok(Some(node))
}
fn close_group(engine:&mut Engine,name:&str) -> TeXResult<Option<NodeId>> {
    engine.check_open_group(name)?;
    engine.state.pop();
    Ok(Some(engine.doc.create_element(name,NodeLevel::COMMAND,MacroMode::None)))
}

/// Pushes the contents of the file `name` (searched with extension `.tex`) to the input;
/// a missing file is only a warning.
pub fn input_file(engine:&mut Engine,name:&str) {
    let current = engine.mouth.current_file();
    let Some(path) = engine.aux.filesystem.find(name,"tex",current.as_deref()) else {
        warn!(target:"files","File {} not found",name);
        return
    };
    match engine.aux.filesystem.read(&path) {
        Ok(content) => {
            info!(target:"files","Reading {}",path.display());
            engine.mouth.push_string(&content,path.display().to_string())
        }
        Err(e) => warn!(target:"files","Could not read {}: {}",path.display(),e)
    }
}

pub fn input(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    let name = if tk.is_cs_named("include") { engine.read_name()? } else { engine.read_file_name()? };
    input_file(engine,&name);
    Ok(())
}

pub fn endinput(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    engine.mouth.end_input();
    Ok(())
}

/// The text `\the` produces for the next (unexpandable) token.
fn the_string(engine:&mut Engine) -> TeXResult<Option<String>> {
    let Some((tk,cmd)) = engine.next_unexpandable()? else { file_end!("the") };
    Ok(match cmd {
        Some(TeXCommand::Register(name)) => engine.state.register(&name).map(|v| v.to_string()),
        Some(TeXCommand::CharDef(c) | TeXCommand::MathCharDef(c)) => Some((c as u32).to_string()),
        Some(TeXCommand::Primitive{name:"catcode",..}) => {
            let i = read_int(engine)?;
            let code = u32::try_from(i).ok().and_then(char::from_u32).map(|c| engine.state.which_code(c)).unwrap_or_default();
            Some(u8::from(code).to_string())
        }
        _ => {
            warn!(target:"commands","You can't use {} after \\the",tk);
            None
        }
    })
}

pub fn the(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    Ok(the_string(engine)?.map(|s| string_tokens(&s)).unwrap_or_default())
}

pub fn showthe(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    if let Some(s) = the_string(engine)? {
        info!(target:"commands","> {}.",s);
    }
    Ok(())
}

pub fn number(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    Ok(string_tokens(&read_int(engine)?.to_string()))
}

pub fn romannumeral(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    Ok(string_tokens(&to_roman(read_int(engine)?)))
}

pub fn jobname(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    Ok(string_tokens(&engine.aux.jobname))
}

fn char_meaning(tk:&Token) -> String {
    use CategoryCode::*;
    let kind = match tk.catcode {
        BeginGroup => "begin-group character",
        EndGroup => "end-group character",
        MathShift => "math shift character",
        AlignmentTab => "alignment tab character",
        Parameter => "macro parameter character",
        Superscript => "superscript character",
        Subscript => "subscript character",
        Space => "blank space",
        Letter => "the letter",
        _ => "the character"
    };
    format!("{} {}",kind,tk.text)
}

pub fn meaning(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    let Some(t) = engine.get_next_raw() else { file_end!("meaning") };
    let s = if t.is_cs() {
        match (engine.state.get_let(&t.text),engine.state.get_command(&t.text)) {
            (Some(c),_) => char_meaning(c),
            (None,Some(cmd)) => cmd.meaning(&t.text),
            (None,None) => "undefined".to_string()
        }
    } else {
        char_meaning(&t)
    };
    Ok(string_tokens(&s))
}

pub fn openout(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let stream = read_int(engine)?;
    engine.read_optional_equals()?;
    let name = engine.read_file_name()?;
    engine.aux.filesystem.open_out(stream,&name);
    Ok(())
}

/// `\write n {text}`: the text is expanded completely; negative or unopened streams go to the log.
pub fn write(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let stream = read_int(engine)?;
    let Some((tks,_)) = engine.read_argument()? else { file_end!("write") };
    let tks = engine.expand_fully(tks)?;
    let s = tokens_to_string(&tks);
    if stream < 0 {
        info!(target:"files","{}",s)
    } else {
        engine.aux.filesystem.write(stream,&s)
    }
    Ok(())
}

pub fn closeout(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let stream = read_int(engine)?;
    engine.aux.filesystem.close_out(stream);
    Ok(())
}

/// `\newcount` & co.
pub fn new_register(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    let name = read_defined_cs(engine,&tk.text)?;
    let value = match &*tk.text {
        "newcount" => RegisterValue::Count(0),
        "newdimen" => RegisterValue::Dimen(Dim(0)),
        "newmuskip" => RegisterValue::MuSkip(Skip::default()),
        _ => RegisterValue::Skip(Skip::default())
    };
    engine.state.new_register(&name,value);
    Ok(())
}

fn read_register_value(engine:&mut Engine,like:RegisterValue) -> TeXResult<RegisterValue> {
    Ok(match like {
        RegisterValue::Count(_) => RegisterValue::Count(read_int(engine)?),
        RegisterValue::Dimen(_) => RegisterValue::Dimen(read_dim(engine)?),
        RegisterValue::Skip(_) => RegisterValue::Skip(read_skip(engine)?),
        RegisterValue::MuSkip(_) => RegisterValue::MuSkip(read_muskip(engine)?)
    })
}

/// `\reg = value`, invoked when a register is used as a command.
pub fn assign_register(engine:&mut Engine,name:&Ptr<str>) -> TeXResult<()> {
    engine.state.take_global();
    let Some(old) = engine.state.register(name) else {
        throw!(Undefined => "Register \\{} is not allocated",name)
    };
    engine.read_optional_equals()?;
    let new = read_register_value(engine,old)?;
    debug!(target:"commands","\\{}={}",name,new);
    engine.state.set_register(name,new);
    Ok(())
}

fn add_fill(a:Fill,b:Fill) -> Fill {
    match (a,b) {
        (Fill::Finite(x),Fill::Finite(y)) => Fill::Finite(x + y),
        (Fill::Fil{order:o,factor:f},Fill::Fil{order:p,factor:g}) if o == p => Fill::Fil{order:o,factor:f.saturating_add(g)},
        (Fill::Fil{order:o,..},Fill::Fil{order:p,..}) => if o > p { a } else { b },
        (Fill::Fil{..},_) => a,
        (_,Fill::Fil{..}) => b,
        (Fill::None,x) | (x,Fill::None) => x
    }
}
fn scale_fill(a:Fill,f:&dyn Fn(i64) -> Option<i64>) -> Option<Fill> {
    Some(match a {
        Fill::None => Fill::None,
        Fill::Finite(d) => Fill::Finite(Dim(f(d.0)?)),
        Fill::Fil{order,factor} => Fill::Fil{order,factor:f(factor)?}
    })
}
/// Applies `f` to every component of `v`; `None` if any component overflows.
fn scale(v:RegisterValue,f:&dyn Fn(i64) -> Option<i64>) -> Option<RegisterValue> {
    let skip = |s:Skip| Some(Skip { base:Dim(f(s.base.0)?), stretch:scale_fill(s.stretch,f)?, shrink:scale_fill(s.shrink,f)? });
    Some(match v {
        RegisterValue::Count(i) => RegisterValue::Count(f(i)?),
        RegisterValue::Dimen(d) => RegisterValue::Dimen(Dim(f(d.0)?)),
        RegisterValue::Skip(s) => RegisterValue::Skip(skip(s)?),
        RegisterValue::MuSkip(s) => RegisterValue::MuSkip(skip(s)?)
    })
}
fn add(a:RegisterValue,b:RegisterValue) -> RegisterValue {
    let skip = |s:Skip,t:Skip| Skip { base:s.base + t.base, stretch:add_fill(s.stretch,t.stretch), shrink:add_fill(s.shrink,t.shrink) };
    let i = b.as_int();
    match (a,b) {
        (RegisterValue::Skip(s),RegisterValue::Skip(t)) => RegisterValue::Skip(skip(s,t)),
        (RegisterValue::MuSkip(s),RegisterValue::MuSkip(t)) => RegisterValue::MuSkip(skip(s,t)),
        (RegisterValue::Count(v),_) => RegisterValue::Count(v.saturating_add(i)),
        (RegisterValue::Dimen(d),_) => RegisterValue::Dimen(Dim(d.0.saturating_add(i))),
        (RegisterValue::Skip(s),_) => RegisterValue::Skip(Skip{base:Dim(s.base.0.saturating_add(i)),..s}),
        (RegisterValue::MuSkip(s),_) => RegisterValue::MuSkip(Skip{base:Dim(s.base.0.saturating_add(i)),..s})
    }
}

/// The register an arithmetic command applies to.
fn read_register(engine:&mut Engine,cmd:&str) -> TeXResult<(Ptr<str>,RegisterValue)> {
    match engine.next_unexpandable()? {
        Some((_,Some(TeXCommand::Register(name)))) => match engine.state.register(&name) {
            Some(v) => Ok((name,v)),
            None => throw!(Undefined => "Register \\{} is not allocated",name)
        },
        Some((tk,_)) => throw!(Argument => "You can't use {} after \\{}",tk,cmd),
        None => file_end!(cmd)
    }
}

/// `\advance`, `\multiply` and `\divide`, with an optional `by`.
pub fn arithmetic(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    engine.state.take_global();
    let (name,old) = read_register(engine,&tk.text)?;
    engine.read_keyword("by")?;
    let new = match &*tk.text {
        "advance" => add(old,read_register_value(engine,old)?),
        "multiply" => {
            let i = read_int(engine)?;
            match scale(old,&|v| v.checked_mul(i)) {
                Some(v) => v,
                None => throw!(Other => "Arithmetic overflow: \\{} multiplied by {}",name,i)
            }
        }
        _ => {
            let i = read_int(engine)?;
            if i == 0 { throw!(Other => "Arithmetic overflow: division of \\{} by zero",name) }
            match scale(old,&|v| v.checked_div(i)) {
                Some(v) => v,
                None => throw!(Other => "Arithmetic overflow: \\{} divided by {}",name,i)
            }
        }
    };
    engine.state.set_register(&name,new);
    Ok(())
}

/// `\setlength{\reg}{value}` and `\addtolength{\reg}{value}`.
pub fn setlength(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    let reg = engine.read_cs_name()?;
    let Some(old) = engine.state.register(&reg.text) else {
        throw!(Undefined => "\\{} is not a length",reg.text)
    };
    let Some((tks,_)) = engine.read_argument()? else { file_end!(tk.text) };
    let value = engine.read_from_tokens(tks,|e| read_register_value(e,old))?;
    let new = if tk.is_cs_named("addtolength") { add(old,value) } else { value };
    engine.state.set_register(&reg.text,new);
    Ok(())
}

fn read_relation(engine:&mut Engine,cmd:&str) -> TeXResult<char> {
    engine.skip_whitespace_expanded()?;
    match engine.next_unexpandable()? {
        Some((tk,None)) if tk.catcode == CategoryCode::Other && matches!(&*tk.text,"<" | "=" | ">") => Ok(tk.char().unwrap_or('=')),
        Some((tk,_)) => throw!(Conditional => "Missing = inserted for \\{} (found {})",cmd,tk),
        None => file_end!(cmd)
    }
}
fn compare<A:PartialOrd>(a:A,rel:char,b:A) -> bool {
    match rel {
        '<' => a < b,
        '>' => a > b,
        _ => a == b
    }
}

pub fn ifnum(engine:&mut Engine,_tk:&Token) -> TeXResult<bool> {
    let a = read_int(engine)?;
    let rel = read_relation(engine,"ifnum")?;
    let b = read_int(engine)?;
    Ok(compare(a,rel,b))
}

pub fn ifdim(engine:&mut Engine,_tk:&Token) -> TeXResult<bool> {
    let a = read_dim(engine)?;
    let rel = read_relation(engine,"ifdim")?;
    let b = read_dim(engine)?;
    Ok(compare(a,rel,b))
}

pub fn ifodd(engine:&mut Engine,tk:&Token) -> TeXResult<bool> {
    let odd = read_int(engine)? % 2 != 0;
    Ok(if tk.is_cs_named("ifeven") { !odd } else { odd })
}

/// The character code `\if` compares; `None` for control sequences.
fn if_code(tk:&Token) -> Option<char> {
    match tk.catcode {
        CategoryCode::Escape | CategoryCode::Expanded | CategoryCode::EndTokens => None,
        _ => tk.char()
    }
}
/// The category code `\ifcat` compares.
fn if_cat(tk:&Token) -> CategoryCode {
    match tk.catcode {
        CategoryCode::Escape | CategoryCode::Expanded if tk.text.starts_with(ACTIVE_PREFIX) => CategoryCode::Active,
        CategoryCode::Expanded | CategoryCode::EndTokens => CategoryCode::Escape,
        c => c
    }
}
fn two_expanded(engine:&mut Engine,cmd:&str) -> TeXResult<(Token,Token)> {
    let Some((a,_)) = engine.next_unexpandable()? else { file_end!(cmd) };
    let Some((b,_)) = engine.next_unexpandable()? else { file_end!(cmd) };
    Ok((a,b))
}

pub fn if_(engine:&mut Engine,_tk:&Token) -> TeXResult<bool> {
    let (a,b) = two_expanded(engine,"if")?;
    Ok(if_code(&a) == if_code(&b))
}

pub fn ifcat(engine:&mut Engine,_tk:&Token) -> TeXResult<bool> {
    let (a,b) = two_expanded(engine,"ifcat")?;
    Ok(if_cat(&a) == if_cat(&b))
}

#[derive(PartialEq)]
enum Meaning {
    Char(CategoryCode,Ptr<str>),
    Command(Option<TeXCommand>)
}
fn meaning_of(engine:&Engine,tk:&Token) -> Meaning {
    if !matches!(tk.catcode,CategoryCode::Escape | CategoryCode::Expanded) {
        return Meaning::Char(tk.catcode,tk.text.clone())
    }
    if let Some(t) = engine.state.get_let(&tk.text) {
        return Meaning::Char(t.catcode,t.text.clone())
    }
    match engine.state.get_command(&tk.text) {
        None | Some(TeXCommand::Unrecognized(_)) => Meaning::Command(None),
        Some(c) => Meaning::Command(Some(c.clone()))
    }
}

/// Compares the meanings of the next two tokens, without expanding them.
pub fn ifx(engine:&mut Engine,_tk:&Token) -> TeXResult<bool> {
    let (Some(a),Some(b)) = (engine.get_next_raw(),engine.get_next_raw()) else { file_end!("ifx") };
    Ok(meaning_of(engine,&a) == meaning_of(engine,&b))
}

pub fn ifcase(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    let n = read_int(engine)?;
    methods::process_ifcase(engine,n)?;
    Ok(Vec::new())
}

pub fn ifdefined(engine:&mut Engine,_tk:&Token) -> TeXResult<bool> {
    let Some(t) = engine.get_next_raw() else { file_end!("ifdefined") };
    Ok(!t.is_cs() || engine.state.is_defined(&t.text))
}

/// `\ifmmode`; there is no horizontal/vertical distinction, everything outside math is
/// horizontal.
pub fn ifmode(engine:&mut Engine,tk:&Token) -> TeXResult<bool> {
    let math = engine.state.is_math_mode();
    Ok(match &*tk.text {
        "ifmmode" => math,
        "ifhmode" => !math,
        _ => false
    })
}

/// `\ifvoid` & co: boxes are never stored, so every box register is void.
pub fn ifbox(engine:&mut Engine,tk:&Token) -> TeXResult<bool> {
    read_int(engine)?;
    Ok(matches!(&*tk.text,"ifvoid" | "ifeof"))
}

/// `\newif\iffoo` defines `\iffoo`, `\footrue` and `\foofalse`.
pub fn newif(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let name = read_defined_cs(engine,"newif")?;
    let Some(base) = name.strip_prefix("if") else {
        warn!(target:"commands","\\newif: \\{} does not start with 'if'",name);
        return Ok(())
    };
    let base = base.to_string();
    engine.state.set_command(name.clone(),TeXCommand::Switch{name:name.clone(),state:false},true);
    engine.state.set_command(format!("{}true",base),TeXCommand::SwitchSetter{target:name.clone(),state:true},true);
    engine.state.set_command(format!("{}false",base),TeXCommand::SwitchSetter{target:name,state:false},true);
    Ok(())
}

pub fn register_tex_primitives(engine:&mut Engine) {
    register_unexpandable(engine,"def",def);
    register_unexpandable(engine,"edef",edef);
    register_unexpandable(engine,"gdef",gdef);
    register_unexpandable(engine,"xdef",xdef);
    register_unexpandable(engine,"let",let_);
    register_unexpandable(engine,"futurelet",futurelet);
    register_unexpandable(engine,"global",|e,_| { e.state.global_next = true; Ok(()) });
    register_unexpandable(engine,"long",|_,_| Ok(()));
    register_unexpandable(engine,"outer",|_,_| Ok(()));
    register_unexpandable(engine,"protected",|e,_| { e.aux.protected_next = true; Ok(()) });

    register_unexpandable(engine,"chardef",chardef);
    register_unexpandable(engine,"mathchardef",chardef);
    register_unexpandable(engine,"char",char);
    register_unexpandable(engine,"catcode",catcode);
    register_expandable(engine,"csname",csname);
    register_unexpandable(engine,"endcsname",|_,_| {
        warn!(target:"commands","Extra \\endcsname");
        Ok(())
    });
    register_expandable(engine,"string",string);
    register_expandable(engine,"noexpand",noexpand);
    register_expandable(engine,"expandafter",expandafter);
    register_unexpandable(engine,"relax",|_,_| Ok(()));
    register_element(engine,ElementSpec::new("par","").level(NodeLevel::PAR));

    register_node(engine,"bgroup",bgroup);
    register_node(engine,"egroup",egroup);
    register_node(engine,"begingroup",bgroup);
    register_node(engine,"endgroup",egroup);

    register_unexpandable(engine,"input",input);
    register_unexpandable(engine,"include",input);
    register_unexpandable(engine,"endinput",endinput);

    register_expandable(engine,"the",the);
    register_unexpandable(engine,"showthe",showthe);
    register_expandable(engine,"number",number);
    register_expandable(engine,"romannumeral",romannumeral);
    register_expandable(engine,"jobname",jobname);
    register_expandable(engine,"meaning",meaning);
    let now = engine.aux.start_time;
    engine.state.new_register("year",RegisterValue::Count(now.year() as i64));
    engine.state.new_register("month",RegisterValue::Count(now.month() as i64));
    engine.state.new_register("day",RegisterValue::Count(now.day() as i64));

    register_unexpandable(engine,"openout",openout);
    register_unexpandable(engine,"write",write);
    register_unexpandable(engine,"closeout",closeout);
    register_unexpandable(engine,"immediate",|_,_| Ok(()));

    register_element(engine,ElementSpec::new("hskip","skip:Glue"));
    register_element(engine,ElementSpec::new("vskip","skip:Glue").block());
    register_element(engine,ElementSpec::new("hbox","self").math(false));
    register_element(engine,ElementSpec::new("vbox","self").math(false).block());

    for name in ["newcount","newdimen","newskip","newmuskip","newlength"] {
        register_unexpandable(engine,name,new_register);
    }
    register_unexpandable(engine,"advance",arithmetic);
    register_unexpandable(engine,"multiply",arithmetic);
    register_unexpandable(engine,"divide",arithmetic);
    register_unexpandable(engine,"setlength",setlength);
    register_unexpandable(engine,"addtolength",setlength);

    register_conditional(engine,"if",if_);
    register_conditional(engine,"ifcat",ifcat);
    register_conditional(engine,"ifx",ifx);
    register_conditional(engine,"ifnum",ifnum);
    register_conditional(engine,"ifdim",ifdim);
    register_conditional(engine,"ifodd",ifodd);
    register_conditional(engine,"ifeven",ifodd);
    register_expandable(engine,"ifcase",ifcase);
    for name in ["ifvmode","ifhmode","ifmmode","ifinner"] {
        register_conditional(engine,name,ifmode);
    }
    for name in ["ifvoid","ifhbox","ifvbox","ifeof"] {
        register_conditional(engine,name,ifbox);
    }
    register_conditional(engine,"iftrue",|_,_| Ok(true));
    register_conditional(engine,"iffalse",|_,_| Ok(false));
    register_conditional(engine,"ifdefined",ifdefined);
    register_unexpandable(engine,"newif",newif);
    register_noop(engine,"else");
    register_noop(engine,"or");
    register_noop(engine,"fi");
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::tex::catcodes::CategoryCode;
    use crate::utils::errors::ErrorKind;

    fn text(s:&str) -> String {
        let mut e = Engine::default();
        let doc = e.parse_string(s).unwrap();
        doc.text_content(doc.root())
    }

    #[test]
    fn definitions() {
        let mut e = Engine::default();
        e.parse_string(r"{\def\a{x}\gdef\b{y}\global\def\c{z}\edef\d{\b\b}}").unwrap();
        assert!(!e.state.is_defined("a"));
        assert!(e.state.is_defined("b"));
        assert!(e.state.is_defined("c"));
        assert!(!e.state.is_defined("d"));
        assert_eq!(text(r"\def\b{y}\edef\d{\b\b}\def\b{n}\d"),"yy");
        assert_eq!(text(r"\let\x=a\x\x"),"aa");
        assert_eq!(text(r"\def\a#1.#2{#2#1}\a x.y"),"yx");
    }

    #[test]
    fn catcodes() {
        let mut e = Engine::default();
        let doc = e.parse_string("{\\catcode`\\!=11 \\def\\a!b{z}\\a!b}").unwrap();
        assert_eq!(doc.text_content(doc.root()),"z");
        assert_eq!(e.state.which_code('!'),CategoryCode::Other);
        e.parse_string("\\global\\catcode`\\!=11").unwrap();
        assert_eq!(e.state.which_code('!'),CategoryCode::Letter);
        assert_eq!(e.parse_string("\\catcode`\\!=16").unwrap_err().kind,ErrorKind::Structure);
    }

    #[test]
    fn expansion_control() {
        assert_eq!(text(r"\def\a{b}\expandafter\def\csname x\a\endcsname{y}\xb"),"y");
        assert_eq!(text(r"\string\foo"),"\\foo");
        assert_eq!(text(r"\def\a#1{x#1}\meaning\a"),"macro:#1->x#1");
        assert_eq!(text(r"\def\a{b}\edef\c{\noexpand\a}\def\a{c}\c"),"c");
        assert_eq!(text(r"\romannumeral 1994 \number 0042"),"mcmxciv42");
    }

    #[test]
    fn registers() {
        assert_eq!(text(r"\newcount\n \n=5 \advance\n by 3 \multiply\n 2 \number\n"),"16");
        assert_eq!(text(r"\newdimen\d \d=1.5pt \advance\d by 2pt \the\d"),"3.5pt");
        assert_eq!(text(r"\newlength\l\setlength{\l}{1pt plus 1fil}\addtolength{\l}{2pt}\the\l"),"3.0pt plus 1fil");
        assert_eq!(text(r"\chardef\x=65 \x\char98"),"Ab");
        let mut e = Engine::default();
        assert_eq!(e.parse_string(r"\newcount\n \divide\n 0").unwrap_err().kind,ErrorKind::Other);
    }

    #[test]
    fn register_overflow() {
        assert_eq!(text(r"\newcount\n \n=99999999999999999999 \number\n"),"2147483647");
        assert_eq!(text(r"\newcount\n \n=-99999999999999999999 \advance\n by -5 \divide\n by -1 \number\n"),"2147483652");
        assert_eq!(text(r"\newdimen\d \d=16000pt \advance\d by 16000pt \multiply\d 2 \number\d"),(64000i64 * 65536).to_string());
        let mut e = Engine::default();
        let err = e.parse_string(r"\newcount\n \n=2147483647 \multiply\n 2147483647 \multiply\n 2147483647").unwrap_err();
        assert_eq!(err.kind,ErrorKind::Other);
    }

    #[test]
    fn conditionals() {
        assert_eq!(text(r"\ifnum 1<2 a\else b\fi\ifdim 1pt>2pt c\else d\fi\ifodd 3 e\fi\ifx\relax\relax f\fi"),"adef");
        assert_eq!(text(r"\ifcase 2 a\or b\or c\else d\fi\ifcase 5 a\or b\else d\fi"),"cd");
        assert_eq!(text(r"\if aax\fi\ifcat a1y\else z\fi\ifdefined\undefinedcs u\else v\fi"),"xzv");
        assert_eq!(text(r"\newif\iffoo \iffoo a\else b\fi\footrue\iffoo c\fi"),"bc");
        let mut e = Engine::default();
        assert_eq!(e.parse_string(r"\ifnum 1 x 2 a\fi").unwrap_err().kind,ErrorKind::Conditional);
    }

    #[test]
    fn groups() {
        let mut e = Engine::default();
        let doc = e.parse_string(r"a{b\begingroup c\endgroup}").unwrap();
        assert_eq!(doc.find_all(doc.root(),"bgroup").len(),1);
        assert_eq!(doc.find_all(doc.root(),"begingroup").len(),1);
        assert_eq!(doc.source(doc.root()),"a{b\\begingroup c\\endgroup }");
        assert_eq!(e.parse_string("a}").unwrap_err().kind,ErrorKind::Structure);
    }

    #[test]
    fn runaway() {
        let mut e = Engine::default();
        assert_eq!(e.parse_string(r"\def\a{\a}\a").unwrap_err().kind,ErrorKind::Other);
    }
}
