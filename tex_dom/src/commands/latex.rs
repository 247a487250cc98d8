/*! The LaTeX layer: `\newcommand` and `\newenvironment`, `\begin`/`\end`, counters, cross
references, packages, sectioning, lists, theorems, math, fonts and verbatim material.

Most LaTeX commands are [elements](ElementSpec) and differ only in their argument specification
and in the way their node absorbs what follows:
```text
\section     * [ toc ] title     Digest::Section, numbered by the counter `section`
\textbf      self                the braced argument becomes the children of the node
\bf                              Digest::Declaration, up to the end of the enclosing group
```
*/

use log::{debug, info, warn};
use crate::commands::{methods, ElementSpec, Macro, MacroKind, ParamToken, TeXCommand, UserEnvironment};
use crate::commands::primitives::*;
use crate::commands::tex::string_tokens;
use crate::engine::Engine;
use crate::engine::gullet::is_char;
use crate::engine::gullet::numeric_methods::read_int;
use crate::engine::packages::PackageKind;
use crate::tex::catcodes::{CategoryCode, VERBATIM_TABLE};
use crate::tex::nodes::{Digest, MacroMode, NodeId, NodeLevel, SelfArg, Value};
use crate::tex::tokens::{tokens_to_string, Token, ACTIVE_PREFIX};
use crate::utils::errors::TeXResult;
use crate::utils::Ptr;
use crate::{file_end, throw};

const ENUM_COUNTERS:[&str;4] = ["enumi","enumii","enumiii","enumiv"];

fn read_star(engine:&mut Engine) -> bool {
    engine.skip_whitespace();
    match engine.get_next_raw() {
        Some(t) if is_char(&t,'*') => true,
        Some(t) => { engine.requeue(t); false }
        None => false
    }
}

/// The `[n]` of a definition.
fn read_arity(engine:&mut Engine,cmd:&str) -> TeXResult<u8> {
    let Some(tks) = engine.read_optional('[',']')? else { return Ok(0) };
    let n = engine.read_from_tokens(tks,read_int)?;
    match u8::try_from(n) {
        Ok(n) if n <= 9 => Ok(n),
        _ => throw!(Argument => "Illegal number of arguments ({}) for \\{}",n,cmd)
    }
}

fn read_body(engine:&mut Engine,cmd:&str) -> TeXResult<Vec<Token>> {
    match engine.read_argument()? {
        Some((tks,_)) => Ok(tks),
        None => file_end!(cmd)
    }
}

fn read_list(tks:&[Token]) -> Vec<String> {
    tokens_to_string(tks).split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn read_optional_string(engine:&mut Engine) -> TeXResult<Option<String>> {
    Ok(engine.read_optional('[',']')?.map(|t| tokens_to_string(&t).trim().to_string()))
}

fn new_macro(name:&str,arity:u8,default:Option<Vec<Token>>,body:Vec<Token>) -> Macro {
    Macro {
        name:name.into(),
        kind:MacroKind::NewCommand,
        signature:(1..=arity).map(ParamToken::Param).collect(),
        default:if arity == 0 { None } else { default },
        expansion:methods::compile_body(body),
        protected:false
    }
}

/// Whether `\newcommand` and friends may replace the current meaning of `name`. Natively
/// implemented commands are kept.
fn redefinable(engine:&Engine,name:&str) -> bool {
    matches!(engine.state.get_command(name),
        None | Some(TeXCommand::Macro(_) | TeXCommand::Unrecognized(_) | TeXCommand::TheCounter{..} |
                    TeXCommand::Primitive{name:"relax",..})
    )
}

/// `\newcommand`, `\renewcommand`, `\providecommand` and `\DeclareRobustCommand`, i.e.
/// `* name:cs [ nargs ] [ default ] definition`. The definitions are global.
pub fn newcommand(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    read_star(engine);
    let cs = engine.read_cs_name()?;
    if !cs.is_cs() {
        throw!(Argument => "Missing control sequence after \\{} (found {})",tk.text,cs)
    }
    let arity = read_arity(engine,&tk.text)?;
    let default = engine.read_optional('[',']')?;
    let body = read_body(engine,&tk.text)?;
    let name = cs.text;
    if tk.is_cs_named("providecommand") && engine.state.is_defined(&name) {
        debug!(target:"expansion","\\providecommand: \\{} is already defined",name);
        return Ok(())
    }
    if !redefinable(engine,&name) {
        info!(target:"expansion","\\{}: keeping the built-in \\{}",tk.text,name);
        return Ok(())
    }
    debug!(target:"expansion","\\{}: \\{} with {} arguments",tk.text,name,arity);
    let m = new_macro(&name,arity,default,body);
    engine.state.set_command(name,TeXCommand::Macro(Ptr::new(m)),true);
    Ok(())
}

/// `\newenvironment{name}[nargs][default]{begin}{end}` and `\renewenvironment`.
pub fn newenvironment(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    read_star(engine);
    let name = engine.read_name()?;
    let arity = read_arity(engine,&tk.text)?;
    let default = engine.read_optional('[',']')?;
    let begin = read_body(engine,&tk.text)?;
    let end = read_body(engine,&tk.text)?;
    let replaceable = matches!(engine.state.get_command(&name),
        None | Some(TeXCommand::Environment(_) | TeXCommand::Macro(_) | TeXCommand::Unrecognized(_))
    );
    if !replaceable {
        info!(target:"expansion","\\{}: keeping the built-in environment {}",tk.text,name);
        return Ok(())
    }
    debug!(target:"expansion","\\{}{{{}}} with {} arguments",tk.text,name,arity);
    let env = UserEnvironment {
        name:name.as_str().into(),
        begin:new_macro(&name,arity,default,begin),
        end:new_macro(&format!("end{}",name),0,None,end)
    };
    engine.state.set_command(name,TeXCommand::Environment(Ptr::new(env)),true);
    Ok(())
}

/// `\begin{name}`. Elements are invoked in [`Begin`](MacroMode::Begin) mode, environments defined by
/// `\newenvironment` (or by a pair `\name`/`\endname`) expand their begin code. Unknown names
/// become empty placeholder environments.
pub fn begin(engine:&mut Engine,tk:&Token) -> TeXResult<Option<NodeId>> {
    let name = engine.read_name()?;
    if name.is_empty() {
        throw!(Argument => "Missing environment name after \\begin")
    }
    let cs = Token::cs(name.as_str()).with_source(tk.source.clone());
    let node = match engine.state.lookup(&name) {
        TeXCommand::Element(spec) if spec.environment => engine.invoke_element(&spec,tk,MacroMode::Begin)?,
        TeXCommand::Element(spec) => {
            let mut spec = (*spec).clone();
            spec.environment = true;
            spec.digest = Digest::Environment;
            engine.invoke_element(&spec,tk,MacroMode::Begin)?
        }
        TeXCommand::Environment(env) => engine.begin_macro_environment(env.name.clone(),&env.begin,&cs)?,
        TeXCommand::Macro(m) => engine.begin_macro_environment(name.as_str().into(),&m,&cs)?,
        TeXCommand::Unrecognized(_) => engine.invoke_element(&ElementSpec::environment(&name,""),tk,MacroMode::Begin)?,
        _ => {
            // \begin{name} for a primitive: an environment around \name
            let node = engine.invoke_element(&ElementSpec::environment(&name,""),tk,MacroMode::Begin)?;
            engine.requeue(cs);
            node
        }
    };
    Ok(Some(node))
}

/// `\end{name}`; an error if no environment `name` is open.
pub fn end(engine:&mut Engine,tk:&Token) -> TeXResult<Option<NodeId>> {
    let name = engine.read_name()?;
    if !engine.state.owners().any(|o| &*o.name == name.as_str() && o.mode == MacroMode::Begin) {
        throw!(Structure => "\\end{{{}}} without matching \\begin{{{}}}",name,name)
    }
    match engine.state.get_command(&name).cloned() {
        Some(TeXCommand::Element(spec)) if spec.environment =>
            Ok(Some(engine.invoke_element(&spec,tk,MacroMode::End)?)),
        Some(TeXCommand::Environment(env)) => {
            engine.end_macro_environment(Some(&*env),&name);
            Ok(None)
        }
        _ => {
            engine.end_macro_environment(None,&name);
            Ok(None)
        }
    }
}

// ----------------------------------------------------------------------------------------------
// counters

pub fn newcounter(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let name = engine.read_name()?;
    let within = read_optional_string(engine)?;
    if engine.state.counters.contains(&name) {
        warn!(target:"counters","Counter {} already defined",name);
        return Ok(())
    }
    check_within(engine,&name,within.as_deref())?;
    engine.state.new_counter(&name,within.as_deref(),0);
    Ok(())
}

/// The `within` counter of a new counter must exist, and must not be reset by the new one.
fn check_within(engine:&Engine,name:&str,within:Option<&str>) -> TeXResult<()> {
    let Some(within) = within else { return Ok(()) };
    if !engine.state.counters.contains(within) {
        throw!(Undefined => "No counter '{}' defined",within)
    }
    if engine.state.counters.would_cycle(name,within) {
        throw!(Argument => "Counter {} can not be reset by {}",name,within)
    }
    Ok(())
}

/// `\setcounter{name}{value}` and `\addtocounter{name}{value}`.
pub fn setcounter(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    let name = engine.read_name()?;
    let tks = read_body(engine,&tk.text)?;
    let value = engine.read_from_tokens(tks,read_int)?;
    let found = if tk.is_cs_named("addtocounter") {
        engine.state.counters.add(&name,value)
    } else {
        engine.state.counters.set(&name,value)
    };
    if !found {
        warn!(target:"counters","No counter '{}' defined",name)
    }
    Ok(())
}

pub fn stepcounter(engine:&mut Engine,_tk:&Token) -> TeXResult<()> {
    let name = engine.read_name()?;
    if !engine.state.counters.step(&name) {
        warn!(target:"counters","No counter '{}' defined",name)
    }
    Ok(())
}

/// `\refstepcounter{name}` leaves an anchor node behind, which subsequent `\label`s refer to.
fn refstepcounter(engine:&mut Engine,node:NodeId,_mode:MacroMode) -> TeXResult<()> {
    let Some(name) = engine.doc.attribute(node,"counter").and_then(Value::as_str).map(|s| s.to_string()) else {
        return Ok(())
    };
    if !engine.state.counters.step(&name) {
        warn!(target:"counters","No counter '{}' defined",name);
        return Ok(())
    }
    engine.state.current_label = Some(node);
    engine.doc.node_mut(node).ref_text = engine.state.format_counter(&name);
    Ok(())
}

pub fn value(engine:&mut Engine,_tk:&Token) -> TeXResult<Vec<Token>> {
    let name = engine.read_name()?;
    match engine.state.counters.value(&name) {
        Some(v) => Ok(string_tokens(&v.to_string())),
        None => {
            warn!(target:"counters","No counter '{}' defined",name);
            Ok(string_tokens("0"))
        }
    }
}

/// `\arabic`, `\roman`, `\Roman`, `\alph`, `\Alph` and `\fnsymbol`.
pub fn format_counter(engine:&mut Engine,tk:&Token) -> TeXResult<Vec<Token>> {
    let name = engine.read_name()?;
    match engine.state.counters.get(&name).and_then(|c| c.format(&tk.text)) {
        Some(s) => Ok(Token::from_text(&s)),
        None => {
            warn!(target:"counters","No counter '{}' defined",name);
            Ok(Vec::new())
        }
    }
}

// ----------------------------------------------------------------------------------------------
// packages

/// `\documentclass[options]{name}`, `\usepackage[options]{names}` and `\RequirePackage`.
pub fn load_package(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    let options = engine.read_optional('[',']')?.map(|t| read_list(&t)).unwrap_or_default();
    let names = read_list(&read_body(engine,&tk.text)?);
    // release date
    engine.read_optional('[',']')?;
    let kind = if tk.is_cs_named("documentclass") { PackageKind::Class } else { PackageKind::Package };
    engine.load_packages(&names,kind,&options)
}

/// `\ProvidesPackage{name}[info]` and similar declarations, which are only read.
pub fn provides(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    let name = engine.read_name()?;
    engine.read_optional('[',']')?;
    debug!(target:"packages","\\{}{{{}}}",tk.text,name);
    Ok(())
}

// ----------------------------------------------------------------------------------------------
// lists and theorems

fn enumerate_depth(engine:&Engine) -> usize {
    engine.state.owners().filter(|o| &*o.name == "enumerate" && o.mode == MacroMode::Begin).count()
}

fn list_hook(engine:&mut Engine,node:NodeId,mode:MacroMode) -> TeXResult<()> {
    match mode {
        MacroMode::Begin => {
            engine.aux.list_depth = engine.aux.list_depth.saturating_add(1);
            if engine.doc.name(node) == "enumerate" {
                let depth = enumerate_depth(engine);
                for c in ENUM_COUNTERS.iter().skip(depth.saturating_sub(1)) {
                    engine.state.counters.set(c,0);
                }
            }
        }
        MacroMode::End => engine.aux.list_depth = engine.aux.list_depth.saturating_sub(1),
        MacroMode::None => ()
    }
    Ok(())
}

/// Numbers an `\item` of an `enumerate` environment, unless it has an explicit term.
fn enumerate_item(engine:&mut Engine,node:NodeId,_mode:MacroMode) -> TeXResult<()> {
    if engine.doc.attribute(node,"term").is_some_and(|v| !v.is_none()) {
        return Ok(())
    }
    let depth = enumerate_depth(engine).clamp(1,ENUM_COUNTERS.len());
    let counter = ENUM_COUNTERS[depth - 1];
    engine.state.counters.step(counter);
    engine.state.current_label = Some(node);
    engine.doc.node_mut(node).ref_text = engine.state.format_counter(counter);
    Ok(())
}

fn item() -> ElementSpec {
    ElementSpec::new("item","[ term ]").digest(Digest::Item).block()
}

fn list(name:&str,item:ElementSpec) -> ElementSpec {
    ElementSpec::environment(name,"").block().hook(list_hook)
        .local("item",TeXCommand::Element(Ptr::new(item)))
}

/// `\newtheorem{name}[shared]{Caption}[within]`; the starred form is not numbered.
pub fn newtheorem(engine:&mut Engine,tk:&Token) -> TeXResult<()> {
    let numbered = !read_star(engine);
    let name = engine.read_name()?;
    let shared = read_optional_string(engine)?;
    let caption = read_body(engine,&tk.text)?;
    let caption = engine.expand_to_string(caption)?;
    let within = read_optional_string(engine)?;
    let mut spec = ElementSpec::environment(&name,"[ title ]").block()
        .fixed("caption",Value::Str(caption.trim().to_string()));
    if numbered {
        let counter = match shared {
            Some(c) => c,
            None => {
                check_within(engine,&name,within.as_deref())?;
                engine.state.new_counter(&name,within.as_deref(),0);
                if let Some(w) = &within {
                    engine.state.set_counter_format(&name,&format!("${{the{}}}.${{{}}}",w,name));
                }
                name.clone()
            }
        };
        spec = spec.counter(&counter);
    }
    debug!(target:"commands","New theorem environment {}",name);
    register_element(engine,spec);
    Ok(())
}

fn document_hook(engine:&mut Engine,_node:NodeId,mode:MacroMode) -> TeXResult<()> {
    if mode == MacroMode::End {
        engine.mouth.end_input()
    }
    Ok(())
}

// ----------------------------------------------------------------------------------------------
// math

fn math_env(name:&str) -> ElementSpec {
    ElementSpec::environment(name,"").math(true)
}

fn open_math(engine:&mut Engine,tk:&Token,name:&str,delim:&str) -> TeXResult<Option<NodeId>> {
    engine.aux.math_stack.push(name.into());
    let node = engine.invoke_element(&math_env(name),tk,MacroMode::Begin)?;
    engine.doc.node_mut(node).arg_source = delim.to_string();
    Ok(Some(node))
}

fn close_math(engine:&mut Engine,tk:&Token,name:&str) -> TeXResult<Option<NodeId>> {
    if engine.aux.math_stack.last().map(|s| &**s) != Some(name) {
        throw!(Structure => "Bad math environment delimiter {}",tk)
    }
    engine.aux.math_stack.pop();
    Ok(Some(engine.invoke_element(&math_env(name),tk,MacroMode::End)?))
}

fn in_math(engine:&Engine,name:&str) -> bool {
    engine.aux.math_stack.last().map(|s| &**s) == Some(name)
}

/// `$` and `$$` toggle inline and display math.
pub fn math_shift(engine:&mut Engine,tk:&Token) -> TeXResult<Option<NodeId>> {
    if in_math(engine,"math") {
        return close_math(engine,tk,"math")
    }
    let display = match engine.get_next_raw() {
        Some(t) if t.catcode == CategoryCode::MathShift => true,
        Some(t) => { engine.requeue(t); false }
        None => false
    };
    let name = if display { "displaymath" } else { "math" };
    if in_math(engine,name) {
        close_math(engine,tk,name)
    } else {
        open_math(engine,tk,name,if display { "$$" } else { "$" })
    }
}

/// `^` and `_` take an argument in math mode and are plain characters otherwise.
pub fn script(engine:&mut Engine,tk:&Token) -> TeXResult<Option<NodeId>> {
    let c = if tk.text.ends_with('_') { '_' } else { '^' };
    if !engine.state.is_math_mode() {
        engine.requeue(Token::other(c));
        return Ok(None)
    }
    let Some((tks,braced)) = engine.read_argument()? else { file_end!(c) };
    let node = engine.doc.create_element(format!("{}{}",ACTIVE_PREFIX,c),NodeLevel::COMMAND,MacroMode::None);
    let frag = engine.expand_to_fragment(tks)?;
    engine.doc.append_child(node,frag);
    if braced {
        engine.doc.node_mut(node).self_arg = SelfArg::Braced;
    }
    Ok(Some(node))
}

// ----------------------------------------------------------------------------------------------
// verbatim

/// `\verb|...|` and `\verb*|...|`.
pub fn verb(engine:&mut Engine,tk:&Token) -> TeXResult<Option<NodeId>> {
    let Some(mut delim) = engine.mouth.read_char(&VERBATIM_TABLE) else { file_end!(tk.text) };
    let star = delim == '*';
    if star {
        delim = match engine.mouth.read_char(&VERBATIM_TABLE) {
            Some(c) => c,
            None => file_end!(tk.text)
        };
    }
    let Some(text) = engine.mouth.read_verbatim(&delim.to_string(),&VERBATIM_TABLE) else {
        file_end!(tk.text)
    };
    let node = engine.doc.create_element("verb",NodeLevel::COMMAND,MacroMode::None);
    let n = engine.doc.node_mut(node);
    n.self_arg = SelfArg::Delimited(delim);
    if star { n.arg_source = "*".to_string() }
    engine.doc.append_text(node,&text);
    Ok(Some(node))
}

/// Reads the body of a verbatim environment up to `\end{name}` and closes the environment.
fn verbatim_hook(engine:&mut Engine,node:NodeId,mode:MacroMode) -> TeXResult<()> {
    if mode != MacroMode::Begin { return Ok(()) }
    let name = engine.doc.name(node).to_string();
    let end = format!("\\end{{{}}}",name);
    let text = match engine.mouth.read_verbatim(&end,&VERBATIM_TABLE) {
        Some(t) => t,
        None => {
            warn!(target:"digest","Input ended inside environment {}",name);
            String::new()
        }
    };
    engine.doc.append_text(node,text.strip_prefix('\n').unwrap_or(text.as_str()));
    engine.mouth.push_tokens(vec!(Token::end_tokens(format!("end:{}",name))));
    Ok(())
}

// ----------------------------------------------------------------------------------------------

pub fn register_latex_commands(engine:&mut Engine) {
    for name in ["newcommand","renewcommand","providecommand","DeclareRobustCommand"] {
        register_unexpandable(engine,name,newcommand);
    }
    register_unexpandable(engine,"newenvironment",newenvironment);
    register_unexpandable(engine,"renewenvironment",newenvironment);
    register_node(engine,"begin",begin);
    register_node(engine,"end",end);
    register_unexpandable(engine,"makeatletter",|e,_| { e.state.set_catcode('@',CategoryCode::Letter,false); Ok(()) });
    register_unexpandable(engine,"makeatother",|e,_| { e.state.set_catcode('@',CategoryCode::Other,false); Ok(()) });

    register_unexpandable(engine,"newcounter",newcounter);
    register_unexpandable(engine,"setcounter",setcounter);
    register_unexpandable(engine,"addtocounter",setcounter);
    register_unexpandable(engine,"stepcounter",stepcounter);
    register_element(engine,ElementSpec::new("refstepcounter","counter:str").hook(refstepcounter));
    register_expandable(engine,"value",value);
    for name in ["arabic","roman","Roman","alph","Alph","fnsymbol"] {
        register_expandable(engine,name,format_counter);
    }
    engine.state.new_counter("enumi",None,0);
    engine.state.new_counter("enumii",Some("enumi"),0);
    engine.state.new_counter("enumiii",Some("enumii"),0);
    engine.state.new_counter("enumiv",Some("enumiii"),0);
    engine.state.set_counter_format("enumii","${enumii.alph}");
    engine.state.set_counter_format("enumiii","${enumiii.roman}");
    engine.state.set_counter_format("enumiv","${enumiv.Alph}");

    register_elements(engine,&[
        ("label","label:label"),
        ("ref","label:ref"),
        ("pageref","label:ref"),
        ("\\","* [ space:dimen ]")
    ]);
    register_element(engine,ElementSpec::new("footnote","[ mark ] self").counter("footnote"));

    register_unexpandable(engine,"documentclass",load_package);
    register_unexpandable(engine,"usepackage",load_package);
    register_unexpandable(engine,"RequirePackage",load_package);
    for name in ["ProvidesPackage","ProvidesClass","ProvidesFile","NeedsTeXFormat"] {
        register_unexpandable(engine,name,provides);
    }

    register_element(engine,ElementSpec::environment("document","").level(NodeLevel::DOCUMENT).hook(document_hook));
    for (name,level) in [
        ("part",NodeLevel::PART),("chapter",NodeLevel::CHAPTER),("section",NodeLevel::SECTION),
        ("subsection",NodeLevel::SUBSECTION),("subsubsection",NodeLevel::SUBSUBSECTION),
        ("paragraph",NodeLevel::PARAGRAPH),("subparagraph",NodeLevel::SUBPARAGRAPH),
        ("subsubparagraph",NodeLevel::SUBSUBPARAGRAPH)
    ] {
        register_element(engine,ElementSpec::new(name,"* [ toc ] title")
            .level(level).digest(Digest::Section).block().counter(name));
    }

    register_element(engine,list("itemize",item()));
    register_element(engine,list("description",item()));
    register_element(engine,list("enumerate",item().hook(enumerate_item)));
    register_unexpandable(engine,"newtheorem",newtheorem);
    for name in ["center","flushleft","flushright","quote","quotation","abstract"] {
        register_element(engine,ElementSpec::environment(name,"").block());
    }

    register_node(engine,"active::$",math_shift);
    register_node(engine,"(",|e,tk| open_math(e,tk,"math","\\("));
    register_node(engine,")",|e,tk| close_math(e,tk,"math"));
    register_node(engine,"[",|e,tk| open_math(e,tk,"displaymath","\\["));
    register_node(engine,"]",|e,tk| close_math(e,tk,"displaymath"));
    register_element(engine,math_env("math"));
    register_element(engine,math_env("displaymath"));
    register_element(engine,math_env("equation").counter("equation"));
    register_element(engine,math_env("equation*"));
    register_node(engine,"active::^",script);
    register_node(engine,"active::_",script);
    register_node(engine,"active::&",|e,_| Ok(Some(e.doc.create_element("active::&",NodeLevel::COMMAND,MacroMode::None))));
    register_expandable(engine,"active::~",|_,_| Ok(vec!(Token::other('\u{a0}'))));

    for name in ["textbf","textit","emph","texttt","textrm","textsf","underline"] {
        register_element(engine,ElementSpec::new(name,"self"));
    }
    for name in ["bf","it","em","tt","rm","sf"] {
        register_element(engine,ElementSpec::new(name,"").digest(Digest::Declaration));
    }

    register_expandable(engine,"today",|e,_| Ok(Token::from_text(&e.aux.start_time.format("%B %-d, %Y").to_string())));
    register_expandable(engine,"TeX",|_,_| Ok(Token::from_text("TeX")));
    register_expandable(engine,"LaTeX",|_,_| Ok(Token::from_text("LaTeX")));
    register_expandable(engine," ",|_,_| Ok(vec!(Token::space())));
    register_expandable(engine,"",|_,_| Ok(vec!(Token::space())));

    register_node(engine,"verb",verb);
    register_element(engine,ElementSpec::environment("verbatim","").block().hook(verbatim_hook));
}

#[cfg(test)]
mod tests {
    use crate::commands::TeXCommand;
    use crate::engine::Engine;
    use crate::tex::catcodes::CategoryCode;
    use crate::tex::nodes::{MacroMode, Value};
    use crate::utils::errors::ErrorKind;

    fn text(s:&str) -> String {
        let mut e = Engine::default();
        let doc = e.parse_string(s).unwrap();
        doc.text_content(doc.root())
    }

    #[test]
    fn newcommand() {
        assert_eq!(text(r"\newcommand{\hi}[2][World]{Hello, #1 and #2!}\hi{x} \hi[A]{B}"),"Hello, World and x! Hello, A and B!");
        assert_eq!(text(r"\newcommand\foo{a}\let\bar=\foo\renewcommand\foo{b}\foo\bar"),"ba");
        assert_eq!(text(r"\newcommand\foo{a}\providecommand\foo{b}\providecommand\baz{c}\foo\baz"),"ac");
        let mut e = Engine::default();
        e.parse_string(r"{\newcommand\g{x}}\renewcommand\section{y}").unwrap();
        assert!(e.state.is_defined("g"));
        assert!(matches!(e.state.get_command("section"),Some(TeXCommand::Element(_))));
        assert_eq!(e.parse_string(r"\newcommand\x[10]{}").unwrap_err().kind,ErrorKind::Argument);
    }

    #[test]
    fn environments() {
        let mut e = Engine::default();
        let doc = e.parse_string(r"\newenvironment{foo}{A}{B}\begin{foo}\begin{foo}X\end{foo}\end{foo}").unwrap();
        let foos = doc.find_all(doc.root(),"foo");
        assert_eq!(foos.len(),2);
        assert_eq!(doc.parent(foos[1]),Some(foos[0]));
        assert_eq!(doc.node(foos[0]).mode,MacroMode::Begin);
        assert_eq!(doc.text_content(foos[0]),"AAXBB");
        assert_eq!(doc.text_content(foos[1]),"AXB");

        assert_eq!(text(r"\newenvironment{greet}[2][Hi]{#1 #2:}{.}\begin{greet}{Bob}x\end{greet}"),"Hi Bob:x.");

        let doc = e.parse_string(r"\begin{center2}x\end{center2}").unwrap();
        let c = doc.find_all(doc.root(),"center2");
        assert_eq!(c.len(),1);
        assert_eq!(doc.text_content(c[0]),"x");

        assert_eq!(e.parse_string(r"\end{foo}").unwrap_err().kind,ErrorKind::Structure);
        assert_eq!(e.parse_string(r"\begin{itemize}\end{enumerate}").unwrap_err().kind,ErrorKind::Structure);
    }

    #[test]
    fn counters() {
        assert_eq!(text(r"\newcounter{c}\setcounter{c}{1994}\Roman{c} \roman{c} \arabic{c}"),"MCMXCIV mcmxciv 1994");
        assert_eq!(text(r"\newcounter{a}\newcounter{b}[a]\stepcounter{b}\stepcounter{b}\arabic{b}\stepcounter{a}\arabic{b}\thea"),"201");
        assert_eq!(text(r"\newcounter{a}\setcounter{a}{3}\addtocounter{a}{\value{a}}\alph{a}\Alph{a}"),"fF");

        let mut e = Engine::default();
        let doc = e.parse_string(r"\newcounter{x}\refstepcounter{x}\label{l}").unwrap();
        let r = doc.find_all(doc.root(),"refstepcounter")[0];
        assert_eq!(doc.node(r).ref_text.as_deref(),Some("1"));
        assert_eq!(doc.node(r).id.as_deref(),Some("l"));
    }

    #[test]
    fn counter_dependencies() {
        let mut e = Engine::default();
        let err = e.parse_string(r"\newcounter{a}[b]\newcounter{b}[a]\stepcounter{a}ok").unwrap_err();
        assert_eq!(err.kind,ErrorKind::Undefined);
        assert!(!e.state.counters.contains("a"));
        assert_eq!(e.parse_string(r"\newtheorem{lem}{Lemma}[nosuch]").unwrap_err().kind,ErrorKind::Undefined);
        assert_eq!(text(r"\newcounter{b}\newcounter{a}[b]\newcounter{b}[a]\stepcounter{a}\stepcounter{b}\arabic{a}\arabic{b}ok"),"01ok");
    }

    #[test]
    fn counter_overflow() {
        assert_eq!(text(r"\newcounter{c}\setcounter{c}{99999999999999999999}\arabic{c}"),"2147483647");
        assert_eq!(text(r"\newcounter{c}\setcounter{c}{99999999999999999999}\addtocounter{c}{5}\arabic{c}"),"2147483647");
        assert_eq!(text(r"\newcounter{c}\setcounter{c}{-2147483647}\addtocounter{c}{-9}\arabic{c}"),"-2147483647");
        assert_eq!(text(r"\newcounter{c}\setcounter{c}{-3}\fnsymbol{c}\setcounter{c}{10}\fnsymbol{c}x"),"x");
    }

    #[test]
    fn sections() {
        let mut e = Engine::default();
        let doc = e.parse_string(
            r"\documentclass{article}\ref{sec:intro}\section{Intro}\label{sec:intro}Text \subsection{Sub}More\section*{Star}See \ref{sec:intro}."
        ).unwrap();
        let root = doc.root();
        let secs = doc.find_all(root,"section");
        assert_eq!(secs.len(),2);
        assert_eq!(doc.parent(secs[0]),Some(root));
        assert_eq!(doc.node(secs[0]).ref_text.as_deref(),Some("1"));
        assert_eq!(doc.node(secs[0]).id.as_deref(),Some("sec:intro"));
        assert_eq!(doc.node(secs[1]).ref_text,None);
        match doc.attribute(secs[0],"title") {
            Some(Value::Fragment(f)) => assert_eq!(doc.text_content(*f),"Intro"),
            v => panic!("unexpected title {:?}",v)
        }
        let sub = doc.find_all(root,"subsection")[0];
        assert_eq!(doc.parent(sub),Some(secs[0]));
        assert_eq!(doc.node(sub).ref_text.as_deref(),Some("1.1"));
        assert_eq!(doc.text_content(sub),"More");

        let refs = doc.find_all(root,"ref");
        assert_eq!(refs.len(),2);
        for r in refs {
            assert_eq!(doc.attribute(r,"label"),Some(&Value::Ref{label:"sec:intro".into(),target:Some(secs[0])}));
        }
        assert_eq!(e.state.unresolved_refs().count(),0);
    }

    #[test]
    fn lists() {
        let mut e = Engine::default();
        let doc = e.parse_string(
            r"\begin{enumerate}\item a\item b\begin{enumerate}\item c\end{enumerate}\end{enumerate}\begin{itemize}\item d\end{itemize}"
        ).unwrap();
        let root = doc.root();
        let items = doc.find_all(root,"item");
        assert_eq!(items.len(),4);
        let refs:Vec<_> = items.iter().map(|i| doc.node(*i).ref_text.clone()).collect();
        assert_eq!(refs,vec!(Some("1".to_string()),Some("2".to_string()),Some("a".to_string()),None));
        assert_eq!(doc.text_content(items[0]),"a");
        let inner = doc.find_all(root,"enumerate")[1];
        assert_eq!(doc.parent(inner),Some(items[1]));
        assert_eq!(e.aux.list_depth,0);

        let doc = e.parse_string(r"\begin{description}\item[Key] Value\end{description}").unwrap();
        let item = doc.find_all(doc.root(),"item")[0];
        assert_eq!(doc.text_content(item),"Value");
        match doc.attribute(item,"term") {
            Some(Value::Fragment(f)) => assert_eq!(doc.text_content(*f),"Key"),
            v => panic!("unexpected term {:?}",v)
        }
    }

    #[test]
    fn theorems() {
        let mut e = Engine::default();
        let doc = e.parse_string(
            r"\newtheorem{thm}{Theorem}\newtheorem{lem}[thm]{Lemma}\begin{thm}[Fermat]x\end{thm}\begin{thm}y\label{t}\end{thm}\begin{lem}z\end{lem}"
        ).unwrap();
        let root = doc.root();
        let thms = doc.find_all(root,"thm");
        assert_eq!(thms.len(),2);
        assert_eq!(doc.node(thms[0]).ref_text.as_deref(),Some("1"));
        assert_eq!(doc.node(thms[1]).ref_text.as_deref(),Some("2"));
        assert_eq!(doc.node(thms[1]).id.as_deref(),Some("t"));
        assert_eq!(doc.attribute(thms[0],"caption"),Some(&Value::Str("Theorem".to_string())));
        match doc.attribute(thms[0],"title") {
            Some(Value::Fragment(f)) => assert_eq!(doc.text_content(*f),"Fermat"),
            v => panic!("unexpected title {:?}",v)
        }
        let lem = doc.find_all(root,"lem")[0];
        assert_eq!(doc.node(lem).ref_text.as_deref(),Some("3"));
    }

    #[test]
    fn math() {
        let mut e = Engine::default();
        let src = r"$x^2$ and $$y_{i}$$ \(a\)\[b\] x^2";
        let doc = e.parse_string(src).unwrap();
        let root = doc.root();
        assert_eq!(doc.find_all(root,"math").len(),2);
        assert_eq!(doc.find_all(root,"displaymath").len(),2);
        assert_eq!(doc.source(root),src);
        assert!(e.aux.math_stack.is_empty());

        let doc = e.parse_string(r"\begin{equation}E\label{eq}\end{equation}").unwrap();
        let eq = doc.find_all(doc.root(),"equation")[0];
        assert_eq!(doc.node(eq).ref_text.as_deref(),Some("1"));
        assert_eq!(doc.node(eq).id.as_deref(),Some("eq"));

        assert_eq!(e.parse_string(r"\)").unwrap_err().kind,ErrorKind::Structure);
    }

    #[test]
    fn fonts() {
        let mut e = Engine::default();
        let src = r"\textbf{a}{\bf b\it c} d";
        let doc = e.parse_string(src).unwrap();
        assert_eq!(doc.source(doc.root()),src);
        let bf = doc.find_all(doc.root(),"bf")[0];
        assert_eq!(doc.text_content(bf),"bc");
        assert_eq!(text(r"a~b\ c\TeX"),"a\u{a0}b cTeX");
        let mut e = Engine::default();
        let today = e.aux.start_time.format("%B %-d, %Y").to_string();
        let doc = e.parse_string(r"\today").unwrap();
        assert_eq!(doc.text_content(doc.root()),today);
    }

    #[test]
    fn verbatim() {
        let mut e = Engine::default();
        let doc = e.parse_string("\\verb|\\x{|\\begin{verbatim}\n\\y}\n\\end{verbatim}z").unwrap();
        let root = doc.root();
        let verb = doc.find_all(root,"verb")[0];
        assert_eq!(doc.text_content(verb),"\\x{");
        let env = doc.find_all(root,"verbatim")[0];
        assert_eq!(doc.text_content(env),"\\y}\n");
        assert_eq!(doc.source(root),"\\verb|\\x{|\\begin{verbatim}\\y}\n\\end{verbatim}z");
    }

    #[test]
    fn footnotes() {
        let mut e = Engine::default();
        let doc = e.parse_string(r"a\footnote{b}\footnote{c}").unwrap();
        let notes = doc.find_all(doc.root(),"footnote");
        assert_eq!(notes.len(),2);
        assert_eq!(doc.node(notes[1]).ref_text.as_deref(),Some("2"));
        assert_eq!(doc.text_content(notes[0]),"b");
    }

    #[test]
    fn packages() {
        let mut e = Engine::default();
        e.parse_string(r"\documentclass[a4paper]{report}\usepackage[utf8]{inputenc, foo}\ProvidesPackage{bar}[2020/01/01]\NeedsTeXFormat{LaTeX2e}").unwrap();
        assert_eq!(e.state.packages.get("inputenc"),Some(&vec!("utf8".to_string())));
        assert!(e.state.packages.contains_key("foo"));
        assert!(e.state.packages.contains_key("report"));
        assert!(e.state.counters.contains("chapter"));

        e.parse_string(r"\makeatother").unwrap();
        assert_eq!(e.state.which_code('@'),CategoryCode::Other);
        e.parse_string(r"\makeatletter").unwrap();
        assert_eq!(e.state.which_code('@'),CategoryCode::Letter);
    }

    #[test]
    fn document() {
        let mut e = Engine::default();
        let doc = e.parse_string(r"\documentclass{article}\begin{document}Hello\end{document}").unwrap();
        let docs = doc.find_all(doc.root(),"document");
        assert_eq!(docs.len(),2);
        assert_eq!(doc.text_content(docs[1]),"Hello");
    }
}
