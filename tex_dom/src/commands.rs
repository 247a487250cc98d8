/*! [Commands](TeXCommand): what a control sequence (or active character) means.

A command is one of
- a [primitive](PrimitiveCommand) implemented natively,
- an [element](ElementSpec): a command or environment that becomes a node of the document,
  with arguments parsed according to its [argument specification](arguments),
- a user [macro](Macro) (`\def`, `\newcommand`) or [environment](UserEnvironment) (`\newenvironment`),
- one of a few kinds of values created by `\newif`, `\newcounter`, `\chardef`, `\newcount` etc.,
- [unrecognized](TeXCommand::Unrecognized), a placeholder created on first use of an undefined name.

All of them are cheap to clone, so that `\let` can copy a meaning.
*/

pub mod arguments;
pub mod methods;
pub mod primitives;
pub mod tex;
pub mod latex;

use std::fmt::{Debug, Formatter};
use crate::commands::arguments::ArgSpec;
use crate::engine::Engine;
use crate::engine::state::counters::CounterFormat;
use crate::tex::nodes::{Digest, MacroMode, NodeId, NodeLevel, Value};
use crate::tex::tokens::Token;
use crate::utils::errors::TeXResult;
use crate::utils::Ptr;

/// The behaviour of a primitive, as a function pointer.
#[derive(Copy,Clone)]
pub enum PrimitiveCommand {
    /// An `\if...`: the result selects the branch
    Conditional(fn(&mut Engine,&Token) -> TeXResult<bool>),
    /// Returns tokens that replace the command in the input
    Expandable(fn(&mut Engine,&Token) -> TeXResult<Vec<Token>>),
    /// Changes the state of the engine; produces nothing
    Unexpandable(fn(&mut Engine,&Token) -> TeXResult<()>),
    /// Produces (at most) one node
    Node(fn(&mut Engine,&Token) -> TeXResult<Option<NodeId>>)
}
impl Debug for PrimitiveCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PrimitiveCommand::Conditional(_) => "Conditional",
            PrimitiveCommand::Expandable(_) => "Expandable",
            PrimitiveCommand::Unexpandable(_) => "Unexpandable",
            PrimitiveCommand::Node(_) => "Node"
        })
    }
}

/// Called after an element has been invoked in the given mode (and its arguments parsed).
pub type ElementHook = fn(&mut Engine,NodeId,MacroMode) -> TeXResult<()>;

/// A command that produces a node named after it, e.g. `\section` or the `itemize` environment.
#[derive(Clone,Debug)]
pub struct ElementSpec {
    pub name:Ptr<str>,
    pub args:Vec<ArgSpec>,
    pub level:NodeLevel,
    /// Used with `\begin`/`\end`
    pub environment:bool,
    pub digest:Digest,
    pub block:bool,
    /// Stepped by `\refstepcounter` semantics before the first (non-`*`) argument
    pub counter:Option<Ptr<str>>,
    /// Whether the element switches math mode on or off
    pub math:Option<bool>,
    /// Commands defined only while the element's frame is open, e.g. `\item` in lists
    pub locals:Vec<(Ptr<str>,TeXCommand)>,
    /// Attributes every node of this element carries, e.g. the caption of a theorem
    pub fixed:Vec<(Ptr<str>,Value)>,
    pub hook:Option<ElementHook>
}
impl ElementSpec {
    /// A command at [`COMMAND`](NodeLevel::COMMAND) level, with arguments per `args`.
    /// Panics on a malformed argument specification; specifications are static.
    pub fn new(name:&str,args:&str) -> Self {
        let args = match arguments::compile(args) {
            Ok(a) => a,
            Err(e) => unreachable!("Malformed argument specification for \\{}: {}",name,e)
        };
        ElementSpec {
            name:name.into(),args,level:NodeLevel::COMMAND,environment:false,digest:Digest::None,
            block:false,counter:None,math:None,locals:Vec::new(),fixed:Vec::new(),hook:None
        }
    }
    /// An environment at [`ENVIRONMENT`](NodeLevel::ENVIRONMENT) level.
    pub fn environment(name:&str,args:&str) -> Self {
        let mut r = Self::new(name,args);
        r.environment = true;
        r.level = NodeLevel::ENVIRONMENT;
        r.digest = Digest::Environment;
        r
    }
    pub fn level(mut self,level:NodeLevel) -> Self { self.level = level; self }
    pub fn digest(mut self,digest:Digest) -> Self { self.digest = digest; self }
    pub fn block(mut self) -> Self { self.block = true; self }
    pub fn counter(mut self,counter:&str) -> Self { self.counter = Some(counter.into()); self }
    pub fn math(mut self,math:bool) -> Self { self.math = Some(math); self }
    pub fn local(mut self,name:&str,cmd:TeXCommand) -> Self { self.locals.push((name.into(),cmd)); self }
    pub fn fixed(mut self,name:&str,value:Value) -> Self { self.fixed.push((name.into(),value)); self }
    pub fn hook(mut self,hook:ElementHook) -> Self { self.hook = Some(hook); self }
}

/// An item of the parameter text of a [`Macro`].
#[derive(Clone,Debug,PartialEq)]
pub enum ParamToken {
    /// `#n`
    Param(u8),
    /// A delimiter
    Token(Token)
}

/// An item of the replacement text of a [`Macro`].
#[derive(Clone,Debug,PartialEq)]
pub enum ExpToken {
    Token(Token),
    /// `#n`
    Param(u8)
}

/// Where a [`Macro`] came from; `\newcommand` only redefines some kinds of commands.
#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum MacroKind { Def, NewCommand }

/// A user defined macro.
#[derive(Clone,Debug)]
pub struct Macro {
    pub name:Ptr<str>,
    pub kind:MacroKind,
    /// The parameter text; for `\newcommand` simply `#1...#n`
    pub signature:Vec<ParamToken>,
    /// The default of the first argument of a `\newcommand` with an optional argument
    pub default:Option<Vec<Token>>,
    pub expansion:Vec<ExpToken>,
    /// `\protected`: not expanded by `\edef`
    pub protected:bool
}
impl Macro {
    pub fn arity(&self) -> u8 {
        self.signature.iter().filter(|p| matches!(p,ParamToken::Param(_))).count() as u8
    }
}
/// Two macros are equal (for `\ifx`) if their parameter and replacement texts agree; the name
/// does not matter.
impl PartialEq for Macro {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature && self.default == other.default &&
            self.expansion == other.expansion && self.protected == other.protected
    }
}

/// An environment defined with `\newenvironment`.
#[derive(Clone,Debug,PartialEq)]
pub struct UserEnvironment {
    pub name:Ptr<str>,
    pub begin:Macro,
    pub end:Macro
}

/// See the [module documentation](self).
#[derive(Clone,Debug)]
pub enum TeXCommand {
    Primitive{name:&'static str,cmd:PrimitiveCommand},
    Element(Ptr<ElementSpec>),
    Macro(Ptr<Macro>),
    Environment(Ptr<UserEnvironment>),
    /// A conditional created by `\newif`
    Switch{name:Ptr<str>,state:bool},
    /// `\footrue`/`\foofalse` for the switch `\iffoo`
    SwitchSetter{target:Ptr<str>,state:bool},
    /// `\the<counter>`
    TheCounter{counter:Ptr<str>,format:CounterFormat},
    CharDef(char),
    MathCharDef(char),
    /// A register allocated by `\newcount` & co; the value lives in the [`Context`](crate::engine::state::Context)
    Register(Ptr<str>),
    Unrecognized(Ptr<str>)
}
impl TeXCommand {
    /// Whether invoking this command only rewrites the input, i.e. whether `\edef` and number
    /// scanning expand it.
    pub fn is_expandable(&self) -> bool {
        match self {
            TeXCommand::Primitive{cmd:PrimitiveCommand::Expandable(_) | PrimitiveCommand::Conditional(_),..} => true,
            TeXCommand::Macro(_) | TeXCommand::Switch{..} | TeXCommand::TheCounter{..} => true,
            _ => false
        }
    }
    /// `\meaning`
    pub fn meaning(&self,name:&str) -> String {
        use crate::tex::tokens::tokens_to_string;
        match self {
            TeXCommand::Primitive{name,..} => format!("\\{}",name),
            TeXCommand::Element(e) => format!("\\{}",e.name),
            TeXCommand::Macro(m) => {
                let mut sig = String::new();
                for p in &m.signature {
                    match p {
                        ParamToken::Param(i) => { sig.push('#'); sig.push_str(&i.to_string()) }
                        ParamToken::Token(t) => sig.push_str(&t.to_string())
                    }
                }
                let mut exp = Vec::new();
                for e in &m.expansion {
                    match e {
                        ExpToken::Token(t) => exp.push(t.clone()),
                        ExpToken::Param(i) => exp.extend(Token::from_text(&format!("#{}",i)))
                    }
                }
                format!("{}macro:{}->{}",if m.protected {"\\protected "} else {""},sig,tokens_to_string(&exp))
            }
            TeXCommand::Environment(e) => format!("environment:{}",e.name),
            TeXCommand::Switch{state,..} => if *state {"\\iftrue".to_string()} else {"\\iffalse".to_string()},
            TeXCommand::SwitchSetter{target,state} => format!("macro:->\\{}{}",target,state),
            TeXCommand::TheCounter{counter,..} => format!("macro:->\\arabic{{{}}}",counter),
            TeXCommand::CharDef(c) => format!("\\char\"{:X}",*c as u32),
            TeXCommand::MathCharDef(c) => format!("\\mathchar\"{:X}",*c as u32),
            TeXCommand::Register(n) => format!("\\{}",n),
            TeXCommand::Unrecognized(_) => format!("undefined (\\{})",name)
        }
    }
}
impl PartialEq for TeXCommand {
    fn eq(&self, other: &Self) -> bool {
        use TeXCommand::*;
        match (self,other) {
            (Primitive{name:a,..},Primitive{name:b,..}) => a == b,
            (Element(a),Element(b)) => Ptr::ptr_eq(a,b) || a.name == b.name,
            (Macro(a),Macro(b)) => a == b,
            (Environment(a),Environment(b)) => a == b,
            (Switch{name:a,..},Switch{name:b,..}) => a == b,
            (SwitchSetter{target:a,state:s},SwitchSetter{target:b,state:t}) => a == b && s == t,
            (TheCounter{counter:a,format:f},TheCounter{counter:b,format:g}) => a == b && f == g,
            (CharDef(a),CharDef(b)) => a == b,
            (MathCharDef(a),MathCharDef(b)) => a == b,
            (Register(a),Register(b)) => a == b,
            (Unrecognized(_),Unrecognized(_)) => true,
            _ => false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::catcodes::CategoryCode;

    fn mac(name:&str,body:&str) -> Macro {
        Macro {
            name:name.into(),kind:MacroKind::NewCommand,signature:vec!(),default:None,
            expansion:Token::from_text(body).into_iter().map(ExpToken::Token).collect(),protected:false
        }
    }

    #[test]
    fn macro_equality_ignores_names() {
        assert_eq!(TeXCommand::Macro(Ptr::new(mac("a","x"))),TeXCommand::Macro(Ptr::new(mac("b","x"))));
        assert_ne!(TeXCommand::Macro(Ptr::new(mac("a","x"))),TeXCommand::Macro(Ptr::new(mac("a","y"))));
        assert_eq!(TeXCommand::Unrecognized("a".into()),TeXCommand::Unrecognized("b".into()));
    }

    #[test]
    fn meanings() {
        let mut m = mac("foo","ab");
        m.signature = vec!(ParamToken::Param(1),ParamToken::Token(Token::other('.')));
        m.expansion.push(ExpToken::Param(1));
        m.expansion.push(ExpToken::Token(Token::new("#",CategoryCode::Parameter)));
        assert_eq!(TeXCommand::Macro(Ptr::new(m)).meaning("foo"),"macro:#1.->ab#1#");
        assert_eq!(TeXCommand::CharDef('A').meaning("A"),"\\char\"41");
    }
}
