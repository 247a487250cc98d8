/*! Argument specifications of [elements](crate::commands::ElementSpec).

An argument specification is a string like `"* [ toc ] title"`:

| Item                | Meaning                                                            |
|---------------------|--------------------------------------------------------------------|
| `*`, `+`, `-`, `!`  | an optional modifier character (only before all other arguments)  |
| `=`                 | an optional `=`                                                    |
| `[ name ]`          | an optional argument in brackets; also `( name )` and `< name >`   |
| `name`              | a required argument                                                |
| `name:type`         | a required argument cast to `type`                                 |
| `name:list(;):type` | a list with delimiter `;` (default `,`) of items of type `type`   |
| `self`              | a braced argument that becomes the children of the node           |

Types: `str`, `cs`, `label`/`id`, `ref`/`idref`, `nox`, `list`, `dict`, `dimen`, `number`,
`float` (casts of a braced argument), and `Dimen`, `MuDimen`, `Glue`, `MuGlue`, `Number`, `Tok`,
`XTok`, `Args`, `any`, `url` (read directly from the input). Without a type, the argument is
interpreted into a fragment of the document.
```rust
use tex_dom::commands::arguments::*;
let args = compile("* [ toc ] title").unwrap();
assert_eq!(args.len(),3);
assert_eq!(args[1].kind,ArgKind::Optional{open:'[',close:']'});
assert_eq!(args[2].ty,ArgType::Fragment);
```
*/

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use crate::commands::ElementSpec;
use crate::engine::Engine;
use crate::engine::gullet::numeric_methods::*;
use crate::tex::catcodes::CategoryCode;
use crate::tex::nodes::{NodeId, SelfArg, Value};
use crate::tex::tokens::{tokens_to_source, tokens_to_string, Token};
use crate::utils::errors::TeXResult;
use crate::utils::Ptr;
use crate::{file_end, throw};

lazy_static! {
    static ref ITEMS : Regex = Regex::new(r"(\w+(?::\w+(?:\(\S\))?(?::\w+)?)?|\W|\s+)").unwrap_or_else(|_| unreachable!());
    static ref WORD : Regex = Regex::new(r"^(\w+)(?::(\w+)(?:\((\S)\))?(?::(\w+))?)?$").unwrap_or_else(|_| unreachable!());
}

/// What an argument is cast to.
#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum ArgType {
    /// Interpreted into a fragment of the document
    Fragment,
    Str,
    Cs,
    /// Attaches a label to the current labelable node
    Label,
    /// A reference to a label
    Ref,
    /// The unexpanded tokens
    Nox,
    List,
    Dict,
    DimCast,
    IntCast,
    FloatCast,
    Dimen,
    MuDimen,
    Glue,
    MuGlue,
    Number,
    Tok,
    XTok,
    /// Everything up to the next `{`
    Args,
    /// Expanded tokens up to the next space
    Any,
    /// A braced argument read with `#`, `~`, `%` and `&` as other characters
    Url
}
impl ArgType {
    fn parse(s:&str) -> Option<ArgType> {
        use ArgType::*;
        Some(match s {
            "str" | "chr" | "char" => Str,
            "cs" => Cs,
            "label" | "id" => Label,
            "ref" | "idref" => Ref,
            "nox" => Nox,
            "list" => List,
            "dict" => Dict,
            "dimen" | "length" => DimCast,
            "number" | "count" | "int" => IntCast,
            "float" | "double" => FloatCast,
            "Dimen" | "Length" => Dimen,
            "MuDimen" | "MuLength" => MuDimen,
            "Glue" | "Skip" => Glue,
            "MuGlue" | "MuSkip" => MuGlue,
            "Number" | "Int" | "Count" => Number,
            "Tok" | "Token" => Tok,
            "XTok" | "XToken" => XTok,
            "Args" => Args,
            "any" => Any,
            "url" => Url,
            _ => return None
        })
    }
    /// Whether arguments of this type are read from the input directly rather than from a
    /// braced group.
    fn is_direct(&self) -> bool {
        use ArgType::*;
        matches!(self,Dimen | MuDimen | Glue | MuGlue | Number | Tok | XTok | Args | Any)
    }
}

/// How an argument is delimited.
#[derive(Clone,Debug,PartialEq,Eq)]
pub enum ArgKind {
    Required,
    Optional{open:char,close:char},
    /// One of the given characters, e.g. `*`
    Modifier(Ptr<str>),
    Equals,
    /// `self`
    SelfArg
}

/// A single argument of an [`ElementSpec`].
#[derive(Clone,Debug,PartialEq)]
pub struct ArgSpec {
    pub name:Ptr<str>,
    pub kind:ArgKind,
    pub ty:ArgType,
    /// The delimiter of list and dict items
    pub delim:char,
    /// The type of list and dict items
    pub subtype:Option<ArgType>
}

/// Compiles an argument specification; see the [module documentation](self).
pub fn compile(spec:&str) -> Result<Vec<ArgSpec>,String> {
    let mut ret:Vec<ArgSpec> = Vec::new();
    let mut group:Option<(char,char)> = None;
    for m in ITEMS.find_iter(spec) {
        let item = m.as_str();
        if item.trim().is_empty() { continue }
        match item {
            "*" | "+" | "-" | "!" => {
                match ret.last_mut() {
                    Some(ArgSpec{kind:ArgKind::Modifier(chars),..}) => *chars = format!("{}{}",chars,item).into(),
                    Some(_) => return Err(format!("modifier {} must precede all other arguments",item)),
                    None => ret.push(ArgSpec{name:"modifier".into(),kind:ArgKind::Modifier(item.into()),ty:ArgType::Str,delim:',',subtype:None})
                }
                continue
            }
            "=" => {
                ret.push(ArgSpec{name:"equals".into(),kind:ArgKind::Equals,ty:ArgType::Str,delim:',',subtype:None});
                continue
            }
            "[" => { group = Some(('[',']')); continue }
            "(" => { group = Some(('(',')')); continue }
            "<" => { group = Some(('<','>')); continue }
            "]" | ")" | ">" => { group = None; continue }
            _ => ()
        }
        let Some(caps) = WORD.captures(item) else { return Err(format!("unexpected {:?}",item)) };
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if name == "self" {
            ret.push(ArgSpec{name:"self".into(),kind:ArgKind::SelfArg,ty:ArgType::Fragment,delim:',',subtype:None});
            continue
        }
        let ty = match caps.get(2) {
            None => ArgType::Fragment,
            Some(t) => ArgType::parse(t.as_str()).ok_or_else(|| format!("unknown argument type {}",t.as_str()))?
        };
        let delim = caps.get(3).and_then(|m| m.as_str().chars().next()).unwrap_or(',');
        let subtype = match caps.get(4) {
            None => None,
            Some(t) => Some(ArgType::parse(t.as_str()).ok_or_else(|| format!("unknown argument type {}",t.as_str()))?)
        };
        let kind = match group {
            Some((open,close)) => ArgKind::Optional{open,close},
            None => ArgKind::Required
        };
        ret.push(ArgSpec{name:name.into(),kind,ty,delim,subtype});
    }
    Ok(ret)
}

fn refstep(engine:&mut Engine,node:NodeId,counter:&str) {
    if !engine.state.counters.contains(counter) {
        debug!(target:"arguments","Unknown counter {}; creating it",counter);
        engine.state.new_counter(counter,None,0);
    }
    engine.state.counters.step(counter);
    engine.state.current_label = Some(node);
}

/// Parses the arguments of `spec` for the freshly created `node`, setting its attributes,
/// [`arg_source`](crate::tex::nodes::Node::arg_source) and, if the element has a counter,
/// stepping it and setting [`ref_text`](crate::tex::nodes::Node::ref_text). The counter is
/// stepped before the first argument, or after a leading modifier if the modifier is absent;
/// starred forms are not numbered.
pub fn parse_args(engine:&mut Engine,node:NodeId,spec:&ElementSpec) -> TeXResult<()> {
    let mut source = String::new();
    let mut stepped = false;
    let leading_modifier = matches!(spec.args.first(),Some(ArgSpec{kind:ArgKind::Modifier(_),..}));
    if let Some(c) = &spec.counter {
        if !leading_modifier {
            refstep(engine,node,c);
            stepped = true;
        }
    }
    for (i,arg) in spec.args.iter().enumerate() {
        match &arg.kind {
            ArgKind::Modifier(chars) => {
                engine.skip_whitespace();
                let value = match engine.get_next_raw() {
                    Some(tk) if !tk.is_cs() && tk.catcode != CategoryCode::EndTokens &&
                        tk.text.chars().count() == 1 && tk.char().map(|c| chars.contains(c)).unwrap_or(false) => {
                        source.push_str(&tk.text);
                        Value::Str(tk.text.to_string())
                    }
                    Some(tk) => {
                        engine.requeue(tk);
                        Value::None
                    }
                    None => Value::None
                };
                if i == 0 && value.is_none() {
                    if let Some(c) = &spec.counter {
                        refstep(engine,node,c);
                        stepped = true;
                    }
                }
                engine.doc.set_attribute(node,arg.name.clone(),value);
            }
            ArgKind::Equals => {
                engine.skip_whitespace();
                let value = match engine.get_next_raw() {
                    Some(tk) if tk.catcode == CategoryCode::Other && &*tk.text == "=" => {
                        source.push('=');
                        Value::Bool(true)
                    }
                    Some(tk) => {
                        engine.requeue(tk);
                        Value::None
                    }
                    None => Value::None
                };
                engine.doc.set_attribute(node,arg.name.clone(),value);
            }
            ArgKind::Optional{open,close} => {
                let value = match engine.read_optional(*open,*close)? {
                    None => Value::None,
                    Some(tks) => {
                        source.push(*open);
                        source.push_str(&tokens_to_source(&tks));
                        source.push(*close);
                        cast(engine,node,arg,arg.ty,tks)?
                    }
                };
                engine.doc.set_attribute(node,arg.name.clone(),value);
            }
            ArgKind::Required if arg.ty.is_direct() => {
                let value = read_direct(engine,arg.ty)?;
                let s = engine.doc.value_to_string(&value);
                source.push_str(&s);
                engine.doc.set_attribute(node,arg.name.clone(),value);
            }
            ArgKind::Required => {
                let read = if arg.ty == ArgType::Url { read_url(engine)? } else { engine.read_argument()? };
                let Some((tks,braced)) = read else {
                    throw!(Argument => "Missing argument {} of \\{}",arg.name,spec.name)
                };
                if braced {
                    source.push('{');
                    source.push_str(&tokens_to_source(&tks));
                    source.push('}');
                } else {
                    source.push_str(&tokens_to_source(&tks));
                }
                let value = cast(engine,node,arg,arg.ty,tks)?;
                engine.doc.set_attribute(node,arg.name.clone(),value);
            }
            ArgKind::SelfArg => {
                let Some((tks,_)) = engine.read_argument()? else {
                    throw!(Argument => "Missing argument of \\{}",spec.name)
                };
                let frag = engine.expand_to_fragment(tks)?;
                engine.doc.append_child(node,frag);
                engine.doc.node_mut(node).self_arg = SelfArg::Braced;
            }
        }
    }
    if stepped {
        if let Some(c) = &spec.counter {
            let r = engine.state.format_counter(c);
            engine.doc.node_mut(node).ref_text = r;
        }
    }
    engine.doc.node_mut(node).arg_source = source;
    Ok(())
}

fn read_url(engine:&mut Engine) -> TeXResult<Option<(Vec<Token>,bool)>> {
    let specials = ['#','~','%','&'];
    let old:Vec<CategoryCode> = specials.iter().map(|c| engine.state.which_code(*c)).collect();
    for c in specials { engine.state.set_catcode(c,CategoryCode::Other,false) }
    let r = engine.read_argument();
    for (c,code) in specials.iter().zip(old) { engine.state.set_catcode(*c,code,false) }
    r
}

fn read_direct(engine:&mut Engine,ty:ArgType) -> TeXResult<Value> {
    Ok(match ty {
        ArgType::Dimen => Value::Dim(read_dim(engine)?),
        ArgType::MuDimen => Value::Dim(read_mudim(engine)?),
        ArgType::Glue => Value::Skip(read_skip(engine)?),
        ArgType::MuGlue => Value::Skip(read_muskip(engine)?),
        ArgType::Number => Value::Int(read_int(engine)?),
        ArgType::Tok => match engine.get_next_raw() {
            Some(tk) => Value::Token(tk),
            None => file_end!()
        },
        ArgType::XTok => match engine.next_unexpandable()? {
            Some((tk,_)) => Value::Token(tk),
            None => file_end!()
        },
        ArgType::Args => {
            let mut ret = Vec::new();
            while let Some(tk) = engine.get_next_raw() {
                if matches!(tk.catcode,CategoryCode::BeginGroup | CategoryCode::EndTokens) {
                    engine.requeue(tk);
                    break
                }
                ret.push(tk)
            }
            Value::Tokens(ret)
        }
        ArgType::Any => {
            let mut ret = Vec::new();
            engine.skip_whitespace_expanded()?;
            while let Some((tk,_)) = engine.next_unexpandable()? {
                match tk.catcode {
                    CategoryCode::Space => break,
                    CategoryCode::EndTokens | CategoryCode::EndGroup => {
                        engine.requeue(tk);
                        break
                    }
                    _ => ret.push(tk)
                }
            }
            Value::Str(tokens_to_string(&ret))
        }
        _ => Value::None
    })
}

/// Converts the tokens of an argument to a value of type `ty`.
fn cast(engine:&mut Engine,node:NodeId,arg:&ArgSpec,ty:ArgType,tks:Vec<Token>) -> TeXResult<Value> {
    Ok(match ty {
        ArgType::Fragment => Value::Fragment(engine.expand_to_fragment(tks)?),
        ArgType::Str => Value::Str(engine.expand_to_string(tks)?.trim().to_string()),
        ArgType::Cs => match tks.into_iter().find(|t| t.catcode != CategoryCode::Space) {
            Some(t) => Value::Token(t),
            None => Value::None
        },
        ArgType::Label => {
            let s = engine.expand_to_string(tks)?;
            engine.state.label(&mut engine.doc,&s,None);
            Value::Str(s.trim().to_string())
        }
        ArgType::Ref => {
            let s = engine.expand_to_string(tks)?;
            engine.state.reference(&mut engine.doc,node,&arg.name,&s);
            engine.doc.attribute(node,&arg.name).cloned().unwrap_or(Value::None)
        }
        ArgType::Nox | ArgType::Args => Value::Tokens(tks),
        ArgType::Url => Value::Str(tokens_to_string(&tks)),
        ArgType::List => {
            let mut ret = Vec::new();
            for item in split(tks,arg.delim) {
                if item.is_empty() { continue }
                ret.push(cast(engine,node,arg,arg.subtype.unwrap_or(ArgType::Str),item)?)
            }
            Value::List(ret)
        }
        ArgType::Dict => {
            let mut ret = Vec::new();
            for item in split(tks,arg.delim) {
                if item.is_empty() { continue }
                let mut parts = split(item,'=').into_iter();
                let key = tokens_to_string(&parts.next().unwrap_or_default()).trim().to_string();
                let rest:Vec<Vec<Token>> = parts.collect();
                let value = if rest.is_empty() {
                    Value::Bool(true)
                } else {
                    let joined = rest.join(&Token::other('='));
                    cast(engine,node,arg,arg.subtype.unwrap_or(ArgType::Str),joined)?
                };
                ret.push((key,value))
            }
            Value::Dict(ret)
        }
        ArgType::DimCast | ArgType::Dimen => Value::Dim(engine.read_from_tokens(tks,read_dim)?),
        ArgType::MuDimen => Value::Dim(engine.read_from_tokens(tks,read_mudim)?),
        ArgType::Glue => Value::Skip(engine.read_from_tokens(tks,read_skip)?),
        ArgType::MuGlue => Value::Skip(engine.read_from_tokens(tks,read_muskip)?),
        ArgType::IntCast | ArgType::Number => Value::Int(engine.read_from_tokens(tks,read_int)?),
        ArgType::FloatCast => Value::Float(engine.read_from_tokens(tks,read_float)?),
        ArgType::Tok => match tks.into_iter().next() {
            Some(t) => Value::Token(t),
            None => Value::None
        },
        ArgType::XTok => match engine.read_from_tokens(tks,|e| e.next_unexpandable())? {
            Some((t,_)) => Value::Token(t),
            None => Value::None
        },
        ArgType::Any => Value::Str(engine.expand_to_string(tks)?)
    })
}

/// Splits `tks` at the top level occurrences of `delim`, trimming spaces around the items.
fn split(tks:Vec<Token>,delim:char) -> Vec<Vec<Token>> {
    let mut ret = vec!(Vec::new());
    let mut depth = 0usize;
    for t in tks {
        match t.catcode {
            CategoryCode::BeginGroup => depth += 1,
            CategoryCode::EndGroup => depth = depth.saturating_sub(1),
            _ if depth == 0 && crate::engine::gullet::is_char(&t,delim) => {
                ret.push(Vec::new());
                continue
            }
            _ => ()
        }
        if let Some(last) = ret.last_mut() { last.push(t) }
    }
    for item in ret.iter_mut() {
        while item.first().map(|t| t.catcode == CategoryCode::Space).unwrap_or(false) { item.remove(0); }
        while item.last().map(|t| t.catcode == CategoryCode::Space).unwrap_or(false) { item.pop(); }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specs() {
        let args = compile("*+ [ toc ] title").unwrap();
        assert_eq!(args[0].kind,ArgKind::Modifier("*+".into()));
        assert_eq!(args[1].name.as_ref(),"toc");
        assert_eq!(args[2].kind,ArgKind::Required);

        let args = compile("[ options:dict ] names:list(;):int self").unwrap();
        assert_eq!(args[0].ty,ArgType::Dict);
        assert_eq!(args[1].ty,ArgType::List);
        assert_eq!(args[1].delim,';');
        assert_eq!(args[1].subtype,Some(ArgType::IntCast));
        assert_eq!(args[2].kind,ArgKind::SelfArg);

        let args = compile("= (x:Dimen) <y>").unwrap();
        assert_eq!(args[0].kind,ArgKind::Equals);
        assert_eq!(args[1].kind,ArgKind::Optional{open:'(',close:')'});
        assert_eq!(args[1].ty,ArgType::Dimen);
        assert_eq!(args[2].kind,ArgKind::Optional{open:'<',close:'>'});
    }

    #[test]
    fn bad_specs() {
        assert!(compile("a:nonsense").is_err());
        assert!(compile("a *").is_err());
        assert!(compile("a ; b").is_err());
        assert!(compile("").unwrap().is_empty());
    }

    #[test]
    fn splitting() {
        let tks = Token::from_text(" a, {b,c} ,d");
        let items:Vec<String> = split(tks,',').iter().map(|i| tokens_to_string(i)).collect();
        // `from_text` does not produce group tokens, so the braces are plain characters here
        assert_eq!(items,vec!("a","{b","c}","d"));
        let mut tks = Token::from_text("a,");
        tks.insert(1,Token::begin_group());
        tks.insert(2,Token::other(','));
        tks.insert(3,Token::end_group());
        let items:Vec<String> = split(tks,',').iter().map(|i| tokens_to_string(i)).collect();
        assert_eq!(items,vec!("a{,}",""));
    }
}
