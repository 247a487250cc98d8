/*! The output of the interpreter: a [`Document`], i.e. an arena of [`Node`]s addressed by [`NodeId`]s.

Every node has a [`NodeLevel`] that determines how it nests during digestion: a
[`section`](NodeLevel::SECTION) absorbs everything up to the next node of the same or a lower
level, an environment absorbs everything up to its `\end`, etc. Parents are stored as plain
[`NodeId`]s; the [`Document`] owns all nodes.
*/

use std::fmt::{Display, Formatter, Write};
use crate::tex::numerics::{Dim, Skip};
use crate::tex::tokens::{SourceRef, Token, tokens_to_source};
use crate::utils::Ptr;

/// Index of a [`Node`] in its [`Document`].
#[derive(Copy,Clone,Debug,PartialEq,Eq,Hash,PartialOrd,Ord)]
pub struct NodeId(usize);
impl NodeId {
    pub fn index(&self) -> usize { self.0 }
}

/// The hierarchical level of a node; lower levels close higher ones.
#[derive(Copy,Clone,Debug,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub struct NodeLevel(pub i32);
impl NodeLevel {
    pub const DOCUMENT:NodeLevel = NodeLevel(i32::MIN);
    pub const VOLUME:NodeLevel = NodeLevel(-2);
    pub const PART:NodeLevel = NodeLevel(-1);
    pub const CHAPTER:NodeLevel = NodeLevel(0);
    pub const SECTION:NodeLevel = NodeLevel(1);
    pub const SUBSECTION:NodeLevel = NodeLevel(2);
    pub const SUBSUBSECTION:NodeLevel = NodeLevel(3);
    pub const PARAGRAPH:NodeLevel = NodeLevel(4);
    pub const SUBPARAGRAPH:NodeLevel = NodeLevel(5);
    pub const SUBSUBPARAGRAPH:NodeLevel = NodeLevel(6);
    pub const ENDSECTIONS:NodeLevel = NodeLevel(100);
    pub const PAR:NodeLevel = NodeLevel(101);
    pub const ENVIRONMENT:NodeLevel = NodeLevel(201);
    pub const COMMAND:NodeLevel = NodeLevel(1001);
    pub const CHARACTER:NodeLevel = NodeLevel(1001);
}

/// Whether a node was created by `\begin{...}`, `\end{...}` or neither.
#[derive(Copy,Clone,Debug,PartialEq,Eq,Default)]
pub enum MacroMode {
    #[default]
    None,
    Begin,
    End
}

/// How a node absorbs the nodes following it after it has been created.
#[derive(Copy,Clone,Debug,PartialEq,Eq,Default)]
pub enum Digest {
    /// Nothing is absorbed
    #[default]
    None,
    /// Up to the matching `\end`
    Environment,
    /// Up to the next node with a lower or equal level
    Section,
    /// Up to the matching closing group
    Group,
    /// Up to the end of the enclosing group
    Declaration,
    /// Up to the next `\item`
    Item
}

/// What a node represents.
#[derive(Clone,Debug,PartialEq)]
pub enum NodeKind {
    Document,
    /// A detached list of nodes, e.g. the value of an expanded argument
    Fragment,
    Element,
    Text(String)
}

/// The value of an attribute, i.e. a parsed argument.
#[derive(Clone,Debug,PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Dim(Dim),
    Skip(Skip),
    Str(String),
    Token(Token),
    Tokens(Vec<Token>),
    List(Vec<Value>),
    Dict(Vec<(String,Value)>),
    /// Expanded content, owned by the document
    Fragment(NodeId),
    /// A reference to a label, resolved once the label is known
    Ref{label:String,target:Option<NodeId>}
}
impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self { Value::Str(s) => Some(s), _ => None }
    }
    pub fn as_int(&self) -> Option<i64> {
        match self { Value::Int(i) => Some(*i), _ => None }
    }
    pub fn as_tokens(&self) -> Option<&[Token]> {
        match self { Value::Tokens(v) => Some(v), _ => None }
    }
    pub fn is_none(&self) -> bool { matches!(self,Value::None) }
}

/// How the braced argument of a command like `\textbf{...}` relates to the node's children.
#[derive(Copy,Clone,Debug,PartialEq,Eq,Default)]
pub enum SelfArg {
    #[default]
    None,
    /// `\textbf{...}`: the children are the braced argument
    Braced,
    /// `\bf ...`: the children are the rest of the group
    Declaration,
    /// `\verb|...|`: the children are verbatim text between two delimiters
    Delimited(char)
}

/// A node in a [`Document`].
#[derive(Clone,Debug)]
pub struct Node {
    pub kind:NodeKind,
    pub name:Ptr<str>,
    pub level:NodeLevel,
    pub mode:MacroMode,
    pub digest:Digest,
    /// Block nodes end the current paragraph
    pub block:bool,
    pub self_arg:SelfArg,
    pub attributes:Vec<(Ptr<str>,Value)>,
    pub children:Vec<NodeId>,
    pub parent:Option<NodeId>,
    pub source:Option<SourceRef>,
    /// The source text of the parsed arguments
    pub arg_source:String,
    /// The label attached by `\label`
    pub id:Option<String>,
    /// The formatted counter value `\ref` to this node prints
    pub ref_text:Option<String>,
    /// The depth of the scope stack after the node's command was invoked
    pub context_depth:usize
}
impl Node {
    fn new(kind:NodeKind,name:Ptr<str>,level:NodeLevel) -> Self {
        Node {
            kind,name,level,mode:MacroMode::None,digest:Digest::None,block:false,self_arg:SelfArg::None,
            attributes:Vec::new(),children:Vec::new(),parent:None,source:None,arg_source:String::new(),
            id:None,ref_text:None,context_depth:0
        }
    }
    pub fn attribute(&self,name:&str) -> Option<&Value> {
        self.attributes.iter().find(|(k,_)| &**k == name).map(|(_,v)| v)
    }
    pub fn is_text(&self) -> bool { matches!(self.kind,NodeKind::Text(_)) }
}

/// An arena of [`Node`]s with a distinguished root node.
#[derive(Clone,Debug)]
pub struct Document {
    nodes:Vec<Node>,
    root:NodeId
}
impl Default for Document {
    fn default() -> Self { Self::new() }
}
impl Document {
    pub fn new() -> Self {
        Document { nodes:vec![Node::new(NodeKind::Document,"document".into(),NodeLevel::DOCUMENT)], root:NodeId(0) }
    }
    /// The document node.
    pub fn root(&self) -> NodeId { self.root }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.len() == 1 }
    pub fn node(&self,id:NodeId) -> &Node { &self.nodes[id.0] }
    pub fn node_mut(&mut self,id:NodeId) -> &mut Node { &mut self.nodes[id.0] }
    pub fn name(&self,id:NodeId) -> &str { &self.nodes[id.0].name }
    pub fn children(&self,id:NodeId) -> &[NodeId] { &self.nodes[id.0].children }
    pub fn parent(&self,id:NodeId) -> Option<NodeId> { self.nodes[id.0].parent }
    pub fn level(&self,id:NodeId) -> NodeLevel { self.nodes[id.0].level }
    pub fn attribute(&self,id:NodeId,name:&str) -> Option<&Value> { self.nodes[id.0].attribute(name) }

    fn push(&mut self,node:Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
    /// Creates a new, detached element.
    pub fn create_element<S:Into<Ptr<str>>>(&mut self,name:S,level:NodeLevel,mode:MacroMode) -> NodeId {
        let mut n = Node::new(NodeKind::Element,name.into(),level);
        n.mode = mode;
        self.push(n)
    }
    pub fn create_text<S:Into<String>>(&mut self,text:S) -> NodeId {
        self.push(Node::new(NodeKind::Text(text.into()),"#text".into(),NodeLevel::CHARACTER))
    }
    pub fn create_fragment(&mut self) -> NodeId {
        self.push(Node::new(NodeKind::Fragment,"#document-fragment".into(),NodeLevel::COMMAND))
    }
    pub fn set_attribute<S:Into<Ptr<str>>>(&mut self,id:NodeId,name:S,value:Value) {
        let name = name.into();
        let attrs = &mut self.nodes[id.0].attributes;
        match attrs.iter_mut().find(|(k,_)| *k == name) {
            Some((_,v)) => *v = value,
            None => attrs.push((name,value))
        }
    }

    /// Appends `child` to `parent`, detaching it from its previous parent first. Fragments are
    /// dissolved, i.e. their children are appended instead.
    pub fn append_child(&mut self,parent:NodeId,child:NodeId) {
        if self.nodes[child.0].kind == NodeKind::Fragment {
            let kids = std::mem::take(&mut self.nodes[child.0].children);
            for k in kids { self.append_child(parent,k) }
            return
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }
    fn detach(&mut self,child:NodeId) {
        if let Some(p) = self.nodes[child.0].parent.take() {
            self.nodes[p.0].children.retain(|c| *c != child);
        }
    }
    /// Appends text to `parent`, merging it with a trailing text child.
    pub fn append_text(&mut self,parent:NodeId,text:&str) {
        if let Some(last) = self.nodes[parent.0].children.last().copied() {
            if let NodeKind::Text(s) = &mut self.nodes[last.0].kind {
                s.push_str(text);
                return
            }
        }
        let t = self.create_text(text);
        self.append_child(parent,t);
    }
    /// Replaces the children of `parent` by `children`.
    pub fn set_children(&mut self,parent:NodeId,children:Vec<NodeId>) {
        for c in std::mem::take(&mut self.nodes[parent.0].children) {
            self.nodes[c.0].parent = None;
        }
        for c in children { self.append_child(parent,c) }
    }

    /// Whether the node consists only of whitespace, i.e. can be dropped between block nodes.
    pub fn is_whitespace(&self,id:NodeId) -> bool {
        let n = &self.nodes[id.0];
        match &n.kind {
            NodeKind::Text(s) => s.trim().is_empty(),
            NodeKind::Element if &*n.name == "par" => n.children.iter().all(|c| self.is_whitespace(*c)),
            _ => false
        }
    }

    /// Regroups the children of `id` into `par` nodes. Unless `force` is set, this only happens if
    /// `id` has `par` children already. Block nodes and nodes below paragraph level are not wrapped.
    pub fn paragraphs(&mut self,id:NodeId,force:bool) {
        let kids = self.nodes[id.0].children.clone();
        if !force && !kids.iter().any(|k| self.nodes[k.0].level == NodeLevel::PAR) { return }
        let mut new = Vec::new();
        let mut current = self.create_element("par",NodeLevel::PAR,MacroMode::None);
        new.push(current);
        for k in kids {
            let (level,block,empty) = {
                let node = &self.nodes[k.0];
                (node.level,node.block,node.children.is_empty())
            };
            if level == NodeLevel::PAR {
                if empty {
                    current = k;
                    new.push(k);
                } else {
                    new.push(k);
                    current = self.create_element("par",NodeLevel::PAR,MacroMode::None);
                    new.push(current);
                }
            } else if block || level < NodeLevel::PAR {
                new.push(k);
                current = self.create_element("par",NodeLevel::PAR,MacroMode::None);
                new.push(current);
            } else {
                self.append_child(current,k);
            }
        }
        let new = new.into_iter().filter(|n| self.nodes[n.0].level != NodeLevel::PAR || !self.is_whitespace(*n)).collect();
        self.set_children(id,new);
    }

    /// The concatenated text of all text nodes below `id`.
    pub fn text_content(&self,id:NodeId) -> String {
        let mut s = String::new();
        self.text_content_i(id,&mut s);
        s
    }
    fn text_content_i(&self,id:NodeId,s:&mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => s.push_str(t),
            _ => for c in &self.nodes[id.0].children { self.text_content_i(*c,s) }
        }
    }

    /// All nodes named `name` below (and including) `id`, in document order.
    pub fn find_all(&self,id:NodeId,name:&str) -> Vec<NodeId> {
        let mut ret = Vec::new();
        self.find_all_i(id,name,&mut ret);
        ret
    }
    fn find_all_i(&self,id:NodeId,name:&str,ret:&mut Vec<NodeId>) {
        if &*self.nodes[id.0].name == name { ret.push(id) }
        for c in &self.nodes[id.0].children { self.find_all_i(*c,name,ret) }
    }

    /// Reconstructs (approximately) the TeX source of the node `id`.
    pub fn source(&self,id:NodeId) -> String {
        let mut s = String::new();
        let _ = self.source_i(id,&mut s);
        s
    }
    fn children_source<W:Write>(&self,id:NodeId,f:&mut W) -> std::fmt::Result {
        for c in &self.nodes[id.0].children { self.source_i(*c,f)? }
        Ok(())
    }
    fn source_i<W:Write>(&self,id:NodeId,f:&mut W) -> std::fmt::Result {
        let n = &self.nodes[id.0];
        match &n.kind {
            NodeKind::Text(t) => return f.write_str(t),
            NodeKind::Document | NodeKind::Fragment => return self.children_source(id,f),
            NodeKind::Element => ()
        }
        match (&*n.name,n.mode) {
            ("bgroup",_) => {
                f.write_char('{')?;
                self.children_source(id,f)?;
                return f.write_char('}')
            }
            ("begingroup",_) => {
                f.write_str("\\begingroup ")?;
                self.children_source(id,f)?;
                return f.write_str("\\endgroup ")
            }
            ("par",_) => {
                self.children_source(id,f)?;
                return f.write_str("\n\n")
            }
            ("math" | "displaymath",MacroMode::Begin) if !n.arg_source.is_empty() => {
                let close = match n.arg_source.as_str() {
                    "\\(" => "\\)",
                    "\\[" => "\\]",
                    s => s
                };
                f.write_str(&n.arg_source)?;
                self.children_source(id,f)?;
                return f.write_str(close)
            }
            (name,MacroMode::Begin) => {
                write!(f,"\\begin{{{}}}{}",name,n.arg_source)?;
                self.children_source(id,f)?;
                return write!(f,"\\end{{{}}}",name)
            }
            (name,MacroMode::End) => return write!(f,"\\end{{{}}}",name),
            _ => ()
        }
        match n.name.strip_prefix(crate::tex::tokens::ACTIVE_PREFIX) {
            Some(c) => write!(f,"{}{}",c,n.arg_source)?,
            None => {
                write!(f,"\\{}",n.name)?;
                match n.arg_source.chars().next() {
                    None if matches!(n.self_arg,SelfArg::Braced | SelfArg::Delimited(_)) => (),
                    None => f.write_char(' ')?,
                    Some(c) if c.is_alphabetic() => write!(f," {}",n.arg_source)?,
                    Some(_) => f.write_str(&n.arg_source)?
                }
            }
        }
        match n.self_arg {
            SelfArg::Braced => {
                f.write_char('{')?;
                self.children_source(id,f)?;
                f.write_char('}')
            }
            SelfArg::Delimited(c) => {
                f.write_char(c)?;
                self.children_source(id,f)?;
                f.write_char(c)
            }
            _ => self.children_source(id,f)
        }
    }

    /// Renders an attribute value as text; fragments are rendered as their source.
    pub fn value_to_string(&self,v:&Value) -> String {
        match v {
            Value::None => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Dim(d) => d.to_string(),
            Value::Skip(s) => s.to_string(),
            Value::Str(s) => s.clone(),
            Value::Token(t) => t.to_string(),
            Value::Tokens(v) => tokens_to_source(v),
            Value::List(v) => v.iter().map(|v| self.value_to_string(v)).collect::<Vec<_>>().join(","),
            Value::Dict(v) => v.iter().map(|(k,v)| format!("{}={}",k,self.value_to_string(v))).collect::<Vec<_>>().join(","),
            Value::Fragment(id) => self.source(*id),
            Value::Ref{label,..} => label.clone()
        }
    }

    /// A helper struct implementing [`Display`] as an indented, XML-like dump of the tree below `id`.
    pub fn display(&self,id:NodeId) -> DisplayTree<'_> { DisplayTree{doc:self,id} }

    fn display_i(&self,id:NodeId,indent:usize,f:&mut Formatter<'_>) -> std::fmt::Result {
        let n = &self.nodes[id.0];
        let pad = "  ".repeat(indent);
        if let NodeKind::Text(t) = &n.kind {
            return writeln!(f,"{}{:?}",pad,t)
        }
        write!(f,"{}<{}",pad,n.name)?;
        match n.mode {
            MacroMode::Begin => f.write_str(" mode=\"begin\"")?,
            MacroMode::End => f.write_str(" mode=\"end\"")?,
            MacroMode::None => ()
        }
        if let Some(i) = &n.id { write!(f," id=\"{}\"",i)? }
        if let Some(r) = &n.ref_text { write!(f," ref=\"{}\"",r)? }
        for (k,v) in &n.attributes {
            match v {
                Value::Ref{target:Some(t),..} => write!(f," {}=\"#{}\"",k,self.nodes[t.0].id.as_deref().unwrap_or(""))?,
                _ => write!(f," {}={:?}",k,self.value_to_string(v))?
            }
        }
        if n.children.is_empty() { return writeln!(f,"/>") }
        writeln!(f,">")?;
        for c in &n.children { self.display_i(*c,indent + 1,f)? }
        writeln!(f,"{}</{}>",pad,n.name)
    }
}

pub struct DisplayTree<'a> { doc:&'a Document, id:NodeId }
impl Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.doc.display_i(self.id,0,f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_merging() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_text(root,"Hello");
        doc.append_text(root,", World");
        assert_eq!(doc.children(root).len(),1);
        assert_eq!(doc.text_content(root),"Hello, World");
    }

    #[test]
    fn paragraphs() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_text(root,"one");
        let par = doc.create_element("par",NodeLevel::PAR,MacroMode::None);
        doc.append_child(root,par);
        doc.append_text(root,"two");
        let par2 = doc.create_element("par",NodeLevel::PAR,MacroMode::None);
        doc.append_child(root,par2);
        doc.append_text(root,"  ");
        doc.paragraphs(root,false);
        let kids = doc.children(root).to_vec();
        assert_eq!(kids.len(),2);
        assert!(kids.iter().all(|k| doc.name(*k) == "par"));
        assert_eq!(doc.text_content(kids[0]),"one");
        assert_eq!(doc.text_content(kids[1]),"two");
    }

    #[test]
    fn source() {
        let mut doc = Document::new();
        let root = doc.root();
        let bf = doc.create_element("textbf",NodeLevel::COMMAND,MacroMode::None);
        doc.node_mut(bf).self_arg = SelfArg::Braced;
        doc.append_text(bf,"bold");
        doc.append_child(root,bf);
        let sec = doc.create_element("section",NodeLevel::SECTION,MacroMode::None);
        doc.node_mut(sec).arg_source = "{Intro}".into();
        doc.append_child(root,sec);
        let it = doc.create_element("item",NodeLevel::COMMAND,MacroMode::None);
        doc.append_child(root,it);
        let env = doc.create_element("foo",NodeLevel::ENVIRONMENT,MacroMode::Begin);
        doc.append_text(env,"x");
        doc.append_child(root,env);
        assert_eq!(doc.source(root),"\\textbf{bold}\\section{Intro}\\item \\begin{foo}x\\end{foo}");
    }

    #[test]
    fn math_and_verb_source() {
        let mut doc = Document::new();
        let root = doc.root();
        let m = doc.create_element("math",NodeLevel::ENVIRONMENT,MacroMode::Begin);
        doc.node_mut(m).arg_source = "\\(".into();
        doc.append_text(m,"x");
        doc.append_child(root,m);
        let d = doc.create_element("displaymath",NodeLevel::ENVIRONMENT,MacroMode::Begin);
        doc.node_mut(d).arg_source = "$$".into();
        doc.append_text(d,"y");
        doc.append_child(root,d);
        let v = doc.create_element("verb",NodeLevel::COMMAND,MacroMode::None);
        doc.node_mut(v).self_arg = SelfArg::Delimited('|');
        doc.append_text(v,"\\x");
        doc.append_child(root,v);
        let g = doc.create_element("begingroup",NodeLevel::COMMAND,MacroMode::None);
        doc.append_text(g,"z");
        doc.append_child(root,g);
        assert_eq!(doc.source(root),"\\(x\\)$$y$$\\verb|\\x|\\begingroup z\\endgroup ");
    }
}
