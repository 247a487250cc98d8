/*! The [`Engine`]: a parsing session, owning the input ([`Mouth`]), the scoped state
([`Context`]) and the [`Document`] being built.

Processing is a loop over [`Item`]s: [`next_item`](Engine::next_item) reads tokens, expands
macros and invokes commands until it has either a character (a [`Token`]) or a [`Node`](crate::tex::nodes::Node).
[`digest`](Engine::digest_node) then lets the node absorb the items following it according to its
[`Digest`] rule: a section takes everything up to the next section of the same level, an
environment everything up to its `\end`, and so on.
*/

pub mod mouth;
pub mod state;
pub mod gullet;
pub mod filesystem;
pub mod packages;

use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use crate::commands::{ElementSpec, Macro, PrimitiveCommand, TeXCommand, UserEnvironment};
use crate::commands::methods;
use crate::engine::filesystem::FileSystem;
use crate::engine::mouth::Mouth;
use crate::engine::packages::{BuiltinPackages, PackageResolver};
use crate::engine::state::{Context, FrameOwner};
use crate::tex::catcodes::CategoryCode;
use crate::tex::nodes::{Digest, Document, MacroMode, NodeId, NodeLevel, SelfArg};
use crate::tex::tokens::{tokens_to_source, Token};
use crate::utils::errors::TeXResult;
use crate::utils::{Ptr, PWD};
use crate::throw;

/// Settings of an [`Engine`].
#[derive(Clone,Debug)]
pub struct EngineConfig {
    /// Directories searched for `\input` files and packages, in addition to `TEXINPUTS`
    pub texinputs:Vec<PathBuf>,
    /// `\jobname`; defaults to the name of the main file
    pub jobname:Option<String>,
    /// Log a warning on the first use of every undefined command
    pub warn_on_unrecognized:bool,
    /// Interpret the `.sty`/`.cls` sources of packages without a native implementation
    pub load_tex_packages:bool,
    /// Where `\openout` writes; defaults to the working directory
    pub output_dir:Option<PathBuf>,
    /// The maximal number of expansions in a row that produce no output
    pub max_expansion_depth:usize
}
impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            texinputs:Vec::new(),
            jobname:None,
            warn_on_unrecognized:true,
            load_tex_packages:false,
            output_dir:None,
            max_expansion_depth:10000
        }
    }
}

/// Session state that is not part of TeX's scoped [`Context`].
pub struct EngineAux {
    /// The open `$`/`$$` math environments
    pub math_stack:Vec<Ptr<str>>,
    /// The nesting depth of list environments
    pub list_depth:u8,
    /// Nodes that were read too far by a digesting node and are returned next
    pub digest_buffer:Vec<NodeId>,
    /// Expansions since the last item was produced
    pub expansions:usize,
    /// Set by `\protected`, consumed by the next definition
    pub protected_next:bool,
    pub jobname:String,
    pub filesystem:FileSystem,
    pub packages:Ptr<dyn PackageResolver>,
    pub start_time:chrono::DateTime<chrono::Local>
}

/// What [`Engine::next_item`] produces.
#[derive(Clone,Debug,PartialEq)]
pub enum Item {
    /// A character (or a marker of category [`EndTokens`](CategoryCode::EndTokens))
    Token(Token),
    Node(NodeId)
}

/// See the [module documentation](self).
pub struct Engine {
    pub config:EngineConfig,
    pub mouth:Mouth,
    pub state:Context,
    pub doc:Document,
    pub aux:EngineAux
}
impl Default for Engine {
    fn default() -> Self { Self::new(EngineConfig::default()) }
}

impl Engine {
    /// A new engine with all primitives and LaTeX commands defined.
    pub fn new(config:EngineConfig) -> Self {
        let mut state = Context::default();
        state.warn_on_unrecognized = config.warn_on_unrecognized;
        let aux = EngineAux {
            math_stack:Vec::new(),
            list_depth:0,
            digest_buffer:Vec::new(),
            expansions:0,
            protected_next:false,
            jobname:config.jobname.clone().unwrap_or_else(|| "texput".to_string()),
            filesystem:FileSystem::new(PWD.clone(),&config.texinputs,config.output_dir.clone()),
            packages:Ptr::new(BuiltinPackages),
            start_time:chrono::Local::now()
        };
        let mut engine = Engine { config, mouth:Mouth::new(), state, doc:Document::new(), aux };
        crate::commands::tex::register_tex_primitives(&mut engine);
        crate::commands::latex::register_latex_commands(&mut engine);
        engine
    }

    /// Replaces the resolver for native package implementations.
    pub fn with_packages<P:PackageResolver + 'static>(mut self,resolver:P) -> Self {
        self.aux.packages = Ptr::new(resolver);
        self
    }

    /// Interprets `s` and returns the resulting document. Definitions made by `s` persist for later
    /// calls.
    pub fn parse_string(&mut self,s:&str) -> TeXResult<Document> {
        self.mouth.push_string(s,"<string>");
        self.parse()
    }

    /// Interprets the file at `path`.
    pub fn parse_file(&mut self,path:&Path) -> TeXResult<Document> {
        let content = self.aux.filesystem.read(path)?;
        if self.config.jobname.is_none() {
            if let Some(stem) = path.file_stem() {
                self.aux.jobname = stem.to_string_lossy().to_string();
            }
        }
        info!(target:"files","Parsing {}",path.display());
        self.mouth.push_string(&content,path.display().to_string());
        self.parse()
    }

    fn parse(&mut self) -> TeXResult<Document> {
        let start = std::time::Instant::now();
        let root = self.doc.root();
        if let Err(e) = self.digest_root(root) {
            let e = e.at(self.mouth.source_ref(),Some(self.mouth.preview()));
            self.mouth = Mouth::new();
            self.close_scopes();
            self.doc = Document::new();
            return Err(e)
        }
        self.doc.paragraphs(root,false);
        self.close_scopes();
        for r in self.state.unresolved_refs() {
            warn!(target:"digest","Unresolved reference {}",r);
        }
        self.aux.filesystem.close_all();
        debug!(target:"digest","Parsed {} nodes in {:?}",self.doc.len(),start.elapsed());
        Ok(std::mem::take(&mut self.doc))
    }

    /// Closes whatever the last input left open, so that the next parse starts at the global
    /// frame outside of math and lists.
    fn close_scopes(&mut self) {
        for name in self.state.unwind() {
            match &*name {
                "{" => warn!(target:"digest","Input ended inside a group; closing it"),
                n => warn!(target:"digest","Input ended inside {}; closing it",n)
            }
        }
        if !self.aux.math_stack.is_empty() {
            debug!(target:"digest","Dropping {} open math modes",self.aux.math_stack.len());
            self.aux.math_stack.clear();
        }
        self.aux.list_depth = 0;
        self.aux.digest_buffer.clear();
        self.aux.expansions = 0;
        self.aux.protected_next = false;
    }

    fn digest_root(&mut self,root:NodeId) -> TeXResult<()> {
        while let Some(item) = self.next_item()? {
            match item {
                Item::Token(t) if t.catcode == CategoryCode::EndTokens => debug!(target:"digest","Dropping marker {}",t.text),
                Item::Token(t) => self.doc.append_text(root,&t.text),
                Item::Node(n) => {
                    if self.doc.node(n).mode == MacroMode::End || matches!(self.doc.name(n),"egroup" | "endgroup") {
                        debug!(target:"digest","Dropping {} at top level",self.doc.name(n));
                        continue
                    }
                    self.digest_node(n)?;
                    self.doc.append_child(root,n);
                }
            }
        }
        Ok(())
    }

    /// The next [`Item`]; `None` at the end of the input.
    pub fn next_item(&mut self) -> TeXResult<Option<Item>> {
        loop {
            if let Some(n) = self.aux.digest_buffer.pop() {
                return Ok(Some(Item::Node(n)))
            }
            let Some(tk) = self.get_next_token() else { return Ok(None) };
            use CategoryCode::*;
            match tk.catcode {
                EndTokens => match tk.text.strip_prefix("end:") {
                    Some(name) => {
                        self.aux.expansions = 0;
                        return Ok(Some(Item::Node(self.end_environment_node(name.into()))))
                    }
                    None => return Ok(Some(Item::Token(tk)))
                }
                Letter | Other | Space | Parameter => {
                    self.aux.expansions = 0;
                    return Ok(Some(Item::Token(tk)))
                }
                _ => ()
            }
            let (tk,cmd) = match tk.catcode {
                Expanded => {
                    let tk = Token::cs(tk.text.clone()).with_source(tk.source.clone());
                    let cmd = self.state.lookup(&tk.text);
                    if cmd.is_expandable() { continue }
                    (tk,cmd)
                }
                _ => match tk.macro_name() {
                    Some(name) => {
                        let cmd = self.state.lookup(name);
                        (tk,cmd)
                    }
                    None => {
                        self.aux.expansions = 0;
                        return Ok(Some(Item::Token(tk)))
                    }
                }
            };
            if let Some(item) = self.invoke(&tk,&cmd)? {
                self.aux.expansions = 0;
                if let Item::Node(n) = &item {
                    let node = self.doc.node_mut(*n);
                    if node.source.is_none() { node.source = tk.source.clone() }
                    if node.context_depth == 0 { node.context_depth = self.state.depth() }
                }
                return Ok(Some(item))
            }
        }
    }

    /// Executes `cmd`, the meaning of `tk`. Expansions are pushed back to the input.
    pub fn invoke(&mut self,tk:&Token,cmd:&TeXCommand) -> TeXResult<Option<Item>> {
        if self.expand_once(tk,cmd)? { return Ok(None) }
        match cmd {
            TeXCommand::Primitive{cmd:PrimitiveCommand::Unexpandable(f),name} => {
                debug!(target:"commands","\\{}",name);
                f(self,tk)?;
                Ok(None)
            }
            TeXCommand::Primitive{cmd:PrimitiveCommand::Node(f),..} => Ok(f(self,tk)?.map(Item::Node)),
            TeXCommand::Primitive{..} => Ok(None),
            TeXCommand::Element(spec) => {
                let spec = spec.clone();
                Ok(Some(Item::Node(self.invoke_element(&spec,tk,MacroMode::None)?)))
            }
            TeXCommand::Environment(env) => {
                let env = env.clone();
                let tks = methods::expand_macro(self,&env.begin,tk)?;
                self.mouth.push_tokens(tks);
                Ok(None)
            }
            TeXCommand::SwitchSetter{target,state} => {
                let global = self.state.take_global();
                self.state.set_command(target.clone(),TeXCommand::Switch{name:target.clone(),state:*state},global);
                Ok(None)
            }
            TeXCommand::CharDef(c) | TeXCommand::MathCharDef(c) => Ok(Some(Item::Token(Token::from_char(*c,CategoryCode::Other)))),
            TeXCommand::Register(name) => {
                crate::commands::tex::assign_register(self,name)?;
                Ok(None)
            }
            TeXCommand::Unrecognized(name) => {
                let node = self.doc.create_element(name.clone(),NodeLevel::COMMAND,MacroMode::None);
                Ok(Some(Item::Node(node)))
            }
            TeXCommand::Macro(_) | TeXCommand::Switch{..} | TeXCommand::TheCounter{..} => Ok(None)
        }
    }

    /// Invokes an element in the given mode: creates its node, opens its scope and parses its
    /// arguments. The scope of an element invoked without `\begin` is closed again afterwards.
    pub fn invoke_element(&mut self,spec:&ElementSpec,tk:&Token,mode:MacroMode) -> TeXResult<NodeId> {
        if mode == MacroMode::End {
            let node = self.end_environment_node(spec.name.clone());
            if let Some(hook) = spec.hook { hook(self,node,MacroMode::End)? }
            return Ok(node)
        }
        let node = self.doc.create_element(spec.name.clone(),spec.level,mode);
        {
            let n = self.doc.node_mut(node);
            n.digest = spec.digest;
            n.block = spec.block;
            n.source = tk.source.clone();
            if spec.digest == Digest::Declaration { n.self_arg = SelfArg::Declaration }
        }
        for (k,v) in &spec.fixed { self.doc.set_attribute(node,k.clone(),v.clone()) }
        let owner = FrameOwner { node:Some(node), name:spec.name.clone(), mode, level:spec.level, math:spec.math };
        self.state.push(Some(owner.clone()),&spec.locals);
        if mode == MacroMode::Begin { self.state.push_currenvir(spec.name.clone()) }
        crate::commands::arguments::parse_args(self,node,spec)?;
        if let Some(hook) = spec.hook { hook(self,node,mode)? }
        if mode == MacroMode::None {
            self.state.pop_owner(&owner,None);
        }
        self.doc.node_mut(node).context_depth = self.state.depth();
        Ok(node)
    }

    /// Creates the end node of the environment `name` and closes its scope.
    fn end_environment_node(&mut self,name:Ptr<str>) -> NodeId {
        let level = match self.state.owners().filter(|o| o.name == name && o.mode == MacroMode::Begin).last() {
            Some(o) => o.level,
            None => NodeLevel::ENVIRONMENT
        };
        let node = self.doc.create_element(name.clone(),level,MacroMode::End);
        let mut owner = FrameOwner::new(name,None);
        owner.mode = MacroMode::End;
        self.state.pop_owner(&owner,None);
        self.state.pop_currenvir();
        self.doc.node_mut(node).context_depth = self.state.depth();
        node
    }

    /// `\begin{name}` for environments defined by macros: `\newenvironment` or a `\def` of
    /// `\name` (with an optional `\endname`).
    pub fn begin_macro_environment(&mut self,name:Ptr<str>,begin:&Macro,tk:&Token) -> TeXResult<NodeId> {
        let node = self.doc.create_element(name.clone(),NodeLevel::ENVIRONMENT,MacroMode::Begin);
        {
            let n = self.doc.node_mut(node);
            n.digest = Digest::Environment;
            n.source = tk.source.clone();
        }
        let mut owner = FrameOwner::new(name.clone(),Some(node));
        owner.mode = MacroMode::Begin;
        owner.level = NodeLevel::ENVIRONMENT;
        self.state.push(Some(owner),&[]);
        self.state.push_currenvir(name);
        let args = methods::read_macro_args(self,begin,tk)?;
        let mut source = String::new();
        for (i,a) in args.iter().enumerate() {
            if i == 0 && begin.default.is_some() {
                if Some(a) != begin.default.as_ref() { source.push_str(&format!("[{}]",tokens_to_source(a))) }
            } else {
                source.push_str(&format!("{{{}}}",tokens_to_source(a)))
            }
        }
        self.doc.node_mut(node).arg_source = source;
        let tks = methods::substitute(begin,&args);
        self.mouth.push_tokens(tks);
        self.doc.node_mut(node).context_depth = self.state.depth();
        Ok(node)
    }
    /// `\end{name}` for environments defined by macros: expands the end code, followed by a marker
    /// that produces the end node.
    pub fn end_macro_environment(&mut self,env:Option<&UserEnvironment>,name:&str) {
        let mut tks = match env {
            Some(e) => methods::substitute(&e.end,&[]),
            None => Vec::new()
        };
        if env.is_none() && self.state.is_defined(&format!("end{}",name)) {
            tks.push(Token::cs(format!("end{}",name)))
        }
        tks.push(Token::end_tokens(format!("end:{}",name)));
        self.mouth.push_tokens(tks)
    }

    /// Lets `id` absorb the items following it, according to its [`Digest`] rule.
    pub fn digest_node(&mut self,id:NodeId) -> TeXResult<()> {
        match self.doc.node(id).digest {
            Digest::None => Ok(()),
            Digest::Environment => self.digest_environment(id),
            Digest::Section => self.digest_section(id),
            Digest::Group => self.digest_group(id,false),
            Digest::Declaration => self.digest_group(id,true),
            Digest::Item => self.digest_item(id)
        }
    }

    fn digest_environment(&mut self,id:NodeId) -> TeXResult<()> {
        let (name,level,depth) = {
            let n = self.doc.node(id);
            (n.name.clone(),n.level,n.context_depth)
        };
        let mut dopars = false;
        loop {
            let n = match self.next_item()? {
                None => {
                    warn!(target:"digest","Input ended inside environment {}",name);
                    break
                }
                Some(Item::Token(t)) if t.catcode == CategoryCode::EndTokens => {
                    self.mouth.requeue(t);
                    break
                }
                Some(Item::Token(t)) => {
                    self.doc.append_text(id,&t.text);
                    continue
                }
                Some(Item::Node(n)) => n
            };
            let node = self.doc.node(n);
            if node.level == NodeLevel::PAR {
                dopars = true;
                self.doc.append_child(id,n);
                continue
            }
            if node.level < level {
                self.aux.digest_buffer.push(n);
                break
            }
            if node.mode == MacroMode::End && node.name == name { break }
            if level != NodeLevel::DOCUMENT && node.context_depth < depth {
                self.aux.digest_buffer.push(n);
                break
            }
            self.digest_node(n)?;
            self.doc.append_child(id,n);
        }
        if dopars { self.doc.paragraphs(id,true) }
        Ok(())
    }

    fn digest_section(&mut self,id:NodeId) -> TeXResult<()> {
        let (level,depth) = {
            let n = self.doc.node(id);
            (n.level,n.context_depth)
        };
        loop {
            let n = match self.next_item()? {
                None => break,
                Some(Item::Token(t)) if t.catcode == CategoryCode::EndTokens => {
                    self.mouth.requeue(t);
                    break
                }
                Some(Item::Token(t)) => {
                    self.doc.append_text(id,&t.text);
                    continue
                }
                Some(Item::Node(n)) => n
            };
            let node = self.doc.node(n);
            if node.level <= level || node.mode == MacroMode::End || node.context_depth < depth {
                self.aux.digest_buffer.push(n);
                break
            }
            self.digest_node(n)?;
            self.doc.append_child(id,n);
        }
        self.doc.paragraphs(id,true);
        Ok(())
    }

    /// Bare groups (which consume their closing node) and declarations (which leave it to the group).
    fn digest_group(&mut self,id:NodeId,declaration:bool) -> TeXResult<()> {
        let (name,depth) = {
            let n = self.doc.node(id);
            (n.name.clone(),n.context_depth)
        };
        loop {
            let n = match self.next_item()? {
                None => {
                    if !declaration { warn!(target:"digest","Input ended inside group {}",name) }
                    break
                }
                Some(Item::Token(t)) if t.catcode == CategoryCode::EndTokens => {
                    self.mouth.requeue(t);
                    break
                }
                Some(Item::Token(t)) => {
                    self.doc.append_text(id,&t.text);
                    continue
                }
                Some(Item::Node(n)) => n
            };
            let node = self.doc.node(n);
            if node.level < NodeLevel::ENDSECTIONS {
                self.aux.digest_buffer.push(n);
                break
            }
            if matches!(&*node.name,"egroup" | "endgroup") {
                if declaration { self.aux.digest_buffer.push(n) }
                break
            }
            if node.context_depth < depth || node.mode == MacroMode::End {
                self.aux.digest_buffer.push(n);
                break
            }
            self.digest_node(n)?;
            self.doc.append_child(id,n);
        }
        self.doc.paragraphs(id,false);
        Ok(())
    }

    fn digest_item(&mut self,id:NodeId) -> TeXResult<()> {
        let depth = self.doc.node(id).context_depth;
        loop {
            let n = match self.next_item()? {
                None => break,
                Some(Item::Token(t)) if t.catcode == CategoryCode::EndTokens => {
                    self.mouth.requeue(t);
                    break
                }
                Some(Item::Token(t)) => {
                    if !self.doc.children(id).is_empty() || !t.text.trim().is_empty() {
                        self.doc.append_text(id,&t.text)
                    }
                    continue
                }
                Some(Item::Node(n)) => n
            };
            let node = self.doc.node(n);
            if node.name == self.doc.node(id).name || node.mode == MacroMode::End ||
                node.level < NodeLevel::PAR || node.context_depth < depth {
                self.aux.digest_buffer.push(n);
                break
            }
            self.digest_node(n)?;
            self.doc.append_child(id,n);
        }
        self.doc.paragraphs(id,true);
        Ok(())
    }

    /// Digests items into `parent` until the marker token `marker` (of category
    /// [`EndTokens`](CategoryCode::EndTokens)) is read.
    pub fn digest_until_marker(&mut self,parent:NodeId,marker:&str) -> TeXResult<()> {
        loop {
            match self.next_item()? {
                None => {
                    warn!(target:"digest","Input ended before end of {}",marker);
                    break
                }
                Some(Item::Token(t)) if t.catcode == CategoryCode::EndTokens => {
                    if &*t.text == marker { break }
                    debug!(target:"digest","Unexpected marker {} while reading {}",t.text,marker);
                }
                Some(Item::Token(t)) => self.doc.append_text(parent,&t.text),
                Some(Item::Node(n)) => {
                    if self.doc.node(n).mode == MacroMode::End || matches!(self.doc.name(n),"egroup" | "endgroup") {
                        debug!(target:"digest","Dropping {} in {}",self.doc.name(n),marker);
                        continue
                    }
                    self.digest_node(n)?;
                    self.doc.append_child(parent,n);
                }
            }
        }
        Ok(())
    }

    /// Interprets `tks` into a new fragment, e.g. the value of an argument.
    pub fn expand_to_fragment(&mut self,mut tks:Vec<Token>) -> TeXResult<NodeId> {
        let frag = self.doc.create_fragment();
        tks.push(Token::end_tokens("arg"));
        self.mouth.push_tokens(tks);
        let buffer = std::mem::take(&mut self.aux.digest_buffer);
        let r = self.digest_until_marker(frag,"arg");
        self.aux.digest_buffer = buffer;
        r.map(|_| frag)
    }

    /// Interprets `tks` and returns the text of the result.
    pub fn expand_to_string(&mut self,tks:Vec<Token>) -> TeXResult<String> {
        let frag = self.expand_to_fragment(tks)?;
        Ok(self.doc.text_content(frag))
    }

    /// Fails if no group is open that a closing `}` could close.
    pub fn check_open_group(&self,name:&str) -> TeXResult<()> {
        if !self.state.has_open_group() {
            throw!(Structure => "Extra \\{}, or forgotten \\end",name)
        }
        Ok(())
    }
}
