/*! The [`Context`]: TeX's stack of scopes.

 Every frame holds the commands defined in it, the `\let` aliases of control sequences to
 characters, the [`CategoryTable`] in effect, and the *owner* that pushed it (a bare group
 has none). Lookups walk the frames from the innermost outwards; local assignments go to the
 innermost frame, global ones to frame `0`. Counters, registers, labels and loaded packages are
 not scoped and live directly in the [`Context`].
 */
pub mod counters;

use log::{debug, warn};
use crate::commands::TeXCommand;
use crate::engine::state::counters::{CounterFormat, Counters};
use crate::tex::catcodes::{CategoryCode, CategoryTable};
use crate::tex::nodes::{Document, MacroMode, NodeId, NodeLevel, Value};
use crate::tex::numerics::RegisterValue;
use crate::tex::tokens::Token;
use crate::utils::{HMap, Ptr};

/// The node (or command) that pushed a frame.
#[derive(Clone,Debug,PartialEq)]
pub struct FrameOwner {
    pub node:Option<NodeId>,
    pub name:Ptr<str>,
    pub mode:MacroMode,
    pub level:NodeLevel,
    /// `Some(true)` for math environments, `Some(false)` for text inside math (e.g. `\hbox`)
    pub math:Option<bool>
}
impl FrameOwner {
    pub fn new<S:Into<Ptr<str>>>(name:S,node:Option<NodeId>) -> Self {
        FrameOwner { node, name:name.into(), mode:MacroMode::None, level:NodeLevel::COMMAND, math:None }
    }
}

#[derive(Clone,Debug)]
struct Frame {
    owner:Option<FrameOwner>,
    commands:HMap<Ptr<str>,TeXCommand>,
    lets:HMap<Ptr<str>,Token>,
    catcodes:Ptr<CategoryTable>
}
impl Frame {
    fn new(owner:Option<FrameOwner>,catcodes:Ptr<CategoryTable>) -> Self {
        Frame { owner, commands:HMap::default(), lets:HMap::default(), catcodes }
    }
}

/// See the [module documentation](self).
#[derive(Clone,Debug)]
pub struct Context {
    frames:Vec<Frame>,
    pub counters:Counters,
    registers:HMap<Ptr<str>,RegisterValue>,
    labels:HMap<String,NodeId>,
    pending_refs:HMap<String,Vec<(NodeId,Ptr<str>)>>,
    /// The node the next `\label` attaches to
    pub current_label:Option<NodeId>,
    /// Loaded packages and classes with their options
    pub packages:HMap<String,Vec<String>>,
    currenvir:Vec<Ptr<str>>,
    /// Set by `\global`, consumed by the next assignment
    pub global_next:bool,
    pub warn_on_unrecognized:bool
}
impl Default for Context {
    fn default() -> Self { Self::new(CategoryTable::default()) }
}

impl Context {
    pub fn new(catcodes:CategoryTable) -> Self {
        Context {
            frames:vec!(Frame::new(None,Ptr::new(catcodes))),
            counters:Counters::default(),
            registers:HMap::default(),
            labels:HMap::default(),
            pending_refs:HMap::default(),
            current_label:None,
            packages:HMap::default(),
            currenvir:Vec::new(),
            global_next:false,
            warn_on_unrecognized:true
        }
    }

    /// The number of frames, including the global one.
    pub fn depth(&self) -> usize { self.frames.len() }

    /// Pops every frame but the global one and returns the names of the scopes that were still
    /// open, innermost first (`{` for plain groups). Also forgets the current label and a pending
    /// `\global`.
    pub fn unwind(&mut self) -> Vec<Ptr<str>> {
        let mut ret = Vec::new();
        while self.frames.len() > 1 {
            if let Some(f) = self.frames.pop() {
                ret.push(f.owner.map(|o| o.name).unwrap_or_else(|| "{".into()))
            }
        }
        self.currenvir.clear();
        self.current_label = None;
        self.global_next = false;
        ret
    }

    fn top(&self) -> &Frame {
        // there is always at least the global frame
        &self.frames[self.frames.len() - 1]
    }
    fn top_mut(&mut self) -> &mut Frame {
        let i = self.frames.len() - 1;
        &mut self.frames[i]
    }

    /// Pushes a new frame owned by `owner` (a bare group if `None`), with the `locals` of the owner
    /// defined in it. A [`DOCUMENT`](NodeLevel::DOCUMENT) level owner first unwinds the stack to
    /// the global frame.
    pub fn push(&mut self,owner:Option<FrameOwner>,locals:&[(Ptr<str>,TeXCommand)]) {
        if let Some(o) = &owner {
            if o.level == NodeLevel::DOCUMENT && self.frames.len() > 1 {
                debug!(target:"context","Unwinding {} frames for {}",self.frames.len() - 1,o.name);
                self.frames.truncate(1)
            }
        }
        debug!(target:"context","Pushing {} onto frame {}",owner.as_ref().map(|o| &*o.name).unwrap_or("{}"),self.frames.len());
        let mut frame = Frame::new(owner,self.top().catcodes.clone());
        for (k,v) in locals { frame.commands.insert(k.clone(),v.clone()); }
        self.frames.push(frame)
    }

    /// Closes the innermost bare group: pops frames up to and including the first one without
    /// an owner.
    pub fn pop(&mut self) {
        while self.frames.len() > 1 {
            let f = self.frames.pop();
            if let Some(Frame{owner:None,..}) = f {
                debug!(target:"context","Popped group; depth {}",self.frames.len());
                break
            }
        }
    }

    /// Pops the frames belonging to `obj`; `parent` is the parent node of `obj`, whose frame
    /// is never popped.
    pub fn pop_owner(&mut self,obj:&FrameOwner,parent:Option<NodeId>) {
        while self.frames.len() > 1 {
            let stop = match &self.top().owner {
                None => false,
                Some(o) if o.node.is_some() && o.node == obj.node => true,
                Some(o) if o.node.is_some() && o.node == parent => {
                    debug!(target:"context","Not popping parent {}",o.name);
                    return
                }
                Some(o) if o.name == obj.name && obj.mode == MacroMode::End => true,
                Some(o) => obj.name.strip_prefix("end") == Some(&*o.name)
            };
            self.frames.pop();
            if stop {
                debug!(target:"context","Popped {}; depth {}",obj.name,self.frames.len());
                return
            }
        }
    }

    /// The owners of the open frames, innermost last
    pub fn owners(&self) -> impl Iterator<Item=&FrameOwner> {
        self.frames.iter().filter_map(|f| f.owner.as_ref())
    }
    /// Whether there is an open bare group (one that `}` would close)
    pub fn has_open_group(&self) -> bool {
        self.frames.iter().skip(1).any(|f| f.owner.is_none())
    }

    /// Whether the innermost frame that decides it is in math mode.
    pub fn is_math_mode(&self) -> bool {
        self.frames.iter().rev().filter_map(|f| f.owner.as_ref()).find_map(|o| o.math).unwrap_or(false)
    }

    /// The current category table
    pub fn catcodes(&self) -> &CategoryTable { &self.top().catcodes }
    pub fn which_code(&self,c:char) -> CategoryCode { self.top().catcodes.which_code(c) }
    /// `\catcode`: copies the current table before changing it, so that enclosing frames are unaffected.
    /// A global assignment changes the table in every frame.
    pub fn set_catcode(&mut self,c:char,code:CategoryCode,global:bool) {
        if global {
            for f in self.frames.iter_mut() {
                Ptr::make_mut(&mut f.catcodes).assign(c,code)
            }
        } else {
            Ptr::make_mut(&mut self.top_mut().catcodes).assign(c,code)
        }
    }
    /// Replaces the current category table, e.g. for reading verbatim material.
    pub fn set_catcodes(&mut self,table:CategoryTable) {
        self.top_mut().catcodes = Ptr::new(table)
    }

    /// The command `name` is bound to, if any.
    pub fn get_command(&self,name:&str) -> Option<&TeXCommand> {
        for f in self.frames.iter().rev() {
            if let Some(c) = f.commands.get(name) { return Some(c) }
            if f.lets.contains_key(name) { return None }
        }
        None
    }
    /// Whether `name` is bound to a command other than an auto-generated placeholder.
    pub fn is_defined(&self,name:&str) -> bool {
        match self.get_command(name) {
            Some(TeXCommand::Unrecognized(_)) => false,
            Some(_) => true,
            None => self.get_let(name).is_some()
        }
    }
    /// The command `name` is bound to; if it is unbound, an [`Unrecognized`](TeXCommand::Unrecognized)
    /// placeholder is created globally, with a warning unless in math mode.
    pub fn lookup(&mut self,name:&str) -> TeXCommand {
        if let Some(c) = self.get_command(name) { return c.clone() }
        if self.warn_on_unrecognized && !self.is_math_mode() {
            warn!(target:"context","unrecognized command/environment: {}",name);
        }
        let c = TeXCommand::Unrecognized(name.into());
        self.frames[0].commands.insert(name.into(),c.clone());
        c
    }

    /// The character a control sequence has been `\let` to, if any.
    pub fn get_let(&self,name:&str) -> Option<&Token> {
        for f in self.frames.iter().rev() {
            if let Some(t) = f.lets.get(name) { return Some(t) }
            if f.commands.contains_key(name) { return None }
        }
        None
    }

    /// Binds `name` in the innermost frame, or globally. A global assignment also removes all local
    /// bindings of `name`.
    pub fn set_command<S:Into<Ptr<str>>>(&mut self,name:S,cmd:TeXCommand,global:bool) {
        let name = name.into();
        if global {
            for f in self.frames.iter_mut().skip(1) {
                f.commands.remove(&name);
                f.lets.remove(&name);
            }
            self.frames[0].lets.remove(&name);
            self.frames[0].commands.insert(name,cmd);
        } else {
            let top = self.top_mut();
            top.lets.remove(&name);
            top.commands.insert(name,cmd);
        }
    }

    /// `\let\dest=source`. A control sequence (or active character) `source` binds `dest` to whatever
    /// `source` means *now*; later redefinitions of `source` do not affect `dest`. Any other token
    /// makes `dest` an alias of that character.
    pub fn let_token(&mut self,dest:&str,source:&Token,global:bool) {
        if source.is_cs() {
            if let Some(t) = self.get_let(&source.text).cloned() {
                return self.let_char(dest,t,global)
            }
            let cmd = match self.get_command(&source.text) {
                Some(c) => c.clone(),
                None => TeXCommand::Unrecognized(source.text.clone())
            };
            debug!(target:"context","\\let\\{}=\\{}",dest,source.text);
            self.set_command(dest,cmd,global)
        } else {
            self.let_char(dest,source.clone(),global)
        }
    }
    fn let_char(&mut self,dest:&str,tk:Token,global:bool) {
        let dest:Ptr<str> = dest.into();
        let tk = tk.with_source(None);
        if global {
            for f in self.frames.iter_mut() {
                f.commands.remove(&dest);
                f.lets.remove(&dest);
            }
            self.frames[0].lets.insert(dest,tk);
        } else {
            let top = self.top_mut();
            top.commands.remove(&dest);
            top.lets.insert(dest,tk);
        }
    }

    /// Consumes the `\global` flag.
    pub fn take_global(&mut self) -> bool { std::mem::take(&mut self.global_next) }

    /// `\newcounter`: creates the counter and `\the<name>`, unless it exists already.
    pub fn new_counter(&mut self,name:&str,resetby:Option<&str>,initial:i64) {
        if !self.counters.new_counter(name,resetby,initial) {
            debug!(target:"context","counter {} already defined",name);
            return
        }
        let the = format!("the{}",name);
        self.set_command(the,TeXCommand::TheCounter{counter:name.into(),format:CounterFormat::new(name)},true)
    }
    /// Sets the format of `\the<name>`.
    pub fn set_counter_format(&mut self,name:&str,format:&str) {
        let the = format!("the{}",name);
        self.set_command(the,TeXCommand::TheCounter{counter:name.into(),format:CounterFormat(format.into())},true)
    }
    /// Renders `\the<name>`, if it is still bound to a counter format.
    pub fn format_counter(&self,name:&str) -> Option<String> {
        let lookup = |n:&str| match self.get_command(n) {
            Some(TeXCommand::TheCounter{format,..}) => Some(format.clone()),
            _ => None
        };
        lookup(&format!("the{}",name)).map(|f| f.render(&self.counters,&lookup))
    }

    /// Allocates a register (`\newcount` etc.), bound to the control sequence `name`.
    pub fn new_register(&mut self,name:&str,value:RegisterValue) {
        let name:Ptr<str> = name.into();
        debug!(target:"context","New register \\{} = {}",name,value);
        self.registers.insert(name.clone(),value);
        self.set_command(name.clone(),TeXCommand::Register(name),true)
    }
    pub fn register(&self,name:&str) -> Option<RegisterValue> { self.registers.get(name).copied() }
    pub fn set_register(&mut self,name:&str,value:RegisterValue) {
        if let Some(v) = self.registers.get_mut(name) { *v = value }
    }

    /// Attaches `label` to `node` (or the current labelable node), and resolves pending references to it.
    pub fn label(&mut self,doc:&mut Document,label:&str,node:Option<NodeId>) {
        let label = label.trim();
        if label.is_empty() { return }
        let Some(node) = node.or(self.current_label) else {
            warn!(target:"context","\\label{{{}}} outside of a labelable context",label);
            return
        };
        doc.node_mut(node).id = Some(label.to_string());
        self.labels.insert(label.to_string(),node);
        if let Some(pending) = self.pending_refs.remove(label) {
            for (obj,attr) in pending {
                doc.set_attribute(obj,attr,Value::Ref{label:label.to_string(),target:Some(node)});
            }
        }
    }
    /// Sets the attribute `attr` of `obj` to a reference to `label`; if the label is not known yet,
    /// the reference is resolved once it is.
    pub fn reference(&mut self,doc:&mut Document,obj:NodeId,attr:&str,label:&str) {
        let label = label.trim();
        if label.is_empty() { return }
        let target = self.labels.get(label).copied();
        if target.is_none() {
            self.pending_refs.entry(label.to_string()).or_default().push((obj,attr.into()));
        }
        doc.set_attribute(obj,attr,Value::Ref{label:label.to_string(),target});
    }
    pub fn labels(&self) -> &HMap<String,NodeId> { &self.labels }
    /// Labels that have been referenced but never defined
    pub fn unresolved_refs(&self) -> impl Iterator<Item=&str> {
        self.pending_refs.keys().map(|s| s.as_str())
    }

    /// `\@currenvir`
    pub fn currenvir(&self) -> Option<&str> { self.currenvir.last().map(|s| &**s) }
    pub fn push_currenvir(&mut self,name:Ptr<str>) { self.currenvir.push(name) }
    pub fn pop_currenvir(&mut self) -> Option<Ptr<str>> { self.currenvir.pop() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::TeXCommand;

    fn owner(name:&str,doc:&mut Document) -> FrameOwner {
        let id = doc.create_element(name,NodeLevel::COMMAND,MacroMode::None);
        FrameOwner::new(name,Some(id))
    }

    #[test]
    fn scopes() {
        let mut c = Context::default();
        c.set_command("foo",TeXCommand::CharDef('a'),false);
        c.push(None,&[]);
        c.set_command("foo",TeXCommand::CharDef('b'),false);
        c.set_command("bar",TeXCommand::CharDef('c'),true);
        c.set_catcode('@',CategoryCode::Other,false);
        c.push(None,&[]);
        assert_eq!(c.get_command("foo"),Some(&TeXCommand::CharDef('b')));
        assert_eq!(c.which_code('@'),CategoryCode::Other);
        c.pop();
        c.pop();
        assert_eq!(c.get_command("foo"),Some(&TeXCommand::CharDef('a')));
        assert_eq!(c.get_command("bar"),Some(&TeXCommand::CharDef('c')));
        assert_eq!(c.which_code('@'),CategoryCode::Letter);
        assert_eq!(c.depth(),1);
        c.pop();
        assert_eq!(c.depth(),1);
    }

    #[test]
    fn unwind() {
        let mut doc = Document::new();
        let mut c = Context::default();
        c.push(None,&[]);
        c.set_command("foo",TeXCommand::CharDef('b'),false);
        c.push(Some(owner("center",&mut doc)),&[]);
        c.global_next = true;
        let names:Vec<String> = c.unwind().iter().map(|n| n.to_string()).collect();
        assert_eq!(names,vec!("center".to_string(),"{".to_string()));
        assert_eq!(c.depth(),1);
        assert!(!c.is_defined("foo"));
        assert!(!c.global_next);
        assert!(c.unwind().is_empty());
    }

    #[test]
    fn lets() {
        let mut c = Context::default();
        c.set_command("foo",TeXCommand::CharDef('a'),false);
        c.let_token("bar",&Token::cs("foo"),false);
        c.set_command("foo",TeXCommand::CharDef('b'),false);
        assert_eq!(c.get_command("bar"),Some(&TeXCommand::CharDef('a')));
        c.push(None,&[]);
        c.let_token("foo",&Token::letter('x'),false);
        assert_eq!(c.get_let("foo"),Some(&Token::letter('x')));
        assert_eq!(c.get_command("foo"),None);
        c.let_token("baz",&Token::cs("foo"),false);
        assert_eq!(c.get_let("baz"),Some(&Token::letter('x')));
        c.pop();
        assert_eq!(c.get_let("foo"),None);
        assert_eq!(c.get_command("foo"),Some(&TeXCommand::CharDef('b')));
    }

    #[test]
    fn unrecognized() {
        let mut c = Context::default();
        c.warn_on_unrecognized = false;
        assert!(!c.is_defined("nope"));
        assert_eq!(c.lookup("nope"),TeXCommand::Unrecognized("nope".into()));
        c.push(None,&[]);
        c.pop();
        assert_eq!(c.get_command("nope"),Some(&TeXCommand::Unrecognized("nope".into())));
    }

    #[test]
    fn pop_matching() {
        let mut doc = Document::new();
        let mut c = Context::default();
        let foo = owner("foo",&mut doc);
        let mut endfoo = foo.clone();
        endfoo.node = None;
        endfoo.mode = MacroMode::End;
        c.push(Some(foo.clone()),&[]);
        c.push(None,&[]);
        let bar = owner("bar",&mut doc);
        c.push(Some(bar),&[]);
        c.pop_owner(&endfoo,None);
        assert_eq!(c.depth(),1);

        let mut mac = FrameOwner::new("foo",None);
        mac.node = foo.node;
        c.push(Some(mac),&[]);
        c.pop_owner(&FrameOwner::new("endfoo",None),None);
        assert_eq!(c.depth(),1);

        let mut doc_owner = FrameOwner::new("document",None);
        doc_owner.level = NodeLevel::DOCUMENT;
        c.push(None,&[]);
        c.push(None,&[]);
        c.push(Some(doc_owner),&[]);
        assert_eq!(c.depth(),2);
    }

    #[test]
    fn counters_and_labels() {
        let mut doc = Document::new();
        let mut c = Context::default();
        c.new_counter("chapter",None,0);
        c.new_counter("section",Some("chapter"),0);
        c.set_counter_format("section","${thechapter}.${section}");
        c.counters.step("chapter");
        c.counters.step("section");
        assert_eq!(c.format_counter("section").as_deref(),Some("1.1"));

        let refnode = doc.create_element("ref",NodeLevel::COMMAND,MacroMode::None);
        c.reference(&mut doc,refnode,"label","sec:a");
        assert_eq!(c.unresolved_refs().count(),1);
        let sec = doc.create_element("section",NodeLevel::SECTION,MacroMode::None);
        c.current_label = Some(sec);
        c.label(&mut doc,"sec:a",None);
        assert_eq!(doc.attribute(refnode,"label"),Some(&Value::Ref{label:"sec:a".into(),target:Some(sec)}));
        assert_eq!(doc.node(sec).id.as_deref(),Some("sec:a"));
        assert_eq!(c.unresolved_refs().count(),0);
    }
}
