/*! Methods for registering primitives */
use crate::commands::{ElementSpec, PrimitiveCommand, TeXCommand};
use crate::engine::Engine;
use crate::tex::nodes::NodeId;
use crate::tex::tokens::Token;
use crate::utils::errors::TeXResult;
use crate::utils::Ptr;

/// Registers an expandable primitive: `f` returns the tokens that replace it.
pub fn register_expandable(engine:&mut Engine,name:&'static str,f:fn(&mut Engine,&Token) -> TeXResult<Vec<Token>>) {
    register(engine,name,PrimitiveCommand::Expandable(f))
}

/// Registers a conditional: `f` reads the operands and decides which branch is taken.
pub fn register_conditional(engine:&mut Engine,name:&'static str,f:fn(&mut Engine,&Token) -> TeXResult<bool>) {
    register(engine,name,PrimitiveCommand::Conditional(f))
}

/// Registers a primitive that changes the state of the engine.
pub fn register_unexpandable(engine:&mut Engine,name:&'static str,f:fn(&mut Engine,&Token) -> TeXResult<()>) {
    register(engine,name,PrimitiveCommand::Unexpandable(f))
}

/// Registers a primitive that (possibly) produces a node.
pub fn register_node(engine:&mut Engine,name:&'static str,f:fn(&mut Engine,&Token) -> TeXResult<Option<NodeId>>) {
    register(engine,name,PrimitiveCommand::Node(f))
}

/// Registers an expandable primitive without any effect, like `\fi`.
pub fn register_noop(engine:&mut Engine,name:&'static str) {
    register_expandable(engine,name,|_,_| Ok(Vec::new()))
}

/// Registers an [`ElementSpec`] under its name; environments are looked up by `\begin` under
/// the same name.
pub fn register_element(engine:&mut Engine,spec:ElementSpec) {
    let name = spec.name.clone();
    engine.state.set_command(name,TeXCommand::Element(Ptr::new(spec)),true)
}

fn register(engine:&mut Engine,name:&'static str,cmd:PrimitiveCommand) {
    engine.state.set_command(name,TeXCommand::Primitive{name,cmd},true)
}

/// Registers a [`COMMAND`](crate::tex::nodes::NodeLevel::COMMAND) level element for each `(name,args)` pair.
pub fn register_elements(engine:&mut Engine,specs:&[(&str,&str)]) {
    for (name,args) in specs {
        register_element(engine,ElementSpec::new(name,args))
    }
}
