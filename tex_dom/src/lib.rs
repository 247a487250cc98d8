/*! An interpreter for TeX/LaTeX sources that produces a tree of semantic nodes instead of pages.

The crate is organized like a TeX engine: characters are turned into [`Token`](tex::tokens::Token)s by
the [`Mouth`](engine::mouth::Mouth) according to the current [`CategoryTable`](tex::catcodes::CategoryTable),
control sequences are resolved in the scoped [`Context`](engine::state::Context) to
[`TeXCommand`](commands::TeXCommand)s, and the [`Engine`](engine::Engine) expands or digests them into
a [`Document`](tex::nodes::Document).

# Example
```rust
use tex_dom::engine::Engine;
let mut engine = Engine::default();
let doc = engine.parse_string(r"\def\hello#1{Hello, #1!}\hello{World}").unwrap();
assert_eq!(doc.text_content(doc.root()),"Hello, World!");
```
*/
#![forbid(unsafe_code)]

pub mod utils;
pub mod tex;
pub mod engine;
pub mod commands;

#[doc(hidden)]
pub mod tests;

pub mod prelude {
    pub use crate::tex::catcodes::{CategoryCode,CategoryTable};
    pub use crate::tex::tokens::{Token,SourceRef};
    pub use crate::tex::nodes::{Document,NodeId,NodeLevel};
    pub use crate::engine::{Engine,EngineConfig};
    pub use crate::utils::errors::{TeXError,TeXResult,ErrorKind};
}
