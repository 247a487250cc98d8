/*! Loading packages and document classes.

`\usepackage`, `\RequirePackage` and `\documentclass` first ask the engine's [`PackageResolver`]
for a native implementation; if there is none and
[`load_tex_packages`](crate::engine::EngineConfig::load_tex_packages) is set, the `.sty`/`.cls`
file is searched and interpreted like any other input, with `@` as a letter.
*/

use log::{debug, info, warn};
use crate::engine::Engine;
use crate::tex::catcodes::CategoryCode;
use crate::tex::tokens::Token;
use crate::utils::errors::TeXResult;

/// Whether a package or a document class is requested.
#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum PackageKind { Package, Class }
impl PackageKind {
    pub fn extension(&self) -> &'static str {
        match self { PackageKind::Package => "sty", PackageKind::Class => "cls" }
    }
}

/// Provides native implementations of packages and classes.
pub trait PackageResolver {
    /// Loads `name` into `engine`; returns `false` if this resolver does not know `name`.
    fn load(&self,engine:&mut Engine,name:&str,kind:PackageKind,options:&[String]) -> TeXResult<bool>;
}

/// The standard classes `article`, `report` and `book`. Packages are left to their TeX sources.
#[derive(Copy,Clone,Debug,Default)]
pub struct BuiltinPackages;

impl PackageResolver for BuiltinPackages {
    fn load(&self,engine:&mut Engine,name:&str,kind:PackageKind,_options:&[String]) -> TeXResult<bool> {
        if kind != PackageKind::Class { return Ok(false) }
        let chapters = match name {
            "article" => false,
            "report" | "book" => true,
            _ => return Ok(false)
        };
        let state = &mut engine.state;
        state.new_counter("part",None,0);
        state.set_counter_format("part","${part.Roman}");
        let top = if chapters {
            state.new_counter("chapter",None,0);
            state.new_counter("section",Some("chapter"),0);
            state.set_counter_format("section","${thechapter}.${section}");
            state.new_counter("figure",Some("chapter"),0);
            state.set_counter_format("figure","${thechapter}.${figure}");
            state.new_counter("table",Some("chapter"),0);
            state.set_counter_format("table","${thechapter}.${table}");
            state.new_counter("equation",Some("chapter"),0);
            state.set_counter_format("equation","${thechapter}.${equation}");
            "chapter"
        } else {
            state.new_counter("section",None,0);
            state.new_counter("figure",None,0);
            state.new_counter("table",None,0);
            state.new_counter("equation",None,0);
            "section"
        };
        for (c,parent) in [("subsection","section"),("subsubsection","subsection"),
                           ("paragraph","subsubsection"),("subparagraph","paragraph"),
                           ("subsubparagraph","subparagraph")] {
            state.new_counter(c,Some(parent),0);
            state.set_counter_format(c,&format!("${{the{}}}.${{{}}}",parent,c));
        }
        state.new_counter("footnote",Some(top),0);
        debug!(target:"packages","Loaded document class {}",name);
        Ok(true)
    }
}

impl Engine {
    /// Loads each of `names` unless it is loaded already; see the [module documentation](self).
    pub fn load_packages(&mut self,names:&[String],kind:PackageKind,options:&[String]) -> TeXResult<()> {
        for name in names {
            let name = name.trim();
            if name.is_empty() { continue }
            if self.state.packages.contains_key(name) {
                debug!(target:"packages","{} already loaded",name);
                continue
            }
            self.state.packages.insert(name.to_string(),options.to_vec());
            let resolver = self.aux.packages.clone();
            if resolver.load(self,name,kind,options)? { continue }
            if !self.config.load_tex_packages {
                info!(target:"packages","No implementation of {} {}; skipping",
                    if kind == PackageKind::Class {"class"} else {"package"},name);
                continue
            }
            let current = self.mouth.current_file();
            let Some(path) = self.aux.filesystem.find(name,kind.extension(),current.as_deref()) else {
                warn!(target:"packages","File {}.{} not found",name,kind.extension());
                continue
            };
            let content = match self.aux.filesystem.read(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(target:"packages","Could not read {}: {}",path.display(),e);
                    continue
                }
            };
            self.load_tex_source(&content,&path.display().to_string())?
        }
        Ok(())
    }

    /// Interprets `content` with `@` as a letter, discarding the nodes it produces.
    fn load_tex_source(&mut self,content:&str,file:&str) -> TeXResult<()> {
        info!(target:"packages","Loading {}",file);
        let at = self.state.which_code('@');
        self.state.set_catcode('@',CategoryCode::Letter,false);
        self.mouth.push_tokens(vec!(Token::end_tokens("package")));
        self.mouth.push_string(content,file);
        let frag = self.doc.create_fragment();
        let old = self.state.current_label;
        let r = self.digest_until_marker(frag,"package");
        self.state.current_label = old;
        self.state.set_catcode('@',at,false);
        r
    }
}
