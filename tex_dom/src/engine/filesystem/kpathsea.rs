/*! A small subset of kpathsea, the path searching library used by TeX.

The search path is made of the directory of the file currently being read, the directories
given in [`EngineConfig::texinputs`](crate::engine::EngineConfig::texinputs), and the entries of
the `TEXINPUTS` environment variable. As in kpathsea, an entry ending in `//` is searched
recursively, and an empty entry (e.g. a trailing `:`) stands for the working directory.

```rust
use tex_dom::engine::filesystem::kpathsea::Kpathsea;
let kpse = Kpathsea::new(std::env::current_dir().unwrap(),&[]);
// the extension is optional:
assert!(kpse.which("Cargo","toml").is_some());
assert!(kpse.which("Cargo.toml","toml").is_some());
```
*/

use std::path::{Path, PathBuf};
use log::debug;
use path_dedot::ParseDot;
use walkdir::WalkDir;

/// A search path; see the [module documentation](self).
#[derive(Clone,Debug)]
pub struct Kpathsea {
    pub pwd:PathBuf,
    dirs:Vec<PathBuf>
}

impl Kpathsea {
    /// Creates the search path for the working directory `pwd` and the additional directories `extra`.
    pub fn new(pwd:PathBuf,extra:&[PathBuf]) -> Kpathsea {
        let mut dirs = Vec::new();
        for e in extra {
            let p = if e.is_absolute() { e.clone() } else { pwd.join(e) };
            Self::add(&mut dirs,p,false)
        }
        if let Ok(var) = std::env::var("TEXINPUTS") {
            for entry in std::env::split_paths(&var) {
                let s = entry.to_string_lossy().to_string();
                if s.is_empty() {
                    Self::add(&mut dirs,pwd.clone(),false);
                    continue
                }
                let (s,recurse) = match s.strip_suffix("//") {
                    Some(s) => (s.to_string(),true),
                    None => (s,false)
                };
                let p = PathBuf::from(s);
                let p = if p.is_absolute() { p } else { pwd.join(p) };
                Self::add(&mut dirs,p,recurse)
            }
        }
        debug!(target:"files","Search path: {} directories",dirs.len());
        Kpathsea { pwd, dirs }
    }

    fn add(dirs:&mut Vec<PathBuf>,path:PathBuf,recurse:bool) {
        if !path.is_dir() { return }
        if recurse {
            for entry in WalkDir::new(&path).follow_links(true).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_dir() && !entry.path().ends_with(".git") {
                    let p = entry.path().to_path_buf();
                    if !dirs.contains(&p) { dirs.push(p) }
                }
            }
        } else if !dirs.contains(&path) {
            dirs.push(path)
        }
    }

    /// Finds `name` (with extension `ext` appended, if it has none and `ext` is not empty)
    /// relative to `current` (the directory of the file being read), the working directory, or
    /// the search path.
    pub fn which_in(&self,name:&str,ext:&str,current:Option<&Path>) -> Option<PathBuf> {
        let name = name.trim();
        if name.is_empty() { return None }
        let candidates:Vec<String> = if ext.is_empty() || Path::new(name).extension().is_some() {
            vec!(name.to_string(),format!("{}.{}",name,ext))
        } else {
            vec!(format!("{}.{}",name,ext),name.to_string())
        };
        let pb = PathBuf::from(name);
        if pb.is_absolute() {
            return candidates.iter().map(PathBuf::from).find(|p| p.is_file())
        }
        let roots = current.into_iter().map(|p| p.to_path_buf())
            .chain(std::iter::once(self.pwd.clone()))
            .chain(self.dirs.iter().cloned());
        for root in roots {
            for c in &candidates {
                let p = root.join(c);
                if p.is_file() {
                    let p = p.parse_dot().map(|p| p.to_path_buf()).unwrap_or(p);
                    debug!(target:"files","Found {}",p.display());
                    return Some(p)
                }
            }
        }
        None
    }
    /// [`which_in`](Self::which_in) without a current directory.
    pub fn which(&self,name:&str,ext:&str) -> Option<PathBuf> {
        self.which_in(name,ext,None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_relative_files() {
        let dir = std::env::temp_dir().join(format!("tex_dom_kpse_{}",std::process::id()));
        let sub = dir.join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("chapter.tex"),"x").unwrap();
        let kpse = Kpathsea::new(dir.clone(),&[PathBuf::from("sub")]);
        assert_eq!(kpse.which("chapter","tex"),Some(sub.join("chapter.tex")));
        assert_eq!(kpse.which("chapter.tex","tex"),Some(sub.join("chapter.tex")));
        assert_eq!(kpse.which("nothing","tex"),None);
        assert_eq!(kpse.which_in("chapter","tex",Some(&sub)),Some(sub.join("chapter.tex")));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
