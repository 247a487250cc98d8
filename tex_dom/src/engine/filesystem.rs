/*! Files: finding and reading input files, and the `\openout`/`\write` streams. */
pub mod kpathsea;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use crate::engine::filesystem::kpathsea::Kpathsea;
use crate::utils::HMap;

/// See the [module documentation](self).
#[derive(Debug)]
pub struct FileSystem {
    pub kpathsea:Kpathsea,
    /// Where `\openout` creates its files
    pub output_dir:PathBuf,
    outfiles:HMap<i64,BufWriter<File>>
}
impl FileSystem {
    pub fn new(pwd:PathBuf,texinputs:&[PathBuf],output_dir:Option<PathBuf>) -> Self {
        FileSystem {
            output_dir:output_dir.unwrap_or_else(|| pwd.clone()),
            kpathsea:Kpathsea::new(pwd,texinputs),
            outfiles:HMap::default()
        }
    }

    /// Finds `name` next to `current_file` (the file currently being read, if any), or in the search path.
    pub fn find(&self,name:&str,ext:&str,current_file:Option<&str>) -> Option<PathBuf> {
        let dir = current_file.filter(|f| !f.starts_with('<')).and_then(|f| Path::new(f).parent());
        self.kpathsea.which_in(name,ext,dir)
    }

    /// Reads a file. Line endings are normalized by the tokenizer.
    pub fn read(&self,path:&Path) -> std::io::Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// `\openout`: opens (and truncates) `name` in the output directory. Failures are reported as
    /// warnings; writes to the stream then go to the log.
    pub fn open_out(&mut self,stream:i64,name:&str) {
        let name = if Path::new(name).extension().is_some() { name.to_string() } else { format!("{}.tex",name) };
        let path = self.output_dir.join(name);
        self.close_out(stream);
        match File::create(&path) {
            Ok(f) => {
                debug!(target:"files","\\openout{} = {}",stream,path.display());
                self.outfiles.insert(stream,BufWriter::new(f));
            }
            Err(e) => warn!(target:"files","Could not open {} for writing: {}",path.display(),e)
        }
    }
    /// `\write`: writes a line to the stream; unopened streams go to the log.
    pub fn write(&mut self,stream:i64,line:&str) {
        match self.outfiles.get_mut(&stream) {
            Some(f) => if let Err(e) = writeln!(f,"{}",line) {
                warn!(target:"files","Error writing to stream {}: {}",stream,e)
            }
            None => info!(target:"files","{}",line)
        }
    }
    /// `\closeout`
    pub fn close_out(&mut self,stream:i64) {
        if let Some(mut f) = self.outfiles.remove(&stream) {
            if let Err(e) = f.flush() {
                warn!(target:"files","Error closing stream {}: {}",stream,e)
            }
        }
    }
    /// Closes all open streams.
    pub fn close_all(&mut self) {
        let streams:Vec<i64> = self.outfiles.keys().copied().collect();
        for s in streams { self.close_out(s) }
    }
}
impl Drop for FileSystem {
    fn drop(&mut self) { self.close_all() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_streams() {
        let dir = std::env::temp_dir().join(format!("tex_dom_fs_{}",std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut fs = FileSystem::new(dir.clone(),&[],None);
        fs.open_out(3,"out");
        fs.write(3,"first");
        fs.write(3,"second");
        fs.write(7,"to the log");
        fs.close_out(3);
        assert_eq!(std::fs::read_to_string(dir.join("out.tex")).unwrap(),"first\nsecond\n");
        assert_eq!(fs.find("out","tex",None),Some(dir.join("out.tex")));
        assert_eq!(fs.find("out","tex",Some("<string>")),Some(dir.join("out.tex")));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
