#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use ansi_term::Color::{Blue, Green, Red, White, Yellow};
use clap::Parser;
use log::{error, info, Level, LevelFilter};
use path_dedot::ParseDot;
use tex_dom::prelude::*;

#[derive(Parser,Debug)]
#[command(author, version, about, long_about = None)]
struct Parameters {
    /// Input file (tex)
    input: Option<PathBuf>,

    /// Input string (tex), used if no input file is given
    #[arg(short, long)]
    text: Option<String>,

    /// Output file; the tree is printed to stdout otherwise
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the reconstructed source instead of the node tree
    #[arg(short, long, default_value_t = false)]
    source: bool,

    /// Additional directories to search for input files
    #[arg(short = 'I', long)]
    texinputs: Vec<PathBuf>,

    /// The value of \jobname
    #[arg(short, long)]
    jobname: Option<String>,

    /// Load the TeX sources of packages without a built-in implementation
    #[arg(short, long, default_value_t = false)]
    load_packages: bool,

    /// Do not warn about unrecognized commands
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// verbose (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbosity:u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder().filter_level(level).format(|buf,record| {
        let level = match record.level() {
            Level::Error => Red.paint("ERROR"),
            Level::Warn => Yellow.paint("WARN "),
            Level::Info => Green.paint("INFO "),
            Level::Debug => Blue.paint("DEBUG"),
            Level::Trace => White.paint("TRACE")
        };
        writeln!(buf,"{} {} [{}] {}",chrono::Local::now().format("%H:%M:%S%.3f"),level,record.target(),record.args())
    }).init();
}

fn parse(engine:&mut Engine,params:&Parameters) -> Result<Option<Document>,String> {
    match (&params.input,&params.text) {
        (Some(path),_) => {
            let path = path.parse_dot().map_err(|e| format!("{}: {}",path.display(),e))?;
            info!(target:"texdom","Parsing {}",path.display());
            engine.parse_file(&path).map(Some).map_err(|e| e.to_string())
        }
        (None,Some(text)) => engine.parse_string(text).map(Some).map_err(|e| e.to_string()),
        (None,None) => Ok(None)
    }
}

fn write_output(out:&str,path:Option<&Path>) -> std::io::Result<()> {
    match path {
        Some(p) => std::fs::write(p,out),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout,"{}",out)
        }
    }
}

fn main() -> ExitCode {
    let params = Parameters::parse();
    init_logger(params.verbose);
    let start = std::time::Instant::now();
    let config = EngineConfig {
        texinputs:params.texinputs.clone(),
        jobname:params.jobname.clone(),
        warn_on_unrecognized:!params.quiet,
        load_tex_packages:params.load_packages,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config);
    let doc = match parse(&mut engine,&params) {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            error!(target:"texdom","No input given; see --help");
            return ExitCode::FAILURE
        }
        Err(e) => {
            error!(target:"texdom","{}",e);
            return ExitCode::FAILURE
        }
    };
    let out = if params.source {
        doc.source(doc.root())
    } else {
        doc.display(doc.root()).to_string()
    };
    if let Err(e) = write_output(&out,params.output.as_deref()) {
        error!(target:"texdom","Error writing output: {}",e);
        return ExitCode::FAILURE
    }
    info!(target:"texdom","Finished after {:?}",start.elapsed());
    ExitCode::SUCCESS
}
