use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use tacbasic::bytecode::disasm::print_bc;
use tacbasic::frontend::parser::parse_program;
use tacbasic::frontend::token_dumper::TokenDumper;
use tacbasic::tac::image;
use tacbasic::{Artifact, AsmConfig, AsmSyntax, Error, Result, StdConsole, VmBcConfig};

#[derive(Parser)]
#[command(name = "tacbasic", version, about = "Line-numbered BASIC to bytecode or x86 assembly")]
struct Cli {
    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the scanner's tokens
    Tokens {
        file: PathBuf,
        #[arg(long)]
        no_color: bool,
        #[arg(long)]
        pretty: bool,
    },
    /// Show the parsed program
    Ast { file: PathBuf },
    /// Show the three-address code
    Tac {
        file: PathBuf,
        /// Also save a loadable TAC image
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Write a bytecode artifact
    Build {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Disassemble a bytecode artifact or a source file
    Disasm { file: PathBuf },
    /// Run a program
    Run {
        file: PathBuf,
        /// Use the TAC interpreter instead of the bytecode VM
        #[arg(long)]
        tac: bool,
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// Write x86 assembly
    Asm {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Syntax::Gas)]
        syntax: Syntax,
        #[arg(long, default_value = "")]
        symbol_prefix: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Syntax {
    Gas,
    Nasm,
}

impl From<Syntax> for AsmSyntax {
    fn from(syntax: Syntax) -> Self {
        match syntax {
            Syntax::Gas => AsmSyntax::Gas,
            Syntax::Nasm => AsmSyntax::Nasm,
        }
    }
}

const SOURCE: &str = "bas";
const BYTECODE: &str = "bac";
const TAC_IMAGE: &str = "tacb";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Tokens {
            file,
            no_color,
            pretty,
        } => {
            let source = read_source(&file)?;
            let mut dumper = TokenDumper::new();
            if no_color {
                dumper = dumper.no_color();
            }
            if pretty {
                dumper = dumper.pretty();
            }
            dumper.dump(&source);
        }
        Command::Ast { file } => {
            let program = parse_program(&read_source(&file)?)?;
            println!("{:#?}", program);
        }
        Command::Tac { file, image: out } => {
            let tac = tacbasic::compile_to_tac(&read_source(&file)?)?;
            print!("{}", tac);
            if let Some(out) = out {
                image::save(&tac, &out)?;
            }
        }
        Command::Build { file, output } => {
            let artifact = tacbasic::compile_to_bytecode(&read_source(&file)?)?;
            let output = output.unwrap_or_else(|| file.with_extension(BYTECODE));
            artifact.write_to(&output)?;
        }
        Command::Disasm { file } => {
            let artifact = if has_extension(&file, BYTECODE) {
                Artifact::read_from(&file)?
            } else {
                tacbasic::compile_to_bytecode(&read_source(&file)?)?
            };
            print_bc(&artifact);
        }
        Command::Run {
            file,
            tac,
            max_steps,
        } => {
            let config = VmBcConfig {
                max_steps,
                ..VmBcConfig::default()
            };
            run_file(&file, tac, config)?;
        }
        Command::Asm {
            file,
            output,
            syntax,
            symbol_prefix,
        } => {
            let config = AsmConfig {
                syntax: syntax.into(),
                symbol_prefix,
            };
            let text = tacbasic::compile_to_asm(&read_source(&file)?, &config)?;
            match output {
                Some(output) => fs::write(output, text)?,
                None => print!("{}", text),
            }
        }
    }
    Ok(())
}

fn run_file(file: &Path, tac: bool, config: VmBcConfig) -> Result<()> {
    let mut console = StdConsole::new();

    if has_extension(file, TAC_IMAGE) {
        let program = image::load(file)?;
        return tacbasic::run_tac(&program, &mut console, config);
    }
    if has_extension(file, BYTECODE) {
        if tac {
            return Err(Error::Usage(format!(
                "--tac needs a .{} or .{} file, got {}",
                SOURCE,
                TAC_IMAGE,
                file.display()
            )));
        }
        let artifact = Artifact::read_from(file)?;
        return tacbasic::run_bytecode(&artifact, &mut console, config);
    }

    let source = read_source(file)?;
    if tac {
        let program = tacbasic::compile_to_tac(&source)?;
        tacbasic::run_tac(&program, &mut console, config)
    } else {
        let artifact = tacbasic::compile_to_bytecode(&source)?;
        tacbasic::run_bytecode(&artifact, &mut console, config)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn ensure_extension(path: &Path, ext: &str) -> Result<()> {
    if has_extension(path, ext) {
        Ok(())
    } else {
        Err(Error::Usage(format!(
            "expected a .{} file, got {}",
            ext,
            path.display()
        )))
    }
}

fn read_source(path: &Path) -> Result<String> {
    ensure_extension(path, SOURCE)?;
    Ok(fs::read_to_string(path)?)
}
