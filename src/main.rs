//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use bitflags::bitflags;
use clap::{self, crate_version, Arg, Command};
use pseudoc::{
    error::Severity,
    link::{LinkOptions, Linker},
    source::Source,
    target::{Backend, Options},
    Analysis,
};

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

bitflags! {
    /// Artefactos solicitados en la línea de comandos.
    struct Artifacts: u32 {
        const C = 0x01;
        const JS = 0x02;
        const FLOW = 0x04;
        const CHECK = 0x08;
    }
}

impl Artifacts {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "c" => Some(Artifacts::C),
            "js" => Some(Artifacts::JS),
            "flow" => Some(Artifacts::FLOW),
            "check" => Some(Artifacts::CHECK),
            _ => None,
        }
    }

    /// Artefactos de texto en orden de emisión, con su extensión de archivo.
    fn outputs(self) -> impl Iterator<Item = (Artifacts, &'static str)> {
        [
            (Artifacts::C, "c"),
            (Artifacts::JS, "js"),
            (Artifacts::FLOW, "mmd"),
        ]
        .into_iter()
        .filter(move |(artifact, _)| self.contains(*artifact))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parsing de CLI
    let args = Command::new("pseudoc")
        .version(crate_version!())
        .about("Compiles Spanish pseudocode to C, instrumented JavaScript and flowcharts")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("emit")
                .long("emit")
                .value_name("ARTIFACT")
                .takes_value(true)
                .multiple_occurrences(true)
                .possible_values(["c", "js", "flow", "check"])
                .help("Artifact to generate, may be repeated"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .takes_value(true)
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("buffer-size")
                .long("buffer-size")
                .value_name("BYTES")
                .takes_value(true)
                .default_value("256")
                .help("Size of C text buffers"),
        )
        .arg(
            Arg::new("compile")
                .short('c')
                .long("compile")
                .help("Build a native executable from the C output"),
        )
        .arg(Arg::new("strip").short('s').long("strip").help("Strip executables"))
        .get_matches();

    // Se extraen argumentos necesarios
    let input = args.value_of("input").unwrap_or("-");
    let output = args.value_of("output").unwrap_or("-");
    let compile = args.is_present("compile");

    let buffer_size: usize = args
        .value_of_t("buffer-size")
        .context("Invalid buffer size")?;

    if buffer_size < 2 {
        bail!("Buffer size must be at least 2 bytes");
    }

    let options = Options { buffer_size };

    let mut artifacts = Artifacts::empty();
    for name in args.values_of("emit").into_iter().flatten() {
        artifacts |= Artifacts::parse(name).context("clap allowed a bad artifact")?;
    }

    if artifacts.is_empty() && !compile {
        artifacts = Artifacts::C;
    }

    let source = read_source(input)?;
    let analysis = pseudoc::analyze(&source);
    let diagnostics = &analysis.diagnostics;

    info!(
        functions = analysis.program.functions.len(),
        diagnostics = diagnostics.len(),
        "analysis finished"
    );

    if artifacts.contains(Artifacts::CHECK) {
        eprint!("{}", diagnostics.report(&source));
    } else if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "source has diagnostics, run with --emit check");
    }

    if compile {
        if diagnostics.has_errors() {
            bail!("Refusing to build an executable from a program with errors");
        } else if output == "-" {
            bail!("Refusing to write executable to stdout");
        }

        let mut link_options = LinkOptions::empty();
        if args.is_present("strip") {
            link_options |= LinkOptions::STRIP;
        }

        let mut linker = Linker::spawn(&output, link_options).context("Failed to link")?;
        analysis
            .emit(Backend::C, &options, linker.stdin())
            .context("Failed to emit C code to compiler")?;

        linker
            .finish()
            .with_context(|| format!("Failed to generate executable: {}", output))?;
    } else {
        write_artifacts(&analysis, artifacts, &options, output)?;
    }

    if artifacts.contains(Artifacts::CHECK) && diagnostics.has_errors() {
        let errors = diagnostics.of(Severity::Error).count();
        bail!("Found {} error(s) in {}", errors, source.name());
    }

    Ok(())
}

fn read_source(input: &str) -> anyhow::Result<Source> {
    if input == "-" {
        Source::consume(io::stdin(), "<stdin>").context("Failed to read from stdin")
    } else {
        let file =
            File::open(input).with_context(|| format!("Failed to open for reading: {}", input))?;

        Source::consume(file, input).with_context(|| format!("Failed to read: {}", input))
    }
}

fn write_artifacts(
    analysis: &Analysis,
    artifacts: Artifacts,
    options: &Options,
    output: &str,
) -> anyhow::Result<()> {
    let several = artifacts.outputs().count() > 1;

    for (artifact, extension) in artifacts.outputs() {
        match output {
            // Salida a stdout, un artefacto tras otro
            "-" => {
                let stdout = io::stdout();
                let mut stdout = stdout.lock();
                write_artifact(analysis, artifact, options, &mut stdout)
                    .context("Failed to emit to stdout")?;
            }

            // Con varios artefactos, la ruta de salida es un prefijo
            path => {
                let path = if several {
                    Path::new(path).with_extension(extension)
                } else {
                    Path::new(path).to_path_buf()
                };

                let file = File::create(&path)
                    .with_context(|| format!("Failed to open for writing: {}", path.display()))?;

                let mut file = BufWriter::new(file);
                write_artifact(analysis, artifact, options, &mut file)
                    .and_then(|()| file.flush())
                    .with_context(|| format!("Failed to emit to file: {}", path.display()))?;
            }
        }
    }

    Ok(())
}

fn write_artifact(
    analysis: &Analysis,
    artifact: Artifacts,
    options: &Options,
    output: &mut dyn Write,
) -> io::Result<()> {
    if artifact == Artifacts::C {
        analysis.emit(Backend::C, options, output)
    } else if artifact == Artifacts::JS {
        analysis.emit(Backend::Js, options, output)
    } else {
        write!(output, "{}", analysis.flow())
    }
}
