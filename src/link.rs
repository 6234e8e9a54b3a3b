//! Construcción de ejecutables.
//!
//! El código C emitido puede compilarse directamente a un ejecutable
//! nativo. Esta etapa se delega por completo a un compilador C externo,
//! que recibe el código fuente por su entrada estándar.

use std::{
    ffi::OsString,
    io::BufWriter,
    path::Path,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, info};

/// Compilador C utilizado si no se indica otro por `CC`.
pub const DEFAULT_COMPILER: &str = "cc";

bitflags! {
    /// Opciones a aplicar durante el enlazado.
    pub struct LinkOptions: u32 {
        /// Remover símbolos de depuración del ejecutable final.
        const STRIP = 0x01;
    }
}

/// Un error de compilación o enlazado.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LinkerError {
    /// Ocurrió un evento de error de E/S durante la invocación
    /// de comandos externos.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// El compilador inició su ejecución, pero falló.
    #[error("C compiler exited with status code {0:?}")]
    Failed(ExitStatus),
}

/// Instancia del compilador C para un ejecutable definido.
pub struct Linker {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

impl Linker {
    /// Inicia una instancia del compilador.
    ///
    /// El compilador tratará de emitir un ejecutable y escribirlo a
    /// la ruta indicada por `output`. Se usa el comando de la variable
    /// de entorno `CC` si existe.
    pub fn spawn<O>(output: &O, opts: LinkOptions) -> Result<Self, LinkerError>
    where
        O: AsRef<Path>,
    {
        let compiler = std::env::var_os("CC").unwrap_or_else(|| DEFAULT_COMPILER.into());
        let args = arguments(output.as_ref(), opts);
        debug!(compiler = ?compiler, args = ?args, "spawning C compiler");

        let mut child = Command::new(&compiler)
            .args(&args)
            .stdin(Stdio::piped())
            .spawn()?;

        let stdin = match child.stdin.take() {
            Some(stdin) => BufWriter::new(stdin),
            None => {
                if let Err(error) = child.kill() {
                    debug!(%error, "failed to kill C compiler without stdin");
                }

                return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
            }
        };

        Ok(Linker { child, stdin })
    }

    /// Obtiene la entrada estándar del proceso que espera recibir código C.
    pub fn stdin(&mut self) -> &mut BufWriter<ChildStdin> {
        &mut self.stdin
    }

    /// Indica el fin del flujo de código y finaliza la compilación.
    pub fn finish(mut self) -> Result<(), LinkerError> {
        drop(self.stdin);

        let status = self.child.wait()?;
        if status.success() {
            info!("executable generated");
            Ok(())
        } else {
            Err(LinkerError::Failed(status))
        }
    }
}

/// Argumentos de línea de comandos para el compilador.
fn arguments(output: &Path, opts: LinkOptions) -> Vec<OsString> {
    // Entrada en C por stdin
    let mut args: Vec<OsString> = vec!["-x".into(), "c".into(), "-".into(), "-o".into()];
    args.push(output.as_os_str().to_owned());

    if opts.contains(LinkOptions::STRIP) {
        args.push("-s".into());
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compiler_arguments() {
        let plain = arguments(Path::new("suma"), LinkOptions::empty());
        assert_eq!(plain, vec!["-x", "c", "-", "-o", "suma"]);

        let stripped = arguments(Path::new("out/suma"), LinkOptions::STRIP);
        assert_eq!(stripped, vec!["-x", "c", "-", "-o", "out/suma", "-s"]);
    }
}
