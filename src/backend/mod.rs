//! Lenguajes objetivo.
//!
//! Cada submódulo implementa [`Emitter`] para un lenguaje. El recorrido
//! del programa es común y vive en [`crate::codegen`]; aquí solo se
//! decide cómo se escribe cada sentencia. En general, debe utilizarse
//! la macro `dispatch_backend!()` para acceder a estas implementaciones.

use crate::{
    classify::Type,
    codegen::{expr::Segment, Context},
    ir::{ScopeId, Statement},
};

use std::{fmt, io, str::FromStr};

/// Lenguaje objetivo de emisión.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Código C compilable.
    C,

    /// Módulo JavaScript instrumentado para ejecución paso a paso.
    Js,
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, ()> {
        match name {
            "c" => Ok(Backend::C),
            "js" => Ok(Backend::Js),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::C => fmt.write_str("c"),
            Backend::Js => fmt.write_str("js"),
        }
    }
}

mod c;
mod js;

pub use c::Emitter as C;
pub use js::Emitter as Js;

/// Emisión de código para un lenguaje objetivo.
///
/// El recorrido garantiza que los bloques llegan balanceados: cada
/// apertura recibe exactamente un cierre dentro del mismo ámbito, y
/// `otherwise()` solo ocurre dentro de un `si` abierto.
pub trait Emitter<'a>: Sized {
    /// Construir a partir de un contexto de emisión.
    ///
    /// Además de construirse, el preámbulo del archivo debe emitirse aquí.
    fn new(cx: Context<'a>) -> io::Result<Self>;

    /// Termina el archivo de salida.
    fn finish(self) -> io::Result<()>;

    /// Abre la definición de una función o del punto de entrada.
    fn begin_scope(&mut self, scope: ScopeId) -> io::Result<()>;

    /// Cierra el ámbito abierto por `begin_scope()`.
    fn end_scope(&mut self, scope: ScopeId) -> io::Result<()>;

    fn declare(
        &mut self,
        at: &Statement,
        ty: Type,
        name: &str,
        size: Option<&str>,
    ) -> io::Result<()>;

    fn read(&mut self, at: &Statement, target: &str) -> io::Result<()>;

    fn write(&mut self, at: &Statement, segments: &[Segment]) -> io::Result<()>;

    fn assign(&mut self, at: &Statement, target: &str, value: &str) -> io::Result<()>;

    /// Invocar una función como sentencia, descartando su resultado.
    fn call(&mut self, at: &Statement, name: &str, arguments: &str) -> io::Result<()>;

    fn ret(&mut self, at: &Statement, value: Option<&str>) -> io::Result<()>;

    /// Sentencia no reconocida, que pasa tal cual al lenguaje objetivo.
    fn opaque(&mut self, at: &Statement) -> io::Result<()>;

    fn open_if(&mut self, at: &Statement, condition: &str) -> io::Result<()>;

    fn otherwise(&mut self) -> io::Result<()>;

    fn close_if(&mut self) -> io::Result<()>;

    fn open_while(&mut self, at: &Statement, condition: &str) -> io::Result<()>;

    fn close_while(&mut self) -> io::Result<()>;

    fn open_for(&mut self, at: &Statement, counter: &str, start: &str, end: &str)
        -> io::Result<()>;

    fn close_for(&mut self) -> io::Result<()>;

    fn open_repeat(&mut self, at: &Statement) -> io::Result<()>;

    /// Cierra un ciclo `repetir`, que termina cuando `condition` es cierta.
    fn close_repeat(&mut self, condition: &str) -> io::Result<()>;
}
