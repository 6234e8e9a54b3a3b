//! Compilador de pseudocódigo en español.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente, descrito
//! en [`source`]. El análisis es orientado a líneas: cada línea se
//! reconoce de forma aislada en [`classify`] y luego el parser de
//! estructura en [`parse`] valida sangría y anidamiento de bloques,
//! construyendo el modelo de programa de [`ir`] y acumulando
//! diagnósticos ([`error`]). Los diagnósticos nunca detienen el análisis:
//! siempre se obtiene un modelo, aunque sea parcial.
//!
//! # Back end
//! A partir del modelo se producen tres artefactos independientes:
//! código C compilable, un módulo JavaScript instrumentado para
//! ejecución paso a paso (que depende de las tablas de variables de
//! [`semantic`]) y un diagrama de flujo del cuerpo principal en [`flow`].
//! Los dos primeros se emiten por medio de [`target`]. El código C puede
//! además compilarse a un ejecutable nativo en [`link`].
//!
//! Todas las salidas son deterministas: la misma entrada produce
//! exactamente el mismo texto.

#[macro_use]
mod macros;

pub mod classify;
pub mod error;
pub mod flow;
pub mod ir;
pub mod link;
pub mod parse;
pub mod semantic;
pub mod source;

mod backend;
mod codegen;

use std::io::{self, Write};

/// Emisión de código.
///
/// Este módulo reexporta suficientes ítems internos relacionados a
/// generación de código para traducir el modelo a algún lenguaje objetivo.
pub mod target {
    pub use crate::backend::Backend;
    pub use crate::codegen::expr::{segments, shift, Segment};
    pub use crate::codegen::{emit, Options};
}

/// Resultado completo del análisis de un archivo.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub program: ir::Program,
    pub diagnostics: error::Diagnostics,
    pub tables: semantic::Tables,
}

/// Analiza un archivo de código fuente.
pub fn analyze(source: &source::Source) -> Analysis {
    let (program, diagnostics) = parse::parse(source);
    let tables = semantic::Tables::scan(&program);

    Analysis {
        program,
        diagnostics,
        tables,
    }
}

impl Analysis {
    /// Emite el programa en un lenguaje objetivo.
    pub fn emit(
        &self,
        backend: target::Backend,
        options: &target::Options,
        output: &mut dyn Write,
    ) -> io::Result<()> {
        target::emit(&self.program, backend, options, output)
    }

    /// Emite el programa a un `String`.
    pub fn emit_to_string(
        &self,
        backend: target::Backend,
        options: &target::Options,
    ) -> io::Result<String> {
        let mut output = Vec::new();
        self.emit(backend, options, &mut output)?;

        String::from_utf8(output).map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
    }

    /// Diagrama de flujo del cuerpo principal.
    pub fn flow(&self) -> flow::FlowGraph {
        flow::build(&self.program.main)
    }
}
