//! Recorrido común de generación de código.
//!
//! Los ámbitos se emiten en un orden fijo: primero cada función en orden
//! de definición y al final el punto de entrada. Dentro de cada ámbito,
//! el flujo plano de sentencias se despacha a un [`Emitter`]. Este
//! recorrido lleva su propia pila de bloques abiertos, de forma que un
//! cierre sin apertura se ignora y un bloque que quedó abierto se cierra
//! al terminar su ámbito. Así ningún lenguaje objetivo recibe bloques
//! desbalanceados, aun cuando el código fuente tenga errores.

use crate::{
    backend::{Backend, Emitter},
    classify::Shape,
    ir::{Program, ScopeId, Statement},
    semantic::Tables,
};

use std::io::{self, Write};
use tracing::{debug, trace};

pub mod expr;

/// Parámetros de emisión.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Tamaño de los búferes de texto en C, incluyendo el terminador.
    pub buffer_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { buffer_size: 256 }
    }
}

/// Estado compartido de emisión que todo [`Emitter`] guarda tal cual.
pub struct Context<'a> {
    output: &'a mut dyn Write,
    program: &'a Program,
    tables: &'a Tables,
    options: &'a Options,
    depth: usize,
}

impl<'a> Context<'a> {
    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn tables(&self) -> &'a Tables {
        self.tables
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    /// Escribe la sangría del nivel actual.
    pub fn indent(&mut self) -> io::Result<()> {
        write!(self.output, "{:width$}", "", width = self.depth * 4)
    }

    pub fn nest(&mut self) {
        self.depth += 1;
    }

    pub fn unnest(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Emite un programa completo en el lenguaje objetivo dado.
pub fn emit(
    program: &Program,
    backend: Backend,
    options: &Options,
    output: &mut dyn Write,
) -> io::Result<()> {
    let tables = Tables::scan(program);
    let cx = Context {
        output,
        program,
        tables: &tables,
        options,
        depth: 0,
    };

    debug!(%backend, functions = program.functions.len(), "emitting program");
    dispatch_backend!(E: backend => walk::<E<'_>>(cx))
}

fn walk<'a, E: Emitter<'a>>(cx: Context<'a>) -> io::Result<()> {
    let program = cx.program;
    let mut emitter = E::new(cx)?;

    let functions = program
        .functions
        .iter()
        .enumerate()
        .map(|(index, function)| (ScopeId::Function(index), function.body.as_slice()));

    let main = std::iter::once((ScopeId::Main, program.main.as_slice()));

    for (scope, statements) in functions.chain(main) {
        emitter.begin_scope(scope)?;
        body(&mut emitter, statements)?;
        emitter.end_scope(scope)?;
    }

    emitter.finish()
}

/// Bloque abierto durante el recorrido de un ámbito.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Block {
    If,
    While,
    For,
    Repeat,
}

fn body<'a, E: Emitter<'a>>(emitter: &mut E, statements: &[Statement]) -> io::Result<()> {
    let mut open = Vec::new();

    for statement in statements {
        trace!(line = statement.line, text = %statement.text, "emitting statement");

        match &statement.shape {
            Shape::Declare { ty, name, size } => {
                emitter.declare(statement, *ty, name, size.as_deref())?
            }

            Shape::Read { target } => emitter.read(statement, target)?,
            Shape::Write { arguments } => emitter.write(statement, &expr::segments(arguments))?,
            Shape::Assign { target, value } => emitter.assign(statement, target, value)?,
            Shape::Call { name, arguments } => emitter.call(statement, name, arguments)?,
            Shape::Return { value } => emitter.ret(statement, value.as_deref())?,

            Shape::If { condition } => {
                emitter.open_if(statement, condition)?;
                open.push(Block::If);
            }

            Shape::Else => {
                if open.last() == Some(&Block::If) {
                    emitter.otherwise()?;
                }
            }

            Shape::While { condition } => {
                emitter.open_while(statement, condition)?;
                open.push(Block::While);
            }

            Shape::For {
                counter,
                start,
                end,
            } => {
                emitter.open_for(statement, counter, start, end)?;
                open.push(Block::For);
            }

            Shape::Repeat => {
                emitter.open_repeat(statement)?;
                open.push(Block::Repeat);
            }

            Shape::EndIf => close(emitter, &mut open, Block::If, None)?,
            Shape::EndWhile => close(emitter, &mut open, Block::While, None)?,
            Shape::EndFor => close(emitter, &mut open, Block::For, None)?,
            Shape::Until { condition } => {
                close(emitter, &mut open, Block::Repeat, Some(condition))?
            }

            Shape::Unknown => emitter.opaque(statement)?,

            // Estructura de ámbitos, ya resuelta por el parser
            Shape::FunctionHeader { .. }
            | Shape::MalformedHeader { .. }
            | Shape::MainStart
            | Shape::End
            | Shape::Then => (),
        }
    }

    while let Some(block) = open.pop() {
        close_block(emitter, block, None)?;
    }

    Ok(())
}

/// Cierra el bloque más interno de un tipo, junto con cualquier bloque
/// abierto encima de él. Si no existe tal bloque, el cierre se ignora.
fn close<'a, E: Emitter<'a>>(
    emitter: &mut E,
    open: &mut Vec<Block>,
    kind: Block,
    condition: Option<&str>,
) -> io::Result<()> {
    let position = match open.iter().rposition(|&block| block == kind) {
        Some(position) => position,
        None => return Ok(()),
    };

    while open.len() > position + 1 {
        if let Some(block) = open.pop() {
            close_block(emitter, block, None)?;
        }
    }

    open.pop();
    close_block(emitter, kind, condition)
}

fn close_block<'a, E: Emitter<'a>>(
    emitter: &mut E,
    block: Block,
    condition: Option<&str>,
) -> io::Result<()> {
    match block {
        Block::If => emitter.close_if(),
        Block::While => emitter.close_while(),
        Block::For => emitter.close_for(),

        // Un `repetir` sin `hasta` se ejecuta una única vez
        Block::Repeat => emitter.close_repeat(condition.unwrap_or("1")),
    }
}
