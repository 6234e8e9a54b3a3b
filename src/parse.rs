//! Análisis estructural.
//!
//! # Máquina de estados
//! El parser recorre el código fuente línea por línea. Su estado consiste
//! en una pila de bloques abiertos, un nivel de indentación esperado, la
//! función activa (si la hay) y si se está dentro de la sección principal.
//! Cada línea se clasifica con [`classify()`] y, según su forma, abre un
//! bloque, lo cierra o simplemente se agrega al ámbito actual.
//!
//! # Indentación
//! Cada nivel equivale a [`INDENT_WIDTH`] espacios. `sino` y los cierres de
//! bloque se esperan un nivel por debajo del actual. `entonces` abre un
//! nivel adicional, por lo cual `finsi` retrocede dos niveles. Un tabulador
//! en la indentación siempre es un error.
//!
//! # Errores
//! El parser nunca falla. Toda condición anómala se reporta como un
//! diagnóstico y el análisis continúa, produciendo el mejor modelo parcial
//! posible.

use crate::{
    classify::{classify, Keyword, Shape},
    error::{Diagnostics, Severity},
    ir::{FunctionDefinition, Program, Statement},
    source::{Located, Source, SourceLine, Span, INDENT_WIDTH},
};

use thiserror::Error;
use tracing::{debug, trace};

/// Error o advertencia de análisis estructural.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Tabs are not allowed in indentation, use {} spaces per level", INDENT_WIDTH)]
    TabIndent,

    #[error("Expected an indentation of {expected} spaces, found {found}")]
    BadIndent { expected: usize, found: usize },

    #[error("Unrecognized statement")]
    UnknownStatement,

    #[error("Statement outside of any function or `inicio` section")]
    OutsideMain,

    #[error("Malformed function header, expected `funcion name(parameters)`")]
    MalformedHeader,

    #[error("Functions cannot be defined inside another block")]
    NestedFunction,

    #[error("`inicio` cannot appear inside another block")]
    NestedMain,

    #[error("Duplicate `inicio` section")]
    DuplicateMain,

    #[error("Entrypoint not found, add an `inicio` ... `fin` section")]
    MissingMain,

    #[error("`entonces` without a matching `si`")]
    StrayThen,

    #[error("Duplicate `entonces` for the same `si`")]
    DuplicateThen,

    #[error("`si` is missing its `entonces`")]
    MissingThen,

    #[error("`sino` without a matching `si`")]
    StrayElse,

    #[error("Duplicate `sino` for the same `si`")]
    DuplicateElse,

    #[error("`{found}` cannot close this block, expected `{expected}`")]
    Mismatched { found: Keyword, expected: Keyword },

    #[error("`{0}` does not close any open block")]
    UnexpectedCloser(Keyword),

    #[error("Unclosed `{opener}` block, expected `{closer}`")]
    Unclosed { opener: Keyword, closer: Keyword },
}

impl ParserError {
    pub fn severity(&self) -> Severity {
        match self {
            ParserError::UnknownStatement | ParserError::OutsideMain => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Resultado de un análisis estructural.
pub type Parse = (Program, Diagnostics);

/// Analiza un programa completo.
///
/// Siempre retorna un modelo, aún en presencia de errores.
pub fn parse(source: &Source) -> Parse {
    let mut parser = Parser::default();
    for line in source.lines() {
        parser.line(line);
    }

    parser.finish()
}

/// Clase de un bloque abierto.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BlockKind {
    Function,
    Main,
    If { then: bool, otherwise: bool },
    While,
    For,
    Repeat,
}

impl BlockKind {
    fn opener(self) -> Keyword {
        match self {
            BlockKind::Function => Keyword::Funcion,
            BlockKind::Main => Keyword::Inicio,
            BlockKind::If { .. } => Keyword::Si,
            BlockKind::While => Keyword::Mientras,
            BlockKind::For => Keyword::Para,
            BlockKind::Repeat => Keyword::Repetir,
        }
    }

    fn closer(self) -> Keyword {
        match self {
            BlockKind::Function | BlockKind::Main => Keyword::Fin,
            BlockKind::If { .. } => Keyword::Finsi,
            BlockKind::While => Keyword::Finmientras,
            BlockKind::For => Keyword::Finpara,
            BlockKind::Repeat => Keyword::Hasta,
        }
    }

    /// Niveles de indentación que abrió este bloque.
    fn width(self) -> usize {
        match self {
            BlockKind::If { then: true, .. } => 2,
            _ => 1,
        }
    }
}

struct BlockFrame {
    kind: BlockKind,
    span: Span,
}

#[derive(Default)]
struct Parser {
    program: Program,
    diagnostics: Diagnostics,
    stack: Vec<BlockFrame>,
    indent: usize,
    function: Option<usize>,
    in_main: bool,
    seen_main: bool,
}

impl Parser {
    fn line(&mut self, line: SourceLine<'_>) {
        let content = line.text.trim_start_matches(|c| c == ' ' || c == '\t');
        let leading = &line.text[..line.text.len() - content.len()];
        let content = content.trim_end();

        if content.is_empty() || content.starts_with("//") {
            return;
        }

        let start = line.offset + leading.len();
        let span = Span::new(start, start + content.len());
        let shape = classify(content);
        trace!(line = line.number, ?shape, "classified");

        let expected = match shape {
            Shape::Else
            | Shape::EndIf
            | Shape::EndWhile
            | Shape::EndFor
            | Shape::Until { .. }
            | Shape::End => self.indent.saturating_sub(1),

            _ => self.indent,
        };

        let indent_span = if leading.is_empty() {
            span
        } else {
            Span::new(line.offset, start)
        };

        self.check_indent(leading, expected, indent_span);

        let statement = Statement {
            text: content.to_owned(),
            line: line.number,
            span,
            shape,
        };

        self.statement(statement);
    }

    fn check_indent(&mut self, leading: &str, expected: usize, span: Span) {
        if leading.contains('\t') {
            self.fail(ParserError::TabIndent, span);
        } else if leading.len() != expected * INDENT_WIDTH {
            let error = ParserError::BadIndent {
                expected: expected * INDENT_WIDTH,
                found: leading.len(),
            };

            self.fail(error, span);
        }
    }

    fn statement(&mut self, statement: Statement) {
        let span = statement.span;

        match &statement.shape {
            Shape::FunctionHeader { name, parameters } => {
                let (name, parameters) = (name.clone(), parameters.clone());
                self.function_header(name, parameters, &statement);
            }

            Shape::MalformedHeader { name } => {
                self.fail(ParserError::MalformedHeader, span);

                let name = name.clone();
                self.function_header(name, Vec::new(), &statement);
            }

            Shape::MainStart => self.main_start(span),

            Shape::If { .. } => {
                self.append(statement);
                let kind = BlockKind::If {
                    then: false,
                    otherwise: false,
                };

                self.open(kind, span);
            }

            Shape::While { .. } => {
                self.append(statement);
                self.open(BlockKind::While, span);
            }

            Shape::For { .. } => {
                self.append(statement);
                self.open(BlockKind::For, span);
            }

            Shape::Repeat => {
                self.append(statement);
                self.open(BlockKind::Repeat, span);
            }

            Shape::Then => self.then(statement),
            Shape::Else => self.otherwise(statement),

            Shape::EndIf => self.close(Keyword::Finsi, statement),
            Shape::EndWhile => self.close(Keyword::Finmientras, statement),
            Shape::EndFor => self.close(Keyword::Finpara, statement),
            Shape::Until { .. } => self.close(Keyword::Hasta, statement),
            Shape::End => self.close(Keyword::Fin, statement),

            Shape::Unknown => {
                self.warn(ParserError::UnknownStatement, span);
                self.append(statement);
            }

            Shape::Declare { .. }
            | Shape::Read { .. }
            | Shape::Write { .. }
            | Shape::Assign { .. }
            | Shape::Return { .. }
            | Shape::Call { .. } => self.append(statement),
        }
    }

    fn function_header(&mut self, name: String, parameters: Vec<String>, header: &Statement) {
        if !self.stack.is_empty() {
            self.fail(ParserError::NestedFunction, header.span);
            return;
        }

        self.function = Some(self.program.functions.len());
        self.program.functions.push(FunctionDefinition {
            name,
            parameters,
            body: Vec::new(),
            line: header.line,
            span: header.span,
        });

        self.open(BlockKind::Function, header.span);
    }

    fn main_start(&mut self, span: Span) {
        if !self.stack.is_empty() {
            self.fail(ParserError::NestedMain, span);
            return;
        }

        if self.seen_main {
            self.fail(ParserError::DuplicateMain, span);
        }

        self.seen_main = true;
        self.in_main = true;
        self.open(BlockKind::Main, span);
    }

    fn then(&mut self, statement: Statement) {
        let span = statement.span;
        match self.stack.last_mut().map(|frame| &mut frame.kind) {
            Some(BlockKind::If { then, .. }) if !*then => {
                *then = true;
                self.indent += 1;
                self.append(statement);
            }

            Some(BlockKind::If { .. }) => self.fail(ParserError::DuplicateThen, span),
            _ => self.fail(ParserError::StrayThen, span),
        }
    }

    fn otherwise(&mut self, statement: Statement) {
        let span = statement.span;
        match self.stack.last_mut().map(|frame| &mut frame.kind) {
            // El nivel baja uno para `sino` y vuelve a subir para su rama
            Some(BlockKind::If { otherwise, .. }) if !*otherwise => {
                *otherwise = true;
                self.append(statement);
            }

            Some(BlockKind::If { .. }) => self.fail(ParserError::DuplicateElse, span),
            _ => self.fail(ParserError::StrayElse, span),
        }
    }

    fn open(&mut self, kind: BlockKind, span: Span) {
        self.stack.push(BlockFrame { kind, span });
        self.indent += 1;
    }

    fn close(&mut self, found: Keyword, statement: Statement) {
        let span = statement.span;
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return self.fail(ParserError::UnexpectedCloser(found), span),
        };

        self.indent = self.indent.saturating_sub(frame.kind.width());

        let matched = match frame.kind {
            BlockKind::Function => {
                self.function = None;
                found == Keyword::Fin
            }

            BlockKind::Main => {
                self.in_main = false;
                found == Keyword::Fin
            }

            BlockKind::If { then, .. } => {
                if found == Keyword::Finsi && !then {
                    self.fail(ParserError::MissingThen, frame.span);
                }

                found == Keyword::Finsi
            }

            BlockKind::While => found == Keyword::Finmientras,
            BlockKind::For => found == Keyword::Finpara,
            BlockKind::Repeat => found == Keyword::Hasta,
        };

        if !matched {
            let expected = frame.kind.closer();
            self.fail(ParserError::Mismatched { found, expected }, span);
        } else if found != Keyword::Fin {
            self.append(statement);
        }
    }

    fn append(&mut self, statement: Statement) {
        match self.function.and_then(|index| self.program.functions.get_mut(index)) {
            Some(function) => function.body.push(statement),
            None => {
                if !self.in_main {
                    self.warn(ParserError::OutsideMain, statement.span);
                }

                self.program.main.push(statement);
            }
        }
    }

    fn fail(&mut self, error: ParserError, span: Span) {
        self.diagnostics.push(Located::at(error, span));
    }

    fn warn(&mut self, warning: ParserError, span: Span) {
        debug_assert_eq!(warning.severity(), Severity::Warning);
        self.diagnostics.push(Located::at(warning, span));
    }

    fn finish(mut self) -> Parse {
        for frame in std::mem::take(&mut self.stack) {
            let error = ParserError::Unclosed {
                opener: frame.kind.opener(),
                closer: frame.kind.closer(),
            };

            self.fail(error, frame.span);
        }

        if !self.seen_main {
            self.fail(ParserError::MissingMain, Span::empty(0));
        }

        debug!(
            functions = self.program.functions.len(),
            main = self.program.main.len(),
            diagnostics = self.diagnostics.len(),
            "parsed program"
        );

        (self.program, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(text: &str) -> Vec<String> {
        let (_, diagnostics) = parse(&Source::new("prueba", text));
        diagnostics
            .iter()
            .map(|diagnostic| diagnostic.message().to_owned())
            .collect()
    }

    #[test]
    fn well_formed_program_has_no_diagnostics() {
        let text = "\
funcion doble(n)
  retornar n * 2
fin
inicio
  leer x
  si x > 0
    entonces
      escribir doble(x)
    sino
      escribir 0
    finsi
  mientras x > 0
    x <- x - 1
  finmientras
fin
";

        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn tabs_are_always_errors() {
        let errors = messages("inicio\n\tleer x\nfin\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Tabs are not allowed"));
    }

    #[test]
    fn bad_indentation_reports_spaces() {
        assert_eq!(
            messages("inicio\n   leer x\nfin\n"),
            vec!["Expected an indentation of 2 spaces, found 3"]
        );
    }

    #[test]
    fn mismatched_closer_is_dropped() {
        let source = Source::new("prueba", "inicio\n  mientras x\n  finpara\nfin\n");
        let (program, diagnostics) = parse(&source);

        let texts: Vec<_> = program.main.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["mientras x"]);
        assert_eq!(
            diagnostics.iter().next().map(|d| d.message()),
            Some("`finpara` cannot close this block, expected `finmientras`")
        );
    }

    #[test]
    fn closer_without_block() {
        assert_eq!(
            messages("inicio\nfin\nfinsi\n"),
            vec!["`finsi` does not close any open block"]
        );
    }

    #[test]
    fn missing_main_is_reported_once() {
        let errors = messages("funcion f()\nfin\nfuncion g()\nfin\n");
        assert_eq!(errors, vec!["Entrypoint not found, add an `inicio` ... `fin` section"]);
    }

    #[test]
    fn nested_function_is_rejected() {
        let errors = messages("inicio\n  funcion f()\nfin\n");
        assert!(errors.contains(&"Functions cannot be defined inside another block".to_owned()));
    }

    #[test]
    fn malformed_header_still_defines_a_scope() {
        let source = Source::new("prueba", "funcion f\n  leer x\nfin\ninicio\nfin\n");
        let (program, diagnostics) = parse(&source);

        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].body.len(), 1);
        assert_eq!(diagnostics.len(), 1);
    }
}
