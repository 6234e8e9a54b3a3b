//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de rangos de bytes en el código fuente
//! original, lo cual permite señalar el punto exacto en donde
//! ocurre un error y resaltarlo en la superficie que consuma
//! los diagnósticos.

use std::{
    fmt::{self, Debug, Display, Formatter},
    io::{self, Read},
};

/// Ancho de una unidad de indentación, en espacios.
pub const INDENT_WIDTH: usize = 2;

/// Un objeto cualquiera con un rango original asociado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    span: Span,
    value: T,
}

impl<T> Located<T> {
    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Span, T) {
        (self.span, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, span: Span) -> Self {
        Located { value, span }
    }
}

/// Rango semiabierto de bytes `[start, end)` dentro de un [`Source`].
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Construye un rango. Los extremos se ordenan si vienen invertidos.
    pub fn new(start: usize, end: usize) -> Self {
        Span {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Rango vacío en una posición.
    pub fn empty(at: usize) -> Self {
        Span { start: at, end: at }
    }

    /// Desplazamiento de inicio.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Desplazamiento de fin (exclusivo).
    pub fn end(&self) -> usize {
        self.end
    }
}

impl Debug for Span {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}..{}", self.start, self.end)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna, contada en caracteres.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Una línea cruda del código fuente, todavía sin clasificar.
#[derive(Copy, Clone, Debug)]
pub struct SourceLine<'a> {
    /// Número de línea, comenzando en 1.
    pub number: u32,

    /// Desplazamiento en bytes del primer carácter de la línea.
    pub offset: usize,

    /// Texto de la línea, sin `'\n'` ni `'\r'` finales.
    pub text: &'a str,
}

/// Nombre de origen y texto completo de un programa.
pub struct Source {
    name: String,
    text: String,
    line_starts: Vec<usize>,
}

impl Source {
    /// Construye a partir de un texto ya cargado en memoria.
    pub fn new<N, T>(name: N, text: T) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(index, _)| index + 1))
            .collect();

        Source {
            name: name.into(),
            text,
            line_starts,
        }
    }

    /// Lee por completo un flujo de entrada.
    pub fn consume<R, N>(mut reader: R, name: N) -> io::Result<Self>
    where
        R: Read,
        N: Into<String>,
    {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        Ok(Source::new(name, text))
    }

    /// Nombre de origen, usualmente una ruta.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Itera sobre las líneas del programa.
    ///
    /// Un `'\n'` final no produce una línea vacía adicional.
    pub fn lines(&self) -> impl Iterator<Item = SourceLine<'_>> {
        let total = self.text.len();
        self.line_starts
            .iter()
            .enumerate()
            .filter(move |&(index, &start)| index == 0 || start < total)
            .map(move |(index, &start)| {
                let end = self
                    .line_starts
                    .get(index + 1)
                    .map(|next| next - 1)
                    .unwrap_or(total);

                let raw = &self.text[start..end];
                SourceLine {
                    number: index as u32 + 1,
                    offset: start,
                    text: raw.strip_suffix('\r').unwrap_or(raw),
                }
            })
    }

    /// Traduce un desplazamiento de bytes a línea-columna.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };

        let start = self.line_starts[index];
        let column = self.text[start..offset].chars().count() as u32 + 1;

        Position {
            line: index as u32 + 1,
            column,
        }
    }

    /// Invoca un callback con el contenido de una línea, si existe.
    pub fn with_line<F, R>(&self, line: u32, callback: F) -> Option<R>
    where
        F: FnOnce(&str) -> R,
    {
        self.lines()
            .nth((line as usize).checked_sub(1)?)
            .map(|line| callback(line.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_offsets_and_strip_carriage_returns() {
        let source = Source::new("prueba", "inicio\r\n  leer x\nfin\n");
        let lines: Vec<_> = source.lines().map(|l| (l.number, l.offset, l.text)).collect();

        assert_eq!(lines, vec![(1, 0, "inicio"), (2, 8, "  leer x"), (3, 17, "fin")]);
    }

    #[test]
    fn positions_count_characters() {
        let source = Source::new("prueba", "inicio\n  año <- 1\n");
        let position = source.position(source.text().find("<-").unwrap());

        assert_eq!(position.line(), 2);
        assert_eq!(position.column(), 7);
    }

    #[test]
    fn empty_source_has_one_line() {
        let source = Source::new("vacío", "");
        assert_eq!(source.lines().count(), 1);
    }
}
