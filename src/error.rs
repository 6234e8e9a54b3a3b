//! Diagnósticos.
//!
//! Todo error o advertencia que detecta el parser se acumula aquí como
//! un [`Diagnostic`] con un rango de bytes, una severidad y un mensaje.
//! Los diagnósticos son informativos: nunca detienen la construcción del
//! modelo de programa. Una superficie externa (un editor, por ejemplo)
//! puede consumirlos directamente para resaltar rangos; [`Report`] los
//! presenta en el formato usual de un compilador de línea de comandos.

use crate::{
    parse::ParserError,
    source::{Located, Source, Span},
};

use std::fmt::{self, Display};

/// Severidad de un diagnóstico.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Estilo o sentencia no reconocida; no afecta la emisión.
    Warning,

    /// Error estructural.
    Error,
}

impl Display for Severity {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => fmt.write_str("warning"),
            Severity::Error => fmt.write_str("error"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    span: Span,
    severity: Severity,
    message: String,
}

impl Diagnostic {
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Located<ParserError>> for Diagnostic {
    fn from(error: Located<ParserError>) -> Self {
        let (span, error) = error.split();
        Diagnostic {
            span,
            severity: error.severity(),
            message: error.to_string(),
        }
    }
}

/// Lista ordenada de diagnósticos de un análisis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push<D: Into<Diagnostic>>(&mut self, diagnostic: D) {
        self.items.push(diagnostic.into());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Solo los diagnósticos de una severidad dada.
    pub fn of(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(move |diagnostic| diagnostic.severity == severity)
    }

    pub fn has_errors(&self) -> bool {
        self.of(Severity::Error).next().is_some()
    }

    /// Prepara una presentación legible contra el código fuente original.
    pub fn report<'a>(&'a self, source: &'a Source) -> Report<'a> {
        Report {
            diagnostics: self,
            source,
        }
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Presentación de diagnósticos con fragmentos del código fuente.
pub struct Report<'a> {
    diagnostics: &'a Diagnostics,
    source: &'a Source,
}

impl Display for Report<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Report {
            diagnostics,
            source,
        } = self;

        if diagnostics.is_empty() {
            return writeln!(fmt, "No problems were reported");
        }

        for diagnostic in diagnostics.iter() {
            writeln!(fmt, "{}: {}", diagnostic.severity, diagnostic.message)?;

            let start = source.position(diagnostic.span.start());
            let end = source.position(diagnostic.span.end());
            writeln!(fmt, " --> {}:{}", source.name(), start)?;

            let digits = start.line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            let line = source.with_line(start.line(), str::to_owned).unwrap_or_default();
            writeln!(fmt, "{:>digits$} | {}", start.line(), line, digits = digits)?;

            // Un rango que cruza líneas se subraya hasta el fin de la primera
            let last_column = if end.line() == start.line() {
                end.column()
            } else {
                line.chars().count() as u32 + 1
            };

            let skip = (start.column() - 1) as usize;
            let highlight = (last_column.saturating_sub(start.column())).max(1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let errors = diagnostics.of(Severity::Error).count();
        let warnings = diagnostics.of(Severity::Warning).count();
        writeln!(
            fmt,
            "{} {}, {} {}",
            errors,
            if errors == 1 { "error" } else { "errors" },
            warnings,
            if warnings == 1 { "warning" } else { "warnings" },
        )
    }
}
