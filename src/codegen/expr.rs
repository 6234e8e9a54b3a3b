//! Reescritura de expresiones.
//!
//! Las expresiones del pseudocódigo pasan casi intactas a los lenguajes
//! objetivo. Solo se reescriben dos cosas: los subíndices, que en el
//! pseudocódigo comienzan en 1, y las llamadas a funciones definidas por
//! el usuario, cuyo nombre se decora para no chocar con nombres del
//! lenguaje objetivo. El contenido de literales de texto nunca se toca.

use crate::classify::{matching_close, split_list};

/// Prefijo de toda función de usuario en los lenguajes objetivo.
pub const USER_PREFIX: &str = "user_";

/// Nombre objetivo de una función de usuario.
pub fn mangle(name: &str) -> String {
    format!("{}{}", USER_PREFIX, name)
}

/// Forma en que se emiten las llamadas a funciones de usuario.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallStyle {
    /// `user_f(a, b)`
    Direct,

    /// `await user_f(host, a, b)`, donde `host` es el nombre dado.
    Awaited { host: &'static str },
}

/// Traductor de expresiones para un programa particular.
#[derive(Clone, Debug)]
pub struct Translator<'a> {
    functions: Vec<&'a str>,
    style: CallStyle,
}

impl<'a> Translator<'a> {
    pub fn new<I>(functions: I, style: CallStyle) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Translator {
            functions: functions.into_iter().collect(),
            style,
        }
    }

    /// Determina si un nombre es una función de usuario.
    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains(&name)
    }

    /// Reescribe una expresión completa.
    pub fn translate(&self, expr: &str) -> String {
        let mut output = String::with_capacity(expr.len());
        let mut rest = expr;

        while let Some(c) = rest.chars().next() {
            if c == '"' {
                let end = literal_end(rest);
                output.push_str(&rest[..end]);
                rest = &rest[end..];
            } else if c.is_alphabetic() || c == '_' {
                let end = rest
                    .char_indices()
                    .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
                    .map_or(rest.len(), |(index, _)| index);

                let (name, after) = rest.split_at(end);
                rest = self.word(name, after, &mut output);
            } else if c.is_ascii_digit() {
                // Evita que `2x` o `1e5` se confundan con identificadores
                let end = rest
                    .char_indices()
                    .find(|&(_, c)| !(c.is_alphanumeric() || c == '_' || c == '.'))
                    .map_or(rest.len(), |(index, _)| index);

                output.push_str(&rest[..end]);
                rest = &rest[end..];
            } else {
                output.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }

        output
    }

    /// Traduce una palabra y lo que le siga inmediatamente, si es un
    /// subíndice o una lista de argumentos. Retorna el texto restante.
    fn word<'t>(&self, name: &str, after: &'t str, output: &mut String) -> &'t str {
        match after.chars().next() {
            Some('[') => match matching_close(after, 0) {
                Some(close) => {
                    let index = self.translate(&after[1..close]);
                    output.push_str(name);
                    output.push('[');
                    output.push_str(&shift(&index));
                    output.push(']');

                    &after[close + 1..]
                }

                None => {
                    output.push_str(name);
                    after
                }
            },

            Some('(') if self.is_function(name) => match matching_close(after, 0) {
                Some(close) => {
                    let arguments = self.translate(&after[1..close]);
                    output.push_str(&self.call(name, &arguments));
                    &after[close + 1..]
                }

                None => {
                    output.push_str(name);
                    after
                }
            },

            _ => {
                output.push_str(name);
                after
            }
        }
    }

    /// Emite una llamada a función de usuario con argumentos ya traducidos.
    pub fn call(&self, name: &str, arguments: &str) -> String {
        let arguments = arguments.trim();
        match self.style {
            CallStyle::Direct => format!("{}({})", mangle(name), arguments),

            CallStyle::Awaited { host } if arguments.is_empty() => {
                format!("await {}({})", mangle(name), host)
            }

            CallStyle::Awaited { host } => {
                format!("await {}({}, {})", mangle(name), host, arguments)
            }
        }
    }
}

/// Convierte un índice base 1 ya traducido a base 0.
///
/// Los literales enteros se pliegan, los identificadores se restan
/// directamente y cualquier otra expresión se agrupa entre paréntesis.
pub fn shift(index: &str) -> String {
    let index = index.trim();
    let folded = index.parse::<i64>().ok().and_then(|value| value.checked_sub(1));

    if let Some(value) = folded {
        value.to_string()
    } else if crate::classify::is_identifier(index) {
        format!("{} - 1", index)
    } else {
        format!("({}) - 1", index)
    }
}

/// Segmento de los argumentos de `escribir`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Texto literal, ya sin comillas ni escapes.
    Literal(String),

    /// Expresión sin traducir.
    Expr(String),
}

/// Separa los argumentos de `escribir` en segmentos.
///
/// Un argumento que es por completo un literal entre comillas se vuelve
/// [`Segment::Literal`]; dentro de él, `\` toma el carácter siguiente tal
/// cual. Cualquier otro argumento no vacío es una expresión.
pub fn segments(arguments: &str) -> Vec<Segment> {
    split_list(arguments)
        .into_iter()
        .map(str::trim)
        .filter(|argument| !argument.is_empty())
        .map(|argument| {
            let literal = argument.len() >= 2 && argument.starts_with('"');
            if literal && literal_end(argument) == argument.len() {
                Segment::Literal(unescape(&argument[1..argument.len() - 1]))
            } else {
                Segment::Expr(argument.to_owned())
            }
        })
        .collect()
}

fn unescape(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => output.extend(chars.next()),
            c => output.push(c),
        }
    }

    output
}

/// Longitud de un literal de texto que inicia en el primer carácter,
/// incluyendo ambas comillas. Un literal sin cerrar se extiende hasta el
/// final del texto.
fn literal_end(text: &str) -> usize {
    let mut escaped = false;
    for (index, c) in text.char_indices().skip(1) {
        match (escaped, c) {
            (true, _) => escaped = false,
            (false, '\\') => escaped = true,
            (false, '"') => return index + 1,
            _ => (),
        }
    }

    text.len()
}
