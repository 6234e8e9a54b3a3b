//! Clasificación de sentencias.
//!
//! # Reconocimiento por línea
//! Cada línea del pseudocódigo contiene a lo sumo una sentencia. Esta fase
//! reconoce la forma de una línea ya recortada y extrae sus partes
//! (condición, límites de un ciclo, nombres de destino). No hay estado:
//! [`classify()`] es una función pura.
//!
//! # Ambigüedad
//! Cada forma se distingue por una palabra clave inicial obligatoria o,
//! en líneas sin palabra clave, por el token `<-` o por la forma de
//! llamada `nombre(...)`. Por tanto, a lo sumo una forma coincide con una
//! línea bien formada. Lo que no coincide con nada resulta en
//! [`Shape::Unknown`], que el parser acepta con una advertencia.
//!
//! # Reglas importantes del lenguaje
//! - Las palabras clave no distinguen mayúsculas, por lo cual tanto
//!   `mientras` como `MIENTRAS` y `Mientras` resultan en
//!   [`Keyword::Mientras`].
//! - Los identificadores comienzan con una letra o `_`.
//! - Las expresiones son texto opaco; no se analizan aquí.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

// Case-insensitive
pub use unicase::UniCase as NoCase;

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Funcion,
    Inicio,
    Fin,
    Leer,
    Escribir,
    Si,
    Entonces,
    Sino,
    Finsi,
    Mientras,
    Finmientras,
    Para,
    Desde,
    Hasta,
    Finpara,
    Repetir,
    Retornar,
    Llamar,
    Entero,
    Real,
    Cadena,
    Caracter,
    Logico,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            Funcion     => "funcion",
            Inicio      => "inicio",
            Fin         => "fin",
            Leer        => "leer",
            Escribir    => "escribir",
            Si          => "si",
            Entonces    => "entonces",
            Sino        => "sino",
            Finsi       => "finsi",
            Mientras    => "mientras",
            Finmientras => "finmientras",
            Para        => "para",
            Desde       => "desde",
            Hasta       => "hasta",
            Finpara     => "finpara",
            Repetir     => "repetir",
            Retornar    => "retornar",
            Llamar      => "llamar",
            Entero      => "entero",
            Real        => "real",
            Cadena      => "cadena",
            Caracter    => "caracter",
            Logico      => "logico",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("funcion",     Funcion),
            ("inicio",      Inicio),
            ("fin",         Fin),
            ("leer",        Leer),
            ("escribir",    Escribir),
            ("si",          Si),
            ("entonces",    Entonces),
            ("sino",        Sino),
            ("finsi",       Finsi),
            ("mientras",    Mientras),
            ("finmientras", Finmientras),
            ("para",        Para),
            ("desde",       Desde),
            ("hasta",       Hasta),
            ("finpara",     Finpara),
            ("repetir",     Repetir),
            ("retornar",    Retornar),
            ("llamar",      Llamar),
            ("entero",      Entero),
            ("real",        Real),
            ("cadena",      Cadena),
            ("caracter",    Caracter),
            ("logico",      Logico),
        ];

        let string = NoCase::new(string);
        KEYWORDS
            .iter()
            .find(|&&(name, _)| NoCase::new(name) == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Tipo declarado de una variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Entero,
    Real,
    Cadena,
    Caracter,
    Logico,
}

impl Type {
    fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Entero => Some(Type::Entero),
            Keyword::Real => Some(Type::Real),
            Keyword::Cadena => Some(Type::Cadena),
            Keyword::Caracter => Some(Type::Caracter),
            Keyword::Logico => Some(Type::Logico),
            _ => None,
        }
    }
}

/// Forma reconocida de una sentencia, con sus capturas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// `funcion nombre(a, b)`
    FunctionHeader {
        name: String,
        parameters: Vec<String>,
    },

    /// `funcion` seguido de algo que no es `nombre(parámetros)`.
    MalformedHeader { name: String },

    /// `inicio`
    MainStart,

    /// `fin`, cierre genérico de función o de sección principal.
    End,

    /// `entero v[5]`, `cadena nombre`
    Declare {
        ty: Type,
        name: String,
        size: Option<String>,
    },

    /// `leer x`, `leer v[i]`
    Read { target: String },

    /// `escribir "texto", expr`
    Write { arguments: String },

    /// `x <- expr`
    Assign { target: String, value: String },

    /// `si cond`
    If { condition: String },

    /// `entonces`
    Then,

    /// `sino`
    Else,

    /// `finsi`
    EndIf,

    /// `mientras cond`
    While { condition: String },

    /// `finmientras`
    EndWhile,

    /// `para i desde a hasta b`
    For {
        counter: String,
        start: String,
        end: String,
    },

    /// `finpara`
    EndFor,

    /// `repetir`
    Repeat,

    /// `hasta cond`
    Until { condition: String },

    /// `retornar`, `retornar expr`
    Return { value: Option<String> },

    /// `llamar f(a, b)` o simplemente `f(a, b)`
    Call { name: String, arguments: String },

    /// Ninguna forma conocida.
    Unknown,
}

/// Clasifica una línea ya recortada.
pub fn classify(line: &str) -> Shape {
    let line = line.trim();
    let (word, rest) = split_word(line);
    let rest = rest.trim();

    let keyword = match Keyword::from_str(word) {
        Ok(keyword) => keyword,
        Err(()) => return classify_bare(line),
    };

    use Keyword::*;
    match keyword {
        Funcion => function_header(rest),

        Inicio if rest.is_empty() => Shape::MainStart,
        Fin if rest.is_empty() => Shape::End,
        Entonces if rest.is_empty() => Shape::Then,
        Sino if rest.is_empty() => Shape::Else,
        Finsi if rest.is_empty() => Shape::EndIf,
        Finmientras if rest.is_empty() => Shape::EndWhile,
        Finpara if rest.is_empty() => Shape::EndFor,
        Repetir if rest.is_empty() => Shape::Repeat,

        Leer if is_target(rest) => Shape::Read {
            target: rest.to_owned(),
        },

        Escribir if !rest.is_empty() => Shape::Write {
            arguments: rest.to_owned(),
        },

        Si => condition(rest).map_or(Shape::Unknown, |condition| Shape::If { condition }),
        Mientras => condition(rest).map_or(Shape::Unknown, |condition| Shape::While { condition }),
        Hasta => condition(rest).map_or(Shape::Unknown, |condition| Shape::Until { condition }),

        Para => counted_loop(rest).unwrap_or(Shape::Unknown),

        Retornar => Shape::Return {
            value: Some(rest).filter(|value| !value.is_empty()).map(str::to_owned),
        },

        Llamar => call(rest).unwrap_or(Shape::Unknown),

        Entero | Real | Cadena | Caracter | Logico => declaration(keyword, rest),

        _ => Shape::Unknown,
    }
}

/// Líneas sin palabra clave: asignación, llamada o nada.
fn classify_bare(line: &str) -> Shape {
    if let Some((target, value)) = split_outside_quotes(line, "<-") {
        let (target, value) = (target.trim(), value.trim());
        if is_target(target) && !value.is_empty() {
            return Shape::Assign {
                target: target.to_owned(),
                value: value.to_owned(),
            };
        }
    }

    call(line).unwrap_or(Shape::Unknown)
}

fn function_header(rest: &str) -> Shape {
    match call(rest) {
        Some(Shape::Call { name, arguments }) => {
            let parameters: Vec<_> = split_list(&arguments)
                .into_iter()
                .map(|parameter| parameter.trim().to_owned())
                .collect();

            if parameters.iter().all(|parameter| is_identifier(parameter)) {
                Shape::FunctionHeader { name, parameters }
            } else {
                Shape::MalformedHeader { name }
            }
        }

        _ => {
            let (name, _) = split_word(rest);
            Shape::MalformedHeader {
                name: name.to_owned(),
            }
        }
    }
}

fn declaration(keyword: Keyword, rest: &str) -> Shape {
    let ty = match Type::from_keyword(keyword) {
        Some(ty) => ty,
        None => return Shape::Unknown,
    };

    if is_identifier(rest) {
        return Shape::Declare {
            ty,
            name: rest.to_owned(),
            size: None,
        };
    }

    match subscript(rest) {
        Some((name, size)) if !size.trim().is_empty() => Shape::Declare {
            ty,
            name: name.to_owned(),
            size: Some(size.trim().to_owned()),
        },

        _ => Shape::Unknown,
    }
}

fn counted_loop(rest: &str) -> Option<Shape> {
    let (counter, rest) = split_word(rest);
    if !is_identifier(counter) {
        return None;
    }

    let (desde, bounds) = split_word(rest.trim_start());
    if Keyword::from_str(desde) != Ok(Keyword::Desde) {
        return None;
    }

    let (start, end) = split_keyword(bounds, Keyword::Hasta)?;
    let (start, end) = (start.trim(), end.trim());
    if start.is_empty() || end.is_empty() {
        return None;
    }

    Some(Shape::For {
        counter: counter.to_owned(),
        start: start.to_owned(),
        end: end.to_owned(),
    })
}

/// `nombre(argumentos)`, ocupando todo el texto.
fn call(text: &str) -> Option<Shape> {
    let text = text.trim();
    let open = text.find('(')?;
    let name = text[..open].trim_end();

    if !is_identifier(name) || !text.ends_with(')') {
        return None;
    }

    let close = matching_close(text, open)?;
    if close != text.len() - 1 {
        return None;
    }

    Some(Shape::Call {
        name: name.to_owned(),
        arguments: text[open + 1..close].trim().to_owned(),
    })
}

/// Texto de condición, descartando un par de paréntesis que la envuelva
/// por completo.
fn condition(rest: &str) -> Option<String> {
    let rest = strip_parens(rest.trim()).trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_owned())
    }
}

/// Remueve un único par de paréntesis externos, si envuelven todo el texto.
pub fn strip_parens(text: &str) -> &str {
    if text.starts_with('(') && matching_close(text, 0) == Some(text.len() - 1) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Un destino de lectura o asignación: `nombre` o `nombre[expr]`.
pub fn is_target(text: &str) -> bool {
    is_identifier(text) || subscript(text).map_or(false, |(_, index)| !index.trim().is_empty())
}

/// Nombre base de un destino: `v[i]` resulta en `v`.
pub fn base_name(target: &str) -> &str {
    let target = target.trim();
    match target.find('[') {
        Some(open) => target[..open].trim_end(),
        None => target,
    }
}

/// Descompone `nombre[expr]` en sus dos partes.
pub fn subscript(text: &str) -> Option<(&str, &str)> {
    let open = text.find('[')?;
    let name = text[..open].trim_end();
    if !is_identifier(name) {
        return None;
    }

    let close = matching_close(text, open)?;
    if close != text.len() - 1 {
        return None;
    }

    Some((name, &text[open + 1..close]))
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }

        _ => false,
    }
}

/// Separa una palabra inicial del resto de la línea.
fn split_word(text: &str) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
        .map_or(text.len(), |(index, _)| index);

    text.split_at(end)
}

/// Busca una palabra clave como palabra completa, fuera de comillas y
/// agrupadores, y separa el texto alrededor de ella.
fn split_keyword(text: &str, keyword: Keyword) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;
    let mut word_start = None;

    for (index, c) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
        if quoted {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => quoted = false,
                _ => (),
            }

            continue;
        }

        if c.is_alphanumeric() || c == '_' {
            word_start.get_or_insert(index);
            continue;
        }

        if let Some(start) = word_start.take() {
            if depth == 0 && Keyword::from_str(&text[start..index]) == Ok(keyword) {
                return Some((&text[..start], &text[index..]));
            }
        }

        match c {
            '"' => quoted = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => (),
        }
    }

    None
}

/// Separa alrededor de la primera ocurrencia de `pattern` fuera de comillas.
fn split_outside_quotes<'a>(text: &'a str, pattern: &str) -> Option<(&'a str, &'a str)> {
    let mut quoted = false;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if quoted {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => quoted = false,
                _ => (),
            }
        } else if c == '"' {
            quoted = true;
        } else if text[index..].starts_with(pattern) {
            return Some((&text[..index], &text[index + pattern.len()..]));
        }
    }

    None
}

/// Separa una lista por comas de nivel superior.
///
/// Las comas dentro de comillas dobles, paréntesis o corchetes no separan.
/// En cualquier punto, `\` escapa el carácter siguiente. Una lista vacía
/// resulta en un vector vacío.
pub fn split_list(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        if quoted {
            match c {
                '\\' => escaped = true,
                '"' => quoted = false,
                _ => (),
            }

            continue;
        }

        match c {
            '\\' => escaped = true,
            '"' => quoted = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&text[start..index]);
                start = index + 1;
            }

            _ => (),
        }
    }

    items.push(&text[start..]);
    items
}

/// Encuentra el agrupador que cierra al que abre en `open`.
///
/// Solo se consideran `(`/`)` y `[`/`]`, ignorando el contenido de
/// literales de texto.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;

    for (index, c) in text[open..].char_indices() {
        if quoted {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => quoted = false,
                _ => (),
            }

            continue;
        }

        match c {
            '"' => quoted = true,
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + index);
                }
            }

            _ => (),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(Keyword::from_str("MIENTRAS"), Ok(Keyword::Mientras));
        assert_eq!(Keyword::from_str("FinSi"), Ok(Keyword::Finsi));
        assert_eq!(classify("Inicio"), Shape::MainStart);
    }

    #[test]
    fn conditions_drop_enclosing_parens() {
        assert_eq!(
            classify("mientras(x!=0)"),
            Shape::While {
                condition: "x!=0".into()
            }
        );

        assert_eq!(
            classify("si (a > 0) && (b > 0)"),
            Shape::If {
                condition: "(a > 0) && (b > 0)".into()
            }
        );
    }

    #[test]
    fn counted_loop_bounds() {
        assert_eq!(
            classify("para i desde 1 hasta n - 1"),
            Shape::For {
                counter: "i".into(),
                start: "1".into(),
                end: "n - 1".into(),
            }
        );

        assert_eq!(classify("para i desde 1"), Shape::Unknown);
    }

    #[test]
    fn declarations() {
        assert_eq!(
            classify("entero numeros[5]"),
            Shape::Declare {
                ty: Type::Entero,
                name: "numeros".into(),
                size: Some("5".into()),
            }
        );

        assert_eq!(
            classify("cadena nombre"),
            Shape::Declare {
                ty: Type::Cadena,
                name: "nombre".into(),
                size: None,
            }
        );
    }

    #[test]
    fn function_headers() {
        assert_eq!(
            classify("funcion suma(a, b)"),
            Shape::FunctionHeader {
                name: "suma".into(),
                parameters: vec!["a".into(), "b".into()],
            }
        );

        assert_eq!(
            classify("funcion vacia()"),
            Shape::FunctionHeader {
                name: "vacia".into(),
                parameters: vec![],
            }
        );

        assert_eq!(
            classify("funcion rota"),
            Shape::MalformedHeader {
                name: "rota".into()
            }
        );
    }

    #[test]
    fn bare_lines() {
        assert_eq!(
            classify("v[i] <- v[i] + 1"),
            Shape::Assign {
                target: "v[i]".into(),
                value: "v[i] + 1".into(),
            }
        );

        assert_eq!(
            classify("saludar(\"hola, mundo\")"),
            Shape::Call {
                name: "saludar".into(),
                arguments: "\"hola, mundo\"".into(),
            }
        );

        assert_eq!(classify("esto no es nada"), Shape::Unknown);
        assert_eq!(classify("escribir"), Shape::Unknown);
    }

    #[test]
    fn lists_split_on_top_level_commas_only() {
        assert_eq!(
            split_list(r#""a, \"b\"", f(x, y), v[1]"#),
            vec![r#""a, \"b\"""#, " f(x, y)", " v[1]"]
        );

        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn escaped_characters_never_split_or_quote() {
        assert_eq!(split_list(r#"a\, b, c"#), vec![r#"a\, b"#, " c"]);
        assert_eq!(split_list(r#"\"x, y"#), vec![r#"\"x"#, " y"]);
    }
}
