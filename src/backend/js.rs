//! Emisión de JavaScript instrumentado.
//!
//! El resultado es un módulo ES que exporta `SLOTS`, la lista ordenada de
//! variables de todos los ámbitos, y `main(host)`. El anfitrión provee:
//!
//! - `host.write(texto)`, sin esperar respuesta;
//! - `host.read(etiqueta)`, que retorna una promesa con el valor leído;
//! - opcionalmente `host.trace(línea, estado, salida)`.
//!
//! Cada `trace` recibe una instantánea con una entrada por cada elemento
//! de `SLOTS`. Las variables de otros ámbitos aparecen como `""`, las que
//! aún no tienen valor como `"<sin valor>"` y las de un ámbito que está
//! por retornar como `"<liberada>"`. Todas las funciones son `async`, ya
//! que cualquier lectura suspende la ejecución.

use crate::{
    classify::Type,
    codegen::{
        expr::{mangle, CallStyle, Segment, Translator},
        Context,
    },
    ir::{ScopeId, Statement},
};

use std::{io, io::Write};

/// Nombre del parámetro anfitrión dentro del código emitido.
const HOST: &str = "__host";

const PRELUDE: &str = r#"const __SIN_VALOR = "<sin valor>";
const __LIBERADA = "<liberada>";

function __show(value) {
    if (value === undefined) {
        return __SIN_VALOR;
    }

    if (Array.isArray(value)) {
        return "[" + value.map(__show).join(", ") + "]";
    }

    return String(value);
}

function __trace(host, line, snapshot, output) {
    if (typeof host.trace === "function") {
        host.trace(line, snapshot, output);
    }
}

async function __read(host, label) {
    const value = await host.read(label);
    if (typeof value === "string" && value.trim() !== "" && !Number.isNaN(Number(value))) {
        return Number(value);
    }

    return value;
}
"#;

pub struct Emitter<'a> {
    cx: Context<'a>,
    translator: Translator<'a>,
    scope: ScopeId,
}

impl<'a> super::Emitter<'a> for Emitter<'a> {
    fn new(mut cx: Context<'a>) -> io::Result<Self> {
        let program = cx.program();
        let tables = cx.tables();
        let output = cx.output();

        writeln!(output, "{}", PRELUDE)?;
        writeln!(output, "export const SLOTS = [")?;

        for slot in tables.slots() {
            let scope = match slot.scope {
                ScopeId::Main => "inicio",
                ScopeId::Function(index) => program
                    .functions
                    .get(index)
                    .map_or("", |function| function.name.as_str()),
            };

            writeln!(output, "    [{}, {}],", quote(scope), quote(&slot.name))?;
        }

        writeln!(output, "];")?;
        writeln!(output)?;

        Ok(Emitter {
            cx,
            translator: Translator::new(program.function_names(), CallStyle::Awaited { host: HOST }),
            scope: ScopeId::Main,
        })
    }

    fn finish(mut self) -> io::Result<()> {
        self.cx.output().flush()
    }

    fn begin_scope(&mut self, scope: ScopeId) -> io::Result<()> {
        let program = self.cx.program();
        self.scope = scope;

        let parameters: &[String] = match scope {
            ScopeId::Main => {
                emit!(self.cx, "export async function main({}) {{", HOST)?;
                &[]
            }

            ScopeId::Function(index) => match program.functions.get(index) {
                Some(function) => {
                    let name = mangle(&function.name);
                    let arguments: Vec<&str> = std::iter::once(HOST)
                        .chain(function.parameters.iter().map(String::as_str))
                        .collect();

                    emit!(self.cx, "async function {}({}) {{", name, arguments.join(", "))?;
                    &function.parameters
                }

                None => &[],
            },
        };

        self.cx.nest();

        let locals: Vec<&str> = self
            .cx
            .tables()
            .scope(scope)
            .into_iter()
            .flat_map(|table| table.names())
            .filter(|name| !parameters.iter().any(|parameter| parameter.as_str() == *name))
            .collect();

        if !locals.is_empty() {
            emit!(self.cx, "let {};", locals.join(", "))?;
        }

        Ok(())
    }

    fn end_scope(&mut self, _scope: ScopeId) -> io::Result<()> {
        self.cx.unnest();
        emit!(self.cx, "}}")?;
        writeln!(self.cx.output())
    }

    fn declare(
        &mut self,
        at: &Statement,
        _ty: Type,
        name: &str,
        size: Option<&str>,
    ) -> io::Result<()> {
        if let Some(size) = size {
            let size = self.translator.translate(size);
            emit!(self.cx, "{} = Array.from({{ length: {} }});", name, size.trim())?;
            return self.trace(at.line, None);
        }

        // Un escalar que ya es variable del ámbito tiene su `let` al inicio
        let known = self
            .cx
            .tables()
            .scope(self.scope)
            .map_or(false, |table| table.contains(name));

        if known {
            Ok(())
        } else {
            emit!(self.cx, "let {};", name)
        }
    }

    fn read(&mut self, at: &Statement, target: &str) -> io::Result<()> {
        let label = quote(target.trim());
        let target = self.translator.translate(target);

        emit!(self.cx, "{} = await __read({}, {});", target, HOST, label)?;
        self.trace(at.line, None)
    }

    fn write(&mut self, at: &Statement, segments: &[Segment]) -> io::Result<()> {
        let parts: Vec<String> = segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => quote(text),
                Segment::Expr(expr) => format!("__show({})", self.translator.translate(expr)),
            })
            .collect();

        let text = if parts.is_empty() {
            String::from("\"\"")
        } else {
            parts.join(" + ")
        };

        emit!(self.cx, "{{")?;
        self.cx.nest();
        emit!(self.cx, "const __salida = {};", text)?;
        emit!(self.cx, "{}.write(__salida);", HOST)?;
        self.trace(at.line, Some("__salida"))?;
        self.cx.unnest();
        emit!(self.cx, "}}")
    }

    fn assign(&mut self, at: &Statement, target: &str, value: &str) -> io::Result<()> {
        let target = self.translator.translate(target);
        let value = self.translator.translate(value);

        emit!(self.cx, "{} = {};", target, value.trim())?;
        self.trace(at.line, None)
    }

    fn call(&mut self, _at: &Statement, name: &str, arguments: &str) -> io::Result<()> {
        let arguments = self.translator.translate(arguments);
        if self.translator.is_function(name) {
            let call = self.translator.call(name, &arguments);
            emit!(self.cx, "{};", call)
        } else {
            emit!(self.cx, "{}({});", name, arguments.trim())
        }
    }

    fn ret(&mut self, at: &Statement, value: Option<&str>) -> io::Result<()> {
        let snapshot = self.snapshot(true);
        emit!(self.cx, "__trace({}, {}, {}, null);", HOST, at.line, snapshot)?;

        match value {
            Some(value) => {
                let value = self.translator.translate(value);
                emit!(self.cx, "return {};", value.trim())
            }

            None => emit!(self.cx, "return;"),
        }
    }

    fn opaque(&mut self, at: &Statement) -> io::Result<()> {
        let text = self.translator.translate(&at.text);
        emit!(self.cx, "{};", text)
    }

    fn open_if(&mut self, _at: &Statement, condition: &str) -> io::Result<()> {
        let condition = self.translator.translate(condition);
        emit!(self.cx, "if ({}) {{", condition)?;
        self.cx.nest();
        Ok(())
    }

    fn otherwise(&mut self) -> io::Result<()> {
        self.cx.unnest();
        emit!(self.cx, "}} else {{")?;
        self.cx.nest();
        Ok(())
    }

    fn close_if(&mut self) -> io::Result<()> {
        self.close()
    }

    fn open_while(&mut self, _at: &Statement, condition: &str) -> io::Result<()> {
        let condition = self.translator.translate(condition);
        emit!(self.cx, "while ({}) {{", condition)?;
        self.cx.nest();
        Ok(())
    }

    fn close_while(&mut self) -> io::Result<()> {
        self.close()
    }

    fn open_for(
        &mut self,
        at: &Statement,
        counter: &str,
        start: &str,
        end: &str,
    ) -> io::Result<()> {
        let start = self.translator.translate(start);
        let end = self.translator.translate(end);
        let line = at.line;

        // La dirección del ciclo se decide al entrar, no al compilar
        emit!(self.cx, "{{")?;
        self.cx.nest();
        emit!(self.cx, "const __desde{} = {};", line, start.trim())?;
        emit!(self.cx, "const __hasta{} = {};", line, end.trim())?;
        emit!(self.cx, "const __paso{0} = __desde{0} <= __hasta{0} ? 1 : -1;", line)?;
        emit!(
            self.cx,
            "for ({0} = __desde{1}; __paso{1} > 0 ? {0} <= __hasta{1} : {0} >= __hasta{1}; {0} += __paso{1}) {{",
            counter,
            line
        )?;

        self.cx.nest();
        self.trace(line, None)
    }

    fn close_for(&mut self) -> io::Result<()> {
        self.close()?;
        self.close()
    }

    fn open_repeat(&mut self, _at: &Statement) -> io::Result<()> {
        emit!(self.cx, "do {{")?;
        self.cx.nest();
        Ok(())
    }

    fn close_repeat(&mut self, condition: &str) -> io::Result<()> {
        let condition = self.translator.translate(condition);
        self.cx.unnest();
        emit!(self.cx, "}} while (!({}));", condition)
    }
}

impl Emitter<'_> {
    fn close(&mut self) -> io::Result<()> {
        self.cx.unnest();
        emit!(self.cx, "}}")
    }

    /// Emite un llamado a `trace` con el estado actual.
    fn trace(&mut self, line: u32, output: Option<&str>) -> io::Result<()> {
        let snapshot = self.snapshot(false);
        let output = output.unwrap_or("null");
        emit!(self.cx, "__trace({}, {}, {}, {});", HOST, line, snapshot, output)
    }

    /// Arreglo literal con el estado de todas las variables del programa,
    /// en el orden de `SLOTS`.
    fn snapshot(&self, cleared: bool) -> String {
        let entries: Vec<String> = self
            .cx
            .tables()
            .slots()
            .map(|slot| match (slot.scope == self.scope, cleared) {
                (false, _) => String::from("\"\""),
                (true, false) => format!("__show({})", slot.name),
                (true, true) => String::from("__LIBERADA"),
            })
            .collect();

        format!("[{}]", entries.join(", "))
    }
}

/// Literal de texto de JavaScript.
fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');

    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}
