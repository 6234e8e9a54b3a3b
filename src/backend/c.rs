//! Emisión de C.
//!
//! El resultado es un único archivo compilable con cualquier compilador
//! C99: prototipos, definiciones de funciones y `main()`. Todo parámetro
//! es `int`; una función retorna `int` si alguna de sus sentencias
//! `retornar` lleva valor y `void` en caso contrario. Las variables que
//! nunca se declaran explícitamente se declaran como `int` al inicio de
//! su ámbito. Los ciclos `para` son siempre ascendentes.

use crate::{
    classify::{base_name, is_target, Shape, Type},
    codegen::{
        expr::{mangle, CallStyle, Segment, Translator},
        Context,
    },
    ir::{FunctionDefinition, ScopeId, Statement},
};

use std::{collections::HashMap, io, io::Write};

pub struct Emitter<'a> {
    cx: Context<'a>,
    translator: Translator<'a>,
    types: HashMap<&'a str, Type>,
    returns_value: bool,
    scope: ScopeId,
}

impl<'a> super::Emitter<'a> for Emitter<'a> {
    fn new(mut cx: Context<'a>) -> io::Result<Self> {
        let program = cx.program();
        let output = cx.output();

        writeln!(output, "#include <stdio.h>")?;
        writeln!(output)?;

        if !program.functions.is_empty() {
            for function in &program.functions {
                writeln!(output, "{};", signature(function))?;
            }

            writeln!(output)?;
        }

        Ok(Emitter {
            cx,
            translator: Translator::new(program.function_names(), CallStyle::Direct),
            types: HashMap::new(),
            returns_value: false,
            scope: ScopeId::Main,
        })
    }

    fn finish(mut self) -> io::Result<()> {
        self.cx.output().flush()
    }

    fn begin_scope(&mut self, scope: ScopeId) -> io::Result<()> {
        let program = self.cx.program();
        self.scope = scope;
        self.types = program
            .statements(scope)
            .iter()
            .filter_map(|statement| match &statement.shape {
                Shape::Declare { ty, name, .. } => Some((name.as_str(), *ty)),
                _ => None,
            })
            .collect();

        let parameters: &[String] = match scope {
            ScopeId::Main => {
                self.returns_value = false;
                emit!(self.cx, "int main(void) {{")?;
                &[]
            }

            ScopeId::Function(index) => match program.functions.get(index) {
                Some(function) => {
                    self.returns_value = function.returns_value();
                    emit!(self.cx, "{} {{", signature(function))?;
                    &function.parameters
                }

                None => &[],
            },
        };

        self.cx.nest();

        let implicit: Vec<&str> = self
            .cx
            .tables()
            .scope(scope)
            .into_iter()
            .flat_map(|table| table.names())
            .filter(|name| !parameters.iter().any(|parameter| parameter.as_str() == *name))
            .filter(|name| !self.types.contains_key(name))
            .collect();

        for name in implicit {
            emit!(self.cx, "int {};", name)?;
        }

        Ok(())
    }

    fn end_scope(&mut self, scope: ScopeId) -> io::Result<()> {
        if scope == ScopeId::Main {
            emit!(self.cx, "return 0;")?;
        }

        self.cx.unnest();
        emit!(self.cx, "}}")?;

        if scope != ScopeId::Main {
            writeln!(self.cx.output())?;
        }

        Ok(())
    }

    fn declare(
        &mut self,
        _at: &Statement,
        ty: Type,
        name: &str,
        size: Option<&str>,
    ) -> io::Result<()> {
        let buffer_size = self.cx.options().buffer_size;
        let array = size.map(|size| format!("[{}]", size.trim())).unwrap_or_default();

        match ty {
            Type::Cadena => emit!(self.cx, "char {}{}[{}];", name, array, buffer_size),
            _ => emit!(self.cx, "{} {}{};", c_type(ty), name, array),
        }
    }

    fn read(&mut self, _at: &Statement, target: &str) -> io::Result<()> {
        let target = self.translator.translate(target);
        let width = self.cx.options().buffer_size.saturating_sub(1).max(1);

        match self.type_of(&target) {
            Some(Type::Cadena) => emit!(self.cx, "scanf(\"%{}s\", {});", width, target),
            Some(Type::Real) => emit!(self.cx, "scanf(\"%lf\", &{});", target),
            Some(Type::Caracter) => emit!(self.cx, "scanf(\" %c\", &{});", target),
            _ => emit!(self.cx, "scanf(\"%d\", &{});", target),
        }
    }

    fn write(&mut self, _at: &Statement, segments: &[Segment]) -> io::Result<()> {
        let mut format = String::new();
        let mut arguments = Vec::new();

        for segment in segments {
            match segment {
                Segment::Literal(text) => format.push_str(&escape(text).replace('%', "%%")),
                Segment::Expr(expr) => {
                    let spec = match is_target(expr).then(|| self.type_of(expr)).flatten() {
                        Some(Type::Real) => "%g",
                        Some(Type::Cadena) => "%s",
                        Some(Type::Caracter) => "%c",
                        _ => "%d",
                    };

                    format.push_str(spec);
                    arguments.push(self.translator.translate(expr));
                }
            }
        }

        if arguments.is_empty() {
            emit!(self.cx, "printf(\"{}\\n\");", format)
        } else {
            emit!(self.cx, "printf(\"{}\\n\", {});", format, arguments.join(", "))
        }
    }

    fn assign(&mut self, _at: &Statement, target: &str, value: &str) -> io::Result<()> {
        let target = self.translator.translate(target);
        let value = self.translator.translate(value);

        if self.type_of(&target) == Some(Type::Cadena) {
            let buffer_size = self.cx.options().buffer_size;
            emit!(self.cx, "snprintf({}, {}, \"%s\", {});", target, buffer_size, value)
        } else {
            emit!(self.cx, "{} = {};", target, value)
        }
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

    fn ret(&mut self, _at: &Statement, value: Option<&str>) -> io::Result<()> {
        match (self.scope, value) {
            (ScopeId::Main, _) => emit!(self.cx, "return 0;"),
            (_, Some(value)) => {
                let value = self.translator.translate(value);
                emit!(self.cx, "return {};", value)
            }

            (_, None) if self.returns_value => emit!(self.cx, "return 0;"),
            (_, None) => emit!(self.cx, "return;"),
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
        _at: &Statement,
        counter: &str,
        start: &str,
        end: &str,
    ) -> io::Result<()> {
        let start = self.translator.translate(start);
        let end = self.translator.translate(end);

        emit!(
            self.cx,
            "for ({0} = {1}; {0} <= {2}; {0}++) {{",
            counter,
            start.trim(),
            end.trim()
        )?;

        self.cx.nest();
        Ok(())
    }

    fn close_for(&mut self) -> io::Result<()> {
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

    /// Tipo declarado del nombre base de un destino, si se declaró en
    /// el ámbito actual.
    fn type_of(&self, target: &str) -> Option<Type> {
        self.types.get(base_name(target)).copied()
    }
}

fn signature(function: &FunctionDefinition) -> String {
    let returns = if function.returns_value() { "int" } else { "void" };
    let parameters = if function.parameters.is_empty() {
        String::from("void")
    } else {
        function
            .parameters
            .iter()
            .map(|parameter| format!("int {}", parameter))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!("{} {}({})", returns, mangle(&function.name), parameters)
}

fn c_type(ty: Type) -> &'static str {
    match ty {
        Type::Entero | Type::Logico => "int",
        Type::Real => "double",
        Type::Caracter => "char",
        Type::Cadena => "char",
    }
}

/// Escapa texto para un literal de C.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }

    escaped
}
