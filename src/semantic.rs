//! Tablas de variables por ámbito.
//!
//! Para cada ámbito (cuerpo principal y cada función, en ese orden) se
//! construye una tabla ordenada con las variables observadas: destinos de
//! `leer` y de asignaciones (nombre base si hay subíndice), declaraciones
//! y contadores de `para`. Las funciones se siembran con sus parámetros.
//! El orden es el de primera aparición y los duplicados se colapsan.
//!
//! Estas tablas solo alimentan la instrumentación; no afectan la
//! corrección del código emitido.

use crate::{
    classify::{base_name, Shape},
    ir::{Program, ScopeId, Statement},
};

use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableSlot {
    pub scope: ScopeId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableTable {
    scope: ScopeId,
    slots: Vec<VariableSlot>,
}

impl VariableTable {
    fn new(scope: ScopeId) -> Self {
        VariableTable {
            scope,
            slots: Vec::new(),
        }
    }

    /// Agrega un nombre si no existía todavía.
    fn insert(&mut self, name: &str) {
        if !self.contains(name) {
            self.slots.push(VariableSlot {
                scope: self.scope,
                name: name.to_owned(),
            });
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn slots(&self) -> &[VariableSlot] {
        &self.slots
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|slot| slot.name == name)
    }
}

/// Tablas de todos los ámbitos de un programa.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tables {
    tables: Vec<VariableTable>,
}

impl Tables {
    /// Construye las tablas de un programa.
    pub fn scan(program: &Program) -> Self {
        let main = std::iter::once(scan_scope(ScopeId::Main, &[], &program.main));
        let functions = program.functions.iter().enumerate().map(|(index, function)| {
            scan_scope(ScopeId::Function(index), &function.parameters, &function.body)
        });

        let tables: Vec<_> = main.chain(functions).collect();
        debug!(
            scopes = tables.len(),
            slots = tables.iter().map(|table| table.slots.len()).sum::<usize>(),
            "built variable tables"
        );

        Tables { tables }
    }

    /// Tabla de un ámbito.
    pub fn scope(&self, scope: ScopeId) -> Option<&VariableTable> {
        self.tables.iter().find(|table| table.scope == scope)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariableTable> {
        self.tables.iter()
    }

    /// Todas las casillas de todos los ámbitos, en orden global.
    ///
    /// Este orden define las posiciones de una instantánea de estado.
    pub fn slots(&self) -> impl Iterator<Item = &VariableSlot> {
        self.tables.iter().flat_map(|table| table.slots.iter())
    }
}

fn scan_scope(scope: ScopeId, parameters: &[String], body: &[Statement]) -> VariableTable {
    let mut table = VariableTable::new(scope);
    for parameter in parameters {
        table.insert(parameter);
    }

    for statement in body {
        match &statement.shape {
            Shape::Read { target } | Shape::Assign { target, .. } => {
                table.insert(base_name(target))
            }

            Shape::Declare { name, size: Some(_), .. } => table.insert(name),
            Shape::For { counter, .. } => table.insert(counter),
            _ => (),
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse::parse, source::Source};

    #[test]
    fn first_seen_order_without_duplicates() {
        let text = "\
funcion f(a, b)
  leer a
  leer c
fin
inicio
  entero v[3]
  para i desde 1 hasta 3
    leer v[i]
  finpara
  leer x
  leer v[1]
  leer i
fin
";

        let (program, _) = parse(&Source::new("prueba", text));
        let tables = Tables::scan(&program);

        let main: Vec<_> = tables.scope(ScopeId::Main).unwrap().names().collect();
        assert_eq!(main, vec!["v", "i", "x"]);

        let function: Vec<_> = tables.scope(ScopeId::Function(0)).unwrap().names().collect();
        assert_eq!(function, vec!["a", "b", "c"]);

        assert_eq!(tables.slots().count(), 6);
        assert_eq!(tables.slots().next().map(|slot| slot.scope), Some(ScopeId::Main));
    }

    #[test]
    fn scalar_declarations_do_not_claim_a_slot() {
        let text = "inicio\n  entero x\n  leer y\n  leer x\n  real v[2]\nfin\n";

        let (program, _) = parse(&Source::new("prueba", text));
        let tables = Tables::scan(&program);

        let main: Vec<_> = tables.scope(ScopeId::Main).unwrap().names().collect();
        assert_eq!(main, vec!["y", "x", "v"]);
    }
}
