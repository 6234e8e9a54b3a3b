//! Modelo de programa.
//!
//! Esta es la única representación que reciben los distintos backends.
//! Cada sentencia pertenece a exactamente un ámbito: el cuerpo de una
//! función o el cuerpo principal. Los ámbitos son planos, no existen
//! funciones anidadas. Dentro de un ámbito, la estructura de bloques
//! se conserva como un flujo plano de aperturas y cierres en el mismo
//! orden del código fuente.

use crate::{classify::Shape, source::Span};

/// Una sentencia aceptada por el parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    /// Texto recortado de la línea.
    pub text: String,

    /// Número de línea original, comenzando en 1.
    pub line: u32,

    /// Rango del texto en el código fuente.
    pub span: Span,

    /// Forma reconocida y sus capturas.
    pub shape: Shape,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Vec<Statement>,
    pub line: u32,
    pub span: Span,
}

impl FunctionDefinition {
    /// Determina si alguna sentencia `retornar` de esta función lleva valor.
    pub fn returns_value(&self) -> bool {
        self.body
            .iter()
            .any(|statement| matches!(&statement.shape, Shape::Return { value: Some(_) }))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub functions: Vec<FunctionDefinition>,
    pub main: Vec<Statement>,
}

/// Identificador de un ámbito.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Main,
    Function(usize),
}

impl Program {
    /// Obtiene las sentencias de un ámbito.
    pub fn statements(&self, scope: ScopeId) -> &[Statement] {
        match scope {
            ScopeId::Main => &self.main,
            ScopeId::Function(index) => self
                .functions
                .get(index)
                .map_or(&[], |function| &function.body),
        }
    }

    /// Nombres de todas las funciones definidas, en orden.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|function| function.name.as_str())
    }
}
