//! Diagrama de flujo.
//!
//! # Construcción
//! El grafo se construye en una sola pasada hacia adelante sobre las
//! sentencias del cuerpo principal. Dos pilas transitorias acompañan la
//! pasada: una de condicionales abiertas y otra de ciclos abiertos. Ambas
//! viven exclusivamente dentro de [`build()`].
//!
//! Un nodo nuevo se conecta con una operación común: si un ciclo con
//! condición previa espera el primer nodo de su cuerpo, la arista sale de
//! su decisión con etiqueta "Sí"; si una condicional espera el primer nodo
//! de su rama activa, sale de su decisión con la etiqueta de esa rama; en
//! otro caso se encadena desde el nodo actual. Así, una rama o un cuerpo
//! vacío conecta su decisión directamente con el nodo de unión o salida.
//!
//! # Formato
//! [`FlowGraph`] implementa [`Display`] con una gramática textual fija:
//! una declaración de nodo por línea y luego una arista por línea.

use crate::{classify::Shape, ir::Statement};

use std::fmt::{self, Display};
use tracing::debug;

/// Identificador de nodo.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "n{}", self.0)
    }
}

/// Forma de un nodo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeShape {
    /// Nodos sintéticos de inicio y fin.
    Terminal,

    /// Condición de una bifurcación o de un ciclo.
    Decision,

    /// Cualquier otra sentencia, uniones y salidas de ciclo.
    Process,
}

/// Rama de una decisión.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Branch {
    Yes,
    No,
}

impl Display for Branch {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Yes => fmt.write_str("Sí"),
            Branch::No => fmt.write_str("No"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowNode {
    pub id: NodeId,
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlowEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub label: Option<Branch>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
}

impl FlowGraph {
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    /// Nodo sintético de inicio.
    pub fn start(&self) -> NodeId {
        NodeId(0)
    }

    /// Nodo sintético de fin, siempre el último.
    pub fn end(&self) -> NodeId {
        NodeId(self.nodes.len().saturating_sub(1))
    }

    pub fn node(&self, id: NodeId) -> Option<&FlowNode> {
        self.nodes.get(id.0)
    }

    /// Aristas que salen de un nodo.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &FlowEdge> {
        self.edges.iter().filter(move |edge| edge.from == id)
    }

    /// Determina cuáles nodos son alcanzables desde el inicio.
    pub fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut pending = vec![self.start()];

        while let Some(id) = pending.pop() {
            match seen.get_mut(id.0) {
                Some(visited) if !*visited => *visited = true,
                _ => continue,
            }

            pending.extend(self.outgoing(id).map(|edge| edge.to));
        }

        seen
    }
}

impl Display for FlowGraph {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "flowchart TD")?;

        for node in &self.nodes {
            let label = escape(&node.label);
            match node.shape {
                NodeShape::Terminal => writeln!(fmt, "    {}([\"{}\"])", node.id, label)?,
                NodeShape::Decision => writeln!(fmt, "    {}{{\"{}\"}}", node.id, label)?,
                NodeShape::Process => writeln!(fmt, "    {}[\"{}\"]", node.id, label)?,
            }
        }

        for edge in &self.edges {
            match edge.label {
                Some(branch) => writeln!(fmt, "    {} -- {} --> {}", edge.from, branch, edge.to)?,
                None => writeln!(fmt, "    {} --> {}", edge.from, edge.to)?,
            }
        }

        Ok(())
    }
}

/// Reemplaza caracteres reservados de la gramática por entidades.
pub fn escape(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '[' => escaped.push_str("&#91;"),
            ']' => escaped.push_str("&#93;"),
            '{' => escaped.push_str("&#123;"),
            '}' => escaped.push_str("&#125;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

/// Construye el diagrama de flujo de un flujo de sentencias.
pub fn build(statements: &[Statement]) -> FlowGraph {
    let mut builder = Builder::default();
    builder.current = builder.node("Inicio", NodeShape::Terminal);

    for statement in statements {
        builder.statement(statement);
    }

    // Bloques sin cierre se cierran implícitamente para no dejar nodos colgando
    while builder.close_innermost() {}

    let end = builder.node("Fin", NodeShape::Terminal);
    builder.edge(builder.current, end, None);

    debug!(
        nodes = builder.graph.nodes.len(),
        edges = builder.graph.edges.len(),
        "built flow graph"
    );

    builder.graph
}

/// Condicional abierta.
struct Conditional {
    decision: NodeId,
    join: NodeId,
    branch: Branch,
    pending: bool,
    primary: Option<Option<NodeId>>,
    sequence: usize,
}

enum LoopKind {
    /// `mientras` y `para`: la decisión precede al cuerpo.
    PreTest { decision: NodeId, pending: bool },

    /// `repetir`: la decisión se crea al cerrar.
    PostTest { entry: Option<NodeId> },
}

/// Ciclo abierto.
struct Loop {
    kind: LoopKind,
    after: NodeId,
    sequence: usize,
}

#[derive(Default)]
struct Builder {
    graph: FlowGraph,
    current: NodeId,
    conditionals: Vec<Conditional>,
    loops: Vec<Loop>,
    opened: usize,
}

impl Builder {
    fn statement(&mut self, statement: &Statement) {
        match &statement.shape {
            Shape::If { condition } => self.open_conditional(condition),
            Shape::Else => self.switch_branch(),
            Shape::EndIf => {
                self.settle_loops();
                self.close_conditional();
            }

            Shape::While { condition } => self.open_pre_test(condition, "fin mientras"),
            Shape::For {
                counter,
                start,
                end,
            } => {
                let label = format!("{} desde {} hasta {}", counter, start, end);
                self.open_pre_test(&label, "fin para");
            }

            Shape::Repeat => self.open_post_test(),

            Shape::EndWhile | Shape::EndFor => {
                self.settle_conditionals();
                self.close_loop(&statement.text);
            }

            Shape::Until { condition } => {
                self.settle_conditionals();
                self.close_loop(condition);
            }

            Shape::Read { .. }
            | Shape::Write { .. }
            | Shape::Assign { .. }
            | Shape::Return { .. }
            | Shape::Call { .. }
            | Shape::Unknown => {
                let node = self.node(&statement.text, NodeShape::Process);
                self.connect(node);
            }

            Shape::Declare { .. }
            | Shape::Then
            | Shape::FunctionHeader { .. }
            | Shape::MalformedHeader { .. }
            | Shape::MainStart
            | Shape::End => (),
        }
    }

    fn node(&mut self, label: &str, shape: NodeShape) -> NodeId {
        let id = NodeId(self.graph.nodes.len());
        self.graph.nodes.push(FlowNode {
            id,
            label: label.to_owned(),
            shape,
        });

        id
    }

    fn edge(&mut self, from: NodeId, to: NodeId, label: Option<Branch>) {
        self.graph.edges.push(FlowEdge { from, to, label });
    }

    /// Conecta un nodo nuevo según el estado pendiente y lo vuelve actual.
    fn connect(&mut self, node: NodeId) {
        // Todo `repetir` que aún no tiene nodos inicia en este
        for open in self.loops.iter_mut().rev() {
            match &mut open.kind {
                LoopKind::PostTest { entry } if entry.is_none() => *entry = Some(node),
                _ => break,
            }
        }

        let pending_loop = self.loops.iter_mut().rev().find_map(|open| match &mut open.kind {
            LoopKind::PreTest { decision, pending } if *pending => {
                *pending = false;
                Some(*decision)
            }

            _ => None,
        });

        let from = match pending_loop {
            Some(decision) => Some((decision, Some(Branch::Yes))),
            None => match self.conditionals.last_mut() {
                Some(conditional) if conditional.pending => {
                    conditional.pending = false;
                    Some((conditional.decision, Some(conditional.branch)))
                }

                _ => None,
            },
        };

        let (from, label) = from.unwrap_or((self.current, None));
        self.edge(from, node, label);
        self.current = node;
    }

    fn sequence(&mut self) -> usize {
        self.opened += 1;
        self.opened
    }

    fn open_conditional(&mut self, condition: &str) {
        let decision = self.node(condition, NodeShape::Decision);
        self.connect(decision);

        let join = self.node("fin si", NodeShape::Process);
        let sequence = self.sequence();
        self.conditionals.push(Conditional {
            decision,
            join,
            branch: Branch::Yes,
            pending: true,
            primary: None,
            sequence,
        });
    }

    fn switch_branch(&mut self) {
        let current = self.current;
        if let Some(conditional) = self.conditionals.last_mut() {
            let last = Some(current).filter(|_| !conditional.pending);

            conditional.primary = Some(last);
            conditional.branch = Branch::No;
            conditional.pending = true;
            self.current = conditional.decision;
        }
    }

    fn close_conditional(&mut self) {
        let conditional = match self.conditionals.pop() {
            Some(conditional) => conditional,
            None => return,
        };

        let last = Some(self.current).filter(|_| !conditional.pending);
        let (primary, secondary) = match conditional.primary {
            Some(primary) => (primary, last),
            None => (last, None),
        };

        let join = conditional.join;
        match primary {
            Some(node) => self.edge(node, join, None),
            None => self.edge(conditional.decision, join, Some(Branch::Yes)),
        }

        match secondary {
            Some(node) => self.edge(node, join, None),
            None => self.edge(conditional.decision, join, Some(Branch::No)),
        }

        self.current = join;
    }

    fn open_pre_test(&mut self, label: &str, after: &str) {
        let decision = self.node(label, NodeShape::Decision);
        self.connect(decision);

        let after = self.node(after, NodeShape::Process);
        let sequence = self.sequence();
        self.loops.push(Loop {
            kind: LoopKind::PreTest {
                decision,
                pending: true,
            },
            after,
            sequence,
        });
    }

    fn open_post_test(&mut self) {
        let after = self.node("fin repetir", NodeShape::Process);
        let sequence = self.sequence();
        self.loops.push(Loop {
            kind: LoopKind::PostTest { entry: None },
            after,
            sequence,
        });
    }

    /// Cierra el ciclo más interno. `condition` solo se usa en ciclos
    /// con condición posterior.
    fn close_loop(&mut self, condition: &str) {
        let is_post_test = match self.loops.last() {
            Some(open) => matches!(open.kind, LoopKind::PostTest { .. }),
            None => return,
        };

        if is_post_test {
            // La decisión forma parte del cuerpo del ciclo mientras se conecta
            let decision = self.node(condition, NodeShape::Decision);
            self.connect(decision);

            if let Some(Loop {
                kind: LoopKind::PostTest { entry },
                after,
                ..
            }) = self.loops.pop()
            {
                self.edge(decision, entry.unwrap_or(decision), Some(Branch::No));
                self.edge(decision, after, Some(Branch::Yes));
                self.current = after;
            }

            return;
        }

        if let Some(Loop {
            kind: LoopKind::PreTest { decision, pending },
            after,
            ..
        }) = self.loops.pop()
        {
            if pending {
                self.edge(decision, decision, Some(Branch::Yes));
            } else {
                self.edge(self.current, decision, None);
            }

            self.edge(decision, after, Some(Branch::No));
            self.current = after;
        }
    }

    /// Cierra condicionales abiertas dentro del ciclo más interno.
    fn settle_conditionals(&mut self) {
        let limit = match self.loops.last() {
            Some(open) => open.sequence,
            None => return,
        };

        while self
            .conditionals
            .last()
            .map_or(false, |conditional| conditional.sequence > limit)
        {
            self.close_conditional();
        }
    }

    /// Cierra ciclos abiertos dentro de la condicional más interna.
    fn settle_loops(&mut self) {
        let limit = match self.conditionals.last() {
            Some(conditional) => conditional.sequence,
            None => return,
        };

        while self.loops.last().map_or(false, |open| open.sequence > limit) {
            self.close_loop("hasta");
        }
    }

    /// Cierra el bloque abierto más reciente, si existe.
    fn close_innermost(&mut self) -> bool {
        let conditional = self.conditionals.last().map(|c| c.sequence);
        let open = self.loops.last().map(|l| l.sequence);

        match (conditional, open) {
            (None, None) => return false,
            (Some(c), Some(l)) if l > c => self.close_loop("hasta"),
            (Some(_), _) => self.close_conditional(),
            (None, Some(_)) => self.close_loop("hasta"),
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse::parse, source::Source};

    fn graph(body: &str) -> FlowGraph {
        let text = format!("inicio\n{}fin\n", body);
        let (program, _) = parse(&Source::new("prueba", text));
        build(&program.main)
    }

    #[test]
    fn straight_line() {
        let graph = graph("  leer x\n  escribir x\n");
        assert_eq!(
            graph.to_string(),
            "\
flowchart TD
    n0([\"Inicio\"])
    n1[\"leer x\"]
    n2[\"escribir x\"]
    n3([\"Fin\"])
    n0 --> n1
    n1 --> n2
    n2 --> n3
"
        );
    }

    #[test]
    fn labels_are_escaped() {
        assert_eq!(
            escape(r#"escribir "a<b" & v[1] {x}"#),
            "escribir &quot;a&lt;b&quot; &amp; v&#91;1&#93; &#123;x&#125;"
        );
    }

    #[test]
    fn empty_while_body_loops_on_itself() {
        let graph = graph("  mientras x > 0\n  finmientras\n");
        let decision = NodeId(1);

        assert!(graph.edges().contains(&FlowEdge {
            from: decision,
            to: decision,
            label: Some(Branch::Yes),
        }));
    }

    #[test]
    fn unclosed_blocks_still_reach_the_end() {
        let text = "inicio\n  si x\n    entonces\n      leer y\n";
        let (program, _) = parse(&Source::new("prueba", text));
        let graph = build(&program.main);

        assert!(graph.reachable().into_iter().all(|seen| seen));
        assert_eq!(graph.node(graph.end()).map(|n| n.shape), Some(NodeShape::Terminal));
    }
}
