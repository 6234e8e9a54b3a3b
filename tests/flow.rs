use pretty_assertions::assert_eq;
use pseudoc::{
    flow::{Branch, FlowGraph, NodeShape},
    source::Source,
};

fn flow(text: &str) -> FlowGraph {
    pseudoc::analyze(&Source::new("prueba.psc", text)).flow()
}

/// Todo nodo es alcanzable y todo nodo salvo el final tiene salida.
fn assert_well_connected(graph: &FlowGraph) {
    assert!(graph.reachable().into_iter().all(|seen| seen), "{}", graph);

    for node in graph.nodes() {
        if node.id != graph.end() {
            assert!(graph.outgoing(node.id).next().is_some(), "{} has no exit\n{}", node.id, graph);
        }
    }
}

#[test]
fn while_loop_has_back_edge_and_exit() {
    let graph = flow(
        "\
inicio
  leer x
  mientras(x!=0)
    x <- x - 1
  finmientras
fin
",
    );

    assert_eq!(
        graph.to_string(),
        "\
flowchart TD
    n0([\"Inicio\"])
    n1[\"leer x\"]
    n2{\"x!=0\"}
    n3[\"fin mientras\"]
    n4[\"x &lt;- x - 1\"]
    n5([\"Fin\"])
    n0 --> n1
    n1 --> n2
    n2 -- Sí --> n4
    n4 --> n2
    n2 -- No --> n3
    n3 --> n5
"
    );

    assert_well_connected(&graph);
}

#[test]
fn empty_primary_branch_goes_straight_to_join() {
    let graph = flow(
        "\
inicio
  leer x
  si x>=18
    entonces
    sino
      escribir \"menor\"
    finsi
fin
",
    );

    assert_eq!(
        graph.to_string(),
        "\
flowchart TD
    n0([\"Inicio\"])
    n1[\"leer x\"]
    n2{\"x&gt;=18\"}
    n3[\"fin si\"]
    n4[\"escribir &quot;menor&quot;\"]
    n5([\"Fin\"])
    n0 --> n1
    n1 --> n2
    n2 -- No --> n4
    n2 -- Sí --> n3
    n4 --> n3
    n3 --> n5
"
    );
}

#[test]
fn repeat_loops_back_to_its_first_statement() {
    let graph = flow("inicio\n  repetir\n    leer x\n    escribir x\n  hasta(x > 0)\nfin\n");
    let label = |index: usize| graph.nodes()[index].label.as_str();

    assert_eq!(label(1), "fin repetir");
    assert_eq!(label(2), "leer x");
    assert_eq!(label(4), "x > 0");
    assert_eq!(graph.nodes()[4].shape, NodeShape::Decision);

    let edges: Vec<_> = graph
        .edges()
        .iter()
        .map(|edge| (edge.from.index(), edge.to.index(), edge.label))
        .collect();

    assert_eq!(
        edges,
        vec![
            (0, 2, None),
            (2, 3, None),
            (3, 4, None),
            (4, 2, Some(Branch::No)),
            (4, 1, Some(Branch::Yes)),
            (1, 5, None),
        ]
    );
}

#[test]
fn counted_loop_label() {
    let graph = flow("inicio\n  para i desde 1 hasta n\n    escribir i\n  finpara\nfin\n");
    let decision = &graph.nodes()[1];

    assert_eq!(decision.label, "i desde 1 hasta n");
    assert_eq!(decision.shape, NodeShape::Decision);
    assert_well_connected(&graph);
}

#[test]
fn nested_blocks_stay_connected() {
    let bodies = [
        "  si a\n    entonces\n      mientras b\n        leer b\n      finmientras\n    finsi\n",
        "  si a\n    entonces\n    finsi\n",
        "  mientras a\n    si b\n      entonces\n        leer a\n      sino\n        leer b\n      finsi\n  finmientras\n",
        "  repetir\n    si a\n      entonces\n        escribir a\n      finsi\n  hasta a > 3\n",
        "  para i desde 3 hasta 1\n    repetir\n      leer x\n    hasta x\n  finpara\n",
        "  repetir\n    repetir\n      leer x\n    hasta x\n  hasta y\n",
        "  mientras a\n  finmientras\n  escribir a\n",
        "  si a\n    entonces\n      si b\n        entonces\n          leer c\n        finsi\n    sino\n      leer d\n    finsi\n",
    ];

    for body in bodies {
        let graph = flow(&format!("inicio\n{}fin\n", body));
        assert_well_connected(&graph);
    }
}

#[test]
fn declarations_produce_no_nodes() {
    let graph = flow("inicio\n  entero v[3]\n  cadena s\nfin\n");
    assert_eq!(graph.nodes().len(), 2);
    assert_eq!(graph.edges().len(), 1);
}
