use pretty_assertions::assert_eq;
use pseudoc::{
    source::Source,
    target::{shift, Backend, Options},
};

const PROGRAM: &str = "\
funcion mayor(a, b)
  si a > b
    entonces
      retornar a
    finsi
  retornar b
fin
inicio
  entero v[4]
  para i desde 1 hasta 4
    leer v[i]
  finpara
  m <- v[1]
  para i desde 2 hasta 4
    m <- mayor(m, v[i])
  finpara
  repetir
    escribir \"m = \", m
    m <- m - 1
  hasta m < 0
  paso extraño
fin
";

#[test]
fn one_based_indices_map_to_zero_based() {
    for size in 1..=16 {
        for index in 1..=size {
            assert_eq!(shift(&index.to_string()), (index - 1).to_string());
        }
    }

    assert_eq!(shift("i"), "i - 1");
    assert_eq!(shift("i + 1"), "(i + 1) - 1");
}

#[test]
fn declared_arrays_read_with_shifted_indices() {
    for size in 1..=8 {
        let mut text = format!("inicio\n  entero numeros[{}]\n", size);
        for index in 1..=size {
            text.push_str(&format!("  leer numeros[{}]\n", index));
        }

        text.push_str("fin\n");

        let output = pseudoc::analyze(&Source::new("prueba.psc", text))
            .emit_to_string(Backend::C, &Options::default())
            .unwrap();

        for index in 1..=size {
            let read = format!("scanf(\"%d\", &numeros[{}]);", index - 1);
            assert!(output.contains(&read), "missing {}", read);
        }
    }
}

#[test]
fn analysis_is_deterministic() {
    let outputs = || {
        let source = Source::new("prueba.psc", PROGRAM);
        let analysis = pseudoc::analyze(&source);
        let options = Options::default();

        (
            format!("{:?}", analysis.program),
            analysis.diagnostics.report(&source).to_string(),
            analysis.emit_to_string(Backend::C, &options).unwrap(),
            analysis.emit_to_string(Backend::Js, &options).unwrap(),
            analysis.flow().to_string(),
        )
    };

    let first = outputs();
    for _ in 0..3 {
        assert_eq!(outputs(), first);
    }

    // Solo la sentencia desconocida genera un diagnóstico
    assert!(first.1.ends_with("0 errors, 1 warning\n"));
}

#[test]
fn graph_of_a_valid_body_is_connected() {
    let graph = pseudoc::analyze(&Source::new("prueba.psc", PROGRAM)).flow();

    assert!(graph.reachable().into_iter().all(|seen| seen));
    for node in graph.nodes() {
        if node.id != graph.end() {
            assert!(graph.outgoing(node.id).next().is_some());
        }
    }
}
