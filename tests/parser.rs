use pretty_assertions::assert_eq;
use pseudoc::{
    classify::Shape,
    error::Severity,
    ir::ScopeId,
    source::Source,
    Analysis,
};

fn analyze(text: &str) -> Analysis {
    pseudoc::analyze(&Source::new("prueba.psc", text))
}

fn messages(analysis: &Analysis) -> Vec<&str> {
    analysis
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.message())
        .collect()
}

#[test]
fn unknown_statement_is_kept_with_one_warning() {
    let analysis = analyze("inicio\n  leer x\n  hola que tal\nfin\n");

    assert_eq!(messages(&analysis), vec!["Unrecognized statement"]);
    assert_eq!(
        analysis.diagnostics.iter().next().map(|d| d.severity()),
        Some(Severity::Warning)
    );

    let last = analysis.program.main.last().unwrap();
    assert_eq!(last.text, "hola que tal");
    assert_eq!(last.shape, Shape::Unknown);
    assert_eq!(last.line, 3);
}

#[test]
fn statements_belong_to_their_scope() {
    let analysis = analyze(
        "\
funcion saludar(nombre)
  escribir \"Hola \", nombre
fin
inicio
  cadena persona
  leer persona
  llamar saludar(persona)
fin
",
    );

    assert!(analysis.diagnostics.is_empty());

    let function = &analysis.program.functions[0];
    assert_eq!(function.name, "saludar");
    assert_eq!(function.parameters, vec!["nombre"]);
    assert_eq!(function.body.len(), 1);
    assert!(!function.returns_value());

    let main: Vec<_> = analysis.program.main.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(main, vec!["cadena persona", "leer persona", "llamar saludar(persona)"]);

    let slots: Vec<_> = analysis
        .tables
        .scope(ScopeId::Function(0))
        .unwrap()
        .names()
        .collect();

    assert_eq!(slots, vec!["nombre"]);
}

#[test]
fn keywords_are_case_insensitive() {
    let analysis = analyze("INICIO\n  Leer x\n  MIENTRAS x > 0\n    x <- x - 1\n  FinMientras\nFIN\n");
    assert!(analysis.diagnostics.is_empty());
    assert_eq!(analysis.program.main.len(), 4);
}

#[test]
fn balanced_blocks_produce_no_structural_errors() {
    let analysis = analyze(
        "\
inicio
  entero v[3]
  para i desde 1 hasta 3
    repetir
      leer v[i]
    hasta v[i] > 0
  finpara
  si v[1] > v[2]
    entonces
      mientras v[1] > 0
        v[1] <- v[1] - 1
      finmientras
    sino
      escribir \"no\"
    finsi
fin
",
    );

    assert_eq!(messages(&analysis), Vec::<&str>::new());
}

#[test]
fn every_unclosed_frame_is_reported() {
    let analysis = analyze("inicio\n  mientras x > 0\n    si x\n      entonces\n        leer x\n");

    assert_eq!(
        messages(&analysis),
        vec![
            "Unclosed `inicio` block, expected `fin`",
            "Unclosed `mientras` block, expected `finmientras`",
            "Unclosed `si` block, expected `finsi`",
        ]
    );
}

#[test]
fn else_keeps_the_branch_level() {
    // `sino` va al nivel de `entonces`; su rama vuelve a subir un nivel
    let analysis = analyze(
        "\
inicio
  si x
    entonces
      leer x
    sino
      leer y
    finsi
  escribir x
fin
",
    );

    assert!(analysis.diagnostics.is_empty());

    let analysis = analyze("inicio\n  si x\n    entonces\n      leer x\n  sino\n      leer y\n    finsi\nfin\n");
    assert_eq!(messages(&analysis), vec!["Expected an indentation of 4 spaces, found 2"]);
}

#[test]
fn missing_then_is_reported_at_the_conditional() {
    let analysis = analyze("inicio\n  si x\n    leer x\n  finsi\nfin\n");
    assert_eq!(messages(&analysis), vec!["`si` is missing its `entonces`"]);
}

#[test]
fn statements_outside_main_warn() {
    let analysis = analyze("leer x\ninicio\nfin\n");
    assert_eq!(
        messages(&analysis),
        vec!["Statement outside of any function or `inicio` section"]
    );

    assert_eq!(analysis.program.main.len(), 1);
}

#[test]
fn report_points_at_the_source() {
    let source = Source::new("prueba.psc", "inicio\n   leer x\nfin\n");
    let analysis = pseudoc::analyze(&source);

    assert_eq!(
        analysis.diagnostics.report(&source).to_string(),
        "\
error: Expected an indentation of 2 spaces, found 3
 --> prueba.psc:2:1
  |
2 |    leer x
  | ^^^

1 error, 0 warnings
"
    );
}

#[test]
fn clean_report() {
    let source = Source::new("prueba.psc", "inicio\nfin\n");
    let analysis = pseudoc::analyze(&source);
    assert_eq!(
        analysis.diagnostics.report(&source).to_string(),
        "No problems were reported\n"
    );
}
