use pretty_assertions::assert_eq;
use pseudoc::{
    source::Source,
    target::{Backend, Options},
    Analysis,
};

const SUMA: &str = "\
funcion suma(a, b)
  retornar a + b
fin
inicio
  entero numeros[5]
  leer numeros[1]
  leer x
  escribir \"Total: \", suma(numeros[1], x)
fin
";

fn analyze(text: &str) -> Analysis {
    pseudoc::analyze(&Source::new("prueba.psc", text))
}

fn c(text: &str) -> String {
    analyze(text).emit_to_string(Backend::C, &Options::default()).unwrap()
}

fn js(text: &str) -> String {
    analyze(text).emit_to_string(Backend::Js, &Options::default()).unwrap()
}

#[test]
fn complete_c_program() {
    assert_eq!(
        c(SUMA),
        "\
#include <stdio.h>

int user_suma(int a, int b);

int user_suma(int a, int b) {
    return a + b;
}

int main(void) {
    int x;
    int numeros[5];
    scanf(\"%d\", &numeros[0]);
    scanf(\"%d\", &x);
    printf(\"Total: %d\\n\", user_suma(numeros[0], x));
    return 0;
}
"
    );
}

#[test]
fn c_formats_follow_declared_types() {
    let output = c("\
inicio
  real promedio
  cadena nombre
  caracter letra
  leer promedio
  leer nombre
  leer letra
  escribir nombre, \" tiene \", promedio, \" (\", letra, \") 100%\"
  nombre <- \"nadie\"
fin
");

    assert!(output.contains("    double promedio;\n"));
    assert!(output.contains("    char nombre[256];\n"));
    assert!(output.contains("    char letra;\n"));
    assert!(output.contains("    scanf(\"%lf\", &promedio);\n"));
    assert!(output.contains("    scanf(\"%255s\", nombre);\n"));
    assert!(output.contains("    scanf(\" %c\", &letra);\n"));
    assert!(output.contains(
        "    printf(\"%s tiene %g (%c) 100%%\\n\", nombre, promedio, letra);\n"
    ));
    assert!(output.contains("    snprintf(nombre, 256, \"%s\", \"nadie\");\n"));
}

#[test]
fn buffer_size_is_configurable() {
    let output = analyze("inicio\n  cadena s\n  leer s\nfin\n")
        .emit_to_string(Backend::C, &Options { buffer_size: 32 })
        .unwrap();

    assert!(output.contains("char s[32];"));
    assert!(output.contains("scanf(\"%31s\", s);"));
}

#[test]
fn c_control_flow() {
    let output = c("\
inicio
  leer n
  para i desde 1 hasta n
    si i > 2
      entonces
        escribir i
      sino
        escribir \"chico\"
      finsi
  finpara
  mientras n > 0
    n <- n - 1
  finmientras
fin
");

    assert_eq!(
        output,
        "\
#include <stdio.h>

int main(void) {
    int n;
    int i;
    scanf(\"%d\", &n);
    for (i = 1; i <= n; i++) {
        if (i > 2) {
            printf(\"%d\\n\", i);
        } else {
            printf(\"chico\\n\");
        }
    }
    while (n > 0) {
        n = n - 1;
    }
    return 0;
}
"
    );
}

#[test]
fn c_void_functions_and_calls() {
    let output = c("\
funcion saludar()
  escribir \"hola\"
  retornar
fin
inicio
  llamar saludar()
  saludar()
fin
");

    assert!(output.contains("void user_saludar(void);\n"));
    assert!(output.contains("void user_saludar(void) {\n    printf(\"hola\\n\");\n    return;\n}\n"));
    assert_eq!(output.matches("    user_saludar();\n").count(), 2);
}

#[test]
fn repeat_runs_at_least_once() {
    let text = "inicio\n  repetir\n    leer x\n  hasta(x > 0)\nfin\n";

    assert_eq!(
        c(text),
        "\
#include <stdio.h>

int main(void) {
    int x;
    do {
        scanf(\"%d\", &x);
    } while (!(x > 0));
    return 0;
}
"
    );

    assert!(js(text).contains(
        "    do {
        x = await __read(__host, \"x\");
        __trace(__host, 3, [__show(x)], null);
    } while (!(x > 0));
"
    ));
}

#[test]
fn unbalanced_blocks_are_closed_in_output() {
    let output = c("inicio\n  mientras x > 0\n    leer x\n");
    assert_eq!(output.matches('{').count(), output.matches('}').count());

    let output = js("inicio\n  mientras x > 0\n    leer x\n  finpara\n  finsi\nfin\n");
    assert_eq!(output.matches("while (x > 0) {").count(), 1);
    assert_eq!(output.matches('{').count(), output.matches('}').count());
}

#[test]
fn js_module_shape() {
    let output = js(SUMA);

    assert!(output.contains(
        "export const SLOTS = [
    [\"inicio\", \"numeros\"],
    [\"inicio\", \"x\"],
    [\"suma\", \"a\"],
    [\"suma\", \"b\"],
];
"
    ));

    assert!(output.contains(
        "async function user_suma(__host, a, b) {
    __trace(__host, 2, [\"\", \"\", __LIBERADA, __LIBERADA], null);
    return a + b;
}
"
    ));

    assert!(output.contains(
        "export async function main(__host) {
    let numeros, x;
    numeros = Array.from({ length: 5 });
    __trace(__host, 5, [__show(numeros), __show(x), \"\", \"\"], null);
    numeros[0] = await __read(__host, \"numeros[1]\");
    __trace(__host, 6, [__show(numeros), __show(x), \"\", \"\"], null);
"
    ));

    assert!(output.contains(
        "    {
        const __salida = \"Total: \" + __show(await user_suma(__host, numeros[0], x));
        __host.write(__salida);
        __trace(__host, 8, [__show(numeros), __show(x), \"\", \"\"], __salida);
    }
"
    ));
}

#[test]
fn js_while_keeps_condition_text() {
    let output = js("inicio\n  leer x\n  mientras(x!=0)\n    x <- x - 1\n  finmientras\nfin\n");

    assert!(output.contains("    while (x!=0) {\n        x = x - 1;\n"));
    assert!(output.contains("        __trace(__host, 4, [__show(x)], null);\n"));
}

#[test]
fn js_counted_loop_picks_direction_at_run_time() {
    let output = js("inicio\n  para i desde 10 hasta 1\n    escribir i\n  finpara\nfin\n");

    assert!(output.contains(
        "    {
        const __desde2 = 10;
        const __hasta2 = 1;
        const __paso2 = __desde2 <= __hasta2 ? 1 : -1;
        for (i = __desde2; __paso2 > 0 ? i <= __hasta2 : i >= __hasta2; i += __paso2) {
            __trace(__host, 2, [__show(i)], null);
"
    ));

    // El código C se mantiene ascendente
    assert!(c("inicio\n  para i desde 10 hasta 1\n    escribir i\n  finpara\nfin\n")
        .contains("for (i = 10; i <= 1; i++) {"));
}

#[test]
fn js_scalar_declarations_outside_slots() {
    let output = js("inicio\n  entero x\n  cadena s\n  leer y\n  leer x\n  escribir s\nfin\n");

    assert!(output.contains("export const SLOTS = [\n    [\"inicio\", \"y\"],\n    [\"inicio\", \"x\"],\n];\n"));
    assert!(output.contains(
        "export async function main(__host) {
    let y, x;
    let s;
    y = await __read(__host, \"y\");
"
    ));
    assert_eq!(output.matches("let x").count(), 0);
}

#[test]
fn emitting_to_string_keeps_unicode_text() {
    let output = analyze("inicio\n  escribir \"año: \", 2024\nfin\n")
        .emit_to_string(Backend::C, &Options::default());

    assert!(output.unwrap().contains("printf(\"año: %d\\n\", 2024);"));
}
