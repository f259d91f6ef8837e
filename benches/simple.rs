use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strval_approx::grammar::HotspotIds;
use strval_approx::parser::parse_grammar;
use strval_approx::Engine;

fn run_pipeline(engine: &Engine, grammar_text: &str, hotspots: &HotspotIds) {
    engine.approximate(grammar_text, hotspots).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut c = c.benchmark_group("Simple");
    c.measurement_time(Duration::from_secs(10)).sample_size(100);
    let engine = Engine::new();

    let left = "A -> a | B\nB -> Ab\n";
    let hotspots = HotspotIds::from_iter([0]);
    c.bench_function("left recursion", |b| {
        b.iter(|| run_pipeline(black_box(&engine), left, &hotspots))
    });
    c.bench_function("left recursion (parse only)", |b| {
        b.iter(|| parse_grammar(black_box(left)).unwrap())
    });

    let nederhof = "S -> Aa\nA -> SB | Bb\nB -> Bc | d\n";
    c.bench_function("Nederhof three-nonterminal example", |b| {
        b.iter(|| run_pipeline(black_box(&engine), nederhof, &hotspots))
    });

    let mutually_recursive = "S -> TS | a\nT -> SP\nP -> +\n";
    c.bench_function("mutually recursive arithmetic chain", |b| {
        b.iter(|| run_pipeline(black_box(&engine), mutually_recursive, &hotspots))
    });

    let tainted_replace = "A -> F | replace[f,x](F)\nF -> fF | f\n";
    c.bench_function("tainted replace over right recursion", |b| {
        b.iter(|| run_pipeline(black_box(&engine), tainted_replace, &hotspots))
    });

    // Many alternatives on one nonterminal stress C5's fix-point worklist
    // (each alternative feeds the same charset union) more than a two-rule
    // grammar does.
    let mut wide = String::from("A -> a | B\n");
    for c in 'c'..='v' {
        wide.push_str(&format!("B -> Ab | {c}\n"));
    }
    c.bench_function("many-alternative fix-point", |b| {
        b.iter(|| run_pipeline(black_box(&engine), &wide, &hotspots))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
