use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mathcheck_core::canonical::Canonicalizer;
use mathcheck_core::normalize::normalize;
use mathcheck_core::parser::{parse, parse_notation};

fn bench_notation(c: &mut Criterion) {
    let mut group = c.benchmark_group("notation");

    let plain = "3x^2 - 2x + 1";
    let latex = r"\left( \frac{1}{2} \right) \cdot \sqrt{8} + \log_{2}\left(16\right)";
    let nested = {
        let mut s = String::from("x");
        for i in 0..30 {
            s = format!("({s} + {i})");
        }
        s
    };

    group.bench_function("normalize_latex", |b| b.iter(|| normalize(black_box(latex))));

    group.bench_function("parse_plain", |b| b.iter(|| parse(black_box(plain))));

    group.bench_function("parse_latex", |b| {
        b.iter(|| parse_notation(black_box(latex)))
    });

    group.bench_function("parse_nested_30", |b| {
        b.iter(|| parse(black_box(&nested)))
    });

    group.finish();
}

fn bench_canonical(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical");
    let canonicalizer = Canonicalizer::default();

    let expand = parse_notation("(x + y + 1)^4").unwrap();
    let surd = parse_notation(r"\frac{3}{\sqrt{12}} + \sqrt{75}").unwrap();

    group.bench_function("expand_trinomial_4", |b| {
        b.iter(|| canonicalizer.canonicalize(black_box(&expand)))
    });

    group.bench_function("surds", |b| {
        b.iter(|| canonicalizer.canonicalize(black_box(&surd)))
    });

    group.finish();
}

fn bench_toml_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("toml_parsing");

    let small_toml = generate_question_set_toml(5);
    let large_toml = generate_question_set_toml(200);

    group.bench_function("5_questions", |b| {
        b.iter(|| {
            mathcheck_core::question::parse_question_set_str(
                black_box(&small_toml),
                black_box("bench.toml".as_ref()),
            )
        })
    });

    group.bench_function("200_questions", |b| {
        b.iter(|| {
            mathcheck_core::question::parse_question_set_str(
                black_box(&large_toml),
                black_box("bench.toml".as_ref()),
            )
        })
    });

    group.finish();
}

fn generate_question_set_toml(n: usize) -> String {
    let mut s = String::new();
    s.push_str(
        r#"[question_set]
id = "bench"
name = "Benchmark"
"#,
    );
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[questions]]
id = "q{i}"
title = "Solve x^2 = {sq}"

[[questions.parts]]
id = "a"
slots = [["{i}", "-{i}"], ["{i}", "-{i}"]]

[[questions.parts]]
id = "b"
slots = [{{ alternatives = ['\frac{{{i}}}{{2}}', "{half}"] }}]
"#,
            sq = i * i,
            half = i as f64 / 2.0,
        ));
    }
    s
}

criterion_group!(benches, bench_notation, bench_canonical, bench_toml_parsing);
criterion_main!(benches);
