//! Performance benchmarks for doxfind
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use doxfind::index::{LoadOptions, SearchTable};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";

/// Generate one shard's source with `count` overloaded records
fn shard_source(letter: char, count: usize) -> String {
    let mut src = String::from("var searchData=\n[\n");
    for i in 0..count {
        src.push_str(&format!(
            "  ['{l}ample_5fname{i}',['{L}ample_Name{i}',['../class_{l}_owner{i}.html#a{i:032x}',1,'{L}Owner{i}::{L}ample_Name{i}()'],['../struct_{l}_data.html#b{i:032x}',1,'{L}Data::{L}ample_Name{i}(const Arg &amp;arg)']]],\n",
            l = letter,
            L = letter.to_ascii_uppercase(),
            i = i
        ));
    }
    src.push_str("];\n");
    src
}

/// Create a search directory with one shard per letter
fn create_benchmark_fixtures(per_shard: usize) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let search_dir = temp_dir.path().join("html").join("search");
    fs::create_dir_all(&search_dir).expect("Failed to create search dir");

    for (n, letter) in LETTERS.chars().enumerate() {
        fs::write(
            search_dir.join(format!("all_{:x}.js", n)),
            shard_source(letter, per_shard),
        )
        .expect("Failed to write shard");
    }
    fs::write(
        search_dir.join("searchdata.js"),
        format!(
            "var indexSectionsWithContent = {{ 0: \"{}\" }};\nvar indexSectionNames = {{ 0: \"all\" }};\nvar indexSectionLabels = {{ 0: \"All\" }};\n",
            LETTERS
        ),
    )
    .expect("Failed to write catalog");

    let root_path = temp_dir.path().to_path_buf();
    (temp_dir, root_path)
}

fn open(root: &Path) -> SearchTable {
    SearchTable::open(root, &LoadOptions::default()).expect("Failed to open index")
}

fn bench_shard_parsing(c: &mut Criterion) {
    let small = shard_source('g', 10);
    let large = shard_source('g', 1000);

    let mut group = c.benchmark_group("shard_parsing");
    group.bench_function("10_records", |b| {
        b.iter(|| doxfind::index::parse_search_data(black_box(&small)))
    });
    group.bench_function("1000_records", |b| {
        b.iter(|| doxfind::index::parse_search_data(black_box(&large)))
    });
    group.finish();
}

fn bench_query_parsing(c: &mut Criterion) {
    let queries = vec![
        "simple",
        "two words",
        "\"exact phrase\"",
        "^prefix",
        "scope:Engine init",
        "kind:class section:functions render",
        "re:/get_\\w+/",
        "(render | update) -element",
    ];

    let mut group = c.benchmark_group("query_parsing");
    for query in queries {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, &q| {
            b.iter(|| doxfind::query::parse_query(black_box(q)))
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let (_temp_dir, root_path) = create_benchmark_fixtures(200);
    let table = open(&root_path);

    let mut group = c.benchmark_group("lookup");

    group.bench_function("substring", |b| {
        b.iter(|| doxfind::query::lookup(&table, black_box("name12")))
    });

    group.bench_function("empty", |b| {
        b.iter(|| doxfind::query::lookup(&table, black_box("")))
    });

    group.bench_function("no_match", |b| {
        b.iter(|| doxfind::query::lookup(&table, black_box("zzzz")))
    });

    // Full query pipeline with a filter
    group.bench_function("scope_filter", |b| {
        let query = doxfind::query::parse_query("scope:Data name1");
        b.iter(|| {
            let executor = doxfind::query::QueryExecutor::new(&table);
            executor.execute(black_box(&query))
        })
    });

    group.bench_function("regex", |b| {
        let query = doxfind::query::parse_query("re:/name\\d{3}$/");
        b.iter(|| {
            let executor = doxfind::query::QueryExecutor::new(&table);
            executor.execute(black_box(&query))
        })
    });

    group.finish();
}

fn bench_table_loading(c: &mut Criterion) {
    let (_temp_dir, root_path) = create_benchmark_fixtures(200);

    c.bench_function("table_open", |b| b.iter(|| open(black_box(&root_path))));

    let table = open(&root_path);
    c.bench_function("table_merge", |b| b.iter(|| black_box(&table).merged()));
}

criterion_group!(
    benches,
    bench_shard_parsing,
    bench_query_parsing,
    bench_lookup,
    bench_table_loading,
);

criterion_main!(benches);
