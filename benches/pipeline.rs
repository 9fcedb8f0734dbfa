//! Benchmarks for the packmap pipeline.

use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use packmap::glyph::{render_glyph, BuiltinFace, RasterOptions};
use packmap::resolve::{resolve_path, DestinationRules};
use packmap::{merge_json, render_json, render_text, Colour, RenderOptions, Scope, ScopeMap, TargetSpec};

fn letters_scope() -> ScopeMap {
    let letters: Vec<Value> = ('a'..='z').map(|c| json!(format!("u{:04x}", c as u32))).collect();
    let mut scope = ScopeMap::new();
    scope.insert("letters".to_string(), Value::Array(letters));
    scope.insert("namespace".to_string(), json!("edu_tools"));
    scope
}

// -- Templating benchmarks --

fn bench_templating(c: &mut Criterion) {
    let mut group = c.benchmark_group("templating");

    let layer = letters_scope();
    let scope = Scope::from_layers([&layer]);

    let text = "{{#each letters as l}}tile.{{namespace}}:{{l}}.name={{l}}\n{{/each}}";
    let document = json!({
        "format_version": "1.20.0",
        "blocks": {
            "$each": "letters",
            "as": "l",
            "into": "object",
            "do": { "{{namespace}}:{{l}}": { "textures": "{{l}}", "sound": "stone" } }
        }
    });

    group.bench_function("render_text_each", |b| {
        b.iter(|| render_text(black_box(text), &scope, RenderOptions::default()).unwrap())
    });

    group.bench_function("render_json_each", |b| {
        b.iter(|| render_json(black_box(&document), &scope, RenderOptions::default()).unwrap())
    });

    group.finish();
}

// -- Resolution benchmarks --

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    let fragments: Vec<Value> = (0..64)
        .map(|i| json!({ "texture_data": { format!("u{:04x}", i): { "textures": format!("textures/blocks/{}", i) } } }))
        .collect();

    group.bench_function("merge_64_fragments", |b| {
        b.iter(|| {
            let mut base = json!({ "resource_pack_name": "vanilla", "texture_data": {} });
            for fragment in &fragments {
                merge_json(&mut base, black_box(fragment.clone()));
            }
            base
        })
    });

    let rules = DestinationRules::new()
        .with_rule(".png", "RP/textures/blocks")
        .with_rule(".block.json", "BP/blocks")
        .with_rule(".lang", "RP/texts");
    let sources: Vec<PathBuf> = (0..64)
        .map(|i| PathBuf::from(format!("letter_blocks/group{}/u{:04x}.block.png", i % 4, i)))
        .collect();

    group.bench_function("resolve_auto_flat_subfolder", |b| {
        b.iter(|| {
            for source in &sources {
                resolve_path(black_box(source), &TargetSpec::AutoFlatSubfolder, &rules).unwrap();
            }
        })
    });

    group.finish();
}

// -- Glyph benchmarks --

fn bench_glyphs(c: &mut Criterion) {
    let mut group = c.benchmark_group("glyphs");

    let face = BuiltinFace;
    let plain = RasterOptions {
        width: 64,
        height: 64,
        font_size: 48.0,
        color: Colour::WHITE,
        supersample: 1,
    };
    let antialiased = RasterOptions {
        supersample: 4,
        ..plain
    };

    group.bench_function("render_glyph_64", |b| {
        b.iter(|| render_glyph(&face, black_box('A'), &plain, None).unwrap())
    });

    group.bench_function("render_glyph_64_supersampled", |b| {
        b.iter(|| render_glyph(&face, black_box('A'), &antialiased, None).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_templating, bench_resolution, bench_glyphs);
criterion_main!(benches);
