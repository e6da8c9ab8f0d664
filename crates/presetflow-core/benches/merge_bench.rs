use criterion::{black_box, criterion_group, criterion_main, Criterion};
use presetflow_core::options::Options;
use serde_json::json;

fn bench_layered_merge(c: &mut Criterion) {
    let preset = json!({
        "babel": {"presets": ["env"], "plugins": ["transform-runtime"]},
        "webpack": {"entry": ["src/index.js"], "devtool": "source-map"},
        "minify": false
    });
    let project = json!({
        "babel": {"presets": ["react"]},
        "webpack": {"entry": ["src/polyfills.js"], "output": {"path": "dist"}},
        "minify": true
    });
    let cli = json!({"debug": true, "mode": "production"});

    c.bench_function("layered_merge", |b| {
        b.iter(|| {
            let mut options = Options::new();
            options.update(black_box(preset.clone()));
            options.update(black_box(project.clone()));
            options.update(black_box(cli.clone()));
            options
        })
    });
}

criterion_group!(benches, bench_layered_merge);
criterion_main!(benches);
