use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use course_recommender::ml::forest::{self, train_forest};
use course_recommender::ml::network::{self, train_network};
use course_recommender::ml::{OneHotDataset, TrainDataset};

const ROWS: usize = 400;
const CLASSES: usize = 10;

fn synthetic() -> (Vec<Vec<f32>>, Vec<usize>) {
    (0..ROWS)
        .map(|i| {
            let class = i % CLASSES;
            let row = vec![
                (i % 25) as f32,
                ((i * 37) % 101) as f32 / 100.0,
                (class % 5) as f32 / 4.0,
                ((class + i / CLASSES) % 3) as f32 / 2.0,
            ];
            (row, class)
        })
        .unzip()
}

fn names(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn bench_forest(c: &mut Criterion) {
    let (x, y) = synthetic();
    let data = TrainDataset {
        feature_names: names("f", 4),
        classes: names("c", CLASSES),
        x,
        y,
    };
    for trees in [10usize, 100] {
        let options = forest::TrainOptions {
            n_trees: trees,
            ..forest::TrainOptions::default()
        };
        c.bench_with_input(BenchmarkId::new("forest_train", trees), &options, |b, options| {
            b.iter(|| train_forest(black_box(&data), options).expect("train forest"));
        });
    }
}

fn bench_network_epoch(c: &mut Criterion) {
    let (x, y) = synthetic();
    let targets = y
        .iter()
        .map(|&label| {
            let mut row = vec![0.0f32; CLASSES];
            row[label] = 1.0;
            row
        })
        .collect();
    let data = OneHotDataset {
        feature_names: names("f", 4),
        classes: names("c", CLASSES),
        x,
        targets,
    };
    let options = network::TrainOptions {
        epochs: 1,
        ..network::TrainOptions::default()
    };
    c.bench_function("network_epoch", |b| {
        b.iter(|| train_network(black_box(&data), None, &options, |_| {}).expect("train network"));
    });
}

criterion_group!(benches, bench_forest, bench_network_epoch);
criterion_main!(benches);
