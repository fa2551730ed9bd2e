//! Trains the random forest course recommender and writes its artifacts.
//!
//! With no arguments it reads `training_data.csv` and writes
//! `course_recommender.forest.json` plus `forest_manifest.json` to the current
//! directory.

use std::path::PathBuf;

use course_recommender::config::PipelineConfig;
use course_recommender::logging;
use course_recommender::ml::metrics::format_confusion_matrix;
use course_recommender::pipeline::forest;

/// Confusion matrices wider than this are not printed.
const MAX_PRINTED_CLASSES: usize = 20;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config =
        PipelineConfig::load_or_default(options.config.as_deref()).map_err(|err| err.to_string())?;
    options.apply(&mut config);
    if let Err(err) = logging::init(&config.logging) {
        eprintln!("Logging disabled: {err}");
    }

    let report = forest::run(&config).map_err(|err| err.to_string())?;

    let summary = &report.evaluation.summary;
    println!(
        "test accuracy: {:.4} ({} samples, {} trees)",
        summary.accuracy,
        summary.samples,
        report.model.trees.len()
    );
    for metric in &summary.per_class {
        println!(
            "course {:<16}  precision={:.3}  recall={:.3}  support={}",
            metric.class_id, metric.precision, metric.recall, metric.support
        );
    }
    if report.model.classes.len() <= MAX_PRINTED_CLASSES {
        println!("confusion matrix (rows=true, cols=pred):");
        for row in format_confusion_matrix(&report.evaluation.confusion) {
            println!("{row}");
        }
    }
    println!(
        "Model trained and saved as {}",
        report.model_path.display()
    );
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    data: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    seed: Option<u64>,
    test_fraction: Option<f64>,
    trees: Option<usize>,
    max_depth: Option<usize>,
    log_dir: Option<PathBuf>,
}

impl CliOptions {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(out_dir) = &self.out_dir {
            config.output_dir = out_dir.clone();
        }
        if let Some(seed) = self.seed {
            config.split.seed = seed;
        }
        if let Some(fraction) = self.test_fraction {
            config.split.test_fraction = fraction;
        }
        if let Some(trees) = self.trees {
            config.forest.n_trees = trees;
        }
        if self.max_depth.is_some() {
            config.forest.max_depth = self.max_depth;
        }
        if let Some(dir) = &self.log_dir {
            config.logging.directory = Some(dir.clone());
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--config" => options.config = Some(PathBuf::from(value(&args, &mut idx, flag)?)),
            "--data" => options.data = Some(PathBuf::from(value(&args, &mut idx, flag)?)),
            "--out-dir" => options.out_dir = Some(PathBuf::from(value(&args, &mut idx, flag)?)),
            "--log-dir" => options.log_dir = Some(PathBuf::from(value(&args, &mut idx, flag)?)),
            "--seed" => options.seed = Some(parse(flag, value(&args, &mut idx, flag)?)?),
            "--test-fraction" => {
                options.test_fraction = Some(parse(flag, value(&args, &mut idx, flag)?)?)
            }
            "--trees" => options.trees = Some(parse(flag, value(&args, &mut idx, flag)?)?),
            "--max-depth" => options.max_depth = Some(parse(flag, value(&args, &mut idx, flag)?)?),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn value<'a>(args: &'a [String], idx: &mut usize, flag: &str) -> Result<&'a str, String> {
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "course-rec-train-forest",
        "",
        "Trains a random forest course recommender from a CSV of user/course records.",
        "",
        "Usage:",
        "  course-rec-train-forest [--data training_data.csv] [--out-dir .]",
        "",
        "Options:",
        "  --config <file>        TOML config; flags below override it.",
        "  --data <file>          Training CSV (default training_data.csv).",
        "  --out-dir <dir>        Artifact directory (default current directory).",
        "  --seed <n>             Split and bootstrap seed (default 42).",
        "  --test-fraction <f>    Held-out fraction (default 0.2).",
        "  --trees <n>            Number of trees (default 100).",
        "  --max-depth <n>        Limit tree depth (default unlimited).",
        "  --log-dir <dir>        Write log files here instead of the app directory.",
    ]
    .join("\n")
}
