//! Trains the dense network course recommender and writes its artifacts.
//!
//! With no arguments it reads `training_data.csv` and writes the network, both
//! id encoders, the scaler and `network_manifest.json` to the current
//! directory.

use std::path::PathBuf;

use course_recommender::config::PipelineConfig;
use course_recommender::logging;
use course_recommender::pipeline::network;

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

    let report = network::run(&config).map_err(|err| err.to_string())?;

    if let Some(last) = report.history.last() {
        println!(
            "epoch {}: loss={:.4} accuracy={:.4} val_loss={} val_accuracy={}",
            last.epoch,
            last.loss,
            last.accuracy,
            format_optional(last.val_loss),
            format_optional(last.val_accuracy)
        );
    }
    let summary = &report.evaluation.summary;
    println!(
        "test accuracy: {:.4} ({} samples, {} classes, {} parameters)",
        summary.accuracy,
        summary.samples,
        report.model.classes.len(),
        report.model.parameter_count()
    );
    println!(
        "Model trained and saved as {}",
        report.model_path.display()
    );
    Ok(())
}

fn format_optional(value: Option<f32>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    data: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    seed: Option<u64>,
    test_fraction: Option<f64>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f32>,
    hidden_layers: Option<Vec<usize>>,
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
        if let Some(epochs) = self.epochs {
            config.network.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.network.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            config.network.learning_rate = lr;
        }
        if let Some(hidden) = &self.hidden_layers {
            config.network.hidden_layers = hidden.clone();
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
            "--epochs" => options.epochs = Some(parse(flag, value(&args, &mut idx, flag)?)?),
            "--batch" => options.batch_size = Some(parse(flag, value(&args, &mut idx, flag)?)?),
            "--learning-rate" => {
                options.learning_rate = Some(parse(flag, value(&args, &mut idx, flag)?)?)
            }
            "--hidden" => {
                let raw = value(&args, &mut idx, flag)?;
                let widths = raw
                    .split(',')
                    .map(|part| parse::<usize>(flag, part.trim()))
                    .collect::<Result<Vec<_>, _>>()?;
                options.hidden_layers = Some(widths);
            }
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
        "course-rec-train-network",
        "",
        "Trains a dense neural network course recommender from a CSV of user/course records.",
        "",
        "Usage:",
        "  course-rec-train-network [--data training_data.csv] [--out-dir .]",
        "",
        "Options:",
        "  --config <file>        TOML config; flags below override it.",
        "  --data <file>          Training CSV (default training_data.csv).",
        "  --out-dir <dir>        Artifact directory (default current directory).",
        "  --seed <n>             Split, init and shuffle seed (default 42).",
        "  --test-fraction <f>    Held-out fraction (default 0.2).",
        "  --epochs <n>           Training epochs (default 50).",
        "  --batch <n>            Batch size (default 8).",
        "  --learning-rate <f>    Adam learning rate (default 0.001).",
        "  --hidden <a,b,c>       Hidden layer widths (default 64,128,64).",
        "  --log-dir <dir>        Write log files here instead of the app directory.",
    ]
    .join("\n")
}
