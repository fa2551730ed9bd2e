//! Developer utility: load trained artifacts and print top-k courses for one user.

use std::path::PathBuf;

use course_recommender::recommend::{ForestRecommender, Recommender};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let (recommendations, created_at) = if options.forest {
        let recommender =
            ForestRecommender::load(&options.artifacts).map_err(|err| err.to_string())?;
        let recommendations = recommender
            .recommend(
                &options.user_id,
                options.completed,
                options.skill_level,
                options.top_k,
            )
            .map_err(|err| err.to_string())?;
        (recommendations, recommender.manifest().created_at.clone())
    } else {
        let recommender = Recommender::load(&options.artifacts).map_err(|err| err.to_string())?;
        let recommendations = recommender
            .recommend(
                &options.user_id,
                options.completed,
                options.rating,
                options.skill_level,
                options.top_k,
            )
            .map_err(|err| err.to_string())?;
        (recommendations, recommender.manifest().created_at.clone())
    };

    println!(
        "Top {} courses for user {} (model trained {created_at}):",
        recommendations.len(),
        options.user_id,
    );
    for (rank, rec) in recommendations.iter().enumerate() {
        println!("{:>3}. {:<16} p={:.4}", rank + 1, rec.course_id, rec.probability);
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    artifacts: PathBuf,
    forest: bool,
    user_id: String,
    completed: f32,
    rating: f32,
    skill_level: f32,
    top_k: usize,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut artifacts = PathBuf::from(".");
    let mut forest = false;
    let mut user_id: Option<String> = None;
    let mut completed = 0.0f32;
    let mut rating = 0.0f32;
    let mut skill_level = 0.0f32;
    let mut top_k = 5usize;

    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--artifacts" => artifacts = PathBuf::from(value(&args, &mut idx, flag)?),
            "--forest" => forest = true,
            "--user" => user_id = Some(value(&args, &mut idx, flag)?.to_string()),
            "--completed" => completed = parse(flag, value(&args, &mut idx, flag)?)?,
            "--rating" => rating = parse(flag, value(&args, &mut idx, flag)?)?,
            "--skill" => skill_level = parse(flag, value(&args, &mut idx, flag)?)?,
            "--top" => top_k = parse(flag, value(&args, &mut idx, flag)?)?,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let user_id = user_id.ok_or_else(help_text)?;
    Ok(CliOptions {
        artifacts,
        forest,
        user_id,
        completed,
        rating,
        skill_level,
        top_k,
    })
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
        "course-rec-recommend",
        "",
        "Prints the most likely courses for one user from trained artifacts.",
        "",
        "Usage:",
        "  course-rec-recommend --user <id> [--completed <f>] [--rating <f>] [--skill <f>]",
        "",
        "Options:",
        "  --artifacts <dir>      Artifact directory (default current directory).",
        "  --forest               Use forest_manifest.json instead of the network artifacts.",
        "  --user <id>            User ID as it appears in the training CSV (required).",
        "  --completed <f>        Completion percentage (default 0).",
        "  --rating <f>           Rating (default 0, ignored by the forest).",
        "  --skill <f>            Skill level (default 0).",
        "  --top <n>              Number of courses to print (default 5).",
    ]
    .join("\n")
}
