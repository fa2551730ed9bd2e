use std::path::{Path, PathBuf};

use course_recommender::config::PipelineConfig;

/// One CSV row: user, course, completed, rating, skill level.
pub type Row = (String, String, f32, f32, f32);

/// Deterministic synthetic rows spread over `courses` distinct course ids.
pub fn synthetic_rows(rows: usize, courses: usize) -> Vec<Row> {
    (0..rows)
        .map(|i| {
            let user = 100 + i % 12;
            let course = i % courses;
            let completed = ((i * 37) % 101) as f32;
            let rating = (1 + course % 5) as f32;
            let skill = (1 + (course + i / courses) % 3) as f32;
            (
                user.to_string(),
                (500 + course).to_string(),
                completed,
                rating,
                skill,
            )
        })
        .collect()
}

pub fn write_csv(path: &Path, rows: &[Row]) {
    let mut writer = csv::Writer::from_path(path).expect("create csv");
    writer
        .write_record(["User ID", "Course ID", "Completed (%)", "Rating", "Skill Level"])
        .expect("write header");
    for (user, course, completed, rating, skill) in rows {
        writer
            .write_record([
                user.clone(),
                course.clone(),
                completed.to_string(),
                rating.to_string(),
                skill.to_string(),
            ])
            .expect("write row");
    }
    writer.flush().expect("flush csv");
}

/// Config reading `data` and writing into `out_dir`, sized to run quickly.
pub fn quick_config(data: PathBuf, out_dir: PathBuf) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.data_path = data;
    config.output_dir = out_dir;
    config.forest.n_trees = 15;
    config.network.epochs = 4;
    config.network.hidden_layers = vec![16, 16, 8];
    config
}
