//! Progress commentary

use crate::domain::{Project, TaskStatus};

/// Short advice for a completion percentage
pub fn review_progress(percent: f64) -> &'static str {
    if percent >= 80.0 {
        "Great progress: prepare the release, run a retro and stabilize."
    } else if percent >= 50.0 {
        "Good momentum. Focus on the tasks with the highest value."
    } else {
        "Build the end-to-end MVP and remove the key blockers."
    }
}

/// Share of done tasks across `projects`, rounded to two decimals
pub fn completion_percent<'a>(projects: impl IntoIterator<Item = &'a Project>) -> f64 {
    let (done, total) = projects
        .into_iter()
        .flat_map(|p| p.tasks.iter())
        .fold((0usize, 0usize), |(done, total), t| {
            (done + usize::from(t.status == TaskStatus::Done), total + 1)
        });

    if total == 0 {
        return 0.0;
    }
    ((done as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
}
