//! Roadmap generation
//!
//! Turns a free-text idea into a short description plus a task list.

mod parse;
mod pipeline;
mod types;

pub use parse::{ParseError, extract_json, parse_roadmap, validate};
pub use pipeline::{PipelineSettings, RoadmapPipeline, fallback_roadmap};
pub use types::{MAX_TASKS, RoadmapOrigin, RoadmapResult, TARGET_TASKS};
