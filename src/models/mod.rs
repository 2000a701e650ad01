pub mod pipeline;

pub use pipeline::{Pipeline, load_pipeline, model_name};
