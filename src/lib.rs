pub mod error;
pub mod config;
pub mod models;
pub mod api;
pub mod srt;
pub mod registry;
pub mod tokenizer;
pub mod extractor;
pub mod generator;
pub mod store;
pub mod export;
pub mod pipeline;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use models::*;
pub use extractor::{ExtractOptions, extract_transcript_data};
pub use generator::{DeckPolicy, LearningPath, PathOverrides, create_learning_path};
pub use pipeline::{PathCreator, PipelineOptions, ProcessOutcome, run_pipeline};
pub use registry::{Curriculum, PatternRegistry};
pub use tokenizer::{LlmTokenizer, Tokenizer};
