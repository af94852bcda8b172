use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::export::{export_grammar_modules, export_vocab_decks};
use crate::extractor::{ExtractOptions, extract_transcript_data};
use crate::generator::{DeckPolicy, LearningPath, PathOverrides, create_learning_path};
use crate::models::*;
use crate::registry::{Curriculum, PatternRegistry};
use crate::srt::parse_transcript_file;
use crate::store::{PathStore, SqlitePathStore, TranscriptMetadata, UploadRequest};
use crate::tokenizer::{LlmTokenizer, Tokenizer};

/// 提取 + 生成 两个阶段共用的参数
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub curriculum: Curriculum,
    pub concurrent_requests: usize,
    pub policy: DeckPolicy,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            curriculum: config.path.curriculum,
            concurrent_requests: config.processing.concurrent_requests,
            policy: config.path.deck_policy(),
        }
    }
}

/// 提取字幕数据并生成学习路径
pub async fn run_pipeline<T>(
    tokenizer: &T,
    registry: &PatternRegistry,
    lines: &[TranscriptLine],
    options: &PipelineOptions,
    overrides: Option<&PathOverrides>,
) -> Result<(ExtractedData, LearningPath)>
where
    T: Tokenizer + ?Sized,
{
    let extract_options = ExtractOptions {
        curriculum: options.curriculum,
        concurrent_requests: options.concurrent_requests,
    };

    let extracted = extract_transcript_data(tokenizer, registry, lines, extract_options).await?;
    let path = create_learning_path(
        &extracted,
        options.curriculum,
        registry,
        &options.policy,
        overrides,
    );

    Ok((extracted, path))
}

/// 一次处理的结果
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub path_id: i64,
    pub extracted: ExtractedData,
    pub path: LearningPath,
}

pub struct PathCreator {
    tokenizer: Arc<dyn Tokenizer>,
    registry: PatternRegistry,
    store: Arc<dyn PathStore>,
    pub config: Config,
}

impl PathCreator {
    pub async fn new(config: Config) -> Result<Self> {
        let registry = PatternRegistry::load(&config.input.registry_file)?;
        let api_client = ApiClient::new(config.api.clone(), config.processing.clone())?;
        let tokenizer = LlmTokenizer::new(api_client, &registry, config.path.curriculum);
        let store = SqlitePathStore::open(&config.database.db_file).await?;

        Ok(Self::with_parts(
            config,
            Arc::new(tokenizer),
            registry,
            Arc::new(store),
        ))
    }

    /// 使用自定义的分词器和存储
    pub fn with_parts(
        config: Config,
        tokenizer: Arc<dyn Tokenizer>,
        registry: PatternRegistry,
        store: Arc<dyn PathStore>,
    ) -> Self {
        PathCreator {
            tokenizer,
            registry,
            store,
            config,
        }
    }

    /// 处理字幕文件：解析、提取、生成路径、导出卡片并保存
    pub async fn process_transcript_file<P: AsRef<Path>>(
        &self,
        transcript_file: P,
        overrides: Option<&PathOverrides>,
    ) -> Result<ProcessOutcome> {
        let transcript_file = transcript_file.as_ref();
        info!("📖 读取字幕文件: {}", transcript_file.display());

        let lines = parse_transcript_file(transcript_file).await?;
        if lines.is_empty() {
            warn!("⚠️  字幕文件中没有可用的字幕");
        }

        let name = self
            .config
            .input
            .transcript_name
            .clone()
            .or_else(|| {
                transcript_file
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "transcript".to_string());

        self.process_lines(&name, &lines, overrides).await
    }

    pub async fn process_lines(
        &self,
        name: &str,
        lines: &[TranscriptLine],
        overrides: Option<&PathOverrides>,
    ) -> Result<ProcessOutcome> {
        let options = PipelineOptions::from_config(&self.config);

        info!("🔄 第一步：提取语法点和单词...");
        let (extracted, path) =
            run_pipeline(self.tokenizer.as_ref(), &self.registry, lines, &options, overrides).await?;

        info!("💾 第二步：保存学习路径...");
        let metadata = TranscriptMetadata {
            name: name.to_string(),
            show_name: self.config.input.show_name.clone(),
            episode_name: self.config.input.episode_name.clone(),
            transcript_data: extracted.transcript.clone(),
        };
        let request = UploadRequest::from_path(&self.config.input.user_id, metadata, &path);
        let path_id = self.store.upload_path(&request).await?;

        // 只导出已经保存成功的路径
        info!("📄 第三步：导出卡片文件...");
        export_vocab_decks(&path, &extracted.transcript, &self.config.output.vocab_file)?;
        export_grammar_modules(&path, &extracted.transcript, &self.config.output.grammar_file)?;

        Ok(ProcessOutcome {
            path_id,
            extracted,
            path,
        })
    }
}
