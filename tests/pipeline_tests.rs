mod common;

use common::*;
use path_creator::store::SqlitePathStore;
use path_creator::{Config, LearningPathModule, PathCreator, PipelineError, PipelineOptions, run_pipeline};
use std::sync::Arc;
use tempfile::TempDir;

const SRT: &str = "1\r\n00:00:01,000 --> 00:00:03,000\r\n昨日映画を見ました。\r\n\r\n\
2\r\n00:00:04,000 --> 00:00:06,000\r\n今日も映画を見ます。\r\n\r\n\
3\r\nbroken block\r\n\r\n";

fn config(dir: &TempDir) -> Config {
    let root = dir.path();
    let content = format!(
        r#"
[api]
openrouter_key = "sk-test"

[processing]
concurrent_requests = 2

[path]
curriculum = "genki1"
words_per_deck = 10
separate_verb_decks = true

[database]
db_file = "{db}"

[output]
vocab_file = "{vocab}"
grammar_file = "{grammar}"

[input]
transcript_file = "{srt}"
registry_file = "{registry}"
user_id = "user-1"
show_name = "Test Show"
"#,
        db = root.join("paths.db").display(),
        vocab = root.join("vocab.csv").display(),
        grammar = root.join("grammar.csv").display(),
        srt = root.join("episode-03.srt").display(),
        registry = root.join("patterns.toml").display(),
    );
    Config::from_toml_str(&content).unwrap()
}

fn tokenizer() -> ScriptedTokenizer {
    ScriptedTokenizer::new()
        .line(
            "昨日映画を見ました。",
            vec![noun("昨日", "きのう"), noun("映画", "えいが"), particle("を"), verb("見る", "みる"), punct("。")],
            &["past-tense-ました"],
        )
        .line(
            "今日も映画を見ます。",
            vec![noun("今日", "きょう"), particle("も"), noun("映画", "えいが"), particle("を"), verb("見る", "みる"), punct("。")],
            &["polite-ます"],
        )
}

#[tokio::test]
async fn test_process_transcript_file_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(&temp_dir);
    tokio::fs::write(&config.input.transcript_file, SRT).await.unwrap();

    let store = Arc::new(SqlitePathStore::open(&config.database.db_file).await.unwrap());
    let creator = PathCreator::with_parts(config.clone(), Arc::new(tokenizer()), registry(), store.clone());

    let outcome = creator
        .process_transcript_file(&config.input.transcript_file, None)
        .await
        .unwrap();

    assert_eq!(outcome.extracted.transcript.len(), 2);
    assert_eq!(outcome.extracted.transcript[1].timestamp.as_deref(), Some("0:00:04"));
    assert_eq!(
        outcome.extracted.grammar_patterns,
        vec!["past-tense-ました".to_string(), "polite-ます".to_string()]
    );

    // 语法 2 个 + 普通卡组 + 动词卡组
    assert_eq!(outcome.path.len(), 4);

    let stored = store.fetch_path(outcome.path_id).await.unwrap().unwrap();
    assert_eq!(stored.transcript_name, "episode-03");
    assert_eq!(stored.modules, outcome.path.modules().to_vec());

    let vocab_csv = std::fs::read_to_string(&config.output.vocab_file).unwrap();
    assert!(vocab_csv.starts_with("deck,word,furigana,english,example,timestamp"));
    assert!(vocab_csv.contains("映画,えいが,,昨日映画を見ました。,0:00:01"));
    assert_eq!(vocab_csv.lines().count(), 1 + 4);

    let grammar_csv = std::fs::read_to_string(&config.output.grammar_file).unwrap();
    assert!(grammar_csv.contains("genki1-lesson-4"));
    assert!(grammar_csv.contains("genki1-lesson-3"));
}

#[tokio::test]
async fn test_pruned_path_uploads_only_selection() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(&temp_dir);
    let lines = transcript(&["昨日映画を見ました。", "今日も映画を見ます。"]);

    let (extracted, mut path) = run_pipeline(
        &tokenizer(),
        &registry(),
        &lines,
        &PipelineOptions::from_config(&config),
        None,
    )
    .await
    .unwrap();
    assert_eq!(extracted.vocabulary.len(), 4);

    // 用户只保留单词卡组
    path.retain(|module| matches!(module, LearningPathModule::Vocabulary(_)));

    let store = SqlitePathStore::open(&config.database.db_file).await.unwrap();
    let request = path_creator::store::UploadRequest::from_path(
        "user-1",
        path_creator::store::TranscriptMetadata {
            name: "clip".to_string(),
            show_name: None,
            episode_name: None,
            transcript_data: extracted.transcript.clone(),
        },
        &path,
    );
    assert!(request.selected_grammar_modules.is_empty());
    assert_eq!(request.selected_vocab_decks[0].order_index, 0);
    assert_eq!(request.selected_vocab_decks[1].order_index, 1);

    use path_creator::store::PathStore;
    let path_id = store.upload_path(&request).await.unwrap();
    let stored = store.fetch_path(path_id).await.unwrap().unwrap();
    assert_eq!(stored.modules.len(), 2);
}

#[tokio::test]
async fn test_broken_tokenizer_aborts_processing() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(&temp_dir);
    tokio::fs::write(&config.input.transcript_file, SRT).await.unwrap();

    let store = Arc::new(SqlitePathStore::open(&config.database.db_file).await.unwrap());
    let creator = PathCreator::with_parts(
        config.clone(),
        Arc::new(ScriptedTokenizer::broken()),
        registry(),
        store.clone(),
    );

    let result = creator.process_transcript_file(&config.input.transcript_file, None).await;

    assert!(matches!(result, Err(PipelineError::TokenizerInit(_))));
    assert_eq!(store.count_paths().await.unwrap(), 0);
}

struct RejectingStore;

#[async_trait::async_trait]
impl path_creator::store::PathStore for RejectingStore {
    async fn upload_path(&self, _request: &path_creator::store::UploadRequest) -> path_creator::Result<i64> {
        Err(PipelineError::Upload("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_failed_upload_writes_no_card_files() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(&temp_dir);
    tokio::fs::write(&config.input.transcript_file, SRT).await.unwrap();

    let creator = PathCreator::with_parts(config.clone(), Arc::new(tokenizer()), registry(), Arc::new(RejectingStore));

    let result = creator.process_transcript_file(&config.input.transcript_file, None).await;

    assert!(matches!(result, Err(PipelineError::Upload(_))));
    assert!(!std::path::Path::new(&config.output.vocab_file).exists());
    assert!(!std::path::Path::new(&config.output.grammar_file).exists());
}
