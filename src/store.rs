use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::generator::LearningPath;
use crate::models::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptMetadata {
    pub name: String,
    pub show_name: Option<String>,
    pub episode_name: Option<String>,
    pub transcript_data: Vec<TranscriptLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedGrammarModule {
    pub module_id: String,
    pub transcript_line_ids: Vec<Vec<usize>>,
    pub order_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedVocabDeck {
    pub is_verb_deck: bool,
    pub words: Vec<DeckWord>,
    pub transcript_line_ids: Vec<Vec<usize>>,
    pub order_index: usize,
}

/// 上传一条学习路径所需的全部数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadRequest {
    pub user_id: String,
    pub transcript: TranscriptMetadata,
    pub selected_grammar_modules: Vec<SelectedGrammarModule>,
    pub selected_vocab_decks: Vec<SelectedVocabDeck>,
}

impl UploadRequest {
    /// 按用户最终保留的路径拆分为语法模块和单词卡组
    pub fn from_path(user_id: &str, transcript: TranscriptMetadata, path: &LearningPath) -> Self {
        let mut selected_grammar_modules = Vec::new();
        let mut selected_vocab_decks = Vec::new();

        for module in path.modules() {
            match module {
                LearningPathModule::Grammar(grammar) => {
                    selected_grammar_modules.push(SelectedGrammarModule {
                        module_id: grammar.module_id.clone(),
                        transcript_line_ids: grammar.transcript_line_ids.clone(),
                        order_index: grammar.order_index,
                    })
                }
                LearningPathModule::Vocabulary(deck) => selected_vocab_decks.push(SelectedVocabDeck {
                    is_verb_deck: deck.is_verb_deck,
                    words: deck.words.clone(),
                    transcript_line_ids: deck.transcript_line_ids.clone(),
                    order_index: deck.order_index,
                }),
            }
        }

        Self {
            user_id: user_id.to_string(),
            transcript,
            selected_grammar_modules,
            selected_vocab_decks,
        }
    }
}

/// 学习路径的持久化接口
///
/// 要么整条路径写入成功，要么返回错误，没有部分成功，也不重试。
#[async_trait]
pub trait PathStore: Send + Sync {
    async fn upload_path(&self, request: &UploadRequest) -> Result<i64>;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredPathRow {
    pub id: i64,
    pub user_id: String,
    pub transcript_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct StoredModuleRow {
    module_type: String,
    module_id: Option<String>,
    is_verb_deck: bool,
    words: Option<String>,
    transcript_line_ids: String,
    order_index: i64,
}

/// 从数据库读回的学习路径
#[derive(Debug, Clone)]
pub struct StoredPath {
    pub id: i64,
    pub user_id: String,
    pub transcript_name: String,
    pub created_at: DateTime<Utc>,
    pub modules: Vec<LearningPathModule>,
}

pub struct SqlitePathStore {
    pool: SqlitePool,
}

impl SqlitePathStore {
    /// 打开（必要时创建）数据库文件
    pub async fn open<P: AsRef<Path>>(db_file: P) -> Result<Self> {
        let db_path = db_file.as_ref();

        info!("💾 连接数据库: {}", db_path.display());

        // 如果数据库文件不存在，先创建一个空文件
        if !db_path.exists() {
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(db_path)?;
            info!("✨ 创建新数据库文件: {}", db_path.display());
        }

        let db_url = format!("sqlite:{}", db_path.display());
        Self::connect(&db_url).await
    }

    pub async fn connect(db_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(db_url)
            .await?;

        let store = SqlitePathStore { pool };
        store.initialize_tables().await?;
        Ok(store)
    }

    async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transcripts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                show_name TEXT,
                episode_name TEXT,
                transcript_data TEXT NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#
        ).execute(&self.pool).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS learning_paths (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                transcript_id INTEGER NOT NULL REFERENCES transcripts(id),
                created_at DATETIME NOT NULL
            )
            "#
        ).execute(&self.pool).await?;

        // 语法模块和单词卡组放在同一张表，用 module_type 区分
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS path_modules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path_id INTEGER NOT NULL REFERENCES learning_paths(id),
                module_type TEXT NOT NULL CHECK (module_type IN ('grammar', 'vocabulary')),
                module_id TEXT,
                is_verb_deck BOOLEAN NOT NULL DEFAULT 0,
                words TEXT,
                transcript_line_ids TEXT NOT NULL,
                order_index INTEGER NOT NULL,
                UNIQUE(path_id, order_index)
            )
            "#
        ).execute(&self.pool).await?;

        Ok(())
    }

    async fn insert_path(&self, request: &UploadRequest) -> Result<i64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let transcript_id = sqlx::query(
            "INSERT INTO transcripts (user_id, name, show_name, episode_name, transcript_data, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&request.user_id)
        .bind(&request.transcript.name)
        .bind(&request.transcript.show_name)
        .bind(&request.transcript.episode_name)
        .bind(serde_json::to_string(&request.transcript.transcript_data)?)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let path_id = sqlx::query(
            "INSERT INTO learning_paths (user_id, transcript_id, created_at) VALUES (?, ?, ?)"
        )
        .bind(&request.user_id)
        .bind(transcript_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for module in &request.selected_grammar_modules {
            sqlx::query(
                "INSERT INTO path_modules (path_id, module_type, module_id, transcript_line_ids, order_index) VALUES (?, 'grammar', ?, ?, ?)"
            )
            .bind(path_id)
            .bind(&module.module_id)
            .bind(serde_json::to_string(&module.transcript_line_ids)?)
            .bind(module.order_index as i64)
            .execute(&mut *tx)
            .await?;
        }

        for deck in &request.selected_vocab_decks {
            sqlx::query(
                "INSERT INTO path_modules (path_id, module_type, is_verb_deck, words, transcript_line_ids, order_index) VALUES (?, 'vocabulary', ?, ?, ?, ?)"
            )
            .bind(path_id)
            .bind(deck.is_verb_deck)
            .bind(serde_json::to_string(&deck.words)?)
            .bind(serde_json::to_string(&deck.transcript_line_ids)?)
            .bind(deck.order_index as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(path_id)
    }

    /// 读回一条学习路径，模块按 order_index 排序
    pub async fn fetch_path(&self, path_id: i64) -> Result<Option<StoredPath>> {
        let row = sqlx::query_as::<_, StoredPathRow>(
            "SELECT id, user_id, transcript_id, created_at FROM learning_paths WHERE id = ?"
        )
        .bind(path_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let (transcript_name,): (String,) = sqlx::query_as("SELECT name FROM transcripts WHERE id = ?")
            .bind(row.transcript_id)
            .fetch_one(&self.pool)
            .await?;

        let module_rows = sqlx::query_as::<_, StoredModuleRow>(
            "SELECT module_type, module_id, is_verb_deck, words, transcript_line_ids, order_index FROM path_modules WHERE path_id = ? ORDER BY order_index"
        )
        .bind(path_id)
        .fetch_all(&self.pool)
        .await?;

        let mut modules = Vec::with_capacity(module_rows.len());
        for module in module_rows {
            let transcript_line_ids: Vec<Vec<usize>> = serde_json::from_str(&module.transcript_line_ids)?;
            let order_index = module.order_index as usize;

            let decoded = match module.module_type.as_str() {
                "grammar" => LearningPathModule::Grammar(GrammarModule {
                    module_id: module.module_id.unwrap_or_default(),
                    transcript_line_ids,
                    order_index,
                }),
                "vocabulary" => LearningPathModule::Vocabulary(VocabularyDeck {
                    is_verb_deck: module.is_verb_deck,
                    words: match module.words {
                        Some(words) => serde_json::from_str(&words)?,
                        None => Vec::new(),
                    },
                    transcript_line_ids,
                    order_index,
                }),
                other => {
                    return Err(PipelineError::Upload(format!("未知的模块类型: {}", other)));
                }
            };
            modules.push(decoded);
        }

        Ok(Some(StoredPath {
            id: row.id,
            user_id: row.user_id,
            transcript_name,
            created_at: row.created_at,
            modules,
        }))
    }

    pub async fn count_paths(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM learning_paths")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl PathStore for SqlitePathStore {
    async fn upload_path(&self, request: &UploadRequest) -> Result<i64> {
        let path_id = self
            .insert_path(request)
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        info!(
            "✅ 学习路径已保存: ID {} ({} 个语法模块，{} 个单词卡组)",
            path_id,
            request.selected_grammar_modules.len(),
            request.selected_vocab_decks.len()
        );
        Ok(path_id)
    }
}
