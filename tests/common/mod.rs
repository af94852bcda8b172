#![allow(dead_code)]

use async_trait::async_trait;
use path_creator::{
    Curriculum, GrammarMatch, PartOfSpeech, PatternRegistry, PipelineError, Result, Token,
    TokenizedLine, Tokenizer, TranscriptLine,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 按预设结果返回分词的测试替身
#[derive(Default)]
pub struct ScriptedTokenizer {
    lines: HashMap<String, TokenizedLine>,
    failing: HashSet<String>,
    fail_init: bool,
    delays: HashMap<String, u64>,
    pub init_calls: AtomicUsize,
    pub tokenize_calls: AtomicUsize,
}

impl ScriptedTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, text: &str, tokens: Vec<Token>, grammar: &[&str]) -> Self {
        self.lines.insert(
            text.to_string(),
            TokenizedLine {
                tokens,
                grammar_matches: grammar
                    .iter()
                    .map(|p| GrammarMatch {
                        pattern_name: p.to_string(),
                    })
                    .collect(),
            },
        );
        self
    }

    pub fn failing(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn delayed(mut self, text: &str, millis: u64) -> Self {
        self.delays.insert(text.to_string(), millis);
        self
    }

    pub fn broken() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Tokenizer for ScriptedTokenizer {
    async fn ensure_ready(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(PipelineError::TokenizerInit("dictionary missing".to_string()));
        }
        Ok(())
    }

    async fn tokenize(&self, line: &str) -> Result<TokenizedLine> {
        self.tokenize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(millis) = self.delays.get(line) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        if self.failing.contains(line) {
            return Err(PipelineError::Tokenize(format!("worker crashed on: {}", line)));
        }
        Ok(self.lines.get(line).cloned().unwrap_or_default())
    }
}

pub fn tok(base: &str, reading: &str, pos: PartOfSpeech) -> Token {
    Token {
        base_form: base.to_string(),
        reading: reading.to_string(),
        pos,
    }
}

pub fn noun(base: &str, reading: &str) -> Token {
    tok(base, reading, PartOfSpeech::Noun)
}

pub fn verb(base: &str, reading: &str) -> Token {
    tok(base, reading, PartOfSpeech::Verb)
}

pub fn particle(base: &str) -> Token {
    tok(base, base, PartOfSpeech::Particle)
}

pub fn punct(base: &str) -> Token {
    tok(base, base, PartOfSpeech::Punctuation)
}

pub fn transcript(texts: &[&str]) -> Vec<TranscriptLine> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| TranscriptLine {
            line_id: i,
            text: text.to_string(),
            english: String::new(),
            timestamp: None,
        })
        .collect()
}

pub fn registry() -> PatternRegistry {
    PatternRegistry::from_toml_str(
        r#"
[curricula.genki1]
"past-tense-ました" = ["genki1-lesson-4"]
"te-form" = ["genki1-lesson-6", "genki1-lesson-7"]
"te-iru" = ["genki1-lesson-7"]
"polite-ます" = ["genki1-lesson-3"]

[curricula.tobira]
"te-form" = ["tobira-review-1"]
"#,
    )
    .expect("registry fixture should parse")
}

pub const CURRICULUM: Curriculum = Curriculum::Genki1;
