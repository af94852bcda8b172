use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::api::{ApiClient, extract_json_object};
use crate::error::{PipelineError, Result};
use crate::models::{GrammarMatch, PartOfSpeech, Token, TokenizedLine};
use crate::registry::{Curriculum, PatternRegistry};

/// 分词 + 语法匹配
///
/// 同一个实例在多次处理之间复用。`ensure_ready` 必须是幂等的，
/// 多个调用方同时等待时也只初始化一次。
#[async_trait]
pub trait Tokenizer: Send + Sync {
    async fn ensure_ready(&self) -> Result<()>;

    async fn tokenize(&self, line: &str) -> Result<TokenizedLine>;
}

// 模型返回的原始结构
#[derive(Debug, Deserialize)]
struct RawTokenizeResult {
    #[serde(default)]
    tokens: Vec<RawToken>,
    #[serde(default)]
    grammar: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawToken {
    base_form: String,
    #[serde(default)]
    reading: String,
    #[serde(default)]
    pos: String,
}

/// 通过 OpenRouter 上的大模型做分词和语法识别
pub struct LlmTokenizer {
    api_client: ApiClient,
    patterns: Vec<String>,
    preamble: OnceCell<String>,
}

impl LlmTokenizer {
    pub fn new(api_client: ApiClient, registry: &PatternRegistry, curriculum: Curriculum) -> Self {
        let patterns = registry
            .known_patterns(curriculum)
            .into_iter()
            .map(|p| p.to_string())
            .collect();

        Self {
            api_client,
            patterns,
            preamble: OnceCell::new(),
        }
    }

    fn build_preamble(&self) -> String {
        let pattern_list = if self.patterns.is_empty() {
            "（无）".to_string()
        } else {
            self.patterns
                .iter()
                .map(|p| format!("- {}", p))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(r#"
请对下面这一行日语进行分词，并识别其中出现的语法点。要求：

1. 分词部分：
   - 按出现顺序列出每个词，包括助词和标点
   - base_form 为辞书形（原形）
   - reading 为辞书形的平假名读音
   - pos 为词性，只能使用以下之一：noun, pronoun, verb, adjective, adverb, auxiliary_verb, conjunction, interjection, prefix, suffix, particle, punctuation, other

2. 语法部分：
   - 只能从下面的语法模式列表中选择，原样返回名称
   - 没有出现任何语法模式时返回空数组

语法模式列表：
{}

请用以下JSON格式返回结果，不要添加其他内容：
{{
  "tokens": [
    {{ "base_form": "見る", "reading": "みる", "pos": "verb" }}
  ],
  "grammar": ["模式名称"]
}}

要分析的文本：
"#, pattern_list)
    }
}

#[async_trait]
impl Tokenizer for LlmTokenizer {
    async fn ensure_ready(&self) -> Result<()> {
        self.preamble
            .get_or_try_init(|| async {
                if !self.api_client.has_api_key() {
                    return Err(PipelineError::TokenizerInit(
                        "未设置 OpenRouter API 密钥 (api.openrouter_key 或 OPENROUTER_API_KEY)".to_string(),
                    ));
                }
                info!(
                    "🔧 初始化分词器: 模型 {}，{} 个语法模式",
                    self.api_client.model(),
                    self.patterns.len()
                );
                Ok(self.build_preamble())
            })
            .await?;
        Ok(())
    }

    async fn tokenize(&self, line: &str) -> Result<TokenizedLine> {
        self.ensure_ready().await?;
        let preamble = self
            .preamble
            .get()
            .ok_or_else(|| PipelineError::TokenizerInit("分词器尚未初始化".to_string()))?;

        let prompt = format!("{}{}\n", preamble, line);
        let content = self.api_client.chat(prompt, 4000).await?;
        let json_content = extract_json_object(&content);

        let raw: RawTokenizeResult = serde_json::from_str(json_content).map_err(|e| {
            PipelineError::Tokenize(format!("解析分词结果失败: {}\n响应内容: {}", e, json_content))
        })?;

        debug!("分词结果: {} 个词, {} 个语法点", raw.tokens.len(), raw.grammar.len());
        Ok(into_tokenized_line(raw))
    }
}

fn into_tokenized_line(raw: RawTokenizeResult) -> TokenizedLine {
    let tokens = raw
        .tokens
        .into_iter()
        .filter(|token| !token.base_form.trim().is_empty())
        .map(|token| Token {
            base_form: token.base_form.trim().to_string(),
            reading: token.reading.trim().to_string(),
            pos: PartOfSpeech::from_tag(&token.pos),
        })
        .collect();

    let grammar_matches = raw
        .grammar
        .into_iter()
        .map(|pattern_name| GrammarMatch {
            pattern_name: pattern_name.trim().to_string(),
        })
        .collect();

    TokenizedLine {
        tokens,
        grammar_matches,
    }
}
