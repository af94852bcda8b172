use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::*;
use crate::registry::{Curriculum, PatternRegistry};
use crate::tokenizer::Tokenizer;

/// 提取参数
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// 用哪套课程体系判断语法模式是否有对应模块
    pub curriculum: Curriculum,
    /// 同时进行的分词请求数，1 表示严格按顺序处理
    pub concurrent_requests: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            curriculum: Curriculum::default(),
            concurrent_requests: 1,
        }
    }
}

// 词汇累加器中的一项
struct VocabEntry {
    furigana: String,
    pos: PartOfSpeech,
    line_ids: Vec<usize>,
    count: usize,
}

/// 单次提取过程中的累加状态，只在一次调用内存在
#[derive(Default)]
struct Accumulator {
    grammar_patterns: Vec<String>,
    grammar_pattern_line_ids: HashMap<String, Vec<usize>>,
    // 按首次出现顺序记录单词，保证排序稳定
    vocab_order: Vec<String>,
    vocab: HashMap<String, VocabEntry>,
}

impl Accumulator {
    fn add_line(
        &mut self,
        line_id: usize,
        tokenized: &TokenizedLine,
        registry: &PatternRegistry,
        curriculum: Curriculum,
    ) {
        // 语法点：同一行内重复匹配只记录一次
        let mut seen_in_line: HashSet<&str> = HashSet::new();
        for grammar_match in &tokenized.grammar_matches {
            let pattern = grammar_match.pattern_name.as_str();
            if !registry.has_modules(curriculum, pattern) {
                debug!("语法模式没有对应模块，忽略: {}", pattern);
                continue;
            }
            if !seen_in_line.insert(pattern) {
                continue;
            }

            if !self.grammar_pattern_line_ids.contains_key(pattern) {
                self.grammar_patterns.push(pattern.to_string());
            }
            self.grammar_pattern_line_ids
                .entry(pattern.to_string())
                .or_default()
                .push(line_id);
        }

        // 单词：助词和标点不计入
        for token in &tokenized.tokens {
            if token.pos.is_excluded() {
                continue;
            }

            match self.vocab.get_mut(&token.base_form) {
                Some(entry) => {
                    entry.count += 1;
                    if !entry.line_ids.contains(&line_id) {
                        entry.line_ids.push(line_id);
                    }
                }
                None => {
                    self.vocab_order.push(token.base_form.clone());
                    self.vocab.insert(
                        token.base_form.clone(),
                        VocabEntry {
                            furigana: token.reading.clone(),
                            pos: token.pos,
                            line_ids: vec![line_id],
                            count: 1,
                        },
                    );
                }
            }
        }
    }

    fn finish(mut self, transcript: Vec<TranscriptLine>) -> ExtractedData {
        let mut vocabulary: Vec<VocabWord> = self
            .vocab_order
            .into_iter()
            .filter_map(|word| {
                self.vocab.remove(&word).map(|entry| VocabWord {
                    word,
                    furigana: entry.furigana,
                    english: None,
                    pos: entry.pos,
                    transcript_line_ids: entry.line_ids,
                    count: entry.count,
                })
            })
            .collect();

        // sort_by 是稳定排序，出现次数相同的单词保持首次出现的顺序
        vocabulary.sort_by(|a, b| b.count.cmp(&a.count));

        ExtractedData {
            grammar_patterns: self.grammar_patterns,
            grammar_pattern_line_ids: self.grammar_pattern_line_ids,
            vocabulary,
            transcript,
        }
    }
}

/// 从字幕中提取语法点和按频率排序的词汇
///
/// 单行分词失败只记录日志并跳过该行，分词器初始化失败则直接返回错误。
/// 并发处理时结果会按行号重新排序后再累加，输出与顺序处理完全一致。
pub async fn extract_transcript_data<T>(
    tokenizer: &T,
    registry: &PatternRegistry,
    lines: &[TranscriptLine],
    options: ExtractOptions,
) -> Result<ExtractedData>
where
    T: Tokenizer + ?Sized,
{
    tokenizer.ensure_ready().await?;

    // 行号按处理顺序重新编排
    let transcript: Vec<TranscriptLine> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| TranscriptLine {
            line_id: i,
            ..line.clone()
        })
        .collect();

    info!("🔄 开始提取字幕数据: {} 行", transcript.len());

    let concurrency = options.concurrent_requests.max(1);
    let mut results: Vec<(usize, Option<TokenizedLine>)> = stream::iter(transcript.iter())
        .map(|line| async move {
            match tokenizer.tokenize(&line.text).await {
                Ok(tokenized) => (line.line_id, Some(tokenized)),
                Err(e) => {
                    warn!("  ❌ 第 {} 行分词失败，跳过: {}", line.line_id, e);
                    (line.line_id, None)
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    // 按原始行号恢复顺序
    results.sort_by_key(|(line_id, _)| *line_id);

    let mut accumulator = Accumulator::default();
    let mut failed_lines = 0;
    for (line_id, tokenized) in &results {
        match tokenized {
            Some(tokenized) if tokenized.tokens.is_empty() => {
                debug!("第 {} 行没有分出任何词，跳过", line_id);
            }
            Some(tokenized) => {
                accumulator.add_line(*line_id, tokenized, registry, options.curriculum);
            }
            None => failed_lines += 1,
        }
    }

    let extracted = accumulator.finish(transcript);

    info!(
        "📝 找到 {} 个语法点，{} 个单词（{} 行分词失败）",
        extracted.grammar_patterns.len(),
        extracted.vocabulary.len(),
        failed_lines
    );

    Ok(extracted)
}
