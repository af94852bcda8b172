use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::generator::LearningPath;
use crate::models::TranscriptLine;

// 单词卡片的一行：卡组,单词,读音,释义,例句,时间
#[derive(Debug, Serialize)]
struct VocabCardRow<'a> {
    deck: String,
    word: &'a str,
    furigana: &'a str,
    english: &'a str,
    example: &'a str,
    timestamp: &'a str,
}

#[derive(Debug, Serialize)]
struct GrammarCardRow<'a> {
    order: usize,
    module_id: &'a str,
    occurrences: usize,
    example: &'a str,
    timestamp: &'a str,
}

fn example_line<'a>(transcript: &'a [TranscriptLine], line_ids: &[usize]) -> (&'a str, &'a str) {
    line_ids
        .first()
        .and_then(|&id| transcript.get(id))
        .map(|line| (line.text.as_str(), line.timestamp.as_deref().unwrap_or("")))
        .unwrap_or(("", ""))
}

/// 导出单词卡组为 Anki 可导入的 CSV，例句取第一次出现的字幕行
pub fn export_vocab_decks<P: AsRef<Path>>(
    path: &LearningPath,
    transcript: &[TranscriptLine],
    output_file: P,
) -> Result<usize> {
    let mut writer = csv::Writer::from_path(output_file.as_ref())?;
    let mut rows = 0;

    for deck in path.vocabulary_decks() {
        let label = if deck.is_verb_deck {
            format!("{:02}-动词", deck.order_index)
        } else {
            format!("{:02}-单词", deck.order_index)
        };

        for (word, line_ids) in deck.words.iter().zip(&deck.transcript_line_ids) {
            let (example, timestamp) = example_line(transcript, line_ids);
            writer.serialize(VocabCardRow {
                deck: label.clone(),
                word: &word.word,
                furigana: word.furigana.as_deref().unwrap_or(""),
                english: word.english.as_deref().unwrap_or(""),
                example,
                timestamp,
            })?;
            rows += 1;
        }
    }

    writer.flush()?;
    info!("✅ 单词卡片已生成：{} ({} 张)", output_file.as_ref().display(), rows);
    Ok(rows)
}

/// 导出语法模块列表
pub fn export_grammar_modules<P: AsRef<Path>>(
    path: &LearningPath,
    transcript: &[TranscriptLine],
    output_file: P,
) -> Result<usize> {
    let mut writer = csv::Writer::from_path(output_file.as_ref())?;
    let mut rows = 0;

    for module in path.grammar_modules() {
        let first_lines = module.transcript_line_ids.first().map(Vec::as_slice).unwrap_or(&[]);
        let (example, timestamp) = example_line(transcript, first_lines);
        let occurrences: usize = module.transcript_line_ids.iter().map(Vec::len).sum();

        writer.serialize(GrammarCardRow {
            order: module.order_index,
            module_id: &module.module_id,
            occurrences,
            example,
            timestamp,
        })?;
        rows += 1;
    }

    writer.flush()?;
    info!("✅ 语法模块已导出：{} ({} 个)", output_file.as_ref().display(), rows);
    Ok(rows)
}
