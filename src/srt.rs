use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::TranscriptLine;

/// SRT 字幕中的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// 解析 SubRip 字幕文本
///
/// 尽量恢复：格式错误的块会被跳过而不是让整个解析失败。
/// 输出按开始时间单调排列（文件顺序本身有序时保持不变）。
pub fn parse_srt(content: &str) -> Vec<SubtitleRecord> {
    let normalized = content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut records = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                push_blocks(&block, &mut records);
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        push_blocks(&block, &mut records);
    }

    let in_order = records.windows(2).all(|pair| pair[0].start <= pair[1].start);
    if !in_order {
        warn!("⚠️  字幕时间轴不是递增的，按开始时间重新排序");
        records.sort_by_key(|record| record.start); // 稳定排序
    }

    records
}

fn push_blocks(block: &[&str], records: &mut Vec<SubtitleRecord>) {
    for sub_block in split_merged_blocks(block) {
        if let Some(record) = parse_block(&sub_block, records.len()) {
            records.push(record);
        }
    }
}

// 块之间缺少空行时，后面的块会被并进来：遇到第二个有效时间轴就拆开，
// 紧挨在它前面的纯数字行当作新块的序号
fn split_merged_blocks<'a>(block: &[&'a str]) -> Vec<Vec<&'a str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&'a str> = Vec::new();
    let mut seen_timing = false;

    for &line in block {
        if seen_timing && parse_timing_line(line).is_some() {
            let index = if current.last().is_some_and(|prev| is_index_line(prev)) {
                current.pop()
            } else {
                None
            };
            debug!("字幕块之间缺少空行，在此拆分: {}", line);
            blocks.push(std::mem::take(&mut current));
            current.extend(index);
        }
        seen_timing |= line.contains("-->");
        current.push(line);
    }
    blocks.push(current);

    blocks
}

fn is_index_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

fn parse_block(block: &[&str], parsed_so_far: usize) -> Option<SubtitleRecord> {
    let Some(timing_pos) = block.iter().position(|line| line.contains("-->")) else {
        warn!("⚠️  跳过没有时间轴的字幕块 (第 {} 条之后)", parsed_so_far);
        return None;
    };

    // 时间轴之前最多只允许一行序号
    if timing_pos > 1 {
        debug!("字幕块时间轴前有多余内容: {:?}", &block[..timing_pos]);
    }

    let (start, end) = match parse_timing_line(block[timing_pos]) {
        Some(times) => times,
        None => {
            warn!("⚠️  跳过时间轴格式错误的字幕块: {}", block[timing_pos]);
            return None;
        }
    };

    let text = block[timing_pos + 1..]
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        warn!("⚠️  跳过没有文本的字幕块: {}", block[timing_pos]);
        return None;
    }

    Some(SubtitleRecord { start, end, text })
}

fn parse_timing_line(line: &str) -> Option<(Duration, Duration)> {
    let (left, right) = line.split_once("-->")?;
    let start = parse_timestamp(left.trim())?;
    // 结束时间后面可能带有位置信息，如 "X1:100 X2:200"
    let end = parse_timestamp(right.split_whitespace().next()?)?;
    Some((start, end))
}

/// 解析单个时间戳 (HH:MM:SS,mmm)，也接受 "." 作为毫秒分隔符
pub fn parse_timestamp(timestamp: &str) -> Option<Duration> {
    let (hms, millis) = match timestamp.split_once(|c: char| c == ',' || c == '.') {
        Some((hms, millis)) => (hms, millis),
        None => (timestamp, "0"),
    };

    let parts: Vec<&str> = hms.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        [m, s] => (0, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let millis: u64 = millis.trim().parse().ok()?;
    if millis >= 1000 {
        return None;
    }

    // 小时位数不受限制，溢出时按格式错误处理
    let total_seconds = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
    let total_millis = total_seconds.checked_mul(1000)?.checked_add(millis)?;
    Some(Duration::from_millis(total_millis))
}

/// 格式化为 H:MM:SS
pub fn format_timestamp(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// 将字幕记录转换为带行号的字幕行
pub fn to_transcript_lines(records: &[SubtitleRecord]) -> Vec<TranscriptLine> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| TranscriptLine {
            line_id: i,
            text: record.text.clone(),
            english: String::new(),
            timestamp: Some(format_timestamp(record.start)),
        })
        .collect()
}

/// 读取并解析 SRT 文件
pub async fn parse_transcript_file<P: AsRef<Path>>(path: P) -> Result<Vec<TranscriptLine>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    let records = parse_srt(&content);
    Ok(to_transcript_lines(&records))
}
