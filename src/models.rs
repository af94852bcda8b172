use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// 字幕中的一行
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub line_id: usize,
    pub text: String,
    pub english: String, // 翻译，SRT 中没有时为空
    pub timestamp: Option<String>,
}

/// 词性。助词和标点不会进入词汇表
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    Noun,
    Pronoun,
    Verb,
    Adjective,
    Adverb,
    AuxiliaryVerb,
    Conjunction,
    Interjection,
    Prefix,
    Suffix,
    Particle,
    Punctuation,
    Other,
}

impl PartOfSpeech {
    /// 从英文、日文（IPADIC/UniDic 大分类）或中文的词性标注解析
    pub fn from_tag(tag: &str) -> Self {
        // UniDic 的标注形如 "名詞-普通名詞-一般"，只看第一段
        let primary = tag
            .split(|c: char| c == '-' || c == ',' || c == '｜')
            .next()
            .unwrap_or("")
            .trim();

        match primary.to_lowercase().as_str() {
            "noun" | "名詞" | "名词" => PartOfSpeech::Noun,
            "pronoun" | "代名詞" | "代词" => PartOfSpeech::Pronoun,
            "verb" | "動詞" | "动词" | "自动词" | "他动词" => PartOfSpeech::Verb,
            "adjective" | "形容詞" | "形状詞" | "形容词" | "一类形容词" | "二类形容词" => {
                PartOfSpeech::Adjective
            }
            "adverb" | "副詞" | "副词" => PartOfSpeech::Adverb,
            "auxiliary_verb" | "auxiliary" | "助動詞" | "助动词" => PartOfSpeech::AuxiliaryVerb,
            "conjunction" | "接続詞" | "连词" => PartOfSpeech::Conjunction,
            "interjection" | "感動詞" | "感叹词" => PartOfSpeech::Interjection,
            "prefix" | "接頭詞" | "接頭辞" | "前缀" => PartOfSpeech::Prefix,
            "suffix" | "接尾辞" | "后缀" => PartOfSpeech::Suffix,
            "particle" | "助詞" | "助词" => PartOfSpeech::Particle,
            "punctuation" | "symbol" | "記号" | "補助記号" | "空白" | "标点" | "标点符号" => {
                PartOfSpeech::Punctuation
            }
            _ => PartOfSpeech::Other,
        }
    }

    /// 助词和标点不算词汇
    pub fn is_excluded(&self) -> bool {
        matches!(self, PartOfSpeech::Particle | PartOfSpeech::Punctuation)
    }

    pub fn is_verb(&self) -> bool {
        matches!(self, PartOfSpeech::Verb)
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartOfSpeech::Noun => "noun",
            PartOfSpeech::Pronoun => "pronoun",
            PartOfSpeech::Verb => "verb",
            PartOfSpeech::Adjective => "adjective",
            PartOfSpeech::Adverb => "adverb",
            PartOfSpeech::AuxiliaryVerb => "auxiliary_verb",
            PartOfSpeech::Conjunction => "conjunction",
            PartOfSpeech::Interjection => "interjection",
            PartOfSpeech::Prefix => "prefix",
            PartOfSpeech::Suffix => "suffix",
            PartOfSpeech::Particle => "particle",
            PartOfSpeech::Punctuation => "punctuation",
            PartOfSpeech::Other => "other",
        };
        f.write_str(name)
    }
}

// 分词结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Token {
    pub base_form: String,
    pub reading: String,
    pub pos: PartOfSpeech,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GrammarMatch {
    pub pattern_name: String,
}

/// 分词器对一行文本的输出
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct TokenizedLine {
    pub tokens: Vec<Token>,
    pub grammar_matches: Vec<GrammarMatch>,
}

// 提取出的单词
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VocabWord {
    pub word: String,     // 辞书形，唯一
    pub furigana: String, // 第一次出现时的读音
    pub english: Option<String>,
    pub pos: PartOfSpeech,
    pub transcript_line_ids: Vec<usize>,
    pub count: usize,
}

// 提取阶段的最终结果
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ExtractedData {
    pub grammar_patterns: Vec<String>,
    pub grammar_pattern_line_ids: HashMap<String, Vec<usize>>,
    pub vocabulary: Vec<VocabWord>,
    pub transcript: Vec<TranscriptLine>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DeckWord {
    pub word: String,
    pub furigana: Option<String>,
    pub english: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GrammarModule {
    pub module_id: String,
    /// 每个映射到该模块的语法模式各一组行号
    pub transcript_line_ids: Vec<Vec<usize>>,
    pub order_index: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VocabularyDeck {
    pub is_verb_deck: bool,
    pub words: Vec<DeckWord>,
    /// 与 words 一一对应
    pub transcript_line_ids: Vec<Vec<usize>>,
    pub order_index: usize,
}

/// 学习路径中的一个模块
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LearningPathModule {
    Grammar(GrammarModule),
    Vocabulary(VocabularyDeck),
}

impl LearningPathModule {
    pub fn order_index(&self) -> usize {
        match self {
            LearningPathModule::Grammar(module) => module.order_index,
            LearningPathModule::Vocabulary(deck) => deck.order_index,
        }
    }

    pub fn set_order_index(&mut self, index: usize) {
        match self {
            LearningPathModule::Grammar(module) => module.order_index = index,
            LearningPathModule::Vocabulary(deck) => deck.order_index = index,
        }
    }

    /// 该模块引用的所有行号
    pub fn referenced_line_ids(&self) -> impl Iterator<Item = usize> + '_ {
        let groups = match self {
            LearningPathModule::Grammar(module) => &module.transcript_line_ids,
            LearningPathModule::Vocabulary(deck) => &deck.transcript_line_ids,
        };
        groups.iter().flatten().copied()
    }
}
