use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::models::*;
use crate::registry::{Curriculum, PatternRegistry};

/// 单词卡组的划分策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckPolicy {
    pub words_per_deck: usize,
    /// 动词单独成组
    pub separate_verb_decks: bool,
    /// 只取频率最高的前 N 个单词
    pub max_words: Option<usize>,
}

impl Default for DeckPolicy {
    fn default() -> Self {
        Self {
            words_per_deck: 20,
            separate_verb_decks: true,
            max_words: None,
        }
    }
}

/// 用户已掌握的内容，生成路径时排除
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub known_words: HashSet<String>,
    pub completed_modules: HashSet<String>,
}

/// 生成的学习路径，模块按 order_index 排列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPath {
    modules: Vec<LearningPathModule>,
}

impl LearningPath {
    fn from_ordered(mut modules: Vec<LearningPathModule>) -> Self {
        for (i, module) in modules.iter_mut().enumerate() {
            module.set_order_index(i);
        }
        Self { modules }
    }

    pub fn modules(&self) -> &[LearningPathModule] {
        &self.modules
    }

    pub fn into_modules(self) -> Vec<LearningPathModule> {
        self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn grammar_modules(&self) -> impl Iterator<Item = &GrammarModule> {
        self.modules.iter().filter_map(|module| match module {
            LearningPathModule::Grammar(grammar) => Some(grammar),
            LearningPathModule::Vocabulary(_) => None,
        })
    }

    pub fn vocabulary_decks(&self) -> impl Iterator<Item = &VocabularyDeck> {
        self.modules.iter().filter_map(|module| match module {
            LearningPathModule::Vocabulary(deck) => Some(deck),
            LearningPathModule::Grammar(_) => None,
        })
    }

    /// 用户删减模块后重新编号，保证 order_index 连续
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&LearningPathModule) -> bool,
    {
        self.modules.retain(keep);
        for (i, module) in self.modules.iter_mut().enumerate() {
            module.set_order_index(i);
        }
    }
}

/// 根据提取结果生成学习路径
///
/// 先放语法模块（按语法点首次出现的顺序），后放单词卡组。
/// 动词单独成组时，普通卡组和动词卡组交替排列。
pub fn create_learning_path(
    extracted: &ExtractedData,
    curriculum: Curriculum,
    registry: &PatternRegistry,
    policy: &DeckPolicy,
    overrides: Option<&PathOverrides>,
) -> LearningPath {
    let grammar = build_grammar_modules(extracted, curriculum, registry, overrides);
    let decks = build_vocabulary_decks(extracted, policy, overrides);

    info!(
        "🧭 生成学习路径: {} 个语法模块，{} 个单词卡组 (课程体系: {})",
        grammar.len(),
        decks.len(),
        curriculum
    );

    let modules = grammar
        .into_iter()
        .map(LearningPathModule::Grammar)
        .chain(decks.into_iter().map(LearningPathModule::Vocabulary))
        .collect();

    LearningPath::from_ordered(modules)
}

fn build_grammar_modules(
    extracted: &ExtractedData,
    curriculum: Curriculum,
    registry: &PatternRegistry,
    overrides: Option<&PathOverrides>,
) -> Vec<GrammarModule> {
    let mut modules: Vec<GrammarModule> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for pattern in &extracted.grammar_patterns {
        let module_ids = registry.modules_for(curriculum, pattern);
        if module_ids.is_empty() {
            debug!("语法模式在课程体系 {} 中没有模块，跳过: {}", curriculum, pattern);
            continue;
        }

        let line_ids = extracted
            .grammar_pattern_line_ids
            .get(pattern)
            .cloned()
            .unwrap_or_default();

        // 同一模式在注册表里重复列出的模块只算一次
        let mut seen: HashSet<&str> = HashSet::new();
        for module_id in module_ids {
            if !seen.insert(module_id.as_str()) {
                continue;
            }
            if overrides.is_some_and(|o| o.completed_modules.contains(module_id)) {
                debug!("模块已完成，跳过: {}", module_id);
                continue;
            }

            // 多个语法模式指向同一模块时合并，每个模式保留一组行号
            match position.get(module_id.as_str()) {
                Some(&i) => modules[i].transcript_line_ids.push(line_ids.clone()),
                None => {
                    position.insert(module_id.as_str(), modules.len());
                    modules.push(GrammarModule {
                        module_id: module_id.clone(),
                        transcript_line_ids: vec![line_ids.clone()],
                        order_index: 0,
                    });
                }
            }
        }
    }

    modules
}

fn build_vocabulary_decks(
    extracted: &ExtractedData,
    policy: &DeckPolicy,
    overrides: Option<&PathOverrides>,
) -> Vec<VocabularyDeck> {
    let limit = policy.max_words.unwrap_or(usize::MAX);
    let words: Vec<&VocabWord> = extracted
        .vocabulary
        .iter()
        .filter(|word| !overrides.is_some_and(|o| o.known_words.contains(&word.word)))
        .take(limit)
        .collect();

    if words.is_empty() {
        return Vec::new();
    }

    let (verbs, others): (Vec<&VocabWord>, Vec<&VocabWord>) = if policy.separate_verb_decks {
        words.into_iter().partition(|word| word.pos.is_verb())
    } else {
        (Vec::new(), words)
    };

    let other_decks = chunk_into_decks(&others, policy.words_per_deck, false);
    let verb_decks = chunk_into_decks(&verbs, policy.words_per_deck, true);

    interleave(other_decks, verb_decks)
}

fn chunk_into_decks(words: &[&VocabWord], words_per_deck: usize, is_verb_deck: bool) -> Vec<VocabularyDeck> {
    words
        .chunks(words_per_deck.max(1))
        .map(|chunk| VocabularyDeck {
            is_verb_deck,
            words: chunk
                .iter()
                .map(|word| DeckWord {
                    word: word.word.clone(),
                    furigana: Some(word.furigana.clone()).filter(|f| !f.is_empty()),
                    english: word.english.clone(),
                })
                .collect(),
            transcript_line_ids: chunk
                .iter()
                .map(|word| word.transcript_line_ids.clone())
                .collect(),
            order_index: 0,
        })
        .collect()
}

// 交替合并，多出来的接在后面
fn interleave(first: Vec<VocabularyDeck>, second: Vec<VocabularyDeck>) -> Vec<VocabularyDeck> {
    let mut merged = Vec::with_capacity(first.len() + second.len());
    let mut first = first.into_iter();
    let mut second = second.into_iter();

    loop {
        match (first.next(), second.next()) {
            (None, None) => break,
            (a, b) => {
                merged.extend(a);
                merged.extend(b);
            }
        }
    }

    merged
}
