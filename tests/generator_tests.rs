mod common;

use common::*;
use path_creator::{
    Curriculum, DeckPolicy, ExtractOptions, ExtractedData, LearningPathModule, PathOverrides,
    create_learning_path, extract_transcript_data,
};
use std::collections::HashSet;

async fn extracted() -> ExtractedData {
    let tokenizer = ScriptedTokenizer::new()
        .line(
            "昨日映画を見ました。",
            vec![noun("昨日", "きのう"), noun("映画", "えいが"), particle("を"), verb("見る", "みる")],
            &["past-tense-ました"],
        )
        .line(
            "ご飯を食べている",
            vec![noun("ご飯", "ごはん"), particle("を"), verb("食べる", "たべる"), verb("いる", "いる")],
            &["te-form", "te-iru"],
        )
        .line(
            "映画を見ている",
            vec![noun("映画", "えいが"), particle("を"), verb("見る", "みる"), verb("いる", "いる")],
            &["te-iru"],
        );
    let lines = transcript(&["昨日映画を見ました。", "ご飯を食べている", "映画を見ている"]);

    extract_transcript_data(
        &tokenizer,
        &registry(),
        &lines,
        ExtractOptions {
            curriculum: CURRICULUM,
            concurrent_requests: 1,
        },
    )
    .await
    .unwrap()
}

fn policy(words_per_deck: usize, separate_verb_decks: bool) -> DeckPolicy {
    DeckPolicy {
        words_per_deck,
        separate_verb_decks,
        max_words: None,
    }
}

#[tokio::test]
async fn test_order_index_is_contiguous() {
    let data = extracted().await;
    let path = create_learning_path(&data, CURRICULUM, &registry(), &policy(2, true), None);

    let indices: Vec<usize> = path.modules().iter().map(|m| m.order_index()).collect();
    let expected: Vec<usize> = (0..path.len()).collect();
    assert_eq!(indices, expected);
}

#[tokio::test]
async fn test_grammar_modules_precede_decks_and_share_module_ids() {
    let data = extracted().await;
    let path = create_learning_path(&data, CURRICULUM, &registry(), &policy(20, false), None);

    let kinds: Vec<&str> = path
        .modules()
        .iter()
        .map(|m| match m {
            LearningPathModule::Grammar(_) => "grammar",
            LearningPathModule::Vocabulary(_) => "vocabulary",
        })
        .collect();
    assert_eq!(kinds, vec!["grammar", "grammar", "grammar", "vocabulary"]);

    let grammar: Vec<_> = path.grammar_modules().collect();
    let ids: Vec<&str> = grammar.iter().map(|g| g.module_id.as_str()).collect();
    // te-form -> lesson-6, lesson-7；te-iru -> lesson-7 合并到已有模块
    assert_eq!(ids, vec!["genki1-lesson-4", "genki1-lesson-6", "genki1-lesson-7"]);
    assert_eq!(grammar[0].transcript_line_ids, vec![vec![0]]);
    assert_eq!(grammar[2].transcript_line_ids, vec![vec![1], vec![1, 2]]);
}

#[tokio::test]
async fn test_other_curriculum_skips_unresolved_patterns() {
    let data = extracted().await;
    let path = create_learning_path(&data, Curriculum::Tobira, &registry(), &policy(20, false), None);

    let ids: Vec<&str> = path.grammar_modules().map(|g| g.module_id.as_str()).collect();
    assert_eq!(ids, vec!["tobira-review-1"]);
    assert_eq!(path.modules()[0].order_index(), 0);
}

#[tokio::test]
async fn test_verb_decks_separated() {
    let data = extracted().await;
    let path = create_learning_path(&data, CURRICULUM, &registry(), &policy(20, true), None);

    let decks: Vec<_> = path.vocabulary_decks().collect();
    assert_eq!(decks.len(), 2);
    assert!(!decks[0].is_verb_deck);
    assert!(decks[1].is_verb_deck);

    let nouns: Vec<&str> = decks[0].words.iter().map(|w| w.word.as_str()).collect();
    let verbs: Vec<&str> = decks[1].words.iter().map(|w| w.word.as_str()).collect();
    assert_eq!(nouns, vec!["映画", "昨日", "ご飯"]);
    assert_eq!(verbs, vec!["見る", "いる", "食べる"]);
    assert_eq!(decks[1].transcript_line_ids[0], vec![0, 2]);
    assert_eq!(decks[0].words[0].furigana.as_deref(), Some("えいが"));
}

#[tokio::test]
async fn test_overrides_skip_completed_modules_and_known_words() {
    let data = extracted().await;
    let overrides = PathOverrides {
        known_words: ["映画".to_string(), "いる".to_string()].into_iter().collect(),
        completed_modules: ["genki1-lesson-7".to_string()].into_iter().collect::<HashSet<_>>(),
    };

    let path = create_learning_path(&data, CURRICULUM, &registry(), &policy(20, false), Some(&overrides));

    let ids: Vec<&str> = path.grammar_modules().map(|g| g.module_id.as_str()).collect();
    assert_eq!(ids, vec!["genki1-lesson-4", "genki1-lesson-6"]);

    let words: Vec<&str> = path
        .vocabulary_decks()
        .flat_map(|d| d.words.iter().map(|w| w.word.as_str()))
        .collect();
    assert!(!words.contains(&"映画"));
    assert!(!words.contains(&"いる"));
    assert_eq!(path.modules().last().unwrap().order_index(), path.len() - 1);
}

#[test]
fn test_empty_extraction_gives_empty_path() {
    let path = create_learning_path(
        &ExtractedData::default(),
        CURRICULUM,
        &registry(),
        &DeckPolicy::default(),
        None,
    );
    assert!(path.is_empty());
}

#[test]
fn test_grammar_only_path_when_vocabulary_empty() {
    let mut data = ExtractedData::default();
    data.grammar_patterns.push("polite-ます".to_string());
    data.grammar_pattern_line_ids.insert("polite-ます".to_string(), vec![0]);

    let path = create_learning_path(&data, CURRICULUM, &registry(), &DeckPolicy::default(), None);

    assert_eq!(path.len(), 1);
    assert_eq!(path.vocabulary_decks().count(), 0);
}
