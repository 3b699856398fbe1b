//! Choosing what a proactive question should ask about, steering away from
//! what memory already knows.

use rand::Rng;
use std::collections::HashSet;

use super::QuestionType;
use crate::memory::types::Memory;

/// Question types open at `intimacy`, deepest first.
pub fn available_question_types(intimacy: u8) -> &'static [QuestionType] {
    use QuestionType::*;
    match intimacy {
        75..=u8::MAX => &[ValuesFuture, DeepUnderstanding, Relationship, BasicInfo, EmotionalSupport],
        50..=74 => &[DeepUnderstanding, Relationship, BasicInfo],
        25..=49 => &[Relationship, BasicInfo],
        _ => &[BasicInfo],
    }
}

/// Memory tags that mean a category has already been covered.
fn category_tags(kind: QuestionType) -> &'static [&'static str] {
    match kind {
        QuestionType::BasicInfo => &["趣味", "仕事", "年齢", "好き", "音楽", "スポーツ"],
        QuestionType::Relationship => &["家族", "友人", "恋愛", "人間関係"],
        QuestionType::DeepUnderstanding => &["価値観", "考え方", "経験", "過去"],
        QuestionType::ValuesFuture => &["将来", "夢", "目標", "老後", "理想"],
        QuestionType::EmotionalSupport => &["感情", "気持ち", "悩み"],
        QuestionType::FollowUp => &[],
    }
}

fn target_candidates(kind: QuestionType) -> &'static [&'static str] {
    match kind {
        QuestionType::BasicInfo => &["名前の由来", "職業", "出身地", "趣味", "日常ルーティン", "好きな食べ物", "好きな音楽", "スポーツ"],
        QuestionType::Relationship => &["家族構成", "親友", "職場の人間関係", "恋愛経験", "大切な人", "友達との思い出"],
        QuestionType::DeepUnderstanding => &["幼少期の思い出", "人生の転機", "大切にしている価値観", "影響を受けた人", "人生観"],
        QuestionType::ValuesFuture => &["将来の夢", "人生で大切なこと", "理想の老後", "5年後の目標", "人生の意味"],
        QuestionType::FollowUp => &["以前の話題の続き"],
        QuestionType::EmotionalSupport => &["現在の気持ち", "悩み事", "ストレス", "最近の調子", "心配事"],
    }
}

fn pick<T: Copy>(items: &[T], rng: &mut impl Rng) -> T {
    items[rng.gen_range(0..items.len())]
}

/// Random type open at `intimacy`, preferring categories none of the
/// memories' tags cover yet.
pub fn determine_question_type(intimacy: u8, memories: &[Memory], rng: &mut impl Rng) -> QuestionType {
    let known: HashSet<&str> = memories
        .iter()
        .flat_map(|m| m.tags.iter().map(String::as_str))
        .collect();
    let available = available_question_types(intimacy);
    let unknown: Vec<QuestionType> = available
        .iter()
        .copied()
        .filter(|kind| !category_tags(*kind).iter().any(|tag| known.contains(tag)))
        .collect();

    if unknown.is_empty() {
        tracing::debug!(intimacy, "every question category already known");
        pick(available, rng)
    } else {
        pick(&unknown, rng)
    }
}

fn already_covered(candidate: &str, memories: &[Memory]) -> bool {
    memories.iter().any(|m| {
        m.content.to_lowercase().contains(&candidate.to_lowercase())
            || m
                .tags
                .iter()
                .any(|tag| !tag.is_empty() && (tag.contains(candidate) || candidate.contains(tag.as_str())))
    })
}

/// The specific topic to ask about. When every candidate is covered, a
/// random one is asked about in more depth (`{topic}の詳細`).
pub fn select_target_info(kind: QuestionType, memories: &[Memory], rng: &mut impl Rng) -> String {
    let candidates = target_candidates(kind);
    let fresh: Vec<&str> = candidates
        .iter()
        .copied()
        .filter(|c| !already_covered(c, memories))
        .collect();

    if fresh.is_empty() {
        format!("{}の詳細", pick(candidates, rng))
    } else {
        pick(&fresh, rng).to_string()
    }
}

/// Minimum intimacy at which asking about `target` is appropriate.
pub fn required_intimacy_for_info(target: &str) -> u8 {
    match target {
        "家族構成" | "親友" | "恋愛経験" => 25,
        "幼少期の思い出" | "人生の転機" | "トラウマ" => 50,
        "将来の夢" | "価値観" | "人生で大切なこと" => 60,
        _ => 0,
    }
}
