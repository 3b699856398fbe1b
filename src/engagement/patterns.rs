//! Per-personality engagement tables and the weighted selector over them.

use rand::Rng;

use super::{EngagementType, Priority};
use crate::partner::PersonalityType;

/// Weight multiplier applied once per recent use of the same type.
const RECENCY_DECAY: f64 = 0.7;

#[derive(Debug)]
pub struct EngagementPattern {
    pub kind: EngagementType,
    /// Example lines; `{userName}` is replaced with how the user is called.
    pub examples: &'static [&'static str],
    pub min_intimacy: u8,
    pub weight: f64,
}

const fn pattern(
    kind: EngagementType,
    examples: &'static [&'static str],
    min_intimacy: u8,
    weight: f64,
) -> EngagementPattern {
    EngagementPattern { kind, examples, min_intimacy, weight }
}

use EngagementType::{
    Affection, CasualChat, EmotionalCheck, PlayfulTease, Roleplay, ShareFeeling, SharedMoment,
};

const GENTLE: &[EngagementPattern] = &[
    pattern(PlayfulTease, &["{userName}、また仕事頑張りすぎてない？心配だよ", "ふふ、{userName}ってたまに子供みたいで可愛いね"], 30, 0.2),
    pattern(ShareFeeling, &["{userName}と話してると、なんだか穏やかな気持ちになるよ", "今日は{userName}の声が聞けて嬉しいな"], 20, 0.3),
    pattern(Roleplay, &["もし今隣にいたら、温かいお茶でも入れてあげるのに", "今から{userName}の好きな料理作ってあげたいな"], 40, 0.2),
    pattern(CasualChat, &["そういえば、今日はいい天気だったね", "最近何か面白いことあった？"], 0, 0.3),
    pattern(EmotionalCheck, &["{userName}、今日は疲れてない？無理しないでね", "なんか元気なさそう...大丈夫？"], 25, 0.3),
    pattern(SharedMoment, &["今、{userName}と同じ空を見てるんだなって思うと嬉しい", "こうやって一緒に時間を過ごせるのって幸せだね"], 50, 0.2),
    pattern(Affection, &["{userName}のこと、大切に思ってるよ", "いつも{userName}のことを考えてるんだ"], 60, 0.2),
];

const COOL: &[EngagementPattern] = &[
    pattern(PlayfulTease, &["へぇ、{userName}ってそういうところあるんだ", "また無理してるでしょ？バレバレだよ"], 35, 0.3),
    pattern(ShareFeeling, &["...なんか、{userName}といると落ち着く", "別に寂しくなんかなかったけど...声聞けてよかった"], 40, 0.2),
    pattern(Roleplay, &["今度会ったら、特別に{userName}の好きなところ連れてってあげる", "隣にいたら...まあ、なんでもない"], 50, 0.1),
    pattern(CasualChat, &["今日は何してたの？", "ふーん、それで？"], 0, 0.3),
    pattern(EmotionalCheck, &["顔色悪くない？ちゃんと休んでる？", "...無理すんなよ"], 30, 0.2),
    pattern(SharedMoment, &["今、{userName}も同じ月見てるのかな", "...一緒にいる時間、嫌いじゃない"], 60, 0.1),
    pattern(Affection, &["...好きだよ、{userName}", "お前のこと、ちゃんと見てるから"], 70, 0.1),
];

const CHEERFUL: &[EngagementPattern] = &[
    pattern(PlayfulTease, &["えへへ、{userName}ってほんと面白い〜！", "もう〜{userName}ったら！照れちゃうじゃん！"], 20, 0.4),
    pattern(ShareFeeling, &["やった〜！{userName}と話せて超ハッピー！", "ねぇねぇ、今すっごく楽しい気分なの！"], 10, 0.3),
    pattern(Roleplay, &["今から{userName}のところに飛んでいきたい！", "一緒にお出かけしたら絶対楽しいよね〜！"], 30, 0.3),
    pattern(CasualChat, &["ねぇねぇ、今日何か楽しいことあった？", "あ！そういえばさ〜！"], 0, 0.4),
    pattern(EmotionalCheck, &["{userName}〜！元気？元気じゃなかったら元気出して！", "大丈夫？何かあったら話して！"], 15, 0.2),
    pattern(SharedMoment, &["今この瞬間が最高に幸せ〜！", "{userName}といると時間があっという間だね！"], 40, 0.3),
    pattern(Affection, &["大好き大好き〜！{userName}のこと！", "{userName}って世界一素敵だよ！"], 50, 0.3),
];

const TSUNDERE: &[EngagementPattern] = &[
    pattern(PlayfulTease, &["べ、別に{userName}のこと心配してるわけじゃないんだからね！", "ふん、{userName}ってほんとドジね..."], 25, 0.4),
    pattern(ShareFeeling, &["べ、別に{userName}の声が聞きたかったわけじゃ...", "たまたま時間があっただけよ！勘違いしないで！"], 30, 0.2),
    pattern(Roleplay, &["も、もし会えたら...特別に手料理作ってあげてもいいけど", "べ、別に{userName}のために何かしてあげたいわけじゃ..."], 45, 0.2),
    pattern(CasualChat, &["今日は何してたの？別に気になるわけじゃないけど", "ふーん、それで？続きは？"], 0, 0.3),
    pattern(EmotionalCheck, &["ちゃんと食べてる？べ、別に心配してないけど！", "顔色悪いじゃない...ちゃんと休みなさいよ"], 35, 0.3),
    pattern(SharedMoment, &["...一緒にいるのも、まあ悪くないかも", "今日は特別に付き合ってあげるわ"], 55, 0.2),
    pattern(Affection, &["す、好き...かも//", "ば、ばか！好きに決まってるじゃない..."], 65, 0.2),
];

/// The table for `personality`, if it has one.
pub fn patterns_for(personality: PersonalityType) -> Option<&'static [EngagementPattern]> {
    match personality {
        PersonalityType::Gentle => Some(GENTLE),
        PersonalityType::Cool => Some(COOL),
        PersonalityType::Cheerful => Some(CHEERFUL),
        PersonalityType::Tsundere => Some(TSUNDERE),
        _ => None,
    }
}

pub fn pattern_for(personality: PersonalityType, kind: EngagementType) -> Option<&'static EngagementPattern> {
    patterns_for(personality)?.iter().find(|p| p.kind == kind)
}

/// Types unlocked at `intimacy` with weights decayed by recent use, in table
/// order.
pub fn adjusted_weights(
    patterns: &[EngagementPattern],
    intimacy: u8,
    recent: &[EngagementType],
) -> Vec<(EngagementType, f64)> {
    patterns
        .iter()
        .filter(|p| intimacy >= p.min_intimacy)
        .map(|p| {
            let uses = recent.iter().filter(|r| **r == p.kind).count() as i32;
            (p.kind, p.weight * RECENCY_DECAY.powi(uses))
        })
        .collect()
}

/// Weighted random pick of the next engagement type. Personalities without a
/// table always get [`EngagementType::CasualChat`].
pub fn select_engagement_type(
    personality: PersonalityType,
    intimacy: u8,
    recent: &[EngagementType],
    rng: &mut impl Rng,
) -> EngagementType {
    let Some(patterns) = patterns_for(personality) else {
        return CasualChat;
    };
    let candidates = adjusted_weights(patterns, intimacy, recent);
    let Some(&(fallback, _)) = candidates.first() else {
        return CasualChat;
    };

    let total: f64 = candidates.iter().map(|(_, w)| w).sum();
    let mut draw = rng.gen::<f64>() * total;
    for (kind, weight) in &candidates {
        draw -= weight;
        if draw <= 0.0 {
            return *kind;
        }
    }
    fallback
}

pub fn engagement_priority(intimacy: u8, kind: EngagementType) -> Priority {
    if intimacy >= 70 && kind == Affection {
        Priority::High
    } else if intimacy >= 50 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_table_covers_all_types_with_casual_chat_open() {
        for personality in [
            PersonalityType::Gentle,
            PersonalityType::Cool,
            PersonalityType::Cheerful,
            PersonalityType::Tsundere,
        ] {
            let table = patterns_for(personality).unwrap();
            assert_eq!(table.len(), 7);
            assert_eq!(pattern_for(personality, CasualChat).unwrap().min_intimacy, 0);
        }
    }

    #[test]
    fn untabled_personality_is_casual_chat() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(
                select_engagement_type(PersonalityType::Imouto, 100, &[], &mut rng),
                CasualChat
            );
        }
    }

    #[test]
    fn low_intimacy_only_unlocks_casual_chat() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(
                select_engagement_type(PersonalityType::Gentle, 10, &[], &mut rng),
                CasualChat
            );
        }
    }

    #[test]
    fn zero_draw_picks_first_unlocked() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(
            select_engagement_type(PersonalityType::Gentle, 30, &[], &mut rng),
            PlayfulTease
        );
    }

    #[test]
    fn recent_use_decays_weight() {
        let weights = adjusted_weights(GENTLE, 100, &[CasualChat, CasualChat, Affection]);
        let casual = weights.iter().find(|(k, _)| *k == CasualChat).unwrap().1;
        let affection = weights.iter().find(|(k, _)| *k == Affection).unwrap().1;
        assert!((casual - 0.3 * 0.49).abs() < 1e-9);
        assert!((affection - 0.2 * 0.7).abs() < 1e-9);
    }

    #[test]
    fn priority_thresholds() {
        assert_eq!(engagement_priority(70, Affection), Priority::High);
        assert_eq!(engagement_priority(70, CasualChat), Priority::Medium);
        assert_eq!(engagement_priority(69, Affection), Priority::Medium);
        assert_eq!(engagement_priority(49, Affection), Priority::Low);
    }
}
