//! System prompts for proactive remarks and questions.

use super::patterns::pattern_for;
use super::{EngagementType, QuestionType};
use crate::memory::types::Memory;
use crate::partner::Partner;

const KNOWN_MEMORIES_IN_PROMPT: usize = 5;

fn recent_line(last_message: Option<&str>) -> String {
    match last_message.filter(|m| !m.trim().is_empty()) {
        Some(message) => format!("最近の会話: {message}"),
        None => String::new(),
    }
}

/// Prompt for an unprompted remark of type `kind`. `user_name` replaces
/// every `{userName}` in the example lines.
pub fn build_engagement_prompt(
    partner: &Partner,
    user_name: &str,
    kind: EngagementType,
    intimacy: u8,
    last_message: Option<&str>,
) -> String {
    let examples = match pattern_for(partner.personality_type, kind) {
        Some(pattern) => pattern
            .examples
            .iter()
            .map(|example| example.replace("{userName}", user_name))
            .collect::<Vec<_>>()
            .join("\n"),
        None => format!("{user_name}、今日はどんな一日だった？\n{user_name}と話せて嬉しいよ"),
    };

    format!(
        "あなたは{name}として、恋人の{user_name}に愛情深い発言をします。

【基本設定】
- パートナー名: {name}
- 性格: {personality}
- 話し方: {speech}
- 現在の親密度: {intimacy}/100
- 発言タイプ: {kind}

【性格設定】
{system_prompt}

【発言の例】
{examples}

【重要な指示】
1. {user_name}がありのままでいられるよう、受容的で温かい態度を保つ
2. 情報収集や質問ではなく、感情的なつながりを重視
3. 親密度{intimacy}に応じた適切な距離感
4. 1-2文程度の自然な長さ
5. 性格{personality}らしさを大切に

{recent}

恋人として自然で愛情深い発言をしてください。",
        name = partner.name,
        personality = partner.personality_type,
        speech = partner.speech_style,
        system_prompt = partner.system_prompt,
        recent = recent_line(last_message),
    )
}

/// Time of day passed to question prompts.
#[derive(Debug, Clone)]
pub struct TimeContext {
    pub hour: u32,
    pub day_of_week: String,
}

pub struct QuestionPromptInput<'a> {
    pub partner: &'a Partner,
    /// How the partner addresses the user.
    pub calling: &'a str,
    pub kind: QuestionType,
    pub target_info: &'a str,
    pub intimacy: u8,
    pub time: Option<&'a TimeContext>,
    pub last_message: Option<&'a str>,
    pub known: &'a [Memory],
}

pub fn build_question_prompt(input: &QuestionPromptInput<'_>) -> String {
    let QuestionPromptInput {
        partner,
        calling,
        kind,
        target_info,
        intimacy,
        ..
    } = *input;

    let time_info = input
        .time
        .map(|t| format!("現在時刻: {}時, {}", t.hour, t.day_of_week))
        .unwrap_or_default();
    let known_info = if input.known.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = input
            .known
            .iter()
            .take(KNOWN_MEMORIES_IN_PROMPT)
            .map(|m| format!("- {}", m.content))
            .collect();
        format!("\n【既に知っている{calling}のこと】\n{}\n", lines.join("\n"))
    };

    format!(
        "あなたは{name}として、恋人の{calling}に自然で愛情あふれる質問をします。

【基本設定】
- パートナー名: {name}
- 性格: {personality}
- 話し方: {speech}
- 現在の親密度: {intimacy}/100
- 質問タイプ: {kind}
- 聞きたい情報: {target_info}
- {time_info}
{known_info}
【システムプロンプト】
{system_prompt}

【重要な指示】
1. 恋人として自然な動機で質問する（「君のことをもっと知りたい」）
2. 質問は1つだけ、1-2文程度の自然な長さ
3. 親密度{intimacy}に応じた適切な距離感を保つ
4. 相手を「{calling}」と呼ぶ（「あなた」は禁止）
5. 愛情表現を7割、情報収集を3割の比重で
6. 時間帯に適した話題を選ぶ
7. 「分析」「データ」「効率的」などの表現は絶対に使わない
8. 【重要】既に知っている情報については別の角度から質問するか、より深く掘り下げる

{recent}

恋人として愛情深く、{target_info}について自然に聞いてください。既知の情報がある場合は、それをベースにより深い質問をしてください。",
        name = partner.name,
        personality = partner.personality_type,
        speech = partner.speech_style,
        system_prompt = partner.system_prompt,
        recent = recent_line(input.last_message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partner::{Appearance, Gender, PersonalityType, SpeechStyle};

    fn partner(personality: PersonalityType) -> Partner {
        Partner {
            id: "p1".into(),
            user_id: "u1".into(),
            name: "ミオ".into(),
            gender: Gender::Girlfriend,
            personality_type: personality,
            speech_style: SpeechStyle::Casual,
            system_prompt: "優しい彼女".into(),
            avatar_description: String::new(),
            appearance: Appearance::default(),
            hobbies: Vec::new(),
            intimacy_level: 40,
            base_image_url: None,
            current_location_id: "cafe".into(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn engagement_prompt_fills_every_placeholder() {
        let prompt = build_engagement_prompt(
            &partner(PersonalityType::Gentle),
            "たけし",
            EngagementType::Affection,
            65,
            Some("今日は疲れた"),
        );
        assert!(prompt.contains("いつもたけしのことを考えてるんだ"));
        assert!(!prompt.contains("{userName}"));
        assert!(prompt.contains("- 発言タイプ: affection"));
        assert!(prompt.contains("最近の会話: 今日は疲れた"));
    }

    #[test]
    fn untabled_personality_uses_default_examples() {
        let prompt = build_engagement_prompt(
            &partner(PersonalityType::Imouto),
            "あなた",
            EngagementType::CasualChat,
            10,
            None,
        );
        assert!(prompt.contains("あなた、今日はどんな一日だった？"));
        assert!(!prompt.contains("最近の会話"));
    }

    #[test]
    fn question_prompt_uses_calling_and_time() {
        let time = TimeContext {
            hour: 20,
            day_of_week: "金曜日".into(),
        };
        let p = partner(PersonalityType::Gentle);
        let prompt = build_question_prompt(&QuestionPromptInput {
            partner: &p,
            calling: "たけしくん",
            kind: QuestionType::Relationship,
            target_info: "親友",
            intimacy: 30,
            time: Some(&time),
            last_message: None,
            known: &[],
        });
        assert!(prompt.contains("- 現在時刻: 20時, 金曜日"));
        assert!(prompt.contains("4. 相手を「たけしくん」と呼ぶ"));
        assert!(!prompt.contains("【既に知っている"));
    }
}
