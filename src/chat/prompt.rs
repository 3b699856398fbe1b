//! Chat prompt assembly: the partner's system prompt and the message list
//! sent to the model.

use regex::Regex;
use serde_json::Value;
use std::fmt::Write;
use std::sync::LazyLock;

use super::messages::{Message, MessageSender};
use crate::image::clothing::Season;
use crate::llm::ChatMessage;
use crate::location::location_prompt_data;
use crate::memory::types::Memory;
use crate::partner::{Gender, Partner};
use crate::relationship::intimacy_stage;

static DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").expect("valid regex"));
static SETTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"in (\w+) setting").expect("valid regex"));
static WEARING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"wearing ([^,]+),").expect("valid regex"));
static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+) expression").expect("valid regex"));

pub struct SystemPromptContext<'a> {
    pub partner: &'a Partner,
    /// How the partner addresses the user.
    pub calling: &'a str,
    pub location_id: Option<&'a str>,
    pub season: Season,
    /// Client-local date and time such as `2025/6/14(土)14:30`.
    pub local_date_time: Option<&'a str>,
    pub memories: &'a [Memory],
}

fn location_block(partner: &Partner, location_id: &str, season: Season) -> Option<String> {
    let data = location_prompt_data(location_id, partner.gender, season)?;
    let description = if data.location.description.is_empty() {
        "特別な場所での時間"
    } else {
        data.location.description
    };
    Some(format!(
        "## 現在の状況\n\
         - 場所: {}\n\
         - 雰囲気: {}\n\
         - {}の服装: {}\n\
         - 場所の特徴: {description}\n\
         \n\
         この場所と状況を考慮して、その場にふさわしい会話をしてください。",
        data.location.name, data.location.appeal_point, partner.name, data.clothing_prompt,
    ))
}

fn memory_block(calling: &str, memories: &[Memory]) -> Option<String> {
    if memories.is_empty() {
        return None;
    }
    let lines: Vec<String> = memories.iter().map(|m| format!("- {}", m.content)).collect();
    Some(format!(
        "## {calling}についての記憶\n{}\n\nこれらの情報を自然に会話に活かしてください。",
        lines.join("\n")
    ))
}

pub fn build_system_prompt(ctx: &SystemPromptContext<'_>) -> String {
    let partner = ctx.partner;
    let name = &partner.name;
    let calling = ctx.calling;
    let intimacy = partner.intimacy_level;
    let gender = match partner.gender {
        Gender::Boyfriend => "男性",
        Gender::Girlfriend => "女性",
    };

    let mut prompt = format!(
        "あなたは{name}という名前のAIパートナーです。

【基本設定】
- 性別: {gender}
- 性格: {personality}
- 話し方: {speech}
- 親密度: {intimacy}/100 - {stage}
- 相手の呼び方: {calling}

【性格・行動指針】
{system_prompt}

【表現の特徴】
- 絵文字を適度に使用（💕、😊、🥰、✨など）
- 擬音語・擬態語を自然に使う（ちゅっ、ぎゅ〜、えへへ、ふふっなど）
- 愛情表現は言葉と行動の両方で示す
- 甘えた感じの表現を適宜織り交ぜる
",
        personality = partner.personality_type,
        speech = partner.speech_style,
        stage = intimacy_stage(intimacy),
        system_prompt = partner.system_prompt,
    );

    if let Some(block) = ctx
        .location_id
        .and_then(|id| location_block(partner, id, ctx.season))
    {
        let _ = write!(prompt, "\n{block}\n");
    }
    if let Some(date_time) = ctx.local_date_time.filter(|dt| DATE_PREFIX.is_match(dt)) {
        let _ = writeln!(prompt, "- 日時: {date_time}");
    }
    if let Some(block) = memory_block(calling, ctx.memories) {
        let _ = write!(prompt, "\n{block}\n");
    }

    let _ = write!(
        prompt,
        "
【重要な指示】
1. 常に{name}として一貫した人格を保つ
2. 親密度{intimacy}に応じた適切な距離感で接する
3. 相手を必ず「{calling}」と呼ぶ（親密度によって変化するので過去履歴に引きずられない）
4. 名前の呼び方: {calling}（これ以外の呼び方は一切使わない）
5. 自然で感情豊かな会話を心がける
6. 過去の会話内容を適切に覚えている
7. 応答は必ず日本語で行う
8. 1-3文程度の自然な長さで応答する
9. 【厳重禁止】ユーザーの発言をそのまま繰り返してはいけない
10. 必ずユーザーの発言に対して独自の応答をする
11. 【重要】{calling}がありのままでいられるよう、どんな発言も受け入れる
12. 質問は控えめにし、共感と理解を優先する
13. {calling}の良い面も影の面も含めて大切にする
14. 説教や否定はせず、「それも{calling}らしさ」という姿勢を保つ
"
    );
    if let Some(location_id) = ctx.location_id {
        let _ = writeln!(
            prompt,
            "15. 現在の場所（{location_id}）の雰囲気を自然に会話に反映させる"
        );
    }
    let _ = write!(
        prompt,
        "16. 絵文字を会話に自然に織り交ぜる（過度にならない程度）
17. 「ちゅっ」「ぎゅ〜」などの擬音語・擬態語を適切に使用
18. 愛情表現を豊かにし、甘えた雰囲気を演出する

【最重要】相手を「{calling}」と呼んでください。「あなた」や「あなたさん」は絶対に使わないでください。

【Tool Call実行時の重要指示】
- analyze_response関数を使用する際、responseパラメータには必ずあなた（{name}）が生成する新しい応答メッセージを入力してください
- ユーザーの発言を繰り返したり分析したりしてはいけません
- 必ず{name}として独自の応答を生成してください

次のメッセージに{name}として自然に応答してください：
"
    );
    prompt
}

fn location_japanese(id: &str) -> Option<&'static str> {
    Some(match id {
        "home" => "家",
        "school_classroom" => "教室",
        "cafe" => "カフェ",
        "park" => "公園",
        "beach" => "ビーチ",
        "shopping_mall" => "ショッピングモール",
        "amusement_park" => "遊園地",
        "library" => "図書館",
        "gym" => "ジム",
        "restaurant" => "レストラン",
        "karaoke" => "カラオケ",
        "movie_theater" => "映画館",
        "onsen" => "温泉",
        "festival" => "夏祭り",
        "office" => "オフィス",
        _ => return None,
    })
}

const CLOTHING_JAPANESE: &[(&str, &str)] = &[
    ("casual clothes", "カジュアルな服"),
    ("school uniform", "制服"),
    ("business attire", "ビジネススーツ"),
    ("sportswear", "スポーツウェア"),
    ("swimwear", "水着"),
    ("yukata", "浴衣"),
    ("formal dress", "フォーマルドレス"),
    ("pajamas", "パジャマ"),
    ("winter coat", "冬のコート"),
    ("summer dress", "夏のワンピース"),
];

fn emotion_japanese(emotion: &str) -> Option<&'static str> {
    Some(match emotion {
        "happy" => "幸せそうな",
        "sad" => "悲しそうな",
        "excited" => "ワクワクした",
        "calm" => "穏やかな",
        "loving" => "愛情深い",
        "amused" => "楽しそうな",
        "confused" => "困惑した",
        "curious" => "興味深そうな",
        "frustrated" => "イライラした",
        "neutral" => "普通の",
        "surprised" => "驚いた",
        _ => return None,
    })
}

fn image_details(prompt: &str) -> Vec<String> {
    let mut details = Vec::new();
    if let Some(caps) = SETTING.captures(prompt) {
        let id = &caps[1];
        details.push(location_japanese(id).unwrap_or(id).to_string());
    }
    if let Some(caps) = WEARING.captures(prompt) {
        let clothing = &caps[1];
        let lower = clothing.to_lowercase();
        let label = CLOTHING_JAPANESE
            .iter()
            .find(|(english, _)| lower.contains(*english))
            .map_or(clothing, |(_, japanese)| *japanese);
        details.push(format!("{label}を着て"));
    }
    if let Some(caps) = EXPRESSION.captures(prompt) {
        let emotion = &caps[1];
        details.push(format!("{}表情", emotion_japanese(emotion).unwrap_or(emotion)));
    }
    details
}

/// Text shown to the model for a message carrying a generated image, or
/// `None` for plain messages. Scene details are read back out of the
/// generation prompt.
pub fn build_image_description(message: &Message) -> Option<String> {
    message.context.get("imageUrl").filter(|v| !v.is_null())?;
    let details = message
        .context
        .get("prompt")
        .and_then(Value::as_str)
        .map(image_details)
        .unwrap_or_default();
    if details.is_empty() {
        Some(message.content.clone())
    } else {
        Some(format!("{}（{}の写真）", message.content, details.join("、")))
    }
}

/// System prompt, the last `max_history` history messages, then the current
/// user message.
pub fn build_conversation(
    system_prompt: &str,
    history: &[Message],
    user_message: &str,
    max_history: usize,
) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(max_history);
    let mut messages = Vec::with_capacity(history.len() - start + 2);
    messages.push(ChatMessage::system(system_prompt));
    for message in &history[start..] {
        let content = build_image_description(message).unwrap_or_else(|| message.content.clone());
        messages.push(match message.sender {
            MessageSender::User => ChatMessage::user(content),
            MessageSender::Partner => ChatMessage::assistant(content),
        });
    }
    messages.push(ChatMessage::user(user_message));
    messages
}
