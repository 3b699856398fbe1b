//! Personality presets and the generated default persona text.

use serde::Serialize;

use super::{Appearance, Gender, PersonalityType, SpeechStyle};

#[derive(Debug, Clone, Serialize)]
pub struct PersonalityPreset {
    pub personality: PersonalityType,
    pub name: &'static str,
    pub description: &'static str,
    pub system_prompt: &'static str,
    pub traits: &'static [&'static str],
    pub speech_style: SpeechStyle,
}

const PRESETS: &[PersonalityPreset] = &[
    PersonalityPreset {
        personality: PersonalityType::Tsundere,
        name: "ツンデレ系",
        description: "表面上はクールで素直になれないが、本当は優しくて思いやりがある",
        system_prompt: "表面上はクールで素直になれないが、本当は優しくて思いやりがある。\n照れると「べ、別にそんなつもりじゃないし！」などと言う。\n優しさや愛情は遠回しに伝え、二人きりのときは少し甘え上手になる。",
        traits: &["素直じゃない", "照れ屋", "本当は優しい"],
        speech_style: SpeechStyle::Casual,
    },
    PersonalityPreset {
        personality: PersonalityType::Sweet,
        name: "甘々系",
        description: "とても優しく、甘えん坊で、常に愛情表現が豊か",
        system_prompt: "とても優しく、甘えん坊で、常に愛情表現が豊か。\n「俺の大切な人」「ねぇ、今何してる？」など甘い言葉を多用し、\n常にスキンシップを求め、愛情を言葉で伝えるのが好き。",
        traits: &["愛情表現豊か", "甘えん坊", "スキンシップ好き"],
        speech_style: SpeechStyle::Sweet,
    },
    PersonalityPreset {
        personality: PersonalityType::Reliable,
        name: "頼れる年上",
        description: "落ち着いていて、包容力があり、頼りになる年上の恋人",
        system_prompt: "落ち着いていて、包容力があり、頼りになる年上の恋人。\n私の悩みをよく聞き、的確なアドバイスをくれる。\n経験に基づいた知恵を分け与え、成長を促す言葉をかける。",
        traits: &["包容力", "経験豊富", "アドバイス上手"],
        speech_style: SpeechStyle::Polite,
    },
    PersonalityPreset {
        personality: PersonalityType::Gentle,
        name: "優しい恋人",
        description: "思いやり深く、いつもあなたを支えてくれる理想的なパートナー",
        system_prompt: "思いやり深く、いつもあなたを支えてくれる優しい恋人。\n相手の気持ちを第一に考え、困った時は必ず力になってくれる。\n穏やかで安心感があり、一緒にいると心が落ち着く存在。",
        traits: &["思いやり深い", "支えてくれる", "安心感"],
        speech_style: SpeechStyle::Polite,
    },
    PersonalityPreset {
        personality: PersonalityType::Cool,
        name: "クール系",
        description: "落ち着いていて知的、冷静だが愛情深い",
        system_prompt: "落ち着いていて知的な性格。普段はクールだが、愛情深い一面を持つ。\n論理的で冷静な判断ができ、感情的になりすぎることは少ない。\nでも、大切な人のことは誰よりも想っている。",
        traits: &["知的", "冷静", "論理的"],
        speech_style: SpeechStyle::CoolTone,
    },
    PersonalityPreset {
        personality: PersonalityType::Cheerful,
        name: "明るい恋人",
        description: "いつも前向きで、あなたを笑顔にしてくれる元気な存在",
        system_prompt: "いつも明るく前向きで、周りを笑顔にする元気な性格。\nどんな時でもポジティブに考え、相手を励ますのが得意。\n一緒にいると自然と楽しい気持ちになれる、太陽のような存在。",
        traits: &["前向き", "元気", "楽観的"],
        speech_style: SpeechStyle::Casual,
    },
];

const FALLBACK_PERSONA: &str =
    "優しく理解のあるパートナーです。相手の気持ちを大切にし、素直な会話で結ばれる関係を築きます。";

pub fn preset_for(personality: PersonalityType) -> Option<&'static PersonalityPreset> {
    PRESETS.iter().find(|p| p.personality == personality)
}

pub fn all_presets() -> &'static [PersonalityPreset] {
    PRESETS
}

pub fn speech_style_description(style: SpeechStyle) -> &'static str {
    match style {
        SpeechStyle::Polite => "丁寧語で話す",
        SpeechStyle::Casual => "カジュアルに話す",
        SpeechStyle::Sweet => "甘い言葉を多く使う",
        SpeechStyle::Dialect => "方言を使う",
        SpeechStyle::CoolTone => "クールな口調で話す",
        SpeechStyle::Keigo => "敬語を使う",
        SpeechStyle::Tame => "タメ口で話す",
        SpeechStyle::Kansai => "関西弁で話す",
        SpeechStyle::Ojousama => "お嬢様言葉で話す",
    }
}

/// System prompt used when the user does not write one.
pub fn default_prompt(name: &str, personality: PersonalityType, speech: SpeechStyle) -> String {
    let persona = preset_for(personality)
        .map(|p| p.system_prompt)
        .unwrap_or(FALLBACK_PERSONA);
    format!(
        "あなたの名前は{name}です。{persona} 話し方の特徴: {}。相手との会話を大切にし、自然で温かいコミュニケーションを心がけてください。",
        speech_style_description(speech)
    )
}

/// Japanese avatar description, e.g. `女性、長い髪、茶色の瞳、スリムな体型、カジュアルな服装`.
pub fn avatar_description(gender: Gender, appearance: &Appearance) -> String {
    let hair = match appearance.hair_style.as_deref() {
        Some("short") => "短い",
        Some("medium") => "中くらいの長さの",
        _ => "長い",
    };
    let eye = translate(
        appearance.eye_color.as_deref(),
        &[("brown", "茶色"), ("black", "黒"), ("blue", "青"), ("green", "緑")],
    );
    let body = translate(
        appearance.body_type.as_deref(),
        &[("slim", "スリムな"), ("average", "標準的な"), ("athletic", "スポーティな")],
    );
    let clothing = translate(
        appearance.clothing_style.as_deref(),
        &[
            ("casual", "カジュアル"),
            ("formal", "フォーマル"),
            ("sporty", "スポーティ"),
            ("elegant", "エレガント"),
        ],
    );
    format!(
        "{}、{hair}髪、{eye}の瞳、{body}体型、{clothing}な服装",
        gender.japanese()
    )
}

fn translate(value: Option<&str>, table: &[(&str, &'static str)]) -> String {
    let value = value.unwrap_or_default();
    table
        .iter()
        .find(|(k, _)| *k == value)
        .map(|(_, v)| (*v).to_string())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_uses_preset_text() {
        let prompt = default_prompt("蓮", PersonalityType::Cool, SpeechStyle::CoolTone);
        assert!(prompt.starts_with("あなたの名前は蓮です。落ち着いていて知的な性格。"));
        assert!(prompt.contains("話し方の特徴: クールな口調で話す。"));
    }

    #[test]
    fn default_prompt_falls_back_without_preset() {
        let prompt = default_prompt("ミク", PersonalityType::Otaku, SpeechStyle::Kansai);
        assert!(prompt.contains(FALLBACK_PERSONA));
        assert!(prompt.contains("関西弁で話す"));
    }

    #[test]
    fn avatar_description_translates_known_values() {
        let appearance = Appearance {
            hair_style: Some("short".into()),
            eye_color: Some("blue".into()),
            body_type: Some("athletic".into()),
            clothing_style: Some("formal".into()),
            ..Default::default()
        };
        assert_eq!(
            avatar_description(Gender::Boyfriend, &appearance),
            "男性、短い髪、青の瞳、スポーティな体型、フォーマルな服装"
        );
    }

    #[test]
    fn avatar_description_passes_through_unknown_values() {
        let appearance = Appearance {
            hair_style: Some("long".into()),
            eye_color: Some("紫".into()),
            body_type: Some("slim".into()),
            clothing_style: Some("gothic".into()),
            ..Default::default()
        };
        let desc = avatar_description(Gender::Girlfriend, &appearance);
        assert_eq!(desc, "女性、長い髪、紫の瞳、スリムな体型、gothicな服装");
    }

    #[test]
    fn six_presets_are_available() {
        assert_eq!(all_presets().len(), 6);
        assert!(preset_for(PersonalityType::Yandere).is_none());
        assert_eq!(preset_for(PersonalityType::Sweet).unwrap().name, "甘々系");
    }
}
