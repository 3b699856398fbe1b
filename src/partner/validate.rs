//! Content checks for user-authored persona prompts and partner fields.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::{NewPartner, PartnerUpdate};
use crate::error::CompanionError;

pub const MAX_NAME_CHARS: usize = 20;
pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MAX_HOBBIES: usize = 10;
pub const MAX_HOBBY_CHARS: usize = 50;

const FORBIDDEN_WORDS: &[&str] = &["性的", "エロ", "殺", "暴力", "傷つけ", "違法", "薬物", "犯罪"];

/// A lone capital `H`; inside ASCII words (`HTML`, `Hello`) it is harmless.
static STANDALONE_H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^A-Za-z])H(?:[^A-Za-z]|$)").expect("valid regex"));

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptValidation {
    pub is_valid: bool,
    pub warnings: Vec<String>,
}

pub fn validate_prompt_content(prompt: &str) -> PromptValidation {
    let mut warnings = Vec::new();

    for word in FORBIDDEN_WORDS {
        if prompt.contains(word) {
            warnings.push(format!("不適切な表現が含まれている可能性があります: \"{word}\""));
        }
    }
    if STANDALONE_H.is_match(prompt) {
        warnings.push("不適切な表現が含まれている可能性があります: \"H\"".to_string());
    }

    let has_long_sentence = prompt
        .split(['。', '！', '？'])
        .any(|s| s.chars().count() > 100);
    if has_long_sentence {
        warnings.push("一部の文が長すぎます。短く分割することをお勧めします。".to_string());
    }

    if prompt.trim().chars().count() < 10 {
        warnings.push("プロンプトが短すぎます。より詳細な設定をお勧めします。".to_string());
    }

    // Any warning makes the prompt unusable.
    PromptValidation {
        is_valid: warnings.is_empty(),
        warnings,
    }
}

/// Field limits plus content checks for a new partner.
pub fn validate_new_partner(new: &NewPartner) -> Result<(), CompanionError> {
    check_name(&new.name)?;
    check_hobbies(&new.hobbies)?;
    if new.intimacy_level > 100 {
        return Err(CompanionError::validation("親密度は100以下で入力してください"));
    }
    check_prompt(&new.system_prompt)
}

pub fn validate_update(update: &PartnerUpdate) -> Result<(), CompanionError> {
    if let Some(ref name) = update.name {
        check_name(name)?;
    }
    if let Some(ref hobbies) = update.hobbies {
        check_hobbies(hobbies)?;
    }
    if update.intimacy_level.is_some_and(|l| l > 100) {
        return Err(CompanionError::validation("親密度は100以下で入力してください"));
    }
    match update.system_prompt {
        Some(ref prompt) => check_prompt(prompt),
        None => Ok(()),
    }
}

fn check_name(name: &str) -> Result<(), CompanionError> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(CompanionError::validation("パートナーの名前は1文字以上で入力してください"));
    }
    if len > MAX_NAME_CHARS {
        return Err(CompanionError::validation("パートナーの名前は20文字以内で入力してください"));
    }
    Ok(())
}

fn check_hobbies(hobbies: &[String]) -> Result<(), CompanionError> {
    if hobbies.len() > MAX_HOBBIES {
        return Err(CompanionError::validation("趣味は10個まで登録できます"));
    }
    for hobby in hobbies {
        let len = hobby.chars().count();
        if len == 0 || len > MAX_HOBBY_CHARS {
            return Err(CompanionError::validation("趣味は1文字以上50文字以内で入力してください"));
        }
    }
    Ok(())
}

fn check_prompt(prompt: &str) -> Result<(), CompanionError> {
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(CompanionError::validation(
            "システムプロンプトは1000文字以内で入力してください",
        ));
    }
    let validation = validate_prompt_content(prompt);
    if !validation.is_valid {
        return Err(CompanionError::Validation {
            message: "システムプロンプトに問題があります".into(),
            warnings: validation.warnings,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "穏やかで思いやりのある性格。相手の話をよく聞く。";

    #[test]
    fn clean_prompt_passes() {
        let v = validate_prompt_content(GOOD);
        assert!(v.is_valid);
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn forbidden_word_fails() {
        let v = validate_prompt_content("暴力的な発言を好む性格です。よろしく。");
        assert!(!v.is_valid);
        assert_eq!(v.warnings, vec!["不適切な表現が含まれている可能性があります: \"暴力\""]);
    }

    #[test]
    fn standalone_h_fails_but_words_containing_h_pass() {
        assert!(!validate_prompt_content("ちょっとHな冗談が好きな性格です。").is_valid);
        assert!(validate_prompt_content("HTMLとHaskellが得意なエンジニアです。").is_valid);
    }

    #[test]
    fn long_sentence_and_short_prompt_are_invalid() {
        let long = "あ".repeat(101);
        let v = validate_prompt_content(&long);
        assert!(!v.is_valid);
        assert_eq!(v.warnings, vec!["一部の文が長すぎます。短く分割することをお勧めします。"]);

        let v = validate_prompt_content("短い");
        assert!(!v.is_valid);
        assert_eq!(
            v.warnings,
            vec!["プロンプトが短すぎます。より詳細な設定をお勧めします。"]
        );
        assert!(check_prompt("優しい").is_err());
    }

    #[test]
    fn name_limits() {
        assert!(check_name("").is_err());
        assert!(check_name(&"名".repeat(20)).is_ok());
        assert!(check_name(&"名".repeat(21)).is_err());
    }

    #[test]
    fn prompt_failure_carries_warnings() {
        let err = check_prompt("違法な取引を勧める。犯罪も厭わない。").unwrap_err();
        match err {
            CompanionError::Validation { message, warnings } => {
                assert_eq!(message, "システムプロンプトに問題があります");
                assert_eq!(warnings.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
