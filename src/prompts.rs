//! Prompts sent to the inference endpoint.
//!
//! Both prompts live here so the client module only deals with request
//! framing. The wording matches the product's original Chinese UI; the model
//! answers in whatever language the image (or the requested target) uses.

use crate::config::TargetLanguage;

/// Instruction paired with the image in the extraction request.
///
/// Asks for every piece of text (titles, body, symbols) with the original
/// layout and paragraph structure kept.
pub const EXTRACT_PROMPT: &str =
    "请提取这张图片中的所有文字内容,包括标题、正文和标志性符号。请保持原有格式和段落结构。";

/// Build the single-string translation request.
///
/// The target is named by its display label and the model is asked to keep
/// the source's format, tone and idiom.
pub fn translate_prompt(target: TargetLanguage, text: &str) -> String {
    format!(
        "请将以下文字翻译成{},保持原有格式、语气和语言习惯:\n\n{}",
        target.label(),
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_prompt_embeds_label_and_text() {
        let p = translate_prompt(TargetLanguage::En, "你好");
        assert!(p.contains("英语"));
        assert!(p.ends_with("\n\n你好"));
    }
}
