//! Prompt templates for the enrichment pipeline's LLM calls, lifted into
//! named constants rather than inlined at each call site.

pub const TRANSLATION_SYSTEM_PROMPT: &str =
    "You are a professional academic translator, skilled at rendering English papers accurately into Chinese.";

pub const TRANSLATION_USER_TEMPLATE: &str = r#"Translate the following English academic paper's title and abstract into Chinese:

Title: {title}
Abstract: {summary}

Requirements:
1. Preserve academic tone and accuracy.
2. Use standard Chinese phrasing.
3. Keep technical terms precise.
4. Return the translated title and abstract separately.

Respond in exactly this format:
标题：[translated title]
摘要：[translated abstract]"#;

pub fn build_translation_prompt(title: &str, summary: &str) -> String {
    TRANSLATION_USER_TEMPLATE
        .replace("{title}", title)
        .replace("{summary}", summary)
}

pub const INTERPRETATION_SYSTEM_PROMPT: &str =
    "You are an expert research communicator who writes concise, structured Chinese summaries of academic papers for a general technical audience.";

pub const INTERPRETATION_USER_TEMPLATE: &str = r#"Write a structured Chinese interpretation of the following paper in exactly three `##`-prefixed sections covering background, method, and contribution. Target length: 800 to 1200 characters total.

Title: {title}
Abstract: {summary}

Format:
## 背景
...
## 方法
...
## 贡献
..."#;

pub fn build_interpretation_prompt(title: &str, summary: &str) -> String {
    INTERPRETATION_USER_TEMPLATE
        .replace("{title}", title)
        .replace("{summary}", summary)
}
