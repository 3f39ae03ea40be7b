use aac_translator::prompts::{render_detect_language_prompt, render_translate_prompt};

#[test]
fn detect_language_prompt_snapshot() {
    let prompt = render_detect_language_prompt().unwrap();
    insta::assert_snapshot!(prompt, @r"
    Identify the language of the text provided by the user.
    Respond with the English name of the language only (for example: French), without any other words or punctuation.
    ");
}

#[test]
fn translate_prompt_snapshot() {
    let prompt = render_translate_prompt("French", "English").unwrap();
    insta::assert_snapshot!(prompt, @r"
    You are a professional translator. Translate the text provided by the user from French to English.
    Translate literally and faithfully, keeping the meaning, tone and formatting of the original.
    Respond with the translated text only. Do not add explanations, notes, quotes or any other commentary.
    ");
}
