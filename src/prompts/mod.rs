use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

pub const MIN_EASY_READ_LEVEL: u8 = 1;
pub const MAX_EASY_READ_LEVEL: u8 = 15;
pub const AAC_SEPARATOR: &str = " - ";

const TRANSLATE_TEMPLATE: &str = include_str!("templates/translate.tera");
const SIMPLIFY_TEMPLATE: &str = include_str!("templates/simplify.tera");
const AAC_TEMPLATE: &str = include_str!("templates/aac.tera");
const DETECT_LANGUAGE_TEMPLATE: &str = include_str!("templates/detect_language.tera");
const EXTRACT_TEXT_TEMPLATE: &str = include_str!("templates/extract_text.tera");

pub const EXTRACT_TEXT_USER_INPUT: &str = "Extract the text from this image.";

pub fn render_translate_prompt(source_lang: &str, target_lang: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("source_lang", source_lang);
    context.insert("target_lang", target_lang);
    render("translate", TRANSLATE_TEMPLATE, &context)
}

pub fn render_simplify_prompt(lang: &str, level: u8) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("lang", lang);
    context.insert("level", &clamp_level(level));
    context.insert("min_level", &MIN_EASY_READ_LEVEL);
    context.insert("max_level", &MAX_EASY_READ_LEVEL);
    render("simplify", SIMPLIFY_TEMPLATE, &context)
}

pub fn render_aac_prompt(lang: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("lang", lang);
    context.insert("separator", AAC_SEPARATOR);
    render("aac", AAC_TEMPLATE, &context)
}

pub fn render_detect_language_prompt() -> Result<String> {
    render(
        "detect_language",
        DETECT_LANGUAGE_TEMPLATE,
        &TeraContext::new(),
    )
}

pub fn render_extract_text_prompt() -> Result<String> {
    render("extract_text", EXTRACT_TEXT_TEMPLATE, &TeraContext::new())
}

pub fn clamp_level(level: u8) -> u8 {
    level.clamp(MIN_EASY_READ_LEVEL, MAX_EASY_READ_LEVEL)
}

fn render(name: &str, template: &str, context: &TeraContext) -> Result<String> {
    let rendered = Tera::one_off(template, context, false)
        .with_context(|| format!("failed to render {} prompt", name))?;
    Ok(rendered.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_prompt_names_both_languages() {
        let prompt = render_translate_prompt("French", "English").unwrap();
        assert!(prompt.contains("from French to English"));
        assert!(prompt.contains("translated text only"));
    }

    #[test]
    fn simplify_prompt_carries_level_and_range() {
        let prompt = render_simplify_prompt("English", 15).unwrap();
        assert!(prompt.contains("simplicity level 15 on a scale from 1 to 15"));
        assert!(prompt.contains("very short sentences"));

        let prompt = render_simplify_prompt("English", 3).unwrap();
        assert!(prompt.contains("simplicity level 3"));
        assert!(prompt.contains("Keep the structure"));
    }

    #[test]
    fn simplify_prompt_clamps_out_of_range_levels() {
        assert!(
            render_simplify_prompt("English", 0)
                .unwrap()
                .contains("simplicity level 1 ")
        );
        assert!(
            render_simplify_prompt("English", 40)
                .unwrap()
                .contains("simplicity level 15 ")
        );
    }

    #[test]
    fn aac_prompt_example_uses_separator() {
        let prompt = render_aac_prompt("English").unwrap();
        let example = prompt.lines().last().unwrap();
        insta::assert_snapshot!(
            example,
            @r#"Separate the keywords with " - " and output only the keyword sequence, for example: I - want - water"#
        );
    }

    #[test]
    fn static_prompts_render() {
        assert!(
            render_detect_language_prompt()
                .unwrap()
                .contains("English name of the language")
        );
        assert!(
            render_extract_text_prompt()
                .unwrap()
                .contains("empty string")
        );
    }
}
