//! Default prompts sent to the generation service.

use crate::config::PageType;

pub const MARKETING_SYSTEM_PROMPT: &str = "You write concise, professional marketing copy for the \
website of an automotive parts manufacturer (electronics assembly, SMT, PBA, CNC machining). \
Keep the company name 'Human Plus' untranslated and keep technical terms as they are.";

pub const TRANSLATION_SYSTEM_PROMPT: &str = "You are a technical translator for the automotive \
industry. You receive a JSON object. Translate only the values, never the keys. Keep every \
placeholder of the form __TAG__...__TAG__ exactly as it is. Keep 'Human Plus', 'HUMAN PLUS' and \
technical terms (SMT, PBA, CNC) untranslated. Answer with one valid JSON object: double quotes \
only, no trailing commas, no text before or after the object.";

pub const TEXT_TEMPERATURE: f32 = 0.7;
pub const TRANSLATION_TEMPERATURE: f32 = 0.3;

pub fn translation_instruction(target_language: &str) -> String {
    format!(
        "{}\nTarget language code: {}",
        TRANSLATION_SYSTEM_PROMPT, target_language
    )
}

/// Asks for fresh copy with exactly the keys of `source_json`.
pub fn content_prompt(version: u32, source_json: &str) -> String {
    format!(
        "Rewrite the marketing copy below (content version {}). Return one JSON object with \
exactly the same keys, fresh wording for every value, similar length, and every \
__TAG__...__TAG__ placeholder kept in place.\n\n{}",
        version, source_json
    )
}

pub fn banner_prompt(page_type: PageType, variant: u32) -> String {
    let subject = match page_type {
        PageType::Main => "A modern, professional image showcasing automotive manufacturing technology with a focus on electronics and precision engineering. Style: clean, corporate, high-tech.",
        PageType::News => "A dynamic composition representing automotive industry news and innovations. Style: modern, journalistic, informative.",
        PageType::History => "A timeline-style visualization of automotive manufacturing evolution. Style: historical, progressive, corporate.",
        PageType::Technology => "Cutting-edge automotive manufacturing technology and robotics. Style: technical, futuristic, precise.",
        PageType::Vision => "Future of automotive manufacturing with AI and automation. Style: visionary, innovative, bold.",
        PageType::Company => "Modern automotive manufacturing facility interior. Style: professional, industrial, clean.",
        PageType::Electronics => "Advanced automotive electronics manufacturing. Style: technical, detailed, modern.",
        PageType::Cnc => "Precision CNC machining of automotive parts. Style: industrial, technical, detailed.",
    };
    format!(
        "{} Wide banner composition, no text or logos. Variation {}.",
        subject, variant
    )
}
