//! Prompts for the three model calls a run makes.
//!
//! 1. Page extraction (vision): [`EXTRACTION_SYSTEM_PROMPT`] + [`EXTRACTION_PROMPT`]
//! 2. Poem identification (text): [`REFERENCE_SYSTEM_PROMPT`] + [`identify_poem_prompt`]
//! 3. Poetic reflow (text): [`REFORMAT_SYSTEM_PROMPT`] + [`reformat_prompt`]
//!
//! Keeping them here lets the stage modules deal only with call/fallback
//! logic, and lets tests assert on prompt content without a model.

/// Literal a model answers with when it cannot identify the poem.
pub const UNKNOWN_MARKER: &str = "UNKNOWN";

pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "You are an expert at reading sheet music and extracting lyrics.";

/// Instruction sent with every page image.
///
/// The JSON shape at the end is what [`crate::pipeline::extract::parse_page_reply`]
/// decodes.
pub const EXTRACTION_PROMPT: &str = r#"Analyze this sheet music and extract the lyrics following these rules:

IMPORTANT: When extracting lyrics, keep phrases together! If you see text that continues on the next system, combine it.
For example: "Et sur mon" on one line and "Cœur ouvert, penché," on the next should be extracted as one continuous phrase.

1. STROPHIC SONGS (with numbered verses 1. 2. 3. etc.):
   - Each number continues across ALL systems on the page
   - Combine ALL text from each verse number into complete sentences
   - Track verse 1 through the entire page, then verse 2, etc.

2. MULTILINGUAL SONGS (with translations):
   - ONLY extract the TOP/FIRST language line
   - IGNORE all translation lines below

3. STANDARD SONGS:
   - Extract lyrics as they appear
   - PRESERVE POETIC LINE BREAKS - put each poetic line on a new line
   - BUT keep phrases together even if they span multiple systems

Return ONLY a JSON object with this exact structure:
{
    "lyrics": [
        {
            "text": "First line of verse\nSecond line of verse\nThird line of verse",
            "section": "verse 1/verse 2/chorus/etc",
            "line_number": 1
        }
    ],
    "song_title": "title if visible",
    "song_type": "strophic/multilingual/standard"
}"#;

pub const REFERENCE_SYSTEM_PROMPT: &str = "You are an expert on poetry and art songs.";

/// Ask the model to recognise a poem from a short excerpt.
pub fn identify_poem_prompt(excerpt: &str) -> String {
    format!(
        r#"Can you identify this poem and provide its original structure?

Text excerpt: "{excerpt}"

If you recognize this poem, please provide:
1. The title and author
2. The original poem with proper line breaks

If you don't recognize it, just respond with "{UNKNOWN_MARKER}".

Note: This is from sheet music, so it might be a fragment or have modifications."#
    )
}

pub const REFORMAT_SYSTEM_PROMPT: &str =
    "You are an expert at formatting poetry and song lyrics.";

/// Build the reflow prompt for one block.
///
/// With a `reference` the model is told to treat it as a guide only, since
/// settings routinely repeat, omit or reorder the poem's lines. Without one
/// it gets explicit line-length and rhyme heuristics.
pub fn reformat_prompt(text: &str, reference: Option<&str>) -> String {
    match reference {
        Some(reference) => format!(
            r#"Please format this text as poetry with proper line breaks.

I have found what might be the original poem structure for reference:
{reference}

IMPORTANT: The sheet music may differ from the original poem:
- Lines may be repeated
- Some verses may be omitted
- The order might be changed
- Musical repetitions may be added

Use the reference as a GUIDE for line breaks, but format based on what's ACTUALLY in the extracted text.

Text from sheet music to format:
{text}

Return ONLY the properly formatted text with correct line breaks."#
        ),
        None => format!(
            r#"Please format this text as poetry with proper line breaks.

CRITICAL RULES:
1. Each poetic line should be a complete thought or phrase
2. Lines that are currently broken mid-phrase should be combined
3. Look for rhyme patterns - rhyming words usually end their lines
4. A typical poetic line is 8-15 words (not too short, not too long)
5. If you see fragments like:
   "my Alice fair," (too short)
   "Her cheek like" (incomplete)
   "the first May rose," (fragment)
   Combine them into: "my Alice fair, Her cheek like the first May rose,"

The text may have incorrect line breaks. Fix them to create proper poetic lines.
Do NOT add or remove any words. Only adjust line breaks.

Text to format:
{text}

Return ONLY the properly formatted poem with correct line breaks."#
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_names_all_three_modes() {
        assert!(EXTRACTION_PROMPT.contains("STROPHIC"));
        assert!(EXTRACTION_PROMPT.contains("MULTILINGUAL"));
        assert!(EXTRACTION_PROMPT.contains("STANDARD"));
        assert!(EXTRACTION_PROMPT.contains("\"song_type\""));
    }

    #[test]
    fn reformat_prompt_switches_on_reference() {
        let guided = reformat_prompt("a b c", Some("Original poem"));
        assert!(guided.contains("Original poem"));
        assert!(guided.contains("GUIDE"));
        assert!(!guided.contains("8-15 words"));

        let bare = reformat_prompt("a b c", None);
        assert!(bare.contains("8-15 words"));
        assert!(bare.contains("Do NOT add or remove any words"));
        assert!(bare.ends_with("Return ONLY the properly formatted poem with correct line breaks."));
    }

    #[test]
    fn identify_prompt_embeds_excerpt_and_marker() {
        let p = identify_poem_prompt("Le ciel est, par-dessus le toit");
        assert!(p.contains("\"Le ciel est, par-dessus le toit\""));
        assert!(p.contains(UNKNOWN_MARKER));
    }
}
