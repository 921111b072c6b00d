//! Placeholder expansion for message text. Control escapes (`\n`, `\l`,
//! `\p`) are left for the dialog renderer.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Z0-9_]+)\}").expect("placeholder pattern compiles"));

/// Runtime string buffers (`STR_VAR_1`..`STR_VAR_3`) filled by specials.
pub type StringVars = BTreeMap<String, String>;

pub struct TextContext<'a> {
    pub player_name: &'a str,
    pub player_gender: i32,
    pub strings: &'a StringVars,
}

pub fn format_text(raw: &str, ctx: &TextContext<'_>) -> String {
    PLACEHOLDER
        .replace_all(raw, |captures: &Captures<'_>| {
            let name = &captures[1];
            match name {
                "PLAYER" => ctx.player_name.to_string(),
                "STR_VAR_1" | "STR_VAR_2" | "STR_VAR_3" => {
                    ctx.strings.get(name).cloned().unwrap_or_default()
                }
                "KUN" => String::new(),
                "RIVAL" => rival_name(ctx.player_gender).to_string(),
                "POKEBLOCK" => "POKeBLOCK".to_string(),
                "UP_ARROW" => "\u{25B2}".to_string(),
                "DOWN_ARROW" => "\u{25BC}".to_string(),
                "LEFT_ARROW" => "\u{25C0}".to_string(),
                "RIGHT_ARROW" => "\u{25B6}".to_string(),
                _ => captures[0].to_string(),
            }
        })
        .into_owned()
}

/// The rival is always the opposite gender of the player.
pub fn rival_name(player_gender: i32) -> &'static str {
    if player_gender == 0 { "MAY" } else { "BRENDAN" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(strings: &StringVars) -> TextContext<'_> {
        TextContext {
            player_name: "ASH",
            player_gender: 1,
            strings,
        }
    }

    #[test]
    fn known_placeholders_expand() {
        let mut strings = StringVars::new();
        strings.insert("STR_VAR_1".to_string(), "big girl".to_string());
        let text = format_text(
            "{PLAYER}{KUN}! {RIVAL} called you a {STR_VAR_1}.\\p{STR_VAR_2}",
            &context(&strings),
        );
        assert_eq!(text, "ASH! BRENDAN called you a big girl.\\p");
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let strings = StringVars::new();
        assert_eq!(
            format_text("Got {COLOR RED}{FONT_SMALL}!", &context(&strings)),
            "Got {COLOR RED}{FONT_SMALL}!"
        );
    }
}
