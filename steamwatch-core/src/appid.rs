//! Parse app ids from command-line text.
//!
//! Accepts a bare id (`677340`, ` 0677340 `) or a store URL
//! (`https://store.steampowered.com/app/677340/The_Colonists/`).

use crate::error::AppIdError;
use crate::types::AppId;

const STORE_APP_PATH: &str = "store.steampowered.com/app/";

/// Extract an [`AppId`] from `text`.
pub fn extract_app_id(text: &str) -> Result<AppId, AppIdError> {
    let normalized = text.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(AppIdError(text.to_string()));
    }

    let digits = if normalized.bytes().all(|b| b.is_ascii_digit()) {
        normalized.as_str()
    } else {
        let Some(start) = normalized.find(STORE_APP_PATH) else {
            return Err(AppIdError(text.to_string()));
        };
        let rest = &normalized[start + STORE_APP_PATH.len()..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };

    // "0123" parses to 123; overflow and empty digit runs are invalid.
    digits
        .parse::<u32>()
        .map(AppId)
        .map_err(|_| AppIdError(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("677340", 677340)]
    #[case("  0677340 ", 677340)]
    #[case("https://store.steampowered.com/app/677340/The_Colonists/", 677340)]
    #[case("store.steampowered.com/app/316750", 316750)]
    #[case("HTTP://STORE.STEAMPOWERED.COM/APP/42/?cc=de", 42)]
    fn accepts_ids_and_store_urls(#[case] input: &str, #[case] expected: u32) {
        assert_eq!(extract_app_id(input).unwrap(), AppId(expected));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("abc")]
    #[case("12a")]
    #[case("https://store.steampowered.com/app/")]
    #[case("https://example.com/app/123")]
    #[case("99999999999")]
    fn rejects_garbage(#[case] input: &str) {
        let err = extract_app_id(input).unwrap_err();
        assert_eq!(err, AppIdError(input.to_string()));
    }
}
