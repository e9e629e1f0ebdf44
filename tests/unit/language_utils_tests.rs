/*!
 * Tests for language utility functions
 */

use subcue::language_utils::{get_language_name, language_codes_match, normalize_languages, normalize_to_part2t};

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");

    // Case insensitivity
    assert_eq!(normalize_to_part2t("EN").unwrap(), "eng");

    // Whitespace
    assert_eq!(normalize_to_part2t(" fr ").unwrap(), "fra");

    assert!(normalize_to_part2t("123").is_err());
}

#[test]
fn test_language_codes_match_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("fre", "fr"));
    assert!(!language_codes_match("en", "fr"));
}

#[test]
fn test_get_language_name_withValidCode_shouldReturnName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("deu").unwrap(), "German");
    assert!(get_language_name("zz").is_err());
}

#[test]
fn test_normalize_languages_withMixedCodes_shouldDedupeAndKeepUnknown() {
    let requested = vec![
        "eng".to_string(),
        "EN".to_string(),
        " ".to_string(),
        "fre".to_string(),
        "pb".to_string(),
    ];
    assert_eq!(normalize_languages(&requested), vec!["en", "fr", "pb"]);
}
