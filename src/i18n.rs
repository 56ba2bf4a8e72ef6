use std::collections::HashMap;

use fluent_templates::{fluent_bundle::FluentValue, static_loader, Loader};
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "en",
        // Unicode isolation marks around placeables would corrupt hrefs in HTML replies
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

/// Supported languages (code, human-readable name).
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[("en", "English"), ("ru", "Русский")];

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| "en".parse().unwrap_or_default());

/// Normalizes a language code into a LanguageIdentifier (falls back to default).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    let base = code.split(['-', '_']).next().unwrap_or(code).to_lowercase();

    match SUPPORTED_LANGS.iter().find(|(c, _)| *c == base) {
        Some((c, _)) => c.parse().unwrap_or_else(|_| DEFAULT_LANG.clone()),
        None => DEFAULT_LANG.clone(),
    }
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    let text = LOCALES
        .lookup(lang, key)
        .unwrap_or_else(|| LOCALES.lookup(&DEFAULT_LANG, key).unwrap_or_else(|| key.to_string()));
    text.replace("\\n", "\n")
}

/// Returns a localized string with string arguments for interpolation.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &[(&str, &str)]) -> String {
    let args_map: HashMap<String, FluentValue> = args
        .iter()
        .map(|(k, v)| (k.to_string(), FluentValue::from(v.to_string())))
        .collect();

    let text = LOCALES.lookup_with_args(lang, key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&DEFAULT_LANG, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    });
    text.replace("\\n", "\n")
}
