//! Free-text classification.
//!
//! Commands are matched by teloxide before any of this runs. Remaining text goes to the
//! download flow when it mentions `http` anywhere, otherwise to the token handler.

/// Where a non-command text message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Download,
    Token,
}

pub fn classify(text: &str) -> Route {
    if text.contains("http") {
        Route::Download
    } else {
        Route::Token
    }
}

/// The link of a download message: its last word.
pub fn extract_url(text: &str) -> Option<&str> {
    text.split_whitespace().next_back()
}
