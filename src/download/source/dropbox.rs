//! Dropbox share link → direct download URL.
//!
//! Share links (`https://www.dropbox.com/s/<id>/<name>?dl=0`, `/scl/fi/...?rlkey=...`) serve
//! an HTML preview; `dl=1` makes Dropbox answer with the file itself. Other query
//! parameters (notably `rlkey`) must be preserved.

use url::Url;

use crate::download::error::DownloadError;

pub fn direct_download_url(share_url: &str) -> Result<Url, DownloadError> {
    let mut url = Url::parse(share_url.trim()).map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", share_url, e)))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "dl" && k != "raw")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (k, v) in &kept {
            query.append_pair(k, v);
        }
        query.append_pair("dl", "1");
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dl0_becomes_dl1() {
        let url = direct_download_url("https://www.dropbox.com/s/abc123/file.zip?dl=0").unwrap();
        assert_eq!(url.as_str(), "https://www.dropbox.com/s/abc123/file.zip?dl=1");
    }

    #[test]
    fn test_missing_query_gets_dl1() {
        let url = direct_download_url("https://www.dropbox.com/s/abc123/file.zip").unwrap();
        assert_eq!(url.as_str(), "https://www.dropbox.com/s/abc123/file.zip?dl=1");
    }

    #[test]
    fn test_rlkey_is_preserved() {
        let url = direct_download_url("https://www.dropbox.com/scl/fi/xyz/file.pdf?rlkey=k3y&dl=0").unwrap();
        assert_eq!(url.as_str(), "https://www.dropbox.com/scl/fi/xyz/file.pdf?rlkey=k3y&dl=1");
    }

    #[test]
    fn test_raw_param_replaced() {
        let url = direct_download_url("https://www.dropbox.com/s/abc/img.png?raw=1").unwrap();
        assert_eq!(url.as_str(), "https://www.dropbox.com/s/abc/img.png?dl=1");
    }

    #[test]
    fn test_garbage_is_invalid_url() {
        assert!(matches!(
            direct_download_url("dropbox.com/no-scheme"),
            Err(DownloadError::InvalidUrl(_))
        ));
    }
}
