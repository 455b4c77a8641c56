//! Wire types for the Drive files API.

use serde::Deserialize;

/// One page of the `files` listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub items: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// File entry as returned by the listing. Only the fields the source
/// requests are present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub file_extension: Option<String>,
    pub file_size: Option<String>,
}

/// Per-file resolution of the short-lived download URL.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResolveResponse {
    pub download_url: Option<String>,
    pub file_size: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_page_parses_with_and_without_token() {
        let page: FilesListResponse = serde_json::from_str(
            r#"{
                "items": [
                    {"id": "f1", "title": "a.mp3", "fileExtension": "mp3", "fileSize": "1024"},
                    {"id": "f2", "title": "folder"}
                ],
                "nextPageToken": "page2"
            }"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].file_extension.as_deref(), Some("mp3"));
        assert!(page.items[1].file_extension.is_none());
        assert_eq!(page.next_page_token.as_deref(), Some("page2"));

        let last: FilesListResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(last.items.is_empty());
        assert!(last.next_page_token.is_none());
    }

    #[test]
    fn resolve_parses_download_url() {
        let resolved: FileResolveResponse = serde_json::from_str(
            r#"{"downloadUrl": "https://dl.example.com/f1?sig=abc", "fileSize": "2048"}"#,
        )
        .unwrap();
        assert_eq!(
            resolved.download_url.as_deref(),
            Some("https://dl.example.com/f1?sig=abc")
        );
        assert_eq!(resolved.file_size.as_deref(), Some("2048"));
    }
}
