use anyhow::Result;
use url::Url;

pub fn get_filename_from_url(url_str: &str) -> Result<String> {
    let url = Url::parse(url_str)?;

    if let Some(filename) = url.path_segments().and_then(|mut segments| segments.next_back()) {
        if !filename.is_empty() {
            return Ok(filename.to_string());
        }
    }

    // No usable path segment.
    Ok(format!("download_{}", uuid::Uuid::new_v4()))
}

pub fn sanitize_filename(filename: &str) -> String {
    filename.replace(|c: char| !c.is_alphanumeric() && c != '.' && c != '-' && c != '_', "_")
}
