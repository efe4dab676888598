use crate::error::CliError;
use reqwest::header;
use std::time::Duration;

const USER_AGENT: &str = concat!("tanshin/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Read PDF bytes from a local path or an http(s) URL.
pub fn load_input(input: &str) -> Result<Vec<u8>, CliError> {
    if is_url(input) {
        download(input)
    } else {
        std::fs::read(input).map_err(|source| CliError::Read {
            path: input.to_string(),
            source,
        })
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn download(url: &str) -> Result<Vec<u8>, CliError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()?;

    tracing::info!(url, "downloading document");
    let response = client
        .get(url)
        .header(header::ACCEPT, "application/pdf,*/*")
        .send()?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%status, url, "download rejected");
        return Err(CliError::Http {
            status,
            url: url.to_string(),
        });
    }

    let bytes = response.bytes()?;
    tracing::debug!(bytes = bytes.len(), url, "download finished");
    Ok(bytes.to_vec())
}
