//! PDF text extraction.
//!
//! Parsing delegates to the `pdf-extract` crate; this module owns the
//! blocking-thread hop and the remote-fetch path. Input validation lives in
//! the handler where the error wording depends on how the PDF arrived.

pub mod handlers;

use std::time::Duration;

use anyhow::anyhow;
use reqwest::Client as HttpClient;

/// Fixed budget for fetching a remote PDF.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Extracts text from in-memory PDF bytes. The parse is CPU-bound, so it
/// runs on a blocking thread.
pub async fn text_from_bytes(bytes: Vec<u8>) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| anyhow!("{e}"))
    })
    .await?
}

/// Downloads a PDF with a fixed timeout and returns its raw bytes.
pub async fn fetch_pdf(http: &HttpClient, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = http
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Case-insensitive `.pdf` extension check on the uploaded filename.
pub fn has_pdf_extension(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}
