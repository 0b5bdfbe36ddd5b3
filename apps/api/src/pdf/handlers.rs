//! Axum route handler for PDF text extraction.
//!
//! The endpoint accepts either a JSON body carrying a URL or multipart form
//! data carrying a file upload and/or a URL, so the extractor is picked at
//! runtime from the Content-Type header. An uploaded file wins over a URL
//! when both are present.

use axum::{
    extract::{Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json, RequestExt,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::pdf::{fetch_pdf, has_pdf_extension, text_from_bytes};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ExtractPdfRequest {
    #[serde(default)]
    pub pdf_url: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractPdfResponse {
    pub success: bool,
    pub text: String,
}

struct UploadedPdf {
    filename: String,
    bytes: Vec<u8>,
}

/// POST /extract_pdf
///
/// Returns `{success, text}` on success; invalid input (no input, bad
/// filename, unreadable PDF, no extractable text) is a 400 and unexpected
/// failures are a 500, both as `{error}`.
pub async fn handle_extract_pdf(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ExtractPdfResponse>, AppError> {
    let (pdf_url, pdf_file) = read_input(request).await?;

    if pdf_url.trim().is_empty() && pdf_file.is_none() {
        return Err(AppError::Validation(
            "请提供PDF URL或上传PDF文件".to_string(),
        ));
    }

    let text = if let Some(file) = pdf_file {
        if file.filename.is_empty() {
            return Err(AppError::Validation("未选择文件".to_string()));
        }
        if !has_pdf_extension(&file.filename) {
            return Err(AppError::Validation("请上传PDF文件".to_string()));
        }
        text_from_bytes(file.bytes)
            .await
            .map_err(|e| AppError::Validation(format!("读取PDF文件时出错: {e}")))?
    } else {
        let bytes = fetch_pdf(&state.http, pdf_url.trim())
            .await
            .map_err(|e| AppError::Validation(format!("从URL下载或读取PDF时出错: {e}")))?;
        text_from_bytes(bytes)
            .await
            .map_err(|e| AppError::Validation(format!("从URL下载或读取PDF时出错: {e}")))?
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation("无法从PDF中提取文本".to_string()));
    }

    Ok(Json(ExtractPdfResponse {
        success: true,
        text,
    }))
}

/// Pulls the URL and/or uploaded file out of either body shape.
async fn read_input(request: Request) -> Result<(String, Option<UploadedPdf>), AppError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("application/json") {
        let Json(body) = request
            .extract::<Json<ExtractPdfRequest>, _>()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        return Ok((body.pdf_url, None));
    }

    let mut multipart = request
        .extract::<Multipart, _>()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut pdf_url = String::new();
    let mut pdf_file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("pdf_file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?
                    .to_vec();
                pdf_file = Some(UploadedPdf { filename, bytes });
            }
            Some("pdf_url") => {
                pdf_url = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
            }
            _ => {}
        }
    }

    Ok((pdf_url, pdf_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_defaults_to_empty_url() {
        let body: ExtractPdfRequest = serde_json::from_str("{}").expect("deserialize");
        assert!(body.pdf_url.is_empty());
    }

    #[test]
    fn test_json_body_carries_url() {
        let body: ExtractPdfRequest =
            serde_json::from_str(r#"{"pdf_url": "https://example.com/a.pdf"}"#)
                .expect("deserialize");
        assert_eq!(body.pdf_url, "https://example.com/a.pdf");
    }

    #[test]
    fn test_response_serializes_flat() {
        let response = ExtractPdfResponse {
            success: true,
            text: "正文".to_string(),
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["success"], true);
        assert_eq!(value["text"], "正文");
    }
}
