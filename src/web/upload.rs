use axum::extract::Multipart;

/// The uploaded score.
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Parsed form fields from the upload form.
///
/// Every field is optional at this level; the handler decides which
/// missing field is reported first.
#[derive(Default)]
pub struct FormFields {
    pub file: Option<UploadedFile>,
    pub title: Option<String>,
    pub api_key: Option<String>,
}

/// Parse the `/process` multipart body.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<FormFields, String> {
    let mut form = FormFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file data: {}", e))?
                    .to_vec();
                form.file = Some(UploadedFile { filename, data });
            }
            "title" => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read title: {}", e))?;
                form.title = Some(val);
            }
            "api_key" => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read api_key: {}", e))?;
                form.api_key = Some(val);
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    Ok(form)
}

/// Upload names are matched case-insensitively, so `SCORE.PDF` is accepted.
pub fn is_pdf_name(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}
