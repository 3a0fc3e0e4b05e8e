// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// MCP server helper functions:
/// input validation, resource templates, and resource content encoding.
fn pattern_matches(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    pattern: &str,
    value: &str,
) -> Result<bool, ErrorData> {
    match cell.get_or_init(|| Regex::new(pattern)) {
        Ok(regex) => Ok(regex.is_match(value)),
        Err(err) => Err(ErrorData::internal_error(
            format!("invalid validation pattern {pattern:?}: {err}"),
            None,
        )),
    }
}

fn phone_problem(phone: &str, area_code: &str) -> Result<Option<String>, ErrorData> {
    if !pattern_matches(&PHONE_REGEX, PHONE_PATTERN, phone)? {
        return Ok(Some(format!(
            "invalid phone number {}: expected 5 to 15 digits",
            mask_phone(phone)
        )));
    }
    if !pattern_matches(&AREA_CODE_REGEX, AREA_CODE_PATTERN, area_code)? {
        return Ok(Some(format!(
            "invalid area code {area_code:?}: expected `+` and 1 to 4 digits"
        )));
    }
    Ok(None)
}

fn note_id_param(raw: &str) -> Result<&str, ErrorData> {
    let note_id = raw.trim().trim_end_matches('/');
    if note_id.is_empty() || note_id.contains('/') {
        return Err(ErrorData::invalid_params(
            format!("invalid note id {raw:?}"),
            None,
        ));
    }
    Ok(note_id)
}

fn resource_templates() -> Result<Vec<ResourceTemplate>, ErrorData> {
    [
        json!({
            "uriTemplate": format!("{NOTE_SCHEME}{{note_id}}"),
            "name": "note",
            "description": "Note details as returned by the platform",
            "mimeType": "application/json",
        }),
        json!({
            "uriTemplate": format!("{NOTE_IMAGE_SCHEME}{{note_id}}"),
            "name": "note-image",
            "description": "First image of a note",
        }),
    ]
    .into_iter()
    .map(|template| {
        serde_json::from_value(template)
            .map_err(|err| ErrorData::internal_error(format!("resource template: {err}"), None))
    })
    .collect()
}

fn contents(value: Value) -> Result<ResourceContents, ErrorData> {
    serde_json::from_value(value)
        .map_err(|err| ErrorData::internal_error(format!("resource contents: {err}"), None))
}

fn json_contents(uri: &str, body: &Value) -> Result<ReadResourceResult, ErrorData> {
    let text = serde_json::to_string_pretty(body)
        .map_err(|err| ErrorData::internal_error(err.to_string(), None))?;
    Ok(ReadResourceResult {
        contents: vec![contents(json!({
            "uri": uri,
            "mimeType": "application/json",
            "text": text,
        }))?],
    })
}

fn blob_contents(uri: &str, mime_type: &str, bytes: &[u8]) -> Result<ReadResourceResult, ErrorData> {
    let blob = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(ReadResourceResult {
        contents: vec![contents(json!({
            "uri": uri,
            "mimeType": mime_type,
            "blob": blob,
        }))?],
    })
}

/// First image URL of a note: `image_list[0]` `url_default`, then `url`, then `info_list[0].url`.
fn first_image_url(note: &Value) -> Option<String> {
    let image = note.get("image_list")?.as_array()?.first()?;
    let url = ["url_default", "url"]
        .into_iter()
        .find_map(|key| image.get(key).and_then(Value::as_str))
        .or_else(|| {
            image
                .get("info_list")
                .and_then(Value::as_array)
                .and_then(|list| list.first())
                .and_then(|info| info.get("url"))
                .and_then(Value::as_str)
        })?;
    match url {
        _ if url.starts_with("//") => Some(format!("https:{url}")),
        _ if url.starts_with("http://") || url.starts_with("https://") => Some(url.to_owned()),
        _ => None,
    }
}

fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}
