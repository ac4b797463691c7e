//! Prompts and request builders for the three enrichment modes.

use super::client::{
    ChatMessage, CompletionRequest, ContentPart, EnrichmentConfig, ImageUrl, JsonSchemaSpec,
    ResponseFormat,
};
use super::schema::OUTPUT_SCHEMA;

const TEXT_SYSTEM_PROMPT: &str = "You extract structured real estate data from the file. \
Read the document carefully and use common sense to pick out the related information. \
Return STRICT JSON with these keys exactly and no extras: \
{property:{name,address,city,state,zipcode,year_built,sqft,unit_count,cap_rate},\
units:[{unit_number,unit_type,beds,baths,sqft,rent,status,lease_start,lease_end}],\
sections:[{title,text,page,bbox}],doc_type}. \
If values are numeric (sqft, unit_count, cap_rate, rent), output numbers (not strings) when obvious. \
Dates may stay as strings. No commentary. No markdown fences.";

const VISION_SYSTEM_PROMPT: &str = "You are a precise information extractor.";

const VISION_PROMPT: &str = "Extract STRICT JSON with keys: property, units, sections, doc_type. \
Use numbers for sqft/rent, dates as YYYY-MM-DD. If labels appear, map them. \
If it's a lease/flyer/rent_roll, set doc_type accordingly. \
Return ONLY valid JSON, no comments or markdown fences.";

const STRUCTURED_SYSTEM_PROMPT: &str = "You extract structured real estate data from text \
(flyers, rent rolls, leases). Return data that maps to the provided JSON schema exactly, \
with no extra fields.";

/// Keep at most `max_chars` characters.
pub fn truncate_content(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Text mode: document text in a fenced block, JSON object out.
pub fn text_request(config: &EnrichmentConfig, fulltext: &str) -> CompletionRequest {
    let user = format!(
        "Document text:\n```\n{}\n```\nRespond ONLY with a JSON object.",
        truncate_content(fulltext, config.max_content_chars)
    );
    CompletionRequest {
        model: config.model.clone(),
        temperature: config.temperature,
        messages: vec![ChatMessage::system(TEXT_SYSTEM_PROMPT), ChatMessage::user(user)],
        response_format: Some(ResponseFormat::JsonObject),
    }
}

/// Vision mode: the instruction followed by one `data:` URL per page image.
pub fn vision_request(config: &EnrichmentConfig, image_urls: Vec<String>) -> CompletionRequest {
    let mut parts = vec![ContentPart::Text {
        text: VISION_PROMPT.to_string(),
    }];
    parts.extend(image_urls.into_iter().map(|url| ContentPart::ImageUrl {
        image_url: ImageUrl { url },
    }));
    CompletionRequest {
        model: config.model.clone(),
        temperature: config.temperature,
        messages: vec![
            ChatMessage::system(VISION_SYSTEM_PROMPT),
            ChatMessage::user_parts(parts),
        ],
        response_format: Some(ResponseFormat::JsonObject),
    }
}

/// Structured mode: raw document text, output constrained by the schema.
pub fn structured_request(config: &EnrichmentConfig, fulltext: &str) -> CompletionRequest {
    CompletionRequest {
        model: config.model.clone(),
        temperature: config.temperature,
        messages: vec![
            ChatMessage::system(STRUCTURED_SYSTEM_PROMPT),
            ChatMessage::user(truncate_content(fulltext, config.max_content_chars)),
        ],
        response_format: Some(ResponseFormat::JsonSchema {
            json_schema: JsonSchemaSpec {
                name: "real_estate_extraction".to_string(),
                schema: OUTPUT_SCHEMA.clone(),
            },
        }),
    }
}
