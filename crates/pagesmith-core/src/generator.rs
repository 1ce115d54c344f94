//! Site content generation backed by a generative model.
//!
//! One attempt per brief. Any failure (transport, provider status, shape of
//! the answer) is logged and replaced with deterministic fallback content,
//! so callers always receive a publishable [`GeneratedFileSet`].

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::domain::files::{is_safe_filename, GeneratedFileSet, INDEX_HTML, LICENSE, README_MD};
use crate::metrics::METRICS;

/// Produces site files from a free-text brief.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Never fails; implementations fall back to [`fallback_files`].
    async fn generate(&self, brief: &str) -> GeneratedFileSet;
}

#[derive(Debug, thiserror::Error)]
enum GenerationError {
    #[error("no api key configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("malformed model output: {0}")]
    Malformed(String),
}

/// Instruction sent with every brief.
pub fn build_prompt(brief: &str) -> String {
    format!(
        "You are an expert web developer.\n\
         Generate a minimal static website based on this task brief:\n\n\
         {brief}\n\n\
         Return only a JSON object whose keys are the filenames \
         \"{INDEX_HTML}\", \"{README_MD}\" and \"{LICENSE}\" and whose values \
         are the complete file contents as strings. The {LICENSE} file must \
         contain the MIT License text.\n"
    )
}

/// Deterministic content built only from the brief.
pub fn fallback_files(brief: &str) -> GeneratedFileSet {
    let title = if brief.trim().is_empty() {
        "Untitled site"
    } else {
        brief.trim()
    };
    let escaped = html_escape(title);

    let mut files = GeneratedFileSet::new();
    let entries = [
        (
            INDEX_HTML,
            format!(
                "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
                 <title>{escaped}</title>\n</head>\n<body>\n<h1>{escaped}</h1>\n\
                 <p>Hello from the pagesmith fallback generator.</p>\n</body>\n</html>\n"
            ),
        ),
        (
            README_MD,
            format!("# {title}\n\nGenerated automatically by pagesmith.\n"),
        ),
        (LICENSE, mit_license_text()),
    ];
    for (name, content) in entries {
        // Constant names; always accepted.
        let _ = files.insert(name, content);
    }
    files
}

fn mit_license_text() -> String {
    format!(
        "MIT License\n\n\
         Copyright (c) {} pagesmith contributors\n\n\
         Permission is hereby granted, free of charge, to any person obtaining a copy \
         of this software and associated documentation files (the \"Software\"), to deal \
         in the Software without restriction, including without limitation the rights \
         to use, copy, modify, merge, publish, distribute, sublicense, and/or sell \
         copies of the Software, and to permit persons to whom the Software is \
         furnished to do so, subject to the following conditions:\n\n\
         The above copyright notice and this permission notice shall be included in all \
         copies or substantial portions of the Software.\n\n\
         THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR \
         IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, \
         FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE \
         AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER \
         LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, \
         OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE \
         SOFTWARE.\n",
        chrono::Utc::now().format("%Y")
    )
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or bare).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    let body = match body.rfind("```") {
        Some(idx) => &body[..idx],
        None => body,
    };
    body.trim()
}

/// Parse the model's answer into a complete file set.
fn parse_model_output(text: &str) -> Result<GeneratedFileSet, GenerationError> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| GenerationError::Malformed(format!("not JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| GenerationError::Malformed("expected a JSON object".to_string()))?;

    let mut files = GeneratedFileSet::new();
    for (name, content) in object {
        let content = content.as_str().ok_or_else(|| {
            GenerationError::Malformed(format!("value for {name} is not a string"))
        })?;
        if !is_safe_filename(name) {
            return Err(GenerationError::Malformed(format!(
                "unsafe filename {name:?}"
            )));
        }
        files
            .insert(name.as_str(), content)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
    }

    let missing = files.missing_required();
    if !missing.is_empty() {
        return Err(GenerationError::Malformed(format!(
            "missing files: {}",
            missing.join(", ")
        )));
    }
    Ok(files)
}

/// Gemini `generateContent` client.
pub struct GeminiGenerator {
    config: GeminiConfig,
    client: Client,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Use a caller-built client (timeouts, proxies).
    pub fn with_client(config: GeminiConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self, api_key: &str) -> Result<Url, GenerationError> {
        let base = self.config.endpoint.trim_end_matches('/');
        let raw = if base.contains(":generateContent") {
            base.to_string()
        } else {
            format!("{}/v1beta/models/{}:generateContent", base, self.config.model)
        };
        let mut url =
            Url::parse(&raw).map_err(|e| GenerationError::Endpoint(format!("{raw}: {e}")))?;
        if !url.query_pairs().any(|(k, _)| k == "key") {
            url.query_pairs_mut().append_pair("key", api_key);
        }
        Ok(url)
    }

    async fn try_generate(&self, brief: &str) -> Result<GeneratedFileSet, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::NotConfigured)?;
        let url = self.endpoint(api_key)?;

        let payload = json!({
            "contents": [
                { "parts": [ { "text": build_prompt(brief) } ] }
            ]
        });

        let response = self.client.post(url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                body: truncate(&body, 320),
            });
        }

        let body: Value = response.json().await?;
        let text = body["candidates"]
            .as_array()
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate["content"]["parts"].as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        debug!(chars = text.len(), "model answered");
        parse_model_output(&text)
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate(&self, brief: &str) -> GeneratedFileSet {
        match self.try_generate(brief).await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "content generation failed, using fallback");
                METRICS.inc_generator_fallbacks();
                fallback_files(brief)
            }
        }
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
