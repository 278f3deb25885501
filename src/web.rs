//! Web front end: an HTML lookup form plus a small JSON API.
//!
//! This layer only consumes [`LookupService`]; it validates that input is
//! non-empty and renders results, nothing more.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Form, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::CacheStats;
use crate::error::{Result, HanvietError};
use crate::lookup::{LookupOptions, LookupResult, LookupService};
use crate::translate::TranslationSource;

type AppState = Arc<LookupService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/lookup", post(lookup_form))
        .route("/batch", post(batch_form))
        .route("/api/lookup", post(api_lookup))
        .route("/api/lookup/batch", post(api_batch))
        .route("/api/cache/stats", get(api_cache_stats))
        .route("/api/cache/clear", post(api_cache_clear))
        .with_state(service)
}

pub async fn serve(service: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web UI listening on http://{}", addr);

    axum::serve(listener, router(service)).await?;
    Ok(())
}

#[derive(Deserialize)]
struct LookupForm {
    text: String,
    tone_marks: Option<String>,
    analysis: Option<String>,
}

#[derive(Deserialize)]
struct BatchForm {
    lines: String,
    tone_marks: Option<String>,
}

#[derive(Deserialize)]
struct ApiLookupRequest {
    text: String,
    #[serde(default)]
    tone_marks: Option<bool>,
    #[serde(default)]
    detailed_analysis: Option<bool>,
    #[serde(default)]
    bypass_cache: Option<bool>,
}

#[derive(Deserialize)]
struct ApiBatchRequest {
    lines: Vec<String>,
    #[serde(default)]
    tone_marks: Option<bool>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ClearResponse {
    removed: usize,
}

async fn index() -> Html<String> {
    Html(render_page(None, &[], None))
}

async fn lookup_form(State(service): State<AppState>, Form(form): Form<LookupForm>) -> Html<String> {
    if form.text.trim().is_empty() {
        return Html(render_page(None, &[], Some("Vui lòng nhập chữ Hán cần tra cứu")));
    }

    let options = LookupOptions {
        tone_marks: form.tone_marks.is_some(),
        detailed_analysis: form.analysis.is_some(),
        bypass_cache: false,
    };

    match service.lookup(&form.text, &options).await {
        Ok(result) => Html(render_page(Some(&result), &[], None)),
        Err(e) => Html(render_page(None, &[], Some(&e.to_string()))),
    }
}

async fn batch_form(State(service): State<AppState>, Form(form): Form<BatchForm>) -> Html<String> {
    let lines: Vec<String> = form
        .lines
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return Html(render_page(None, &[], Some("Vui lòng nhập mỗi từ trên một dòng")));
    }

    let options = LookupOptions {
        tone_marks: form.tone_marks.is_some(),
        detailed_analysis: false,
        bypass_cache: false,
    };

    let results = service.lookup_batch(&lines, &options).await;
    Html(render_page(None, &results, None))
}

async fn api_lookup(
    State(service): State<AppState>,
    Json(request): Json<ApiLookupRequest>,
) -> std::result::Result<Json<LookupResult>, (StatusCode, Json<ErrorResponse>)> {
    let options = LookupOptions {
        tone_marks: request.tone_marks.unwrap_or(true),
        detailed_analysis: request.detailed_analysis.unwrap_or(false),
        bypass_cache: request.bypass_cache.unwrap_or(false),
    };

    match service.lookup(&request.text, &options).await {
        Ok(result) => Ok(Json(result)),
        Err(e @ HanvietError::Input(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: e.to_string() }),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )),
    }
}

async fn api_batch(
    State(service): State<AppState>,
    Json(request): Json<ApiBatchRequest>,
) -> Json<Vec<LookupResult>> {
    let options = LookupOptions {
        tone_marks: request.tone_marks.unwrap_or(true),
        detailed_analysis: false,
        bypass_cache: false,
    };

    Json(service.lookup_batch(&request.lines, &options).await)
}

async fn api_cache_stats(State(service): State<AppState>) -> Json<CacheStats> {
    Json(service.cache_stats())
}

async fn api_cache_clear(
    State(service): State<AppState>,
) -> std::result::Result<Json<ClearResponse>, (StatusCode, Json<ErrorResponse>)> {
    match service.clear_cache() {
        Ok(removed) => Ok(Json(ClearResponse { removed })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )),
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_result_row(index: usize, result: &LookupResult) -> String {
    let status = match (&result.error, &result.source) {
        (Some(e), _) => html_escape(e),
        (None, source) => html_escape(&source.to_string()),
    };
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        index + 1,
        html_escape(&result.source_text),
        html_escape(&result.romanization),
        html_escape(&result.translation),
        status
    )
}

fn render_single(result: &LookupResult) -> String {
    let mut section = format!(
        "<div class=\"result\">\
         <p><b>Chữ Hán:</b> {}</p>\
         <p><b>Pinyin:</b> {}</p>\
         <p><b>Nghĩa tiếng Việt:</b> {}</p>\
         <p class=\"status\">Nguồn: {}</p>",
        html_escape(&result.source_text),
        html_escape(&result.romanization),
        html_escape(&result.translation),
        match &result.source {
            TranslationSource::None => "không khả dụng".to_string(),
            other => html_escape(&other.to_string()),
        }
    );

    if let Some(analysis) = &result.analysis {
        section.push_str(&format!(
            "<p><b>Phân tích:</b> {}: {} / {} (thanh {})</p>",
            analysis.character,
            html_escape(&analysis.pinyin_toned),
            html_escape(&analysis.pinyin_plain),
            analysis.tone_number
        ));
    }

    if let Some(error) = &result.error {
        section.push_str(&format!("<p class=\"error\">{}</p>", html_escape(error)));
    }

    section.push_str("</div>");
    section
}

fn render_page(single: Option<&LookupResult>, batch: &[LookupResult], notice: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(notice) = notice {
        body.push_str(&format!("<p class=\"error\">{}</p>", html_escape(notice)));
    }

    if let Some(result) = single {
        body.push_str(&render_single(result));
    }

    if !batch.is_empty() {
        body.push_str(
            "<table><tr><th>#</th><th>Chữ Hán</th><th>Pinyin</th>\
             <th>Nghĩa tiếng Việt</th><th>Trạng thái</th></tr>",
        );
        for (index, result) in batch.iter().enumerate() {
            body.push_str(&render_result_row(index, result));
        }
        body.push_str("</table>");
    }

    format!(
        "<!DOCTYPE html>\
         <html lang=\"vi\"><head><meta charset=\"utf-8\">\
         <title>Từ điển Hán Việt</title>\
         <style>\
         body{{font-family:sans-serif;max-width:60em;margin:2em auto;padding:0 1em}}\
         table{{border-collapse:collapse;width:100%}}\
         td,th{{border:1px solid #ccc;padding:.4em .6em;text-align:left}}\
         textarea,input[type=text]{{width:100%;box-sizing:border-box}}\
         .error{{color:#b00}}.status{{color:#666}}\
         form{{margin-bottom:2em}}\
         </style></head><body>\
         <h1>Từ điển Hán Việt</h1>\
         <p>Tra cứu chữ Hán: phiên âm pinyin và nghĩa tiếng Việt.</p>\
         <form method=\"post\" action=\"/lookup\">\
         <h2>Tra cứu từ đơn</h2>\
         <input type=\"text\" name=\"text\" placeholder=\"Ví dụ: 你好, 中国, 学习...\">\
         <label><input type=\"checkbox\" name=\"tone_marks\" checked> Dấu thanh</label>\
         <label><input type=\"checkbox\" name=\"analysis\"> Phân tích chi tiết</label>\
         <button type=\"submit\">Tra cứu</button>\
         </form>\
         <form method=\"post\" action=\"/batch\">\
         <h2>Tra cứu nhiều từ</h2>\
         <textarea name=\"lines\" rows=\"6\" placeholder=\"Mỗi từ một dòng\"></textarea>\
         <label><input type=\"checkbox\" name=\"tone_marks\" checked> Dấu thanh</label>\
         <button type=\"submit\">Tra cứu tất cả</button>\
         </form>\
         {}\
         </body></html>",
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> LookupResult {
        LookupResult {
            source_text: "你好".to_string(),
            romanization: "nǐ hǎo".to_string(),
            translation: "Xin chào".to_string(),
            source: TranslationSource::Provider("MyMemory".to_string()),
            error: None,
            analysis: None,
        }
    }

    #[test]
    fn test_render_single_result_page() {
        let page = render_page(Some(&sample_result()), &[], None);
        assert!(page.contains("nǐ hǎo"));
        assert!(page.contains("Xin chào"));
        assert!(page.contains("MyMemory"));
    }

    #[test]
    fn test_render_analysis_line_is_plain_ascii_punctuation() {
        let mut result = sample_result();
        result.source_text = "中".to_string();
        result.analysis = Some(crate::pinyin::analyze_character('中'));

        let page = render_page(Some(&result), &[], None);
        assert!(page.contains("Phân tích:</b> 中: zhōng / zhong (thanh 1)"));
        assert!(!page.contains('—'));
    }

    #[test]
    fn test_render_batch_table_keeps_order() {
        let mut second = sample_result();
        second.source_text = "中国".to_string();
        let results = vec![sample_result(), second];

        let page = render_page(None, &results, None);
        assert!(page.find("你好").unwrap() < page.find("中国").unwrap());
    }

    #[test]
    fn test_render_escapes_html() {
        let mut result = sample_result();
        result.translation = "<script>alert(1)</script>".to_string();
        let page = render_page(Some(&result), &[], None);
        assert!(!page.contains("<script>alert"));
        assert!(page.contains("&lt;script&gt;"));
    }
}
