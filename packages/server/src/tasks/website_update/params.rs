//! The update message envelope.
//!
//! A flat JSON object carrying the website snapshot plus the publishing
//! span's trace context, so the consumer can stitch its work onto the
//! originating trace:
//!
//! ```json
//! { "website": { "uuid": "...", "url": "...", "title": "...",
//!                "raw_content": "...", "update_time": "2020-01-01T00:00:00Z" },
//!   "trace_id": "<32 hex>", "span_id": "<16 hex>", "trace_flags": 0 }
//! ```

use chrono::{DateTime, Utc};
use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
use opentelemetry::Context;
use serde::{Deserialize, Serialize};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use vendors::types::website::{Website, WebsiteStatus};

/// The website fields that travel on the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteSnapshot {
    pub uuid: String,
    pub url: String,
    pub title: String,
    pub raw_content: String,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteUpdateParams {
    pub website: WebsiteSnapshot,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default)]
    pub trace_flags: u8,
}

impl WebsiteUpdateParams {
    /// Build an envelope for `web`, stamped with the current span's trace
    /// context (all-zero ids when no span is active).
    pub fn from_website(web: &Website) -> Self {
        let cx = tracing::Span::current().context();
        let span_context = cx.span().span_context().clone();

        Self {
            website: WebsiteSnapshot {
                uuid: web.uuid.clone(),
                url: web.url.clone(),
                title: web.title.clone(),
                raw_content: web.raw_content.clone(),
                update_time: web.update_time.with_timezone(&Utc),
            },
            trace_id: span_context.trace_id().to_string(),
            span_id: span_context.span_id().to_string(),
            trace_flags: span_context.trace_flags().to_u8(),
        }
    }

    pub fn to_data(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_data(data: &[u8]) -> serde_json::Result<Self> {
        let mut params: WebsiteUpdateParams = serde_json::from_slice(data)?;
        params.website.update_time = params.website.update_time.with_timezone(&Utc);
        Ok(params)
    }

    /// Rebuild the website the envelope describes.
    pub fn website(&self) -> Website {
        Website {
            uuid: self.website.uuid.clone(),
            url: self.website.url.clone(),
            title: self.website.title.clone(),
            raw_content: self.website.raw_content.clone(),
            update_time: self.website.update_time,
            status: WebsiteStatus::Active,
        }
    }

    /// The publishing span as a remote parent, when the ids are valid.
    pub fn remote_context(&self) -> Option<Context> {
        let trace_id = TraceId::from_hex(&self.trace_id).ok()?;
        let span_id = SpanId::from_hex(&self.span_id).ok()?;

        let span_context = SpanContext::new(
            trace_id,
            span_id,
            TraceFlags::new(self.trace_flags),
            true,
            TraceState::default(),
        );

        span_context
            .is_valid()
            .then(|| Context::new().with_remote_span_context(span_context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn website() -> Website {
        Website {
            uuid: "some uuid".to_string(),
            url: "https://example.com".to_string(),
            title: String::new(),
            raw_content: String::new(),
            update_time: Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap(),
            status: WebsiteStatus::Active,
        }
    }

    #[test]
    fn test_to_data_without_span_zeroes_trace_context() {
        let params = WebsiteUpdateParams::from_website(&website());
        let data = String::from_utf8(params.to_data().unwrap()).unwrap();

        assert_eq!(
            data,
            r#"{"website":{"uuid":"some uuid","url":"https://example.com","title":"","raw_content":"","update_time":"0001-01-01T00:00:00Z"},"trace_id":"00000000000000000000000000000000","span_id":"0000000000000000","trace_flags":0}"#
        );
    }

    #[test]
    fn test_round_trip_preserves_website() {
        let mut web = website();
        web.title = "title".to_string();
        web.raw_content = "raw content".to_string();

        let params = WebsiteUpdateParams::from_website(&web);
        let parsed = WebsiteUpdateParams::from_data(&params.to_data().unwrap()).unwrap();

        assert_eq!(parsed.website().uuid, web.uuid);
        assert_eq!(parsed.website(), web);
    }

    #[test]
    fn test_remote_context_requires_valid_ids() {
        let mut params = WebsiteUpdateParams::from_website(&website());
        assert!(params.remote_context().is_none());

        params.trace_id = "0af7651916cd43dd8448eb211c80319c".to_string();
        params.span_id = "b7ad6b7169203331".to_string();
        params.trace_flags = 1;
        assert!(params.remote_context().is_some());

        params.span_id = "not hex".to_string();
        assert!(params.remote_context().is_none());
    }

    #[test]
    fn test_from_data_rejects_malformed_payload() {
        assert!(WebsiteUpdateParams::from_data(b"some unknown message").is_err());
    }
}
