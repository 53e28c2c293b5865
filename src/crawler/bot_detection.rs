//! Bot-protection detection
//!
//! Heuristic classifier run right after a page's HTML is available. Each
//! signal contributes a confidence and an indicator; the page's confidence
//! is the strongest signal, never a sum.

use crate::crawler::parser::page_title;
use serde::Serialize;

/// Minimum confidence for a page to count as bot-protected
pub const CONFIDENCE_THRESHOLD: f64 = 0.70;

/// Body size below which an "access denied" phrase is trusted
const SMALL_BODY_BYTES: usize = 5000;

/// Vendor markers: (needle, confidence, bot type)
const MARKERS: &[(&str, f64, &str)] = &[
    ("cf-browser-verification", 0.95, "cloudflare"),
    ("cf_chl_opt", 0.95, "cloudflare"),
    ("challenge-platform", 0.95, "cloudflare"),
    ("cf-challenge", 0.95, "cloudflare"),
    ("checking your browser before accessing", 0.90, "cloudflare"),
    ("_incapsula_resource", 0.90, "incapsula"),
    ("incapsula incident", 0.90, "incapsula"),
    ("px-captcha", 0.90, "perimeterx"),
    ("_pxhd", 0.90, "perimeterx"),
    ("captcha-delivery.com", 0.85, "datadome"),
    ("datadome", 0.85, "datadome"),
    ("sucuri website firewall", 0.85, "sucuri"),
    ("ddos-guard", 0.85, "ddos-guard"),
];

const CHALLENGE_TITLES: &[&str] = &[
    "just a moment",
    "attention required",
    "access denied",
    "security check",
    "verify you are human",
    "are you a robot",
];

/// Detection verdict for one page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotDetection {
    pub bot_protected: bool,
    pub bot_type: Option<String>,
    pub confidence: f64,
    pub indicators: Vec<String>,
}

/// Accumulates signals, tracking the strongest
struct Signals {
    confidence: f64,
    bot_type: Option<&'static str>,
    indicators: Vec<String>,
}

impl Signals {
    fn new() -> Self {
        Self {
            confidence: 0.0,
            bot_type: None,
            indicators: Vec::new(),
        }
    }

    fn add(&mut self, confidence: f64, bot_type: &'static str, indicator: String) {
        if confidence > self.confidence {
            self.confidence = confidence;
            self.bot_type = Some(bot_type);
        }
        self.indicators.push(indicator);
    }

    fn finish(self) -> BotDetection {
        let bot_protected = !self.indicators.is_empty() && self.confidence >= CONFIDENCE_THRESHOLD;
        BotDetection {
            bot_protected,
            bot_type: self.bot_type.map(str::to_string),
            confidence: self.confidence,
            indicators: self.indicators,
        }
    }
}

/// Classifies a fetched page
///
/// # Arguments
///
/// * `status` - Main-document HTTP status
/// * `html` - Page content
///
/// # Example
///
/// ```
/// use site_crawl_engine::crawler::detect_bot_protection;
///
/// let verdict = detect_bot_protection(429, "<html>slow down</html>");
/// assert!(verdict.bot_protected);
/// assert_eq!(verdict.confidence, 1.0);
/// ```
pub fn detect_bot_protection(status: u16, html: &str) -> BotDetection {
    let mut signals = Signals::new();
    let body = html.to_lowercase();
    let body_len = html.len();

    for (needle, confidence, bot_type) in MARKERS {
        if body.contains(needle) {
            signals.add(
                *confidence,
                bot_type,
                format!("Challenge marker found: {}", needle),
            );
        }
    }

    if status == 429 {
        signals.add(1.0, "rate-limit", "HTTP 429 Too Many Requests".to_string());
    }

    if status == 503 && body_len < 1000 {
        signals.add(
            0.85,
            "service-unavailable",
            format!("HTTP 503 with small body ({} bytes)", body_len),
        );
    }

    if status == 200 && body_len < 500 {
        signals.add(
            0.70,
            "minimal-content",
            format!("Minimal content ({} bytes)", body_len),
        );
    }

    if body_len < SMALL_BODY_BYTES && body.contains("access denied") {
        signals.add(0.75, "access-denied", "Access denied message".to_string());
    }

    if let Some(title) = page_title(html) {
        let lowered = title.to_lowercase();
        if CHALLENGE_TITLES.iter().any(|phrase| lowered.contains(phrase)) {
            signals.add(0.85, "challenge-title", format!("Challenge page title: {}", title));
        }
    }

    signals.finish()
}
