//! Message locale negotiation from `Accept-Language`

use axum::http::HeaderValue;
use fluent_langneg::{accepted_languages, negotiate_languages, NegotiationStrategy};

use domain_tariff::Locale;

/// Picks the supported locale the client prefers, or `default`
pub fn negotiate_locale(accept_language: Option<&HeaderValue>, default: Locale) -> Locale {
    let Some(header) = accept_language.and_then(|h| h.to_str().ok()) else {
        return default;
    };

    let requested = accepted_languages::parse(header);
    let supported: Vec<&str> = Locale::SUPPORTED.iter().map(Locale::tag).collect();
    let available = accepted_languages::parse(&supported.join(", "));

    negotiate_languages(&requested, &available, None, NegotiationStrategy::Filtering)
        .first()
        .and_then(|id| id.to_string().parse::<Locale>().ok())
        .unwrap_or(default)
}
