//! HTTP content negotiation on the `Accept` header (RFC 7231 §5.3.2)
//!
//! The authentication middleware only asks one question of it: is `text/html`
//! acceptable with a non-zero quality. Other callers can rank arbitrary offers
//! with [`preferred`].

use http::Method;

/// One entry of an `Accept` header
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    /// Lower-cased top-level type, `*` for wildcards
    pub kind: String,
    /// Lower-cased subtype, `*` for wildcards
    pub subtype: String,
    /// Parameters other than `q`, names lower-cased
    pub params: Vec<(String, String)>,
    /// Quality in `[0, 1]`; an unparsable `q` yields 0
    pub quality: f32,
}

impl MediaRange {
    /// Parse a full `Accept` header value. Entries without a `/` are skipped.
    pub fn parse_list(header: &str) -> Vec<MediaRange> {
        header.split(',').filter_map(MediaRange::parse).collect()
    }

    /// Parse a single media range such as `text/html;level=1;q=0.5`
    pub fn parse(entry: &str) -> Option<MediaRange> {
        let mut segments = entry.split(';');
        let (kind, subtype) = segments.next()?.trim().split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut quality = 1.0;
        let mut params = Vec::new();
        for segment in segments {
            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().trim_matches('"');
            if name == "q" {
                quality = parse_quality(value);
            } else {
                params.push((name, value.to_string()));
            }
        }

        Some(MediaRange {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
            quality,
        })
    }

    /// Specificity of the match against a concrete media type, higher is more
    /// specific. `None` if the range does not match.
    fn specificity(&self, kind: &str, subtype: &str) -> Option<u8> {
        match (self.kind.as_str(), self.subtype.as_str()) {
            ("*", "*") => Some(0),
            (k, "*") if k.eq_ignore_ascii_case(kind) => Some(1),
            (k, s) if k.eq_ignore_ascii_case(kind) && s.eq_ignore_ascii_case(subtype) => Some(2),
            _ => None,
        }
    }
}

fn parse_quality(value: &str) -> f32 {
    match value.parse::<f32>() {
        Ok(q) if (0.0..=1.0).contains(&q) => q,
        _ => 0.0,
    }
}

/// Quality the client assigns to `kind/subtype`.
///
/// The most specific matching range decides; among equally specific ranges the
/// first one listed wins. Returns 0 when nothing matches.
pub fn quality_of(ranges: &[MediaRange], kind: &str, subtype: &str) -> f32 {
    let mut best: Option<(u8, f32)> = None;
    for range in ranges {
        let Some(specificity) = range.specificity(kind, subtype) else {
            continue;
        };
        if best.is_none_or(|(s, _)| specificity > s) {
            best = Some((specificity, range.quality));
        }
    }
    best.map(|(_, q)| q).unwrap_or(0.0)
}

/// Pick the offer the client prefers, earliest offer on ties.
///
/// Offers are concrete media types such as `application/json`. An absent or
/// empty header accepts anything, so the first offer is returned.
pub fn preferred<'a>(accept: Option<&str>, offers: &[&'a str]) -> Option<&'a str> {
    let accept = accept.map(str::trim).unwrap_or_default();
    if accept.is_empty() {
        return offers.first().copied();
    }
    let ranges = MediaRange::parse_list(accept);
    let mut best: Option<(&'a str, f32)> = None;
    for &offer in offers {
        let Some((kind, subtype)) = offer.split_once('/') else {
            continue;
        };
        let q = quality_of(&ranges, kind, subtype);
        if q > 0.0 && best.is_none_or(|(_, best_q)| q > best_q) {
            best = Some((offer, q));
        }
    }
    best.map(|(offer, _)| offer)
}

/// True if the client can render an HTML response.
///
/// A missing or empty `Accept` header is what browsers send on plain
/// navigation, so it counts as HTML-capable.
pub fn wants_html(accept: Option<&str>) -> bool {
    let accept = accept.map(str::trim).unwrap_or_default();
    if accept.is_empty() {
        return true;
    }
    quality_of(&MediaRange::parse_list(accept), "text", "html") > 0.0
}

/// Methods that can be replayed after a login redirect
pub fn is_safe_method(method: &Method) -> bool {
    !matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Decide whether an unauthenticated request gets a login redirect rather
/// than a `401`.
pub fn should_redirect_to_login(method: &Method, accept: Option<&str>) -> bool {
    is_safe_method(method) && wants_html(accept)
}
