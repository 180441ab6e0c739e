use std::fmt;

/// The wire formats this integration can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    UrlEncoded,
    Json,
    XmlApplication,
    XmlText,
    TextPlain,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::UrlEncoded => "application/x-www-form-urlencoded",
            MimeType::Json => "application/json",
            MimeType::XmlApplication => "application/xml",
            MimeType::XmlText => "text/xml",
            MimeType::TextPlain => "text/plain",
        }
    }

    pub fn is_xml(&self) -> bool {
        matches!(self, MimeType::XmlApplication | MimeType::XmlText)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats accepted in inbound request bodies and negotiated for inbound
/// responses.
pub const BODY_MIME_TYPES: [MimeType; 4] = [
    MimeType::UrlEncoded,
    MimeType::Json,
    MimeType::XmlApplication,
    MimeType::XmlText,
];

/// Formats the response builder can emit. Superset of the body set: posters
/// may ask for a plain-text summary.
pub const RESPONSE_MIME_TYPES: [MimeType; 5] = [
    MimeType::UrlEncoded,
    MimeType::Json,
    MimeType::XmlApplication,
    MimeType::XmlText,
    MimeType::TextPlain,
];

/// Formats accepted from a buyer's server when forwarding a lead.
pub const OUTBOUND_MIME_TYPES: [MimeType; 3] =
    [MimeType::Json, MimeType::XmlApplication, MimeType::XmlText];

/// Comma-separated list used in negotiation failure messages.
pub fn supported_list(supported: &[MimeType]) -> String {
    supported
        .iter()
        .map(MimeType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One media range from an Accept-style header, with its quality factor.
struct MediaRange {
    kind: String,
    subtype: String,
    quality: f64,
}

impl MediaRange {
    fn parse(range: &str) -> Option<MediaRange> {
        let mut parts = range.split(';');
        let mime = parts.next()?.trim();
        let (kind, subtype) = match mime.split_once('/') {
            Some((t, s)) => (t.trim(), s.trim()),
            // A bare "*" is shorthand for "*/*"
            None if mime == "*" => ("*", "*"),
            None => return None,
        };
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }
        let mut quality = 1.0;
        for param in parts {
            if let Some((name, value)) = param.split_once('=') {
                if name.trim() == "q" {
                    quality = value.trim().parse().unwrap_or(0.0);
                }
            }
        }
        Some(MediaRange {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            quality,
        })
    }

    /// Fitness of this range against a concrete type: exact segments beat
    /// wildcards. `None` when the range does not match at all.
    fn fitness(&self, kind: &str, subtype: &str) -> Option<u32> {
        let kind_fit = match self.kind.as_str() {
            k if k == kind => 100,
            "*" => 0,
            _ => return None,
        };
        let subtype_fit = match self.subtype.as_str() {
            s if s == subtype => 10,
            "*" => 0,
            _ => return None,
        };
        Some(kind_fit + subtype_fit)
    }
}

/// Picks the best supported type for an Accept or Content-Type header value.
///
/// A missing, empty, or fully-wildcard header negotiates as JSON. Ties on
/// fitness and quality break in favor of JSON, then the order of `supported`.
/// Never fails: anything unrecognized simply yields `None`.
pub fn best_match(supported: &[MimeType], header: Option<&str>) -> Option<MimeType> {
    let header = match header.map(str::trim) {
        None | Some("") | Some("*/*") => MimeType::Json.as_str(),
        Some(value) => value,
    };

    let ranges: Vec<MediaRange> = header.split(',').filter_map(MediaRange::parse).collect();

    let mut best: Option<(u32, f64, MimeType)> = None;
    for &candidate in supported {
        let (kind, subtype) = match candidate.as_str().split_once('/') {
            Some(parts) => parts,
            None => continue,
        };
        // The most specific matching range decides this candidate's quality.
        let scored = ranges
            .iter()
            .filter_map(|r| Some((r.fitness(kind, subtype)?, r.quality)))
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((fitness, quality)) = scored {
            if quality <= 0.0 {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_fit, best_q, best_type)) => {
                    match (quality, fitness).partial_cmp(&(*best_q, *best_fit)) {
                        Some(std::cmp::Ordering::Greater) => true,
                        // JSON is the tie-break default
                        Some(std::cmp::Ordering::Equal) => {
                            candidate == MimeType::Json && *best_type != MimeType::Json
                        }
                        _ => false,
                    }
                }
            };
            if better {
                best = Some((fitness, quality, candidate));
            }
        }
    }
    best.map(|(_, _, mime)| mime)
}
