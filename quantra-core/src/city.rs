//! Best-effort city extraction from free text.
//!
//! The result is not validated; a garbage token simply fails geocoding later.

const DELIMITERS: &[&str] = &["IN ", "AT ", "FOR "];
const WEATHER_MARKER: &str = "WEATHER ";

/// Pull a city name out of a query such as "what should I wear in Tokyo?".
///
/// The returned name is upper-cased. Delimiters are tried in order and the
/// text after the last occurrence of the first productive one wins.
pub fn extract_city(query: &str) -> Option<String> {
    let upper = query.to_uppercase();

    for delimiter in DELIMITERS {
        if let Some((_, tail)) = upper.rsplit_once(delimiter) {
            let candidate = tail.split('?').next().unwrap_or_default().trim();
            if !candidate.is_empty() {
                return Some(candidate.to_string());
            }
        }
    }

    upper
        .rsplit_once(WEATHER_MARKER)
        .map(|(_, tail)| tail.trim().to_string())
        .filter(|city| !city.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_after_in() {
        assert_eq!(
            extract_city("what should I wear in Tokyo?").as_deref(),
            Some("TOKYO")
        );
    }

    #[test]
    fn uses_last_occurrence() {
        assert_eq!(
            extract_city("in summer what is it like in New York? thanks").as_deref(),
            Some("NEW YORK")
        );
    }

    #[test]
    fn delimiter_priority_in_before_at() {
        assert_eq!(
            extract_city("look at weather in Paris").as_deref(),
            Some("PARIS")
        );
    }

    #[test]
    fn falls_through_empty_candidates() {
        // "IN " is present but yields nothing before the question mark.
        assert_eq!(
            extract_city("sunny in ? forecast for Oslo").as_deref(),
            Some("OSLO")
        );
    }

    #[test]
    fn weather_marker_fallback() {
        assert_eq!(
            extract_city("weather London").as_deref(),
            Some("LONDON")
        );
    }

    #[test]
    fn nothing_to_extract() {
        assert_eq!(extract_city("hello there"), None);
        assert_eq!(extract_city("weather "), None);
    }

    #[test]
    fn may_return_garbage() {
        // "RAIN " ends with "IN ", so the heuristic grabs the following words.
        assert_eq!(
            extract_city("will it rain today").as_deref(),
            Some("TODAY")
        );
    }
}
