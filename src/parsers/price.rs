use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Currency;

/// `"<Title> - <marker> <amount>"` as found in the social-preview title.
static TITLE_PRICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s*-\s*(?:U\$S|US\$|USD|\$)\s*([\d.]+)$")
        .expect("Invalid title price regex")
});

static BRANDING_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*-\s*MercadoLibre.*$")
        .expect("Invalid branding suffix regex")
});

static PIPE_DECORATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\|.*$")
        .expect("Invalid pipe decoration regex")
});

const USD_MARKERS: [&str; 3] = ["U$S", "US$", "USD"];

/// Parse a locale-formatted amount (`"$ 15.000.000"`) into an integer.
///
/// Dots are thousands separators. Leading currency glyphs are skipped and the
/// first run of digits is parsed. Anything unparseable collapses to 0.
pub fn normalize_amount(text: &str) -> u64 {
    let without_separators = text.replace('.', "");
    let digits: String = without_separators
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Keep only ASCII digits and parse; 0 when nothing is left.
pub fn digits_only(text: &str) -> u64 {
    text.chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

pub fn detect_currency(text: &str) -> Currency {
    if USD_MARKERS.iter().any(|marker| text.contains(marker)) {
        Currency::Usd
    } else {
        Currency::Ars
    }
}

/// Split `"Toyota Corolla 2020 - $ 15.000.000"` into title and price.
pub fn split_title_price(text: &str) -> Option<(String, u64)> {
    let caps = TITLE_PRICE_REGEX.captures(text.trim())?;
    let title = caps.get(1)?.as_str().trim().to_string();
    let price = normalize_amount(caps.get(2)?.as_str());
    Some((title, price))
}

/// Drop the trailing `" - MercadoLibre..."` site branding.
pub fn strip_branding(title: &str) -> String {
    BRANDING_SUFFIX_REGEX.replace(title, "").trim().to_string()
}

/// Branding strip plus removal of a trailing `"| ..."` decoration.
pub fn strip_title_decoration(title: &str) -> String {
    let unbranded = BRANDING_SUFFIX_REGEX.replace(title, "");
    PIPE_DECORATION_REGEX.replace(&unbranded, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_amount_strips_thousands_separators() {
        assert_eq!(normalize_amount("15.000.000"), 15_000_000);
        assert_eq!(normalize_amount("$ 36.700.000"), 36_700_000);
        assert_eq!(normalize_amount("U$S 50.000"), 50_000);
        assert_eq!(normalize_amount("850"), 850);
    }

    #[test]
    fn normalize_amount_never_fails() {
        assert_eq!(normalize_amount(""), 0);
        assert_eq!(normalize_amount("consultar"), 0);
        assert_eq!(normalize_amount("99999999999999999999999"), 0);
    }

    #[test]
    fn digits_only_discards_everything_else() {
        assert_eq!(digits_only("45.000 km"), 45_000);
        assert_eq!(digits_only("n/a"), 0);
    }

    #[test]
    fn split_title_price_ars() {
        let (title, price) = split_title_price("Toyota Corolla 2020 - $ 15.000.000").unwrap();
        assert_eq!(title, "Toyota Corolla 2020");
        assert_eq!(price, 15_000_000);
        assert_eq!(detect_currency("Toyota Corolla 2020 - $ 15.000.000"), Currency::Ars);
    }

    #[test]
    fn split_title_price_usd() {
        let source = "Ford Ranger 3.2 Limited - U$S 50.000";
        let (title, price) = split_title_price(source).unwrap();
        assert_eq!(title, "Ford Ranger 3.2 Limited");
        assert_eq!(price, 50_000);
        assert_eq!(detect_currency(source), Currency::Usd);
    }

    #[test]
    fn split_title_price_keeps_inner_dashes() {
        let (title, price) = split_title_price("Fiat Cronos - Precision - $ 9.800.000").unwrap();
        assert_eq!(title, "Fiat Cronos - Precision");
        assert_eq!(price, 9_800_000);
    }

    #[test]
    fn split_title_price_requires_amount_suffix() {
        assert!(split_title_price("Peugeot 208 Active - MercadoLibre").is_none());
    }

    #[test]
    fn strips_site_decorations() {
        assert_eq!(strip_branding("Peugeot 208 Active - MercadoLibre.com.ar"), "Peugeot 208 Active");
        assert_eq!(
            strip_title_decoration("Renault Kwid | Autos - MercadoLibre"),
            "Renault Kwid"
        );
    }
}
