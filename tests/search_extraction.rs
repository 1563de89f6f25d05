use pretty_assertions::assert_eq;
use vehicle_tracker::models::{AttributeKey, Currency, ListingCondition, Location};
use vehicle_tracker::{ListingExtractor, MarketplaceConfig};

const SEARCH_PAGE: &str = include_str!("fixtures/search_page.html");

fn card(id: u64, title: &str, extra: &str) -> String {
    format!(
        r#"<li class="ui-search-layout__item"><div class="poly-card poly-card--list"><div class="poly-card__content"><a href="https://auto.mercadolibre.com.ar/MLA-{id}-auto-_JM" class="poly-component__title">{title}</a>{extra}</div></div></li>"#
    )
}

fn page(cards: &[String], trailer: &str) -> String {
    format!(
        "<html><body><ol class=\"ui-search-layout\">{}</ol>{}</body></html>",
        cards.concat(),
        trailer
    )
}

#[test]
fn search_page_fixture() {
    let records = ListingExtractor::default().extract_search_results(SEARCH_PAGE);

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["MLA1428374651", "MLA1500000002", "MLA1600000003"]);

    let corolla = &records[0];
    assert_eq!(corolla.title, "Toyota Corolla 2.0 Xei Cvt");
    assert_eq!(corolla.price, 15_000_000);
    assert_eq!(corolla.currency, Currency::Ars);
    assert_eq!(
        corolla.thumbnail.as_deref(),
        Some("https://http2.mlstatic.com/D_Q_NP_111-MLA1428374651-O.webp")
    );
    assert_eq!(corolla.condition, ListingCondition::Used);
    assert_eq!(corolla.permalink, "https://auto.mercadolibre.com.ar/MLA-1428374651");
    assert_eq!(corolla.seller, None);
    assert_eq!(
        corolla.location,
        Some(Location { city: "Palermo".to_string(), state: "Capital Federal".to_string() })
    );
    assert_eq!(corolla.attribute(AttributeKey::Brand), Some("Toyota"));
    assert_eq!(corolla.attribute(AttributeKey::Model), Some("Toyota Corolla 2.0 Xei Cvt"));
    assert_eq!(corolla.attribute(AttributeKey::VehicleYear), Some("2020"));
    assert_eq!(corolla.attribute(AttributeKey::Kilometers), Some("62000"));

    let ranger = &records[1];
    assert_eq!(ranger.currency, Currency::Usd);
    assert_eq!(ranger.price, 42_000);
    assert_eq!(
        ranger.thumbnail.as_deref(),
        Some("https://http2.mlstatic.com/D_Q_NP_222-MLA1500000002-O.webp")
    );
    assert_eq!(ranger.condition, ListingCondition::New);
    assert_eq!(ranger.attribute(AttributeKey::Kilometers), Some("0"));
    assert_eq!(ranger.attribute(AttributeKey::VehicleYear), Some("2024"));
    assert_eq!(
        ranger.location,
        Some(Location { city: "Rosario".to_string(), state: String::new() })
    );

    let peugeot = &records[2];
    assert_eq!(peugeot.title, "Peugeot 208 Feline & Techo");
    assert_eq!(peugeot.price, 21_500_000);
    assert_eq!(peugeot.currency, Currency::Ars);
    assert_eq!(peugeot.thumbnail, None);
    assert_eq!(peugeot.location, None);
    assert_eq!(peugeot.condition, ListingCondition::Used);
    assert_eq!(peugeot.attribute(AttributeKey::VehicleYear), None);
    assert_eq!(peugeot.attribute(AttributeKey::Kilometers), None);
}

#[test]
fn first_occurrence_wins_for_duplicates() {
    let html = page(
        &[
            card(1000000001, "Primero", ""),
            card(1000000002, "Otro", ""),
            card(1000000001, "Segundo", ""),
        ],
        "",
    );
    let records = ListingExtractor::default().extract_search_results(&html);

    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Primero", "Otro"]);
}

#[test]
fn results_are_capped_in_document_order() {
    let cards: Vec<String> = (0..60u64)
        .map(|i| card(1_000_000_000 + i, &format!("Auto {}", i), ""))
        .collect();
    let records = ListingExtractor::default().extract_search_results(&page(&cards, ""));

    assert_eq!(records.len(), 48);
    assert_eq!(records[0].id.as_str(), "MLA1000000000");
    assert_eq!(records[47].id.as_str(), "MLA1000000047");
}

#[test]
fn configured_cap_below_ceiling() {
    let config = MarketplaceConfig { max_results: 5, ..Default::default() };
    let extractor = ListingExtractor::new(&config).unwrap();
    let cards: Vec<String> = (0..10u64).map(|i| card(1_000_000_000 + i, "Auto", "")).collect();

    assert_eq!(extractor.extract_search_results(&page(&cards, "")).len(), 5);
}

#[test]
fn aligned_pairs_fill_missing_year_and_mileage() {
    let cards = vec![card(1000000001, "Fiat Cronos", ""), card(1000000002, "Jeep Renegade", "")];
    let trailer = r#"<script>window.__STATE__={"attrs":[["2021","38.500 Km"],["2023","0 Km"]]}</script>"#;
    let records = ListingExtractor::default().extract_search_results(&page(&cards, trailer));

    assert_eq!(records[0].attribute(AttributeKey::VehicleYear), Some("2021"));
    assert_eq!(records[0].attribute(AttributeKey::Kilometers), Some("38500"));
    assert_eq!(records[0].condition, ListingCondition::Used);
    assert_eq!(records[1].attribute(AttributeKey::VehicleYear), Some("2023"));
    assert_eq!(records[1].attribute(AttributeKey::Kilometers), Some("0"));
    assert_eq!(records[1].condition, ListingCondition::New);
}

#[test]
fn misaligned_pairs_are_ignored() {
    let cards = vec![
        card(1000000001, "Fiat Cronos", ""),
        card(1000000002, "Jeep Renegade", ""),
        card(1000000003, "Kia Sportage", ""),
    ];
    let trailer = r#"<script>[["2021","38.500 Km"],["2023","0 Km"]]</script>"#;
    let records = ListingExtractor::default().extract_search_results(&page(&cards, trailer));

    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(record.attribute(AttributeKey::VehicleYear), None);
        assert_eq!(record.attribute(AttributeKey::Kilometers), None);
        assert_eq!(record.condition, ListingCondition::Used);
    }
}

#[test]
fn local_markers_take_precedence_over_pairs() {
    let extra = r#"<ul><li class="poly-attributes_list__item poly-attributes_list__separator">2018</li><li class="poly-attributes_list__item poly-attributes_list__separator">90.000 Km</li></ul>"#;
    let cards = vec![card(1000000001, "Honda Civic", extra)];
    let trailer = r#"<script>[["2022","1.000 Km"]]</script>"#;
    let records = ListingExtractor::default().extract_search_results(&page(&cards, trailer));

    assert_eq!(records[0].attribute(AttributeKey::VehicleYear), Some("2018"));
    assert_eq!(records[0].attribute(AttributeKey::Kilometers), Some("90000"));
}

#[test]
fn pages_without_cards_yield_nothing() {
    let extractor = ListingExtractor::default();
    for html in ["", "<html><body><p>Sin resultados</p></body></html>", "\u{0}garbage<<<>>>"] {
        assert!(extractor.extract_search_results(html).is_empty());
    }
}

#[test]
fn interleaved_banner_does_not_leak_into_neighbours() {
    let banner = r#"<li class="ui-search-layout__item ui-search-intervention"><div class="intervention">Financiá tu auto desde US$ 10.000</div><ul><li>2023</li><li>15.000 Km</li></ul></li>"#;
    let price = r#"<span class="andes-money-amount" aria-label="12.300.000 pesos"><span class="andes-money-amount__fraction">12.300.000</span></span>"#;
    let cards = vec![
        card(1000000001, "Fiat Cronos", price),
        banner.to_string(),
        card(1000000002, "Renault Kwid", price),
    ];
    let records = ListingExtractor::default().extract_search_results(&page(&cards, ""));

    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.currency, Currency::Ars, "{}", record.title);
        assert_eq!(record.price, 12_300_000, "{}", record.title);
        assert_eq!(record.attribute(AttributeKey::VehicleYear), None, "{}", record.title);
        assert_eq!(record.attribute(AttributeKey::Kilometers), None, "{}", record.title);
    }
}
