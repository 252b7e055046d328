use monarch_bridge::app::App;
use monarch_bridge::config::Settings;

fn live_app() -> App {
    App::from_settings(&Settings::default()).unwrap()
}

#[tokio::test]
#[ignore]
async fn resolve_real_isbn() {
    let record = live_app()
        .publications()
        .resolve("ISBN-13:978-0721606156")
        .await;

    assert_eq!(
        record.title.as_deref(),
        Some("Smith's Recognizable Patterns Of Human Malformation")
    );
    assert_eq!(record.year.as_deref(), Some("2006"));
    assert_eq!(
        record.url.as_deref(),
        Some("https://openlibrary.org/isbn/9780721606156")
    );
}

#[tokio::test]
#[ignore]
async fn resolve_real_pmid() {
    let record = live_app().publications().resolve("PMID:19204439").await;

    assert_eq!(
        record.title.as_deref(),
        Some("Rubinstein Taybi syndrome with hepatic hemangioma.")
    );
    assert_eq!(record.authors.as_deref(), Some("Sahiner UM et al."));
    assert_eq!(record.journal.as_deref(), Some("Med Princ Pract"));
}

#[tokio::test]
#[ignore]
async fn search_real_covid() {
    let results = live_app()
        .search_entity("COVID-19", "biolink:Disease", 2, 0)
        .await
        .unwrap();

    assert!(results.results.len() <= 2);
    assert!(results.total > 0);
}
