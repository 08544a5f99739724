use shelf_core::index::IdfWeighting;
use shelf_core::{
    CatalogEntry, CatalogIndex, MemoryReviewStore, NewReview, Recommendation, Recommender, Review, ReviewIndex,
    ReviewStore, StorageError, TfidfConfig, Unavailable, MIN_REVIEWS,
};
use std::sync::Arc;

fn new_review(author: &str, title: &str, content: &str) -> NewReview {
    NewReview { author: author.into(), title: title.into(), content: content.into(), score: 7, cover: None }
}

fn seeded_reviews() -> Vec<Review> {
    let store = MemoryReviewStore::new();
    store.insert(new_review("Ann", "Dune", "A desert planet where spice and politics collide")).unwrap();
    store.insert(new_review("Bo", "Foundation", "Psychohistory predicts the galactic empire falling")).unwrap();
    store.insert(new_review("Cy", "Neuromancer", "A burned out hacker jacks into cyberspace")).unwrap();
    store.list_all().unwrap()
}

fn entry(isbn: &str, title: &str, author: &str, year: &str) -> CatalogEntry {
    CatalogEntry { isbn: isbn.into(), title: title.into(), author: author.into(), year: year.into() }
}

fn fixture_catalog() -> CatalogIndex {
    CatalogIndex::build(vec![
        entry("0441013597", "Dune", "Frank Herbert", "1965"),
        entry("0553293354", "Foundation", "Isaac Asimov", "1951"),
        entry("0441569595", "Neuromancer", "William Gibson", "1984"),
        entry("0345391802", "The Hitchhiker's Guide to the Galaxy", "Douglas Adams", "1979"),
    ])
}

#[test]
fn desert_planet_politics_finds_dune() {
    let reviews = seeded_reviews();
    let pick = ReviewIndex::build(&reviews).query("desert planet politics").unwrap();
    assert_eq!(pick.title, "Dune");
    assert_eq!(pick.author, "Ann");
}

#[test]
fn below_threshold_never_answers() {
    let reviews = seeded_reviews();
    for n in 0..MIN_REVIEWS {
        let index = ReviewIndex::build(&reviews[..n]);
        assert!(!index.is_ready());
        for query in ["desert planet politics", "Foundation", ""] {
            assert_eq!(
                index.recommend(query),
                Recommendation::Unavailable(Unavailable::BelowThreshold { have: n, need: MIN_REVIEWS })
            );
        }
    }
}

#[test]
fn empty_query_is_absent_from_both_indexes() {
    let recommender = Recommender::new(Arc::new(fixture_catalog()), TfidfConfig::default());
    let recs = recommender.recommend("", &seeded_reviews());
    assert_eq!(recs.global, Recommendation::NoMatch);
    assert_eq!(recs.local, Recommendation::NoMatch);
    let response = recs.into_response();
    assert_eq!(response.global, None);
    assert_eq!(response.local, None);
}

#[test]
fn no_overlap_is_suppressed() {
    let recommender = Recommender::new(Arc::new(fixture_catalog()), TfidfConfig::default());
    let recs = recommender.recommend("gardening tomatoes", &seeded_reviews());
    assert_eq!(recs.global.kind(), "no_match");
    assert_eq!(recs.local.kind(), "no_match");
}

#[test]
fn total_overlap_scores_near_one() {
    let catalog = fixture_catalog();
    match catalog.recommend("Neuromancer William Gibson") {
        Recommendation::Found { item, score } => {
            assert_eq!(item.isbn, "0441569595");
            assert!((score - 1.0).abs() < 1e-5, "score {score}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn catalog_matches_authors_case_insensitively() {
    let catalog = fixture_catalog();
    assert_eq!(catalog.query("ASIMOV").unwrap().title, "Foundation");
    assert_eq!(catalog.query("galaxy guide").unwrap().author, "Douglas Adams");
}

#[test]
fn empty_catalog_is_unavailable_not_an_error() {
    let catalog = CatalogIndex::build(Vec::new());
    assert!(!catalog.is_ready());
    assert_eq!(catalog.recommend("dune"), Recommendation::Unavailable(Unavailable::EmptyCorpus));
    assert_eq!(CatalogIndex::unavailable().query("dune"), None);
}

#[test]
fn stop_word_catalog_fails_quietly() {
    let catalog = CatalogIndex::build(vec![entry("1", "The", "A", "2000")]);
    assert_eq!(catalog.recommend("the").kind(), "failed");
    assert_eq!(catalog.query("the"), None);
}

#[test]
fn ties_resolve_to_earliest_entry() {
    let catalog = CatalogIndex::build(vec![
        entry("1", "Sea Stories", "Anon", "1900"),
        entry("2", "Sea Stories", "Anon", "1901"),
        entry("3", "Land Tales", "Other", "1902"),
    ]);
    for _ in 0..10 {
        assert_eq!(catalog.query("sea").unwrap().isbn, "1");
    }
}

#[test]
fn review_index_reflects_new_reviews_immediately() {
    let store = MemoryReviewStore::new();
    let recommender = Recommender::new(Arc::new(CatalogIndex::unavailable()), TfidfConfig::default());
    for (t, c) in [("Dune", "desert spice"), ("Emma", "matchmaking in a village"), ("Ulysses", "a day in Dublin")] {
        store.insert(new_review("Ann", t, c)).unwrap();
    }
    assert_eq!(recommender.local("whales", &store.list_all().unwrap()), Recommendation::NoMatch);
    store.insert(new_review("Ish", "Moby Dick", "whales and obsession")).unwrap();
    let pick = recommender.local("whales", &store.list_all().unwrap()).into_option().unwrap();
    assert_eq!(pick.title, "Moby Dick");
}

fn common_word_fixture(config: TfidfConfig) -> (Recommender, Vec<Review>) {
    let catalog = CatalogIndex::build_with(
        vec![entry("1", "Common Ground", "Ann Lee", "2001"), entry("2", "Common Sense", "Tom Paine", "1776")],
        config,
    );
    let store = MemoryReviewStore::new();
    for (title, content) in [("Common", "harbor lights"), ("Common", "winter roads"), ("Common", "violin lessons")] {
        store.insert(new_review("Ann", title, content)).unwrap();
    }
    (Recommender::new(Arc::new(catalog), config), store.list_all().unwrap())
}

#[test]
fn both_indexes_share_the_configured_weighting() {
    let plain = TfidfConfig { idf: IdfWeighting::Plain, sublinear_tf: false };
    let (recommender, reviews) = common_word_fixture(plain);
    assert_eq!(recommender.config(), plain);
    let recs = recommender.recommend("common", &reviews);
    assert_eq!(recs.global, Recommendation::NoMatch);
    assert_eq!(recs.local, Recommendation::NoMatch);

    let (recommender, reviews) = common_word_fixture(TfidfConfig::default());
    let recs = recommender.recommend("common", &reviews);
    assert!(recs.global.is_found());
    assert!(recs.local.is_found());
}

struct UnreadableStore;

impl ReviewStore for UnreadableStore {
    fn insert(&self, _review: NewReview) -> Result<Review, StorageError> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "read-only").into())
    }

    fn list_all(&self) -> Result<Vec<Review>, StorageError> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
    }

    fn len(&self) -> Result<usize, StorageError> { Ok(0) }
}

#[test]
fn unreadable_store_is_reported_separately_from_no_match() {
    let recommender = Recommender::new(Arc::new(fixture_catalog()), TfidfConfig::default());
    let local = recommender.local_from_store("desert planet", &UnreadableStore);
    assert_eq!(local, Recommendation::Unavailable(Unavailable::StoreUnreadable));
    assert_eq!(local.kind(), "unavailable");
    assert_eq!(local.into_option(), None);

    let store = MemoryReviewStore::new();
    for review in seeded_reviews().into_iter().rev() {
        store.insert(new_review(&review.author, &review.title, &review.content)).unwrap();
    }
    let pick = recommender.local_from_store("desert planet politics", &store).into_option().unwrap();
    assert_eq!(pick.title, "Dune");
}
