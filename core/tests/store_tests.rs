use shelf_core::{MemoryReviewStore, NewReview, ReviewStore, SledReviewStore};
use tempfile::tempdir;

fn sample(title: &str, score: u8) -> NewReview {
    NewReview { author: "Ann".into(), title: title.into(), content: "words".into(), score, cover: None }
}

fn exercise(store: &dyn ReviewStore) {
    assert!(store.list_all().unwrap().is_empty());
    let first = store.insert(sample("First", 3)).unwrap();
    let second = store.insert(sample("Second", 9)).unwrap();
    assert!(second.id > first.id);

    let all = store.list_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(store.len().unwrap(), 2);
    assert_eq!(all[0], second);
    assert_eq!(all[1], first);
    assert!(all[0].created_at >= all[1].created_at);
}

#[test]
fn memory_store_lists_newest_first() {
    exercise(&MemoryReviewStore::new());
}

#[test]
fn sled_store_lists_newest_first() {
    exercise(&SledReviewStore::temporary().unwrap());
}

#[test]
fn sled_store_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reviews.db");
    let stored = {
        let store = SledReviewStore::open(&path).unwrap();
        store.insert(NewReview { cover: Some("cover_1.png".into()), ..sample("Kept", 10) }).unwrap()
    };
    let store = SledReviewStore::open(&path).unwrap();
    let all = store.list_all().unwrap();
    assert_eq!(all, vec![stored.clone()]);
    let next = store.insert(sample("Later", 1)).unwrap();
    assert!(next.id > stored.id);
    assert_eq!(store.list_all().unwrap()[0].title, "Later");
}
