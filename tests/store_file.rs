// tests/store_file.rs
//
// File-backed store in a temp directory: whole-board replace, rank order,
// timestamps, reopen, concurrent writers, and corrupted files.

use std::sync::Arc;

use futures::future::join_all;
use tempfile::tempdir;

use trend_aggregator::error::StoreError;
use trend_aggregator::model::{Board, Category, TrendItem};
use trend_aggregator::store::{FileStore, TrendStore};

fn items(n: u32) -> Vec<TrendItem> {
    (1..=n)
        .map(|r| {
            TrendItem::new(Category::Shopping, r, format!("item {r}"), "Store")
                .with_meta("price", format!("{r},000원"))
        })
        .collect()
}

#[tokio::test]
async fn replace_then_read_in_rank_order() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::open(dir.path()).await.expect("open");
    let board = Board::Category(Category::Shopping);

    let mut v = items(4);
    v.reverse();
    store.replace(board, &v).await.expect("replace");

    let top = store.read_top(board, 3).await.expect("read");
    let ranks: Vec<u32> = top.iter().map(|i| i.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(top[0].metadata["price"], serde_json::json!("1,000원"));
    assert!(store.last_updated(board).await.expect("ts").is_some());

    assert!(dir.path().join("shopping.json").exists());
    assert!(!dir.path().join("shopping.json.tmp").exists());
}

#[tokio::test]
async fn replace_overwrites_and_refreshes_timestamp() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::open(dir.path()).await.expect("open");

    store.replace(Board::Overall, &items(5)).await.expect("first");
    let first = store.last_updated(Board::Overall).await.expect("ts").expect("set");
    store.replace(Board::Overall, &items(2)).await.expect("second");
    let second = store.last_updated(Board::Overall).await.expect("ts").expect("set");

    assert_eq!(store.read_top(Board::Overall, 10).await.expect("read").len(), 2);
    assert!(second >= first);
}

#[tokio::test]
async fn missing_board_reads_empty() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::open(dir.path().join("nested/boards")).await.expect("open");
    assert!(store.read_top(Board::Overall, 10).await.expect("read").is_empty());
    assert!(store.last_updated(Board::Overall).await.expect("ts").is_none());
    assert!(store.dir().is_dir());
}

#[tokio::test]
async fn boards_survive_reopen() {
    let dir = tempdir().expect("tempdir");
    {
        let store = FileStore::open(dir.path()).await.expect("open");
        store
            .replace(Board::Category(Category::Keyword), &items(3))
            .await
            .expect("replace");
    }
    let store = FileStore::open(dir.path()).await.expect("reopen");
    let top = store
        .read_top(Board::Category(Category::Keyword), 10)
        .await
        .expect("read");
    assert_eq!(top, items(3));
}

#[tokio::test]
async fn corrupted_board_file_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::open(dir.path()).await.expect("open");
    std::fs::write(dir.path().join("rising.json"), b"{ not json").expect("write");

    let err = store
        .read_top(Board::Category(Category::Rising), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Serde(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_replaces_of_one_board_all_succeed() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(FileStore::open(dir.path()).await.expect("open"));
    let board = Board::Category(Category::Shopping);

    for _round in 0..25 {
        let writers = (1..=8u32).map(|n| {
            let store = store.clone();
            tokio::spawn(async move { store.replace(board, &items(n)).await })
        });
        for res in join_all(writers).await {
            res.expect("join").expect("replace");
        }

        let top = store.read_top(board, 20).await.expect("read");
        assert!((1..=8).contains(&top.len()));
        assert_eq!(top, items(top.len() as u32));
    }

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "shopping.json")
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
