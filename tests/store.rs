//! A slow store fetch behind a request-scoped token: when the request goes
//! away, the store stops building its response and nothing gets written.

use futures_race::operation::blocking;
use futures_race::prelude::*;
use futures_race::{CancelSource, CancelToken, RaceResult};

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct SpyStore {
    response: &'static str,
    chars_built: AtomicUsize,
    stopped: AtomicBool,
}

impl SpyStore {
    fn new(response: &'static str) -> Arc<Self> {
        Arc::new(Self {
            response,
            ..Self::default()
        })
    }

    /// Build the response one character at a time, slowly.
    fn fetch(&self, token: &CancelToken) -> io::Result<String> {
        let mut out = String::new();
        for c in self.response.chars() {
            if let Err(stopped) = token.check() {
                self.stopped.store(true, Ordering::SeqCst);
                return Err(stopped.into());
            }
            thread::sleep(Duration::from_millis(10));
            out.push(c);
            self.chars_built.fetch_add(1, Ordering::SeqCst);
        }
        Ok(out)
    }
}

#[derive(Default)]
struct SpyResponse {
    written: AtomicBool,
    body: std::sync::Mutex<String>,
}

async fn serve(store: Arc<SpyStore>, request: &CancelToken, response: &SpyResponse) {
    let fetch = blocking("store", move |token| store.fetch(token));
    let res = vec![fetch].race_until(request).unwrap().await;
    if let RaceResult::Winner { value, .. } = res {
        response.written.store(true, Ordering::SeqCst);
        *response.body.lock().unwrap() = value;
    }
}

#[tokio::test]
async fn returns_data_from_store() {
    let store = SpyStore::new("hello, world");
    let response = SpyResponse::default();
    serve(store.clone(), &CancelToken::never(), &response).await;

    assert!(response.written.load(Ordering::SeqCst));
    assert_eq!(*response.body.lock().unwrap(), "hello, world");
    assert!(!store.stopped.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn tells_store_to_stop_when_request_is_cancelled() {
    let store = SpyStore::new("hello, world");
    let response = SpyResponse::default();
    let request = CancelSource::new();
    let token = request.token();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        request.cancel();
    });
    serve(store.clone(), &token, &response).await;
    canceller.await.unwrap();

    assert!(!response.written.load(Ordering::SeqCst));

    // The store notices at its next checkpoint.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.stopped.load(Ordering::SeqCst));
    assert!(store.chars_built.load(Ordering::SeqCst) < "hello, world".len());
}
