//! A slow store fetch behind a request-scoped token.
//!
//! The request is cancelled after a few milliseconds; the store notices at
//! its next checkpoint and the handler never writes a response.

use futures_lite::future::block_on;
use futures_race::operation::blocking;
use futures_race::prelude::*;
use futures_race::{CancelSource, CancelToken, RaceResult};

use std::io;
use std::thread;
use std::time::Duration;

fn fetch(response: &str, token: &CancelToken) -> io::Result<String> {
    let mut out = String::new();
    for c in response.chars() {
        if let Err(stopped) = token.check() {
            tracing::info!(%stopped, built = %out, "store stopped early");
            return Err(stopped.into());
        }
        thread::sleep(Duration::from_millis(10));
        out.push(c);
    }
    Ok(out)
}

fn handle(request: &CancelToken) -> Option<String> {
    let op = blocking("store", |token| fetch("hello, world", token));
    let race = vec![op].race_until(request).ok()?;
    match block_on(race) {
        RaceResult::Winner { value, .. } => Some(value),
        other => {
            tracing::info!(?other, "no response written");
            None
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info,futures_race=debug"))
        .init();

    println!("uncancelled request: {:?}", handle(&CancelToken::never()));

    let request = CancelSource::new();
    let token = request.token();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        request.cancel();
    });
    println!("cancelled request: {:?}", handle(&token));
    canceller.join().expect("canceller thread panicked");

    // Give the store thread time to reach its checkpoint and log.
    thread::sleep(Duration::from_millis(20));
}
