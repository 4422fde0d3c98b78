//! Race TCP reachability checks and report whichever endpoint answers first.
//!
//! ```text
//! cargo run --example racer -- example.com:80 example.org:80
//! ```

use futures_lite::future::block_on;
use futures_race::operation::blocking;
use futures_race::race::Coordinator;
use futures_race::{CancelToken, EmptyRace, RaceError, RaceResult};

use std::error::Error;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let endpoints: Vec<String> = std::env::args().skip(1).collect();
    let endpoints = if endpoints.is_empty() {
        vec!["rust-lang.org:80".to_string(), "crates.io:80".to_string()]
    } else {
        endpoints
    };

    match block_on(first_reachable(&endpoints))? {
        RaceResult::Winner { label, value } => println!("{label} answered first in {value:?}"),
        RaceResult::Timeout => println!("timed out waiting for {}", endpoints.join(" and ")),
        RaceResult::Cancelled => println!("cancelled"),
        RaceResult::Error { label, cause } => {
            return Err(RaceError::Operation { label, cause }.into())
        }
    }
    Ok(())
}

/// Connect to every endpoint at once and return the first to accept.
async fn first_reachable(
    endpoints: &[String],
) -> Result<RaceResult<Duration, io::Error>, EmptyRace> {
    let ops = endpoints.iter().cloned().map(|endpoint| {
        blocking(endpoint.clone(), move |stop| {
            let start = Instant::now();
            for addr in endpoint.to_socket_addrs()? {
                stop.check()?;
                // A single connect can't be interrupted; a stopped race just
                // discards its result.
                if TcpStream::connect_timeout(&addr, Duration::from_secs(5)).is_ok() {
                    return Ok(start.elapsed());
                }
            }
            Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no address of {endpoint} accepted a connection"),
            ))
        })
    });

    let race = Coordinator::with_default_deadline().race(ops, &CancelToken::never())?;
    Ok(race.await)
}
