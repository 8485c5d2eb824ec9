//! Mock NDJSON plant metrics streamer.
//!
//! Local stand-in for the real sensor feed: an infinite stream of records
//! following a mild random walk with a small sinusoid so the numbers look
//! alive. One record per configured interval; the stream ends silently when
//! the client disconnects.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use futures::Stream;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::MockConfig;
use crate::errors::AppError;
use crate::state::round_to;
use crate::utils::datetime::DateTimeParser;

pub struct MockStreamServer {
    app: Router,
    addr: SocketAddr,
}

impl MockStreamServer {
    pub fn new(config: &MockConfig) -> Result<Self> {
        let app = Self::create_router(config.clone());
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(AppError::AddrParse)?;
        Ok(Self { app, addr })
    }

    pub fn create_router(config: MockConfig) -> Router {
        Router::new()
            .route("/metrics/plant_stream", get(stream_handler))
            .route("/healthz", get(healthz))
            .with_state(config)
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(AppError::Io)?;
        axum::serve(listener, self.app).await.map_err(AppError::Io)?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn stream_handler(State(config): State<MockConfig>) -> impl IntoResponse {
    debug!("Mock stream client connected");
    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(sample_stream(config)),
    )
}

struct Generator {
    interval: Duration,
    interval_secs: f64,
    t: f64,
    temp: f64,
    hum: f64,
    co2: f64,
    ticks: u64,
}

impl Generator {
    fn new(config: &MockConfig) -> Self {
        Self {
            interval: Duration::from_secs_f64(config.interval_secs.max(0.01)),
            interval_secs: config.interval_secs,
            t: 0.0,
            temp: config.start_temp_c,
            hum: config.start_humidity_pct,
            co2: config.start_co2_ppm,
            ticks: 0,
        }
    }

    fn next_record(&mut self) -> Value {
        self.t += self.interval_secs;
        self.temp += uniform(-0.05, 0.05) + 0.02 * (self.t / 15.0).sin();
        self.hum += uniform(-0.2, 0.2) + 0.3 * (self.t / 10.0).sin();
        self.co2 += uniform(-5.0, 5.0) + 2.0 * (self.t / 20.0).sin();

        json!({
            "timestamp": DateTimeParser::format_for_wire(&chrono::Utc::now()),
            "co2_ppm": round_to(self.co2, 1).max(350.0),
            "temperature_c": round_to(self.temp, 5),
            "humidity_pct": round_to(self.hum, 5).max(0.0),
        })
    }
}

fn uniform(low: f64, high: f64) -> f64 {
    low + fastrand::f64() * (high - low)
}

/// Infinite NDJSON sample stream; the first record is emitted immediately,
/// subsequent records one interval apart.
pub fn sample_stream(config: MockConfig) -> impl Stream<Item = Result<Bytes, Infallible>> {
    futures::stream::unfold(Generator::new(&config), |mut generator| async move {
        if generator.ticks > 0 {
            tokio::time::sleep(generator.interval).await;
        }
        generator.ticks += 1;
        let line = format!("{}\n", generator.next_record());
        Some((Ok(Bytes::from(line)), generator))
    })
}
