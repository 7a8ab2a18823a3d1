//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use logline::config::LoglineConfig;
use logline::http::server::access_log_options;
use logline::{AccessLog, HttpServer, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running demo server and the access-log lines it has produced.
pub struct TestServer {
    pub addr: SocketAddr,
    pub lines: Arc<Mutex<Vec<String>>>,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until `count` lines have been logged, or give up after a second.
    pub async fn wait_for_lines(&self, count: usize) -> Vec<String> {
        for _ in 0..100 {
            {
                let lines = self.lines.lock().unwrap();
                if lines.len() >= count {
                    return lines.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.lines.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap();
    }
}

/// Start the demo server on an ephemeral port, collecting lines in memory.
pub async fn start_server(mut config: LoglineConfig) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let options = access_log_options(&config.access_log).on_log(move |line, _| {
        sink.lock().unwrap().push(line.to_string());
    });
    let server = HttpServer::with_access_log(config, AccessLog::new(options).unwrap());

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        lines,
        shutdown,
        handle,
    }
}

/// Config with the given access-log format and otherwise defaults.
pub fn config_with_format(format: &str) -> LoglineConfig {
    let mut config = LoglineConfig::default();
    config.access_log.format = format.to_string();
    config
}
