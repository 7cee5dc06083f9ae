//! TCP Server for docrel
//!
//! Clients send one command per line. Every reply ends with an empty line so
//! that a client can read multi-line output without knowing its length.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::executor::{ExecutionEngine, QueryResult, Session};
use crate::storage::Value;

/// Default server port
pub const DEFAULT_PORT: u16 = 8989;

/// URL scheme understood by [`ConnectionUrl`]
pub const URL_SCHEME: &str = "docrel";

/// Greeting sent when a client connects
pub const WELCOME: &str = "docrel server v0.1.0\nReady for commands.";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Directory holding the document store and the catalog
    pub data_dir: PathBuf,
    /// Catalog file name inside `data_dir`
    pub catalog_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_connections: 100,
            data_dir: PathBuf::from("docrel-data"),
            catalog_file: "catalog.json".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new server config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn catalog_file(mut self, catalog_file: impl Into<String>) -> Self {
        self.catalog_file = catalog_file.into();
        self
    }

    /// Build a config from command line arguments (without the program name)
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut config = Self::new();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| Error::Config(format!("missing value for {}", arg)))
            };
            match arg.as_str() {
                "--host" => config.host = value()?,
                "--port" | "-p" => {
                    let port = value()?;
                    config.port = port
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid port: {}", port)))?;
                }
                "--data-dir" => config.data_dir = PathBuf::from(value()?),
                "--max-connections" => {
                    let max = value()?;
                    config.max_connections = match max.parse() {
                        Ok(n) if n > 0 => n,
                        _ => return Err(Error::Config(format!("invalid connection limit: {}", max))),
                    };
                }
                other => return Err(Error::Config(format!("unknown argument: {}", other))),
            }
        }

        Ok(config)
    }

    /// Get the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full path of the catalog file
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }
}

/// Parsed server URL
/// Format: docrel://host[:port]
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionUrl {
    /// Host address
    pub host: String,
    /// Port number, [`DEFAULT_PORT`] when absent
    pub port: u16,
}

impl ConnectionUrl {
    /// Parse a connection URL string
    pub fn parse(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::Config(format!("invalid URL '{}': missing scheme", url)))?;
        if scheme != URL_SCHEME {
            return Err(Error::Config(format!(
                "invalid URL '{}': scheme must be {}",
                url, URL_SCHEME
            )));
        }

        let host_port = rest.trim_end_matches('/');
        let (host, port) = match host_port.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("invalid port: {}", port)))?;
                (host, port)
            }
            None => (host_port, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(Error::Config(format!("invalid URL '{}': missing host", url)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Address to connect to
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// docrel TCP Server
pub struct Server {
    config: ServerConfig,
    engine: Arc<ExecutionEngine>,
}

impl Server {
    /// Create a new server
    pub fn new(config: ServerConfig, engine: Arc<ExecutionEngine>) -> Self {
        Self { config, engine }
    }

    /// Bind the configured address and serve until Ctrl+C
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        info!(address = %self.config.bind_address(), "server listening");

        tokio::select! {
            result = self.serve(listener) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                Ok(())
            }
        }
    }

    /// Accept connections on an already bound listener, one task per client
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let permits = Arc::new(Semaphore::new(self.config.max_connections));

        loop {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::Internal(e.to_string()))?;

            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "accept error");
                    continue;
                }
            };

            let engine = self.engine.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "client connected");
                if let Err(e) = handle_connection(engine, stream).await {
                    warn!(peer = %peer, error = %e, "connection handler error");
                }
                info!(peer = %peer, "client disconnected");
                drop(permit);
            });
        }
    }
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
}

async fn handle_connection(engine: Arc<ExecutionEngine>, stream: TcpStream) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut session = Session::new();
    let mut format = OutputFormat::Table;

    send_reply(&mut writer, WELCOME).await?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        let reply = match command.to_ascii_lowercase().as_str() {
            "exit" | ".quit" | ".exit" => {
                send_reply(&mut writer, "Goodbye!").await?;
                break;
            }
            ".mode json" => {
                format = OutputFormat::Json;
                "Output mode set to JSON".to_string()
            }
            ".mode table" => {
                format = OutputFormat::Table;
                "Output mode set to Table".to_string()
            }
            meta if meta.starts_with('.') => format!("Unknown command: {}", command),
            _ => match engine.execute(&mut session, command).await {
                Ok(result) => format_result(&result, format),
                Err(e) => {
                    warn!(error = %e, kind = ?e.kind(), "command failed");
                    format_error(&e, format)
                }
            },
        };

        send_reply(&mut writer, &reply).await?;
    }

    Ok(())
}

async fn send_reply(writer: &mut OwnedWriteHalf, reply: &str) -> Result<()> {
    writer.write_all(reply.trim_end().as_bytes()).await?;
    writer.write_all(b"\n\n").await?;
    writer.flush().await?;
    Ok(())
}

fn format_error(err: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({
            "status": "error",
            "kind": format!("{:?}", err.kind()),
            "message": err.to_string(),
        })
        .to_string(),
        OutputFormat::Table => format!("Error ({:?}): {}", err.kind(), err),
    }
}

/// Render a query result for the client
pub fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return serde_json::json!({
            "status": "success",
            "columns": result.columns,
            "rows": result.rows,
            "affected_rows": result.affected_rows,
            "message": result.message,
        })
        .to_string();
    }

    if result.rows.is_empty() {
        return match &result.message {
            Some(msg) => msg.clone(),
            None if result.affected_rows > 0 => {
                format!("{} row(s) affected", result.affected_rows)
            }
            None => "OK".to_string(),
        };
    }

    format_table(&result.columns, &result.rows)
}

/// ASCII table with a row count footer
fn format_table(columns: &[String], rows: &[Vec<Value>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(value.to_string().chars().count());
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<String>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<String>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    for row in rows {
        let row_str: String = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:>width$} ", v.to_string(), width = *w))
            .collect::<Vec<String>>()
            .join("|");
        output.push_str(&format!("|{}|\n", row_str));
    }
    output.push_str(&separator);

    output.push_str(&format!("{} row(s) returned", rows.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config() {
        let config = ServerConfig::new().host("0.0.0.0").port(5500).data_dir("/tmp/d");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5500);
        assert_eq!(config.bind_address(), "0.0.0.0:5500");
        assert_eq!(config.catalog_path(), PathBuf::from("/tmp/d/catalog.json"));
    }

    #[test]
    fn test_config_from_args() {
        let config = ServerConfig::from_args(["-p", "9000", "--data-dir", "data", "--max-connections", "4"])
            .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.max_connections, 4);
        assert_eq!(ServerConfig::from_args(Vec::<String>::new()).unwrap().port, DEFAULT_PORT);

        assert!(ServerConfig::from_args(["--port"]).is_err());
        assert!(ServerConfig::from_args(["--port", "http"]).is_err());
        assert!(ServerConfig::from_args(["--max-connections", "0"]).is_err());
        assert!(ServerConfig::from_args(["--verbose"]).is_err());
    }

    #[test]
    fn test_connection_url() {
        let url = ConnectionUrl::parse("docrel://localhost:9000").unwrap();
        assert_eq!(url.host, "localhost");
        assert_eq!(url.port, 9000);
        assert_eq!(url.address(), "localhost:9000");

        let url = ConnectionUrl::parse("docrel://db.internal/").unwrap();
        assert_eq!(url.port, DEFAULT_PORT);

        assert!(ConnectionUrl::parse("localhost:9000").is_err());
        assert!(ConnectionUrl::parse("http://localhost").is_err());
        assert!(ConnectionUrl::parse("docrel://:9000").is_err());
    }

    #[test]
    fn test_format_message() {
        let result = QueryResult::with_message("Table Students created");
        assert_eq!(format_result(&result, OutputFormat::Table), "Table Students created");
    }

    #[test]
    fn test_format_table() {
        let result = QueryResult::with_rows(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![Value::Integer(1), Value::from("Ann")]],
        );
        let output = format_result(&result, OutputFormat::Table);
        assert!(output.starts_with("+----+------+\n| id | name |\n"));
        assert!(output.contains("|  1 |  Ann |"));
        assert!(output.ends_with("1 row(s) returned"));
    }

    #[test]
    fn test_format_json() {
        let result = QueryResult::with_rows(
            vec!["id".to_string()],
            vec![vec![Value::Integer(1)], vec![Value::Null]],
        );
        let output = format_result(&result, OutputFormat::Json);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["rows"], serde_json::json!([[1], [null]]));

        let err = format_error(&Error::RowNotFound, OutputFormat::Json);
        let json: serde_json::Value = serde_json::from_str(&err).unwrap();
        assert_eq!(json["kind"], "Constraint");
    }
}
