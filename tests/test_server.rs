//! Server tests: start a server on an ephemeral port and talk to it over TCP.

use docrel::catalog::Catalog;
use docrel::executor::ExecutionEngine;
use docrel::server::{Server, ServerConfig, WELCOME};
use docrel::storage::MemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, Duration};

async fn start_test_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let engine = ExecutionEngine::new(Arc::new(Catalog::in_memory()), Arc::new(MemoryStore::new()));
    let server = Server::new(ServerConfig::new().max_connections(4), Arc::new(engine));
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    sleep(Duration::from_millis(50)).await;
    address
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(address: SocketAddr) -> (Self, String) {
        let stream = TcpStream::connect(address).await.unwrap();
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
        };
        let welcome = client.reply().await;
        (client, welcome)
    }

    async fn reply(&mut self) -> String {
        let mut reply = String::new();
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await.unwrap() == 0 || line.trim_end().is_empty() {
                return reply.trim_end().to_string();
            }
            reply.push_str(&line);
        }
    }

    async fn send(&mut self, command: &str) -> String {
        self.writer
            .write_all(format!("{}\n", command).as_bytes())
            .await
            .unwrap();
        self.reply().await
    }
}

#[tokio::test]
async fn test_commands_over_tcp() {
    let address = start_test_server().await;
    let (mut client, welcome) = Client::connect(address).await;
    assert_eq!(welcome, WELCOME);

    assert_eq!(client.send("create database School").await, "Database School created");
    assert_eq!(client.send("use School").await, "Using database School");
    assert_eq!(
        client
            .send("create table Students id int primary, name varchar 20")
            .await,
        "Table Students created"
    );
    assert_eq!(
        client.send("insert into Students id=1, name='Ann'").await,
        "Inserted into table Students"
    );

    let table = client.send("select * from Students").await;
    assert!(table.contains("| id | name |"), "{}", table);
    assert!(table.ends_with("1 row(s) returned"), "{}", table);

    let error = client.send("select nope from Students").await;
    assert!(error.starts_with("Error (Validation):"), "{}", error);

    assert_eq!(client.send(".mode json").await, "Output mode set to JSON");
    let json: serde_json::Value =
        serde_json::from_str(&client.send("select name from Students where id = 1").await).unwrap();
    assert_eq!(json["columns"], serde_json::json!(["name"]));
    assert_eq!(json["rows"], serde_json::json!([["Ann"]]));

    assert_eq!(client.send("exit").await, "Goodbye!");
}

#[tokio::test]
async fn test_sessions_are_per_connection() {
    let address = start_test_server().await;
    let (mut first, _) = Client::connect(address).await;
    let (mut second, _) = Client::connect(address).await;

    first.send("create database Shared").await;
    assert_eq!(first.send("use Shared").await, "Using database Shared");

    let reply = second.send("list tables").await;
    assert!(reply.contains("No database selected"), "{}", reply);
    assert_eq!(second.send("list databases").await, "Databases:\nShared");
}
