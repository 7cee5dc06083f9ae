//! docrel - CLI Client
//!
//! Forwards each entered line to a docrel server and prints the reply.

use anyhow::Context;
use docrel::server::{ConnectionUrl, DEFAULT_PORT};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;

/// Print help message
fn print_help() {
    println!(
        r#"
Client commands:
  .help                      Show this help message
  .quit                      Exit (also: exit)
  .mode json|table           Switch the server's output format

Commands:
  create database <db>       use <db>             drop database <db>
  list databases             list tables
  create table <t> <col> <type> [len] [primary|unique|foreign=<t>.<col>], ...
  create [unique] index <i> on <t> <col>[, <col>...]
  drop table <t>
  insert into <t> <col>=<value>, ...
  delete from <t> where <key col>=<value> [and ...]
  select [distinct] <items> from <t> [alias] [join ...] [where ...]
         [group by ...] [having ...] [order by ... [asc|desc]]

Example:
  create table Students id int primary, name varchar 20
  insert into Students id=1, name='Ann'
  select * from Students where id = 1
"#
    );
}

/// Read one reply: every line up to the terminating empty line
async fn read_reply(reader: &mut BufReader<OwnedReadHalf>) -> anyhow::Result<Option<String>> {
    let mut reply = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(if reply.is_empty() { None } else { Some(reply) });
        }
        if line.trim_end().is_empty() {
            return Ok(Some(reply));
        }
        reply.push_str(&line);
    }
}

fn server_address() -> anyhow::Result<String> {
    match std::env::args().nth(1) {
        Some(url) => Ok(ConnectionUrl::parse(&url)?.address()),
        None => Ok(format!("127.0.0.1:{}", DEFAULT_PORT)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let address = server_address()?;
    let stream = TcpStream::connect(&address)
        .await
        .with_context(|| format!("cannot connect to {}", address))?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    if let Some(welcome) = read_reply(&mut reader).await? {
        print!("{}", welcome);
    }
    println!("Type '.help' for help, '.quit' to exit\n");

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("docrel> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(command);

        if command == ".help" {
            print_help();
            continue;
        }

        writer.write_all(command.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        match read_reply(&mut reader).await? {
            Some(reply) => print!("{}", reply),
            None => {
                println!("Connection closed by server");
                break;
            }
        }

        if matches!(command.to_ascii_lowercase().as_str(), "exit" | ".quit" | ".exit") {
            break;
        }
    }

    Ok(())
}
