//! Server-side view of the bot under test.
//!
//! Reads what the bot writes and plays the server's half of the
//! conversation.

use slirc_bot::Message;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// One accepted bot connection.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        }
    }

    /// Send a raw line to the bot.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single message from the bot.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a message with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("bot closed the connection");
        }

        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {}", e))
    }

    /// Receive messages until one with `command` arrives, returning it.
    pub async fn expect(&mut self, command: &str) -> anyhow::Result<Message> {
        loop {
            let msg = self.recv().await?;
            if msg.is_command(command) {
                return Ok(msg);
            }
        }
    }

    /// Read the bot's USER and NICK, returning the nickname.
    pub async fn read_registration(&mut self) -> anyhow::Result<String> {
        let user = self.recv().await?;
        anyhow::ensure!(user.is_command("USER"), "expected USER, got {user}");
        let nick = self.recv().await?;
        anyhow::ensure!(nick.is_command("NICK"), "expected NICK, got {nick}");
        Ok(nick.arg(0).unwrap_or_default().to_string())
    }

    /// Welcome burst ending in end-of-MOTD.
    pub async fn welcome(&mut self, nick: &str) -> anyhow::Result<()> {
        self.send_raw(&format!(":irc.test 001 {nick} :Welcome to the test network"))
            .await?;
        self.send_raw(&format!(":irc.test 375 {nick} :- irc.test Message of the day -"))
            .await?;
        self.send_raw(&format!(":irc.test 372 {nick} :- hello"))
            .await?;
        self.send_raw(&format!(":irc.test 376 {nick} :End of /MOTD command."))
            .await
    }

    /// Full happy-path registration.
    pub async fn register(&mut self) -> anyhow::Result<String> {
        let nick = self.read_registration().await?;
        self.welcome(&nick).await?;
        Ok(nick)
    }
}
