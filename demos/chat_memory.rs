//! Chat client example using the in-memory transport.
//!
//! A scripted peer answers requests and pushes events, so the whole
//! conversation runs in one process.
//!
//! Run with: RUST_LOG=debug cargo run --example chat_memory

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use muxwire::{create_memory_transport, ClientBuilder, JsonMessageSerializer, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

#[derive(Debug, Serialize, Deserialize)]
struct Login {
    email: String,
    password: String,
}

muxwire::impl_message!(Login, "security login");

#[derive(Debug, Deserialize)]
struct Session {
    user: String,
    token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Chat {
    group: u32,
    text: String,
}

muxwire::impl_message!(Chat, "message send");

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let (transport, mut peer) = create_memory_transport("chat-server").await?;

    let client = ClientBuilder::new(transport)
        .client_id("demo-bot")
        .request_timeout(Duration::from_secs(5))
        .serializer("security login", Arc::new(JsonMessageSerializer::<Login>::new()))
        .serializer("message send", Arc::new(JsonMessageSerializer::<Chat>::new()))
        .build()
        .await?;

    let mut inbox = client.subscribe_messages();

    // Scripted server: acknowledge the login, then echo one chat line back
    // as an event.
    let server = tokio::spawn(async move {
        // ---
        let login = peer.next_sent().await.expect("no login");
        peer.respond(
            login.frame_id,
            json!([{ "user": "demo-bot", "headers": { "token": "abc123" } }]),
        )
        .await?;

        let chat = peer.next_sent().await.expect("no chat");
        peer.emit("message send", chat.frame.envelope.payload).await
    });

    let session: Session = client
        .request(&Login {
            email: "bot@example.com".into(),
            password: "hunter2".into(),
        })
        .await?;
    println!("logged in as {} (token {})", session.user, session.token);

    client
        .emit(&Chat {
            group: 18,
            text: "hello from muxwire".into(),
        })
        .await?;

    let echoed = inbox.recv().await.expect("inbox closed");
    if let Some(chat) = echoed.downcast_ref::<Chat>() {
        println!("group {}: {}", chat.group, chat.text);
    }

    server.await.expect("server task panicked")?;
    client.disconnect().await?;
    Ok(())
}
