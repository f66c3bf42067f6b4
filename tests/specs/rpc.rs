//! Wire-level JSON-RPC scenarios over a served connection.

use crate::prelude::*;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;

async fn converse(lines: Vec<String>) -> Vec<Value> {
    let ctx = memory_server().await;
    let (mut client_out, server_in) = tokio::io::duplex(64 * 1024);
    let (server_out, client_in) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(async move {
        let _ = masc_daemon::server::serve_connection(ctx, server_in, server_out).await;
    });

    for line in lines {
        client_out.write_all(line.as_bytes()).await.unwrap();
        client_out.write_all(b"\n").await.unwrap();
    }
    drop(client_out);
    server.await.unwrap();

    let mut reader = tokio::io::BufReader::new(client_in);
    let mut mode = None;
    let mut responses = Vec::new();
    while let Ok(Some(frame)) =
        masc_daemon::rpc::framing::read_frame(&mut reader, &mut mode).await
    {
        responses.push(serde_json::from_str(&frame).unwrap());
    }
    responses
}

#[tokio::test]
async fn initialize_join_claim_conversation() {
    let responses = converse(vec![
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "clientInfo": { "name": "spec", "version": "1" },
                "capabilities": {}
            }
        })
        .to_string(),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": { "name": "join", "arguments": { "agent_name": "spec" } }
        })
        .to_string(),
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "add_task", "arguments": { "agent_name": "spec", "title": "t" } }
        })
        .to_string(),
        json!({ "jsonrpc": "2.0", "id": 4, "method": "resources/list" }).to_string(),
    ])
    .await;

    // Four answers for five inputs: the notification is silent.
    // Requests are served concurrently, so match responses by id.
    assert_eq!(responses.len(), 4);
    assert!(responses
        .iter()
        .all(|r| r["jsonrpc"] == "2.0" && r.get("error").is_none()));
    let by_id = |id: u64| {
        responses
            .iter()
            .find(|r| r["id"] == id)
            .unwrap_or_else(|| panic!("no response with id {id}"))
            .clone()
    };

    let add = by_id(3)["result"].clone();
    assert_eq!(add["isError"], false);
    let body: Value =
        serde_json::from_str(add["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(body["task"]["id"], "T1");

    let resources = by_id(4)["result"]["resources"].as_array().unwrap().clone();
    assert!(resources.iter().any(|r| r["uri"] == "masc://tasks"));
}

#[tokio::test]
async fn malformed_and_unknown_requests_get_spec_codes() {
    let responses = converse(vec![
        "{broken".to_string(),
        json!({ "id": 1, "method": "tools/list" }).to_string(),
        json!({ "jsonrpc": "2.0", "id": 2, "method": "nope" }).to_string(),
    ])
    .await;

    let codes: Vec<i64> = responses
        .iter()
        .map(|r| r["error"]["code"].as_i64().unwrap())
        .collect();
    assert!(codes.contains(&-32700));
    assert!(codes.contains(&-32600));
    assert!(codes.contains(&-32601));
}

#[tokio::test]
async fn resources_read_over_the_wire() {
    let responses = converse(vec![json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "resources/read",
        "params": { "uri": "masc://status" }
    })
    .to_string()])
    .await;

    let contents = responses[0]["result"]["contents"].as_array().unwrap();
    assert_eq!(contents[0]["mimeType"], "application/json");
}
