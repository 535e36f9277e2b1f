//! Integration tests — login handshake and verb round-trips over a real
//! TCP connection against an in-process server speaking the wire
//! protocol.

use std::collections::HashMap;
use std::time::Duration;

use aspike::{
    AdminCommand, AdminField, AdminFieldType, AdminMessage, AspikeClient, AspikeError, Bin, Body,
    FieldType, Frame, FrameHeader, HEADER_SIZE, Info1Flags, Info2Flags, Info3Flags, Message,
    Operation, OperationType, Value, result_code,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const NAMESPACE: &str = "test";

// ── Mock server ──────────────────────────────────────────────────

type Records = HashMap<Vec<u8>, HashMap<String, Value>>;

async fn read_frame(stream: &mut TcpStream) -> Option<Frame> {
    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header).await.ok()?;
    let parsed = FrameHeader::from_bytes(&header).unwrap();

    let mut frame_bytes = header.to_vec();
    frame_bytes.resize(HEADER_SIZE + parsed.length() as usize, 0);
    stream.read_exact(&mut frame_bytes[HEADER_SIZE..]).await.ok()?;
    Some(Frame::from_bytes(&frame_bytes).unwrap())
}

fn handle_admin(request: AdminMessage) -> AdminMessage {
    assert_eq!(request.command, AdminCommand::Login);
    AdminMessage::new(
        AdminCommand::Login,
        vec![AdminField::new(
            AdminFieldType::SessionToken,
            b"st-0001".to_vec(),
        )],
    )
}

fn empty_response() -> Message {
    Message {
        info1: Info1Flags::empty(),
        info2: Info2Flags::empty(),
        info3: Info3Flags::empty(),
        result_code: result_code::OK,
        generation: 1,
        record_ttl: 0,
        transaction_ttl: 0,
        fields: Vec::new(),
        operations: Vec::new(),
    }
}

/// Apply one operation message to the record store, the way the real
/// server would resolve it: records addressed by digest, operations in
/// request order, one Read response operation per bin read.
fn handle_message(request: Message, records: &mut Records) -> Message {
    let digest = request
        .fields
        .iter()
        .find(|field| field.field_type == FieldType::Digest)
        .expect("request without a digest field")
        .data
        .clone();

    let mut response = empty_response();

    if request.info2.contains(Info2Flags::DELETE) {
        response.result_code = match records.remove(&digest) {
            Some(_) => result_code::OK,
            None => result_code::KEY_NOT_FOUND,
        };
        return response;
    }

    if request.info1.contains(Info1Flags::DONT_GET_BIN_DATA) {
        response.result_code = if records.contains_key(&digest) {
            result_code::OK
        } else {
            result_code::KEY_NOT_FOUND
        };
        return response;
    }

    let is_write = request.info2.contains(Info2Flags::WRITE);
    if !is_write && !records.contains_key(&digest) {
        response.result_code = result_code::KEY_NOT_FOUND;
        return response;
    }
    let record = records.entry(digest).or_default();

    for operation in &request.operations {
        match operation.operation_type {
            OperationType::Write => {
                record.insert(operation.bin.name.clone(), operation.bin.value.clone());
            }
            OperationType::Read => {
                let value = record
                    .get(&operation.bin.name)
                    .cloned()
                    .unwrap_or(Value::Nil);
                response.operations.push(Operation::new(
                    OperationType::Read,
                    Bin::new(operation.bin.name.clone(), value).unwrap(),
                ));
            }
            _ => {}
        }
    }

    // A plain get carries no operations; answer with every populated bin.
    if request.info1.contains(Info1Flags::GET_ALL) && request.operations.is_empty() {
        for (name, value) in record.iter() {
            response.operations.push(Operation::new(
                OperationType::Read,
                Bin::new(name.clone(), value.clone()).unwrap(),
            ));
        }
    }

    response
}

async fn serve_connection(mut stream: TcpStream) {
    let mut records = Records::new();
    while let Some(frame) = read_frame(&mut stream).await {
        let reply = match frame.into_body() {
            Body::Admin(admin) => Frame::admin(handle_admin(admin)),
            Body::Message(message) => Frame::message(handle_message(message, &mut records)),
        };
        stream.write_all(&reply.to_bytes().unwrap()).await.unwrap();
    }
}

/// Spin up a server on an OS-assigned port and return the port.
async fn spawn_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve_connection(stream));
        }
    });
    port
}

/// A server that completes the login handshake but never answers verbs.
async fn spawn_silent_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                while let Some(frame) = read_frame(&mut stream).await {
                    if let Body::Admin(admin) = frame.into_body() {
                        let reply = Frame::admin(handle_admin(admin));
                        stream.write_all(&reply.to_bytes().unwrap()).await.unwrap();
                    }
                    // Message frames are swallowed.
                }
            });
        }
    });
    port
}

async fn connected_client(port: u16) -> AspikeClient {
    let mut client = AspikeClient::new("127.0.0.1", port, "admin", "admin", false);
    client.connect().await.unwrap();
    client
}

// ── Login ────────────────────────────────────────────────────────

#[tokio::test]
async fn login_retains_session_token() {
    let port = spawn_server().await;
    let client = connected_client(port).await;
    assert!(client.is_connected());
    assert_eq!(client.session_token(), Some(b"st-0001".as_slice()));
}

// ── Verb round-trips ─────────────────────────────────────────────

#[tokio::test]
async fn put_and_get_string_bin() {
    let port = spawn_server().await;
    let mut client = connected_client(port).await;

    client
        .put(NAMESPACE, "s1", "k1", vec![Bin::new("b", "v").unwrap()], 0)
        .await
        .unwrap();

    let record = client.get(NAMESPACE, "s1", "k1").await.unwrap();
    assert_eq!(
        record,
        HashMap::from([("b".to_string(), Value::from("v"))])
    );
}

#[tokio::test]
async fn put_and_get_with_non_string_keys() {
    let port = spawn_server().await;
    let mut client = connected_client(port).await;

    let keys: [Value; 3] = [
        Value::from(b"abc".as_slice()),
        Value::from(300u64),
        Value::from(123.125f64),
    ];
    for key in keys {
        client
            .put(
                NAMESPACE,
                "s2",
                key.clone(),
                vec![Bin::new("n", "v").unwrap()],
                0,
            )
            .await
            .unwrap();
        let record = client.get(NAMESPACE, "s2", key).await.unwrap();
        assert_eq!(record.get("n"), Some(&Value::from("v")));
    }

    // The keys address distinct records: an integer 300 and the string
    // "300" digest differently.
    client
        .put(
            NAMESPACE,
            "s2",
            Value::from(300u64),
            vec![Bin::new("n", "int").unwrap()],
            0,
        )
        .await
        .unwrap();
    let record = client.get(NAMESPACE, "s2", "300").await.unwrap();
    assert!(record.is_empty());
}

#[tokio::test]
async fn delete_clears_record() {
    let port = spawn_server().await;
    let mut client = connected_client(port).await;

    client
        .put(NAMESPACE, "s3", "k", vec![Bin::new("d", "x").unwrap()], 0)
        .await
        .unwrap();
    assert_eq!(
        client.get(NAMESPACE, "s3", "k").await.unwrap().get("d"),
        Some(&Value::from("x"))
    );

    client.delete(NAMESPACE, "s3", "k").await.unwrap();
    assert!(client.get(NAMESPACE, "s3", "k").await.unwrap().is_empty());
}

#[tokio::test]
async fn exists_tracks_record_lifecycle() {
    let port = spawn_server().await;
    let mut client = connected_client(port).await;

    assert!(!client.exists(NAMESPACE, "s4", "k").await.unwrap());

    client
        .put(NAMESPACE, "s4", "k", vec![Bin::new("e", "1").unwrap()], 0)
        .await
        .unwrap();
    assert!(client.exists(NAMESPACE, "s4", "k").await.unwrap());
}

#[tokio::test]
async fn nested_container_roundtrips_through_server() {
    let port = spawn_server().await;
    let mut client = connected_client(port).await;

    // {1: {123.125: {b"k": ["a", "a"]}}}
    let value = Value::Map(vec![(
        Value::Integer(1),
        Value::Map(vec![(
            Value::Double(123.125),
            Value::Map(vec![(
                Value::from(b"k".as_slice()),
                Value::List(vec![Value::from("a"), Value::from("a")]),
            )]),
        )]),
    )]);

    client
        .put(
            NAMESPACE,
            "s5",
            "k",
            vec![Bin::new("b", value.clone()).unwrap()],
            0,
        )
        .await
        .unwrap();

    let record = client.get(NAMESPACE, "s5", "k").await.unwrap();
    assert_eq!(record.get("b"), Some(&value));
}

#[tokio::test]
async fn operate_composes_reads_and_writes() {
    let port = spawn_server().await;
    let mut client = connected_client(port).await;

    let response = client
        .operate(
            NAMESPACE,
            "s6",
            "test_key",
            Info1Flags::empty(),
            Info2Flags::WRITE,
            Info3Flags::empty(),
            vec![
                Operation::write("test_bin", 123123u64).unwrap(),
                Operation::write("test_bin2", "test_value").unwrap(),
            ],
            Vec::new(),
            0,
            0,
        )
        .await
        .unwrap();
    assert_eq!(response.result_code, result_code::OK);

    let response = client
        .operate(
            NAMESPACE,
            "s6",
            "test_key",
            Info1Flags::READ,
            Info2Flags::WRITE,
            Info3Flags::empty(),
            vec![
                Operation::write("test_bin", 9999u64).unwrap(),
                Operation::read("test_bin2").unwrap(),
                Operation::read("test_bin").unwrap(),
            ],
            Vec::new(),
            0,
            0,
        )
        .await
        .unwrap();

    let data: HashMap<String, Value> = response
        .operations
        .into_iter()
        .map(|op| (op.bin.name, op.bin.value))
        .collect();
    assert_eq!(data.get("test_bin"), Some(&Value::Integer(9999)));
    assert_eq!(data.get("test_bin2"), Some(&Value::from("test_value")));
}

// ── Failure modes ────────────────────────────────────────────────

#[tokio::test]
async fn aborted_exchange_poisons_the_connection() {
    let port = spawn_silent_server().await;
    let mut client = connected_client(port).await;

    // The server swallows the request; cancel the exchange mid-flight.
    let result =
        tokio::time::timeout(Duration::from_millis(50), client.get(NAMESPACE, "s", "k")).await;
    assert!(result.is_err(), "exchange should have timed out");

    let err = client.exists(NAMESPACE, "s", "k").await.unwrap_err();
    assert!(matches!(err, AspikeError::ConnectionPoisoned));

    // Reconnecting clears the poisoned state.
    client.connect().await.unwrap();
    assert!(client.is_connected());
}

#[tokio::test]
async fn server_closing_mid_exchange_surfaces_eof() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        // Complete the login, then hang up before the first verb reply.
        let (mut stream, _) = listener.accept().await.unwrap();
        if let Some(frame) = read_frame(&mut stream).await {
            if let Body::Admin(admin) = frame.into_body() {
                let reply = Frame::admin(handle_admin(admin));
                stream.write_all(&reply.to_bytes().unwrap()).await.unwrap();
            }
        }
        let _ = read_frame(&mut stream).await;
        drop(stream);
    });

    let mut client = connected_client(port).await;
    let err = client.get(NAMESPACE, "s", "k").await.unwrap_err();
    assert!(matches!(err, AspikeError::UnexpectedEof));
}
