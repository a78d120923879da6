use super::pb::chat_client::ChatClient;
use super::pb::random_numbers_client::RandomNumbersClient;
use super::pb::random_numbers_server::RandomNumbers;
use super::pb::{ChatMessage, GetRandomNumbersRequest, SendRandomNumbersRequest};
use super::*;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::{Code, Request};

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        routes()
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

fn chat_message(username: &str, message: &str) -> ChatMessage {
    ChatMessage {
        username: username.to_string(),
        message: message.to_string(),
    }
}

#[tokio::test]
async fn test_get_random_numbers_streams_within_range() {
    let mut client = RandomNumbersClient::connect(start_server().await).await.unwrap();
    let request = GetRandomNumbersRequest {
        min: -3,
        max: 3,
        count: 50,
    };

    let mut stream = client.get_random_numbers(request).await.unwrap().into_inner();
    let mut numbers = Vec::new();
    while let Some(response) = stream.message().await.unwrap() {
        numbers.push(response.number);
    }

    assert_eq!(numbers.len(), 50);
    assert!(numbers.iter().all(|n| (-3..=3).contains(n)));
}

#[tokio::test]
async fn test_get_random_numbers_validates_request() {
    let service = RandomNumberService;

    let backwards = GetRandomNumbersRequest {
        min: 10,
        max: 1,
        count: 1,
    };
    let status = service
        .get_random_numbers(Request::new(backwards))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    for count in [-1, random::MAX_COUNT + 1] {
        let request = GetRandomNumbersRequest { min: 0, max: 1, count };
        let status = service.get_random_numbers(Request::new(request)).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    // a single value range is fine
    let fixed = GetRandomNumbersRequest {
        min: 7,
        max: 7,
        count: 3,
    };
    assert!(service.get_random_numbers(Request::new(fixed)).await.is_ok());
}

#[tokio::test]
async fn test_send_random_numbers_sums_stream() {
    let mut client = RandomNumbersClient::connect(start_server().await).await.unwrap();
    let numbers = [4, 8, 15, 16, 23, 42]
        .into_iter()
        .map(|number| SendRandomNumbersRequest { number });

    let summary = client
        .send_random_numbers(tokio_stream::iter(numbers))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(summary.count, 6);
    assert_eq!(summary.sum, 108);

    let empty = client
        .send_random_numbers(tokio_stream::iter(Vec::<SendRandomNumbersRequest>::new()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!((empty.count, empty.sum), (0, 0));
}

#[tokio::test]
async fn test_send_random_numbers_rejects_overflow() {
    let mut client = RandomNumbersClient::connect(start_server().await).await.unwrap();
    let numbers = vec![
        SendRandomNumbersRequest { number: i32::MAX },
        SendRandomNumbersRequest { number: 1 },
    ];

    let status = client
        .send_random_numbers(tokio_stream::iter(numbers))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::OutOfRange);
}

#[tokio::test]
async fn test_chat_relays_messages_to_every_client() {
    let server = start_server().await;
    let mut ada = ChatClient::connect(server.clone()).await.unwrap();
    let mut bob = ChatClient::connect(server).await.unwrap();

    let (ada_tx, ada_rx) = mpsc::channel(4);
    let (_bob_tx, bob_rx) = mpsc::channel::<ChatMessage>(4);
    let mut ada_inbox = ada.send_message(ReceiverStream::new(ada_rx)).await.unwrap().into_inner();
    let mut bob_inbox = bob.send_message(ReceiverStream::new(bob_rx)).await.unwrap().into_inner();

    let hello = chat_message("ada", "hello bob");
    ada_tx.send(hello.clone()).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), bob_inbox.message())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, Some(hello.clone()));

    let echoed = tokio::time::timeout(Duration::from_secs(5), ada_inbox.message())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echoed, Some(hello));
}

#[tokio::test]
async fn test_chat_listener_stays_connected_after_it_stops_sending() {
    let server = start_server().await;
    let mut ada = ChatClient::connect(server.clone()).await.unwrap();
    let mut bob = ChatClient::connect(server).await.unwrap();

    // bob only listens
    let mut bob_inbox = bob
        .send_message(tokio_stream::iter(Vec::<ChatMessage>::new()))
        .await
        .unwrap()
        .into_inner();

    let (ada_tx, ada_rx) = mpsc::channel(4);
    let _ada_inbox = ada.send_message(ReceiverStream::new(ada_rx)).await.unwrap();
    ada_tx.send(chat_message("ada", "anyone there?")).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), bob_inbox.message())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(received.message, "anyone there?");
}
