// tests/client_retry_test.rs

use tg_leech::client::RobustClient;
use tg_leech::config::AppConfig;
use tempfile::tempdir;

#[tokio::test(flavor = "multi_thread")]
async fn test_client_retries_transient_errors() {
    let mut server = mockito::Server::new_async().await;
    let server_url = server.url();

    // first request rate limited, the retry succeeds
    let mock_429 = server
        .mock("GET", "/test")
        .with_status(429)
        .with_header("Retry-After", "1")
        .with_body("Rate limited!")
        .expect(1)
        .create_async()
        .await;
    let mock_200 = server
        .mock("GET", "/test")
        .with_status(200)
        .with_body("Success!")
        .create_async()
        .await;

    // default test config allows one retry
    let client = RobustClient::new(&AppConfig::default()).expect("Failed to create client");
    let response = client
        .get(format!("{}/test", server_url))
        .await
        .expect("Request should eventually succeed");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Success!");
    mock_429.assert_async().await;
    mock_200.assert_async().await;
}

#[tokio::test]
async fn test_download_to_streams_body_and_reports_progress() {
    let mut server = mockito::Server::new_async().await;
    let body = vec![7u8; 64 * 1024];
    let mock = server
        .mock("GET", "/file.bin")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;

    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("file.bin");
    let client = RobustClient::new(&AppConfig::default()).unwrap();
    let mut last = 0;
    let written = client
        .download_to(format!("{}/file.bin", server.url()), &dest, |n| last = n)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(written, body.len() as u64);
    assert_eq!(last, written);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_body_outlives_timeout_while_data_keeps_flowing() {
    use std::io::Write;
    use std::time::Duration;

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/slow.bin")
        .with_status(200)
        .with_chunked_body(|w| {
            for _ in 0..3 {
                w.write_all(&[1u8; 1024])?;
                w.flush()?;
                std::thread::sleep(Duration::from_millis(600));
            }
            Ok(())
        })
        .create_async()
        .await;

    // the whole body takes about 1.8 s, no gap reaches the 1 s limit
    let mut config = AppConfig::default();
    config.timeout = Duration::from_secs(1);
    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("slow.bin");
    let client = RobustClient::new(&config).unwrap();
    let written = client
        .download_to(format!("{}/slow.bin", server.url()), &dest, |_| {})
        .await
        .expect("a steady body is never cut off by the total time");

    mock.assert_async().await;
    assert_eq!(written, 3 * 1024);
}
