// src/client.rs

use crate::{config::AppConfig, error::*};
use futures::StreamExt;
use log::debug;
use reqwest::{IntoUrl, Response, header};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::{path::Path, time::Duration};
use tokio::{fs::File, io::AsyncWriteExt};

#[derive(Clone)]
pub struct RobustClient {
    pub client: ClientWithMiddleware,
    request_timeout: Duration,
}

impl RobustClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let inner = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            // bodies may stream for hours, only a stalled read is fatal
            .read_timeout(config.timeout)
            .build()?;
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            request_timeout: config.timeout,
        })
    }

    pub async fn get<T: IntoUrl>(&self, url: T) -> AppResult<Response> {
        let res = self.client.get(url).send().await?;
        Ok(res.error_for_status()?)
    }

    /// HEAD request bounded by the whole-request timeout.
    pub async fn head<T: IntoUrl>(&self, url: T) -> AppResult<Response> {
        let res = self
            .client
            .head(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(res.error_for_status()?)
    }

    /// `Content-Length` from a HEAD request, if the server reports one.
    pub async fn content_length<T: IntoUrl>(&self, url: T) -> AppResult<Option<u64>> {
        let res = self.head(url).await?;
        Ok(res
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok()))
    }

    /// Streams a response body into `dest`, calling `on_chunk` with the running byte count.
    pub async fn download_to<T, F>(&self, url: T, dest: &Path, on_chunk: F) -> AppResult<u64>
    where
        T: IntoUrl,
        F: FnMut(u64),
    {
        let res = self.get(url).await?;
        Self::write_body(res, dest, on_chunk).await
    }

    /// Writes the body of an already-sent request into `dest`.
    pub async fn write_body<F>(res: Response, dest: &Path, mut on_chunk: F) -> AppResult<u64>
    where
        F: FnMut(u64),
    {
        let mut file = File::create(dest).await?;
        let mut written = 0u64;
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            on_chunk(written);
        }
        file.flush().await?;
        debug!("Wrote {} bytes to {}", written, dest.display());
        Ok(written)
    }
}
