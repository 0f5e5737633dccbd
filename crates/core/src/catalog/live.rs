use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    config::ApiConfig,
    error::FetchError,
    models::{Game, Page, Screenshot},
};

use super::source::{CatalogSource, GameQuery};

/// HTTP client for the public game catalog.
#[derive(Debug, Clone)]
pub struct LiveCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LiveCatalog {
    /// Create a client from the `[api]` configuration.
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.key.clone(),
        }
    }

    fn query_pairs(&self, query: &GameQuery) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("key", self.api_key.clone()),
            ("page_size", query.page_size.to_string()),
        ];
        if let Some(genre) = &query.genre {
            pairs.push(("genres", genre.clone()));
        }
        if let Some(ordering) = &query.ordering {
            pairs.push(("ordering", ordering.clone()));
        }
        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                pairs.push(("search", search.to_string()));
            }
        }
        pairs
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        pairs: &[(&'static str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "catalog request");
        let response = self.client.get(&url).query(pairs).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            debug!(%url, status = status.as_u16(), %body, "catalog request failed");
            return Err(FetchError::http(status.as_u16(), &body));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CatalogSource for LiveCatalog {
    async fn list_games(&self, query: &GameQuery) -> Result<Vec<Game>, FetchError> {
        let page: Page<Game> = self.get("/games", &self.query_pairs(query)).await?;
        Ok(page.results)
    }

    async fn game_details(&self, id: i64) -> Result<Game, FetchError> {
        let pairs = [("key", self.api_key.clone())];
        self.get(&format!("/games/{id}"), &pairs).await
    }

    async fn screenshots(&self, id: i64) -> Result<Vec<Screenshot>, FetchError> {
        let pairs = [("key", self.api_key.clone())];
        let page: Page<Screenshot> = self.get(&format!("/games/{id}/screenshots"), &pairs).await?;
        Ok(page.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LiveCatalog {
        LiveCatalog::new(&ApiConfig {
            base_url: "https://api.example.com/api/".to_string(),
            key: "k".to_string(),
            page_size: 20,
        })
    }

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(catalog().base_url, "https://api.example.com/api");
    }

    #[test]
    fn builds_query_pairs() {
        let mut query = GameQuery::genre("action", 12);
        query.ordering = Some("-rating".to_string());
        query.search = Some("   ".to_string());
        let pairs = catalog().query_pairs(&query);
        assert_eq!(
            pairs,
            vec![
                ("key", "k".to_string()),
                ("page_size", "12".to_string()),
                ("genres", "action".to_string()),
                ("ordering", "-rating".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn error_pages_arrive_as_short_excerpts() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            let body = format!("<html>\n<body>\n{}</body>\n</html>", "Not found. ".repeat(100));
            let response = format!(
                "HTTP/1.1 404 Not Found\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        let catalog = LiveCatalog::new(&ApiConfig {
            base_url: format!("http://{addr}"),
            key: "k".to_string(),
            page_size: 1,
        });
        let err = catalog.game_details(1).await.unwrap_err();
        server.join().unwrap();

        let FetchError::Http { status, body } = err else {
            panic!("expected an HTTP error");
        };
        assert_eq!(status, 404);
        assert!(body.starts_with("<html> <body> Not found."));
        assert!(!body.contains('\n'));
        assert_eq!(
            body.chars().count(),
            crate::error::BODY_EXCERPT_CHARS + 1
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_connectivity_failure() {
        let catalog = LiveCatalog::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            key: "k".to_string(),
            page_size: 1,
        });
        let err = catalog
            .list_games(&GameQuery::ordered("-added", 1))
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                FetchError::ConnectionRefused(_) | FetchError::UnresolvedHost(_)
            ),
            "unexpected error: {err:?}"
        );
    }
}
