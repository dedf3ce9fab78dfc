use async_trait::async_trait;

use super::{ChatResult, Search, Transcribe};
use crate::types::SearchResult;

pub const DEMO_TRANSCRIPTION: &str = "This is a simulated voice transcription.";

/// Canned results that echo the query back.
#[derive(Default)]
pub struct DemoSearch;

#[async_trait]
impl Search for DemoSearch {
    async fn search(&self, query: &str) -> ChatResult<Vec<SearchResult>> {
        let snippets = [
            format!("This is a sample search result about {query}"),
            format!("Another example result related to {query}"),
            format!("More information about {query}"),
        ];
        Ok(snippets
            .into_iter()
            .enumerate()
            .map(|(i, snippet)| SearchResult {
                title: format!("Search Result {}", i + 1),
                url: format!("https://example.com/{}", i + 1),
                snippet,
            })
            .collect())
    }
}

#[derive(Default)]
pub struct DemoTranscriber;

#[async_trait]
impl Transcribe for DemoTranscriber {
    async fn transcribe(&self, _audio: Vec<u8>) -> ChatResult<String> {
        Ok(DEMO_TRANSCRIPTION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_echoes_query() {
        let results = DemoSearch.search("rust").await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Search Result 1");
        assert_eq!(results[2].url, "https://example.com/3");
        assert!(results.iter().all(|r| r.snippet.contains("rust")));
    }

    #[tokio::test]
    async fn transcription_is_static() {
        let text = DemoTranscriber.transcribe(vec![0; 16]).await.unwrap();
        assert_eq!(text, DEMO_TRANSCRIPTION);
    }
}
