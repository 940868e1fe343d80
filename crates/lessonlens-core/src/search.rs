//! Keyword search over scraped websites.
//!
//! A deliberately simple linear scan: every website visible to the caller is
//! scored by counting query-term occurrences in its chunks.
//!
//! # Scoring Algorithm
//!
//! 1. Resolve the visible websites exactly as listing does.
//! 2. Lowercase the query, split on whitespace, drop terms shorter than
//!    `min_token_chars` characters.
//! 3. For each chunk, count non-overlapping occurrences of every term in the
//!    lowercased chunk text; the sum is the chunk score.
//! 4. A website's relevance is the sum of its chunk scores. The chunk with
//!    the highest score (earliest wins a tie) provides the snippet.
//! 5. Websites with relevance 0 are dropped.
//! 6. Sort by relevance (desc) and truncate to `result_limit`.
//!
//! Search never fails: any problem resolving the candidate set is logged and
//! reported as a degraded [`QueryOutcome`].

use crate::access;
use crate::models::{ScrapedWebsite, Scope, SearchHit};
use crate::outcome::QueryOutcome;
use crate::store::Store;

/// Ranking parameters. The defaults are the product's contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Maximum number of hits returned.
    pub result_limit: usize,
    /// Characters of the best chunk kept in a hit, before the ellipsis.
    pub snippet_chars: usize,
    /// Query terms with fewer characters than this are ignored.
    pub min_token_chars: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            result_limit: 5,
            snippet_chars: 500,
            min_token_chars: 3,
        }
    }
}

/// A website together with its relevance and best-matching chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredWebsite<'a> {
    pub website: &'a ScrapedWebsite,
    pub score: u64,
    pub best_chunk: &'a str,
}

/// Search the websites visible to `caller` under `scope`.
pub async fn search_websites<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    query: &str,
    scope: &Scope,
    params: &SearchParams,
) -> QueryOutcome<SearchHit> {
    let visibility = match access::resolve_visibility(store, caller, scope).await {
        Ok(v) => v,
        Err(reason) => {
            tracing::debug!(?reason, %scope, "search degraded");
            return QueryOutcome::Degraded(reason);
        }
    };

    let websites = match store.list_websites(visibility).await {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!(error = %e, %scope, "search failed while loading websites");
            return QueryOutcome::failed(e);
        }
    };

    QueryOutcome::Items(rank(&websites, query, params))
}

/// Score, filter, sort, and truncate `websites` for `query`.
pub fn rank(websites: &[ScrapedWebsite], query: &str, params: &SearchParams) -> Vec<SearchHit> {
    let terms = tokenize(query, params.min_token_chars);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredWebsite<'_>> = websites
        .iter()
        .filter_map(|w| score_website(w, &terms))
        .collect();

    // Stable sort: equal scores keep their listing order (newest first).
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(params.result_limit);

    scored
        .into_iter()
        .map(|s| SearchHit {
            website_id: s.website.id.clone(),
            title: s.website.title.clone(),
            url: s.website.url.clone(),
            content: snippet(s.best_chunk, params.snippet_chars),
            relevance_score: s.score,
        })
        .collect()
}

/// Lowercase, split on whitespace, and keep terms of at least `min_chars` characters.
pub fn tokenize(query: &str, min_chars: usize) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() >= min_chars)
        .map(str::to_string)
        .collect()
}

/// Score one website. Returns `None` when no chunk matches any term.
pub fn score_website<'a>(website: &'a ScrapedWebsite, terms: &[String]) -> Option<ScoredWebsite<'a>> {
    let mut total = 0u64;
    let mut best: Option<(u64, &str)> = None;

    for chunk in &website.chunks {
        let chunk_score = score_chunk(chunk, terms);
        total += chunk_score;
        if chunk_score > 0 && best.map_or(true, |(s, _)| chunk_score > s) {
            best = Some((chunk_score, chunk.as_str()));
        }
    }

    let (_, best_chunk) = best?;
    Some(ScoredWebsite {
        website,
        score: total,
        best_chunk,
    })
}

/// Sum of non-overlapping occurrences of every term in the lowercased chunk.
pub fn score_chunk(chunk: &str, terms: &[String]) -> u64 {
    let lowered = chunk.to_lowercase();
    terms
        .iter()
        .map(|t| lowered.matches(t.as_str()).count() as u64)
        .sum()
}

/// First `max_chars` characters of `chunk` followed by `"..."`.
pub fn snippet(chunk: &str, max_chars: usize) -> String {
    let mut s: String = chunk.chars().take(max_chars).collect();
    s.push_str("...");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MembershipStatus, NewWebsite, WebsiteMetadata};
    use crate::outcome::DegradeReason;
    use crate::store::memory::InMemoryStore;
    use crate::websites::ingest_website;

    fn site(id: &str, chunks: &[&str]) -> ScrapedWebsite {
        ScrapedWebsite {
            id: id.to_string(),
            owner_id: "alice".to_string(),
            url: format!("https://example.org/{}", id),
            title: format!("Title {}", id),
            content: chunks.join(" "),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            metadata: WebsiteMetadata::default(),
            scope: Scope::Personal,
            created_at: 0,
        }
    }

    fn terms(q: &str) -> Vec<String> {
        tokenize(q, 3)
    }

    #[test]
    fn test_tokenize_drops_short_terms() {
        assert_eq!(terms("ab cd longterm"), vec!["longterm"]);
        assert_eq!(terms("  Photo   SYNTHESIS "), vec!["photo", "synthesis"]);
        assert!(terms("").is_empty());
        assert!(terms("a an to").is_empty());
    }

    #[test]
    fn test_tokenize_counts_characters_not_bytes() {
        // Two characters, four bytes.
        assert!(terms("éé").is_empty());
        assert_eq!(terms("été"), vec!["été"]);
    }

    #[test]
    fn test_score_sums_chunks() {
        let w = site("w1", &["the cat sat", "the cat cat cat"]);
        let scored = score_website(&w, &terms("cat")).unwrap();
        assert_eq!(scored.score, 4);
        assert_eq!(scored.best_chunk, "the cat cat cat");
    }

    #[test]
    fn test_score_is_case_insensitive() {
        assert_eq!(score_chunk("Fractions and FRACTIONS", &terms("fractions")), 2);
    }

    #[test]
    fn test_occurrences_do_not_overlap() {
        assert_eq!(score_chunk("aaaa", &["aaa".to_string()]), 1);
    }

    #[test]
    fn test_short_terms_never_contribute() {
        let w = site("w1", &["ab cd ab cd", "a longterm plan"]);
        let with_short = score_website(&w, &terms("ab cd longterm")).unwrap();
        let alone = score_website(&w, &terms("longterm")).unwrap();
        assert_eq!(with_short.score, alone.score);
        assert_eq!(with_short.score, 1);
    }

    #[test]
    fn test_best_chunk_prefers_highest_then_earliest() {
        let w = site("w1", &["no match", "cat", "cat cat", "cat cat"]);
        let scored = score_website(&w, &terms("cat")).unwrap();
        assert_eq!(scored.best_chunk, "cat cat");
        assert_eq!(scored.score, 5);

        let tie = site("w2", &["first cat", "second cat"]);
        assert_eq!(score_website(&tie, &terms("cat")).unwrap().best_chunk, "first cat");
    }

    #[test]
    fn test_zero_score_excluded() {
        let w = site("w1", &["nothing relevant"]);
        assert!(score_website(&w, &terms("cat")).is_none());
        let empty = site("w2", &[]);
        assert!(score_website(&empty, &terms("cat")).is_none());
    }

    #[test]
    fn test_rank_orders_by_score() {
        let sites = vec![
            site("four", &["cat cat", "cat cat"]),
            site("nine", &["cat cat cat cat cat cat cat cat cat"]),
        ];
        let hits = rank(&sites, "cat", &SearchParams::default());
        let ids: Vec<&str> = hits.iter().map(|h| h.website_id.as_str()).collect();
        assert_eq!(ids, vec!["nine", "four"]);
        assert_eq!(hits[0].relevance_score, 9);
        assert_eq!(hits[1].relevance_score, 4);
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        let sites: Vec<ScrapedWebsite> = (0..7)
            .map(|i| site(&format!("w{}", i), &["lesson plan"]))
            .collect();
        let hits = rank(&sites, "lesson", &SearchParams::default());
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn test_rank_empty_query() {
        let sites = vec![site("w1", &["anything at all"])];
        assert!(rank(&sites, "", &SearchParams::default()).is_empty());
        assert!(rank(&sites, "at", &SearchParams::default()).is_empty());
    }

    #[test]
    fn test_snippet_is_bounded() {
        let long = "x".repeat(2000);
        let sites = vec![site("w1", &[&format!("match {}", long)])];
        let hits = rank(&sites, "match", &SearchParams::default());
        assert_eq!(hits[0].content.chars().count(), 503);
        assert!(hits[0].content.ends_with("..."));

        assert_eq!(snippet("short", 500), "short...");
    }

    fn page(title: &str, chunks: &[&str], scope: Scope) -> NewWebsite {
        NewWebsite {
            url: format!("https://example.org/{}", title),
            title: title.to_string(),
            content: chunks.join(" "),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            metadata: WebsiteMetadata::default(),
            scope,
        }
    }

    #[tokio::test]
    async fn test_search_websites_ranks_visible_pages() {
        let store = InMemoryStore::new();
        ingest_website(&store, Some("alice"), page("Cats", &["the cat sat", "the cat cat cat"], Scope::Personal))
            .await
            .unwrap();
        ingest_website(&store, Some("bob"), page("Other cats", &["cat cat cat cat cat"], Scope::Personal))
            .await
            .unwrap();

        let hits = search_websites(&store, Some("alice"), "cat", &Scope::Personal, &SearchParams::default())
            .await
            .into_items();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Cats");
        assert_eq!(hits[0].relevance_score, 4);
        assert_eq!(hits[0].content, "the cat cat cat...");
    }

    #[tokio::test]
    async fn test_search_websites_without_caller() {
        let store = InMemoryStore::new();
        ingest_website(&store, Some("alice"), page("Cats", &["cat"], Scope::Personal))
            .await
            .unwrap();

        let outcome = search_websites(&store, None, "cat", &Scope::Personal, &SearchParams::default()).await;
        assert_eq!(outcome.reason(), Some(&DegradeReason::Unauthenticated));
        assert!(outcome.into_items().is_empty());
    }

    #[tokio::test]
    async fn test_search_websites_pending_member_sees_nothing() {
        let store = InMemoryStore::with_space(&[
            ("alice", MembershipStatus::Accepted),
            ("bob", MembershipStatus::Pending),
        ]);
        let scope = Scope::shared("s1");
        ingest_website(&store, Some("alice"), page("Cats", &["cat"], scope.clone()))
            .await
            .unwrap();

        let outcome = search_websites(&store, Some("bob"), "cat", &scope, &SearchParams::default()).await;
        assert_eq!(outcome.reason(), Some(&DegradeReason::NoAccess));
        assert!(outcome.into_items().is_empty());

        let member = search_websites(&store, Some("alice"), "cat", &scope, &SearchParams::default()).await;
        assert_eq!(member.into_items().len(), 1);
    }

    #[tokio::test]
    async fn test_search_websites_swallows_store_failure() {
        let store = InMemoryStore::new();
        ingest_website(&store, Some("alice"), page("Cats", &["cat"], Scope::Personal))
            .await
            .unwrap();
        store.fail_listings();

        let outcome = search_websites(&store, Some("alice"), "cat", &Scope::Personal, &SearchParams::default()).await;
        assert!(matches!(outcome.reason(), Some(DegradeReason::Failed(_))));
        assert!(outcome.into_items().is_empty());
    }
}
