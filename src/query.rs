//! Search filtering, pagination windowing, and user-state annotation.
//!
//! This is a pure projection over an aggregation result (cached or fresh):
//! the source slice is never mutated, and the same inputs always produce the
//! same page.

use std::collections::HashSet;

use crate::feed::Article;

/// Filter, window, and annotate one page of articles.
///
/// A non-empty `query` retains only articles whose title or description
/// contains it as a case-insensitive substring. Plain substring match, no
/// stemming or tokenization, so it behaves the same for any language.
///
/// Pages are 1-based: page `n` covers `[(n-1)*page_size, n*page_size)` of the
/// filtered sequence. A page beyond the filtered length (or page 0) yields an
/// empty Vec, not an error.
///
/// Each returned article carries `is_bookmarked`/`is_read_later` computed by
/// membership against the supplied id sets.
pub fn page_view(
    source: &[Article],
    query: &str,
    page: usize,
    page_size: usize,
    bookmarked: &HashSet<String>,
    read_later: &HashSet<String>,
) -> Vec<Article> {
    let Some(start) = page.checked_sub(1).map(|p| p.saturating_mul(page_size)) else {
        return Vec::new();
    };

    let needle = query.to_lowercase();
    source
        .iter()
        .filter(|article| matches(article, &needle))
        .skip(start)
        .take(page_size)
        .map(|article| {
            let mut article = article.clone();
            article.is_bookmarked = bookmarked.contains(&article.id);
            article.is_read_later = read_later.contains(&article.id);
            article
        })
        .collect()
}

fn matches(article: &Article, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    article.title.to_lowercase().contains(needle)
        || article.description.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Article;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn article(id: &str, title: &str, description: &str) -> Article {
        Article {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            link: format!("https://example.com/{id}"),
            pub_date: String::new(),
            published: None,
            source: "Test".to_string(),
            thumbnail: None,
            content: None,
            is_bookmarked: false,
            is_read_later: false,
        }
    }

    fn corpus() -> Vec<Article> {
        vec![
            article("1", "Rust hits 1.0", "The language ships"),
            article("2", "Kernel news", "Linux 6.9 released with rust drivers"),
            article("3", "Sports roundup", "Football results"),
            article("4", "Markets", "Tech stocks RUSTLE nerves"),
        ]
    }

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_empty_query_is_pure_windowing() {
        let source = corpus();
        let page = page_view(&source, "", 1, 3, &HashSet::new(), &HashSet::new());
        assert_eq!(ids(&page), vec!["1", "2", "3"]);
        assert!(page.iter().all(|a| !a.is_bookmarked && !a.is_read_later));

        let page2 = page_view(&source, "", 2, 3, &HashSet::new(), &HashSet::new());
        assert_eq!(ids(&page2), vec!["4"]);
    }

    #[test]
    fn test_filter_is_case_insensitive_over_title_and_description() {
        let source = corpus();
        let page = page_view(&source, "rust", 1, 10, &HashSet::new(), &HashSet::new());
        assert_eq!(ids(&page), vec!["1", "2", "4"]);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let source = corpus();
        let page = page_view(&source, "", 5, 3, &HashSet::new(), &HashSet::new());
        assert!(page.is_empty());
    }

    #[test]
    fn test_page_zero_is_empty() {
        let source = corpus();
        let page = page_view(&source, "", 0, 3, &HashSet::new(), &HashSet::new());
        assert!(page.is_empty());
    }

    #[test]
    fn test_annotation_from_supplied_sets() {
        let source = corpus();
        let bookmarked: HashSet<String> = ["1".to_string()].into();
        let read_later: HashSet<String> = ["1".to_string(), "3".to_string()].into();

        let page = page_view(&source, "", 1, 10, &bookmarked, &read_later);
        assert!(page[0].is_bookmarked && page[0].is_read_later);
        assert!(!page[1].is_bookmarked && !page[1].is_read_later);
        assert!(page[2].is_read_later && !page[2].is_bookmarked);

        // Pure projection: the source is untouched.
        assert!(source.iter().all(|a| !a.is_bookmarked && !a.is_read_later));
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let source = corpus();
        let once = page_view(&source, "rust", 1, 100, &HashSet::new(), &HashSet::new());
        let twice = page_view(&once, "rust", 1, 100, &HashSet::new(), &HashSet::new());
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn prop_every_match_contains_query(
            titles in proptest::collection::vec("[a-zA-Z ]{0,20}", 0..30),
            query in "[a-zA-Z]{1,5}",
        ) {
            let source: Vec<Article> = titles
                .iter()
                .enumerate()
                .map(|(i, t)| article(&i.to_string(), t, ""))
                .collect();
            let page = page_view(&source, &query, 1, usize::MAX, &HashSet::new(), &HashSet::new());
            let needle = query.to_lowercase();
            for a in &page {
                prop_assert!(a.title.to_lowercase().contains(&needle));
            }
        }

        #[test]
        fn prop_pages_partition_the_filtered_sequence(
            count in 0usize..50,
            page_size in 1usize..10,
        ) {
            let source: Vec<Article> = (0..count)
                .map(|i| article(&i.to_string(), "t", "d"))
                .collect();
            let mut collected = Vec::new();
            let mut page = 1;
            loop {
                let window = page_view(&source, "", page, page_size, &HashSet::new(), &HashSet::new());
                if window.is_empty() {
                    break;
                }
                prop_assert!(window.len() <= page_size);
                collected.extend(window);
                page += 1;
            }
            prop_assert_eq!(collected, source);
        }
    }
}
