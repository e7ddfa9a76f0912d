//! arXiv paper source.
//!
//! Queries the arXiv Atom API and turns each feed `entry` into a
//! [`PaperRecord`].

use super::{PaperSource, ProviderError, ARXIV_ERROR_KIND};
use crate::config::ArxivConfig;
use crate::models::PaperRecord;
use async_trait::async_trait;
use metrics::counter;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";

const DOI_URL_PREFIXES: [&str; 4] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

#[derive(Clone)]
pub struct ArxivPaperSource {
    config: ArxivConfig,
    client: Client,
}

impl ArxivPaperSource {
    pub fn new(config: ArxivConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("relay-service/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl PaperSource for ArxivPaperSource {
    async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, ProviderError> {
        let search_query = format!("all:{}", query);

        tracing::debug!(query = %query, max_results = self.config.max_results, "Querying arXiv");

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("search_query", search_query.as_str())])
            .query(&[
                ("start", self.config.start),
                ("max_results", self.config.max_results),
            ])
            .header(
                ACCEPT,
                "application/atom+xml, application/xml;q=0.9, text/xml;q=0.8",
            )
            .send()
            .await
            .map_err(|e| {
                counter!("relay_upstream_requests_total", "upstream" => "arxiv", "outcome" => "network_error")
                    .increment(1);
                ProviderError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            counter!("relay_upstream_requests_total", "upstream" => "arxiv", "outcome" => "upstream_error")
                .increment(1);
            tracing::warn!(status = status.as_u16(), "arXiv API returned an error");

            return Err(ProviderError::Upstream {
                kind: ARXIV_ERROR_KIND,
                status: status.as_u16(),
                payload: None,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let papers = parse_atom_feed(&text, self.config.max_results)?;

        counter!("relay_upstream_requests_total", "upstream" => "arxiv", "outcome" => "success")
            .increment(1);
        tracing::debug!(count = papers.len(), "Parsed arXiv feed");

        Ok(papers)
    }
}

/// Strips a resolver prefix such as `https://doi.org/` from a DOI link.
/// Anything else is returned trimmed but otherwise untouched.
pub fn strip_doi_prefix(href: &str) -> &str {
    let href = href.trim();
    DOI_URL_PREFIXES
        .iter()
        .find_map(|prefix| href.strip_prefix(prefix))
        .unwrap_or(href)
}

#[derive(Clone, Copy)]
enum TextTarget {
    Title,
    Id,
}

/// Fields collected while inside one `<entry>`.
#[derive(Default)]
struct EntryFields {
    title: String,
    id: String,
    alternate: Option<String>,
    doi: Option<String>,
}

impl EntryFields {
    fn push_text(&mut self, target: TextTarget, text: &str) {
        match target {
            TextTarget::Title => self.title.push_str(text),
            TextTarget::Id => self.id.push_str(text),
        }
    }

    fn read_link(&mut self, e: &BytesStart<'_>) -> Result<(), ProviderError> {
        let mut rel = None;
        let mut title = None;
        let mut href = None;

        for attr in e.attributes() {
            let attr = attr.map_err(|e| ProviderError::FeedError(e.to_string()))?;
            let value = attr
                .unescape_value()
                .map_err(|e| ProviderError::FeedError(e.to_string()))?
                .into_owned();
            match attr.key.as_ref() {
                b"rel" => rel = Some(value),
                b"title" => title = Some(value),
                b"href" => href = Some(value),
                _ => {}
            }
        }

        let Some(href) = href else {
            return Ok(());
        };

        // arXiv tags the DOI link with title="doi"; rel="doi" is accepted too.
        let is_doi = rel.as_deref() == Some("doi") || title.as_deref() == Some("doi");
        if is_doi {
            if self.doi.is_none() {
                self.doi = Some(strip_doi_prefix(&href).to_string());
            }
        } else if rel.as_deref().unwrap_or("alternate") == "alternate" && self.alternate.is_none() {
            self.alternate = Some(href);
        }

        Ok(())
    }

    fn into_record(self) -> Option<PaperRecord> {
        let link = if self.id.trim().is_empty() {
            self.alternate.unwrap_or_default()
        } else {
            self.id
        };

        PaperRecord::from_feed_fields(&self.title, &link, self.doi.as_deref().unwrap_or(""))
    }
}

fn is_atom(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == ATOM_NS)
}

/// Parse an Atom feed into paper records.
///
/// Only `entry` elements in the Atom namespace are read, and only their
/// direct `title`, `id` and `link` children. Entries without a title are
/// skipped; the rest keep document order and are capped at `limit`.
pub fn parse_atom_feed(xml: &str, limit: usize) -> Result<Vec<PaperRecord>, ProviderError> {
    // Text is kept untrimmed; whitespace around CDATA and comments separates
    // words and is collapsed when the record is built.
    let mut reader = NsReader::from_str(xml);

    let mut papers = Vec::new();
    let mut depth: usize = 0;
    let mut entry_depth: usize = 0;
    let mut entry: Option<EntryFields> = None;
    let mut target: Option<TextTarget> = None;

    loop {
        let event = reader
            .read_resolved_event()
            .map_err(|e| ProviderError::FeedError(e.to_string()))?;

        match event {
            (ns, Event::Start(e)) => {
                depth += 1;
                let atom = is_atom(&ns);
                let local = e.local_name();

                match entry.as_mut() {
                    None if atom && local.as_ref() == b"entry" => {
                        entry = Some(EntryFields::default());
                        entry_depth = depth;
                    }
                    Some(fields) if atom && depth == entry_depth + 1 => match local.as_ref() {
                        b"title" => target = Some(TextTarget::Title),
                        b"id" => target = Some(TextTarget::Id),
                        b"link" => fields.read_link(&e)?,
                        _ => {}
                    },
                    _ => {}
                }
            }
            (ns, Event::Empty(e)) => {
                if let Some(fields) = entry.as_mut() {
                    if is_atom(&ns) && depth == entry_depth && e.local_name().as_ref() == b"link"
                    {
                        fields.read_link(&e)?;
                    }
                }
            }
            (_, Event::Text(t)) => {
                if let (Some(fields), Some(target)) = (entry.as_mut(), target) {
                    let text = t
                        .unescape()
                        .map_err(|e| ProviderError::FeedError(e.to_string()))?;
                    fields.push_text(target, &text);
                }
            }
            (_, Event::CData(c)) => {
                if let (Some(fields), Some(target)) = (entry.as_mut(), target) {
                    fields.push_text(target, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            (_, Event::End(_)) => {
                if entry.is_some() {
                    if depth == entry_depth {
                        if let Some(record) = entry.take().and_then(EntryFields::into_record) {
                            papers.push(record);
                        }
                    } else if depth == entry_depth + 1 {
                        target = None;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    if entry.is_some() {
        return Err(ProviderError::FeedError(
            "feed ended inside an entry".to_string(),
        ));
    }

    papers.truncate(limit);
    Ok(papers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(entries: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=all:electron&amp;id_list=&amp;start=0&amp;max_results=10</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  {entries}
</feed>"#
        )
    }

    #[test]
    fn entries_are_read_in_document_order() {
        let xml = feed(
            r#"
  <entry>
    <id>http://arxiv.org/abs/1001.0001v1</id>
    <title>First
      Paper</title>
    <link href="http://arxiv.org/abs/1001.0001v1" rel="alternate" type="text/html"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1001.0002v1</id>
    <title>Second Paper</title>
  </entry>"#,
        );

        let papers = parse_atom_feed(&xml, 10).unwrap();
        let titles: Vec<_> = papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First Paper", "Second Paper"]);
        assert_eq!(papers[0].link, "http://arxiv.org/abs/1001.0001v1");
        assert!(papers.iter().all(|p| p.source == "arXiv"));
    }

    #[test]
    fn entries_with_blank_titles_are_dropped() {
        let xml = feed(
            r#"
  <entry><id>a</id><title>Kept A</title></entry>
  <entry><id>b</id><title>
  </title></entry>
  <entry><id>c</id><title>Kept C</title></entry>
  <entry><id>d</id></entry>"#,
        );

        let papers = parse_atom_feed(&xml, 10).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].link, "a");
        assert_eq!(papers[1].link, "c");
    }

    #[test]
    fn doi_link_is_extracted_and_prefix_stripped() {
        let xml = feed(
            r#"
  <entry>
    <id>http://arxiv.org/abs/2101.00001v2</id>
    <title>With DOI</title>
    <arxiv:doi>10.1/xyz</arxiv:doi>
    <link title="doi" href="https://doi.org/10.1/xyz" rel="related"/>
    <link title="pdf" href="http://arxiv.org/pdf/2101.00001v2" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00002v1</id>
    <title>Rel DOI</title>
    <link rel="doi" href="http://dx.doi.org/10.2/abc"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00003v1</id>
    <title>No DOI</title>
  </entry>"#,
        );

        let papers = parse_atom_feed(&xml, 10).unwrap();
        assert_eq!(papers[0].doi, "10.1/xyz");
        assert_eq!(papers[1].doi, "10.2/abc");
        assert_eq!(papers[2].doi, "");
    }

    #[test]
    fn alternate_link_is_used_when_id_is_missing() {
        let xml = feed(
            r#"
  <entry>
    <title>No Id</title>
    <link href="http://arxiv.org/pdf/1" rel="related" title="pdf"/>
    <link href="http://arxiv.org/abs/1" rel="alternate"/>
  </entry>
  <entry><title>Nothing</title></entry>"#,
        );

        let papers = parse_atom_feed(&xml, 10).unwrap();
        assert_eq!(papers[0].link, "http://arxiv.org/abs/1");
        assert_eq!(papers[1].link, "");
    }

    #[test]
    fn feed_title_and_foreign_namespaces_are_ignored() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:x="urn:other">
  <title>ArXiv Query: something</title>
  <x:entry><title>Foreign</title></x:entry>
  <entry>
    <title>Real</title>
    <author><name>A. Author</name></author>
    <x:title>Shadow</x:title>
  </entry>
</feed>"#;

        let papers = parse_atom_feed(xml, 10).unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Real");
    }

    #[test]
    fn unnamespaced_entries_are_not_selected() {
        let xml = "<feed><entry><title>Plain</title></entry></feed>";
        assert!(parse_atom_feed(xml, 10).unwrap().is_empty());
    }

    #[test]
    fn escaped_and_cdata_titles_are_decoded() {
        let xml = feed(
            r#"
  <entry><title>Q&amp;A on &lt;LLMs&gt;</title></entry>
  <entry><title><![CDATA[Raw <b>title</b>]]></title></entry>"#,
        );

        let papers = parse_atom_feed(&xml, 10).unwrap();
        assert_eq!(papers[0].title, "Q&A on <LLMs>");
        assert_eq!(papers[1].title, "Raw <b>title</b>");
    }

    #[test]
    fn titles_mixing_cdata_and_comments_keep_word_breaks() {
        let xml = feed(
            r#"
  <entry><title>Learning <![CDATA[with]]> Graphs</title></entry>
  <entry><title>Deep <!-- draft --> Learning</title></entry>
  <entry><title>Graphs &amp; Trees</title></entry>
  <entry><title>Sparse <i>and</i> Dense Models</title><id>http://arxiv.org/abs/4</id></entry>"#,
        );

        let papers = parse_atom_feed(&xml, 10).unwrap();
        let titles: Vec<_> = papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Learning with Graphs",
                "Deep Learning",
                "Graphs & Trees",
                "Sparse and Dense Models"
            ]
        );
        assert_eq!(papers[3].link, "http://arxiv.org/abs/4");
    }

    #[test]
    fn results_are_capped() {
        let entries: String = (0..15)
            .map(|i| format!("<entry><title>Paper {i}</title></entry>"))
            .collect();

        let papers = parse_atom_feed(&feed(&entries), 10).unwrap();
        assert_eq!(papers.len(), 10);
        assert_eq!(papers[9].title, "Paper 9");
    }

    #[test]
    fn empty_feed_yields_no_records() {
        assert!(parse_atom_feed(&feed(""), 10).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_a_feed_error() {
        let result = parse_atom_feed(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><title>x</entry></feed>"#,
            10,
        );
        assert!(matches!(result, Err(ProviderError::FeedError(_))));
    }

    #[test]
    fn doi_prefixes_are_stripped() {
        assert_eq!(strip_doi_prefix("https://doi.org/10.1/xyz"), "10.1/xyz");
        assert_eq!(strip_doi_prefix("http://doi.org/10.1/xyz"), "10.1/xyz");
        assert_eq!(strip_doi_prefix("https://dx.doi.org/10.1/xyz"), "10.1/xyz");
        assert_eq!(strip_doi_prefix("http://dx.doi.org/10.1/xyz"), "10.1/xyz");
        assert_eq!(strip_doi_prefix(" 10.1/xyz "), "10.1/xyz");
        assert_eq!(
            strip_doi_prefix("https://example.org/10.1/xyz"),
            "https://example.org/10.1/xyz"
        );
    }
}
