//! Replaces indexer links with signed server download links.

use std::sync::Arc;

use super::ScrapeItem;
use crate::auth::SecretProvider;
use crate::token::{DownloadToken, TokenError};

pub struct LinkRewriter {
    base_url: String,
    secrets: Arc<SecretProvider>,
}

impl LinkRewriter {
    /// `public_url` is the externally reachable server root; links are
    /// issued under its `/d` prefix.
    pub fn new(public_url: &str, secrets: Arc<SecretProvider>) -> Self {
        Self {
            base_url: format!("{}/d", public_url.trim_end_matches('/')),
            secrets,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Rewrite `item.link` in place. Magnet and empty links are left alone.
    pub fn rewrite(&self, item: &mut ScrapeItem) -> Result<(), TokenError> {
        if item.link.is_empty() || item.is_magnet() {
            return Ok(());
        }

        let token = DownloadToken::new(item.site.clone(), item.canonical_link());
        let encoded = token.encode(self.secrets.shared_secret())?;

        item.link = format!(
            "{}/{}/{}.torrent",
            self.base_url,
            encoded,
            urlencoding::encode(&filename_stem(&item.title))
        );
        item.source_link = None;
        Ok(())
    }
}

/// Title reduced to something safe as a file name.
fn filename_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' | '\0'..='\x1f' => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim();
    if stem.is_empty() {
        "download".to_string()
    } else {
        stem.to_string()
    }
}
