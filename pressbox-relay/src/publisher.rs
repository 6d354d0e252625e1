//! The poll-filter-format-publish run.
//!
//! Accounts are processed one after another. A failure on one account is
//! logged and the run moves on; nothing is retried within a run.
use crate::checkpoint::{CheckpointStore, compare_ids, is_newer};
use crate::{Account, CandidateItem, Formatter, RelevanceFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Read and write access to the platform.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Posts by `account` newer than `since_id`, in any order.
    async fn recent_posts(
        &self,
        account: &Account,
        since_id: Option<&str>,
    ) -> Result<Vec<CandidateItem>>;

    /// Publish `text`, returning the id of the new post.
    async fn publish(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Pause between two accounts.
    pub account_delay: Duration,
    /// Publish backlog for accounts without a checkpoint instead of only
    /// recording the newest id.
    pub publish_on_first_run: bool,
    /// Format and log, never publish.
    pub dry_run: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            account_delay: Duration::from_secs(5),
            publish_on_first_run: false,
            dry_run: false,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub accounts: usize,
    pub fetched: usize,
    pub relevant: usize,
    pub published: usize,
    /// Relevant items that could not be made to fit the length limit.
    pub skipped: usize,
    pub failed_accounts: Vec<String>,
}

pub struct Relay<C> {
    client: C,
    accounts: Vec<Account>,
    filter: RelevanceFilter,
    formatter: Formatter,
    settings: RelaySettings,
}

impl<C: SocialClient> Relay<C> {
    pub fn new(
        client: C,
        accounts: Vec<Account>,
        filter: RelevanceFilter,
        formatter: Formatter,
        settings: RelaySettings,
    ) -> Self {
        Self {
            client,
            accounts,
            filter,
            formatter,
            settings,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Process every account once, advancing `store` as items are handled.
    ///
    /// The store is not saved here; the caller decides when to persist it.
    pub async fn run_once(&self, store: &mut CheckpointStore) -> RunReport {
        let mut report = RunReport::default();

        for (idx, account) in self.accounts.iter().enumerate() {
            if idx > 0 && !self.settings.account_delay.is_zero() {
                tokio::time::sleep(self.settings.account_delay).await;
            }

            report.accounts += 1;
            let span = info_span!("account", username = %account.username);
            let outcome = self
                .process_account(account, store, &mut report)
                .instrument(span)
                .await;

            if let Err(err) = outcome {
                error!(
                    username = %account.username,
                    error = %format!("{err:#}"),
                    "relay.account.failed"
                );
                report.failed_accounts.push(account.username.clone());
            }
        }

        info!(
            accounts = report.accounts,
            fetched = report.fetched,
            relevant = report.relevant,
            published = report.published,
            skipped = report.skipped,
            failed = report.failed_accounts.len(),
            dry_run = self.settings.dry_run,
            "relay.run.done"
        );
        report
    }

    async fn process_account(
        &self,
        account: &Account,
        store: &mut CheckpointStore,
        report: &mut RunReport,
    ) -> Result<()> {
        let since = store.get(&account.username).map(str::to_owned);
        debug!(since_id = ?since, "relay.account.start");

        let mut items = self
            .client
            .recent_posts(account, since.as_deref())
            .await
            .context("fetch recent posts")?;

        if let Some(since) = since.as_deref() {
            items.retain(|item| is_newer(&item.id, since));
        }
        items.sort_by(|a, b| compare_ids(&a.id, &b.id));
        report.fetched += items.len();

        let Some(newest) = items.last().map(|item| item.id.clone()) else {
            debug!("relay.account.no_new_items");
            return Ok(());
        };

        if since.is_none() && !self.settings.publish_on_first_run {
            store.advance(&account.username, &newest);
            info!(newest_id = %newest, skipped = items.len(), "relay.account.bootstrap");
            return Ok(());
        }

        for item in items {
            let Some(keyword) = self.filter.matched_keyword(&item.text) else {
                store.advance(&account.username, &item.id);
                continue;
            };
            report.relevant += 1;

            let Some(text) = self.formatter.format(account, &item) else {
                warn!(
                    item_id = %item.id,
                    max_len = self.formatter.max_len(),
                    "relay.item.too_long"
                );
                report.skipped += 1;
                store.advance(&account.username, &item.id);
                continue;
            };

            if self.settings.dry_run {
                info!(item_id = %item.id, keyword, text = %text, "relay.item.dry_run");
                store.advance(&account.username, &item.id);
                continue;
            }

            let posted = self
                .client
                .publish(&text)
                .await
                .with_context(|| format!("publish item {}", item.id))?;

            report.published += 1;
            store.advance(&account.username, &item.id);
            info!(item_id = %item.id, posted_id = %posted, keyword, "relay.item.published");
        }

        Ok(())
    }
}
