use anyhow::{Context, Result, bail};
use pressbox_config::{AccountConfig, PressboxConfig};
use pressbox_relay::{
    Account, CheckpointStore, Formatter, Relay, RelaySettings, RelevanceFilter, TwitterSource,
};
use pressbox_social::twitter::TwitterApi;
use std::path::Path;
use std::time::Duration;

fn account_from_config(cfg: &AccountConfig) -> Account {
    Account {
        username: cfg.username.trim().trim_start_matches('@').to_string(),
        emoji: cfg.emoji.trim().to_string(),
        hashtags: cfg.hashtags.trim().to_string(),
        attribution: cfg.attribution().to_string(),
    }
}

pub fn build_relay(cfg: &PressboxConfig, dry_run: bool) -> Result<Relay<TwitterSource>> {
    let platform = &cfg.platform;
    let user_token = platform
        .user_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    if user_token.is_none() && !dry_run {
        bail!("platform.user_token is required to publish (or pass --dry-run)");
    }

    let api = TwitterApi::with_base_url(
        &platform.base_url,
        platform.bearer_token.clone(),
        user_token,
    )
    .context("build twitter client")?;

    let source = TwitterSource::new(api)
        .with_max_results(platform.max_results)
        .with_exclusions(platform.exclude_replies, platform.exclude_retweets);

    let settings = RelaySettings {
        account_delay: Duration::from_secs(cfg.run.account_delay_secs),
        publish_on_first_run: cfg.run.publish_on_first_run,
        dry_run,
    };

    Ok(Relay::new(
        source,
        cfg.accounts.iter().map(account_from_config).collect(),
        RelevanceFilter::new(&cfg.topic.keywords),
        Formatter::new(cfg.format.max_len, cfg.format.link_weight),
        settings,
    ))
}

/// Open the checkpoint at `path`. An unreadable file is logged and the run
/// starts from an empty store.
pub fn open_checkpoint(path: &Path) -> CheckpointStore {
    CheckpointStore::load(path).unwrap_or_else(|err| {
        tracing::error!(error = %err, "checkpoint.unreadable; starting empty");
        CheckpointStore::empty(path)
    })
}

/// Save the store after a run. Dry runs never write; returns whether the
/// store was persisted.
pub fn persist_checkpoint(store: &mut CheckpointStore, dry_run: bool) -> Result<bool> {
    if dry_run {
        tracing::info!(path = %store.path().display(), "checkpoint.not_written.dry_run");
        return Ok(false);
    }
    store.save().context("save checkpoint")?;
    Ok(true)
}
