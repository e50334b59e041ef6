// ABOUTME: `zd cache` - inspect, clear and prune the on-disk response cache
// ABOUTME: Works without a configured instance; the TTL comes from config when present

use super::App;
use crate::cli::CacheCommand;
use crate::config::{format_duration, CliConfig};
use anyhow::{Context, Result};
use zendesk_sdk::Cache;

impl App {
    pub(super) fn cache_command(&mut self, command: CacheCommand) -> Result<()> {
        let cache = self.open_cache()?;
        match command {
            CacheCommand::Info => {
                let stats = cache.stats().context("Failed to read cache directory")?;
                if stats.entries == 0 {
                    self.ui.info("Cache is empty.");
                }
                self.emit("Cache Information")?;
                self.emit(&format!("Location:     {}", stats.dir.display()))?;
                self.emit(&format!(
                    "Entries:      {} ({} expired)",
                    stats.entries, stats.expired
                ))?;
                self.emit(&format!(
                    "Total size:   {:.2} KB",
                    stats.total_bytes as f64 / 1024.0
                ))?;
                self.emit(&format!("TTL:          {}", format_duration(stats.ttl)))
            }
            CacheCommand::Clear => {
                cache.clear().context("Failed to clear cache")?;
                self.ui.success("Cache cleared successfully!");
                Ok(())
            }
            CacheCommand::Prune => {
                let report = cache.prune_expired().context("Failed to prune cache")?;
                self.ui.success(&format!(
                    "Removed {} expired entries ({} kept)",
                    report.removed, report.kept
                ));
                Ok(())
            }
        }
    }

    fn open_cache(&self) -> Result<Cache> {
        let ttl = CliConfig::load_or_default(&self.config_path)?.cache_ttl();
        let cache = match &self.cache_dir {
            Some(dir) => Cache::with_dir(dir, ttl),
            None => Cache::new(ttl),
        };
        cache.context("Failed to initialize cache")
    }
}
