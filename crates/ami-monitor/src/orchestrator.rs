//! Query orchestration.
//!
//! Fans diagnostic commands out over the control link, feeds the replies to
//! the parsers and correlators, and keeps one cached snapshot per scope.
//!
//! ```text
//!   scope_snapshot("Soporte")
//!        │ cache miss
//!        ▼
//!   ┌──────────────┬──────────────┬─────┬──────────────────────┬───────────────┐
//!   │ queue show Q17│ queue show Q18│ ... │ core show channels v. │ sip show peers │  (concurrent)
//!   └──────┬───────┴──────┬───────┴─────┴──────────┬───────────┴───────┬───────┘
//!          └──────────────┴─────────────┬───────────┴───────────────────┘
//!                                       ▼
//!                    parse → correlate bridges → aggregate agents
//!                                       ▼
//!                          ScopeSnapshot (cached, ttl)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::{try_join, try_join_all};
use tracing::{debug, info, warn};

use crate::ami::{run_command, ControlLink};
use crate::cache::{CacheEntry, Clock, SnapshotCache, SystemClock};
use crate::config::MonitorConfig;
use crate::correlate::{aggregate_agent, aggregate_agents, correlate_bridges};
use crate::error::{MonitorError, Result};
use crate::model::{ChannelRecord, ExtensionDetail, ScopeSnapshot, Served, StateTotals};
use crate::parser::{self, PeerTable, QueueBlock};

/// Fetches, parses and correlates switch state on demand
pub struct QueryOrchestrator<L: ControlLink, C: Clock = SystemClock> {
    link: L,
    config: Arc<MonitorConfig>,
    cache: SnapshotCache<ScopeSnapshot, C>,
}

impl<L: ControlLink> QueryOrchestrator<L, SystemClock> {
    /// Create an orchestrator on the wall clock
    pub fn new(link: L, config: MonitorConfig) -> Self {
        Self::with_clock(link, config, SystemClock)
    }
}

impl<L: ControlLink, C: Clock> QueryOrchestrator<L, C> {
    /// Create an orchestrator with an explicit clock
    pub fn with_clock(link: L, config: MonitorConfig, clock: C) -> Self {
        let cache = SnapshotCache::with_clock(config.cache_ttl(), clock);
        Self {
            link,
            config: Arc::new(config),
            cache,
        }
    }

    /// Aggregated state of every agent in a scope.
    ///
    /// Served from cache while the last snapshot is younger than the ttl;
    /// otherwise every source is queried concurrently and the first transport
    /// failure fails the whole query, leaving any previous snapshot in place.
    pub async fn scope_snapshot(&self, scope: &str) -> Result<Served<ScopeSnapshot>> {
        let queues = self
            .config
            .queues_for(scope)
            .ok_or_else(|| MonitorError::UnknownScope(scope.to_string()))?
            .to_vec();

        let (entry, from_cache) = self
            .cache
            .get_or_refresh(scope, || self.refresh_scope(scope, queues))
            .await
            .map_err(|e| {
                warn!("❌ Refresh of scope {} failed: {}", scope, e);
                e
            })?;

        if from_cache {
            debug!("⚡ Scope {} served from cache (captured {})", scope, entry.captured_at);
            Ok(Served::cached(entry.snapshot.as_ref().clone()))
        } else {
            Ok(Served::fresh(entry.snapshot.as_ref().clone()))
        }
    }

    /// Last snapshot of a scope regardless of age, for surfacing staleness
    /// after a failed refresh.
    pub fn cached(&self, scope: &str) -> Option<CacheEntry<ScopeSnapshot>> {
        self.cache.peek(scope)
    }

    /// Calls waiting per scope, every scope queried in parallel through the cache
    pub async fn calls_waiting_by_scope(&self) -> Result<BTreeMap<String, u64>> {
        let snapshots = try_join_all(self.config.scopes.keys().map(|scope| self.scope_snapshot(scope))).await?;
        Ok(snapshots
            .into_iter()
            .map(|served| (served.data.scope, served.data.calls_waiting))
            .collect())
    }

    /// Everything the switch knows about one extension. Never cached.
    pub async fn extension_detail(&self, extension: &str) -> Result<ExtensionDetail> {
        info!("🔍 Querying extension {}", extension);
        let commands = &self.config.commands;
        let prefix = self.config.parser.technology_prefix.as_str();

        let (channel_text, (queue_text, peer_text)) = try_join(
            run_command(&self.link, &commands.channels),
            try_join(
                run_command(&self.link, &commands.queues),
                run_command(&self.link, &commands.peers),
            ),
        )
        .await?;

        let channels = parser::parse_channels(&channel_text, prefix);
        let blocks = parser::parse_queue_listing(&queue_text, None, prefix);
        let peers = parser::parse_peers(&peer_text);

        let interface = format!("{}{}", prefix, extension);
        let member_lines = queue_text
            .lines()
            .map(str::trim)
            .filter(|line| line_mentions(line, &interface))
            .map(str::to_string)
            .collect();

        let status = aggregate_agent(
            extension,
            peers.get(extension),
            parser::memberships(&blocks),
            &channels,
            prefix,
        );

        let owned = parser::channels_for(&channels, extension).into_iter().cloned().collect();
        Ok(ExtensionDetail {
            status,
            channels: owned,
            member_lines,
        })
    }

    /// Live channels belonging to an extension
    pub async fn extension_channels(&self, extension: &str) -> Result<Vec<ChannelRecord>> {
        let channels = self.fetch_channels().await?;
        Ok(parser::channels_for(&channels, extension).into_iter().cloned().collect())
    }

    /// Channels an operator would hang up to free a stuck agent
    pub async fn hangup_candidates(&self, extension: &str) -> Result<Vec<String>> {
        let channels = self.fetch_channels().await?;
        let candidates = parser::hangup_candidates(&channels, extension, &self.config.parser.queue_application);
        info!("☎️ {} hangup candidates for extension {}", candidates.len(), extension);
        Ok(candidates)
    }

    async fn fetch_channels(&self) -> Result<Vec<ChannelRecord>> {
        let text = run_command(&self.link, &self.config.commands.channels).await?;
        Ok(parser::parse_channels(&text, &self.config.parser.technology_prefix))
    }

    async fn refresh_scope(&self, scope: &str, queues: Vec<String>) -> Result<ScopeSnapshot> {
        info!("🟡 Refreshing scope {} ({} queues)", scope, queues.len());
        let commands = &self.config.commands;
        let query = &self.config.query;
        let prefix = self.config.parser.technology_prefix.as_str();

        let queue_commands: Vec<String> = queues.iter().map(|queue| commands.queue_command(queue)).collect();
        let queue_replies = try_join_all(queue_commands.iter().map(|command| run_command(&self.link, command)));
        let side_replies = try_join(
            optional_command(&self.link, query.include_channels.then_some(commands.channels.as_str())),
            optional_command(&self.link, query.include_peers.then_some(commands.peers.as_str())),
        );
        let (queue_texts, (channel_text, peer_text)) = try_join(queue_replies, side_replies).await?;

        let all_empty = queue_texts.iter().all(|text| text.trim().is_empty())
            && channel_text.as_deref().map_or(true, |text| text.trim().is_empty())
            && peer_text.as_deref().map_or(true, |text| text.trim().is_empty());
        if all_empty {
            return Err(MonitorError::NoData {
                scope: scope.to_string(),
            });
        }

        let blocks: Vec<QueueBlock> = queues
            .iter()
            .zip(&queue_texts)
            .flat_map(|(queue, text)| parser::parse_queue_listing(text, Some(queue.as_str()), prefix))
            .collect();
        let channels = channel_text
            .map(|text| parser::parse_channels(&text, prefix))
            .unwrap_or_default();
        let peers = peer_text.map(|text| parser::parse_peers(&text)).unwrap_or_else(PeerTable::default);

        let records: Vec<_> = parser::memberships(&blocks).cloned().collect();
        let agents = aggregate_agents(&peers, &records, &channels, prefix);
        let summaries: Vec<_> = blocks.iter().map(QueueBlock::summary).collect();
        let calls_waiting: u64 = summaries.iter().map(|summary| summary.calls_waiting).sum();
        let totals = StateTotals::tally(&agents);

        info!(
            "✅ Scope {}: {} agents ({} engaged, {} paused, {} available), {} calls waiting",
            scope,
            agents.len(),
            totals.engaged,
            totals.paused,
            totals.available,
            calls_waiting
        );

        Ok(ScopeSnapshot {
            scope: scope.to_string(),
            captured_at: self.cache.now(),
            agents,
            queues: summaries,
            totals,
            calls_waiting,
            call_pairs: correlate_bridges(&channels),
        })
    }
}

async fn optional_command<L: ControlLink>(link: &L, command: Option<&str>) -> Result<Option<String>> {
    match command {
        Some(command) => run_command(link, command).await.map(Some),
        None => Ok(None),
    }
}

/// True when the line names the interface exactly, not as a prefix of a longer one
fn line_mentions(line: &str, interface: &str) -> bool {
    line.match_indices(interface).any(|(index, _)| {
        !line[index + interface.len()..]
            .chars()
            .next()
            .map_or(false, |next| next.is_ascii_digit())
    })
}
