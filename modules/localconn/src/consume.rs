//! One consume cycle: read, partition, rewrite, dispatch.
//!
//! Tokens written by this instance stay in the slot (other contexts may not
//! have read them yet). Everything else is delivered and removed. Malformed
//! entries are dropped from the slot as well.
//!
//! In weak mode the read and the rewrite are separate store calls, so a send
//! from another context landing between them is overwritten. Strict mode
//! closes that gap with compare-and-set.

use localconn_store::slot::ENTRY_SEPARATOR;
use localconn_store::{Slot, SlotStore};
use tracing::{debug, trace, warn};

use crate::codec::{decode_entries, EventToken};
use crate::config::Consistency;
use crate::dispatch::dispatch;
use crate::error::{ChannelError, Result};
use crate::origin::OriginId;
use crate::state::ChannelState;

/// Compare-and-set attempts per strict cycle before giving up until the next.
pub const STRICT_REWRITE_ATTEMPTS: usize = 8;

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Foreign tokens that had handlers and were dispatched.
    pub delivered: usize,
    /// Foreign tokens with no handlers, dropped.
    pub unregistered: usize,
    /// Entries that failed to decode, dropped.
    pub malformed: usize,
    pub callback_failures: usize,
    /// Whether the slot was written this cycle.
    pub rewritten: bool,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        *self == CycleReport::default()
    }
}

/// Slot content split by origin.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    /// Raw entries written by this instance, in slot order.
    pub mine: Vec<&'a str>,
    /// Decoded entries from other instances, in slot order.
    pub foreign: Vec<EventToken>,
    pub malformed: usize,
}

impl Partition<'_> {
    /// Slot content after the foreign and malformed entries are removed.
    pub fn survivors(&self) -> String {
        self.mine.join(ENTRY_SEPARATOR)
    }
}

pub fn partition(content: &str, own: OriginId) -> Partition<'_> {
    let mut part = Partition::default();

    for (raw, decoded) in decode_entries(content) {
        match decoded {
            Ok(token) if token.origin == own => part.mine.push(raw),
            Ok(token) => part.foreign.push(token),
            Err(source) => {
                let err = ChannelError::MalformedToken {
                    token: raw.to_string(),
                    source,
                };
                warn!(error = %err, "Dropping from slot");
                part.malformed += 1;
            }
        }
    }

    part
}

/// Run one cycle against `slot` on behalf of `state`.
///
/// Only a failed read is returned as an error. A failed rewrite is logged and
/// the decoded batch is still dispatched.
pub async fn run_cycle<S: SlotStore>(
    slot: &Slot<S>,
    state: &ChannelState,
    consistency: Consistency,
) -> Result<CycleReport> {
    let content = slot.read().await?;
    if content.is_empty() {
        trace!(key = slot.key(), "Slot empty");
        return Ok(CycleReport::default());
    }

    let taken = match consistency {
        Consistency::Weak => take_weak(slot, state.origin(), &content).await,
        Consistency::Strict => take_strict(slot, state.origin(), content).await?,
    };

    let mut report = CycleReport {
        malformed: taken.malformed,
        rewritten: taken.rewritten,
        ..CycleReport::default()
    };

    for token in &taken.foreign {
        let Some(handlers) = state.handlers(&token.event) else {
            trace!(event = token.event.as_str(), "No callbacks registered, dropping");
            report.unregistered += 1;
            continue;
        };
        let outcome = dispatch(&token.event, &token.args, &handlers);
        report.delivered += 1;
        report.callback_failures += outcome.failures.len();
    }

    if !report.is_idle() {
        debug!(
            key = slot.key(),
            delivered = report.delivered,
            unregistered = report.unregistered,
            malformed = report.malformed,
            callback_failures = report.callback_failures,
            rewritten = report.rewritten,
            "Consume cycle"
        );
    }

    Ok(report)
}

struct Taken {
    foreign: Vec<EventToken>,
    malformed: usize,
    rewritten: bool,
}

async fn take_weak<S: SlotStore>(slot: &Slot<S>, own: OriginId, content: &str) -> Taken {
    let part = partition(content, own);
    let survivors = part.survivors();

    let rewritten = if survivors == content {
        false
    } else {
        match slot.write(&survivors).await {
            Ok(()) => true,
            Err(e) => {
                let err = ChannelError::from_write(slot.key(), e);
                warn!(error = %err, "Slot rewrite failed, will retry next cycle");
                false
            }
        }
    };

    Taken {
        foreign: part.foreign,
        malformed: part.malformed,
        rewritten,
    }
}

async fn take_strict<S: SlotStore>(
    slot: &Slot<S>,
    own: OriginId,
    mut content: String,
) -> Result<Taken> {
    for _ in 0..STRICT_REWRITE_ATTEMPTS {
        let part = partition(&content, own);
        let survivors = part.survivors();

        if survivors == content {
            return Ok(Taken {
                foreign: part.foreign,
                malformed: part.malformed,
                rewritten: false,
            });
        }

        match slot.compare_and_write(&content, &survivors).await {
            Ok(true) => {
                return Ok(Taken {
                    foreign: part.foreign,
                    malformed: part.malformed,
                    rewritten: true,
                })
            }
            Ok(false) => {
                trace!(key = slot.key(), "Slot changed under rewrite, retrying");
            }
            Err(e) => {
                let err = ChannelError::from_write(slot.key(), e);
                warn!(error = %err, "Slot rewrite failed, will retry next cycle");
                return Ok(Taken {
                    foreign: part.foreign,
                    malformed: part.malformed,
                    rewritten: false,
                });
            }
        }

        content = slot.read().await?;
        if content.is_empty() {
            break;
        }
    }

    if !content.is_empty() {
        warn!(
            key = slot.key(),
            attempts = STRICT_REWRITE_ATTEMPTS,
            "Slot kept changing under rewrite, deferring delivery"
        );
    }
    Ok(Taken {
        foreign: Vec::new(),
        malformed: 0,
        rewritten: false,
    })
}
