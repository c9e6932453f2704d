use std::ops::ControlFlow;

use futures_util::StreamExt;

use crate::source::AssetStream;

/// What happened to one asset during the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Already on disk under the sized or legacy name.
    Present,
    /// Bytes written to the canonical path.
    Downloaded,
    /// Transfer attempted and gave up.
    Failed,
    /// Would have been downloaded (dry run).
    Planned,
    /// Path printed instead of downloaded.
    Listed,
    /// Excluded by a kind filter before any path work.
    Filtered,
}

/// Consecutive already-present count for `until_found`.
#[derive(Debug, Default)]
struct CutoffState {
    consecutive_present: u32,
}

/// Bounds how much of the (newest-first) asset listing is consumed.
///
/// `recent` truncates the stream before anything else sees it. `until_found`
/// stops the pass once that many assets in a row were already present; any
/// asset that needed downloading resets the run. Both rely on the listing
/// being newest first: an out-of-order source under-syncs silently.
#[derive(Debug)]
pub struct Cutoff {
    recent: Option<u32>,
    until_found: Option<u32>,
    state: CutoffState,
}

impl Cutoff {
    pub fn new(recent: Option<u32>, until_found: Option<u32>) -> Self {
        Self {
            recent,
            until_found,
            state: CutoffState::default(),
        }
    }

    /// Apply `recent` to the listing. Lazy: nothing past the first N
    /// elements is ever pulled.
    pub fn limit<'a>(&self, assets: AssetStream<'a>) -> AssetStream<'a> {
        match self.recent {
            Some(n) => assets.take(n as usize).boxed(),
            None => assets,
        }
    }

    /// Record one processed asset and decide whether to pull the next.
    pub fn observe(&mut self, disposition: Disposition) -> ControlFlow<()> {
        match disposition {
            Disposition::Present => self.state.consecutive_present += 1,
            Disposition::Filtered => {}
            Disposition::Downloaded
            | Disposition::Failed
            | Disposition::Planned
            | Disposition::Listed => self.state.consecutive_present = 0,
        }

        match self.until_found {
            Some(k) if self.state.consecutive_present >= k => {
                tracing::info!(
                    "Found {} consecutive previously downloaded photos. Exiting",
                    self.state.consecutive_present
                );
                ControlFlow::Break(())
            }
            _ => ControlFlow::Continue(()),
        }
    }
}
