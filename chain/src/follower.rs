//! Reorg-aware chain follower.
//!
//! Given a stored position and a target head, the follower finds their common
//! ancestor and produces the steps that move the position there: disconnects
//! from the stored block down to the ancestor (descending), then connects from
//! the ancestor up to the target (ascending). Steps are produced lazily so the
//! caller can persist its position after each one; a crash resumes from the
//! last applied step.

use nyx_types::{BlockHeader, ChainPosition};

use crate::{Chain, ChainError, FollowError};

/// One unit of work for the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Disconnect(BlockHeader),
    Connect(BlockHeader),
}

impl Step {
    pub fn block(&self) -> &BlockHeader {
        match self {
            Step::Disconnect(block) | Step::Connect(block) => block,
        }
    }

    /// Position after this step has been applied.
    pub fn resulting_position(&self) -> Option<ChainPosition> {
        match self {
            Step::Disconnect(block) => block.previous_position(),
            Step::Connect(block) => Some(block.position()),
        }
    }
}

pub struct ChainFollower<'a, C: Chain + ?Sized> {
    chain: &'a C,
}

impl<'a, C: Chain + ?Sized> ChainFollower<'a, C> {
    pub fn new(chain: &'a C) -> Self {
        Self { chain }
    }

    /// Plan the move from `stored` to `target`, capped at `max_steps` steps.
    pub fn advance(
        &self,
        stored: Option<ChainPosition>,
        target: &BlockHeader,
        max_steps: usize,
    ) -> Result<Advance<'a, C>, FollowError> {
        let fork = match stored {
            None => None,
            Some(position) => {
                let header = self
                    .chain
                    .header(&position.hash)?
                    .ok_or(FollowError::PositionUnrecoverable(position))?;
                self.chain.find_fork(&header, target)?.map(|f| f.position())
            }
        };

        tracing::debug!(
            from = ?stored.map(|p| p.sequence),
            fork = ?fork.map(|p| p.sequence),
            to = target.sequence,
            "planned chain advance"
        );

        Ok(Advance {
            chain: self.chain,
            cursor: stored,
            fork,
            target: target.position(),
            phase: if stored == fork {
                Phase::Connecting
            } else {
                Phase::Disconnecting
            },
            remaining: max_steps,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Disconnecting,
    Connecting,
    Done,
}

/// Lazy sequence of steps. Each item is fallible because headers are looked
/// up on demand.
pub struct Advance<'a, C: Chain + ?Sized> {
    chain: &'a C,
    cursor: Option<ChainPosition>,
    fork: Option<ChainPosition>,
    target: ChainPosition,
    phase: Phase,
    remaining: usize,
}

impl<C: Chain + ?Sized> Advance<'_, C> {
    /// Position reached once every step yielded so far has been applied.
    pub fn cursor(&self) -> Option<ChainPosition> {
        self.cursor
    }

    pub fn target(&self) -> ChainPosition {
        self.target
    }

    /// Whether the cursor reached the target. False when the step cap was
    /// hit or the canonical chain moved underneath the advance.
    pub fn is_complete(&self) -> bool {
        self.cursor == Some(self.target)
    }

    fn next_disconnect(&mut self) -> Result<Option<Step>, ChainError> {
        let Some(position) = self.cursor else {
            self.phase = Phase::Connecting;
            return self.next_connect();
        };
        if self.cursor == self.fork {
            self.phase = Phase::Connecting;
            return self.next_connect();
        }
        let header = self
            .chain
            .header(&position.hash)?
            .ok_or(ChainError::MissingBlock(position.hash))?;
        self.cursor = header.previous_position();
        Ok(Some(Step::Disconnect(header)))
    }

    fn next_connect(&mut self) -> Result<Option<Step>, ChainError> {
        let next_sequence = self.cursor.map_or(1, |p| p.sequence + 1);
        if next_sequence > self.target.sequence {
            self.phase = Phase::Done;
            return Ok(None);
        }
        let Some(header) = self.chain.header_at(next_sequence)? else {
            self.stop_on_reorg(next_sequence);
            return Ok(None);
        };
        let extends_cursor = match self.cursor {
            Some(cursor) => header.previous == cursor.hash,
            None => header.is_genesis(),
        };
        if !extends_cursor {
            self.stop_on_reorg(next_sequence);
            return Ok(None);
        }
        self.cursor = Some(header.position());
        Ok(Some(Step::Connect(header)))
    }

    fn stop_on_reorg(&mut self, sequence: u32) {
        tracing::debug!(sequence, "canonical chain changed during advance, stopping");
        self.phase = Phase::Done;
    }
}

impl<C: Chain + ?Sized> Iterator for Advance<'_, C> {
    type Item = Result<Step, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let step = match self.phase {
            Phase::Disconnecting => self.next_disconnect(),
            Phase::Connecting => self.next_connect(),
            Phase::Done => return None,
        };
        match step {
            Ok(Some(step)) => {
                self.remaining -= 1;
                Some(Ok(step))
            }
            Ok(None) => None,
            Err(e) => {
                self.phase = Phase::Done;
                Some(Err(e))
            }
        }
    }
}
