use engine::physics::BodyPair;
use engine::{BodyId, StepReport};

use crate::events::IssueId;

pub const CATEGORY_WALLS: u32 = 0b1000;
pub const CATEGORY_PLAYER: u32 = 0b0100;
pub const CATEGORY_GUESTS: u32 = 0b0010;
pub const CATEGORY_ISSUES: u32 = 0b0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactChange {
    Entered,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueContact {
    pub issue: IssueId,
    pub change: ContactChange,
}

/// Turns a physics step report into player/issue contact changes.
///
/// Started pairs are reported before ended pairs, each batch in physics order. Pairs that
/// do not involve the player, whose other body is not in the issue category, or whose
/// issue is no longer live according to `issue_for_body` are dropped.
pub fn translate(
    report: &StepReport,
    player_body: BodyId,
    issue_for_body: impl Fn(BodyId) -> Option<IssueId>,
) -> Vec<IssueContact> {
    let started = report
        .started
        .iter()
        .filter_map(|pair| player_issue(pair, player_body, &issue_for_body))
        .map(|issue| IssueContact {
            issue,
            change: ContactChange::Entered,
        });
    let ended = report
        .ended
        .iter()
        .filter_map(|pair| player_issue(pair, player_body, &issue_for_body))
        .map(|issue| IssueContact {
            issue,
            change: ContactChange::Exited,
        });
    started.chain(ended).collect()
}

fn player_issue(
    pair: &BodyPair,
    player_body: BodyId,
    issue_for_body: &impl Fn(BodyId) -> Option<IssueId>,
) -> Option<IssueId> {
    let other = pair.other(player_body)?;
    if other.category & CATEGORY_ISSUES == 0 {
        return None;
    }
    issue_for_body(other.id)
}
