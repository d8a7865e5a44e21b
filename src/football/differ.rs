use crate::db::models::{MatchChangeSet, MatchSnapshot, MatchStatus};

/// Compare two snapshots of the same match and derive what changed.
///
/// With no previous snapshot (first sight of an id) every flag is suppressed:
/// a match already under way or finished when first observed produces no
/// kick-off, goal or recap message.
pub fn diff(old: Option<&MatchSnapshot>, new: &MatchSnapshot) -> MatchChangeSet {
    let Some(old) = old else {
        return MatchChangeSet::default();
    };
    debug_assert_eq!(old.id, new.id, "change sets are only defined per match id");

    let kicked_off = old.status.is_pre_kickoff() && new.status.is_in_play();

    let goal_scored = match (old.goal_total(), new.goal_total()) {
        (Some(before), Some(after)) => after > before,
        _ => false,
    };

    let full_time =
        new.status == MatchStatus::Finished && old.status != MatchStatus::Finished;

    MatchChangeSet {
        kicked_off,
        goal_scored,
        full_time,
    }
}
