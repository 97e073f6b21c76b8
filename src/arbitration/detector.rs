use crate::models::{ChangeRequest, Plan, PlanBlock};

/// First block of another resource kind that the proposed interval overlaps.
///
/// Blocks of the kind being changed are skipped: they are the ones being
/// replaced. Overlap is half-open, so touching intervals do not conflict.
pub fn find_conflict<'a>(plan: &'a Plan, request: &ChangeRequest) -> Option<&'a PlanBlock> {
    let proposed = request.slot();
    plan.blocks
        .iter()
        .filter(|b| b.kind != request.kind)
        .find(|b| proposed.overlaps(&b.slot()))
}
