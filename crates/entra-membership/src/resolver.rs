//! Resolution of a user-supplied root reference to a canonical group ID.

use tracing::warn;

use crate::directory::DirectoryApi;
use crate::error::{MembershipError, MembershipResult};
use crate::model::GroupId;

/// Resolves a root reference: an object ID is used directly, anything
/// else is treated as an exact display name and searched.
///
/// Zero name matches is fatal (`GroupNotFound`). Multiple matches are a
/// known ambiguity, not an error: the first match is selected
/// deterministically and a warning is logged.
pub async fn resolve_root<D: DirectoryApi>(
    directory: &D,
    reference: &str,
) -> MembershipResult<GroupId> {
    if let Ok(id) = GroupId::parse(reference) {
        return Ok(id);
    }

    let matches = directory.find_groups_by_name(reference).await?;

    match matches.len() {
        0 => Err(MembershipError::GroupNotFound(reference.to_string())),
        1 => Ok(matches[0].id),
        n => {
            warn!(
                name = reference,
                matches = n,
                selected = %matches[0].id,
                "multiple groups share this display name, using first match"
            );
            Ok(matches[0].id)
        }
    }
}
